pub mod browser;
pub mod clock;
pub mod config;
pub mod credentials;
pub mod error;
pub mod last_run;
pub mod page;
pub mod report;
pub mod selectors;
pub mod session;
