//! Run configuration: CLI-derived options, site constants, and file paths.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::ValueEnum;

/// Default budget for every navigation and element wait.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Login page of the target site.
pub const DEFAULT_LOGIN_URL: &str = "https://www.pythonanywhere.com/login/";

/// Path suffix appended to the post-login base URL to reach the web-apps page.
pub const DEFAULT_SUB_PATH: &str = "webapps";

/// Browser engines the provisioner knows how to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BrowserKind {
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserKind::Chromium => "chromium",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Webkit => "webkit",
        }
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for one invocation. Built once from the CLI, never mutated.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Find the expiry date without clicking the extend button.
    pub peek_only: bool,
    /// Debug logging and full error dumps.
    pub debug: bool,
    /// Open a page and exit without any further operation.
    pub test: bool,
    /// Headed mode (default: headless).
    pub headed: bool,
    /// Browser engine to drive.
    pub browser: BrowserKind,
    /// Use a separate chromium headless shell instead of the new headless mode.
    pub headless_shell: bool,
}

impl RunConfig {
    /// True when the chromium headless-shell binary should be used.
    /// The shell toggle is meaningless in headed mode.
    pub fn wants_headless_shell(&self) -> bool {
        self.headless_shell && !self.headed && self.browser == BrowserKind::Chromium
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            peek_only: false,
            debug: false,
            test: false,
            headed: false,
            browser: BrowserKind::Chromium,
            headless_shell: false,
        }
    }
}

/// Target-site parameters. Env-overridable so a site change can be worked
/// around without a rebuild.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub login_url: String,
    pub sub_path: String,
    pub timeout: Duration,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            login_url: DEFAULT_LOGIN_URL.to_string(),
            sub_path: DEFAULT_SUB_PATH.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl SiteConfig {
    /// Build the site config, honoring `PA_EXTEND_LOGIN_URL`,
    /// `PA_EXTEND_SUB_PATH` and `PA_EXTEND_TIMEOUT_MS`.
    pub fn from_env() -> Self {
        let mut site = Self::default();
        if let Ok(url) = std::env::var("PA_EXTEND_LOGIN_URL") {
            if !url.trim().is_empty() {
                site.login_url = url;
            }
        }
        if let Ok(sub) = std::env::var("PA_EXTEND_SUB_PATH") {
            if !sub.trim().is_empty() {
                site.sub_path = sub;
            }
        }
        if let Some(timeout) = std::env::var("PA_EXTEND_TIMEOUT_MS")
            .ok()
            .and_then(|v| parse_timeout_ms(&v))
        {
            site.timeout = timeout;
        }
        site
    }
}

/// Parse a millisecond timeout override. Zero and garbage are rejected.
pub fn parse_timeout_ms(value: &str) -> Option<Duration> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
}

/// Resolved locations of the two local files this tool owns.
#[derive(Debug, Clone)]
pub struct RunPaths {
    /// TOML file holding `username` and `password`.
    pub credentials: PathBuf,
    /// Single Unix timestamp of the last attempted run.
    pub last_run: PathBuf,
}

impl RunPaths {
    /// Resolve paths from `PA_EXTEND_CREDENTIALS` / `PA_EXTEND_LAST_RUN`,
    /// falling back to the user data directory.
    pub fn resolve() -> Result<Self> {
        let credentials = match std::env::var_os("PA_EXTEND_CREDENTIALS") {
            Some(path) => PathBuf::from(path),
            None => data_root()?.join("credentials.toml"),
        };
        let last_run = match std::env::var_os("PA_EXTEND_LAST_RUN") {
            Some(path) => PathBuf::from(path),
            None => data_root()?.join("last_run.txt"),
        };
        Ok(Self {
            credentials,
            last_run,
        })
    }
}

fn data_root() -> Result<PathBuf> {
    let base = dirs::data_dir().context("Could not find a data directory")?;
    Ok(base.join("pythonanywhere-extend"))
}
