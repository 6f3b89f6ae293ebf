//! Reports whether too long has passed since the last run.
//!
//! Exits 1 with a message when the last-run record is more than 60 days old
//! (or missing); exits 0 silently otherwise. Meant for cron/shell-profile
//! use, so the quiet path stays quiet.

use std::process::ExitCode;

use pythonanywhere_extend::clock::SystemClock;
use pythonanywhere_extend::config::RunPaths;
use pythonanywhere_extend::last_run::{LastRunStore, OVERDUE_AFTER};

fn main() -> ExitCode {
    let paths = match RunPaths::resolve() {
        Ok(paths) => paths,
        Err(err) => {
            eprintln!("{err:#}");
            return ExitCode::from(1);
        }
    };

    let store = LastRunStore::new(&paths.last_run);
    match store.is_overdue(&SystemClock, OVERDUE_AFTER) {
        Ok(false) => ExitCode::SUCCESS,
        Ok(true) => {
            println!(
                "It's been more than 60 days since 'pa-extend' last ran. \
                 Run it again to keep your webapp from expiring."
            );
            ExitCode::from(1)
        }
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(1)
        }
    }
}
