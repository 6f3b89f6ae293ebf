use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pythonanywhere_extend::clock::SystemClock;
use pythonanywhere_extend::config::{BrowserKind, RunConfig, RunPaths, SiteConfig};
use pythonanywhere_extend::error::RunError;
use pythonanywhere_extend::last_run::LastRunStore;
use pythonanywhere_extend::{credentials, report, session};

#[derive(Debug, Parser)]
#[command(name = "pa-extend")]
#[command(about = "Extends the expiry date of your webapp on PythonAnywhere")]
struct Cli {
    /// Run in headed mode (default: headless)
    #[arg(short = 'H', long)]
    headed: bool,

    /// Browser engine to drive
    #[arg(short, long, value_enum, default_value_t = BrowserKind::Chromium)]
    browser: BrowserKind,

    /// Use a separate chromium headless shell instead of the new headless mode
    #[arg(long = "headless-shell")]
    headless_shell: bool,

    /// Find the expiry date and exit without clicking the extend button
    #[arg(long)]
    peek: bool,

    /// Debug logging, including full error detail
    #[arg(long)]
    debug: bool,

    /// Open a page and exit without any further operation
    #[arg(long)]
    test: bool,
}

impl Cli {
    fn run_config(&self) -> RunConfig {
        RunConfig {
            peek_only: self.peek,
            debug: self.debug,
            test: self.test,
            headed: self.headed,
            browser: self.browser,
            headless_shell: self.headless_shell,
        }
    }
}

fn init_tracing(debug: bool) {
    let quiet_cdp = "chromiumoxide=warn,chromiumoxide::conn=off,chromiumoxide::handler=off";
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug {
            EnvFilter::new(format!("debug,{quiet_cdp}"))
        } else {
            EnvFilter::new(format!("info,{quiet_cdp}"))
        }
    });
    if debug {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).without_time())
            .init();
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let config = cli.run_config();
    let site = SiteConfig::from_env();
    tracing::debug!(?config, ?site, "options");

    // Credentials are resolved before any browser is launched; a bad or
    // missing credential file never costs a browser start.
    let paths = match RunPaths::resolve() {
        Ok(paths) => paths,
        Err(err) => {
            report::report(&RunError::Other(err), cli.debug);
            std::process::exit(1);
        }
    };
    let credentials = match credentials::load_or_prompt(&paths.credentials) {
        Ok(credentials) => credentials,
        Err(RunError::Interrupted) => {
            eprintln!("\nInterrupted by user.");
            std::process::exit(130);
        }
        Err(err) => {
            report::report(&err, cli.debug);
            std::process::exit(1);
        }
    };

    let last_run = LastRunStore::new(&paths.last_run);
    let clock = SystemClock;

    let result = tokio::select! {
        result = session::run(&config, &site, &credentials, &last_run, &clock) => result,
        _ = tokio::signal::ctrl_c() => Err(RunError::Interrupted),
    };

    match result {
        Ok(()) => {}
        Err(RunError::Interrupted) => {
            eprintln!("\nInterrupted by user.");
            std::process::exit(130);
        }
        Err(err) => {
            report::report(&err, cli.debug);
            std::process::exit(1);
        }
    }
}
