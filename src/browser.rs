//! Browser provisioning: resolve an executable, launch it over the DevTools
//! protocol, and install one on demand when launching fails.
//!
//! Executables are resolved from the system (`which` plus known install
//! locations) and from the Playwright browsers cache, which is also where an
//! on-demand `npx playwright install` puts them. Exactly one install attempt
//! is made; a second launch failure is fatal.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfig, HeadlessMode};
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{BrowserKind, RunConfig};
use crate::error::RunError;

/// A launched browser plus the spawned task pumping its event channel.
pub struct BrowserHandle {
    browser: Browser,
    kind: BrowserKind,
    handler_task: JoinHandle<()>,
}

impl BrowserHandle {
    pub async fn new_page(&self) -> Result<Page, RunError> {
        self.browser
            .new_page("about:blank")
            .await
            .map_err(|err| RunError::Provisioner {
                browser: self.kind.as_str().to_string(),
                source: Box::new(err),
            })
    }

    /// Close the browser and stop the event pump. Safe to call exactly once
    /// on every exit path; failures during close are ignored.
    pub async fn close(mut self) {
        let _ = self.browser.close().await;
        let _ = self.browser.wait().await;
        self.handler_task.abort();
    }
}

/// Launch the configured browser, attempting one on-demand install if the
/// first launch fails.
pub async fn provision(config: &RunConfig) -> Result<BrowserHandle, RunError> {
    match try_launch(config).await {
        Ok(handle) => Ok(handle),
        Err(first) => {
            warn!(
                "{} launch failed ({first:#}), attempting install",
                config.browser
            );
            if let Err(err) = install(config) {
                return Err(provisioner_error(config.browser, err));
            }
            try_launch(config)
                .await
                .map_err(|err| provisioner_error(config.browser, err))
        }
    }
}

fn provisioner_error(browser: BrowserKind, err: anyhow::Error) -> RunError {
    RunError::Provisioner {
        browser: browser.as_str().to_string(),
        source: err.into(),
    }
}

async fn try_launch(config: &RunConfig) -> Result<BrowserHandle> {
    let executable = resolve_executable(config.browser, config.wants_headless_shell())
        .with_context(|| format!("No {} executable found", config.browser))?;
    debug!(
        executable = %executable.display(),
        headed = config.headed,
        "launching browser"
    );

    let mut builder = BrowserConfig::builder()
        .chrome_executable(&executable)
        .viewport(None)
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--disable-infobars")
        .arg("--no-first-run")
        .arg("--no-default-browser-check");
    if config.headed {
        builder = builder.with_head();
    } else if config.wants_headless_shell() {
        builder = builder.headless_mode(HeadlessMode::True);
    } else {
        builder = builder.headless_mode(HeadlessMode::New);
    }
    let browser_config = builder
        .build()
        .map_err(|err| anyhow::anyhow!("Failed to configure browser: {err}"))?;

    let (browser, mut handler) = Browser::launch(browser_config)
        .await
        .context("Failed to launch browser")?;
    let handler_task = tokio::spawn(async move { while (handler.next().await).is_some() {} });

    Ok(BrowserHandle {
        browser,
        kind: config.browser,
        handler_task,
    })
}

/// Run `npx playwright install` for the configured engine.
fn install(config: &RunConfig) -> Result<()> {
    let args = install_args(config.browser, config.headed, config.headless_shell);
    info!("Installing {} via playwright...", config.browser);
    let status = std::process::Command::new("npx")
        .arg("playwright")
        .args(&args)
        .status()
        .context("Failed to run 'npx playwright' (is Node.js installed?)")?;
    anyhow::ensure!(
        status.success(),
        "'npx playwright {}' exited with {status}",
        args.join(" ")
    );
    info!("{} installed", config.browser);
    Ok(())
}

/// Arguments for `npx playwright <...>`. The chromium variants mirror the
/// headless-shell / new-headless split: `--only-shell` installs only the
/// separate shell binary, `--no-shell` skips it.
fn install_args(kind: BrowserKind, headed: bool, headless_shell: bool) -> Vec<&'static str> {
    match kind {
        BrowserKind::Chromium if !headed && headless_shell => {
            vec!["install", "--with-deps", "--only-shell", "chromium-headless-shell"]
        }
        BrowserKind::Chromium if !headed => {
            vec!["install", "--with-deps", "--no-shell", "chromium"]
        }
        BrowserKind::Chromium => vec!["install", "--with-deps", "chromium"],
        BrowserKind::Firefox => vec!["install", "--with-deps", "firefox"],
        BrowserKind::Webkit => vec!["install", "--with-deps", "webkit"],
    }
}

/// Find an executable for the requested engine.
fn resolve_executable(kind: BrowserKind, headless_shell: bool) -> Option<PathBuf> {
    let playwright = playwright_root();
    match kind {
        BrowserKind::Chromium if headless_shell => playwright.as_deref().and_then(|root| {
            latest_build(root, "chromium_headless_shell-", "chrome-linux/headless_shell")
        }),
        BrowserKind::Chromium => which("chromium")
            .or_else(|| which("google-chrome"))
            .or_else(find_chromium_candidate)
            .or_else(|| {
                playwright
                    .as_deref()
                    .and_then(|root| latest_build(root, "chromium-", "chrome-linux/chrome"))
            }),
        BrowserKind::Firefox => which("firefox").or_else(|| {
            playwright
                .as_deref()
                .and_then(|root| latest_build(root, "firefox-", "firefox/firefox"))
        }),
        BrowserKind::Webkit => playwright
            .as_deref()
            .and_then(|root| latest_build(root, "webkit-", "pw_run.sh")),
    }
}

/// The Playwright browsers cache, honoring `PLAYWRIGHT_BROWSERS_PATH`.
fn playwright_root() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("PLAYWRIGHT_BROWSERS_PATH") {
        return Some(PathBuf::from(path));
    }
    dirs::cache_dir().map(|cache| cache.join("ms-playwright"))
}

/// Newest build directory under `root` matching `prefix`, joined with the
/// engine-relative binary path.
fn latest_build(root: &Path, prefix: &str, relative: &str) -> Option<PathBuf> {
    let mut builds: Vec<PathBuf> = std::fs::read_dir(root)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(prefix))
        })
        .collect();
    builds.sort();
    builds
        .pop()
        .map(|dir| dir.join(relative))
        .filter(|path| path.exists())
}

fn which(name: &str) -> Option<PathBuf> {
    let output = std::process::Command::new("which").arg(name).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!path.is_empty()).then(|| PathBuf::from(path))
}

/// Known chromium install locations, checked when `which` finds nothing.
fn find_chromium_candidate() -> Option<PathBuf> {
    let candidates = [
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        "/run/current-system/sw/bin/google-chrome",
        "/run/current-system/sw/bin/chromium",
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
    ];
    candidates
        .iter()
        .map(Path::new)
        .find(|path| path.exists())
        .map(Path::to_path_buf)
}
