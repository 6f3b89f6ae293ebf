//! The login-and-extend session state machine.
//!
//! One session owns one page for the duration of a run and sequences
//! login, the extend-expiry operation, and logout. Cleanup (best-effort
//! logout, page close, browser close) runs on every exit path exactly once.
//!
//! States: opened -> logged in -> extended -> logged out -> closed, with an
//! error path from any state straight to cleanup.

use tracing::{debug, info, warn};

use crate::browser;
use crate::clock::Clock;
use crate::config::{RunConfig, SiteConfig};
use crate::credentials::Credentials;
use crate::error::RunError;
use crate::last_run::LastRunStore;
use crate::page::{CdpPage, PageError, PageOps};
use crate::selectors::Selectors;

/// How the extend step ended. The timed-out reload is a warning, not a
/// failure: the click may have registered server-side even though the
/// client-side wait lapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtendOutcome {
    /// Button clicked, page reloaded, refreshed date read.
    Extended { expiry: String },
    /// Button clicked but the reload timed out; the date may be stale.
    ReloadTimedOut { expiry: String },
    /// Peek mode: date read, nothing clicked.
    Peeked { expiry: String },
}

impl ExtendOutcome {
    /// Whether the extend click was actually attempted.
    pub fn attempted(&self) -> bool {
        !matches!(self, ExtendOutcome::Peeked { .. })
    }
}

/// Run-scoped session state over one page.
pub struct Session<P: PageOps> {
    page: P,
    selectors: Selectors,
    site: SiteConfig,
    is_logged_in: bool,
    sub_url: Option<String>,
}

impl<P: PageOps> Session<P> {
    pub fn new(page: P, selectors: Selectors, site: SiteConfig) -> Self {
        Self {
            page,
            selectors,
            site,
            is_logged_in: false,
            sub_url: None,
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.is_logged_in
    }

    /// The web-apps page URL, known only after login.
    pub fn sub_url(&self) -> Option<&str> {
        self.sub_url.as_deref()
    }

    /// Log in via the login form.
    ///
    /// Success requires the credentials to be accepted AND the logout
    /// control to be present; only then is the session considered logged in
    /// and the web-apps sub-URL derived from the post-login page URL.
    pub async fn login(&mut self, credentials: &Credentials) -> Result<(), RunError> {
        let login_url = self.site.login_url.clone();
        self.navigate(&login_url, "loading the login page").await?;

        // The form is client-rendered; wait for content, not just the
        // response.
        self.page
            .wait_visible(&self.selectors.username_input)
            .await
            .map_err(|err| classify(err, "waiting for the login form"))?;

        self.page
            .type_text(&self.selectors.username_input, &credentials.username)
            .await
            .map_err(|err| classify(err, "entering the username"))?;
        self.page
            .type_text(&self.selectors.password_input, credentials.password())
            .await
            .map_err(|err| classify(err, "entering the password"))?;

        self.page
            .click_and_wait(&self.selectors.login_button)
            .await
            .map_err(|err| classify(err, "logging in"))?;

        if self
            .page
            .is_visible(&self.selectors.login_error)
            .await
            .map_err(|err| classify(err, "checking for a login error"))?
        {
            let text = self
                .page
                .inner_text(&self.selectors.login_error)
                .await
                .unwrap_or_default();
            return Err(RunError::Configuration(format!(
                "Unable to log in: {}",
                text.trim()
            )));
        }

        if !self
            .page
            .exists(&self.selectors.logout_button)
            .await
            .map_err(|err| classify(err, "looking for the logout button"))?
        {
            return Err(RunError::element(
                self.selectors.logout_button.clone(),
                "Maybe logged in but couldn't find the logout button",
            ));
        }

        let base = self
            .page
            .current_url()
            .await
            .map_err(|err| classify(err, "reading the page URL"))?;
        self.sub_url = Some(derive_sub_url(&base, &self.site.sub_path));
        self.is_logged_in = true;
        info!("Logged in.");
        Ok(())
    }

    /// Navigate to the web-apps page and extend (or just read) the expiry
    /// date. A timeout waiting for the expiry element is fatal; a timeout
    /// waiting for the post-click reload is not.
    pub async fn extend(&mut self, peek_only: bool) -> Result<ExtendOutcome, RunError> {
        let url = self.sub_url.clone().ok_or_else(|| {
            RunError::Configuration("Extend requested before login".to_string())
        })?;
        self.navigate(&url, "loading the web-apps page").await?;

        self.page
            .wait_visible(&self.selectors.expiry_date)
            .await
            .map_err(|err| classify(err, "waiting for the expiry date"))?;

        if peek_only {
            info!("Peek only (the extend button will not be clicked)");
            let expiry = self.read_expiry().await?;
            info!("Current expiry date: {expiry}");
            return Ok(ExtendOutcome::Peeked { expiry });
        }

        let expiry = self.read_expiry().await?;
        debug!("Initial expiry date: {expiry}");

        let visible = self
            .page
            .is_visible(&self.selectors.extend_button)
            .await
            .map_err(|err| classify(err, "looking for the extend button"))?;
        let enabled = self
            .page
            .is_enabled(&self.selectors.extend_button)
            .await
            .map_err(|err| classify(err, "looking for the extend button"))?;
        if !(visible && enabled) {
            return Err(RunError::element(
                self.selectors.extend_button.clone(),
                "Extend button not found or disabled",
            ));
        }

        // The page reloads once the button is clicked.
        match self
            .page
            .click_and_wait(&self.selectors.extend_button)
            .await
        {
            Ok(()) => {
                info!("Expiry date extended successfully.");
                let expiry = self.read_expiry().await?;
                info!("Current expiry date: {expiry}");
                Ok(ExtendOutcome::Extended { expiry })
            }
            Err(PageError::Timeout(budget)) => {
                warn!(
                    "Timed out reloading the page after {} s; the click may still have registered",
                    budget.as_secs_f64()
                );
                let expiry = self.read_expiry().await.unwrap_or_default();
                info!("Current expiry date: {expiry}");
                Ok(ExtendOutcome::ReloadTimedOut { expiry })
            }
            Err(err) => Err(classify(err, "clicking the extend button")),
        }
    }

    /// Best-effort logout. Failures are logged and swallowed so they never
    /// mask the primary outcome.
    pub async fn logout(&mut self) {
        if !self.is_logged_in {
            return;
        }
        match self.page.click(&self.selectors.logout_button).await {
            Ok(()) => {
                self.is_logged_in = false;
                info!("Logged out.");
            }
            Err(err) => warn!("Logout failed: {err}"),
        }
    }

    /// Close the page target. Failures are logged at debug only.
    pub async fn close(mut self) {
        if let Err(err) = self.page.close().await {
            debug!("Page close failed: {err}");
        }
    }

    async fn navigate(&self, url: &str, action: &str) -> Result<(), RunError> {
        match self.page.goto(url).await {
            Ok(()) => Ok(()),
            Err(PageError::Timeout(budget)) => Err(RunError::timeout(action, budget)),
            Err(PageError::Driver(source)) => Err(RunError::Navigation {
                url: url.to_string(),
                source,
            }),
            Err(err) => Err(classify(err, action)),
        }
    }

    async fn read_expiry(&self) -> Result<String, RunError> {
        let text = self
            .page
            .inner_text(&self.selectors.expiry_date)
            .await
            .map_err(|err| classify(err, "reading the expiry date"))?;
        Ok(text.trim().to_string())
    }
}

/// Map a page-level outcome to the run taxonomy, naming the step.
fn classify(err: PageError, action: &str) -> RunError {
    match err {
        PageError::Timeout(budget) => RunError::timeout(action, budget),
        PageError::NotFound { selector } => RunError::element(
            selector,
            format!("Element not found while {action}"),
        ),
        PageError::Driver(source) => RunError::Other(
            anyhow::Error::from_boxed(source)
                .context(format!("Page operation failed while {action}")),
        ),
    }
}

fn derive_sub_url(base: &str, sub_path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), sub_path)
}

/// Drive the step sequence over an open session. Performs no cleanup; pair
/// with [`run_session`].
pub async fn drive<P: PageOps>(
    session: &mut Session<P>,
    config: &RunConfig,
    credentials: &Credentials,
    last_run: &LastRunStore,
    clock: &dyn Clock,
) -> Result<Option<ExtendOutcome>, RunError> {
    if config.test {
        info!("*** Test only (no operation) ***");
        return Ok(None);
    }

    session.login(credentials).await?;
    let outcome = session.extend(config.peek_only).await?;

    // "Attempted" marker: written for the warning sub-path too, since the
    // click may have landed server-side.
    if outcome.attempted() {
        last_run.record(clock)?;
        debug!(file = %last_run.path().display(), "recorded last run");
    }

    Ok(Some(outcome))
}

/// Drive a session to completion with guaranteed cleanup: logout is
/// attempted when logged in, and the page is closed, on every exit path.
pub async fn run_session<P: PageOps>(
    mut session: Session<P>,
    config: &RunConfig,
    credentials: &Credentials,
    last_run: &LastRunStore,
    clock: &dyn Clock,
) -> Result<Option<ExtendOutcome>, RunError> {
    let result = drive(&mut session, config, credentials, last_run, clock).await;
    session.logout().await;
    session.close().await;
    result
}

/// Full production run: provision a browser, open one page, drive the
/// session, and tear everything down exactly once.
pub async fn run(
    config: &RunConfig,
    site: &SiteConfig,
    credentials: &Credentials,
    last_run: &LastRunStore,
    clock: &dyn Clock,
) -> Result<(), RunError> {
    let handle = browser::provision(config).await?;

    let result = match handle.new_page().await {
        Ok(page) => {
            let session = Session::new(
                CdpPage::new(page, site.timeout),
                Selectors::default(),
                site.clone(),
            );
            run_session(session, config, credentials, last_run, clock).await
        }
        Err(err) => Err(err),
    };

    handle.close().await;
    info!("Browser closed.");
    result.map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_url_appends_the_sub_path() {
        assert_eq!(
            derive_sub_url("https://www.pythonanywhere.com/user/alice", "webapps"),
            "https://www.pythonanywhere.com/user/alice/webapps"
        );
    }

    #[test]
    fn sub_url_collapses_trailing_slashes() {
        assert_eq!(
            derive_sub_url("https://www.pythonanywhere.com/user/alice/", "webapps"),
            "https://www.pythonanywhere.com/user/alice/webapps"
        );
    }

    #[test]
    fn driver_causes_survive_classification() {
        let source: crate::error::BoxError = Box::new(std::io::Error::new(
            std::io::ErrorKind::Other,
            "socket closed",
        ));
        let err = classify(PageError::Driver(source), "clicking the extend button");
        assert_eq!(
            err.to_string(),
            "Page operation failed while clicking the extend button"
        );
        let cause = std::error::Error::source(&err).expect("cause preserved");
        assert_eq!(cause.to_string(), "socket closed");
    }

    #[test]
    fn peek_outcome_is_not_an_attempt() {
        assert!(!ExtendOutcome::Peeked {
            expiry: "x".to_string()
        }
        .attempted());
        assert!(ExtendOutcome::ReloadTimedOut {
            expiry: "x".to_string()
        }
        .attempted());
        assert!(ExtendOutcome::Extended {
            expiry: "x".to_string()
        }
        .attempted());
    }
}
