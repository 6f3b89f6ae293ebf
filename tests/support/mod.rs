//! Scripted page driver for session tests.
//!
//! Records every operation the session performs and answers queries from a
//! fixed scenario, so tests can assert both outcomes and the exact step
//! sequence without a browser.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pythonanywhere_extend::page::{PageError, PageOps};
use pythonanywhere_extend::selectors::Selectors;

const BUDGET: Duration = Duration::from_secs(30);

#[derive(Debug, Default)]
pub struct Recorder {
    pub calls: Vec<String>,
    pub closes: u32,
}

/// A page whose behavior is fixed up front.
pub struct FakePage {
    recorder: Arc<Mutex<Recorder>>,
    selectors: Selectors,
    pub current_url: String,
    /// Text of the inline login-error element; `Some` makes it visible.
    pub login_error: Option<String>,
    pub logout_present: bool,
    /// `false` makes the expiry-element wait run out the budget.
    pub expiry_visible: bool,
    pub expiry_text: String,
    pub extend_present: bool,
    pub extend_enabled: bool,
    /// Makes the post-click reload wait time out.
    pub reload_times_out: bool,
    pub logout_click_fails: bool,
}

impl FakePage {
    /// A page where every step succeeds.
    pub fn happy() -> Self {
        Self {
            recorder: Arc::new(Mutex::new(Recorder::default())),
            selectors: Selectors::default(),
            current_url: "https://www.pythonanywhere.com/user/alice/".to_string(),
            login_error: None,
            logout_present: true,
            expiry_visible: true,
            expiry_text: "Thursday 26 November 2026".to_string(),
            extend_present: true,
            extend_enabled: true,
            reload_times_out: false,
            logout_click_fails: false,
        }
    }

    /// Shared handle to the call log, usable after the session consumes
    /// the page.
    pub fn recorder(&self) -> Arc<Mutex<Recorder>> {
        Arc::clone(&self.recorder)
    }

    fn record(&self, entry: String) {
        self.recorder.lock().unwrap().calls.push(entry);
    }
}

#[async_trait]
impl PageOps for FakePage {
    async fn goto(&self, url: &str) -> Result<(), PageError> {
        self.record(format!("goto:{url}"));
        Ok(())
    }

    async fn current_url(&self) -> Result<String, PageError> {
        Ok(self.current_url.clone())
    }

    async fn wait_visible(&self, selector: &str) -> Result<(), PageError> {
        self.record(format!("wait:{selector}"));
        if selector == self.selectors.expiry_date && !self.expiry_visible {
            return Err(PageError::Timeout(BUDGET));
        }
        Ok(())
    }

    async fn is_visible(&self, selector: &str) -> Result<bool, PageError> {
        Ok(if selector == self.selectors.login_error {
            self.login_error.is_some()
        } else if selector == self.selectors.expiry_date {
            self.expiry_visible
        } else if selector == self.selectors.extend_button {
            self.extend_present
        } else {
            true
        })
    }

    async fn is_enabled(&self, selector: &str) -> Result<bool, PageError> {
        Ok(if selector == self.selectors.extend_button {
            self.extend_enabled
        } else {
            true
        })
    }

    async fn exists(&self, selector: &str) -> Result<bool, PageError> {
        Ok(if selector == self.selectors.logout_button {
            self.logout_present
        } else {
            true
        })
    }

    async fn inner_text(&self, selector: &str) -> Result<String, PageError> {
        Ok(if selector == self.selectors.login_error {
            self.login_error.clone().unwrap_or_default()
        } else if selector == self.selectors.expiry_date {
            self.expiry_text.clone()
        } else {
            String::new()
        })
    }

    async fn type_text(&self, selector: &str, _text: &str) -> Result<(), PageError> {
        self.record(format!("type:{selector}"));
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), PageError> {
        self.record(format!("click:{selector}"));
        if selector == self.selectors.logout_button && self.logout_click_fails {
            return Err(PageError::NotFound {
                selector: selector.to_string(),
            });
        }
        Ok(())
    }

    async fn click_and_wait(&self, selector: &str) -> Result<(), PageError> {
        self.record(format!("clicknav:{selector}"));
        if selector == self.selectors.extend_button && self.reload_times_out {
            return Err(PageError::Timeout(BUDGET));
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), PageError> {
        self.recorder.lock().unwrap().closes += 1;
        Ok(())
    }
}
