//! Page operation primitives.
//!
//! [`PageOps`] is the seam between the session state machine and the
//! DevTools protocol: every navigation, wait, and click goes through it and
//! comes back as a classified [`PageError`] instead of a raw protocol error.
//! Tests drive the session with a scripted implementation; production uses
//! [`CdpPage`] over chromiumoxide.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use rand::Rng;

use crate::error::BoxError;

/// Polling interval for element-visibility waits.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Per-character typing delay range, drawn once per field (milliseconds).
const TYPE_DELAY_MS: std::ops::RangeInclusive<u64> = 50..=100;

/// Classified outcome of a single page operation. `Ok` is success; these are
/// the failure classes, each carrying enough context for a diagnostic
/// without re-inspecting the page.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    /// The operation exceeded the fixed budget.
    #[error("timed out after {} s", .0.as_secs_f64())]
    Timeout(Duration),

    /// No element matched the selector.
    #[error("element not found: {selector}")]
    NotFound { selector: String },

    /// Anything else from the automation channel, original cause preserved.
    #[error("page operation failed")]
    Driver(#[source] BoxError),
}

impl PageError {
    fn driver(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Driver(Box::new(err))
    }
}

/// The operations the session needs from a live page.
#[async_trait]
pub trait PageOps: Send {
    /// Navigate and wait for the DOM-ready milestone (not network idle).
    async fn goto(&self, url: &str) -> Result<(), PageError>;

    /// URL the page currently shows.
    async fn current_url(&self) -> Result<String, PageError>;

    /// Poll until the element is visible or the budget lapses.
    async fn wait_visible(&self, selector: &str) -> Result<(), PageError>;

    async fn is_visible(&self, selector: &str) -> Result<bool, PageError>;

    async fn is_enabled(&self, selector: &str) -> Result<bool, PageError>;

    async fn exists(&self, selector: &str) -> Result<bool, PageError>;

    async fn inner_text(&self, selector: &str) -> Result<String, PageError>;

    /// Focus the element and type text with a per-character delay.
    async fn type_text(&self, selector: &str, text: &str) -> Result<(), PageError>;

    /// Click without waiting for a navigation.
    async fn click(&self, selector: &str) -> Result<(), PageError>;

    /// Click and await the resulting navigation.
    async fn click_and_wait(&self, selector: &str) -> Result<(), PageError>;

    /// Close the page target.
    async fn close(&mut self) -> Result<(), PageError>;
}

/// [`PageOps`] over a chromiumoxide page.
pub struct CdpPage {
    page: Page,
    budget: Duration,
}

impl CdpPage {
    pub fn new(page: Page, budget: Duration) -> Self {
        Self { page, budget }
    }

    async fn find(&self, selector: &str) -> Result<chromiumoxide::element::Element, PageError> {
        self.page
            .find_element(selector)
            .await
            .map_err(|_| PageError::NotFound {
                selector: selector.to_string(),
            })
    }

    async fn eval_bool(&self, expression: String) -> Result<bool, PageError> {
        self.page
            .evaluate(expression)
            .await
            .map_err(PageError::driver)?
            .into_value::<bool>()
            .map_err(PageError::driver)
    }

    async fn wait_for_navigation(&self) -> Result<(), PageError> {
        match tokio::time::timeout(self.budget, self.page.wait_for_navigation()).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => Err(PageError::driver(err)),
            Err(_) => Err(PageError::Timeout(self.budget)),
        }
    }
}

#[async_trait]
impl PageOps for CdpPage {
    async fn goto(&self, url: &str) -> Result<(), PageError> {
        match tokio::time::timeout(self.budget, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => Err(PageError::driver(err)),
            Err(_) => Err(PageError::Timeout(self.budget)),
        }
    }

    async fn current_url(&self) -> Result<String, PageError> {
        let url = self.page.url().await.map_err(PageError::driver)?;
        Ok(url.unwrap_or_default())
    }

    async fn wait_visible(&self, selector: &str) -> Result<(), PageError> {
        let deadline = tokio::time::Instant::now() + self.budget;
        loop {
            if self.is_visible(selector).await? {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(PageError::Timeout(self.budget));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn is_visible(&self, selector: &str) -> Result<bool, PageError> {
        self.eval_bool(visibility_expr(selector)).await
    }

    async fn is_enabled(&self, selector: &str) -> Result<bool, PageError> {
        self.eval_bool(enabled_expr(selector)).await
    }

    async fn exists(&self, selector: &str) -> Result<bool, PageError> {
        self.eval_bool(exists_expr(selector)).await
    }

    async fn inner_text(&self, selector: &str) -> Result<String, PageError> {
        let element = self.find(selector).await?;
        let text = element.inner_text().await.map_err(PageError::driver)?;
        Ok(text.unwrap_or_default())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<(), PageError> {
        let element = self.find(selector).await?;
        element.click().await.map_err(PageError::driver)?;

        let delay = {
            let mut rng = rand::thread_rng();
            Duration::from_millis(rng.gen_range(TYPE_DELAY_MS))
        };
        for ch in text.chars() {
            let mut buf = [0u8; 4];
            element
                .type_str(&*ch.encode_utf8(&mut buf))
                .await
                .map_err(PageError::driver)?;
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), PageError> {
        let element = self.find(selector).await?;
        element.click().await.map_err(PageError::driver)?;
        Ok(())
    }

    async fn click_and_wait(&self, selector: &str) -> Result<(), PageError> {
        let element = self.find(selector).await?;
        element.click().await.map_err(PageError::driver)?;
        self.wait_for_navigation().await
    }

    async fn close(&mut self) -> Result<(), PageError> {
        self.page
            .clone()
            .close()
            .await
            .map_err(|err: CdpError| PageError::driver(err))
    }
}

/// Embed a selector as a JS string literal.
fn js_literal(selector: &str) -> String {
    serde_json::to_string(selector).unwrap_or_else(|_| String::from("\"\""))
}

fn visibility_expr(selector: &str) -> String {
    let sel = js_literal(selector);
    format!(
        "(() => {{ const el = document.querySelector({sel}); \
         if (!el) return false; \
         const r = el.getBoundingClientRect(); \
         return r.width > 0 && r.height > 0; }})()"
    )
}

fn enabled_expr(selector: &str) -> String {
    let sel = js_literal(selector);
    format!("(() => {{ const el = document.querySelector({sel}); return !!el && !el.disabled; }})()")
}

fn exists_expr(selector: &str) -> String {
    let sel = js_literal(selector);
    format!("document.querySelector({sel}) !== null")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_literal_escapes_quotes() {
        assert_eq!(
            js_literal("input.webapp_extend[type='submit']"),
            r#""input.webapp_extend[type='submit']""#
        );
        assert_eq!(js_literal(r#"a[title="x"]"#), r#""a[title=\"x\"]""#);
    }

    #[test]
    fn visibility_expr_embeds_selector_once() {
        let expr = visibility_expr("p.webapp_expiry > strong");
        assert!(expr.contains(r#""p.webapp_expiry > strong""#));
        assert!(expr.contains("getBoundingClientRect"));
    }

    #[test]
    fn timeout_display_uses_seconds() {
        let err = PageError::Timeout(Duration::from_secs(30));
        assert_eq!(err.to_string(), "timed out after 30 s");
    }
}
