//! CSS selectors for the PythonAnywhere login and web-apps pages.
//!
//! These strings are the most fragile contract in the whole tool: a markup
//! change on the site breaks exactly one of them. They live here, in one
//! table, so a fix touches one constant and no call sites. The table is
//! injected into the session at construction instead of living in process
//! globals, which also lets tests substitute their own.

/// Selector table for every control the session touches.
#[derive(Debug, Clone)]
pub struct Selectors {
    /// Username input on the login form.
    pub username_input: String,
    /// Password input on the login form.
    pub password_input: String,
    /// The "Log in" submit control.
    pub login_button: String,
    /// Inline error element shown when credentials are rejected.
    pub login_error: String,
    /// Logout control present on every logged-in page.
    pub logout_button: String,
    /// Element displaying the webapp expiry date.
    pub expiry_date: String,
    /// The "Run until 3 months from today" submit control.
    pub extend_button: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            username_input: "#id_auth-username".to_string(),
            password_input: "#id_auth-password".to_string(),
            login_button: "#id_next".to_string(),
            login_error: "#id_login_error".to_string(),
            logout_button: "button.logout_link[type='submit']".to_string(),
            expiry_date: "p.webapp_expiry > strong".to_string(),
            extend_button: "input.webapp_extend[type='submit']".to_string(),
        }
    }
}
