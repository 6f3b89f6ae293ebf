//! Credential loading for the PythonAnywhere login form.
//!
//! Credentials live in a local TOML file with `username` and `password`
//! keys. When the file is missing the user is prompted once and the values
//! are saved back. Validation happens here, at the boundary: an incomplete
//! file is a fatal configuration error before any browser is launched.

use std::path::Path;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::RunError;

/// Validated login credentials. Both fields are guaranteed non-empty.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialFile {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

impl Credentials {
    /// Validate a username/password pair, rejecting empty fields.
    pub fn validated(username: String, password: String) -> Result<Self, RunError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(RunError::Configuration(
                "Invalid credentials: username and password must both be set".to_string(),
            ));
        }
        Ok(Self {
            username: username.trim().to_string(),
            password: SecretString::from(password),
        })
    }

    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

/// Load credentials from `path`. Missing or incomplete contents are fatal.
pub fn load(path: &Path) -> Result<Credentials, RunError> {
    let content = std::fs::read_to_string(path).map_err(|err| {
        RunError::Configuration(format!(
            "Invalid credentials: cannot read {}: {err}",
            path.display()
        ))
    })?;
    parse(&content, path)
}

fn parse(content: &str, path: &Path) -> Result<Credentials, RunError> {
    let file: CredentialFile = toml::from_str(content).map_err(|err| {
        RunError::Configuration(format!(
            "Invalid credentials: cannot parse {}: {err}",
            path.display()
        ))
    })?;
    Credentials::validated(file.username, file.password)
}

/// Load credentials from `path`, prompting interactively (and saving the
/// answers) if the file does not exist.
pub fn load_or_prompt(path: &Path) -> Result<Credentials, RunError> {
    if path.is_file() {
        debug!(file = %path.display(), "reading credential file");
        return load(path);
    }

    println!("Please enter your PythonAnywhere username and password.");
    println!("(They are saved locally on this device and sent only to the login form.)");
    let username: String = dialoguer::Input::new()
        .with_prompt("Username")
        .interact_text()
        .map_err(prompt_error)?;
    let password = dialoguer::Password::new()
        .with_prompt("Password")
        .interact()
        .map_err(prompt_error)?;

    let credentials = Credentials::validated(username, password)?;
    save(path, &credentials)?;
    Ok(credentials)
}

/// Ctrl-C inside the prompt is a user interrupt, not a bad credential file;
/// it takes the interrupt exit path. Everything else is a configuration
/// error.
fn prompt_error(err: dialoguer::Error) -> RunError {
    match err {
        dialoguer::Error::IO(io_err) if io_err.kind() == std::io::ErrorKind::Interrupted => {
            RunError::Interrupted
        }
        err => RunError::Configuration(format!("Invalid credentials: {err}")),
    }
}

fn save(path: &Path, credentials: &Credentials) -> Result<(), RunError> {
    let file = CredentialFile {
        username: credentials.username.clone(),
        password: credentials.password().to_string(),
    };
    let content = toml::to_string_pretty(&file).map_err(|err| {
        RunError::Configuration(format!("Failed to serialize credentials: {err}"))
    })?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|err| {
            RunError::Configuration(format!(
                "Failed to create {}: {err}",
                parent.display()
            ))
        })?;
    }
    std::fs::write(path, content).map_err(|err| {
        RunError::Configuration(format!("Failed to write {}: {err}", path.display()))
    })?;
    info!(file = %path.display(), "saved credentials");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn loads_complete_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.toml");
        std::fs::write(&path, "username = \"alice\"\npassword = \"hunter2\"\n").unwrap();

        let credentials = load(&path).unwrap();
        assert_eq!(credentials.username, "alice");
        assert_eq!(credentials.password(), "hunter2");
    }

    #[test]
    fn missing_password_is_a_configuration_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.toml");
        std::fs::write(&path, "username = \"alice\"\n").unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, RunError::Configuration(_)));
        assert!(err.to_string().contains("Invalid credentials"));
    }

    #[test]
    fn missing_file_is_a_configuration_error() {
        let dir = TempDir::new().unwrap();
        let err = load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, RunError::Configuration(_)));
    }

    #[test]
    fn whitespace_username_is_rejected() {
        let err = Credentials::validated("   ".to_string(), "pw".to_string()).unwrap_err();
        assert!(matches!(err, RunError::Configuration(_)));
    }

    #[test]
    fn username_is_trimmed() {
        let credentials =
            Credentials::validated(" alice \n".to_string(), "pw".to_string()).unwrap();
        assert_eq!(credentials.username, "alice");
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("credentials.toml");
        let credentials =
            Credentials::validated("alice".to_string(), "hunter2".to_string()).unwrap();

        save(&path, &credentials).unwrap();
        let reloaded = load(&path).unwrap();
        assert_eq!(reloaded.username, "alice");
        assert_eq!(reloaded.password(), "hunter2");
    }

    #[test]
    fn interrupted_prompt_takes_the_interrupt_path() {
        let err = dialoguer::Error::IO(std::io::Error::from(std::io::ErrorKind::Interrupted));
        assert!(matches!(prompt_error(err), RunError::Interrupted));
    }

    #[test]
    fn other_prompt_failures_are_configuration_errors() {
        let err = dialoguer::Error::IO(std::io::Error::from(std::io::ErrorKind::UnexpectedEof));
        let mapped = prompt_error(err);
        assert!(matches!(mapped, RunError::Configuration(_)));
        assert!(mapped.to_string().contains("Invalid credentials"));
    }

    #[test]
    fn debug_output_redacts_password() {
        let credentials =
            Credentials::validated("alice".to_string(), "hunter2".to_string()).unwrap();
        let rendered = format!("{credentials:?}");
        assert!(!rendered.contains("hunter2"));
    }
}
