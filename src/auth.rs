//! Authentication for the Remote PR Opener (C5).
//!
//! Resolved once from the environment before the driver runs; the core
//! installer never prompts interactively — that concern stays in the CLI
//! layer, which hands the core an already-resolved [`AuthMethod`].

use std::fmt;
use std::path::PathBuf;

/// A token value that never appears in `Debug` output and is only ever
/// compared or sent, never logged.
#[derive(Clone)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: String) -> Self {
        Self(value)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString(<redacted, {} bytes>)", self.0.len())
    }
}

#[derive(Debug, Clone)]
pub enum AuthMethod {
    None,
    BearerToken(SecretString),
    DelegatedCli(PathBuf),
}

impl AuthMethod {
    /// Derive the auth method from the environment: a bearer token via
    /// `GITHUB_TOKEN` then `GH_TOKEN` (first non-empty wins), else the `gh`
    /// CLI on PATH, else `None`.
    pub fn from_env() -> Self {
        for var in ["GITHUB_TOKEN", "GH_TOKEN"] {
            if let Ok(value) = std::env::var(var)
                && !value.is_empty()
            {
                return AuthMethod::BearerToken(SecretString::new(value));
            }
        }

        if let Some(gh) = which_gh() {
            return AuthMethod::DelegatedCli(gh);
        }

        AuthMethod::None
    }

    /// Replace any occurrence of the held secret's value in `s` with a
    /// fixed placeholder, so diagnostics can safely include subprocess
    /// stderr or HTTP response bodies that might otherwise leak it.
    pub fn redact(&self, s: &str) -> String {
        match self {
            AuthMethod::BearerToken(secret) if !secret.is_empty() => {
                s.replace(secret.expose(), "<redacted>")
            }
            _ => s.to_string(),
        }
    }
}

fn which_gh() -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var).find_map(|dir| {
        let candidate = dir.join("gh");
        candidate.is_file().then_some(candidate)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_debug_never_shows_value() {
        let secret = SecretString::new("super-secret-token".to_string());
        let debug = format!("{secret:?}");
        assert!(!debug.contains("super-secret-token"));
        assert!(debug.contains("18"));
    }

    #[test]
    fn redact_scrubs_token_from_message() {
        let auth = AuthMethod::BearerToken(SecretString::new("ghp_abc123".to_string()));
        let message = "request failed: Authorization: Bearer ghp_abc123 rejected";
        let redacted = auth.redact(message);
        assert!(!redacted.contains("ghp_abc123"));
        assert!(redacted.contains("<redacted>"));
    }

    #[test]
    fn redact_is_noop_without_token() {
        let auth = AuthMethod::None;
        assert_eq!(auth.redact("plain message"), "plain message");
    }
}
