//! Remote PR Opener (C5).
//!
//! Best-effort: called only after a successful push, and its failures are
//! demoted to a warning by the driver rather than propagated as a fatal
//! install error. Never escalates past the driver, and never lets the
//! bearer token's value reach a log line or error message.

use std::time::Duration;

use crate::auth::AuthMethod;
use crate::branch::BranchName;
use crate::error::{RemoteAuthError, RemotePrError};
use crate::exec;

pub struct PrRequest<'a> {
    pub owner_repo: &'a str,
    pub head_branch: &'a BranchName,
    pub base_branch: &'a str,
    pub title: &'a str,
    pub body: &'a str,
}

#[derive(Debug)]
pub enum PrOutcome {
    Created { url: String },
    NoAuthAvailable,
}

/// Attempt, in order: bearer-token REST call, then delegated `gh` CLI, then
/// a non-error "no auth available" outcome. Any failure in the first two is
/// returned as an error for the caller to demote; it is never silently
/// retried into the next method once credentials of that kind exist.
pub fn open_pull_request(auth: &AuthMethod, request: &PrRequest<'_>) -> Result<PrOutcome, PrError> {
    match auth {
        AuthMethod::BearerToken(token) => {
            create_via_rest(token.expose(), request).map_err(PrError::Pr)
        }
        AuthMethod::DelegatedCli(gh_path) => {
            create_via_delegated_cli(gh_path, request).map_err(PrError::Pr)
        }
        AuthMethod::None => Ok(PrOutcome::NoAuthAvailable),
    }
}

#[derive(Debug)]
pub enum PrError {
    Auth(RemoteAuthError),
    Pr(RemotePrError),
}

impl std::fmt::Display for PrError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrError::Auth(e) => write!(f, "{e}"),
            PrError::Pr(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for PrError {}

fn create_via_rest(token: &str, request: &PrRequest<'_>) -> Result<PrOutcome, RemotePrError> {
    let client = reqwest::blocking::Client::new();
    let url = format!("https://api.github.com/repos/{}/pulls", request.owner_repo);

    let response = client
        .post(&url)
        .bearer_auth(token)
        .header("User-Agent", "githooks-installer")
        .header("Accept", "application/vnd.github+json")
        .json(&serde_json::json!({
            "title": request.title,
            "body": request.body,
            "head": request.head_branch.to_string(),
            "base": request.base_branch,
        }))
        .send()
        .map_err(|e| RemotePrError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(RemotePrError::Http { status: status.as_u16(), body });
    }

    let parsed: serde_json::Value = response
        .json()
        .map_err(|e| RemotePrError::Network(e.to_string()))?;
    let pr_url = parsed
        .get("html_url")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    Ok(PrOutcome::Created { url: pr_url })
}

fn create_via_delegated_cli(
    gh_path: &std::path::Path,
    request: &PrRequest<'_>,
) -> Result<PrOutcome, RemotePrError> {
    let mut cmd = std::process::Command::new(gh_path);
    cmd.args([
        "pr",
        "create",
        "--head",
        &request.head_branch.to_string(),
        "--base",
        request.base_branch,
        "--title",
        request.title,
        "--body",
        request.body,
    ]);

    let output = exec::run(&mut cmd, Duration::from_secs(30), Some("pr-create"))
        .map_err(|e| RemotePrError::Network(e.to_string()))?;

    if !output.status.success() {
        return Err(RemotePrError::DelegatedCliFailed {
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok(PrOutcome::Created { url })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_auth_is_non_error_outcome() {
        let branch = BranchName::try_from("feat/githooks-installation-20260101-000000").unwrap();
        let request = PrRequest {
            owner_repo: "example/repo",
            head_branch: &branch,
            base_branch: "main",
            title: "feat(installer): install git hooks with automated file tracking",
            body: "body",
        };
        let outcome = open_pull_request(&AuthMethod::None, &request).unwrap();
        assert!(matches!(outcome, PrOutcome::NoAuthAvailable));
    }

    #[test]
    fn delegated_cli_not_found_is_a_network_style_error() {
        let branch = BranchName::try_from("feat/githooks-installation-20260101-000000").unwrap();
        let request = PrRequest {
            owner_repo: "example/repo",
            head_branch: &branch,
            base_branch: "main",
            title: "title",
            body: "body",
        };
        let auth = AuthMethod::DelegatedCli("/definitely/not/a/real/gh/binary".into());
        let err = open_pull_request(&auth, &request).unwrap_err();
        assert!(matches!(err, PrError::Pr(RemotePrError::Network(_))));
    }
}
