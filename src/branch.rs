//! Branch name validation and generation.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

/// Matches the subset of `git check-ref-format --branch` that the installer
/// will ever generate or accept: no leading/trailing dashes or dots, no `..`,
/// no whitespace or control characters, no `~^:?*[\`, no trailing `.lock`.
static VALID_BRANCH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._/-]*[A-Za-z0-9]$").expect("branch regex is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BranchName(String);

#[derive(Debug)]
pub struct InvalidBranchName(pub String);

impl fmt::Display for InvalidBranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not a valid branch name", self.0)
    }
}

impl std::error::Error for InvalidBranchName {}

/// `git check-ref-format` itself has no hard length cap, but the installer
/// constrains generated and user-supplied names to 255 bytes so a name never
/// fails deep inside a `git` subprocess call with an opaque error.
const MAX_BRANCH_NAME_LEN: usize = 255;

impl TryFrom<&str> for BranchName {
    type Error = InvalidBranchName;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if value.len() > MAX_BRANCH_NAME_LEN
            || !VALID_BRANCH.is_match(value)
            || value.contains("..")
            || value.ends_with(".lock")
        {
            return Err(InvalidBranchName(value.to_string()));
        }
        Ok(BranchName(value.to_string()))
    }
}

impl TryFrom<String> for BranchName {
    type Error = InvalidBranchName;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        BranchName::try_from(value.as_str())
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Build the branch name the installer commits to:
/// `<prefix>-<YYYYMMDD>-<HHMMSS>`, where `prefix` defaults to
/// `feat/githooks-installation` but can be overridden.
pub fn generate(prefix: &str, now: u64) -> BranchName {
    let suffix = chrono::DateTime::from_timestamp(now as i64, 0)
        .map(|dt| dt.format("%Y%m%d-%H%M%S").to_string())
        .unwrap_or_else(|| now.to_string());
    let candidate = format!("{prefix}-{suffix}");
    BranchName::try_from(candidate.as_str())
        .unwrap_or_else(|_| BranchName(sanitize(&candidate)))
}

fn sanitize(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '/' || c == '.' {
            c
        } else {
            '-'
        })
        .collect();
    let truncated = match cleaned.char_indices().nth(MAX_BRANCH_NAME_LEN) {
        Some((byte_idx, _)) => &cleaned[..byte_idx],
        None => cleaned.as_str(),
    };
    let trimmed = truncated.trim_matches(|c: char| c == '-' || c == '.');
    if trimmed.is_empty() {
        "githooks-installation".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_normal_branch_names() {
        assert!(BranchName::try_from("feat/githooks-installation-20260101-000000").is_ok());
        assert!(BranchName::try_from("main").is_ok());
    }

    #[test]
    fn rejects_leading_dash() {
        assert!(BranchName::try_from("-evil").is_err());
    }

    #[test]
    fn rejects_double_dot() {
        assert!(BranchName::try_from("feat/foo..bar").is_err());
    }

    #[test]
    fn rejects_dot_lock_suffix() {
        assert!(BranchName::try_from("feature.lock").is_err());
    }

    #[test]
    fn rejects_whitespace() {
        assert!(BranchName::try_from("feat foo").is_err());
    }

    #[test]
    fn rejects_shell_metacharacters() {
        assert!(BranchName::try_from("feat;rm -rf /").is_err());
        assert!(BranchName::try_from("feat$(whoami)").is_err());
    }

    #[test]
    fn generate_produces_valid_branch() {
        let branch = generate("feat/githooks-installation", 1_735_689_600);
        assert!(branch.as_ref().starts_with("feat/githooks-installation-"));
    }

    #[test]
    fn rejects_names_over_255_bytes() {
        let long = "a".repeat(256);
        assert!(BranchName::try_from(long.as_str()).is_err());
    }

    #[test]
    fn accepts_names_at_exactly_255_bytes() {
        let at_limit = "a".repeat(255);
        assert!(BranchName::try_from(at_limit.as_str()).is_ok());
    }

    #[test]
    fn generate_fallback_also_respects_the_length_cap() {
        let huge_prefix = "x".repeat(500);
        let branch = generate(&huge_prefix, 1_735_689_600);
        assert!(branch.as_ref().len() <= MAX_BRANCH_NAME_LEN);
    }
}
