//! Installer options: CLI flags layered over environment variable
//! overrides. There is no on-disk config file — this tool takes one
//! target repository per invocation and the full set of tunables fits in a
//! flat, closed struct, so a layered-TOML config system would be
//! over-engineering for this scope (see DESIGN.md).

use std::path::PathBuf;
use std::time::Duration;

use crate::tracker::{DEFAULT_MAX_BYTES, DEFAULT_MAX_FILES};

pub const DEFAULT_BRANCH_PREFIX: &str = "feat/githooks-installation";
pub const DEFAULT_GIT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LOCK_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct Options {
    pub target_repo: PathBuf,
    pub source: Option<PathBuf>,
    pub check_only: bool,
    pub force: bool,
    pub no_ci: bool,
    pub branch_prefix: String,
    pub max_files: usize,
    pub max_bytes: u64,
    pub git_timeout: Duration,
    pub lock_timeout: Duration,
}

impl Options {
    /// Build options from parsed CLI flags, letting environment variables
    /// supply defaults for values the CLI did not set. CLI flags always win
    /// when both are present.
    pub fn from_cli(cli: &crate::cli::Cli) -> Self {
        Self {
            target_repo: cli.target_repo.clone(),
            source: cli.source.clone(),
            check_only: cli.check,
            force: cli.force,
            no_ci: cli.no_ci,
            branch_prefix: env_string("GITHOOKS_INSTALLER_BRANCH_PREFIX")
                .unwrap_or_else(|| DEFAULT_BRANCH_PREFIX.to_string()),
            max_files: env_usize("GITHOOKS_MAX_FILES").unwrap_or(DEFAULT_MAX_FILES),
            max_bytes: env_u64("GITHOOKS_MAX_BYTES").unwrap_or(DEFAULT_MAX_BYTES),
            git_timeout: Duration::from_secs(
                env_u64("GITHOOKS_GIT_TIMEOUT").unwrap_or(DEFAULT_GIT_TIMEOUT_SECS),
            ),
            lock_timeout: Duration::from_secs(DEFAULT_LOCK_TIMEOUT_SECS),
        }
    }

    /// Directory the installable payload tree is read from: `--source` if
    /// given, else a `payload/` directory adjacent to the running binary.
    pub fn source_dir(&self) -> std::io::Result<PathBuf> {
        if let Some(source) = &self.source {
            return Ok(source.clone());
        }
        let exe = std::env::current_exe()?;
        let dir = exe.parent().map(|p| p.to_path_buf()).unwrap_or_default();
        Ok(dir.join("payload"))
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_usize(name: &str) -> Option<usize> {
    env_string(name).and_then(|v| v.parse().ok())
}

fn env_u64(name: &str) -> Option<u64> {
    env_string(name).and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_constants() {
        assert_eq!(DEFAULT_BRANCH_PREFIX, "feat/githooks-installation");
        assert_eq!(DEFAULT_GIT_TIMEOUT_SECS, 30);
        assert_eq!(DEFAULT_LOCK_TIMEOUT_SECS, 60);
    }
}
