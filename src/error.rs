//! Error taxonomy.
//!
//! Each component family gets its own enum so call sites that need to
//! pattern-match a specific failure (to choose an exit code, for instance)
//! can do so without downcasting an opaque `anyhow::Error`. Call sites that
//! just want to propagate and add context use `anyhow::Result` with
//! `.context()` instead of wrapping every fallible call in one of these.

use std::fmt;
use std::path::PathBuf;

use crate::styling::error_message;

/// Failures from the secure VCS wrapper (C1).
#[derive(Debug)]
pub enum VcsError {
    NotARepository(PathBuf),
    CommandNotWhitelisted(String),
    Timeout { command: String, seconds: u64 },
    NonZeroExit { command: String, code: Option<i32>, stderr: String },
    Io(std::io::Error),
}

impl fmt::Display for VcsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VcsError::NotARepository(path) => {
                write!(f, "{} is not a git repository", path.display())
            }
            VcsError::CommandNotWhitelisted(cmd) => {
                write!(f, "refusing to run non-whitelisted git subcommand: {cmd}")
            }
            VcsError::Timeout { command, seconds } => {
                write!(f, "git {command} timed out after {seconds}s")
            }
            VcsError::NonZeroExit { command, code, stderr } => {
                let code = code.map_or("signal".to_string(), |c| c.to_string());
                write!(f, "git {command} exited with {code}: {stderr}")
            }
            VcsError::Io(e) => write!(f, "failed to run git: {e}"),
        }
    }
}

impl std::error::Error for VcsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VcsError::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// Failures acquiring or holding the installation lock.
#[derive(Debug)]
pub enum LockError {
    Timeout { seconds: u64, holder_pid: Option<u32> },
    Io(std::io::Error),
}

impl fmt::Display for LockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockError::Timeout { seconds, holder_pid: Some(pid) } => write!(
                f,
                "could not acquire installation lock after {seconds}s (held by pid {pid})"
            ),
            LockError::Timeout { seconds, holder_pid: None } => {
                write!(f, "could not acquire installation lock after {seconds}s")
            }
            LockError::Io(e) => write!(f, "failed to access lock file: {e}"),
        }
    }
}

impl std::error::Error for LockError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LockError::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// Preflight validation failures (C3). Each variant names the predicate that
/// failed, so `--check` can report all of them rather than stopping at one.
#[derive(Debug)]
pub enum ValidationError {
    NotAGitRepository(PathBuf),
    DirtyWorkingTree(Vec<String>),
    SensitiveFileAtTarget(String),
    BranchAlreadyExists(String),
    NoRemoteConfigured,
    DetachedHead,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::NotAGitRepository(path) => {
                write!(f, "{} is not a git repository", path.display())
            }
            ValidationError::DirtyWorkingTree(paths) => {
                write!(f, "working tree has uncommitted changes: {}", paths.join(", "))
            }
            ValidationError::SensitiveFileAtTarget(cause) => {
                write!(f, "{cause}")
            }
            ValidationError::BranchAlreadyExists(branch) => {
                write!(f, "branch '{branch}' already exists")
            }
            ValidationError::NoRemoteConfigured => {
                write!(f, "repository has no 'origin' remote configured")
            }
            ValidationError::DetachedHead => write!(f, "repository HEAD is detached"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Resource caps exceeded while tracking files (C2).
#[derive(Debug)]
pub enum ResourceError {
    TooManyFiles { limit: usize, attempted: usize },
    PayloadTooLarge { limit: u64, attempted: u64 },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::TooManyFiles { limit, attempted } => {
                write!(f, "payload contains {attempted} files, exceeding the limit of {limit}")
            }
            ResourceError::PayloadTooLarge { limit, attempted } => {
                write!(
                    f,
                    "payload is {attempted} bytes, exceeding the limit of {limit} bytes"
                )
            }
        }
    }
}

impl std::error::Error for ResourceError {}

/// The set of files actually staged did not match what the tracker recorded
/// as written — the installer aborts rather than committing an unverified
/// tree.
#[derive(Debug)]
pub struct StagingMismatchError {
    pub expected_only: Vec<PathBuf>,
    pub staged_only: Vec<PathBuf>,
}

impl fmt::Display for StagingMismatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "staged tree does not match tracked changes")?;
        if !self.expected_only.is_empty() {
            write!(f, "; tracked but not staged: {:?}", self.expected_only)?;
        }
        if !self.staged_only.is_empty() {
            write!(f, "; staged but not tracked: {:?}", self.staged_only)?;
        }
        Ok(())
    }
}

impl std::error::Error for StagingMismatchError {}

/// Failures obtaining credentials for remote PR creation (C5).
#[derive(Debug)]
pub enum RemoteAuthError {
    NoTokenFound,
    DelegatedCliNotFound(String),
}

impl fmt::Display for RemoteAuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteAuthError::NoTokenFound => write!(
                f,
                "no credentials found (set GITHUB_TOKEN/GH_TOKEN or install the gh CLI)"
            ),
            RemoteAuthError::DelegatedCliNotFound(name) => {
                write!(f, "delegated CLI '{name}' not found on PATH")
            }
        }
    }
}

impl std::error::Error for RemoteAuthError {}

/// Failures opening the pull request itself, once credentials are available.
/// Display impls never interpolate the raw token/secret value.
#[derive(Debug)]
pub enum RemotePrError {
    Http { status: u16, body: String },
    Network(String),
    DelegatedCliFailed { code: Option<i32>, stderr: String },
}

impl fmt::Display for RemotePrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemotePrError::Http { status, body } => {
                write!(f, "pull request API returned {status}: {body}")
            }
            RemotePrError::Network(msg) => write!(f, "network error contacting remote: {msg}"),
            RemotePrError::DelegatedCliFailed { code, stderr } => {
                let code = code.map_or("signal".to_string(), |c| c.to_string());
                write!(f, "gh pr create exited with {code}: {stderr}")
            }
        }
    }
}

impl std::error::Error for RemotePrError {}

/// Top-level error for the installation driver (C4), used to select an exit
/// code in `main`.
#[derive(Debug)]
pub enum InstallError {
    Validation(Vec<ValidationError>),
    Lock(LockError),
    Vcs(VcsError),
    /// A `git push` failed after the commit had already landed on the
    /// feature branch. Distinct from [`InstallError::Vcs`]: the feature
    /// branch is deliberately left in place for diagnosis rather than
    /// rolled back, so it needs its own exit code.
    PushFailed(VcsError),
    Resource(ResourceError),
    StagingMismatch(StagingMismatchError),
    RemoteAuth(RemoteAuthError),
    RemotePr(RemotePrError),
    Io(std::io::Error),
}

impl fmt::Display for InstallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallError::Validation(errs) => {
                writeln!(f, "preflight validation failed:")?;
                for e in errs {
                    writeln!(f, "  - {e}")?;
                }
                Ok(())
            }
            InstallError::Lock(e) => write!(f, "{e}"),
            InstallError::Vcs(e) => write!(f, "{e}"),
            InstallError::PushFailed(e) => write!(f, "push failed after commit: {e}"),
            InstallError::Resource(e) => write!(f, "{e}"),
            InstallError::StagingMismatch(e) => write!(f, "{e}"),
            InstallError::RemoteAuth(e) => write!(f, "{e}"),
            InstallError::RemotePr(e) => write!(f, "{e}"),
            InstallError::Io(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for InstallError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            InstallError::Lock(e) => Some(e),
            InstallError::Vcs(e) => Some(e),
            InstallError::PushFailed(e) => Some(e),
            InstallError::Resource(e) => Some(e),
            InstallError::StagingMismatch(e) => Some(e),
            InstallError::RemoteAuth(e) => Some(e),
            InstallError::RemotePr(e) => Some(e),
            InstallError::Io(e) => Some(e),
            InstallError::Validation(_) => None,
        }
    }
}

impl From<LockError> for InstallError {
    fn from(e: LockError) -> Self {
        InstallError::Lock(e)
    }
}

impl From<VcsError> for InstallError {
    fn from(e: VcsError) -> Self {
        InstallError::Vcs(e)
    }
}

impl From<ResourceError> for InstallError {
    fn from(e: ResourceError) -> Self {
        InstallError::Resource(e)
    }
}

impl From<StagingMismatchError> for InstallError {
    fn from(e: StagingMismatchError) -> Self {
        InstallError::StagingMismatch(e)
    }
}

impl From<RemoteAuthError> for InstallError {
    fn from(e: RemoteAuthError) -> Self {
        InstallError::RemoteAuth(e)
    }
}

impl From<RemotePrError> for InstallError {
    fn from(e: RemotePrError) -> Self {
        InstallError::RemotePr(e)
    }
}

impl From<std::io::Error> for InstallError {
    fn from(e: std::io::Error) -> Self {
        InstallError::Io(e)
    }
}

/// Map an [`InstallError`] onto the process exit codes the CLI documents:
/// 0 success, 1 preflight/validation failure, 2 mid-transaction failure
/// with a full rollback, 3 mid-transaction failure that leaves a partial
/// commit on the feature branch, 4 lock contention.
///
/// `RemoteAuth`/`RemotePr` are never constructed by the current driver (a
/// PR-creation or auth failure is always demoted to a warning rather than
/// an error), but are mapped alongside the other rolled-back failures for
/// the day something does construct one.
pub fn exit_code(err: &InstallError) -> i32 {
    match err {
        InstallError::Validation(_) => 1,
        InstallError::Vcs(_) => 2,
        InstallError::Resource(_) => 2,
        InstallError::StagingMismatch(_) => 2,
        InstallError::RemoteAuth(_) | InstallError::RemotePr(_) => 2,
        InstallError::PushFailed(_) => 3,
        InstallError::Lock(_) => 4,
        InstallError::Io(_) => 1,
    }
}

/// Render an [`InstallError`] the way it should appear on stderr: a styled
/// error line followed by any nested detail lines already produced by
/// `Display`.
pub fn render(err: &InstallError) -> String {
    error_message(&err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_contention_is_exit_4() {
        let err = InstallError::Lock(LockError::Timeout { seconds: 5, holder_pid: None });
        assert_eq!(exit_code(&err), 4);
    }

    #[test]
    fn push_failure_is_distinguishable_from_a_rolled_back_vcs_failure() {
        let rolled_back = InstallError::Vcs(VcsError::CommandNotWhitelisted("x".to_string()));
        let partial_commit = InstallError::PushFailed(VcsError::CommandNotWhitelisted("x".to_string()));
        assert_eq!(exit_code(&rolled_back), 2);
        assert_eq!(exit_code(&partial_commit), 3);
    }

    #[test]
    fn resource_exhaustion_is_exit_2_not_3() {
        let err = InstallError::Resource(ResourceError::TooManyFiles { limit: 1, attempted: 2 });
        assert_eq!(exit_code(&err), 2);
    }
}
