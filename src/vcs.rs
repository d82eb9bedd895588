//! Secure VCS Wrapper (C1).
//!
//! Every version-control operation the installer needs goes through a
//! `VcsWrapper` bound to one [`RepositoryHandle`] at construction. There is
//! no ambient command executor and no other path in the crate that spawns
//! `git`: a whitelist check runs before any argv reaches the subprocess
//! layer in `crate::exec`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::branch::BranchName;
use crate::error::VcsError;
use crate::exec::{self, ExecError};

/// A canonicalized, immutable handle to a repository's working tree root.
#[derive(Debug, Clone)]
pub struct RepositoryHandle(PathBuf);

impl RepositoryHandle {
    pub fn canonicalize(path: &Path) -> std::io::Result<Self> {
        Ok(Self(crate::path::canonicalize(path)?))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

pub struct VcsWrapper {
    repo: RepositoryHandle,
    timeout: Duration,
}

/// Subcommands the wrapper will ever invoke, with the flags allowed for
/// each. Anything outside this table is rejected before a process spawns.
fn allowed_flags(subcommand: &str) -> Option<&'static [&'static str]> {
    match subcommand {
        "status" => Some(&["--porcelain", "-z"]),
        "branch" => Some(&["--show-current", "--list", "-D", "-r"]),
        "checkout" => Some(&["-b"]),
        "switch" => Some(&["-c"]),
        "add" => Some(&["--"]),
        "commit" => Some(&["-m", "--file", "--author"]),
        "push" => Some(&["-u", "--"]),
        "remote" => Some(&["get-url"]),
        "ls-files" => Some(&["--error-unmatch", "--"]),
        "ls-remote" => Some(&["--exit-code", "--heads"]),
        "rev-parse" => Some(&["--verify", "--abbrev-ref", "--show-toplevel", "--git-common-dir"]),
        "symbolic-ref" => Some(&["-q"]),
        "diff" => Some(&["--quiet", "--", "--exit-code"]),
        "reset" => Some(&["--hard"]),
        "rev-list" => Some(&["--max-count"]),
        _ => None,
    }
}

impl VcsWrapper {
    pub fn new(repo: RepositoryHandle, timeout: Duration) -> Self {
        Self { repo, timeout }
    }

    pub fn repo(&self) -> &RepositoryHandle {
        &self.repo
    }

    /// Run `git <args>` with the whitelist, environment scrubbing, and
    /// timeout applied. `args[0]` must be a whitelisted subcommand; every
    /// subsequent flag-shaped argument must appear in that subcommand's
    /// allowed-flags list (positional arguments — paths, branch names,
    /// messages — pass through unchecked here since they are validated by
    /// their own types before reaching this call).
    fn run(&self, args: &[&str], context: Option<&str>) -> Result<std::process::Output, VcsError> {
        let subcommand = args.first().ok_or_else(|| {
            VcsError::CommandNotWhitelisted("<empty>".to_string())
        })?;
        let Some(allowed) = allowed_flags(subcommand) else {
            return Err(VcsError::CommandNotWhitelisted(subcommand.to_string()));
        };
        for arg in &args[1..] {
            if arg.starts_with('-') && !allowed.contains(arg) {
                return Err(VcsError::CommandNotWhitelisted(format!(
                    "{subcommand} {arg}"
                )));
            }
        }

        let mut cmd = std::process::Command::new("git");
        cmd.args(args);
        cmd.current_dir(self.repo.path());
        // Disable any form of interactive credential prompting so auth
        // failures fail fast instead of hanging on a TTY.
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        cmd.env("GIT_ASKPASS", "true");
        cmd.env("SSH_ASKPASS", "true");
        cmd.env_remove("SSH_ASKPASS_REQUIRE");

        match exec::run(&mut cmd, self.timeout, context) {
            Ok(output) => Ok(output),
            Err(ExecError::Timeout { command, seconds }) => {
                Err(VcsError::Timeout { command, seconds })
            }
            Err(ExecError::Spawn(e)) => Err(VcsError::Io(e)),
        }
    }

    fn run_ok(&self, args: &[&str], context: Option<&str>) -> Result<String, VcsError> {
        let output = self.run(args, context)?;
        if !output.status.success() {
            return Err(VcsError::NonZeroExit {
                command: args.join(" "),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    pub fn is_working_tree_clean(&self) -> Result<bool, VcsError> {
        let out = self.run_ok(&["status", "--porcelain"], None)?;
        Ok(out.trim().is_empty())
    }

    /// Current branch name, or the sentinel `"detached"` if HEAD is detached.
    pub fn current_branch(&self) -> Result<String, VcsError> {
        let out = self.run_ok(&["branch", "--show-current"], None)?;
        let name = out.trim();
        if name.is_empty() {
            Ok("detached".to_string())
        } else {
            Ok(name.to_string())
        }
    }

    pub fn branch_exists(&self, name: &BranchName) -> Result<bool, VcsError> {
        let refname = format!("refs/heads/{name}");
        let output = self.run(&["rev-parse", "--verify", &refname], None)?;
        Ok(output.status.success())
    }

    /// True if `remote` already has a branch named `name`. Queries the
    /// remote directly (`ls-remote`) rather than trusting local
    /// remote-tracking refs, which may be stale or never fetched.
    pub fn branch_exists_on_remote(&self, remote: &str, name: &BranchName) -> Result<bool, VcsError> {
        let refname = format!("refs/heads/{name}");
        let output = self.run(&["ls-remote", "--exit-code", "--heads", remote, &refname], Some("check-remote-branch"))?;
        match output.status.code() {
            Some(0) => Ok(true),
            Some(2) => Ok(false),
            _ => Err(VcsError::NonZeroExit {
                command: format!("ls-remote --exit-code --heads {remote} {refname}"),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
        }
    }

    pub fn create_and_switch_branch(&self, name: &BranchName) -> Result<(), VcsError> {
        if self.branch_exists(name)? {
            return Err(VcsError::NonZeroExit {
                command: format!("checkout -b {name}"),
                code: None,
                stderr: format!("branch '{name}' already exists"),
            });
        }
        self.run_ok(&["checkout", "-b", name.as_ref()], Some("create-branch"))?;
        Ok(())
    }

    pub fn switch_branch(&self, name: &str) -> Result<(), VcsError> {
        self.run_ok(&["checkout", name], Some("switch-branch"))?;
        Ok(())
    }

    pub fn delete_branch(&self, name: &BranchName) -> Result<(), VcsError> {
        self.run_ok(&["branch", "-D", name.as_ref()], Some("delete-branch"))?;
        Ok(())
    }

    pub fn hard_reset_to(&self, rev: &str) -> Result<(), VcsError> {
        self.run_ok(&["reset", "--hard", rev], Some("rollback"))?;
        Ok(())
    }

    pub fn head_rev(&self) -> Result<String, VcsError> {
        Ok(self.run_ok(&["rev-parse", "--verify", "HEAD"], None)?.trim().to_string())
    }

    /// True if `relpath` is already tracked by git and its working-tree
    /// content matches the index (the stage-unchanged policy treats this as
    /// a successful no-op rather than an error). A brand-new, untracked
    /// file is never "unchanged": `git diff` is silent on untracked paths
    /// regardless of content, so tracked-ness must be checked first.
    pub fn is_path_unchanged(&self, relpath: &Path) -> Result<bool, VcsError> {
        let path_str = relpath.to_string_lossy().into_owned();
        if !self.is_tracked(&path_str)? {
            return Ok(false);
        }
        let output = self.run(&["diff", "--quiet", "--", &path_str], None)?;
        Ok(output.status.success())
    }

    fn is_tracked(&self, path_str: &str) -> Result<bool, VcsError> {
        let output = self.run(&["ls-files", "--error-unmatch", "--", path_str], None)?;
        Ok(output.status.success())
    }

    /// Stage `relpath`. Per policy, a path git considers unchanged is a
    /// successful no-op rather than an error.
    pub fn stage_path(&self, relpath: &Path) -> Result<(), VcsError> {
        if self.is_path_unchanged(relpath).unwrap_or(false) {
            return Ok(());
        }
        let path_str = relpath.to_string_lossy().into_owned();
        self.run_ok(&["add", "--", &path_str], Some("stage"))?;
        Ok(())
    }

    pub fn staged_paths(&self) -> Result<Vec<PathBuf>, VcsError> {
        let output = self.run_ok(&["status", "--porcelain", "-z"], None)?;
        Ok(output
            .split('\0')
            .filter(|entry| !entry.is_empty())
            .filter_map(|entry| {
                let (status, path) = entry.split_at_checked(3)?;
                let index_status = status.as_bytes().first().copied().unwrap_or(b' ');
                if index_status == b' ' || index_status == b'?' {
                    None
                } else {
                    Some(PathBuf::from(path))
                }
            })
            .collect())
    }

    pub fn commit(&self, message: &str) -> Result<bool, VcsError> {
        let staged = self.staged_paths()?;
        if staged.is_empty() {
            return Ok(false);
        }
        self.run_ok(&["commit", "-m", message], Some("commit"))?;
        Ok(true)
    }

    pub fn push(&self, branch: &BranchName) -> Result<(), VcsError> {
        let refspec = branch.to_string();
        self.run_ok(&["push", "-u", "origin", &refspec], Some("push"))?;
        Ok(())
    }

    pub fn remote_url(&self, name: &str) -> Result<String, VcsError> {
        Ok(self.run_ok(&["remote", "get-url", name], None)?.trim().to_string())
    }

    pub fn git_common_dir(&self) -> Result<PathBuf, VcsError> {
        let out = self.run_ok(&["rev-parse", "--git-common-dir"], None)?;
        let rel = out.trim();
        let path = Path::new(rel);
        if path.is_absolute() {
            Ok(path.to_path_buf())
        } else {
            Ok(self.repo.path().join(path))
        }
    }
}
