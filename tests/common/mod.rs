//! Shared fixtures for end-to-end tests: isolated git repositories with a
//! deterministic clock, plus a helper for invoking the built binary.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

/// Fixed epoch so every test gets the same generated branch name
/// (`feat/githooks-installation-20260101-000000`), matching
/// `GITHOOKS_INSTALLER_TEST_EPOCH` support in `utils::get_now`.
pub const TEST_EPOCH: u64 = 1_767_225_600; // 2026-01-01T00:00:00Z
pub const EXPECTED_BRANCH: &str = "feat/githooks-installation-20260101-000000";

pub struct TestRepo {
    dir: TempDir,
    origin: Option<TempDir>,
}

impl TestRepo {
    /// A clean repository with one commit on `main` and no remote.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let repo = Self { dir, origin: None };
        repo.git(&["init", "-q", "-b", "main"]);
        repo.git(&["config", "user.email", "test@example.com"]);
        repo.git(&["config", "user.name", "Test User"]);
        std::fs::write(repo.path().join("README.md"), "hello\n").unwrap();
        repo.git(&["add", "README.md"]);
        repo.git(&["commit", "-q", "-m", "init"]);
        repo
    }

    /// Same as [`Self::new`], plus a local bare repository registered as
    /// `origin` so `git push` succeeds without reaching a real network.
    pub fn with_remote() -> Self {
        let mut repo = Self::new();
        let origin = TempDir::new().expect("tempdir");
        let status = Command::new("git")
            .args(["init", "-q", "--bare"])
            .current_dir(origin.path())
            .status()
            .unwrap();
        assert!(status.success());
        repo.git(&["remote", "add", "origin", &origin.path().display().to_string()]);
        repo.origin = Some(origin);
        repo
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn origin_path(&self) -> &Path {
        self.origin.as_ref().expect("no origin configured").path()
    }

    pub fn git(&self, args: &[&str]) -> Output {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.path())
            .output()
            .expect("failed to run git");
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        output
    }

    pub fn git_stdout(&self, args: &[&str]) -> String {
        String::from_utf8_lossy(&self.git(args).stdout).trim().to_string()
    }

    pub fn current_branch(&self) -> String {
        self.git_stdout(&["branch", "--show-current"])
    }

    pub fn branch_exists(&self, name: &str) -> bool {
        Command::new("git")
            .args(["rev-parse", "--verify", &format!("refs/heads/{name}")])
            .current_dir(self.path())
            .status()
            .unwrap()
            .success()
    }

    pub fn is_clean(&self) -> bool {
        self.git_stdout(&["status", "--porcelain"]).is_empty()
    }

    /// Push `branch` to `origin` from a throwaway clone, so it exists on
    /// the remote without ever being fetched into this repository's own
    /// local refs.
    pub fn push_branch_from_second_clone(&self, branch: &str) {
        let clone = TempDir::new().expect("tempdir");
        let origin = self.origin_path().display().to_string();
        let run = |args: &[&str]| {
            let output = Command::new("git")
                .args(args)
                .current_dir(clone.path())
                .output()
                .expect("failed to run git");
            assert!(
                output.status.success(),
                "git {:?} failed: {}",
                args,
                String::from_utf8_lossy(&output.stderr)
            );
        };
        run(&["clone", "-q", &origin, "."]);
        run(&["config", "user.email", "test@example.com"]);
        run(&["config", "user.name", "Test User"]);
        run(&["checkout", "-q", "-b", branch]);
        run(&["push", "-q", "origin", branch]);
    }
}

fn payload_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("payload")
}

/// Build an invocation of the installer binary against `repo`, with a
/// deterministic clock and the workspace's real payload tree as source.
pub fn installer_command(repo: &TestRepo) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_githooks-installer"));
    cmd.arg(repo.path());
    cmd.arg("--source").arg(payload_dir());
    cmd.env("GITHOOKS_INSTALLER_TEST_EPOCH", TEST_EPOCH.to_string());
    cmd.env_remove("GITHUB_TOKEN");
    cmd.env_remove("GH_TOKEN");
    cmd
}
