//! Repository Validator (C3).
//!
//! All predicates are pre-flight: they run before any mutation and the
//! validator never modifies state. `Validator::preflight` runs every
//! predicate and collects every failure, rather than stopping at the first,
//! so `--check` can report the whole list at once.

use std::sync::OnceLock;

use regex::Regex;

use crate::branch::BranchName;
use crate::vcs::VcsWrapper;

/// Sensitive filenames/globs checked at the repository root only — matches
/// deeper in the tree are the user's concern, not the installer's.
const SENSITIVE_PATTERNS: &[&str] = &[
    r"^\.env(\..*)?$",
    r".*\.pem$",
    r".*\.key$",
    r".*_rsa$",
    r"^id_dsa$",
    r"^id_ed25519$",
];

fn sensitive_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let pattern = SENSITIVE_PATTERNS
            .iter()
            .map(|p| format!("({p})"))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&pattern).expect("sensitive-file pattern is valid")
    })
}

#[derive(Debug, Clone)]
pub struct Predicate {
    pub passed: bool,
    pub cause: Option<String>,
}

impl Predicate {
    fn ok() -> Self {
        Self { passed: true, cause: None }
    }

    fn fail(cause: impl Into<String>) -> Self {
        Self { passed: false, cause: Some(cause.into()) }
    }
}

#[derive(Debug, Clone)]
pub struct PreflightReport {
    pub is_git: Predicate,
    pub is_clean: Predicate,
    pub branch_known: Predicate,
    pub no_conflicting_branch: Predicate,
    pub has_remote: Predicate,
    pub no_sensitive_files_at_root: Predicate,
    /// Captured only when `branch_known` passed — the restoration target.
    pub starting_branch: Option<String>,
}

impl PreflightReport {
    pub fn ok(&self) -> bool {
        self.is_git.passed
            && self.is_clean.passed
            && self.branch_known.passed
            && self.no_conflicting_branch.passed
            && self.has_remote.passed
            && self.no_sensitive_files_at_root.passed
    }

    pub fn failures(&self) -> Vec<&str> {
        [
            &self.is_git,
            &self.is_clean,
            &self.branch_known,
            &self.no_conflicting_branch,
            &self.has_remote,
            &self.no_sensitive_files_at_root,
        ]
        .into_iter()
        .filter(|p| !p.passed)
        .filter_map(|p| p.cause.as_deref())
        .collect()
    }
}

pub struct Validator<'a> {
    vcs: &'a VcsWrapper,
}

impl<'a> Validator<'a> {
    pub fn new(vcs: &'a VcsWrapper) -> Self {
        Self { vcs }
    }

    pub fn preflight(&self, planned_branch: &BranchName) -> PreflightReport {
        let is_git = self.check_is_git();
        let is_clean = self.check_is_clean();
        let (branch_known, starting_branch) = self.check_branch_known();
        let no_conflicting_branch = self.check_no_conflicting_branch(planned_branch);
        let has_remote = self.check_has_remote();
        let no_sensitive_files_at_root = self.check_no_sensitive_files_at_root();

        PreflightReport {
            is_git,
            is_clean,
            branch_known,
            no_conflicting_branch,
            has_remote,
            no_sensitive_files_at_root,
            starting_branch,
        }
    }

    fn check_is_git(&self) -> Predicate {
        match self.vcs.git_common_dir() {
            Ok(_) => Predicate::ok(),
            Err(e) => Predicate::fail(format!("{} is not a git repository: {e}", self.vcs.repo().path().display())),
        }
    }

    fn check_is_clean(&self) -> Predicate {
        match self.vcs.is_working_tree_clean() {
            Ok(true) => Predicate::ok(),
            Ok(false) => Predicate::fail("working tree has uncommitted changes"),
            Err(e) => Predicate::fail(format!("could not determine working tree status: {e}")),
        }
    }

    fn check_branch_known(&self) -> (Predicate, Option<String>) {
        match self.vcs.current_branch() {
            Ok(branch) if branch != "detached" => (Predicate::ok(), Some(branch)),
            Ok(_) => (Predicate::fail("repository HEAD is detached"), None),
            Err(e) => (Predicate::fail(format!("could not determine current branch: {e}")), None),
        }
    }

    fn check_no_conflicting_branch(&self, planned: &BranchName) -> Predicate {
        match self.vcs.branch_exists(planned) {
            Ok(true) => return Predicate::fail(format!("branch '{planned}' already exists")),
            Ok(false) => {}
            Err(e) => return Predicate::fail(format!("could not check for branch collision: {e}")),
        }
        // Only probe the remote if one is configured; `check_has_remote`
        // reports the missing-remote case on its own.
        if self.vcs.remote_url("origin").is_ok() {
            match self.vcs.branch_exists_on_remote("origin", planned) {
                Ok(true) => {
                    return Predicate::fail(format!("branch '{planned}' already exists on 'origin'"))
                }
                Ok(false) => {}
                Err(e) => {
                    return Predicate::fail(format!("could not check for remote branch collision: {e}"))
                }
            }
        }
        Predicate::ok()
    }

    fn check_has_remote(&self) -> Predicate {
        match self.vcs.remote_url("origin") {
            Ok(_) => Predicate::ok(),
            Err(_) => Predicate::fail("repository has no 'origin' remote configured"),
        }
    }

    fn check_no_sensitive_files_at_root(&self) -> Predicate {
        let Ok(entries) = std::fs::read_dir(self.vcs.repo().path()) else {
            return Predicate::ok();
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if sensitive_regex().is_match(&name) {
                return Predicate::fail(format!("sensitive file at repository root: {name}"));
            }
        }
        Predicate::ok()
    }
}
