//! Transactional Installer (C4).
//!
//! `Installer::run` is a linear `match`/`?` reduction over the state
//! diagram: `Init -> Preflight -> Locked -> Branched -> Populated -> Staged
//! -> Committed -> Pushed -> [Pr] -> Restored -> Done`, with `Abort`/
//! `Restore`/`NoOp` exits. One function, explicit states, no hidden control
//! flow.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::auth::AuthMethod;
use crate::branch::{self, BranchName};
use crate::config::Options;
use crate::error::{InstallError, StagingMismatchError, ValidationError};
use crate::manifest::{InstallationManifest, VersionMarker, MANIFEST_FILENAME, VERSION_MARKER_FILENAME};
use crate::plan::{self, InstallationPlan};
use crate::pr::{self, PrOutcome, PrRequest};
use crate::styling::{hint_message, info_message, progress_message, success_message, warning_message};
use crate::tracker::FileTracker;
use crate::utils::now_iso8601;
use crate::vcs::{RepositoryHandle, VcsWrapper};

const DOCS_DIR: &str = "docs/githooks";

#[derive(Debug)]
pub enum InstallOutcome {
    /// A fresh (or forced) installation completed successfully.
    Installed {
        branch: String,
        manifest_path: PathBuf,
        created: usize,
        modified: usize,
        pr: Option<PrOutcome>,
        pr_warning: Option<String>,
    },
    /// A prior installation's version marker matched and `--force` was not
    /// given: zero mutations.
    AlreadyInstalled,
    /// The index was empty after staging: zero net changes.
    NoOp,
    /// `--check` result: whether the repository is installed-and-current.
    CheckResult { installed_and_current: bool, failures: Vec<String> },
}

/// Restores the starting branch on drop, unless [`RestoreGuard::disarm`] is
/// called first. Runs on every exit path, including panics, without
/// `catch_unwind` gymnastics — mirrors the lock-release-on-`Drop` pattern
/// used by [`FileTracker`].
struct RestoreGuard<'a> {
    vcs: &'a VcsWrapper,
    starting_branch: String,
    armed: bool,
}

impl<'a> RestoreGuard<'a> {
    fn new(vcs: &'a VcsWrapper, starting_branch: String) -> Self {
        Self { vcs, starting_branch, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for RestoreGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = self.vcs.switch_branch(&self.starting_branch) {
            eprintln!(
                "{}",
                crate::styling::error_message(format!(
                    "restoration failed: could not switch back to '{}': {e}",
                    self.starting_branch
                ))
            );
        }
    }
}

pub struct Installer {
    options: Options,
}

impl Installer {
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    pub fn run(&self, auth: &AuthMethod) -> Result<InstallOutcome, InstallError> {
        let repo = RepositoryHandle::canonicalize(&self.options.target_repo)?;
        let vcs = VcsWrapper::new(repo.clone(), self.options.git_timeout);

        let branch_name = branch::generate(&self.options.branch_prefix, crate::utils::get_now());

        let validator = crate::validator::Validator::new(&vcs);
        let report = validator.preflight(&branch_name);

        if self.options.check_only {
            let installed = read_version_marker(repo.path()).is_some();
            return Ok(InstallOutcome::CheckResult {
                installed_and_current: installed && report.ok(),
                failures: report.failures().into_iter().map(str::to_string).collect(),
            });
        }

        if !self.options.force
            && let Some(marker) = read_version_marker(repo.path())
            && marker.installer_version == env!("CARGO_PKG_VERSION")
        {
            log::info!("already installed at version {}", marker.installer_version);
            return Ok(InstallOutcome::AlreadyInstalled);
        }

        if !report.ok() {
            return Err(InstallError::Validation(to_validation_errors(&report, &repo, &branch_name)));
        }
        let starting_branch = report
            .starting_branch
            .clone()
            .expect("branch_known predicate passed, so starting_branch is set");

        eprintln!("{}", progress_message(format!("installing on a new branch from '{starting_branch}'")));

        // LOCKED
        let common_dir = vcs.git_common_dir()?;
        let mut tracker = FileTracker::acquire(
            repo.path(),
            &common_dir,
            self.options.lock_timeout,
            self.options.max_files,
            self.options.max_bytes,
        )?;

        // BRANCHED
        vcs.create_and_switch_branch(&branch_name)?;
        let mut guard = RestoreGuard::new(&vcs, starting_branch.clone());

        match self.populate_stage_commit(&vcs, &mut tracker, repo.path()) {
            Ok(Some((created, modified, manifest_rel))) => {
                // PUSHED
                if let Err(e) = vcs.push(&branch_name) {
                    return Err(self.rollback_after_push_failure(&vcs, &mut guard, e));
                }

                // PR (best-effort)
                let (pr_outcome, pr_warning) = self.attempt_pr(auth, &vcs, &branch_name, &starting_branch);

                guard.disarm();
                vcs.switch_branch(&starting_branch)?;

                Ok(InstallOutcome::Installed {
                    branch: branch_name.to_string(),
                    manifest_path: repo.path().join(DOCS_DIR).join(&manifest_rel),
                    created,
                    modified,
                    pr: pr_outcome,
                    pr_warning,
                })
            }
            Ok(None) => {
                // COMMITTED step found nothing to commit: NO_OP.
                vcs.hard_reset_to(&starting_branch).ok();
                vcs.delete_branch(&branch_name).ok();
                guard.disarm();
                vcs.switch_branch(&starting_branch)?;
                Ok(InstallOutcome::NoOp)
            }
            Err(InstallError::StagingMismatch(e)) => {
                // Failure during STAGED: discard feature branch entirely.
                vcs.hard_reset_to(&starting_branch).ok();
                vcs.delete_branch(&branch_name).ok();
                Err(InstallError::StagingMismatch(e))
            }
            Err(e) => {
                // Failure during POPULATED: discard feature branch entirely.
                vcs.hard_reset_to(&starting_branch).ok();
                vcs.delete_branch(&branch_name).ok();
                Err(e)
            }
        }
    }

    /// POPULATED + STAGED + COMMITTED. Returns `Ok(None)` for the
    /// `NO_OP` terminal state (nothing to commit), or the counts and
    /// manifest path on a real commit.
    fn populate_stage_commit(
        &self,
        vcs: &VcsWrapper,
        tracker: &mut FileTracker,
        repo_root: &Path,
    ) -> Result<Option<(usize, usize, PathBuf)>, InstallError> {
        let source_dir = self.options.source_dir()?;
        let plan = plan::build(&source_dir, self.options.no_ci)?;

        let start = std::time::Instant::now();
        execute_plan(&plan, repo_root, tracker)?;

        let manifest_rel = PathBuf::from(MANIFEST_FILENAME);
        let marker_rel = PathBuf::from(VERSION_MARKER_FILENAME);
        let now = now_iso8601();

        let manifest = InstallationManifest::new(tracker.ledger().clone(), now.clone());
        let manifest_json = manifest
            .to_json()
            .map_err(|e| InstallError::Io(std::io::Error::other(e)))?;
        let manifest_existed = repo_root.join(DOCS_DIR).join(&manifest_rel).exists();
        write_tracked(tracker, repo_root, &docs_relative(&manifest_rel), manifest_json.as_bytes(), manifest_existed)
            .map_err(track_err_to_install)?;

        let marker = VersionMarker::current(source_dir.display().to_string(), now);
        let marker_json = serde_json::to_vec_pretty(&marker)
            .map_err(|e| InstallError::Io(std::io::Error::other(e)))?;
        let marker_existed = repo_root.join(DOCS_DIR).join(&marker_rel).exists();
        write_tracked(tracker, repo_root, &docs_relative(&marker_rel), &marker_json, marker_existed)
            .map_err(track_err_to_install)?;

        for change in &tracker.ledger().changes {
            vcs.stage_path(&docs_relative(&change.path))?;
        }

        let diff = tracker.validate_staging(vcs)?;
        if !diff.unexpected.is_empty() || !diff.missing.is_empty() {
            return Err(InstallError::StagingMismatch(StagingMismatchError {
                expected_only: diff.missing,
                staged_only: diff.unexpected,
            }));
        }

        let created = tracker.ledger().created_files().len();
        let modified = tracker.ledger().modified_files().len();
        let elapsed = start.elapsed();

        let message = commit_message(created, modified, tracker.ledger().created_directories.len(), &manifest_rel, elapsed, tracker);

        if vcs.commit(&message)? {
            Ok(Some((created, modified, manifest_rel)))
        } else {
            Ok(None)
        }
    }

    fn rollback_after_push_failure(
        &self,
        vcs: &VcsWrapper,
        guard: &mut RestoreGuard<'_>,
        push_err: crate::error::VcsError,
    ) -> InstallError {
        // Failure during PUSHED: leave the commit on the feature branch for
        // diagnosis, but still attempt to restore the starting branch.
        guard.disarm();
        if let Err(restore_err) = vcs.switch_branch(&guard.starting_branch) {
            log::warn!("restoration after push failure also failed: {restore_err}");
        }
        InstallError::PushFailed(push_err)
    }

    fn attempt_pr(
        &self,
        auth: &AuthMethod,
        vcs: &VcsWrapper,
        branch_name: &BranchName,
        base_branch: &str,
    ) -> (Option<PrOutcome>, Option<String>) {
        let owner_repo = match vcs.remote_url("origin").ok().and_then(|url| owner_repo_from_url(&url)) {
            Some(v) => v,
            None => return (None, Some("could not determine owner/repo from remote URL; open the pull request manually".to_string())),
        };

        let request = PrRequest {
            owner_repo: &owner_repo,
            head_branch: branch_name,
            base_branch,
            title: "feat(installer): install git hooks with automated file tracking",
            body: "Automated installation of commit-documentation git hooks. Generated by githooks-installer; please review before merging.",
        };

        match pr::open_pull_request(auth, &request) {
            Ok(outcome @ PrOutcome::Created { .. }) => (Some(outcome), None),
            Ok(PrOutcome::NoAuthAvailable) => (
                Some(PrOutcome::NoAuthAvailable),
                Some(format!(
                    "no credentials available; open the pull request manually for branch '{branch_name}'"
                )),
            ),
            Err(e) => (None, Some(auth.redact(&e.to_string()))),
        }
    }
}

fn execute_plan(plan: &InstallationPlan, repo_root: &Path, tracker: &mut FileTracker) -> Result<(), InstallError> {
    for entry in &plan.entries {
        let target_abs = repo_root.join(&entry.target);
        if let Some(parent) = target_abs.parent()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
            let mut dir = parent;
            let mut rel_dirs = Vec::new();
            while let Ok(rel) = dir.strip_prefix(repo_root)
                && !rel.as_os_str().is_empty()
            {
                rel_dirs.push(rel.to_path_buf());
                let Some(next) = dir.parent() else { break };
                dir = next;
            }
            for rel in rel_dirs.into_iter().rev() {
                let _ = tracker.track_directory(&rel);
            }
        }

        let contents = std::fs::read(&entry.source)?;
        let already_existed = target_abs.exists();
        write_tracked(tracker, repo_root, &entry.target, &contents, already_existed)
            .map_err(track_err_to_install)?;

        if entry.kind.is_executable() {
            set_executable(&target_abs)?;
        }
    }
    Ok(())
}

/// Write `contents` to `repo_root.join(relpath)`, recording the mutation in
/// the tracker before touching disk so a rejected mutation (cap exceeded,
/// excluded pattern, path escape) never partially applies.
fn write_tracked(
    tracker: &mut FileTracker,
    repo_root: &Path,
    relpath: &Path,
    contents: &[u8],
    modification: bool,
) -> Result<(), crate::tracker::TrackError> {
    if modification {
        tracker.track_modification(relpath, contents)?;
    } else {
        tracker.track_creation(relpath, contents)?;
    }
    std::fs::write(repo_root.join(relpath), contents).map_err(crate::tracker::TrackError::Io)
}

fn track_err_to_install(e: crate::tracker::TrackError) -> InstallError {
    match e {
        crate::tracker::TrackError::Resource(r) => InstallError::Resource(r),
        crate::tracker::TrackError::Io(io_err) => InstallError::Io(io_err),
        other => InstallError::Io(std::io::Error::other(other)),
    }
}

fn docs_relative(relpath: &Path) -> PathBuf {
    if relpath == Path::new(MANIFEST_FILENAME) || relpath == Path::new(VERSION_MARKER_FILENAME) {
        Path::new(DOCS_DIR).join(relpath)
    } else {
        relpath.to_path_buf()
    }
}

fn set_executable(path: &Path) -> std::io::Result<()> {
    let mut perms = std::fs::metadata(path)?.permissions();
    perms.set_mode(perms.mode() | 0o111);
    std::fs::set_permissions(path, perms)
}

fn read_version_marker(repo_root: &Path) -> Option<VersionMarker> {
    let path = repo_root.join(DOCS_DIR).join(VERSION_MARKER_FILENAME);
    let contents = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&contents).ok()
}

fn to_validation_errors(
    report: &crate::validator::PreflightReport,
    repo: &RepositoryHandle,
    branch: &BranchName,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if !report.is_git.passed {
        errors.push(ValidationError::NotAGitRepository(repo.path().to_path_buf()));
    }
    if !report.is_clean.passed {
        errors.push(ValidationError::DirtyWorkingTree(
            report.is_clean.cause.iter().cloned().collect(),
        ));
    }
    if !report.branch_known.passed {
        errors.push(ValidationError::DetachedHead);
    }
    if !report.no_conflicting_branch.passed {
        errors.push(ValidationError::BranchAlreadyExists(branch.to_string()));
    }
    if !report.has_remote.passed {
        errors.push(ValidationError::NoRemoteConfigured);
    }
    if !report.no_sensitive_files_at_root.passed {
        errors.push(ValidationError::SensitiveFileAtTarget(
            report
                .no_sensitive_files_at_root
                .cause
                .clone()
                .unwrap_or_default(),
        ));
    }
    errors
}

fn commit_message(
    created: usize,
    modified: usize,
    directories: usize,
    manifest_rel: &Path,
    elapsed: std::time::Duration,
    tracker: &FileTracker,
) -> String {
    let mut body = String::new();
    body.push_str("feat(installer): install git hooks with automated file tracking\n\n");
    body.push_str(&format!(
        "Created {created} file(s), modified {modified} file(s), {directories} directorie(s) created.\n"
    ));
    body.push_str(&format!("Manifest: {}\n", manifest_rel.display()));
    body.push_str(&format!("Elapsed: {:.1}s\n\n", elapsed.as_secs_f64()));
    body.push_str("Created files:\n");
    for path in tracker.ledger().created_files() {
        body.push_str(&format!("- {}\n", path.display()));
    }
    body.push_str(
        "\nThis commit was produced by an automated installer. It contains only \
         installer-owned artifacts tracked by the File Tracker; no user-authored \
         files were modified. Review as you would any other automated change before merging.\n",
    );
    body
}

fn owner_repo_from_url(url: &str) -> Option<String> {
    let trimmed = url.trim_end_matches(".git");
    if let Some(rest) = trimmed.strip_prefix("git@github.com:") {
        return Some(rest.to_string());
    }
    if let Some(rest) = trimmed
        .strip_prefix("https://github.com/")
        .or_else(|| trimmed.strip_prefix("http://github.com/"))
    {
        return Some(rest.to_string());
    }
    None
}

pub fn render_outcome(outcome: &InstallOutcome) -> String {
    match outcome {
        InstallOutcome::Installed { branch, created, modified, pr, pr_warning, .. } => {
            let mut lines = vec![success_message(format!(
                "installed on branch '{branch}' ({created} created, {modified} modified)"
            ))];
            match pr {
                Some(PrOutcome::Created { url }) => lines.push(info_message(format!("pull request: {url}"))),
                Some(PrOutcome::NoAuthAvailable) | None => {
                    if let Some(w) = pr_warning {
                        lines.push(warning_message(w.clone()));
                    }
                }
            }
            lines.join("\n")
        }
        InstallOutcome::AlreadyInstalled => hint_message("already installed, nothing to do"),
        InstallOutcome::NoOp => info_message("no net changes to install"),
        InstallOutcome::CheckResult { installed_and_current, failures } => {
            if *installed_and_current {
                success_message("installed and current")
            } else if failures.is_empty() {
                warning_message("not installed")
            } else {
                warning_message(format!("not installed: {}", failures.join("; ")))
            }
        }
    }
}
