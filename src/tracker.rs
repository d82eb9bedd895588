//! File Tracker (C2).
//!
//! The single authority on what the installer created or modified. Every
//! filesystem write the transactional installer performs is announced here
//! before it happens, so the commit step stages exactly the tracked set and
//! nothing else, and so resource caps and path escapes are caught before a
//! mutation lands on disk.

use std::collections::BTreeSet;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{LockError, ResourceError};
use crate::vcs::VcsWrapper;

pub const DEFAULT_MAX_FILES: usize = 1000;
pub const DEFAULT_MAX_BYTES: u64 = 100 * 1024 * 1024;

const LOCK_FILE_NAME: &str = "githooks-installer.lock";
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Filenames allowed to start with `.` despite the general dotfile exclusion.
const DOTFILE_ALLOW_LIST: &[&str] = &[
    ".gitignore",
    ".githooks-version.json",
    ".installation-manifest.json",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Created,
    Modified,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedChange {
    pub path: PathBuf,
    pub kind: MutationKind,
    pub bytes: u64,
    pub sha256: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackerLedger {
    pub changes: Vec<TrackedChange>,
    pub created_directories: Vec<PathBuf>,
}

impl TrackerLedger {
    pub fn created_files(&self) -> BTreeSet<&Path> {
        self.changes
            .iter()
            .filter(|c| c.kind == MutationKind::Created)
            .map(|c| c.path.as_path())
            .collect()
    }

    pub fn modified_files(&self) -> BTreeSet<&Path> {
        self.changes
            .iter()
            .filter(|c| c.kind == MutationKind::Modified)
            .map(|c| c.path.as_path())
            .collect()
    }

    pub fn all_paths(&self) -> BTreeSet<&Path> {
        self.changes.iter().map(|c| c.path.as_path()).collect()
    }

    pub fn total_bytes(&self) -> u64 {
        self.changes.iter().map(|c| c.bytes).sum()
    }
}

/// Result of [`FileTracker::validate_staging`].
#[derive(Debug, Default)]
pub struct StagingDiff {
    /// Tracked but not staged, and not reported unchanged by the VCS.
    pub missing: Vec<PathBuf>,
    /// Staged but not tracked.
    pub unexpected: Vec<PathBuf>,
}

impl StagingDiff {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty()
    }
}

pub struct FileTracker {
    repo_root: PathBuf,
    ledger: TrackerLedger,
    max_files: usize,
    max_bytes: u64,
    _lock: std::fs::File,
}

impl FileTracker {
    /// Acquire the tracker bound to `repo_root`, taking an advisory lock on
    /// a sentinel file inside `git_common_dir` (the repository's VCS
    /// control directory). Polls in [`LOCK_POLL_INTERVAL`] increments up to
    /// `acquire_timeout`; a still-held lock at expiry is a fatal,
    /// non-retryable [`LockError::Timeout`].
    pub fn acquire(
        repo_root: &Path,
        git_common_dir: &Path,
        acquire_timeout: Duration,
        max_files: usize,
        max_bytes: u64,
    ) -> Result<Self, LockError> {
        let lock_path = git_common_dir.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(LockError::Io)?;

        let deadline = Instant::now() + acquire_timeout;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => break,
                Err(_) if Instant::now() < deadline => {
                    std::thread::sleep(LOCK_POLL_INTERVAL);
                }
                Err(_) => {
                    return Err(LockError::Timeout {
                        seconds: acquire_timeout.as_secs(),
                        holder_pid: None,
                    });
                }
            }
        }

        Ok(Self {
            repo_root: repo_root.to_path_buf(),
            ledger: TrackerLedger::default(),
            max_files,
            max_bytes,
            _lock: file,
        })
    }

    pub fn ledger(&self) -> &TrackerLedger {
        &self.ledger
    }

    fn is_excluded(relpath: &Path) -> bool {
        for component in relpath.components() {
            let name = component.as_os_str().to_string_lossy();
            if name == "__pycache__" {
                return true;
            }
            if name.starts_with('.') && !DOTFILE_ALLOW_LIST.contains(&name.as_ref()) {
                return true;
            }
        }
        let ext_excluded = relpath
            .extension()
            .map(|ext| ext == "pyc" || ext == "pyo")
            .unwrap_or(false);
        ext_excluded
    }

    fn record(
        &mut self,
        relpath: &Path,
        contents: &[u8],
        kind: MutationKind,
    ) -> Result<(), TrackError> {
        if Self::is_excluded(relpath) {
            return Err(TrackError::Excluded(relpath.to_path_buf()));
        }

        let canon = crate::path::contain(&self.repo_root, relpath)
            .map_err(|e| TrackError::PathEscape(e.to_string()))?;
        let _ = canon;

        if self.ledger.all_paths().contains(relpath) {
            return Err(TrackError::AlreadyTracked(relpath.to_path_buf()));
        }

        let projected_files = self.ledger.changes.len() + 1;
        if projected_files > self.max_files {
            return Err(TrackError::Resource(ResourceError::TooManyFiles {
                limit: self.max_files,
                attempted: projected_files,
            }));
        }

        let bytes = contents.len() as u64;
        let projected_bytes = self.ledger.total_bytes() + bytes;
        if projected_bytes > self.max_bytes {
            return Err(TrackError::Resource(ResourceError::PayloadTooLarge {
                limit: self.max_bytes,
                attempted: projected_bytes,
            }));
        }

        let mut hasher = Sha256::new();
        hasher.update(contents);
        let sha256 = format!("{:x}", hasher.finalize());

        self.ledger.changes.push(TrackedChange {
            path: relpath.to_path_buf(),
            kind,
            bytes,
            sha256,
        });

        Ok(())
    }

    pub fn track_creation(&mut self, relpath: &Path, contents: &[u8]) -> Result<(), TrackError> {
        self.record(relpath, contents, MutationKind::Created)
    }

    pub fn track_modification(&mut self, relpath: &Path, contents: &[u8]) -> Result<(), TrackError> {
        self.record(relpath, contents, MutationKind::Modified)
    }

    pub fn track_directory(&mut self, relpath: &Path) -> Result<(), TrackError> {
        if Self::is_excluded(relpath) {
            return Err(TrackError::Excluded(relpath.to_path_buf()));
        }
        self.ledger.created_directories.push(relpath.to_path_buf());
        Ok(())
    }

    /// Compare the ledger's tracked paths to the VCS index, ignoring paths
    /// the VCS reports as unchanged (stage-unchanged policy, §4.1).
    pub fn validate_staging(&self, vcs: &VcsWrapper) -> Result<StagingDiff, crate::error::VcsError> {
        let staged: BTreeSet<PathBuf> = vcs.staged_paths()?.into_iter().collect();
        let tracked: BTreeSet<PathBuf> =
            self.ledger.changes.iter().map(|c| c.path.clone()).collect();

        let mut missing = Vec::new();
        for path in tracked.difference(&staged) {
            if !vcs.is_path_unchanged(path).unwrap_or(false) {
                missing.push(path.clone());
            }
        }

        let unexpected: Vec<PathBuf> = staged.difference(&tracked).cloned().collect();

        Ok(StagingDiff { missing, unexpected })
    }
}

#[derive(Debug)]
pub enum TrackError {
    Excluded(PathBuf),
    AlreadyTracked(PathBuf),
    PathEscape(String),
    Resource(ResourceError),
    Io(std::io::Error),
}

impl std::fmt::Display for TrackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackError::Excluded(p) => write!(f, "{} matches an exclusion pattern", p.display()),
            TrackError::AlreadyTracked(p) => write!(f, "{} is already tracked", p.display()),
            TrackError::PathEscape(msg) => write!(f, "{msg}"),
            TrackError::Resource(e) => write!(f, "{e}"),
            TrackError::Io(e) => write!(f, "failed to write tracked file: {e}"),
        }
    }
}

impl std::error::Error for TrackError {}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn tracker(root: &Path, common_dir: &Path) -> FileTracker {
        FileTracker::acquire(
            root,
            common_dir,
            Duration::from_secs(1),
            DEFAULT_MAX_FILES,
            DEFAULT_MAX_BYTES,
        )
        .unwrap()
    }

    #[test]
    fn tracks_creation_with_hash() {
        let root = tempdir().unwrap();
        let common = tempdir().unwrap();
        let mut t = tracker(root.path(), common.path());
        t.track_creation(Path::new("docs/githooks/README.md"), b"hello").unwrap();
        assert_eq!(t.ledger().changes.len(), 1);
        assert_eq!(t.ledger().changes[0].bytes, 5);
        assert!(!t.ledger().changes[0].sha256.is_empty());
    }

    #[test]
    fn rejects_duplicate_tracking() {
        let root = tempdir().unwrap();
        let common = tempdir().unwrap();
        let mut t = tracker(root.path(), common.path());
        t.track_creation(Path::new("a.txt"), b"x").unwrap();
        assert!(matches!(
            t.track_creation(Path::new("a.txt"), b"y"),
            Err(TrackError::AlreadyTracked(_))
        ));
    }

    #[test]
    fn rejects_pycache_and_dotfiles() {
        let root = tempdir().unwrap();
        let common = tempdir().unwrap();
        let mut t = tracker(root.path(), common.path());
        assert!(matches!(
            t.track_creation(Path::new("__pycache__/x.pyc"), b"x"),
            Err(TrackError::Excluded(_))
        ));
        assert!(matches!(
            t.track_creation(Path::new(".env"), b"x"),
            Err(TrackError::Excluded(_))
        ));
    }

    #[test]
    fn allows_allowlisted_dotfiles() {
        let root = tempdir().unwrap();
        let common = tempdir().unwrap();
        let mut t = tracker(root.path(), common.path());
        t.track_creation(Path::new(".githooks-version.json"), b"{}").unwrap();
        t.track_creation(Path::new(".gitignore"), b"*.log").unwrap();
        assert_eq!(t.ledger().changes.len(), 2);
    }

    #[test]
    fn rejects_path_escape() {
        let root = tempdir().unwrap();
        let common = tempdir().unwrap();
        let mut t = tracker(root.path(), common.path());
        assert!(matches!(
            t.track_creation(Path::new("../outside.txt"), b"x"),
            Err(TrackError::PathEscape(_))
        ));
    }

    #[test]
    fn enforces_file_count_cap() {
        let root = tempdir().unwrap();
        let common = tempdir().unwrap();
        let mut t = FileTracker::acquire(root.path(), common.path(), Duration::from_secs(1), 1, DEFAULT_MAX_BYTES).unwrap();
        t.track_creation(Path::new("one.txt"), b"x").unwrap();
        assert!(matches!(
            t.track_creation(Path::new("two.txt"), b"x"),
            Err(TrackError::Resource(ResourceError::TooManyFiles { .. }))
        ));
    }

    #[test]
    fn enforces_byte_cap() {
        let root = tempdir().unwrap();
        let common = tempdir().unwrap();
        let mut t = FileTracker::acquire(root.path(), common.path(), Duration::from_secs(1), DEFAULT_MAX_FILES, 4).unwrap();
        assert!(matches!(
            t.track_creation(Path::new("big.txt"), b"too big"),
            Err(TrackError::Resource(ResourceError::PayloadTooLarge { .. }))
        ));
    }

    #[test]
    fn second_acquire_times_out_while_first_holds_lock() {
        let root = tempdir().unwrap();
        let common = tempdir().unwrap();
        let _first = tracker(root.path(), common.path());
        let err = FileTracker::acquire(
            root.path(),
            common.path(),
            Duration::from_millis(200),
            DEFAULT_MAX_FILES,
            DEFAULT_MAX_BYTES,
        )
        .unwrap_err();
        assert!(matches!(err, LockError::Timeout { .. }));
    }

    #[test]
    fn lock_is_released_on_drop() {
        let root = tempdir().unwrap();
        let common = tempdir().unwrap();
        {
            let _t = tracker(root.path(), common.path());
        }
        let _t2 = tracker(root.path(), common.path());
    }

    #[test]
    fn ledger_round_trips_through_json() {
        let root = tempdir().unwrap();
        let common = tempdir().unwrap();
        let mut t = tracker(root.path(), common.path());
        t.track_creation(Path::new("a.txt"), b"one").unwrap();
        t.track_modification(Path::new("b.txt"), b"two").unwrap();
        t.track_directory(Path::new("docs")).unwrap();

        let json = serde_json::to_string(t.ledger()).unwrap();
        let restored: TrackerLedger = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.changes.len(), t.ledger().changes.len());
        assert_eq!(restored.changes[0].path, t.ledger().changes[0].path);
        assert_eq!(restored.created_directories, t.ledger().created_directories);
    }
}
