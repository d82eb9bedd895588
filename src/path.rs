//! Path canonicalization and containment helpers.
//!
//! Every path the installer writes to must be proven to live inside the
//! bound repository root after symlink resolution — this module is the one
//! place that does that proof, so the file tracker and VCS wrapper both call
//! through it rather than canonicalizing paths ad hoc.

use std::path::{Component, Path, PathBuf};

use normalize_path::NormalizePath;

/// Canonicalize `path`, avoiding the `\\?\` verbatim prefix Windows would
/// otherwise attach to the result (which confuses plain argv-based `git`
/// invocations).
pub fn canonicalize(path: &Path) -> std::io::Result<PathBuf> {
    dunce::canonicalize(path)
}

/// Resolve `relpath` against `root` and prove the result is a descendant of
/// `root` after canonicalization, rejecting `..` segments and absolute paths
/// lexically before ever touching the filesystem.
///
/// `root` must already exist. `relpath` need not: only the deepest existing
/// ancestor of the joined path is canonicalized, with the not-yet-created
/// tail re-attached afterward, so brand new files are still checked against
/// symlink escapes in their existing parent directories.
pub fn contain(root: &Path, relpath: &Path) -> Result<PathBuf, PathEscapeError> {
    if relpath.as_os_str().is_empty() {
        return Err(PathEscapeError::Empty);
    }

    for component in relpath.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            Component::ParentDir => return Err(PathEscapeError::ParentDir),
            Component::RootDir | Component::Prefix(_) => return Err(PathEscapeError::Absolute),
        }
    }

    let joined = root.join(relpath).normalize();
    let (existing, tail) = deepest_existing_ancestor(&joined);

    let canon_existing = canonicalize(&existing).map_err(PathEscapeError::Io)?;
    let canon_root = canonicalize(root).map_err(PathEscapeError::Io)?;

    if !canon_existing.starts_with(&canon_root) {
        return Err(PathEscapeError::OutsideRoot);
    }

    Ok(canon_existing.join(tail))
}

fn deepest_existing_ancestor(path: &Path) -> (PathBuf, PathBuf) {
    let mut existing = path.to_path_buf();
    let mut tail = PathBuf::new();

    while !existing.exists() {
        let Some(parent) = existing.parent() else {
            break;
        };
        let Some(name) = existing.file_name() else {
            break;
        };
        tail = PathBuf::from(name).join(&tail);
        existing = parent.to_path_buf();
    }

    (existing, tail)
}

#[derive(Debug)]
pub enum PathEscapeError {
    Empty,
    ParentDir,
    Absolute,
    OutsideRoot,
    Io(std::io::Error),
}

impl std::fmt::Display for PathEscapeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathEscapeError::Empty => write!(f, "path is empty"),
            PathEscapeError::ParentDir => write!(f, "path contains a '..' component"),
            PathEscapeError::Absolute => write!(f, "path is absolute"),
            PathEscapeError::OutsideRoot => write!(f, "path escapes the repository root"),
            PathEscapeError::Io(e) => write!(f, "failed to resolve path: {e}"),
        }
    }
}

impl std::error::Error for PathEscapeError {}

/// Get the user's home directory.
///
/// Uses the `home` crate, which handles platform-specific detection
/// (`$HOME` on Unix, `USERPROFILE`/`HOMEDRIVE`+`HOMEPATH` on Windows).
pub fn home_dir() -> Option<PathBuf> {
    home::home_dir()
}

/// Format a filesystem path for user-facing output.
///
/// Replaces a home directory prefix with `~` (e.g. `/home/alex/repo` ->
/// `~/repo`). Paths outside home are returned unchanged.
pub fn format_path_for_display(path: &Path) -> String {
    if let Some(home) = home_dir()
        && let Ok(stripped) = path.strip_prefix(&home)
    {
        if stripped.as_os_str().is_empty() {
            return "~".to_string();
        }

        let mut display_path = PathBuf::from("~");
        display_path.push(stripped);
        return display_path.display().to_string();
    }

    path.display().to_string()
}
