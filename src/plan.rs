//! Installation plan construction.
//!
//! An [`InstallationPlan`] is produced once, before any filesystem mutation,
//! by walking the `--source` payload tree. It is immutable thereafter —
//! POPULATED executes exactly this list and nothing discovered afterward.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Hook,
    Script,
    Doc,
    Setup,
    Wrapper,
    Manifest,
}

impl ArtifactKind {
    /// Hooks and wrapper scripts get the executable bit set when written.
    pub fn is_executable(self) -> bool {
        matches!(self, ArtifactKind::Hook | ArtifactKind::Wrapper)
    }

    fn classify(relpath: &Path) -> Self {
        let s = relpath.to_string_lossy();
        if s.starts_with("scripts/post-commit/") {
            ArtifactKind::Hook
        } else if s.starts_with("docs/githooks/") {
            ArtifactKind::Doc
        } else if s.starts_with("developer-setup/") {
            ArtifactKind::Setup
        } else if relpath.components().count() == 1 {
            ArtifactKind::Wrapper
        } else {
            ArtifactKind::Script
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlanEntry {
    pub source: PathBuf,
    pub target: PathBuf,
    pub kind: ArtifactKind,
}

#[derive(Debug, Clone, Default)]
pub struct InstallationPlan {
    pub entries: Vec<PlanEntry>,
}

/// Walk `source_root` and build a plan of every regular file found,
/// skipping CI workflow templates when `skip_ci` is set (`--no-ci`).
pub fn build(source_root: &Path, skip_ci: bool) -> std::io::Result<InstallationPlan> {
    let mut entries = Vec::new();
    walk(source_root, source_root, skip_ci, &mut entries)?;
    entries.sort_by(|a, b| a.target.cmp(&b.target));
    Ok(InstallationPlan { entries })
}

fn walk(
    root: &Path,
    dir: &Path,
    skip_ci: bool,
    entries: &mut Vec<PlanEntry>,
) -> std::io::Result<()> {
    let mut children: Vec<_> = std::fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
    children.sort_by_key(|e| e.file_name());

    for entry in children {
        let path = entry.path();
        let file_type = entry.file_type()?;
        let relpath = path.strip_prefix(root).unwrap_or(&path).to_path_buf();

        if skip_ci && relpath.starts_with(".github/workflows") {
            continue;
        }

        if file_type.is_dir() {
            walk(root, &path, skip_ci, entries)?;
        } else if file_type.is_file() {
            entries.push(PlanEntry {
                source: path.clone(),
                target: relpath.clone(),
                kind: ArtifactKind::classify(&relpath),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn classifies_hook_and_doc_and_setup() {
        let root = tempdir().unwrap();
        write(root.path(), "scripts/post-commit/post-commit.sh", "#!/bin/sh\n");
        write(root.path(), "docs/githooks/README.md", "# hooks\n");
        write(root.path(), "developer-setup/setup.sh", "#!/bin/sh\n");
        write(root.path(), "install-hooks.sh", "#!/bin/sh\n");

        let plan = build(root.path(), false).unwrap();
        let kinds: Vec<_> = plan.entries.iter().map(|e| e.kind).collect();
        assert!(kinds.contains(&ArtifactKind::Hook));
        assert!(kinds.contains(&ArtifactKind::Doc));
        assert!(kinds.contains(&ArtifactKind::Setup));
        assert!(kinds.contains(&ArtifactKind::Wrapper));
    }

    #[test]
    fn skips_ci_workflows_when_requested() {
        let root = tempdir().unwrap();
        write(root.path(), ".github/workflows/ci.yml", "name: ci\n");
        write(root.path(), "docs/githooks/README.md", "# hooks\n");

        let plan = build(root.path(), true).unwrap();
        assert_eq!(plan.entries.len(), 1);
        assert_eq!(plan.entries[0].target, Path::new("docs/githooks/README.md"));
    }

    #[test]
    fn includes_ci_workflows_by_default() {
        let root = tempdir().unwrap();
        write(root.path(), ".github/workflows/ci.yml", "name: ci\n");

        let plan = build(root.path(), false).unwrap();
        assert_eq!(plan.entries.len(), 1);
    }

    #[test]
    fn hook_and_wrapper_kinds_are_executable() {
        assert!(ArtifactKind::Hook.is_executable());
        assert!(ArtifactKind::Wrapper.is_executable());
        assert!(!ArtifactKind::Doc.is_executable());
    }

    #[test]
    fn entries_are_sorted_by_target() {
        let root = tempdir().unwrap();
        write(root.path(), "docs/githooks/README.md", "b");
        write(root.path(), "developer-setup/setup.sh", "a");

        let plan = build(root.path(), false).unwrap();
        let targets: Vec<_> = plan.entries.iter().map(|e| e.target.clone()).collect();
        let mut sorted = targets.clone();
        sorted.sort();
        assert_eq!(targets, sorted);
    }
}
