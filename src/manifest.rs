//! On-disk installation state: the version marker and the installation
//! manifest, both written under `<docs>/githooks/` and themselves tracked
//! as created files before commit.

use serde::{Deserialize, Serialize};

use crate::tracker::TrackerLedger;

pub const VERSION_MARKER_FILENAME: &str = ".githooks-version.json";
pub const MANIFEST_FILENAME: &str = ".installation-manifest.json";

/// `<docs>/githooks/.githooks-version.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionMarker {
    pub installer_version: String,
    pub installed_at: String,
    pub source: String,
}

impl VersionMarker {
    pub fn current(source: impl Into<String>, installed_at: impl Into<String>) -> Self {
        Self {
            installer_version: env!("CARGO_PKG_VERSION").to_string(),
            installed_at: installed_at.into(),
            source: source.into(),
        }
    }
}

/// `<docs>/githooks/.installation-manifest.json`: the serialized
/// [`TrackerLedger`] for the most recent installation, machine-readable and
/// order-stable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallationManifest {
    pub installer_version: String,
    pub generated_at: String,
    pub ledger: TrackerLedger,
}

impl InstallationManifest {
    pub fn new(ledger: TrackerLedger, generated_at: impl Into<String>) -> Self {
        Self {
            installer_version: env!("CARGO_PKG_VERSION").to_string(),
            generated_at: generated_at.into(),
            ledger,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::{MutationKind, TrackedChange};
    use std::path::PathBuf;

    #[test]
    fn manifest_round_trips_through_json() {
        let ledger = TrackerLedger {
            changes: vec![TrackedChange {
                path: PathBuf::from("docs/githooks/README.md"),
                kind: MutationKind::Created,
                bytes: 42,
                sha256: "abc123".to_string(),
            }],
            created_directories: vec![PathBuf::from("docs/githooks")],
        };
        let manifest = InstallationManifest::new(ledger, "2026-01-01T00:00:00Z");
        let json = manifest.to_json().unwrap();
        let restored: InstallationManifest = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.ledger.changes.len(), 1);
        assert_eq!(restored.ledger.changes[0].path, manifest.ledger.changes[0].path);
        assert_eq!(restored.generated_at, manifest.generated_at);
    }

    #[test]
    fn version_marker_round_trips() {
        let marker = VersionMarker::current("local-payload", "2026-01-01T00:00:00Z");
        let json = serde_json::to_string(&marker).unwrap();
        let restored: VersionMarker = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.installer_version, marker.installer_version);
        assert_eq!(restored.source, "local-payload");
    }
}
