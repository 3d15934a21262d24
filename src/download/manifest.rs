//! Transitive manifests stored next to materialized artifacts.
//!
//! After `a-1.jar` resolves, `a-1.jar.deps.json` records the coordinates of
//! its direct transitive dependencies:
//!
//! ```json
//! { "dependencies": [ { "groupId": "g", "artifactId": "b", "version": "2" } ] }
//! ```
//!
//! When both files exist a later resolution trusts the manifest and never
//! asks a repository about the artifact again.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::atomic::write_atomic;
use super::error::MaterializeError;
use crate::config::DependencyDeclaration;
use crate::dependency::Dependency;

/// Suffix appended to the artifact file name.
pub const MANIFEST_SUFFIX: &str = ".deps.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct TransitiveManifest {
    #[serde(default)]
    dependencies: Vec<DependencyDeclaration>,
}

/// Path of the manifest belonging to `artifact_path`.
#[must_use]
pub fn manifest_path(artifact_path: &Path) -> PathBuf {
    let mut name = artifact_path.as_os_str().to_os_string();
    name.push(MANIFEST_SUFFIX);
    PathBuf::from(name)
}

/// Reads the manifest for `artifact_path`.
///
/// Returns `None` when the manifest is absent, unreadable, or corrupt; the
/// latter two are logged.
pub async fn read_manifest(artifact_path: &Path) -> Option<Vec<Dependency>> {
    let path = manifest_path(artifact_path);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(error) if error.kind() == ErrorKind::NotFound => return None,
        Err(error) => {
            warn!(path = %path.display(), error = %error, "Could not read manifest, ignoring");
            return None;
        }
    };

    match serde_json::from_slice::<TransitiveManifest>(&bytes) {
        Ok(manifest) => {
            debug!(
                path = %path.display(),
                count = manifest.dependencies.len(),
                "Using stored manifest"
            );
            Some(
                manifest
                    .dependencies
                    .iter()
                    .map(DependencyDeclaration::to_unpinned_dependency)
                    .collect(),
            )
        }
        Err(error) => {
            warn!(path = %path.display(), error = %error, "Corrupt manifest, ignoring");
            None
        }
    }
}

/// Writes the manifest for `artifact_path`, sorted by coordinates.
///
/// # Errors
///
/// Returns [`MaterializeError`] when serialization or the atomic write fails.
pub async fn write_manifest(
    artifact_path: &Path,
    dependencies: &HashSet<Dependency>,
) -> Result<(), MaterializeError> {
    let path = manifest_path(artifact_path);
    let mut declarations: Vec<DependencyDeclaration> = dependencies
        .iter()
        .map(DependencyDeclaration::from_dependency)
        .collect();
    declarations.sort_by(|a, b| {
        (&a.group_id, &a.artifact_id, &a.version).cmp(&(&b.group_id, &b.artifact_id, &b.version))
    });

    let manifest = TransitiveManifest {
        dependencies: declarations,
    };
    let bytes =
        serde_json::to_vec_pretty(&manifest).map_err(|e| MaterializeError::manifest(&path, e))?;
    write_atomic(&path, &bytes).await
}
