//! Artifact coordinates and the derived on-disk file name.
//!
//! A [`Dependency`] identifies one external binary artifact by its
//! `group:artifact:version` coordinates. It may optionally be pinned to a
//! single [`Repository`]; the pin is carried along for candidate selection
//! but never takes part in equality or hashing, so the in-flight ledger keys
//! purely on coordinates.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use thiserror::Error;

use crate::repository::Repository;

/// File extension used for materialized artifacts.
pub const ARTIFACT_EXTENSION: &str = "jar";

/// Errors produced when parsing coordinate notation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoordinateError {
    /// The input did not have exactly three colon-separated parts.
    #[error("invalid coordinates '{input}': expected group:artifact:version")]
    Malformed {
        /// The rejected input.
        input: String,
    },

    /// One of the parts was empty after trimming.
    #[error("invalid coordinates '{input}': {field} must not be empty")]
    EmptyField {
        /// The rejected input.
        input: String,
        /// Which coordinate part was empty.
        field: &'static str,
    },

    /// One of the parts could escape the libraries directory once used in a
    /// file name.
    #[error("invalid coordinates '{input}': {field} {reason}")]
    UnsafeField {
        /// The rejected input.
        input: String,
        /// Which coordinate part was rejected.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
}

/// Checks that one coordinate part is usable as a plain file name fragment.
///
/// Path separators, `..` and control characters are refused.
///
/// # Errors
///
/// Returns a short description of the first problem found.
pub fn check_coordinate_part(value: &str) -> Result<(), &'static str> {
    if value.contains(['/', '\\']) {
        return Err("must not contain path separators");
    }
    if value.contains("..") {
        return Err("must not contain '..'");
    }
    if value.chars().any(char::is_control) {
        return Err("must not contain control characters");
    }
    Ok(())
}

/// One external artifact, identified by coordinates.
#[derive(Clone)]
pub struct Dependency {
    group_id: String,
    artifact_id: String,
    version: String,
    source_repository: Option<Arc<dyn Repository>>,
}

impl Dependency {
    /// Creates an unpinned dependency.
    #[must_use]
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            source_repository: None,
        }
    }

    /// Parses `group:artifact:version` notation.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateError`] when the input does not have three
    /// non-empty parts, or when a part could not be used in a file name.
    pub fn parse(input: &str) -> Result<Self, CoordinateError> {
        let parts: Vec<&str> = input.trim().split(':').map(str::trim).collect();
        let [group_id, artifact_id, version] = parts.as_slice() else {
            return Err(CoordinateError::Malformed {
                input: input.to_string(),
            });
        };

        for (field, value) in [
            ("group", group_id),
            ("artifact", artifact_id),
            ("version", version),
        ] {
            if value.is_empty() {
                return Err(CoordinateError::EmptyField {
                    input: input.to_string(),
                    field,
                });
            }
            if let Err(reason) = check_coordinate_part(value) {
                return Err(CoordinateError::UnsafeField {
                    input: input.to_string(),
                    field,
                    reason,
                });
            }
        }

        Ok(Self::new(*group_id, *artifact_id, *version))
    }

    /// Returns this dependency pinned to `repository`.
    #[must_use]
    pub fn pinned_to(mut self, repository: Arc<dyn Repository>) -> Self {
        self.source_repository = Some(repository);
        self
    }

    /// Group identifier (e.g. `org.slf4j`).
    #[must_use]
    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// Artifact identifier (e.g. `slf4j-api`).
    #[must_use]
    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    /// Exact version string.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Repository this dependency must be fetched from, if pinned.
    #[must_use]
    pub fn source_repository(&self) -> Option<&Arc<dyn Repository>> {
        self.source_repository.as_ref()
    }

    /// Deterministic file name used for the materialized artifact.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!(
            "{}-{}.{ARTIFACT_EXTENSION}",
            self.artifact_id, self.version
        )
    }

    /// Whether every coordinate part is safe to turn into a file name.
    ///
    /// Coordinates read from remote descriptors are not trusted; the engine
    /// refuses to materialize a dependency that fails this check.
    #[must_use]
    pub fn is_path_safe(&self) -> bool {
        [&self.group_id, &self.artifact_id, &self.version]
            .into_iter()
            .all(|part| !part.is_empty() && check_coordinate_part(part).is_ok())
    }

    /// Renders `group:artifact:version`.
    #[must_use]
    pub fn coordinates(&self) -> String {
        format!("{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }

    /// Group identifier with dots replaced by path separators.
    #[must_use]
    pub fn group_path(&self) -> String {
        self.group_id.replace('.', "/")
    }
}

impl PartialEq for Dependency {
    fn eq(&self, other: &Self) -> bool {
        self.group_id == other.group_id
            && self.artifact_id == other.artifact_id
            && self.version == other.version
    }
}

impl Eq for Dependency {}

impl Hash for Dependency {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.group_id.hash(state);
        self.artifact_id.hash(state);
        self.version.hash(state);
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependency")
            .field("group_id", &self.group_id)
            .field("artifact_id", &self.artifact_id)
            .field("version", &self.version)
            .field(
                "source_repository",
                &self.source_repository.as_ref().map(|repo| repo.name()),
            )
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use async_trait::async_trait;

    use super::*;
    use crate::repository::RepositoryError;

    struct NamedRepository(&'static str);

    #[async_trait]
    impl Repository for NamedRepository {
        fn name(&self) -> &str {
            self.0
        }

        async fn contains(&self, _dependency: &Dependency) -> Result<bool, RepositoryError> {
            Ok(false)
        }

        async fn transitive_dependencies(
            &self,
            _dependency: &Dependency,
        ) -> Result<HashSet<Dependency>, RepositoryError> {
            Ok(HashSet::new())
        }

        async fn download_dependency(
            &self,
            _dependency: &Dependency,
        ) -> Result<Vec<u8>, RepositoryError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_file_name_uses_artifact_and_version() {
        let dep = Dependency::new("org.slf4j", "slf4j-api", "2.0.9");
        assert_eq!(dep.file_name(), "slf4j-api-2.0.9.jar");
    }

    #[test]
    fn test_group_path_replaces_dots() {
        let dep = Dependency::new("com.google.code.gson", "gson", "2.10.1");
        assert_eq!(dep.group_path(), "com/google/code/gson");
    }

    #[test]
    fn test_equality_ignores_pinned_repository() {
        let plain = Dependency::new("g", "a", "1");
        let pinned = Dependency::new("g", "a", "1").pinned_to(Arc::new(NamedRepository("r")));

        assert_eq!(plain, pinned);

        let mut set = HashSet::new();
        set.insert(plain);
        assert!(!set.insert(pinned), "pinned duplicate must hash identically");
    }

    #[test]
    fn test_differing_versions_are_distinct() {
        assert_ne!(Dependency::new("g", "a", "1"), Dependency::new("g", "a", "2"));
    }

    #[test]
    fn test_parse_valid_coordinates() {
        let dep = Dependency::parse(" org.example : lib : 1.0 ").unwrap();
        assert_eq!(dep.group_id(), "org.example");
        assert_eq!(dep.artifact_id(), "lib");
        assert_eq!(dep.version(), "1.0");
        assert!(dep.source_repository().is_none());
    }

    #[test]
    fn test_parse_rejects_wrong_arity_and_empty_parts() {
        assert!(matches!(
            Dependency::parse("org.example:lib"),
            Err(CoordinateError::Malformed { .. })
        ));
        assert_eq!(
            Dependency::parse("org.example::1.0"),
            Err(CoordinateError::EmptyField {
                input: "org.example::1.0".to_string(),
                field: "artifact",
            })
        );
    }

    #[test]
    fn test_parse_rejects_path_traversal() {
        assert!(matches!(
            Dependency::parse("org.example:../escaped:1.0"),
            Err(CoordinateError::UnsafeField { field: "artifact", .. })
        ));
        assert!(matches!(
            Dependency::parse("org.example:lib:1.0\\..\\x"),
            Err(CoordinateError::UnsafeField { field: "version", .. })
        ));
        assert!(matches!(
            Dependency::parse("org/example:lib:1.0"),
            Err(CoordinateError::UnsafeField { field: "group", .. })
        ));
    }

    #[test]
    fn test_is_path_safe() {
        assert!(Dependency::new("org.example", "lib", "1.0-SNAPSHOT").is_path_safe());
        assert!(!Dependency::new("org.example", "../escaped", "1.0").is_path_safe());
        assert!(!Dependency::new("org.example", "lib", "1\n0").is_path_safe());
        assert!(!Dependency::new("org.example", "", "1.0").is_path_safe());
    }

    #[test]
    fn test_check_coordinate_part_accepts_dots_and_dashes() {
        assert_eq!(check_coordinate_part("32.1.3-jre"), Ok(()));
        assert_eq!(check_coordinate_part("a/b"), Err("must not contain path separators"));
    }

    #[test]
    fn test_debug_shows_pinned_repository_name() {
        let dep = Dependency::new("g", "a", "1").pinned_to(Arc::new(NamedRepository("mirror")));
        let debug = format!("{dep:?}");
        assert!(debug.contains("mirror"), "Debug should name the pin: {debug}");
        assert_eq!(dep.to_string(), "g:a:1");
    }
}
