//! Transitive dependency discovery strategies.
//!
//! The generic HTTP repository asks a [`TransitiveDiscovery`] what an artifact
//! depends on. Coordinate-layout repositories read the artifact's POM; the
//! plugin-hosting site publishes a JSON resource manifest instead.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::DependencyDeclaration;
use crate::dependency::Dependency;

use super::RepositoryError;
use super::maven::{artifact_url, fetch_optional_text};

/// Scopes whose dependencies are needed at runtime.
const RUNTIME_SCOPES: [&str; 2] = ["compile", "runtime"];

/// File suffix of the plugin-hosting site's resource manifest.
const RESOURCE_MANIFEST_EXTENSION: &str = "dependencies.json";

fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"(?s)<!--.*?-->"));

// Sections whose <dependency> elements do not describe the artifact's own
// runtime requirements.
static IGNORED_SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(
        r"(?s)<dependencyManagement>.*?</dependencyManagement>|<build>.*?</build>|<profiles>.*?</profiles>|<reporting>.*?</reporting>",
    )
});

static EXCLUSIONS_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?s)<exclusions>.*?</exclusions>"));

static DEPENDENCIES_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?s)<dependencies>(.*?)</dependencies>"));

static DEPENDENCY_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?s)<dependency>(.*?)</dependency>"));

static PROPERTIES_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?s)<properties>(.*?)</properties>"));

static PARENT_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"(?s)<parent>(.*?)</parent>"));

// The regex crate has no backreferences, so the closing tag is captured and
// compared by hand.
static SIMPLE_ELEMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r"<([A-Za-z0-9_.\-]+)>\s*([^<]*?)\s*</([A-Za-z0-9_.\-]+)>")
});

static PROPERTY_REF_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"\$\{([^}]+)\}"));

/// Strategy for finding an artifact's declared dependencies.
#[async_trait]
pub trait TransitiveDiscovery: Send + Sync {
    /// Short label used in logs and `Debug` output.
    fn name(&self) -> &'static str;

    /// Returns the dependencies declared for `dependency`.
    ///
    /// A missing descriptor yields an empty set.
    async fn discover(
        &self,
        client: &Client,
        base_url: &Url,
        dependency: &Dependency,
    ) -> Result<HashSet<Dependency>, RepositoryError>;
}

/// Reads `<dependencies>` from the artifact's POM descriptor.
#[derive(Debug, Default, Clone, Copy)]
pub struct PomDiscovery;

#[async_trait]
impl TransitiveDiscovery for PomDiscovery {
    fn name(&self) -> &'static str {
        "pom"
    }

    #[instrument(skip(self, client, base_url), fields(dependency = %dependency))]
    async fn discover(
        &self,
        client: &Client,
        base_url: &Url,
        dependency: &Dependency,
    ) -> Result<HashSet<Dependency>, RepositoryError> {
        let url = artifact_url(base_url, dependency, "pom")?;
        let Some(pom) = fetch_optional_text(client, &url).await? else {
            debug!(url = %url, "no POM published; assuming no transitive dependencies");
            return Ok(HashSet::new());
        };
        Ok(parse_pom(&pom, dependency))
    }
}

/// Reads the plugin-hosting site's JSON resource manifest.
///
/// The manifest sits next to the jar as `{artifact}-{version}.dependencies.json`
/// and has the shape `{"dependencies": [{"groupId", "artifactId", "version"}]}`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResourceManifestDiscovery;

#[derive(Debug, Deserialize)]
struct ResourceManifest {
    #[serde(default)]
    dependencies: Vec<DependencyDeclaration>,
}

#[async_trait]
impl TransitiveDiscovery for ResourceManifestDiscovery {
    fn name(&self) -> &'static str {
        "resource-manifest"
    }

    #[instrument(skip(self, client, base_url), fields(dependency = %dependency))]
    async fn discover(
        &self,
        client: &Client,
        base_url: &Url,
        dependency: &Dependency,
    ) -> Result<HashSet<Dependency>, RepositoryError> {
        let url = artifact_url(base_url, dependency, RESOURCE_MANIFEST_EXTENSION)?;
        let Some(body) = fetch_optional_text(client, &url).await? else {
            debug!(url = %url, "no resource manifest published");
            return Ok(HashSet::new());
        };

        let manifest: ResourceManifest = serde_json::from_str(&body)
            .map_err(|e| RepositoryError::malformed(url.as_str(), e.to_string()))?;

        Ok(manifest
            .dependencies
            .iter()
            .map(DependencyDeclaration::to_unpinned_dependency)
            .filter(|dep| dep != dependency)
            .filter(|dep| {
                let safe = dep.is_path_safe();
                if !safe {
                    warn!(
                        url = %url,
                        entry = %dep,
                        "Ignoring unsafe coordinates in resource manifest"
                    );
                }
                safe
            })
            .collect())
    }
}

/// Extracts runtime dependencies from a POM document.
///
/// `owner` supplies `${project.groupId}` / `${project.version}`. Entries with
/// a non-runtime scope, `<optional>true</optional>`, or a version that is
/// missing or still references an unknown property are skipped.
#[must_use]
pub fn parse_pom(pom: &str, owner: &Dependency) -> HashSet<Dependency> {
    let without_comments = COMMENT_RE.replace_all(pom, "");
    let relevant = IGNORED_SECTION_RE.replace_all(&without_comments, "");

    let properties = collect_properties(&relevant, owner);

    let mut found = HashSet::new();
    for section in DEPENDENCIES_RE.captures_iter(&relevant) {
        let Some(section_body) = section.get(1) else {
            continue;
        };
        for entry in DEPENDENCY_RE.captures_iter(section_body.as_str()) {
            let Some(entry_body) = entry.get(1) else {
                continue;
            };
            let body = EXCLUSIONS_RE.replace_all(entry_body.as_str(), "");
            let fields = simple_elements(&body);
            if let Some(dep) = dependency_from_fields(&fields, &properties) {
                if &dep != owner {
                    found.insert(dep);
                }
            } else {
                debug!(entry = %body.trim(), "skipping POM dependency entry");
            }
        }
    }
    found
}

fn dependency_from_fields(
    fields: &HashMap<String, String>,
    properties: &HashMap<String, String>,
) -> Option<Dependency> {
    let scope = fields.get("scope").map_or("compile", String::as_str);
    if !RUNTIME_SCOPES.contains(&scope) {
        return None;
    }
    if fields
        .get("optional")
        .is_some_and(|value| value.eq_ignore_ascii_case("true"))
    {
        return None;
    }

    let group_id = interpolate(fields.get("groupId")?, properties)?;
    let artifact_id = interpolate(fields.get("artifactId")?, properties)?;
    let version = interpolate(fields.get("version")?, properties)?;
    let dependency = Dependency::new(group_id, artifact_id, version);
    if !dependency.is_path_safe() {
        warn!(entry = %dependency, "Ignoring unsafe coordinates in POM");
        return None;
    }
    Some(dependency)
}

fn collect_properties(pom: &str, owner: &Dependency) -> HashMap<String, String> {
    let mut properties = HashMap::new();

    if let Some(body) = PROPERTIES_RE.captures(pom).and_then(|c| c.get(1)) {
        properties.extend(simple_elements(body.as_str()));
    }

    if let Some(body) = PARENT_RE.captures(pom).and_then(|c| c.get(1)) {
        let parent = simple_elements(body.as_str());
        if let Some(version) = parent.get("version") {
            properties.insert("project.parent.version".to_string(), version.clone());
        }
        if let Some(group_id) = parent.get("groupId") {
            properties.insert("project.parent.groupId".to_string(), group_id.clone());
        }
    }

    for key in ["project.version", "pom.version", "version"] {
        properties.insert(key.to_string(), owner.version().to_string());
    }
    for key in ["project.groupId", "pom.groupId", "groupId"] {
        properties.insert(key.to_string(), owner.group_id().to_string());
    }
    properties
}

fn simple_elements(xml: &str) -> HashMap<String, String> {
    SIMPLE_ELEMENT_RE
        .captures_iter(xml)
        .filter_map(|caps| {
            let open = caps.get(1)?.as_str();
            let close = caps.get(3)?.as_str();
            let value = caps.get(2)?.as_str();
            (open == close).then(|| (open.to_string(), value.to_string()))
        })
        .collect()
}

/// Substitutes `${name}` references; `None` when one stays unresolved.
fn interpolate(value: &str, properties: &HashMap<String, String>) -> Option<String> {
    let mut current = value.trim().to_string();
    // Properties may reference other properties; bound the passes.
    for _ in 0..8 {
        if !current.contains("${") {
            return Some(current);
        }
        let mut unresolved = false;
        let next = PROPERTY_REF_RE
            .replace_all(&current, |caps: &regex::Captures<'_>| {
                if let Some(replacement) = properties.get(&caps[1]) {
                    replacement.clone()
                } else {
                    unresolved = true;
                    caps[0].to_string()
                }
            })
            .into_owned();
        if unresolved {
            return None;
        }
        current = next;
    }
    (!current.contains("${")).then_some(current)
}
