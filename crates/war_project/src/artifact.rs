use camino::Utf8PathBuf;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Dependency scope of a resolved artifact.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactScope {
    #[default]
    Compile,
    Provided,
    Runtime,
    Test,
    System,
}

impl ArtifactScope {
    /// Whether the artifact is visible on the runtime classpath.
    pub fn is_runtime(self) -> bool {
        matches!(self, ArtifactScope::Compile | ArtifactScope::Runtime)
    }
}

/// A resolved build artifact handed to the assembler.
///
/// The list of artifacts is expected to be already resolved and deduplicated
/// by the surrounding build tool.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Artifact {
    pub group_id: String,

    pub artifact_id: String,

    pub version: String,

    /// Optional classifier. An empty string is read as "no classifier".
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_as_none"
    )]
    pub classifier: Option<String>,

    /// Packaging type, e.g. `jar` or `war`.
    #[serde(rename = "type", default = "default_artifact_type")]
    pub artifact_type: String,

    #[serde(default)]
    pub scope: ArtifactScope,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,

    /// Backing file (archive) or directory of the artifact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<Utf8PathBuf>,
}

fn default_artifact_type() -> String {
    "jar".to_string()
}

pub(crate) fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

impl Artifact {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
            classifier: None,
            artifact_type: default_artifact_type(),
            scope: ArtifactScope::default(),
            optional: false,
            file: None,
        }
    }

    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        let classifier = classifier.into();
        self.classifier = (!classifier.trim().is_empty()).then_some(classifier);
        self
    }

    pub fn with_type(mut self, artifact_type: impl Into<String>) -> Self {
        self.artifact_type = artifact_type.into();
        self
    }

    pub fn with_scope(mut self, scope: ArtifactScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn with_file(mut self, file: impl Into<Utf8PathBuf>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Exact coordinate match. A missing classifier only equals a missing
    /// classifier; it is never a wildcard.
    pub fn same_coordinates(
        &self,
        group_id: &str,
        artifact_id: &str,
        artifact_type: &str,
        classifier: Option<&str>,
    ) -> bool {
        self.group_id == group_id
            && self.artifact_id == artifact_id
            && self.artifact_type == artifact_type
            && self.classifier.as_deref() == classifier
    }

    /// Whether this artifact is a web application archive.
    pub fn is_war(&self) -> bool {
        self.artifact_type == "war"
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.group_id, self.artifact_id, self.artifact_type
        )?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{}", classifier)?;
        }
        write!(f, ":{}", self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_scopes() {
        assert!(ArtifactScope::Compile.is_runtime());
        assert!(ArtifactScope::Runtime.is_runtime());
        assert!(!ArtifactScope::Provided.is_runtime());
        assert!(!ArtifactScope::Test.is_runtime());
        assert!(!ArtifactScope::System.is_runtime());
    }

    #[test]
    fn test_empty_classifier_is_none() {
        let artifact: Artifact = serde_json::from_str(
            r#"{ "group_id": "g", "artifact_id": "a", "version": "1.0", "classifier": "" }"#,
        )
        .unwrap();
        assert_eq!(artifact.classifier, None);
        assert_eq!(artifact.artifact_type, "jar");
        assert_eq!(artifact.scope, ArtifactScope::Compile);

        let artifact = Artifact::new("g", "a", "1.0").with_classifier("  ");
        assert_eq!(artifact.classifier, None);
    }

    #[test]
    fn test_same_coordinates_classifier_is_not_wildcard() {
        let plain = Artifact::new("test", "webapp", "1.0").with_type("war");
        let classified = plain.clone().with_classifier("skin");

        assert!(plain.same_coordinates("test", "webapp", "war", None));
        assert!(!plain.same_coordinates("test", "webapp", "war", Some("skin")));
        assert!(!classified.same_coordinates("test", "webapp", "war", None));
        assert!(classified.same_coordinates("test", "webapp", "war", Some("skin")));
        assert!(!plain.same_coordinates("test", "webapp", "jar", None));
    }

    #[test]
    fn test_display() {
        let artifact = Artifact::new("org.sample", "shell", "2.1")
            .with_type("war")
            .with_classifier("jdk8");
        assert_eq!(artifact.to_string(), "org.sample:shell:war:jdk8:2.1");
    }
}
