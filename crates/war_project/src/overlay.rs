use crate::artifact::empty_as_none;
use serde::{Deserialize, Deserializer, Serialize};

/// Include patterns applied when an overlay does not configure its own.
pub const DEFAULT_INCLUDES: &[&str] = &["**/**"];

/// Exclude patterns applied when an overlay does not configure its own.
pub const DEFAULT_EXCLUDES: &[&str] = &["META-INF/MANIFEST.MF"];

pub fn default_includes() -> Vec<String> {
    DEFAULT_INCLUDES.iter().map(|s| s.to_string()).collect()
}

pub fn default_excludes() -> Vec<String> {
    DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect()
}

fn default_overlay_type() -> String {
    "war".to_string()
}

/// Accepts either a list of patterns or a single comma separated string.
fn patterns<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Patterns {
        List(Vec<String>),
        Joined(String),
    }

    let list = match Patterns::deserialize(deserializer)? {
        Patterns::List(list) => list,
        Patterns::Joined(joined) => joined.split(',').map(str::to_string).collect(),
    };
    Ok(list
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect())
}

/// One configured overlay, as written by the user.
///
/// Leaving both `group_id` and `artifact_id` out refers to the current build;
/// placing such an entry in the overlay list controls where the project's own
/// content sits in the priority order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OverlayDescriptor {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_as_none"
    )]
    pub group_id: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_as_none"
    )]
    pub artifact_id: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_as_none"
    )]
    pub classifier: Option<String>,

    #[serde(rename = "type", default = "default_overlay_type")]
    pub overlay_type: String,

    /// Glob patterns of paths to take from the overlay.
    #[serde(default = "default_includes", deserialize_with = "patterns")]
    pub includes: Vec<String>,

    /// Glob patterns of paths to leave out.
    #[serde(default = "default_excludes", deserialize_with = "patterns")]
    pub excludes: Vec<String>,

    /// Run `${token}` substitution over text resources.
    #[serde(default)]
    pub filtered: bool,

    /// Resolve the overlay but never apply it.
    #[serde(default)]
    pub skip: bool,

    /// Relative prefix under which the overlay's content is placed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_path: Option<String>,
}

impl Default for OverlayDescriptor {
    fn default() -> Self {
        Self {
            group_id: None,
            artifact_id: None,
            classifier: None,
            overlay_type: default_overlay_type(),
            includes: default_includes(),
            excludes: default_excludes(),
            filtered: false,
            skip: false,
            target_path: None,
        }
    }
}

impl OverlayDescriptor {
    /// The descriptor standing for the project being built.
    pub fn current_build() -> Self {
        Self::default()
    }

    pub fn for_artifact(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: Some(group_id.into()),
            artifact_id: Some(artifact_id.into()),
            ..Self::default()
        }
    }

    pub fn with_classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }

    pub fn with_type(mut self, overlay_type: impl Into<String>) -> Self {
        self.overlay_type = overlay_type.into();
        self
    }

    pub fn with_includes<I, S>(mut self, includes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.includes = includes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_excludes<I, S>(mut self, excludes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excludes = excludes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_filtered(mut self, filtered: bool) -> Self {
        self.filtered = filtered;
        self
    }

    pub fn with_skip(mut self, skip: bool) -> Self {
        self.skip = skip;
        self
    }

    pub fn with_target_path(mut self, target_path: impl Into<String>) -> Self {
        self.target_path = Some(target_path.into());
        self
    }

    pub fn is_current_build(&self) -> bool {
        self.group_id.is_none() && self.artifact_id.is_none()
    }
}

/// Include/exclude sets applied to overlays that keep the library defaults.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FilterDefaults {
    #[serde(default = "default_includes", deserialize_with = "patterns")]
    pub includes: Vec<String>,

    #[serde(default = "default_excludes", deserialize_with = "patterns")]
    pub excludes: Vec<String>,
}

impl Default for FilterDefaults {
    fn default() -> Self {
        Self {
            includes: default_includes(),
            excludes: default_excludes(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_defaults() {
        let descriptor: OverlayDescriptor = serde_json::from_str("{}").unwrap();
        assert!(descriptor.is_current_build());
        assert_eq!(descriptor, OverlayDescriptor::current_build());
        assert_eq!(descriptor.overlay_type, "war");
        assert_eq!(descriptor.includes, vec!["**/**"]);
        assert_eq!(descriptor.excludes, vec!["META-INF/MANIFEST.MF"]);
    }

    #[test]
    fn test_comma_separated_patterns() {
        let descriptor: OverlayDescriptor = serde_json::from_str(
            r#"{ "group_id": "g", "artifact_id": "a", "includes": "*.jsp, WEB-INF/**", "excludes": [] }"#,
        )
        .unwrap();
        assert_eq!(descriptor.includes, vec!["*.jsp", "WEB-INF/**"]);
        assert!(descriptor.excludes.is_empty());
        assert!(!descriptor.is_current_build());
    }

    #[test]
    fn test_blank_coordinates_mean_current_build() {
        let descriptor: OverlayDescriptor =
            toml::from_str("group_id = \"\"\nartifact_id = \"\"\n").unwrap();
        assert!(descriptor.is_current_build());
    }

    #[test]
    fn test_half_specified_is_not_current_build() {
        let descriptor = OverlayDescriptor {
            artifact_id: Some("a".to_string()),
            ..OverlayDescriptor::default()
        };
        assert!(!descriptor.is_current_build());
    }
}
