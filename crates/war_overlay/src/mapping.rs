//! Library file naming under `WEB-INF/lib/`.
//!
//! A [`MappingRegistry`] maps strategy names to constructors. Three strategies
//! are built in:
//!
//! | Name         | Result                                          |
//! |--------------|-------------------------------------------------|
//! | `standard`   | `artifactId-version[-classifier].ext`           |
//! | `full`       | `groupId-artifactId-version[-classifier].ext`   |
//! | `no-version` | `artifactId[-classifier].ext`                   |
//!
//! Any name containing `@{` is read as a pattern, for example
//! `@{artifactId}@@{dashClassifier?}@.@{extension}@`.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use war_project::Artifact;

const STANDARD: &str = "@{artifactId}@-@{version}@@{dashClassifier?}@.@{extension}@";
const FULL: &str = "@{groupId}@-@{artifactId}@-@{version}@@{dashClassifier?}@.@{extension}@";
const NO_VERSION: &str = "@{artifactId}@@{dashClassifier?}@.@{extension}@";

/// Names an artifact's file inside the assembled tree.
pub trait FileNameMapping: Send + Sync + fmt::Debug {
    fn file_name(&self, artifact: &Artifact) -> String;
}

/// Constructor stored in the registry.
pub type MappingConstructor = fn() -> Box<dyn FileNameMapping>;

/// Named file name strategies.
#[derive(Clone)]
pub struct MappingRegistry {
    constructors: BTreeMap<String, MappingConstructor>,
}

impl Default for MappingRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("standard", || Box::new(PatternMapping::builtin(STANDARD)));
        registry.register("full", || Box::new(PatternMapping::builtin(FULL)));
        registry.register("no-version", || {
            Box::new(PatternMapping::builtin(NO_VERSION))
        });
        registry
    }
}

impl fmt::Debug for MappingRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.constructors.keys()).finish()
    }
}

impl MappingRegistry {
    /// A registry without the built-in strategies.
    pub fn empty() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// Register or replace a named strategy.
    pub fn register(&mut self, name: impl Into<String>, constructor: MappingConstructor) {
        self.constructors.insert(name.into(), constructor);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    /// Instantiate the strategy registered as `name`, or compile `name` as a pattern.
    pub fn get(&self, name: &str) -> Result<Box<dyn FileNameMapping>> {
        if let Some(constructor) = self.constructors.get(name) {
            return Ok(constructor());
        }
        if name.contains("@{") {
            return Ok(Box::new(PatternMapping::new(name)?));
        }
        Err(Error::UnknownMapping(name.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Token(Token),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    GroupId,
    ArtifactId,
    Version,
    Classifier,
    DashClassifier,
    Extension,
    Type,
}

impl Token {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "groupId" => Token::GroupId,
            "artifactId" => Token::ArtifactId,
            "version" => Token::Version,
            "classifier" => Token::Classifier,
            "dashClassifier" | "dashClassifier?" => Token::DashClassifier,
            "extension" => Token::Extension,
            "type" => Token::Type,
            _ => return None,
        })
    }
}

/// A mapping evaluated from `@{token}@` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMapping {
    segments: Vec<Segment>,
}

impl PatternMapping {
    pub fn new(pattern: &str) -> Result<Self> {
        match Self::parse(pattern) {
            (mapping, None) => Ok(mapping),
            (_, Some(name)) => Err(Error::UnknownMapping(format!(
                "{} (unknown token '{}')",
                pattern, name
            ))),
        }
    }

    fn builtin(pattern: &'static str) -> Self {
        Self::parse(pattern).0
    }

    /// Split into segments. Unknown tokens are kept as literals and the first
    /// one is reported.
    fn parse(pattern: &str) -> (Self, Option<String>) {
        let mut segments = Vec::new();
        let mut unknown = None;
        let mut rest = pattern;

        while let Some(start) = rest.find("@{") {
            let Some(len) = rest[start + 2..].find("}@") else {
                break;
            };
            if start > 0 {
                segments.push(Segment::Literal(rest[..start].to_string()));
            }

            let end = start + 2 + len + 2;
            let name = &rest[start + 2..start + 2 + len];
            match Token::parse(name) {
                Some(token) => segments.push(Segment::Token(token)),
                None => {
                    unknown.get_or_insert_with(|| name.to_string());
                    segments.push(Segment::Literal(rest[start..end].to_string()));
                }
            }
            rest = &rest[end..];
        }

        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }

        (Self { segments }, unknown)
    }
}

impl FileNameMapping for PatternMapping {
    fn file_name(&self, artifact: &Artifact) -> String {
        let mut name = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => name.push_str(text),
                Segment::Token(token) => match token {
                    Token::GroupId => name.push_str(&artifact.group_id),
                    Token::ArtifactId => name.push_str(&artifact.artifact_id),
                    Token::Version => name.push_str(&artifact.version),
                    Token::Classifier => {
                        name.push_str(artifact.classifier.as_deref().unwrap_or_default())
                    }
                    Token::DashClassifier => {
                        if let Some(classifier) = &artifact.classifier {
                            name.push('-');
                            name.push_str(classifier);
                        }
                    }
                    Token::Extension => name.push_str(extension_of(&artifact.artifact_type)),
                    Token::Type => name.push_str(&artifact.artifact_type),
                },
            }
        }
        name
    }
}

/// File extension for a packaging type.
pub fn extension_of(artifact_type: &str) -> &str {
    match artifact_type {
        "ejb" | "ejb-client" | "test-jar" | "maven-plugin" | "bundle" | "java-source"
        | "javadoc" => "jar",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commons() -> Artifact {
        Artifact::new("org.sample", "commons", "1.0")
    }

    #[test]
    fn test_builtin_names() {
        let registry = MappingRegistry::default();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(names, vec!["full", "no-version", "standard"]);
    }

    #[test]
    fn test_standard_mapping() {
        let mapping = MappingRegistry::default().get("standard").unwrap();
        assert_eq!(mapping.file_name(&commons()), "commons-1.0.jar");
        assert_eq!(
            mapping.file_name(&commons().with_classifier("jdk8")),
            "commons-1.0-jdk8.jar"
        );
        assert_eq!(
            mapping.file_name(&commons().with_type("ejb")),
            "commons-1.0.jar"
        );
    }

    #[test]
    fn test_full_and_no_version_mappings() {
        let registry = MappingRegistry::default();
        assert_eq!(
            registry.get("full").unwrap().file_name(&commons()),
            "org.sample-commons-1.0.jar"
        );
        assert_eq!(
            registry
                .get("no-version")
                .unwrap()
                .file_name(&commons().with_classifier("jdk8")),
            "commons-jdk8.jar"
        );
    }

    #[test]
    fn test_pattern_mapping() {
        let mapping = MappingRegistry::default()
            .get("lib-@{artifactId}@_@{classifier}@.@{type}@")
            .unwrap();
        assert_eq!(
            mapping.file_name(&commons().with_classifier("x").with_type("test-jar")),
            "lib-commons_x.test-jar"
        );
        assert_eq!(mapping.file_name(&commons()), "lib-commons_.jar");
    }

    #[test]
    fn test_unclosed_placeholder_is_literal() {
        let mapping = PatternMapping::new("@{artifactId}@.@{ext").unwrap();
        assert_eq!(mapping.file_name(&commons()), "commons.@{ext");
    }

    #[test]
    fn test_unknown_mapping() {
        let err = MappingRegistry::default().get("fancy").unwrap_err();
        assert!(matches!(err, Error::UnknownMapping(ref name) if name == "fancy"));
        assert!(err.is_configuration_error());

        assert!(matches!(
            MappingRegistry::default().get("@{nope}@.jar"),
            Err(Error::UnknownMapping(_))
        ));
    }

    #[test]
    fn test_custom_registration() {
        #[derive(Debug)]
        struct Upper;
        impl FileNameMapping for Upper {
            fn file_name(&self, artifact: &Artifact) -> String {
                artifact.artifact_id.to_uppercase()
            }
        }

        let mut registry = MappingRegistry::empty();
        registry.register("upper", || Box::new(Upper));
        assert_eq!(registry.get("upper").unwrap().file_name(&commons()), "COMMONS");
        assert!(registry.get("standard").is_err());
    }
}
