//! The overlay value type.
//!
//! An [`Overlay`] is one layer of content merged into the assembled webapp.
//! It is either the current build (the project's own sources, classes and
//! libraries) or an external artifact such as a skeleton `.war`.
//!
//! Overlays compare and hash by [`OverlayId`] only, which is computed once at
//! construction: `currentBuild` for the current build and
//! `groupId:artifactId[:classifier]` for everything else.

use crate::error::{Error, Result};
use crate::pattern::PathFilter;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use war_project::{
    default_excludes, default_includes, Artifact, FilterDefaults, OverlayDescriptor,
    DEFAULT_EXCLUDES, DEFAULT_INCLUDES,
};

/// Identifier of an overlay, used as the owner key in the path registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OverlayId(String);

impl OverlayId {
    /// Reserved id of the current-build overlay.
    pub const CURRENT_BUILD: &'static str = "currentBuild";

    pub fn current_build() -> Self {
        Self(Self::CURRENT_BUILD.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_current_build(&self) -> bool {
        self.0 == Self::CURRENT_BUILD
    }
}

impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&Coordinates> for OverlayId {
    fn from(coordinates: &Coordinates) -> Self {
        let mut id = format!("{}:{}", coordinates.group_id, coordinates.artifact_id);
        if let Some(classifier) = &coordinates.classifier {
            id.push(':');
            id.push_str(classifier);
        }
        Self(id)
    }
}

/// Artifact coordinates an overlay refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Coordinates {
    pub group_id: String,
    pub artifact_id: String,
    pub classifier: Option<String>,
    pub artifact_type: String,
}

impl Coordinates {
    pub fn new(group_id: impl Into<String>, artifact_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            classifier: None,
            artifact_type: "war".to_string(),
        }
    }

    pub fn of(artifact: &Artifact) -> Self {
        Self {
            group_id: artifact.group_id.clone(),
            artifact_id: artifact.artifact_id.clone(),
            classifier: artifact.classifier.clone(),
            artifact_type: artifact.artifact_type.clone(),
        }
    }

    /// Exact match on group, artifact, type and classifier.
    pub fn matches(&self, artifact: &Artifact) -> bool {
        artifact.same_coordinates(
            &self.group_id,
            &self.artifact_id,
            &self.artifact_type,
            self.classifier.as_deref(),
        )
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.group_id, self.artifact_id, self.artifact_type
        )?;
        if let Some(classifier) = &self.classifier {
            write!(f, ":{}", classifier)?;
        }
        Ok(())
    }
}

/// Where an overlay's content comes from.
#[derive(Debug, Clone)]
pub enum OverlaySource {
    /// The project being built.
    CurrentBuild,
    /// An external artifact. `artifact` is set once the overlay is resolved.
    Artifact {
        coordinates: Coordinates,
        artifact: Option<Artifact>,
    },
}

/// One layer of contributed content with its own filters and flags.
#[derive(Debug, Clone)]
pub struct Overlay {
    id: OverlayId,
    source: OverlaySource,
    includes: Vec<String>,
    excludes: Vec<String>,
    filtered: bool,
    skip: bool,
    target_path: Option<String>,
}

impl Overlay {
    /// The current-build overlay with library default filters.
    pub fn current_build() -> Self {
        Self::with_source(OverlayId::current_build(), OverlaySource::CurrentBuild)
    }

    /// An unresolved overlay for the given coordinates.
    pub fn for_coordinates(coordinates: Coordinates) -> Self {
        Self::with_source(
            OverlayId::from(&coordinates),
            OverlaySource::Artifact {
                coordinates,
                artifact: None,
            },
        )
    }

    /// A resolved overlay bound to `artifact`.
    pub fn for_artifact(artifact: &Artifact) -> Self {
        Self::for_coordinates(Coordinates::of(artifact)).bind(artifact.clone())
    }

    /// Build an overlay from its configuration.
    ///
    /// Both coordinates absent yields the current build; naming only one of
    /// them is a configuration error.
    pub fn from_descriptor(descriptor: &OverlayDescriptor) -> Result<Self> {
        let overlay = match (&descriptor.group_id, &descriptor.artifact_id) {
            (None, None) => Self::current_build(),
            (Some(group_id), Some(artifact_id)) => Self::for_coordinates(Coordinates {
                group_id: group_id.clone(),
                artifact_id: artifact_id.clone(),
                classifier: descriptor.classifier.clone(),
                artifact_type: descriptor.overlay_type.clone(),
            }),
            (group_id, artifact_id) => {
                return Err(Error::IncompleteOverlay {
                    group_id: group_id.clone().unwrap_or_default(),
                    artifact_id: artifact_id.clone().unwrap_or_default(),
                })
            }
        };

        let overlay = overlay
            .with_includes(descriptor.includes.iter().cloned())
            .with_excludes(descriptor.excludes.iter().cloned())
            .with_filtered(descriptor.filtered)
            .with_skip(descriptor.skip);

        Ok(match &descriptor.target_path {
            Some(target_path) => overlay.with_target_path(target_path.clone()),
            None => overlay,
        })
    }

    fn with_source(id: OverlayId, source: OverlaySource) -> Self {
        Self {
            id,
            source,
            includes: default_includes(),
            excludes: default_excludes(),
            filtered: false,
            skip: false,
            target_path: None,
        }
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

    /// Blank target paths are ignored.
    pub fn with_target_path(mut self, target_path: impl Into<String>) -> Self {
        let target_path = target_path.into();
        self.target_path = (!target_path.trim().is_empty()).then_some(target_path);
        self
    }

    /// Replace the filters with `defaults` if they are still the library defaults.
    pub fn with_filter_defaults(self, defaults: &FilterDefaults) -> Self {
        if self.uses_default_filters() {
            self.with_includes(defaults.includes.iter().cloned())
                .with_excludes(defaults.excludes.iter().cloned())
        } else {
            self
        }
    }

    /// Attach the concrete artifact. No effect on the current build.
    pub(crate) fn bind(mut self, bound: Artifact) -> Self {
        if let OverlaySource::Artifact { artifact, .. } = &mut self.source {
            *artifact = Some(bound);
        }
        self
    }

    pub fn id(&self) -> &OverlayId {
        &self.id
    }

    pub fn source(&self) -> &OverlaySource {
        &self.source
    }

    pub fn is_current_build(&self) -> bool {
        matches!(self.source, OverlaySource::CurrentBuild)
    }

    pub fn coordinates(&self) -> Option<&Coordinates> {
        match &self.source {
            OverlaySource::CurrentBuild => None,
            OverlaySource::Artifact { coordinates, .. } => Some(coordinates),
        }
    }

    /// The resolved artifact, if any.
    pub fn artifact(&self) -> Option<&Artifact> {
        match &self.source {
            OverlaySource::CurrentBuild => None,
            OverlaySource::Artifact { artifact, .. } => artifact.as_ref(),
        }
    }

    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    pub fn excludes(&self) -> &[String] {
        &self.excludes
    }

    pub fn filtered(&self) -> bool {
        self.filtered
    }

    pub fn skip(&self) -> bool {
        self.skip
    }

    pub fn target_path(&self) -> Option<&str> {
        self.target_path.as_deref()
    }

    /// Whether includes and excludes are exactly the library defaults.
    pub fn uses_default_filters(&self) -> bool {
        self.includes.iter().map(String::as_str).eq(DEFAULT_INCLUDES.iter().copied())
            && self.excludes.iter().map(String::as_str).eq(DEFAULT_EXCLUDES.iter().copied())
    }

    /// Compile the include/exclude set.
    pub fn path_filter(&self) -> Result<PathFilter> {
        PathFilter::new(&self.includes, &self.excludes)
    }

    /// Name of the first flag that differs from `other`, if any.
    pub(crate) fn conflicting_flag(&self, other: &Overlay) -> Option<&'static str> {
        if self.filtered != other.filtered {
            Some("filtered")
        } else if self.skip != other.skip {
            Some("skip")
        } else if self.target_path != other.target_path {
            Some("target_path")
        } else if self.coordinates().map(|c| &c.artifact_type)
            != other.coordinates().map(|c| &c.artifact_type)
        {
            Some("type")
        } else {
            None
        }
    }
}

impl PartialEq for Overlay {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Overlay {}

impl Hash for Overlay {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Overlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.artifact() {
            Some(artifact) => write!(f, "{}:{}", self.id, artifact.version),
            None => write!(f, "{}", self.id),
        }
    }
}
