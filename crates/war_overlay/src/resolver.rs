//! Overlay resolution.
//!
//! Turns the configured overlay list plus the artifacts available to the
//! build into the ordered, validated list the applier walks:
//!
//! 1. The current-build entry of the configuration is replaced by the
//!    caller-supplied current-build overlay.
//! 2. Overlays still using the library filter defaults get the caller's
//!    [`FilterDefaults`].
//! 3. Every artifact overlay is bound to the available artifact with exactly
//!    the same group, artifact, type and classifier. An unmatched overlay is
//!    a configuration error unless it is skipped.
//! 4. Runtime `war` artifacts nobody configured are appended as default
//!    overlays, in the order they are available.
//! 5. The current build is inserted first unless it was placed explicitly.
//!
//! Resolution never touches the filesystem, so every configuration error is
//! reported before the output directory is modified.

use crate::error::{Error, Result};
use crate::overlay::Overlay;
use std::collections::HashMap;
use war_project::{Artifact, FilterDefaults, OverlayDescriptor};

/// Resolves configured overlays against the available artifacts.
#[derive(Debug, Clone)]
pub struct OverlayResolver {
    defaults: FilterDefaults,
    current_build: Overlay,
}

impl Default for OverlayResolver {
    fn default() -> Self {
        Self::new(FilterDefaults::default(), Overlay::current_build())
    }
}

impl OverlayResolver {
    pub fn new(defaults: FilterDefaults, current_build: Overlay) -> Self {
        Self {
            defaults,
            current_build,
        }
    }

    pub fn defaults(&self) -> &FilterDefaults {
        &self.defaults
    }

    /// Produce the ordered overlay list, highest priority first.
    pub fn resolve(
        &self,
        configured: &[OverlayDescriptor],
        available: &[Artifact],
    ) -> Result<Vec<Overlay>> {
        let mut overlays = Vec::with_capacity(configured.len() + 1);
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut current_build_placed = false;
        let current_build = self.current_build.clone().with_filter_defaults(&self.defaults);

        for descriptor in configured {
            let overlay = if descriptor.is_current_build() {
                if current_build_placed {
                    return Err(Error::DuplicateCurrentBuild);
                }
                current_build_placed = true;
                current_build.clone()
            } else {
                Overlay::from_descriptor(descriptor)?.with_filter_defaults(&self.defaults)
            };

            if let Some(&index) = seen.get(overlay.id().as_str()) {
                let earlier: &Overlay = &overlays[index];
                if let Some(field) = earlier.conflicting_flag(&overlay) {
                    return Err(Error::ConflictingOverlay {
                        id: overlay.id().to_string(),
                        field,
                    });
                }
            } else {
                seen.insert(overlay.id().to_string(), overlays.len());
            }

            overlays.push(self.bind(overlay, available)?);
        }

        let mut auto_detected = 0usize;
        for artifact in available.iter().filter(|a| is_overlay_candidate(a)) {
            let claimed = overlays
                .iter()
                .filter_map(Overlay::artifact)
                .any(|bound| is_same_artifact(bound, artifact));
            if claimed {
                continue;
            }

            let overlay = Overlay::for_artifact(artifact).with_filter_defaults(&self.defaults);
            tracing::debug!("Auto-detected overlay [{}] from {}", overlay.id(), artifact);
            overlays.push(overlay);
            auto_detected += 1;
        }

        if !current_build_placed {
            overlays.insert(0, current_build);
        }

        tracing::info!(
            "Resolved {} overlay(s): {} configured, {} auto-detected",
            overlays.len(),
            configured.len(),
            auto_detected
        );

        Ok(overlays)
    }

    fn bind(&self, overlay: Overlay, available: &[Artifact]) -> Result<Overlay> {
        let Some(coordinates) = overlay.coordinates() else {
            tracing::debug!("Overlay [{}] is the current build", overlay.id());
            return Ok(overlay);
        };

        match available.iter().find(|a| coordinates.matches(a)) {
            Some(artifact) => {
                tracing::debug!("Overlay [{}] bound to {}", overlay.id(), artifact);
                let artifact = artifact.clone();
                Ok(overlay.bind(artifact))
            }
            None if overlay.skip() => {
                tracing::warn!(
                    "Skipped overlay [{}] ({}) is not a dependency of the project",
                    overlay.id(),
                    coordinates
                );
                Ok(overlay)
            }
            None => Err(Error::UnresolvedOverlay {
                id: overlay.id().to_string(),
                coordinates: coordinates.to_string(),
            }),
        }
    }
}

/// Resolve with the given defaults and current-build overlay.
pub fn resolve(
    configured: &[OverlayDescriptor],
    available: &[Artifact],
    defaults: &FilterDefaults,
    current_build: &Overlay,
) -> Result<Vec<Overlay>> {
    OverlayResolver::new(defaults.clone(), current_build.clone()).resolve(configured, available)
}

fn is_overlay_candidate(artifact: &Artifact) -> bool {
    artifact.is_war() && !artifact.optional && artifact.scope.is_runtime()
}

fn is_same_artifact(a: &Artifact, b: &Artifact) -> bool {
    a.same_coordinates(
        &b.group_id,
        &b.artifact_id,
        &b.artifact_type,
        b.classifier.as_deref(),
    ) && a.version == b.version
}
