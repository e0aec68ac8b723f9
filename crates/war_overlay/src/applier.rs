//! The layer applier.
//!
//! Walks the resolved overlay list in priority order. For each overlay that
//! is not skipped, every entry accepted by its include/exclude set (and moved
//! below its target path, for artifact overlays) is offered to the
//! [`PathRegistry`]. Only entries the registry hands to the overlay reach the
//! [`ContentSink`]; the rest are recorded as conflicts.
//!
//! Overlays are applied strictly one after another. The registry is the only
//! arbiter of who writes a path, so the resulting tree depends on nothing but
//! the overlay order and the content.

use crate::content::OverlayContent;
use crate::error::{Error, Result};
use crate::overlay::{Overlay, OverlayId};
use crate::registry::{PathRegistry, Registration, RelativePath};
use crate::sink::ContentSink;
use std::sync::Arc;

/// A path contributed by more than one overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub path: RelativePath,
    /// Overlay whose content was kept.
    pub winner: OverlayId,
    /// Overlay whose content was dropped.
    pub suppressed: OverlayId,
}

/// Summary of one apply pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Paths written for the first time or taken over from another owner.
    pub written: usize,
    /// Paths owned by the same overlay last run that were rewritten.
    pub refreshed: usize,
    /// Paths owned by the same overlay last run that were already current.
    pub up_to_date: usize,
    pub conflicts: Vec<Conflict>,
    /// Overlays applied, in order.
    pub applied: Vec<OverlayId>,
    /// Overlays skipped, in order.
    pub skipped: Vec<OverlayId>,
}

impl ApplyReport {
    /// Number of paths claimed by any overlay.
    pub fn claimed(&self) -> usize {
        self.written + self.refreshed + self.up_to_date
    }
}

/// Progress of an apply pass, emitted before each overlay.
#[derive(Debug, Clone)]
pub struct LayerProgress {
    pub overlay: OverlayId,
    /// 1-based position of the overlay.
    pub current: u32,
    pub total: u32,
}

type LayerProgressCallback = Arc<dyn Fn(LayerProgress) + Send + Sync>;

/// Applies overlays into a sink through a path registry.
#[derive(Default, Clone)]
pub struct LayerApplier<'a> {
    previous: Option<&'a PathRegistry>,
    progress: Option<LayerProgressCallback>,
}

impl<'a> LayerApplier<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry of the previous run, enabling refresh of unchanged owners.
    pub fn with_previous(mut self, previous: Option<&'a PathRegistry>) -> Self {
        self.previous = previous;
        self
    }

    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(LayerProgress) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(callback));
        self
    }

    /// Apply `overlays`, highest priority first.
    ///
    /// The first failing read or write aborts the pass; content already
    /// written stays in place.
    pub fn apply(
        &self,
        overlays: &[Overlay],
        content: &mut dyn OverlayContent,
        registry: &mut PathRegistry,
        sink: &mut dyn ContentSink,
    ) -> Result<ApplyReport> {
        let mut report = ApplyReport::default();
        let total = overlays.len() as u32;

        for (index, overlay) in overlays.iter().enumerate() {
            if let Some(callback) = &self.progress {
                callback(LayerProgress {
                    overlay: overlay.id().clone(),
                    current: index as u32 + 1,
                    total,
                });
            }

            if overlay.skip() {
                tracing::debug!("Skipping overlay [{}]", overlay.id());
                report.skipped.push(overlay.id().clone());
                continue;
            }

            let claimed_before = report.claimed();
            let conflicts_before = report.conflicts.len();
            self.apply_overlay(overlay, content, registry, sink, &mut report)?;

            tracing::info!(
                "Applied overlay [{}]: {} path(s) claimed, {} suppressed",
                overlay.id(),
                report.claimed() - claimed_before,
                report.conflicts.len() - conflicts_before
            );
            report.applied.push(overlay.id().clone());
        }

        Ok(report)
    }

    fn apply_overlay(
        &self,
        overlay: &Overlay,
        content: &mut dyn OverlayContent,
        registry: &mut PathRegistry,
        sink: &mut dyn ContentSink,
        report: &mut ApplyReport,
    ) -> Result<()> {
        let filter = overlay.path_filter()?;
        let prefix = overlay
            .target_path()
            .filter(|_| !overlay.is_current_build());

        let entries = content
            .entries(overlay)
            .map_err(|e| content_error(overlay, e))?;

        for entry in entries {
            let entry = entry.map_err(|e| content_error(overlay, e))?;
            if !filter.matches(entry.path.as_str()) {
                continue;
            }

            let path = match prefix {
                Some(prefix) => entry
                    .path
                    .prefixed(prefix)
                    .map_err(|e| content_error(overlay, e))?,
                None => entry.path,
            };
            let filtered = overlay.filtered() && entry.filterable;

            match registry.register(overlay.id(), &path, self.previous) {
                Registration::Refused { owner } => {
                    tracing::debug!(
                        "'{}' from [{}] suppressed: already provided by [{}]",
                        path,
                        overlay.id(),
                        owner
                    );
                    if owner != *overlay.id() {
                        report.conflicts.push(Conflict {
                            path,
                            winner: owner,
                            suppressed: overlay.id().clone(),
                        });
                    }
                }
                Registration::AlreadyRegistered => {
                    let written = sink
                        .refresh(&path, &entry.source, filtered)
                        .map_err(|e| write_error(overlay, &path, e))?;
                    if written {
                        report.refreshed += 1;
                    } else {
                        report.up_to_date += 1;
                    }
                }
                registration => {
                    match &registration {
                        Registration::Superseded { previous_owner } => tracing::info!(
                            "'{}' now provided by [{}] instead of [{}]",
                            path,
                            overlay.id(),
                            previous_owner
                        ),
                        Registration::SupersededUnknownOwner { previous_owner } => {
                            tracing::warn!(
                                "'{}' was provided by [{}], which is no longer an overlay; overwriting with [{}]",
                                path,
                                previous_owner,
                                overlay.id()
                            )
                        }
                        _ => {}
                    }

                    sink.write(&path, &entry.source, filtered)
                        .map_err(|e| write_error(overlay, &path, e))?;
                    report.written += 1;
                }
            }
        }

        Ok(())
    }
}

fn content_error(overlay: &Overlay, source: Error) -> Error {
    Error::Content {
        overlay: overlay.id().to_string(),
        source: Box::new(source),
    }
}

fn write_error(overlay: &Overlay, path: &RelativePath, source: Error) -> Error {
    Error::Write {
        overlay: overlay.id().to_string(),
        path: path.to_string(),
        source: Box::new(source),
    }
}

/// Apply with a fresh applier and no previous registry.
pub fn apply(
    overlays: &[Overlay],
    content: &mut dyn OverlayContent,
    registry: &mut PathRegistry,
    sink: &mut dyn ContentSink,
) -> Result<ApplyReport> {
    LayerApplier::new().apply(overlays, content, registry, sink)
}
