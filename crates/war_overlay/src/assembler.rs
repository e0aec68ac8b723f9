//! Webapp assembly orchestration.
//!
//! The [`WebappAssembler`] runs the full pipeline for one [`WarProject`]:
//!
//! 1. Resolve the overlay list. Every configuration error surfaces here,
//!    before the filesystem is touched.
//! 2. Load the registry cache of the previous run when `use_cache` is set.
//!    A malformed cache is ignored with a warning.
//! 3. Unpack every applied artifact overlay into the work directory, in
//!    parallel.
//! 4. Apply the overlays in order into the webapp directory.
//! 5. When caching, delete files the previous run wrote that no overlay
//!    provides anymore, then persist the new registry.

use crate::applier::{ApplyReport, LayerApplier};
use crate::cache::RegistryCache;
use crate::content::ProjectContent;
use crate::error::Result;
use crate::filter::PropertiesFilter;
use crate::mapping::{FileNameMapping, MappingRegistry};
use crate::overlay::{Overlay, OverlayId};
use crate::registry::{PathRegistry, RelativePath};
use crate::resolver::OverlayResolver;
use crate::sink::{FsContentSink, MemorySink};
use crate::utils::remove_file_and_empty_parents;
use camino::Utf8PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use war_project::WarProject;

/// Progress information emitted during assembly.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblyProgress {
    pub stage: AssemblyStage,
    /// Overlay being applied (set during `Applying`).
    pub current_overlay: Option<String>,
    /// 1-based index of the overlay being applied.
    pub current: u32,
    pub total: u32,
}

/// Stages of the assembly pipeline, emitted in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AssemblyStage {
    Resolving,
    Unpacking,
    /// Repeated once per overlay.
    Applying,
    Complete,
}

/// Summary returned after a successful assembly.
#[derive(Debug)]
pub struct AssemblyResult {
    pub webapp_directory: Utf8PathBuf,
    /// Resolved overlays, in priority order.
    pub overlays: Vec<OverlayId>,
    pub report: ApplyReport,
    /// Files of the previous run removed because no overlay provides them anymore.
    pub stale_removed: Vec<RelativePath>,
    pub build_time: Duration,
}

/// Outcome of a dry run: what would be written, without writing it.
#[derive(Debug)]
pub struct AssemblyPlan {
    pub overlays: Vec<Overlay>,
    pub registry: PathRegistry,
    pub report: ApplyReport,
}

type ProgressCallback = Arc<dyn Fn(AssemblyProgress) + Send + Sync>;

/// Assembles the webapp of one project.
pub struct WebappAssembler {
    project: WarProject,
    mapping: Box<dyn FileNameMapping>,
    progress_callback: Option<ProgressCallback>,
}

impl WebappAssembler {
    /// Create an assembler, looking up the project's file name mapping in `mappings`.
    pub fn from_project(project: &WarProject, mappings: &MappingRegistry) -> Result<Self> {
        Ok(Self {
            project: project.clone(),
            mapping: mappings.get(&project.file_name_mapping)?,
            progress_callback: None,
        })
    }

    /// Register a progress callback.
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(AssemblyProgress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Arc::new(callback));
        self
    }

    pub fn project(&self) -> &WarProject {
        &self.project
    }

    /// The current-build overlay as configured by the project.
    pub fn current_build_overlay(&self) -> Overlay {
        let settings = &self.project.current_build;
        Overlay::current_build()
            .with_includes(settings.includes.iter().cloned())
            .with_excludes(settings.excludes.iter().cloned())
            .with_filtered(settings.filtered)
    }

    /// Resolve the project's overlays without touching the filesystem.
    pub fn resolve(&self) -> Result<Vec<Overlay>> {
        OverlayResolver::new(
            self.project.overlay_defaults.clone(),
            self.current_build_overlay(),
        )
        .resolve(&self.project.overlays, &self.project.artifacts)
    }

    /// Assemble the webapp directory.
    pub fn assemble(&self) -> Result<AssemblyResult> {
        let start_time = Instant::now();
        let webapp_directory = self.project.webapp_directory.clone();

        tracing::info!("Assembling webapp...");
        tracing::info!("Webapp dir: {}", webapp_directory);
        tracing::info!("Work dir: {}", self.project.work_directory);

        self.emit_progress(AssemblyStage::Resolving, None, 0, 0);
        let overlays = self.resolve()?;

        let previous = if self.project.use_cache {
            self.load_previous()
        } else {
            None
        };

        let mut content = ProjectContent::from_project(&self.project, self.mapping.as_ref())?;
        let total = overlays.len() as u32;
        self.emit_progress(AssemblyStage::Unpacking, None, 0, total);
        let unpacked = content.prepare_all(&overlays)?;
        tracing::debug!("Prepared {} artifact overlay(s)", unpacked);

        std::fs::create_dir_all(webapp_directory.as_std_path())?;
        let mut sink = self.sink();
        let mut registry = PathRegistry::for_overlays(&overlays);
        let report = self.applier(previous.as_ref()).apply(
            &overlays,
            &mut content,
            &mut registry,
            &mut sink,
        )?;

        let mut stale_removed = Vec::new();
        if let Some(previous) = &previous {
            for (path, owner) in previous.iter() {
                if registry.is_registered(path) {
                    continue;
                }
                tracing::info!("Removing '{}' (was provided by [{}])", path, owner);
                remove_file_and_empty_parents(&webapp_directory, &path.to_path(&webapp_directory))?;
                stale_removed.push(path.clone());
            }
        }

        let overlay_ids: Vec<OverlayId> = overlays.iter().map(|o| o.id().clone()).collect();
        if self.project.use_cache {
            RegistryCache::new(overlay_ids.clone(), &registry).save(&self.project.cache_file)?;
        }

        self.emit_progress(AssemblyStage::Complete, None, total, total);

        let build_time = start_time.elapsed();
        tracing::info!(
            "Assembled {} path(s) from {} overlay(s) in {:.2?}",
            registry.len(),
            report.applied.len(),
            build_time
        );

        Ok(AssemblyResult {
            webapp_directory,
            overlays: overlay_ids,
            report,
            stale_removed,
            build_time,
        })
    }

    /// Resolve and apply into memory. Artifact overlays are still unpacked
    /// into the work directory; the webapp directory and the cache are left alone.
    pub fn dry_run(&self) -> Result<AssemblyPlan> {
        let overlays = self.resolve()?;
        let mut content = ProjectContent::from_project(&self.project, self.mapping.as_ref())?;
        content.prepare_all(&overlays)?;

        let mut registry = PathRegistry::for_overlays(&overlays);
        let report = LayerApplier::new().apply(
            &overlays,
            &mut content,
            &mut registry,
            &mut MemorySink::new(),
        )?;

        Ok(AssemblyPlan {
            overlays,
            registry,
            report,
        })
    }

    fn load_previous(&self) -> Option<PathRegistry> {
        match RegistryCache::load(&self.project.cache_file) {
            Ok(cache) => cache.map(RegistryCache::into_registry),
            Err(e) => {
                tracing::warn!(
                    "Ignoring unreadable registry cache {}: {}",
                    self.project.cache_file,
                    e
                );
                None
            }
        }
    }

    fn sink(&self) -> FsContentSink {
        FsContentSink::new(&self.project.webapp_directory)
            .with_filter(PropertiesFilter::new(self.project.filter_properties.clone()))
            .with_non_filtered_extensions(&self.project.non_filtered_file_extensions)
    }

    fn applier<'a>(&self, previous: Option<&'a PathRegistry>) -> LayerApplier<'a> {
        let applier = LayerApplier::new().with_previous(previous);
        match self.progress_callback.clone() {
            Some(callback) => applier.with_progress(move |progress| {
                callback(AssemblyProgress {
                    stage: AssemblyStage::Applying,
                    current_overlay: Some(progress.overlay.to_string()),
                    current: progress.current,
                    total: progress.total,
                })
            }),
            None => applier,
        }
    }

    /// Emit a progress event if a callback was registered.
    fn emit_progress(
        &self,
        stage: AssemblyStage,
        current_overlay: Option<String>,
        current: u32,
        total: u32,
    ) {
        if let Some(callback) = &self.progress_callback {
            callback(AssemblyProgress {
                stage,
                current_overlay,
                current,
                total,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use war_project::OverlayDescriptor;

    #[test]
    fn test_unknown_mapping_rejected_at_construction() {
        let mut project = WarProject::new("app", "1.0");
        project.file_name_mapping = "fancy".to_string();

        assert!(matches!(
            WebappAssembler::from_project(&project, &MappingRegistry::default()),
            Err(Error::UnknownMapping(_))
        ));
    }

    #[test]
    fn test_current_build_overlay_from_settings() {
        let mut project = WarProject::new("app", "1.0");
        project.current_build.excludes = vec!["**/*.bak".to_string()];
        project.current_build.filtered = true;

        let assembler = WebappAssembler::from_project(&project, &MappingRegistry::default()).unwrap();
        let overlay = assembler.current_build_overlay();
        assert!(overlay.is_current_build());
        assert!(overlay.filtered());
        assert_eq!(overlay.excludes(), ["**/*.bak"]);
    }

    #[test]
    fn test_configuration_error_leaves_filesystem_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let base = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let mut project = WarProject::new("app", "1.0").resolve_paths(&base);
        project.overlays = vec![OverlayDescriptor::for_artifact("g", "missing")];

        let assembler = WebappAssembler::from_project(&project, &MappingRegistry::default()).unwrap();
        let err = assembler.assemble().unwrap_err();

        assert!(err.is_configuration_error());
        assert!(!project.webapp_directory.exists());
        assert!(!project.work_directory.exists());
    }
}
