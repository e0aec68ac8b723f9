//! Layered web application assembly.
//!
//! This crate merges the project's own web content with any number of
//! overlay artifacts (skeleton `.war` files, shared resources) into one
//! assembled webapp directory. It provides:
//!
//! - **Overlay resolution**: configured overlays are validated and bound to
//!   the build's artifacts; undeclared `war` dependencies become overlays
//!   automatically.
//! - **First-writer-wins merging**: a [`PathRegistry`] records which overlay
//!   owns each output path; lower-priority overlays never overwrite it.
//! - **Incremental rebuilds**: the registry is cached between runs, unchanged
//!   files are left alone and files nobody provides anymore are removed.
//! - **Filtering**: `${token}` substitution for overlays marked `filtered`.
//!
//! # Example
//!
//! ```no_run
//! use camino::Utf8Path;
//! use war_overlay::{MappingRegistry, WebappAssembler};
//! use war_project::WarProject;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let project = WarProject::load(Utf8Path::new("war.config.toml"))?;
//!
//! let assembler = WebappAssembler::from_project(&project, &MappingRegistry::default())?
//!     .with_progress(|progress| {
//!         println!("Stage: {:?}, Progress: {}/{}",
//!             progress.stage, progress.current, progress.total);
//!     });
//!
//! let result = assembler.assemble()?;
//! println!("Wrote {} files, {} conflicts",
//!     result.report.written, result.report.conflicts.len());
//! # Ok(())
//! # }
//! ```

pub mod applier;
pub mod assembler;
pub mod cache;
pub mod content;
pub mod error;
pub mod filter;
pub mod mapping;
pub mod overlay;
pub mod pattern;
pub mod registry;
pub mod resolver;
pub mod sink;
pub mod utils;


// Re-export main types
pub use applier::{apply, ApplyReport, Conflict, LayerApplier, LayerProgress};
pub use assembler::{
    AssemblyPlan, AssemblyProgress, AssemblyResult, AssemblyStage, WebappAssembler,
};
pub use cache::RegistryCache;
pub use content::{ContentEntry, ContentSource, OverlayContent};
pub use error::{Error, Result};
pub use filter::{PropertiesFilter, ResourceFilter};
pub use mapping::{FileNameMapping, MappingRegistry};
pub use overlay::{Coordinates, Overlay, OverlayId, OverlaySource};
pub use pattern::PathFilter;
pub use registry::{PathRegistry, Registration, RelativePath};
pub use resolver::{resolve, OverlayResolver};
pub use sink::{ContentSink, FsContentSink, MemorySink};
