//! Overlay content providers.
//!
//! This module defines the [`OverlayContent`] trait that decouples the applier
//! from any particular storage format. A provider yields, for one overlay, a
//! lazy sequence of [`ContentEntry`] values: a path relative to the overlay's
//! root plus where its bytes come from.
//!
//! The crate ships:
//!
//! - [`DirectoryContent`]: an exploded directory, walked in file-name order.
//! - [`ArchiveContent`]: a `.war`/`.zip` artifact, unpacked once into the
//!   work directory and re-unpacked only when the archive changes.
//! - [`CurrentBuildContent`]: the project's own web sources, compiled classes
//!   (under `WEB-INF/classes/`) and runtime libraries (under `WEB-INF/lib/`).
//! - [`ProjectContent`]: dispatches each overlay to the right provider and
//!   can unpack all artifact overlays in parallel ahead of the apply pass.
//! - [`MemoryContent`]: fixed in-memory content, mostly for tests.

use crate::error::{Error, Result};
use crate::mapping::FileNameMapping;
use crate::overlay::{Overlay, OverlayId};
use crate::registry::RelativePath;
use crate::utils::{file_fingerprint, overlay_dir_name};
use camino::{Utf8Path, Utf8PathBuf};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use walkdir::WalkDir;
use war_project::{Artifact, WarProject};
use zip::ZipArchive;

/// Where the bytes of one entry come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    File(Utf8PathBuf),
    Bytes(Vec<u8>),
}

impl ContentSource {
    pub fn read(&self) -> Result<Vec<u8>> {
        match self {
            ContentSource::File(path) => Ok(std::fs::read(path.as_std_path())?),
            ContentSource::Bytes(bytes) => Ok(bytes.clone()),
        }
    }

    /// Backing file, if the content lives on disk.
    pub fn file(&self) -> Option<&Utf8Path> {
        match self {
            ContentSource::File(path) => Some(path),
            ContentSource::Bytes(_) => None,
        }
    }
}

/// One unit of content contributed by an overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentEntry {
    /// Path relative to the overlay root, before any target path is applied.
    pub path: RelativePath,
    pub source: ContentSource,
    /// Whether resource filtering may apply. Classes and libraries are never filtered.
    pub filterable: bool,
}

impl ContentEntry {
    pub fn new(path: RelativePath, source: ContentSource) -> Self {
        Self {
            path,
            source,
            filterable: true,
        }
    }

    pub fn binary(mut self) -> Self {
        self.filterable = false;
        self
    }
}

/// Lazy sequence of entries of one overlay.
pub type ContentEntries = Box<dyn Iterator<Item = Result<ContentEntry>>>;

/// Abstracts how overlay content is read during assembly.
///
/// Methods take `&mut self` to allow stateful providers (e.g. caching unpacked
/// archives).
pub trait OverlayContent {
    /// Enumerate the content of `overlay`.
    ///
    /// Paths are relative to the overlay root. Include/exclude filtering and
    /// target paths are applied by the caller.
    fn entries(&mut self, overlay: &Overlay) -> Result<ContentEntries>;
}

/// Walk `root` in file-name order, yielding every regular file.
///
/// Symbolic links are followed. A missing root yields nothing.
fn walk(root: &Utf8Path, prefix: Option<&'static str>, filterable: bool) -> ContentEntries {
    if !root.as_std_path().is_dir() {
        return Box::new(std::iter::empty());
    }

    let root = root.to_path_buf();
    let walker = WalkDir::new(root.as_std_path())
        .follow_links(true)
        .sort_by_file_name();
    Box::new(walker.into_iter().filter_map(move |entry| {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => return Some(Err(e.into())),
        };
        if !entry.file_type().is_file() {
            return None;
        }

        let path = match Utf8PathBuf::from_path_buf(entry.into_path()) {
            Ok(path) => path,
            Err(path) => {
                tracing::warn!("Skipping non-UTF-8 path: {}", path.display());
                return None;
            }
        };
        Some(to_entry(&root, path, prefix, filterable))
    }))
}

fn to_entry(
    root: &Utf8Path,
    path: Utf8PathBuf,
    prefix: Option<&str>,
    filterable: bool,
) -> Result<ContentEntry> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| Error::InvalidPath(path.to_string()))?;
    let relative = match prefix {
        Some(prefix) => RelativePath::new(&format!("{}/{}", prefix, relative))?,
        None => RelativePath::new(relative.as_str())?,
    };

    Ok(ContentEntry {
        path: relative,
        source: ContentSource::File(path),
        filterable,
    })
}

/// Content of an exploded directory.
#[derive(Debug, Clone)]
pub struct DirectoryContent {
    root: Utf8PathBuf,
}

impl DirectoryContent {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }
}

impl OverlayContent for DirectoryContent {
    fn entries(&mut self, _overlay: &Overlay) -> Result<ContentEntries> {
        Ok(walk(&self.root, None, true))
    }
}

/// Unpacks artifact archives below `<work_directory>/overlays/`.
///
/// Each overlay gets its own directory named after its sanitized id. A
/// sibling `<name>.unpacked` marker holds the xxHash3 fingerprint of the
/// archive it was unpacked from; an unchanged archive is not unpacked again.
#[derive(Debug, Clone)]
pub struct ArchiveContent {
    work_directory: Utf8PathBuf,
}

impl ArchiveContent {
    pub fn new(work_directory: impl Into<Utf8PathBuf>) -> Self {
        Self {
            work_directory: work_directory.into(),
        }
    }

    pub fn overlays_dir(&self) -> Utf8PathBuf {
        self.work_directory.join("overlays")
    }

    /// Make the overlay's content available on disk and return its root.
    ///
    /// Artifacts backed by a directory are read in place.
    pub fn unpack(&self, overlay: &Overlay) -> Result<Utf8PathBuf> {
        let file = overlay
            .artifact()
            .and_then(|artifact| artifact.file.as_ref())
            .ok_or_else(|| Error::MissingArtifactFile(overlay.id().to_string()))?;

        if file.as_std_path().is_dir() {
            return Ok(file.clone());
        }

        let name = overlay_dir_name(overlay.id().as_str());
        let dest = self.overlays_dir().join(&name);
        let marker = self.overlays_dir().join(format!("{}.unpacked", name));
        let fingerprint = format!("{:016x}", file_fingerprint(file)?);

        let unchanged = std::fs::read_to_string(marker.as_std_path())
            .map(|previous| previous.trim() == fingerprint)
            .unwrap_or(false);
        if unchanged && dest.as_std_path().is_dir() {
            tracing::debug!("Overlay [{}] already unpacked to {}", overlay.id(), dest);
            return Ok(dest);
        }

        if dest.as_std_path().exists() {
            std::fs::remove_dir_all(dest.as_std_path())?;
        }
        std::fs::create_dir_all(dest.as_std_path())?;

        let extracted = extract_archive(file, &dest)?;
        std::fs::write(marker.as_std_path(), &fingerprint)?;
        tracing::info!(
            "Unpacked overlay [{}] from {} ({} files)",
            overlay.id(),
            file,
            extracted
        );

        Ok(dest)
    }
}

impl OverlayContent for ArchiveContent {
    fn entries(&mut self, overlay: &Overlay) -> Result<ContentEntries> {
        let root = self.unpack(overlay)?;
        Ok(walk(&root, None, true))
    }
}

/// Extract every entry of a zip archive below `dest`.
///
/// Entries whose names would escape `dest` are skipped.
fn extract_archive(archive_path: &Utf8Path, dest: &Utf8Path) -> Result<usize> {
    let reader = BufReader::new(File::open(archive_path.as_std_path())?);
    let mut archive = ZipArchive::new(reader)?;
    let mut extracted = 0;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name() else {
            tracing::warn!(
                "Skipping unsafe entry '{}' in {}",
                entry.name(),
                archive_path
            );
            continue;
        };

        let output_path = dest.as_std_path().join(relative);
        if entry.is_dir() {
            std::fs::create_dir_all(&output_path)?;
            continue;
        }

        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut outfile = File::create(&output_path)?;
        std::io::copy(&mut entry, &mut outfile)?;
        extracted += 1;
    }

    Ok(extracted)
}

/// Where a library lands in the assembled tree, by packaging type.
fn library_directory(artifact_type: &str) -> Option<&'static str> {
    match artifact_type {
        "jar" | "ejb" | "ejb-client" | "test-jar" | "bundle" => Some("WEB-INF/lib"),
        "tld" => Some("WEB-INF/tld"),
        _ => None,
    }
}

/// The project's own contribution.
#[derive(Debug, Clone)]
pub struct CurrentBuildContent {
    war_source_directory: Utf8PathBuf,
    classes_directory: Utf8PathBuf,
    libraries: Vec<(RelativePath, Utf8PathBuf)>,
}

impl CurrentBuildContent {
    pub fn new(
        war_source_directory: impl Into<Utf8PathBuf>,
        classes_directory: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            war_source_directory: war_source_directory.into(),
            classes_directory: classes_directory.into(),
            libraries: Vec::new(),
        }
    }

    /// Add the runtime, non-optional library artifacts, named with `mapping`.
    ///
    /// `war` and `zip` artifacts are overlays and are left out, as are types
    /// with no place in the webapp layout.
    pub fn with_libraries(
        mut self,
        artifacts: &[Artifact],
        mapping: &dyn FileNameMapping,
    ) -> Result<Self> {
        for artifact in artifacts {
            if artifact.optional || !artifact.scope.is_runtime() {
                continue;
            }
            let Some(directory) = library_directory(&artifact.artifact_type) else {
                tracing::debug!("Not packaging {} as a library", artifact);
                continue;
            };
            let file = artifact
                .file
                .clone()
                .ok_or_else(|| Error::MissingArtifactFile(artifact.to_string()))?;

            let path = RelativePath::new(&format!(
                "{}/{}",
                directory,
                mapping.file_name(artifact)
            ))?;
            self.libraries.push((path, file));
        }
        Ok(self)
    }

    pub fn libraries(&self) -> impl Iterator<Item = &RelativePath> {
        self.libraries.iter().map(|(path, _)| path)
    }
}

impl OverlayContent for CurrentBuildContent {
    fn entries(&mut self, _overlay: &Overlay) -> Result<ContentEntries> {
        let sources = walk(&self.war_source_directory, None, true);
        let classes = walk(&self.classes_directory, Some("WEB-INF/classes"), false);
        let libraries = self
            .libraries
            .clone()
            .into_iter()
            .map(|(path, file)| Ok(ContentEntry::new(path, ContentSource::File(file)).binary()));

        Ok(Box::new(sources.chain(classes).chain(libraries)))
    }
}

/// Content of every overlay of a project.
#[derive(Debug, Clone)]
pub struct ProjectContent {
    current_build: CurrentBuildContent,
    archives: ArchiveContent,
    prepared: HashMap<OverlayId, Utf8PathBuf>,
}

impl ProjectContent {
    pub fn new(current_build: CurrentBuildContent, archives: ArchiveContent) -> Self {
        Self {
            current_build,
            archives,
            prepared: HashMap::new(),
        }
    }

    pub fn from_project(project: &WarProject, mapping: &dyn FileNameMapping) -> Result<Self> {
        let current_build = CurrentBuildContent::new(
            &project.war_source_directory,
            &project.classes_directory,
        )
        .with_libraries(&project.artifacts, mapping)?;

        Ok(Self::new(
            current_build,
            ArchiveContent::new(&project.work_directory),
        ))
    }

    /// Unpack every applied artifact overlay, in parallel.
    ///
    /// Each id is unpacked once even when it is configured more than once.
    /// Returns the number of overlays prepared.
    pub fn prepare_all(&mut self, overlays: &[Overlay]) -> Result<usize> {
        let mut seen = HashSet::new();
        let pending: Vec<&Overlay> = overlays
            .iter()
            .filter(|o| !o.skip() && !o.is_current_build())
            .filter(|o| !self.prepared.contains_key(o.id()))
            .filter(|o| seen.insert(o.id().clone()))
            .collect();

        let archives = &self.archives;
        let results: Vec<(OverlayId, Result<Utf8PathBuf>)> = pending
            .par_iter()
            .map(|overlay| (overlay.id().clone(), archives.unpack(overlay)))
            .collect();

        let count = results.len();
        for (id, result) in results {
            let root = result.map_err(|e| Error::Content {
                overlay: id.to_string(),
                source: Box::new(e),
            })?;
            self.prepared.insert(id, root);
        }
        Ok(count)
    }

    /// Root directories of the prepared overlays.
    pub fn prepared(&self) -> BTreeMap<&OverlayId, &Utf8Path> {
        self.prepared
            .iter()
            .map(|(id, root)| (id, root.as_path()))
            .collect()
    }
}

impl OverlayContent for ProjectContent {
    fn entries(&mut self, overlay: &Overlay) -> Result<ContentEntries> {
        if overlay.is_current_build() {
            return self.current_build.entries(overlay);
        }

        let root = match self.prepared.get(overlay.id()) {
            Some(root) => root.clone(),
            None => {
                let root = self.archives.unpack(overlay)?;
                self.prepared.insert(overlay.id().clone(), root.clone());
                root
            }
        };
        Ok(walk(&root, None, true))
    }
}

/// Fixed in-memory content keyed by overlay id.
#[derive(Debug, Clone, Default)]
pub struct MemoryContent {
    overlays: HashMap<OverlayId, Vec<ContentEntry>>,
}

impl MemoryContent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file to the content of `overlay`.
    pub fn with_file(
        mut self,
        overlay: &OverlayId,
        path: &str,
        bytes: impl Into<Vec<u8>>,
    ) -> Result<Self> {
        self.add_file(overlay, path, bytes)?;
        Ok(self)
    }

    pub fn add_file(
        &mut self,
        overlay: &OverlayId,
        path: &str,
        bytes: impl Into<Vec<u8>>,
    ) -> Result<()> {
        let path = RelativePath::new(path)?;
        self.overlays
            .entry(overlay.clone())
            .or_default()
            .push(ContentEntry::new(path, ContentSource::Bytes(bytes.into())));
        Ok(())
    }
}

impl OverlayContent for MemoryContent {
    fn entries(&mut self, overlay: &Overlay) -> Result<ContentEntries> {
        let entries = self.overlays.get(overlay.id()).cloned().unwrap_or_default();
        Ok(Box::new(entries.into_iter().map(Ok)))
    }
}
