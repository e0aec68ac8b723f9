//! Materializing content into the assembled tree.
//!
//! A [`ContentSink`] receives every path the registry handed to an overlay.
//! [`FsContentSink`] writes below the webapp directory; [`MemorySink`] only
//! records what would have been written, for dry runs and tests.

use crate::content::ContentSource;
use crate::error::Result;
use crate::filter::ResourceFilter;
use crate::registry::RelativePath;
use crate::utils::is_stale;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Destination of claimed content.
pub trait ContentSink {
    /// Write one unit of content. `filtered` requests `${token}` substitution.
    fn write(&mut self, path: &RelativePath, source: &ContentSource, filtered: bool) -> Result<()>;

    /// Bring a path owned by the same overlay last run up to date.
    ///
    /// Returns whether anything was written.
    fn refresh(
        &mut self,
        path: &RelativePath,
        source: &ContentSource,
        filtered: bool,
    ) -> Result<bool> {
        self.write(path, source, filtered)?;
        Ok(true)
    }
}

/// Writes content below a root directory.
pub struct FsContentSink {
    root: Utf8PathBuf,
    filter: Option<Box<dyn ResourceFilter>>,
    non_filtered_extensions: BTreeSet<String>,
}

impl fmt::Debug for FsContentSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FsContentSink")
            .field("root", &self.root)
            .field("filter", &self.filter.is_some())
            .field("non_filtered_extensions", &self.non_filtered_extensions)
            .finish()
    }
}

impl FsContentSink {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            filter: None,
            non_filtered_extensions: BTreeSet::new(),
        }
    }

    pub fn with_filter(mut self, filter: impl ResourceFilter + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Extensions (case-insensitive) that are copied verbatim even from filtered overlays.
    pub fn with_non_filtered_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.non_filtered_extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn filter_for(&self, path: &RelativePath, filtered: bool) -> Option<&dyn ResourceFilter> {
        if !filtered {
            return None;
        }
        let excluded = path
            .extension()
            .is_some_and(|ext| self.non_filtered_extensions.contains(&ext));
        if excluded {
            return None;
        }
        self.filter.as_deref()
    }
}

impl ContentSink for FsContentSink {
    fn write(&mut self, path: &RelativePath, source: &ContentSource, filtered: bool) -> Result<()> {
        let dest = path.to_path(&self.root);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent.as_std_path())?;
        }

        if let Some(filter) = self.filter_for(path, filtered) {
            let bytes = source.read()?;
            match String::from_utf8(bytes) {
                Ok(text) => std::fs::write(dest.as_std_path(), filter.filter(&text))?,
                Err(e) => {
                    tracing::debug!("Copying non-UTF-8 resource '{}' unfiltered", path);
                    std::fs::write(dest.as_std_path(), e.into_bytes())?;
                }
            }
            return Ok(());
        }

        match source {
            ContentSource::File(file) => {
                std::fs::copy(file.as_std_path(), dest.as_std_path())?;
                let modified = std::fs::metadata(file.as_std_path())?.modified()?;
                std::fs::File::options()
                    .write(true)
                    .open(dest.as_std_path())?
                    .set_modified(modified)?;
            }
            ContentSource::Bytes(bytes) => std::fs::write(dest.as_std_path(), bytes)?,
        }
        Ok(())
    }

    fn refresh(
        &mut self,
        path: &RelativePath,
        source: &ContentSource,
        filtered: bool,
    ) -> Result<bool> {
        // Filtered output depends on the properties too, so it is always rewritten.
        if self.filter_for(path, filtered).is_none() {
            if let ContentSource::File(file) = source {
                if !is_stale(file, &path.to_path(&self.root))? {
                    return Ok(false);
                }
            }
        }

        self.write(path, source, filtered)?;
        Ok(true)
    }
}

/// A write recorded by [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedWrite {
    pub source: ContentSource,
    pub filtered: bool,
}

/// Records writes without touching the filesystem.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    files: BTreeMap<RelativePath, RecordedWrite>,
    order: Vec<RelativePath>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Written paths in path order.
    pub fn files(&self) -> &BTreeMap<RelativePath, RecordedWrite> {
        &self.files
    }

    /// Paths in the order they were written.
    pub fn write_order(&self) -> &[RelativePath] {
        &self.order
    }

    /// Bytes of a recorded write, read from its source.
    pub fn contents(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let path = RelativePath::new(path)?;
        self.files
            .get(&path)
            .map(|write| write.source.read())
            .transpose()
    }
}

impl ContentSink for MemorySink {
    fn write(&mut self, path: &RelativePath, source: &ContentSource, filtered: bool) -> Result<()> {
        self.order.push(path.clone());
        self.files.insert(
            path.clone(),
            RecordedWrite {
                source: source.clone(),
                filtered,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::PropertiesFilter;
    use std::fs;
    use std::time::{Duration, SystemTime};
    use tempfile::tempdir;

    fn utf8(path: &std::path::Path) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(path.to_path_buf()).unwrap()
    }

    fn path(raw: &str) -> RelativePath {
        RelativePath::new(raw).unwrap()
    }

    fn sink(root: &Utf8Path) -> FsContentSink {
        FsContentSink::new(root)
            .with_filter(PropertiesFilter::default().with_property("app.title", "Storefront"))
            .with_non_filtered_extensions(["png", ".JPG"])
    }

    #[test]
    fn test_write_bytes_creates_parents() {
        let dir = tempdir().unwrap();
        let root = utf8(dir.path());
        let mut sink = sink(&root);

        sink.write(
            &path("WEB-INF/web.xml"),
            &ContentSource::Bytes(b"<web-app/>".to_vec()),
            false,
        )
        .unwrap();

        assert_eq!(
            fs::read_to_string(root.join("WEB-INF/web.xml")).unwrap(),
            "<web-app/>"
        );
    }

    #[test]
    fn test_filtering_rules() {
        let dir = tempdir().unwrap();
        let root = utf8(dir.path());
        let mut sink = sink(&root);
        let text = ContentSource::Bytes(b"${app.title}".to_vec());

        sink.write(&path("index.jsp"), &text, true).unwrap();
        sink.write(&path("raw.jsp"), &text, false).unwrap();
        sink.write(&path("img/logo.PNG"), &text, true).unwrap();
        sink.write(&path("img/photo.jpg"), &text, true).unwrap();
        sink.write(
            &path("bin.dat"),
            &ContentSource::Bytes(vec![0xff, 0xfe, b'$']),
            true,
        )
        .unwrap();

        assert_eq!(fs::read_to_string(root.join("index.jsp")).unwrap(), "Storefront");
        assert_eq!(fs::read_to_string(root.join("raw.jsp")).unwrap(), "${app.title}");
        assert_eq!(fs::read_to_string(root.join("img/logo.PNG")).unwrap(), "${app.title}");
        assert_eq!(fs::read_to_string(root.join("img/photo.jpg")).unwrap(), "${app.title}");
        assert_eq!(fs::read(root.join("bin.dat")).unwrap(), vec![0xff, 0xfe, b'$']);
    }

    #[test]
    fn test_copy_preserves_mtime_and_refresh_skips_fresh_files() {
        let dir = tempdir().unwrap();
        let root = utf8(dir.path());
        let source_path = root.join("src/site.css");
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(&source_path, "body {}").unwrap();
        let old = SystemTime::now() - Duration::from_secs(3600);
        fs::File::options()
            .write(true)
            .open(&source_path)
            .unwrap()
            .set_modified(old)
            .unwrap();

        let out = root.join("out");
        let mut sink = FsContentSink::new(&out);
        let source = ContentSource::File(source_path.clone());

        sink.write(&path("css/site.css"), &source, false).unwrap();
        let copied = fs::metadata(out.join("css/site.css")).unwrap().modified().unwrap();
        assert_eq!(copied, fs::metadata(&source_path).unwrap().modified().unwrap());

        assert!(!sink.refresh(&path("css/site.css"), &source, false).unwrap());

        fs::write(&source_path, "body { margin: 0 }").unwrap();
        assert!(sink.refresh(&path("css/site.css"), &source, false).unwrap());
        assert_eq!(
            fs::read_to_string(out.join("css/site.css")).unwrap(),
            "body { margin: 0 }"
        );
    }

    #[test]
    fn test_refresh_always_rewrites_filtered() {
        let dir = tempdir().unwrap();
        let root = utf8(dir.path());
        let source_path = root.join("index.jsp");
        fs::write(&source_path, "${app.title}").unwrap();

        let mut sink = sink(&root.join("out"));
        let source = ContentSource::File(source_path);
        sink.write(&path("index.jsp"), &source, true).unwrap();

        assert!(sink.refresh(&path("index.jsp"), &source, true).unwrap());
    }

    #[test]
    fn test_memory_sink_records() {
        let mut sink = MemorySink::new();
        sink.write(&path("b.jsp"), &ContentSource::Bytes(b"b".to_vec()), false)
            .unwrap();
        sink.write(&path("a.jsp"), &ContentSource::Bytes(b"a".to_vec()), true)
            .unwrap();

        let order: Vec<&str> = sink.write_order().iter().map(RelativePath::as_str).collect();
        assert_eq!(order, vec!["b.jsp", "a.jsp"]);
        assert!(sink.files()[&path("a.jsp")].filtered);
        assert_eq!(sink.contents("b.jsp").unwrap(), Some(b"b".to_vec()));
        assert_eq!(sink.contents("c.jsp").unwrap(), None);
        // Default refresh writes.
        assert!(sink
            .refresh(&path("c.jsp"), &ContentSource::Bytes(Vec::new()), false)
            .unwrap());
    }
}
