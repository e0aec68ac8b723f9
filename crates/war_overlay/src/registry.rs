//! The merge ledger.
//!
//! [`PathRegistry`] maps every path of the assembled tree to the overlay that
//! claimed it first. It is the single point deciding whether an overlay may
//! write a path: once a path is claimed it is never handed to another owner
//! within the same run.
//!
//! When a registry from a previous run is available (see
//! [`RegistryCache`](crate::cache::RegistryCache)), [`PathRegistry::register`]
//! also reports how ownership changed since then, which lets the applier skip
//! files that are already up to date.

use crate::error::{Error, Result};
use crate::overlay::{Overlay, OverlayId};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A normalized, `/`-separated path relative to the assembled tree root.
///
/// Backslashes become `/`, empty and `.` segments are dropped and `..`
/// segments are resolved lexically. Case is preserved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelativePath(String);

impl RelativePath {
    pub fn new(raw: &str) -> Result<Self> {
        let unified = raw.replace('\\', "/");
        let mut segments: Vec<&str> = Vec::new();

        for segment in unified.split('/') {
            match segment {
                "" | "." => continue,
                ".." => {
                    if segments.pop().is_none() {
                        return Err(Error::InvalidPath(format!(
                            "'{}' escapes the output directory",
                            raw
                        )));
                    }
                }
                other => segments.push(other),
            }
        }

        if segments.is_empty() {
            return Err(Error::InvalidPath(format!("'{}' is empty", raw)));
        }

        Ok(Self(segments.join("/")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Place this path below `prefix`.
    pub fn prefixed(&self, prefix: &str) -> Result<Self> {
        match Self::new(prefix) {
            Ok(prefix) => Self::new(&format!("{}/{}", prefix.0, self.0)),
            // A prefix like "." or "/" normalizes to nothing and places content at the root.
            Err(Error::InvalidPath(_)) if !prefix.contains("..") => Ok(self.clone()),
            Err(e) => Err(e),
        }
    }

    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Lowercased extension of the file name, if any.
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name();
        let (stem, ext) = name.rsplit_once('.')?;
        (!stem.is_empty() && !ext.is_empty()).then(|| ext.to_ascii_lowercase())
    }

    /// Resolve against a filesystem root.
    pub fn to_path(&self, root: &Utf8Path) -> Utf8PathBuf {
        root.join(&self.0)
    }
}

impl fmt::Display for RelativePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RelativePath {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<RelativePath> for String {
    fn from(path: RelativePath) -> Self {
        path.0
    }
}

/// Outcome of claiming a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// The path is new; write it.
    Registered,
    /// The same overlay owned the path in the previous run; refresh it if stale.
    AlreadyRegistered,
    /// Another overlay of the current list owned the path in the previous run.
    Superseded { previous_owner: OverlayId },
    /// The previous owner is no longer part of the overlay list.
    SupersededUnknownOwner { previous_owner: OverlayId },
    /// A higher-priority overlay claimed the path earlier in this run.
    Refused { owner: OverlayId },
}

impl Registration {
    /// Whether the requesting overlay now owns the path.
    pub fn is_claimed(&self) -> bool {
        !matches!(self, Registration::Refused { .. })
    }
}

/// Mapping from assembled-tree path to owning overlay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathRegistry {
    entries: BTreeMap<RelativePath, OverlayId>,
    known_owners: BTreeSet<OverlayId>,
}

impl PathRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty registry that knows the ids of the overlays taking part in this run.
    pub fn for_overlays(overlays: &[Overlay]) -> Self {
        Self {
            entries: BTreeMap::new(),
            known_owners: overlays.iter().map(|o| o.id().clone()).collect(),
        }
    }

    pub(crate) fn from_entries(entries: BTreeMap<RelativePath, OverlayId>) -> Self {
        let known_owners = entries.values().cloned().collect();
        Self {
            entries,
            known_owners,
        }
    }

    /// Claim `path` for `owner` if nobody owns it yet.
    ///
    /// Returns `false` when the path is already claimed, whoever the requester is.
    pub fn register_if_absent(&mut self, owner: &OverlayId, path: &RelativePath) -> bool {
        if self.entries.contains_key(path) {
            return false;
        }
        self.entries.insert(path.clone(), owner.clone());
        self.known_owners.insert(owner.clone());
        true
    }

    /// Claim `path` and report how ownership relates to the `previous` run.
    pub fn register(
        &mut self,
        owner: &OverlayId,
        path: &RelativePath,
        previous: Option<&PathRegistry>,
    ) -> Registration {
        if let Some(current) = self.entries.get(path) {
            return Registration::Refused {
                owner: current.clone(),
            };
        }

        self.register_if_absent(owner, path);

        match previous.and_then(|p| p.owner_of(path)) {
            None => Registration::Registered,
            Some(previous_owner) if previous_owner == owner => Registration::AlreadyRegistered,
            Some(previous_owner) if self.known_owners.contains(previous_owner) => {
                Registration::Superseded {
                    previous_owner: previous_owner.clone(),
                }
            }
            Some(previous_owner) => Registration::SupersededUnknownOwner {
                previous_owner: previous_owner.clone(),
            },
        }
    }

    pub fn owner_of(&self, path: &RelativePath) -> Option<&OverlayId> {
        self.entries.get(path)
    }

    pub fn is_registered(&self, path: &RelativePath) -> bool {
        self.entries.contains_key(path)
    }

    /// Paths owned by `owner`, in path order.
    pub fn paths_of<'a>(&'a self, owner: &'a OverlayId) -> impl Iterator<Item = &'a RelativePath> {
        self.entries
            .iter()
            .filter(move |(_, o)| *o == owner)
            .map(|(path, _)| path)
    }

    /// Every overlay owning at least one path.
    pub fn owners(&self) -> BTreeSet<&OverlayId> {
        self.entries.values().collect()
    }

    /// Entries in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&RelativePath, &OverlayId)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn entries(&self) -> &BTreeMap<RelativePath, OverlayId> {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::Coordinates;

    fn path(raw: &str) -> RelativePath {
        RelativePath::new(raw).unwrap()
    }

    fn id(group: &str, artifact: &str) -> OverlayId {
        OverlayId::from(&Coordinates::new(group, artifact))
    }

    #[test]
    fn test_normalization() {
        assert_eq!(path("WEB-INF\\lib\\a.jar").as_str(), "WEB-INF/lib/a.jar");
        assert_eq!(path("/./css//site.css").as_str(), "css/site.css");
        assert_eq!(path("jsp/d/../a.jsp").as_str(), "jsp/a.jsp");
        assert_eq!(path("Index.JSP").as_str(), "Index.JSP");
    }

    #[test]
    fn test_invalid_paths() {
        assert!(matches!(RelativePath::new("../etc/passwd"), Err(Error::InvalidPath(_))));
        assert!(matches!(RelativePath::new("a/../../b"), Err(Error::InvalidPath(_))));
        assert!(matches!(RelativePath::new("./"), Err(Error::InvalidPath(_))));
    }

    #[test]
    fn test_prefixed() {
        assert_eq!(path("a.jsp").prefixed("shell/").unwrap().as_str(), "shell/a.jsp");
        assert_eq!(path("a.jsp").prefixed("./").unwrap().as_str(), "a.jsp");
        assert!(path("a.jsp").prefixed("../outside").is_err());
    }

    #[test]
    fn test_extension() {
        assert_eq!(path("img/logo.PNG").extension().as_deref(), Some("png"));
        assert_eq!(path("WEB-INF/.htaccess").extension(), None);
        assert_eq!(path("README").extension(), None);
        assert_eq!(path("css/site.css").file_name(), "site.css");
    }

    #[test]
    fn test_register_if_absent_first_writer_wins() {
        let mut registry = PathRegistry::new();
        let first = OverlayId::current_build();
        let second = id("g", "a");

        assert!(registry.register_if_absent(&first, &path("index.jsp")));
        assert!(!registry.register_if_absent(&second, &path("index.jsp")));
        assert!(!registry.register_if_absent(&first, &path("index.jsp")));
        assert!(registry.register_if_absent(&second, &path("admin.jsp")));

        assert_eq!(registry.owner_of(&path("index.jsp")), Some(&first));
        assert_eq!(registry.owner_of(&path("admin.jsp")), Some(&second));
        assert_eq!(registry.owner_of(&path("missing.jsp")), None);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_normalized_keys_collide() {
        let mut registry = PathRegistry::new();
        let owner = OverlayId::current_build();
        assert!(registry.register_if_absent(&owner, &path("WEB-INF/web.xml")));
        assert!(!registry.register_if_absent(&id("g", "a"), &path("WEB-INF\\web.xml")));
    }

    #[test]
    fn test_paths_of_and_owners() {
        let mut registry = PathRegistry::new();
        let a = id("g", "a");
        let b = id("g", "b");
        registry.register_if_absent(&a, &path("z.jsp"));
        registry.register_if_absent(&b, &path("b.jsp"));
        registry.register_if_absent(&a, &path("a.jsp"));

        let paths: Vec<&str> = registry.paths_of(&a).map(RelativePath::as_str).collect();
        assert_eq!(paths, vec!["a.jsp", "z.jsp"]);
        assert_eq!(registry.owners().len(), 2);
    }

    #[test]
    fn test_register_against_previous_run() {
        let current = OverlayId::current_build();
        let a = id("g", "a");
        let gone = id("g", "gone");

        let mut previous = PathRegistry::new();
        previous.register_if_absent(&current, &path("index.jsp"));
        previous.register_if_absent(&current, &path("login.jsp"));
        previous.register_if_absent(&gone, &path("admin.jsp"));

        let mut registry = PathRegistry::new();
        registry.known_owners.insert(current.clone());
        registry.known_owners.insert(a.clone());

        assert_eq!(
            registry.register(&current, &path("index.jsp"), Some(&previous)),
            Registration::AlreadyRegistered
        );
        assert_eq!(
            registry.register(&a, &path("login.jsp"), Some(&previous)),
            Registration::Superseded {
                previous_owner: current.clone()
            }
        );
        assert_eq!(
            registry.register(&a, &path("admin.jsp"), Some(&previous)),
            Registration::SupersededUnknownOwner {
                previous_owner: gone.clone()
            }
        );
        assert_eq!(
            registry.register(&a, &path("new.jsp"), Some(&previous)),
            Registration::Registered
        );

        let refused = registry.register(&a, &path("index.jsp"), Some(&previous));
        assert_eq!(refused, Registration::Refused { owner: current.clone() });
        assert!(!refused.is_claimed());
        assert_eq!(registry.owner_of(&path("index.jsp")), Some(&current));
    }

    #[test]
    fn test_relative_path_serde_normalizes() {
        let parsed: RelativePath = serde_json::from_str("\"css\\\\site.css\"").unwrap();
        assert_eq!(parsed.as_str(), "css/site.css");
        assert!(serde_json::from_str::<RelativePath>("\"../x\"").is_err());
    }
}
