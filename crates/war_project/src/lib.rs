//! Project definition for web application assembly.
//!
//! A project file (`war.config.json` or `war.config.toml`) lists the resolved
//! artifacts of the build, the overlays to merge and the assembly settings.

mod artifact;
mod error;
mod overlay;

pub use artifact::{Artifact, ArtifactScope};
pub use error::{Error, Result};
pub use overlay::{
    default_excludes, default_includes, FilterDefaults, OverlayDescriptor, DEFAULT_EXCLUDES,
    DEFAULT_INCLUDES,
};

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Project file names, in lookup order.
pub const CONFIG_FILE_NAMES: [&str; 2] = ["war.config.json", "war.config.toml"];

/// Describes a web application assembly project.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WarProject {
    /// Name of the web application.
    ///
    /// Example: `my-webapp`
    pub name: String,

    /// Version of the web application.
    ///
    /// Example: `1.0.0`
    pub version: String,

    /// Directory the assembled tree is written to.
    #[serde(default = "default_webapp_directory")]
    pub webapp_directory: Utf8PathBuf,

    /// Directory holding the project's own web sources (JSPs, static files, `WEB-INF/web.xml`).
    #[serde(default = "default_war_source_directory")]
    pub war_source_directory: Utf8PathBuf,

    /// Compiled classes, placed under `WEB-INF/classes/`.
    #[serde(default = "default_classes_directory")]
    pub classes_directory: Utf8PathBuf,

    /// Scratch space for unpacked overlays.
    #[serde(default = "default_work_directory")]
    pub work_directory: Utf8PathBuf,

    /// Name of the strategy used to name libraries under `WEB-INF/lib/`.
    #[serde(default = "default_file_name_mapping")]
    pub file_name_mapping: String,

    /// Persist the path registry between runs for incremental rebuilds.
    #[serde(default = "default_true")]
    pub use_cache: bool,

    #[serde(default = "default_cache_file")]
    pub cache_file: Utf8PathBuf,

    /// Extensions never run through `${token}` substitution.
    #[serde(default = "default_non_filtered_file_extensions")]
    pub non_filtered_file_extensions: Vec<String>,

    /// Values substituted into filtered resources.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub filter_properties: BTreeMap<String, String>,

    /// Include/exclude sets applied to overlays that keep the library defaults.
    #[serde(default)]
    pub overlay_defaults: FilterDefaults,

    /// Settings of the project's own content when it is applied as an overlay.
    #[serde(default)]
    pub current_build: CurrentBuildSettings,

    /// Resolved artifacts of the build.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,

    /// Overlays in priority order (first wins).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overlays: Vec<OverlayDescriptor>,
}

/// Filters and flags of the current-build overlay.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CurrentBuildSettings {
    #[serde(default = "default_includes")]
    pub includes: Vec<String>,

    #[serde(default = "default_excludes")]
    pub excludes: Vec<String>,

    #[serde(default)]
    pub filtered: bool,
}

impl Default for CurrentBuildSettings {
    fn default() -> Self {
        Self {
            includes: default_includes(),
            excludes: default_excludes(),
            filtered: false,
        }
    }
}

fn default_webapp_directory() -> Utf8PathBuf {
    Utf8PathBuf::from("target/webapp")
}

fn default_war_source_directory() -> Utf8PathBuf {
    Utf8PathBuf::from("src/main/webapp")
}

fn default_classes_directory() -> Utf8PathBuf {
    Utf8PathBuf::from("target/classes")
}

fn default_work_directory() -> Utf8PathBuf {
    Utf8PathBuf::from("target/war/work")
}

fn default_cache_file() -> Utf8PathBuf {
    Utf8PathBuf::from("target/war/work/webapp-cache.json")
}

fn default_file_name_mapping() -> String {
    "standard".to_string()
}

fn default_true() -> bool {
    true
}

fn default_non_filtered_file_extensions() -> Vec<String> {
    ["jpg", "jpeg", "gif", "bmp", "png"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl WarProject {
    /// Create a project with every setting at its default.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            webapp_directory: default_webapp_directory(),
            war_source_directory: default_war_source_directory(),
            classes_directory: default_classes_directory(),
            work_directory: default_work_directory(),
            file_name_mapping: default_file_name_mapping(),
            use_cache: true,
            cache_file: default_cache_file(),
            non_filtered_file_extensions: default_non_filtered_file_extensions(),
            filter_properties: BTreeMap::new(),
            overlay_defaults: FilterDefaults::default(),
            current_build: CurrentBuildSettings::default(),
            artifacts: Vec::new(),
            overlays: Vec::new(),
        }
    }

    /// Load a project file, choosing the parser from the file extension.
    ///
    /// Relative paths inside the file are resolved against the file's directory.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_std_path())?;
        let project: Self = match path.extension() {
            Some("json") => serde_json::from_str(&contents)?,
            Some("toml") => toml::from_str(&contents)?,
            _ => return Err(Error::UnsupportedFormat(path.to_path_buf())),
        };

        Ok(match path.parent() {
            Some(base_dir) if !base_dir.as_str().is_empty() => project.resolve_paths(base_dir),
            _ => project,
        })
    }

    /// Find the project file in `dir` (JSON first, then TOML).
    pub fn find_config(dir: &Utf8Path) -> Option<Utf8PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.as_std_path().is_file())
    }

    /// Serialize to pretty TOML, as written by `init`.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Make every relative path absolute against `base_dir`.
    pub fn resolve_paths(mut self, base_dir: &Utf8Path) -> Self {
        let resolve = |path: &mut Utf8PathBuf| {
            if path.is_relative() {
                *path = base_dir.join(&*path);
            }
        };

        resolve(&mut self.webapp_directory);
        resolve(&mut self.war_source_directory);
        resolve(&mut self.classes_directory);
        resolve(&mut self.work_directory);
        resolve(&mut self.cache_file);
        for artifact in &mut self.artifacts {
            if let Some(file) = artifact.file.as_mut() {
                resolve(file);
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_example_project() -> WarProject {
        let mut project = WarProject::new("storefront", "1.4.0");
        project.webapp_directory = Utf8PathBuf::from("target/storefront");
        project
            .filter_properties
            .insert("app.title".to_string(), "Storefront".to_string());
        project.overlay_defaults = FilterDefaults {
            includes: vec!["**/**".to_string()],
            excludes: vec!["META-INF/**".to_string()],
        };
        project.artifacts = vec![
            Artifact::new("org.sample", "shell", "2.1")
                .with_type("war")
                .with_file("repo/shell-2.1.war"),
            Artifact::new("org.sample", "commons", "1.0")
                .with_scope(ArtifactScope::Runtime)
                .with_file("repo/commons-1.0.jar"),
        ];
        project.overlays = vec![
            OverlayDescriptor::for_artifact("org.sample", "shell")
                .with_excludes(["WEB-INF/web.xml"])
                .with_target_path("shell"),
            OverlayDescriptor::current_build(),
        ];
        project
    }

    #[test]
    fn test_json_parsing() {
        let project: WarProject =
            serde_json::from_str(include_str!("../test-data/war.config.json")).unwrap();

        assert_eq!(project, create_example_project());
    }

    #[test]
    fn test_toml_parsing() {
        let project: WarProject =
            toml::from_str(include_str!("../test-data/war.config.toml")).unwrap();

        assert_eq!(project, create_example_project());
    }

    #[test]
    fn test_minimal_project_defaults() {
        let project: WarProject =
            toml::from_str("name = \"app\"\nversion = \"0.1.0\"\n").unwrap();

        assert_eq!(project, WarProject::new("app", "0.1.0"));
        assert!(project.use_cache);
        assert_eq!(project.file_name_mapping, "standard");
        assert!(project.overlays.is_empty());
    }

    #[test]
    fn test_toml_round_trip_of_init_template() {
        let project = WarProject::new("app", "0.1.0");
        let text = project.to_toml_string().unwrap();
        let parsed: WarProject = toml::from_str(&text).unwrap();
        assert_eq!(parsed, project);
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let base = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let path = base.join("war.config.json");
        std::fs::write(&path, include_str!("../test-data/war.config.json")).unwrap();

        assert_eq!(WarProject::find_config(&base), Some(path.clone()));

        let project = WarProject::load(&path).unwrap();
        assert_eq!(project.webapp_directory, base.join("target/storefront"));
        assert_eq!(
            project.artifacts[0].file.as_deref(),
            Some(base.join("repo/shell-2.1.war").as_path())
        );
    }

    #[test]
    fn test_load_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let base = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let path = base.join("war.config.yaml");
        std::fs::write(&path, "name: app").unwrap();

        assert!(matches!(
            WarProject::load(&path),
            Err(Error::UnsupportedFormat(_))
        ));
        assert_eq!(WarProject::find_config(&base), None);
    }
}
