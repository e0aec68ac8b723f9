use camino::Utf8PathBuf;
use miette::{Diagnostic, SourceSpan};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error("Configuration file not found")]
    #[diagnostic(
        code(config::not_found),
        help("Create a war.config.json or war.config.toml file in your project directory (see `war-assembler init`)")
    )]
    ConfigNotFound { search_path: Utf8PathBuf },

    #[error("Configuration file already exists: {path}")]
    #[diagnostic(
        code(config::already_exists),
        help("Remove the existing file or initialize the project in another directory")
    )]
    ConfigAlreadyExists { path: Utf8PathBuf },

    #[error("Configuration file error: {path}")]
    #[diagnostic(
        code(config::parse_error),
        help("Check your war.config.json or war.config.toml file for syntax errors")
    )]
    ConfigParseError {
        path: Utf8PathBuf,
        #[source]
        source: war_project::Error,
    },

    #[error("Invalid project name: {name}")]
    #[diagnostic(
        code(project::invalid_name),
        help("Project names must be alphanumeric and contain no spaces or special characters")
    )]
    InvalidProjectName {
        name: String,
        #[label("invalid project name")]
        span: Option<SourceSpan>,
    },

    #[error("Invalid version format: {version}")]
    #[diagnostic(
        code(project::invalid_version),
        help("Version must follow semantic versioning (e.g., 1.0.0, 2.1.3-beta)")
    )]
    InvalidVersion {
        version: String,
        #[label("invalid version")]
        span: Option<SourceSpan>,
    },

    #[error("Invalid overlay configuration")]
    #[diagnostic(
        code(overlay::configuration),
        help("Check the `overlays` and `artifacts` sections of your project file")
    )]
    OverlayConfiguration {
        #[source]
        source: war_overlay::Error,
    },

    #[error("Webapp assembly failed")]
    #[diagnostic(
        code(assembly::failed),
        help("Check file permissions and that every overlay archive is a readable zip file")
    )]
    AssemblyFailed {
        #[source]
        source: war_overlay::Error,
    },

    #[error("No registry cache found at {path}")]
    #[diagnostic(
        code(cache::not_found),
        help("Run `war-assembler assemble` with caching enabled first")
    )]
    CacheNotFound { path: Utf8PathBuf },

    #[error("No overlay owns '{path}'")]
    #[diagnostic(
        code(cache::path_not_owned),
        help("Paths are relative to the webapp directory, e.g. WEB-INF/web.xml")
    )]
    PathNotOwned { path: String },

    #[error("Path is not valid UTF-8: {}", path.display())]
    #[diagnostic(code(fs::non_utf8_path))]
    NonUtf8Path { path: PathBuf },

    #[error("IO operation failed")]
    #[diagnostic(code(io::operation_failed))]
    IoError {
        #[from]
        source: std::io::Error,
    },
}

impl CliError {
    pub fn config_not_found(search_path: Utf8PathBuf) -> Self {
        Self::ConfigNotFound { search_path }
    }

    pub fn config_already_exists(path: Utf8PathBuf) -> Self {
        Self::ConfigAlreadyExists { path }
    }

    pub fn config_parse_error(path: Utf8PathBuf, source: war_project::Error) -> Self {
        Self::ConfigParseError { path, source }
    }

    pub fn invalid_project_name(name: String, span: Option<SourceSpan>) -> Self {
        Self::InvalidProjectName { name, span }
    }

    pub fn invalid_version(version: String, span: Option<SourceSpan>) -> Self {
        Self::InvalidVersion { version, span }
    }

    pub fn cache_not_found(path: Utf8PathBuf) -> Self {
        Self::CacheNotFound { path }
    }

    pub fn path_not_owned(path: impl Into<String>) -> Self {
        Self::PathNotOwned { path: path.into() }
    }
}

impl From<war_overlay::Error> for CliError {
    fn from(source: war_overlay::Error) -> Self {
        if source.is_configuration_error() {
            Self::OverlayConfiguration { source }
        } else {
            Self::AssemblyFailed { source }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_errors_are_split_by_kind() {
        let configuration = CliError::from(war_overlay::Error::DuplicateCurrentBuild);
        assert!(matches!(configuration, CliError::OverlayConfiguration { .. }));

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let failure = CliError::from(war_overlay::Error::Io(io));
        assert!(matches!(failure, CliError::AssemblyFailed { .. }));
    }
}
