//! Error types for assembly operations.
//!
//! All fallible functions in this crate return [`Result<T>`], which uses [`Error`]
//! as the error type. External error types (`std::io::Error`, `serde_json::Error`,
//! zip and directory-walk errors) are converted via `From` impls.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving overlays or assembling a webapp.
#[derive(Error, Debug)]
pub enum Error {
    /// Filesystem I/O failed (reading overlay content, writing the webapp, etc.).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse or serialize JSON (registry cache).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An overlay archive could not be read.
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Directory traversal failed while enumerating overlay content.
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// The project definition could not be loaded.
    #[error("Project error: {0}")]
    Project(#[from] war_project::Error),

    /// An include or exclude glob does not compile.
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// A path is empty or escapes the assembled tree.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// An overlay names only one of groupId/artifactId.
    #[error("Overlay [{group_id}:{artifact_id}] must name both groupId and artifactId")]
    IncompleteOverlay {
        group_id: String,
        artifact_id: String,
    },

    /// A configured overlay does not match any available artifact.
    #[error("Overlay [{id}] ({coordinates}) is not a dependency of the project")]
    UnresolvedOverlay { id: String, coordinates: String },

    /// The same overlay is configured twice with different flags.
    #[error("Overlay [{id}] is configured more than once with conflicting {field}")]
    ConflictingOverlay { id: String, field: &'static str },

    /// The current build is configured more than once.
    #[error("The current build overlay is configured more than once")]
    DuplicateCurrentBuild,

    /// An artifact-backed overlay has no backing file or directory.
    #[error("Overlay [{0}] has no artifact file to read from")]
    MissingArtifactFile(String),

    /// No file name mapping is registered under this name.
    #[error("Unknown file name mapping: {0}")]
    UnknownMapping(String),

    /// Reading content from an overlay failed.
    #[error("Overlay [{overlay}] could not be read: {source}")]
    Content {
        overlay: String,
        #[source]
        source: Box<Error>,
    },

    /// Writing one path of the assembled tree failed.
    #[error("Failed to write '{path}' from overlay [{overlay}]: {source}")]
    Write {
        overlay: String,
        path: String,
        #[source]
        source: Box<Error>,
    },

    /// Catch-all for errors from content providers and other sources.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether the error comes from configuration rather than I/O.
    ///
    /// Configuration errors are raised before the output tree is touched.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidPattern { .. }
                | Error::IncompleteOverlay { .. }
                | Error::UnresolvedOverlay { .. }
                | Error::ConflictingOverlay { .. }
                | Error::DuplicateCurrentBuild
                | Error::MissingArtifactFile(_)
                | Error::UnknownMapping(_)
                | Error::Project(_)
        )
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}
