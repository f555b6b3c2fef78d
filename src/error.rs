use std::path::PathBuf;

use thiserror::Error;

/// Main application error type that encompasses all possible failure modes
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parse error: {origin}: {details}")]
    Parse { origin: String, details: String },

    #[error("unresolved entity reference '&{name};' in {origin}")]
    UnresolvedEntity { origin: String, name: String },

    #[error("cannot load entities file {path}: {details}")]
    EntitiesFile { path: PathBuf, details: String },

    #[error("XInclude failed: {origin}: {details}")]
    XInclude { origin: String, details: String },

    #[error("id='{id}' is not the same as page name '{path}'")]
    IdMismatch { id: String, path: String },

    #[error("missing id attribute on root element of {path}")]
    MissingId { path: String },

    #[error("missing required element '{element}' in {origin}")]
    MissingElement {
        element: &'static str,
        origin: String,
    },

    #[error("empty refname in {origin}")]
    EmptyName { origin: String },
}

impl IndexError {
    /// Parse-layer failure tied to the document it came from.
    pub fn parse(origin: impl Into<String>, details: impl Into<String>) -> Self {
        IndexError::Parse {
            origin: origin.into(),
            details: details.into(),
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, IndexError>;
