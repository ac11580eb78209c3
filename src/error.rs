use crate::preset::Feature;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error types for the aurora-research library.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// IO error with context about the file path.
    #[error("IO error accessing '{path}': {message}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Template rendering error.
    #[error("Failed to render template '{template}': {message}")]
    Template {
        /// Template name
        template: String,
        /// Error message
        message: String,
    },

    /// Configuration validation error.
    #[error("Invalid configuration: {message}")]
    Config {
        /// Detailed error message
        message: String,
    },

    /// JSON serialization error.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message
        message: String,
    },

    /// Transport-level failure talking to the generation API.
    #[error("HTTP request failed: {message}")]
    Http {
        /// Error message
        message: String,
    },

    /// The generation API answered with a non-success status.
    #[error("Generation API returned HTTP {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// A feature-level generation failure.
    ///
    /// Displays only the generic message for the feature; `cause` is kept for logs.
    #[error("{}", .feature.failure_message())]
    Generation {
        /// Feature whose remote call failed
        feature: Feature,
        /// Underlying cause, for diagnostics
        cause: String,
    },

    /// User input rejected before any remote call.
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// What was wrong with the input
        message: String,
    },

    /// Consolidation needs at least two analysed documents.
    #[error("Cannot consolidate: at least 2 analysed documents are required ({completed} available)")]
    CannotConsolidate {
        /// Number of documents currently done
        completed: usize,
    },

    /// A batch run is already in progress.
    #[error("A batch is already being processed")]
    BatchInProgress,

    /// No item or artifact with the given id.
    #[error("No entry with id '{id}'")]
    ItemNotFound {
        /// The missing id
        id: String,
    },
}

impl Error {
    /// Creates an IO error with path context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: source.to_string(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a template error.
    #[must_use]
    pub fn template(template: impl Into<String>, source: tera::Error) -> Self {
        Self::Template {
            template: template.into(),
            message: source.to_string(),
        }
    }

    /// Creates an input validation error.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Wraps any failure of a remote call into the feature's generic error.
    #[must_use]
    pub fn generation(feature: Feature, cause: &Self) -> Self {
        Self::Generation {
            feature,
            cause: cause.to_string(),
        }
    }

    /// Creates a not-found error.
    #[must_use]
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::ItemNotFound { id: id.into() }
    }

    /// Returns true if this is an IO error.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. })
    }

    /// Returns true if the input was rejected before reaching the remote API.
    #[must_use]
    pub const fn is_rejected_input(&self) -> bool {
        matches!(self, Self::InvalidInput { .. } | Self::CannotConsolidate { .. })
    }

    /// Returns the feature of a generation failure, if this is one.
    #[must_use]
    pub const fn generation_feature(&self) -> Option<Feature> {
        match self {
            Self::Generation { feature, .. } => Some(*feature),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization {
            message: e.to_string(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Http {
            message: e.to_string(),
        }
    }
}
