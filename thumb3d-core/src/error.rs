/// Error types for loading and rendering models
use thiserror::Error;

/// Failure while fetching or parsing a model file
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to load {url}: HTTP {status}")]
    Http { url: String, status: u16 },

    #[error("failed to load {url}: {message}")]
    Network { url: String, message: String },

    #[error("model not found: {url}")]
    NotFound { url: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse {format} model: {message}")]
    Parse {
        format: &'static str,
        message: String,
    },

    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("load cancelled")]
    Cancelled,
}

impl LoadError {
    pub(crate) fn parse(format: &'static str, message: impl Into<String>) -> Self {
        LoadError::Parse {
            format,
            message: message.into(),
        }
    }
}

/// Terminal failure of a render request
#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Load(LoadError),

    #[error("invalid render request: {0}")]
    InvalidRequest(String),

    #[error("model has no extent to normalize (max dimension {0})")]
    DegenerateModel(f32),

    #[error("failed to encode thumbnail: {0}")]
    Encode(String),

    #[error("render cancelled")]
    Cancelled,
}

impl From<LoadError> for RenderError {
    fn from(e: LoadError) -> Self {
        match e {
            LoadError::Cancelled => RenderError::Cancelled,
            other => RenderError::Load(other),
        }
    }
}

impl From<image::ImageError> for RenderError {
    fn from(e: image::ImageError) -> Self {
        RenderError::Encode(e.to_string())
    }
}

/// Result type alias for render operations
pub type Result<T> = std::result::Result<T, RenderError>;
