use thiserror::Error;

#[derive(Error, Debug)]
pub enum SlscError {
    #[error("Shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: String,
        expected: String,
        actual: String,
    },

    #[error("Size mismatch in {context}: expected {expected}, got {actual}")]
    SizeMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    #[error("Index {index} out of range for axis '{axis}' of length {len}")]
    OutOfRange { axis: String, index: usize, len: usize },

    #[error("Duplicate axis label: {0}")]
    DuplicateLabel(String),

    #[error("Degenerate channel {channel}{}: zero variance over the coherence window", .point.map(|p| format!(" at point {}", p)).unwrap_or_default())]
    DegenerateChannel { channel: usize, point: Option<usize> },

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid state: {0}")]
    StateError(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Input file not found: {0}")]
    FileNotFound(String),

    #[error("Processing cancelled after {completed} of {total} points")]
    Cancelled { completed: usize, total: usize },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    ConfigError(#[from] serde_json::Error),
}

impl SlscError {
    pub(crate) fn shape(
        context: impl Into<String>,
        expected: impl ToString,
        actual: impl ToString,
    ) -> Self {
        SlscError::ShapeMismatch {
            context: context.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub(crate) fn size(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        SlscError::SizeMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }

    /// Attach a reconstruction point index to a per-point error.
    pub fn at_point(self, point: usize) -> Self {
        match self {
            SlscError::DegenerateChannel { channel, .. } => SlscError::DegenerateChannel {
                channel,
                point: Some(point),
            },
            SlscError::ShapeMismatch {
                context,
                expected,
                actual,
            } => SlscError::ShapeMismatch {
                context: format!("{} (point {})", context, point),
                expected,
                actual,
            },
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, SlscError>;
