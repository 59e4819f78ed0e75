use std::fmt;

/// Result type for gridrace operations
pub type Result<T> = std::result::Result<T, RaceError>;

/// Main error type for the simulation and training core
#[derive(Debug, Clone)]
pub enum RaceError {
    /// Invalid dimensions for array or network operations
    DimensionMismatch {
        expected: String,
        actual: String,
    },

    /// Invalid parameter value
    InvalidParameter {
        name: String,
        reason: String,
    },

    /// IO errors (file operations)
    Io(String),

    /// Serialization/deserialization errors
    Serialization(String),

    /// NaN or infinite values produced by a numerical operation
    Numerical(String),

    /// Not enough data in a buffer
    EmptyBuffer(String),

    /// Action index outside the action space
    InvalidAction {
        action: usize,
        max_actions: usize,
    },

    /// Training error
    Training(String),

    /// Malformed track grid or track file
    InvalidTrack(String),

    /// A gradient step is already running
    TrainingInProgress,
}

impl fmt::Display for RaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RaceError::DimensionMismatch { expected, actual } => {
                write!(f, "Dimension mismatch: expected {}, got {}", expected, actual)
            }
            RaceError::InvalidParameter { name, reason } => {
                write!(f, "Invalid parameter '{}': {}", name, reason)
            }
            RaceError::Io(msg) => write!(f, "IO error: {}", msg),
            RaceError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            RaceError::Numerical(msg) => write!(f, "Numerical error: {}", msg),
            RaceError::EmptyBuffer(msg) => write!(f, "Empty buffer: {}", msg),
            RaceError::InvalidAction { action, max_actions } => {
                write!(f, "Invalid action {}: must be less than {}", action, max_actions)
            }
            RaceError::Training(msg) => write!(f, "Training error: {}", msg),
            RaceError::InvalidTrack(msg) => write!(f, "Invalid track: {}", msg),
            RaceError::TrainingInProgress => write!(f, "Training step already in progress"),
        }
    }
}

impl std::error::Error for RaceError {}

impl From<std::io::Error> for RaceError {
    fn from(err: std::io::Error) -> Self {
        RaceError::Io(err.to_string())
    }
}

impl From<bincode::Error> for RaceError {
    fn from(err: bincode::Error) -> Self {
        RaceError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for RaceError {
    fn from(err: serde_json::Error) -> Self {
        RaceError::Serialization(err.to_string())
    }
}

impl RaceError {
    pub fn dimension_mismatch<S: Into<String>>(expected: S, actual: S) -> Self {
        RaceError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn invalid_parameter<S: Into<String>>(name: S, reason: S) -> Self {
        RaceError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
