// ============================================================================
// Error Types
// ============================================================================

/// Failures of a scoring call or of configuration handling.
///
/// Missing predictions are never errors: an item that cannot be scored is
/// simply absent from the output.
#[derive(Debug)]
pub enum ScoringError {
    /// The rating source could not produce a user's rating vector.
    RatingSource(String),
    /// The similarity model could not produce a neighbor row.
    Model(String),
    /// Invalid configuration value.
    Config(String),
    Io(String),
    Serde(String),
}

impl std::fmt::Display for ScoringError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScoringError::RatingSource(e) => write!(f, "Rating source error: {}", e),
            ScoringError::Model(e) => write!(f, "Model error: {}", e),
            ScoringError::Config(e) => write!(f, "Config error: {}", e),
            ScoringError::Io(e) => write!(f, "IO error: {}", e),
            ScoringError::Serde(e) => write!(f, "Serde error: {}", e),
        }
    }
}

impl std::error::Error for ScoringError {}

impl From<std::io::Error> for ScoringError {
    fn from(e: std::io::Error) -> Self {
        ScoringError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for ScoringError {
    fn from(e: serde_json::Error) -> Self {
        ScoringError::Serde(e.to_string())
    }
}

pub type ScoringResult<T> = Result<T, ScoringError>;
