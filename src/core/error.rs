use thiserror::Error;

/// Errors raised by the matching core
///
/// Attribute-level problems never surface here: scoring functions absorb
/// them into neutral defaults. Only structural problems and missing
/// prerequisites propagate to the caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MatchError {
    /// Malformed or missing structure in an input batch or record
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation invoked before a required prior step
    #[error("State error: {0}")]
    State(String),
}

impl MatchError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    pub fn is_state(&self) -> bool {
        matches!(self, Self::State(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, MatchError>;
