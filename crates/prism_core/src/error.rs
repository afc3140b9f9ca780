use thiserror::Error;

/// Errors raised by the performance context.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("capabilities were already published for this context")]
    AlreadyPublished,

    #[error("'{consumer}' was constructed outside an initialized performance context")]
    Unwired { consumer: String },
}

/// Errors raised by the visibility gate.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum VisibilityError {
    #[error("visibility threshold {threshold} is outside (0, 1]")]
    InvalidThreshold { threshold: f32 },
}
