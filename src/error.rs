use thiserror::Error;

/// Failures surfaced by the advisor core.
///
/// Every failure either resolves to a documented fallback (degraded mode)
/// or reaches the caller as one of these.
#[derive(Debug, Error)]
pub enum AdvisorError {
    /// Malformed input: value outside a vocabulary, GPA off the scale, etc.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The rule source could not be loaded. Fatal at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rule evaluation failed or timed out.
    #[error("Rule evaluation failed: {0}")]
    Computation(String),

    #[error("Persistence error: {0:#}")]
    Persistence(anyhow::Error),
}

impl AdvisorError {
    pub fn student_not_found(student_id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("Student {student_id} not found"))
    }
}
