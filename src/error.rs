use thiserror::Error;

/// Failure taxonomy of the meal pipeline. Only `Dependency` and `Sync`
/// ever escape to a caller; the rest are logged where they happen.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unparseable meal extraction: {0}")]
    Parse(String),

    #[error("mention dropped by validation: {0}")]
    ValidationDrop(String),

    #[error("no nutrition data for {0:?}")]
    ResolutionMiss(String),

    #[error("{service} request failed: {message}")]
    Dependency {
        service: &'static str,
        message: String,
    },

    #[error("sync failed: {0}")]
    Sync(String),
}

impl PipelineError {
    pub fn dependency(service: &'static str, message: impl Into<String>) -> Self {
        Self::Dependency {
            service,
            message: message.into(),
        }
    }
}
