use thiserror::Error;

/// Errors raised while walking a page tree.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    /// Deliberate stop (redirects). Produces no output and is never reported.
    #[error("rendering terminated early")]
    EarlyTerminate,

    /// Any other failure inside a component.
    #[error("{0}")]
    Fault(String),
}

impl RenderError {
    pub fn fault(reason: impl Into<String>) -> Self {
        Self::Fault(reason.into())
    }
}
