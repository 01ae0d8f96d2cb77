use common::error::diagnostics::DiagnosticMessage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VisibilityError {
    #[error("visibility storage failed: {context}")]
    Storage { context: DiagnosticMessage },
}

impl VisibilityError {
    #[track_caller]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            context: DiagnosticMessage::new(message.into()),
        }
    }
}
