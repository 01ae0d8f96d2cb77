use common::error::diagnostics::DiagnosticMessage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog lookup failed: {context}")]
    NotFound { context: DiagnosticMessage },
}

impl CatalogError {
    #[track_caller]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            context: DiagnosticMessage::new(message.into()),
        }
    }
}
