use common::error::diagnostics::DiagnosticMessage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid request: {context}")]
    Validation { context: DiagnosticMessage },
    #[error("fetch already in flight: {context}")]
    AlreadyInFlight { context: DiagnosticMessage },
}

impl FetchError {
    #[track_caller]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn already_in_flight(vrm: impl Into<String>) -> Self {
        let vrm = vrm.into();
        Self::AlreadyInFlight {
            context: DiagnosticMessage::new(format!(
                "a lookup for '{vrm}' is already running; refusing to double-bill"
            )),
        }
    }
}
