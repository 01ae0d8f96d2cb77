pub mod diagnostics;

pub use crate::config::error::ConfigError;
pub use diagnostics::DiagnosticMessage;

use std::{error::Error as StdError, fmt::Debug};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CcdError {
    #[error("initialisation failed: {context}")]
    Init {
        context: DiagnosticMessage,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>, // inner cause
    },
    #[error("run failed: {context}")]
    Run {
        context: DiagnosticMessage,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
}

impl CcdError {
    #[track_caller]
    pub fn init<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        let message = err.to_string();
        CcdError::Init {
            context: DiagnosticMessage::new(message),
            source: Some(Box::new(err)),
        }
    }

    #[track_caller]
    pub fn init_msg(message: impl Into<String>) -> Self {
        CcdError::Init {
            context: DiagnosticMessage::new(message.into()),
            source: None,
        }
    }

    #[track_caller]
    pub fn run<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        let message = err.to_string();
        CcdError::Run {
            context: DiagnosticMessage::new(message),
            source: Some(Box::new(err)),
        }
    }

    #[track_caller]
    pub fn run_msg(message: impl Into<String>) -> Self {
        CcdError::Run {
            context: DiagnosticMessage::new(message.into()),
            source: None,
        }
    }
}
