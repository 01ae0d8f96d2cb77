use common::error::diagnostics::DiagnosticMessage;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderClientError {
    #[error("missing credentials: {context}")]
    MissingCredentials { context: DiagnosticMessage },
    #[error("connectivity error: {context}")]
    FailedToConnect { context: DiagnosticMessage },
    #[error("unexpected response: {context}")]
    UnexpectedStatus { context: DiagnosticMessage },
    #[error("malformed response body: {context}")]
    Decode { context: DiagnosticMessage },
}

impl ProviderClientError {
    #[track_caller]
    pub fn missing_credentials(message: impl Into<String>) -> Self {
        Self::MissingCredentials {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn failed_to_connect(message: impl Into<String>) -> Self {
        Self::FailedToConnect {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn unexpected_status(message: impl Into<String>) -> Self {
        Self::UnexpectedStatus {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            context: DiagnosticMessage::new(message.into()),
        }
    }
}

impl From<reqwest::Error> for ProviderClientError {
    #[track_caller]
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            ProviderClientError::failed_to_connect(err.to_string())
        } else if err.is_decode() {
            ProviderClientError::decode(err.to_string())
        } else if let Some(status) = err.status() {
            match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    ProviderClientError::missing_credentials(format!(
                        "provider rejected the API key: {}",
                        status
                    ))
                }
                _ => ProviderClientError::unexpected_status(format!(
                    "{} - status code {}",
                    err, status
                )),
            }
        } else {
            ProviderClientError::failed_to_connect(format!(
                "failed to reach the provider: {}",
                err
            ))
        }
    }
}
