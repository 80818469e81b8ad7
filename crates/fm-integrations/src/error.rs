use thiserror::Error;

/// Errors returned by external collaborators.
///
/// Every variant names the service that failed so retry and log messages
/// can say which integration misbehaved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrationError {
    /// The service could not be reached or timed out.
    #[error("{service} unavailable: {message}")]
    Unavailable { service: String, message: String },

    /// The service answered but refused the request (rate limit, conflict).
    #[error("{message}")]
    Rejected { service: String, message: String },

    /// The service answered with a payload that could not be interpreted.
    #[error("{service} returned malformed data: {message}")]
    Malformed { service: String, message: String },
}

impl IntegrationError {
    pub fn unavailable(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn rejected(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn malformed(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Malformed {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn service(&self) -> &str {
        match self {
            Self::Unavailable { service, .. }
            | Self::Rejected { service, .. }
            | Self::Malformed { service, .. } => service,
        }
    }
}

pub type Result<T> = std::result::Result<T, IntegrationError>;
