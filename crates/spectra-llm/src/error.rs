use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpectraError {
    #[error("Rate limit exceeded: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<u64>,
    },

    #[error("Provider overloaded: {0}")]
    Overloaded(String),

    #[error("Request too large: {0}")]
    RequestTooLarge(String),

    #[error("{message}")]
    Provider {
        status: Option<u16>,
        message: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid stream data: {0}")]
    InvalidStream(String),

    #[error("Failed to encode event data as JSON: {0}")]
    Encoding(String),

    #[error("{0}")]
    Other(String),
}

impl SpectraError {
    pub fn provider(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Provider {
            status,
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Stable classification used as the `error_type` of synthesized error events
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "rate_limited",
            Self::Overloaded(_) => "provider_overloaded",
            Self::RequestTooLarge(_) => "request_too_large",
            Self::Provider { .. } => "provider_error",
            Self::Http(_) => "http_error",
            Self::Json(_) => "json_error",
            Self::InvalidStream(_) => "invalid_stream",
            Self::Encoding(_) => "encoding_error",
            Self::Other(_) => "runtime_error",
        }
    }

    /// Whether a caller may retry the request that produced this error
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Overloaded(_) => true,
            Self::Provider { status, .. } => status.map_or(false, |code| code >= 500),
            Self::Http(err) => err.is_timeout() || err.is_connect(),
            _ => false,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::RateLimited { .. } => Some(429),
            Self::Overloaded(_) => Some(529),
            Self::RequestTooLarge(_) => Some(413),
            Self::Provider { status, .. } => *status,
            Self::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Map an HTTP error status and body into the matching variant
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            429 => Self::RateLimited {
                message,
                retry_after: None,
            },
            413 => Self::RequestTooLarge(message),
            503 | 529 => Self::Overloaded(message),
            _ => Self::Provider {
                status: Some(status),
                message,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, SpectraError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            SpectraError::from_status(429, "slow down"),
            SpectraError::RateLimited { .. }
        ));
        assert!(matches!(
            SpectraError::from_status(413, "too big"),
            SpectraError::RequestTooLarge(_)
        ));
        assert!(matches!(
            SpectraError::from_status(529, "busy"),
            SpectraError::Overloaded(_)
        ));

        let err = SpectraError::from_status(401, "bad key");
        assert_eq!(err.status_code(), Some(401));
        assert!(!err.is_recoverable());
        assert_eq!(err.to_string(), "bad key");
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(SpectraError::from_status(429, "x").is_recoverable());
        assert!(SpectraError::provider(Some(502), "bad gateway").is_recoverable());
        assert!(!SpectraError::other("boom").is_recoverable());
        assert_eq!(SpectraError::other("boom").error_type(), "runtime_error");
        assert_eq!(SpectraError::other("boom").to_string(), "boom");
    }
}
