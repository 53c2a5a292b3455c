use thiserror::Error;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("API request failed: {0}")]
    ApiRequestFailed(#[from] reqwest::Error),

    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Provider error {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("Rate limited (429): {0}")]
    RateLimited(String),

    #[error("Invalid response from provider: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl GenerationError {
    pub fn is_rate_limit(&self) -> bool {
        match self {
            GenerationError::RateLimited(_) => true,
            GenerationError::Provider { status, .. } => *status == 429,
            GenerationError::ApiRequestFailed(e) => {
                e.status().map(|s| s.as_u16() == 429).unwrap_or(false)
            }
            _ => false,
        }
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            GenerationError::Timeout(_) => true,
            GenerationError::ApiRequestFailed(e) => e.is_timeout(),
            _ => false,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            GenerationError::Provider { status, .. } => Some(*status),
            GenerationError::ApiRequestFailed(e) => e.status().map(|s| s.as_u16()),
            GenerationError::RateLimited(_) => Some(429),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for GenerationError {
    fn from(e: serde_json::Error) -> Self {
        GenerationError::InvalidResponse(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_classification() {
        let err = GenerationError::Provider {
            status: 429,
            message: "quota".to_string(),
        };
        assert!(err.is_rate_limit());
        assert_eq!(err.status_code(), Some(429));

        let err = GenerationError::Timeout(30);
        assert!(err.is_timeout());
        assert!(!err.is_rate_limit());
        assert_eq!(err.status_code(), None);
        assert_eq!(err.to_string(), "Request timed out after 30s");
    }
}
