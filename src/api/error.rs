//! Simulated backend error types.

/// Errors the simulated backend can return.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Login rejected
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Stored token no longer accepted
    #[error("Session token is invalid or expired")]
    InvalidToken,

    /// Failure injected for an endpoint
    #[error("Failed to {endpoint}")]
    Simulated { endpoint: String },

    /// Caller lost interest before the response arrived
    #[error("Request cancelled")]
    Cancelled,

    /// Generic backend error
    #[error("Backend error: {0}")]
    Other(String),
}

impl ApiError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let error = ApiError::InvalidCredentials;
        assert!(error.to_string().contains("Invalid email or password"));

        let error = ApiError::InvalidToken;
        assert!(error.to_string().contains("expired"));

        let error = ApiError::Simulated {
            endpoint: "fetch todos".to_string(),
        };
        assert_eq!(error.to_string(), "Failed to fetch todos");

        let error = ApiError::Other("Test error".to_string());
        assert!(error.to_string().contains("Backend error"));
    }

    #[test]
    fn test_is_cancelled() {
        assert!(ApiError::Cancelled.is_cancelled());
        assert!(!ApiError::InvalidToken.is_cancelled());
    }
}
