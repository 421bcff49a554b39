use thiserror::Error;

/// Main error type for record-mapping operations
#[derive(Debug, Error)]
pub enum Error {
    /// Structured error returned by the remote API
    #[error("API error {status}: {kind}: {message}")]
    Api {
        status: u16,
        kind: String,
        message: String,
    },

    /// Non-2xx response whose body could not be parsed as a structured error
    #[error("communication error {status}: {body}")]
    Communication { status: u16, body: String },

    /// Invalid field key or association argument supplied by the caller
    #[error("validation error: {0}")]
    Validation(String),

    /// create() called on a record that already has an id
    #[error("record already exists (record has an id)")]
    DuplicateCreate,

    /// destroy() called on a record that was never saved
    #[error("unable to destroy new record")]
    NewRecordDestroy,

    /// Association accessor used with a name no association was registered under
    #[error("unknown association: {name}")]
    UnknownAssociation { name: String },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport error
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing error
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl Error {
    /// Check if this error is a structured API error with the given type
    pub fn is_api_kind(&self, expected: &str) -> bool {
        matches!(self, Error::Api { kind, .. } if kind == expected)
    }

    /// Get the HTTP status code if this error came from a completed exchange
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Communication { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type for record-mapping operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_kind() {
        let error = Error::Api {
            status: 404,
            kind: "TABLE_NOT_FOUND".to_string(),
            message: "Could not find table".to_string(),
        };

        assert!(error.is_api_kind("TABLE_NOT_FOUND"));
        assert!(!error.is_api_kind("AUTHENTICATION_REQUIRED"));
        assert_eq!(error.status_code(), Some(404));
    }

    #[test]
    fn test_communication_error_status() {
        let error = Error::Communication {
            status: 500,
            body: String::new(),
        };

        assert_eq!(error.status_code(), Some(500));
    }

    #[test]
    fn test_local_errors_have_no_status() {
        assert_eq!(Error::DuplicateCreate.status_code(), None);
        assert_eq!(Error::NewRecordDestroy.status_code(), None);
    }
}
