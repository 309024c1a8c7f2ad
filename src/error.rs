use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("Ledger error: {0}")]
    Ledger(String),
    #[error("Registry error: {0}")]
    Registry(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Database error: {0}")]
    Database(String),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Error: {0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ClaimError>;

#[cfg(feature = "distributed")]
impl From<reqwest::Error> for ClaimError {
    fn from(err: reqwest::Error) -> Self {
        ClaimError::Http(err.to_string())
    }
}

#[cfg(feature = "distributed")]
impl From<postgres::Error> for ClaimError {
    fn from(err: postgres::Error) -> Self {
        ClaimError::Database(err.to_string())
    }
}

impl From<String> for ClaimError {
    fn from(err: String) -> Self {
        ClaimError::Other(err)
    }
}

impl From<&str> for ClaimError {
    fn from(err: &str) -> Self {
        ClaimError::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_context() {
        let err = ClaimError::Ledger("claim rejected for subject abc".to_string());
        assert_eq!(err.to_string(), "Ledger error: claim rejected for subject abc");
    }

    #[test]
    fn test_malformed_payload_is_serialization_error() {
        fn decode(body: &str) -> Result<Vec<crate::Certificate>> {
            Ok(serde_json::from_str(body)?)
        }
        let err = decode(r#"[{"gridArea": 7}]"#).unwrap_err();
        assert!(matches!(err, ClaimError::Serialization(_)));
    }

    #[test]
    fn test_from_str_is_other() {
        let err: ClaimError = "boom".into();
        assert!(matches!(err, ClaimError::Other(ref m) if m == "boom"));
    }
}
