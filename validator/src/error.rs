//! Configuration errors raised by the validation engine
//!
//! Validation *failures* are never returned through these types: they are
//! recorded on the request's aggregator. A `ValidatorError` means the caller
//! asked for something the configured libraries cannot do.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidatorError {
    #[error("Unknown validator: {0}")]
    UnknownValidator(String),
    #[error("Unknown sanitizer: {0}")]
    UnknownSanitizer(String),
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
}

pub type Result<T> = std::result::Result<T, ValidatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ValidatorError::UnknownValidator("isWidget".into()).to_string(),
            "Unknown validator: isWidget"
        );
        assert_eq!(
            ValidatorError::InvalidSchema("schema must be an object".into()).to_string(),
            "Invalid schema: schema must be an object"
        );
    }
}
