//! Validation Error Types

use thiserror::Error;

/// Errors during input validation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Value out of allowed range
    #[error("{label} must be between {min} and {max}.")]
    OutOfRange {
        field: &'static str,
        label: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// Value is not one of the offered choices
    #[error("{field}: '{value}' is not a valid choice.")]
    InvalidChoice { field: &'static str, value: String },

    /// Value could not be parsed
    #[error("{field}: '{value}' is not a valid number.")]
    InvalidFormat { field: &'static str, value: String },

    /// Missing required field
    #[error("{0} is required.")]
    MissingField(&'static str),

    /// Value exceeds the allowed length
    #[error("{field} must be at most {max} characters.")]
    TooLong { field: &'static str, max: usize },

    /// Password confirmation differs
    #[error("Passwords must match.")]
    PasswordMismatch,
}

impl ValidationError {
    /// Name of the field the error belongs to
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::OutOfRange { field, .. }
            | ValidationError::InvalidChoice { field, .. }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::TooLong { field, .. } => *field,
            ValidationError::MissingField(field) => *field,
            ValidationError::PasswordMismatch => "confirm_password",
        }
    }
}
