//! Feature Error Types

use thiserror::Error;

/// Errors while turning raw input into clinical values
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    /// Field present but not a usable number
    #[error("{field}: '{value}' is not a valid number")]
    MalformedField { field: &'static str, value: String },

    /// Integer field carried a fractional value
    #[error("{field}: '{value}' must be a whole number")]
    NotAnInteger { field: &'static str, value: String },
}
