//! Data Validator for Range Checking

use crate::error::ValidationError;
use feature_engine::ClinicalInput;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Age valid range (years)
    pub age_range: (f64, f64),
    /// Resting blood pressure valid range (mm Hg)
    pub blood_pressure_range: (f64, f64),
    /// Serum cholesterol valid range (mg/dl)
    pub cholesterol_range: (f64, f64),
    /// Maximum heart rate valid range (bpm)
    pub heart_rate_range: (f64, f64),
    /// ST depression valid range
    pub st_depression_range: (f64, f64),
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            age_range: (18.0, 100.0),
            blood_pressure_range: (80.0, 200.0),
            cholesterol_range: (100.0, 600.0),
            heart_rate_range: (60.0, 220.0),
            st_depression_range: (0.0, 10.0),
        }
    }
}

/// Result of validation
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether all values are valid
    pub valid: bool,
    /// List of validation errors
    pub errors: Vec<ValidationError>,
    /// Number of fields validated
    pub fields_checked: usize,
}

impl ValidationResult {
    /// Create a valid result
    pub fn valid(fields_checked: usize) -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            fields_checked,
        }
    }

    /// Create an invalid result with errors
    pub fn invalid(errors: Vec<ValidationError>, fields_checked: usize) -> Self {
        Self {
            valid: false,
            errors,
            fields_checked,
        }
    }

    /// Build a result from collected errors
    pub fn from_errors(errors: Vec<ValidationError>, fields_checked: usize) -> Self {
        if errors.is_empty() {
            Self::valid(fields_checked)
        } else {
            Self::invalid(errors, fields_checked)
        }
    }

    /// Errors attached to one field
    pub fn errors_for(&self, field: &str) -> Vec<&ValidationError> {
        self.errors.iter().filter(|e| e.field() == field).collect()
    }

    /// All error messages joined into one line
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Range validator for clinical measurements
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    /// Create a new validator with given config
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate a single value against a range
    pub fn validate_range(
        &self,
        field: &'static str,
        label: &'static str,
        value: f64,
        range: (f64, f64),
    ) -> Result<(), ValidationError> {
        if value < range.0 || value > range.1 || value.is_nan() {
            Err(ValidationError::OutOfRange {
                field,
                label,
                value,
                min: range.0,
                max: range.1,
            })
        } else {
            Ok(())
        }
    }

    /// Validate age
    pub fn validate_age(&self, age: f64) -> Result<(), ValidationError> {
        self.validate_range("age", "Age", age, self.config.age_range)
    }

    /// Validate resting blood pressure
    pub fn validate_blood_pressure(&self, bp: f64) -> Result<(), ValidationError> {
        self.validate_range("trestbps", "Blood pressure", bp, self.config.blood_pressure_range)
    }

    /// Validate serum cholesterol
    pub fn validate_cholesterol(&self, chol: f64) -> Result<(), ValidationError> {
        self.validate_range("chol", "Cholesterol", chol, self.config.cholesterol_range)
    }

    /// Validate maximum heart rate
    pub fn validate_heart_rate(&self, rate: f64) -> Result<(), ValidationError> {
        self.validate_range("thalach", "Heart rate", rate, self.config.heart_rate_range)
    }

    /// Validate ST depression
    pub fn validate_st_depression(&self, oldpeak: f64) -> Result<(), ValidationError> {
        self.validate_range("oldpeak", "ST depression", oldpeak, self.config.st_depression_range)
    }

    /// Apply every numeric range check to already-parsed input
    pub fn validate_input(&self, input: &ClinicalInput) -> ValidationResult {
        let checks = [
            self.validate_age(input.age as f64),
            self.validate_blood_pressure(input.trestbps as f64),
            self.validate_cholesterol(input.chol as f64),
            self.validate_heart_rate(input.thalach as f64),
            self.validate_st_depression(input.oldpeak),
        ];
        let fields_checked = checks.len();

        let errors: Vec<_> = checks.into_iter().filter_map(Result::err).collect();
        if !errors.is_empty() {
            debug!("Range validation failed: {:?}", errors);
        }

        ValidationResult::from_errors(errors, fields_checked)
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}
