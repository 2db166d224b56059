//! Data Validation
//!
//! Range checking for clinical measurements and validation of the prediction,
//! login and registration forms.

mod error;
mod form;
mod validator;

pub use error::ValidationError;
pub use form::{
    ClinicalForm, LoginForm, RegistrationForm, CP_CHOICES, RESTECG_CHOICES, SEX_CHOICES,
    USERNAME_MAX_LEN, YES_NO_CHOICES,
};
pub use validator::{ValidationConfig, ValidationResult, Validator};
