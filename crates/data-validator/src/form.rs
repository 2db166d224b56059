//! Form Definitions and Validation

use crate::error::ValidationError;
use crate::validator::{ValidationResult, Validator};
use feature_engine::ClinicalInput;
use serde::{Deserialize, Serialize};

/// Sex choices (value, label)
pub const SEX_CHOICES: &[(&str, &str)] = &[("1", "Male"), ("0", "Female")];

/// Chest pain type choices
pub const CP_CHOICES: &[(&str, &str)] = &[
    ("1", "Typical Angina"),
    ("2", "Atypical Angina"),
    ("3", "Non-anginal Pain"),
    ("4", "Asymptomatic"),
];

/// Yes/no choices for fasting blood sugar and exercise angina
pub const YES_NO_CHOICES: &[(&str, &str)] = &[("1", "Yes"), ("0", "No")];

/// Resting ECG choices
pub const RESTECG_CHOICES: &[(&str, &str)] = &[
    ("0", "Normal"),
    ("1", "ST-T Wave Abnormality"),
    ("2", "Left Ventricular Hypertrophy"),
];

/// Maximum username length
pub const USERNAME_MAX_LEN: usize = 64;

const CLINICAL_FIELDS: usize = 10;

/// Submitted prediction form, every field as raw text
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClinicalForm {
    pub age: Option<String>,
    pub sex: Option<String>,
    pub cp: Option<String>,
    pub trestbps: Option<String>,
    pub chol: Option<String>,
    pub fbs: Option<String>,
    pub restecg: Option<String>,
    pub thalach: Option<String>,
    pub exang: Option<String>,
    pub oldpeak: Option<String>,
}

impl ClinicalForm {
    /// Validate every field and convert to clinical input.
    ///
    /// All problems are collected, not just the first one.
    pub fn validate(&self, validator: &Validator) -> Result<ClinicalInput, ValidationResult> {
        let mut errors = Vec::new();

        let age = required_integer("age", &self.age, &mut errors)
            .filter(|v| keep(validator.validate_age(*v as f64), &mut errors));
        let sex = required_choice("sex", &self.sex, SEX_CHOICES, &mut errors);
        let cp = required_code("cp", &self.cp, CP_CHOICES, &mut errors);
        let trestbps = required_integer("trestbps", &self.trestbps, &mut errors)
            .filter(|v| keep(validator.validate_blood_pressure(*v as f64), &mut errors));
        let chol = required_integer("chol", &self.chol, &mut errors)
            .filter(|v| keep(validator.validate_cholesterol(*v as f64), &mut errors));
        let fbs = required_choice("fbs", &self.fbs, YES_NO_CHOICES, &mut errors);
        let restecg = required_code("restecg", &self.restecg, RESTECG_CHOICES, &mut errors);
        let thalach = required_integer("thalach", &self.thalach, &mut errors)
            .filter(|v| keep(validator.validate_heart_rate(*v as f64), &mut errors));
        let exang = required_choice("exang", &self.exang, YES_NO_CHOICES, &mut errors);
        let oldpeak = required_float("oldpeak", &self.oldpeak, &mut errors)
            .filter(|v| keep(validator.validate_st_depression(*v), &mut errors));

        let (
            Some(age),
            Some(sex),
            Some(cp),
            Some(trestbps),
            Some(chol),
            Some(fbs),
            Some(restecg),
            Some(thalach),
            Some(exang),
            Some(oldpeak),
        ) = (age, sex, cp, trestbps, chol, fbs, restecg, thalach, exang, oldpeak)
        else {
            return Err(ValidationResult::invalid(errors, CLINICAL_FIELDS));
        };

        Ok(ClinicalInput {
            age,
            sex,
            cp,
            trestbps,
            chol,
            fbs,
            restecg,
            thalach,
            exang,
            oldpeak,
        })
    }
}

/// Login form
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl LoginForm {
    /// Check both fields are present
    pub fn validate(&self) -> Result<(String, String), ValidationResult> {
        let mut errors = Vec::new();
        let username = required_text("username", &self.username, &mut errors);
        let password = required_text("password", &self.password, &mut errors);

        match (username, password) {
            (Some(u), Some(p)) => Ok((u, p)),
            _ => Err(ValidationResult::invalid(errors, 2)),
        }
    }
}

/// Registration form
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationForm {
    pub username: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
}

impl RegistrationForm {
    /// Validate presence, username length and password confirmation
    pub fn validate(&self) -> Result<(String, String), ValidationResult> {
        let mut errors = Vec::new();
        let username = required_text("username", &self.username, &mut errors);
        let password = required_text("password", &self.password, &mut errors);
        let confirm = required_text("confirm_password", &self.confirm_password, &mut errors);

        if let Some(name) = &username {
            if name.chars().count() > USERNAME_MAX_LEN {
                errors.push(ValidationError::TooLong {
                    field: "username",
                    max: USERNAME_MAX_LEN,
                });
            }
        }

        if let (Some(p), Some(c)) = (&password, &confirm) {
            if p != c {
                errors.push(ValidationError::PasswordMismatch);
            }
        }

        match (username, password) {
            (Some(u), Some(p)) if errors.is_empty() => Ok((u, p)),
            _ => Err(ValidationResult::invalid(errors, 3)),
        }
    }
}

fn keep(check: Result<(), ValidationError>, errors: &mut Vec<ValidationError>) -> bool {
    match check {
        Ok(()) => true,
        Err(e) => {
            errors.push(e);
            false
        }
    }
}

fn present<'a>(
    field: &'static str,
    raw: &'a Option<String>,
    errors: &mut Vec<ValidationError>,
) -> Option<&'a str> {
    match raw.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Some(v),
        _ => {
            errors.push(ValidationError::MissingField(field));
            None
        }
    }
}

fn required_text(
    field: &'static str,
    raw: &Option<String>,
    errors: &mut Vec<ValidationError>,
) -> Option<String> {
    // Returned untrimmed; passwords may carry whitespace
    present(field, raw, errors)?;
    raw.clone()
}

fn required_integer(
    field: &'static str,
    raw: &Option<String>,
    errors: &mut Vec<ValidationError>,
) -> Option<i64> {
    let value = present(field, raw, errors)?;
    match value.parse::<i64>() {
        Ok(v) => Some(v),
        Err(_) => {
            errors.push(ValidationError::InvalidFormat {
                field,
                value: value.to_string(),
            });
            None
        }
    }
}

fn required_float(
    field: &'static str,
    raw: &Option<String>,
    errors: &mut Vec<ValidationError>,
) -> Option<f64> {
    let value = present(field, raw, errors)?;
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            errors.push(ValidationError::InvalidFormat {
                field,
                value: value.to_string(),
            });
            None
        }
    }
}

fn required_choice(
    field: &'static str,
    raw: &Option<String>,
    choices: &[(&str, &str)],
    errors: &mut Vec<ValidationError>,
) -> Option<String> {
    let value = present(field, raw, errors)?;
    if choices.iter().any(|(code, _)| *code == value) {
        Some(value.to_string())
    } else {
        errors.push(ValidationError::InvalidChoice {
            field,
            value: value.to_string(),
        });
        None
    }
}

/// A choice whose codes are numeric
fn required_code(
    field: &'static str,
    raw: &Option<String>,
    choices: &[(&str, &str)],
    errors: &mut Vec<ValidationError>,
) -> Option<i64> {
    let code = required_choice(field, raw, choices, errors)?;
    match code.parse::<i64>() {
        Ok(v) => Some(v),
        Err(_) => {
            errors.push(ValidationError::InvalidChoice { field, value: code });
            None
        }
    }
}
