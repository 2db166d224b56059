//! Clinical Input Parsing

use crate::error::FeatureError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The ten clinical measurements collected from a user.
///
/// Flag fields (`sex`, `fbs`, `exang`) keep the text they were submitted with;
/// only the literal `"1"` counts as true when the feature vector is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalInput {
    /// Age in years
    pub age: i64,
    /// Sex code ("1" male, "0" female)
    pub sex: String,
    /// Chest pain type (1-4)
    pub cp: i64,
    /// Resting blood pressure (mm Hg)
    pub trestbps: i64,
    /// Serum cholesterol (mg/dl)
    pub chol: i64,
    /// Fasting blood sugar > 120 mg/dl ("1" yes)
    pub fbs: String,
    /// Resting ECG category (0-2)
    pub restecg: i64,
    /// Maximum heart rate achieved
    pub thalach: i64,
    /// Exercise induced angina ("1" yes)
    pub exang: String,
    /// ST depression induced by exercise
    pub oldpeak: f64,
}

impl Default for ClinicalInput {
    fn default() -> Self {
        Self {
            age: 0,
            sex: "0".to_string(),
            cp: 0,
            trestbps: 0,
            chol: 0,
            fbs: "0".to_string(),
            restecg: 0,
            thalach: 0,
            exang: "0".to_string(),
            oldpeak: 0.0,
        }
    }
}

/// Raw JSON body of a prediction request.
///
/// Every field is optional and may be a number or a string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiPayload {
    pub age: Option<Value>,
    pub sex: Option<Value>,
    pub cp: Option<Value>,
    pub trestbps: Option<Value>,
    pub chol: Option<Value>,
    pub fbs: Option<Value>,
    pub restecg: Option<Value>,
    pub thalach: Option<Value>,
    pub exang: Option<Value>,
    pub oldpeak: Option<Value>,
}

impl ClinicalInput {
    /// Build clinical input from a raw API payload.
    ///
    /// Missing fields default to zero (`"0"` for flags). No range checks happen here.
    pub fn from_api_payload(payload: &ApiPayload) -> Result<Self, FeatureError> {
        Ok(Self {
            age: parse_integer("age", payload.age.as_ref())?,
            sex: parse_flag(payload.sex.as_ref()),
            cp: parse_integer("cp", payload.cp.as_ref())?,
            trestbps: parse_integer("trestbps", payload.trestbps.as_ref())?,
            chol: parse_integer("chol", payload.chol.as_ref())?,
            fbs: parse_flag(payload.fbs.as_ref()),
            restecg: parse_integer("restecg", payload.restecg.as_ref())?,
            thalach: parse_integer("thalach", payload.thalach.as_ref())?,
            exang: parse_flag(payload.exang.as_ref()),
            oldpeak: parse_float("oldpeak", payload.oldpeak.as_ref())?,
        })
    }
}

fn parse_integer(field: &'static str, value: Option<&Value>) -> Result<i64, FeatureError> {
    match value {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            match n.as_f64() {
                Some(f) if in_i64_range(f) && f.fract() == 0.0 => Ok(f as i64),
                Some(f) if f.fract() == 0.0 => Err(FeatureError::MalformedField {
                    field,
                    value: n.to_string(),
                }),
                _ => Err(FeatureError::NotAnInteger {
                    field,
                    value: n.to_string(),
                }),
            }
        }
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                return Ok(i);
            }
            match trimmed.parse::<f64>() {
                Ok(f) if f.is_finite() => Err(FeatureError::NotAnInteger {
                    field,
                    value: s.clone(),
                }),
                _ => Err(FeatureError::MalformedField {
                    field,
                    value: s.clone(),
                }),
            }
        }
        Some(other) => Err(FeatureError::MalformedField {
            field,
            value: other.to_string(),
        }),
    }
}

fn parse_float(field: &'static str, value: Option<&Value>) -> Result<f64, FeatureError> {
    let parsed = match value {
        None | Some(Value::Null) => return Ok(0.0),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };

    match parsed {
        Some(f) if f.is_finite() => Ok(f),
        _ => Err(FeatureError::MalformedField {
            field,
            value: value.map(render).unwrap_or_default(),
        }),
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// `i64::MAX as f64` rounds up to 2^63, so the upper bound is exclusive.
fn in_i64_range(f: f64) -> bool {
    f >= i64::MIN as f64 && f < i64::MAX as f64
}

/// Flags keep submitted text. Anything that is not a JSON string is stored as `"0"`.
fn parse_flag(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        _ => "0".to_string(),
    }
}
