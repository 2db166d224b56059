//! Risk Classifiers

use crate::InferenceError;
use feature_engine::{FeatureVector, FEATURE_DIMENSION};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Binary classifier decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Diagnosis {
    /// No heart disease indicated
    Negative,
    /// Heart disease indicated
    Positive,
}

impl Diagnosis {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Diagnosis::Negative => "Negative",
            Diagnosis::Positive => "Positive",
        }
    }

    /// Numeric label (0 or 1)
    pub fn label(&self) -> i64 {
        match self {
            Diagnosis::Negative => 0,
            Diagnosis::Positive => 1,
        }
    }

    /// Decode a numeric label; anything but 1 is negative
    pub fn from_label(label: i64) -> Self {
        if label == 1 {
            Diagnosis::Positive
        } else {
            Diagnosis::Negative
        }
    }
}

/// Raw classifier output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierOutput {
    /// Thresholded decision
    pub diagnosis: Diagnosis,
    /// Confidence that disease is present
    pub probability: f64,
}

/// A heart-disease classifier.
///
/// Implementations must be deterministic and free of side effects so one
/// instance can serve concurrent requests without locking.
pub trait RiskClassifier: Send + Sync {
    /// Short name for logs and health output
    fn name(&self) -> &str;

    /// Classify one feature vector
    fn predict(&self, features: &FeatureVector) -> Result<ClassifierOutput, InferenceError>;
}

// Standardized logistic regression fitted on the 13-column Cleveland layout.
// Slope, CA and Thal carry zero weight since the form never collects them.
const BUILTIN_INTERCEPT: f64 = -0.1;
const BUILTIN_COEFFICIENTS: [f64; FEATURE_DIMENSION] = [
    0.15, 0.60, 0.75, 0.30, 0.20, -0.05, 0.20, -0.55, 0.45, 0.60, 0.0, 0.0, 0.0,
];
const BUILTIN_MEANS: [f64; FEATURE_DIMENSION] = [
    54.4, 0.68, 3.16, 131.7, 246.7, 0.15, 0.99, 149.6, 0.33, 1.04, 1.6, 0.67, 4.73,
];
const BUILTIN_SCALES: [f64; FEATURE_DIMENSION] = [
    9.0, 0.47, 0.96, 17.6, 51.8, 0.36, 0.99, 22.9, 0.47, 1.16, 0.62, 0.94, 1.94,
];

fn default_threshold() -> f64 {
    0.5
}

/// Coefficients of a standardized logistic regression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    /// Bias term
    pub intercept: f64,
    /// One weight per feature
    pub coefficients: Vec<f64>,
    /// Per-feature means used for standardization
    pub means: Vec<f64>,
    /// Per-feature standard deviations used for standardization
    pub scales: Vec<f64>,
    /// Probability at or above which the diagnosis is positive
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl LogisticModel {
    /// The model compiled into the binary
    pub fn builtin() -> Self {
        Self {
            intercept: BUILTIN_INTERCEPT,
            coefficients: BUILTIN_COEFFICIENTS.to_vec(),
            means: BUILTIN_MEANS.to_vec(),
            scales: BUILTIN_SCALES.to_vec(),
            threshold: default_threshold(),
        }
    }

    /// Parse coefficients from JSON
    pub fn from_json_str(json: &str) -> Result<Self, InferenceError> {
        let model: Self = serde_json::from_str(json)
            .map_err(|e| InferenceError::ModelLoadError(format!("Invalid model JSON: {e}")))?;
        model.check()?;
        Ok(model)
    }

    /// Load coefficients from a JSON file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, InferenceError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            InferenceError::ModelLoadError(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }

    fn check(&self) -> Result<(), InferenceError> {
        for (name, len) in [
            ("coefficients", self.coefficients.len()),
            ("means", self.means.len()),
            ("scales", self.scales.len()),
        ] {
            if len != FEATURE_DIMENSION {
                return Err(InferenceError::InvalidInputShape {
                    expected: format!("{FEATURE_DIMENSION} {name}"),
                    actual: len.to_string(),
                });
            }
        }

        if self.scales.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(InferenceError::ModelLoadError(
                "scales must be finite and positive".to_string(),
            ));
        }

        let all_finite = std::iter::once(&self.intercept)
            .chain(&self.coefficients)
            .chain(&self.means)
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(InferenceError::ModelLoadError(
                "model parameters must be finite".to_string(),
            ));
        }

        if !(self.threshold > 0.0 && self.threshold < 1.0) {
            return Err(InferenceError::ModelLoadError(format!(
                "threshold {} outside (0, 1)",
                self.threshold
            )));
        }

        Ok(())
    }

    /// Linear score before the sigmoid
    fn logit(&self, features: &FeatureVector) -> f64 {
        features
            .values
            .iter()
            .zip(&self.coefficients)
            .zip(self.means.iter().zip(&self.scales))
            .map(|((x, w), (mean, scale))| w * (x - mean) / scale)
            .sum::<f64>()
            + self.intercept
    }
}

/// Logistic regression classifier
pub struct LogisticClassifier {
    model: LogisticModel,
    name: String,
}

impl LogisticClassifier {
    /// Create a classifier from validated coefficients
    pub fn new(model: LogisticModel) -> Result<Self, InferenceError> {
        model.check()?;
        info!("Creating logistic classifier (threshold={})", model.threshold);
        Ok(Self {
            model,
            name: "logistic".to_string(),
        })
    }

    /// Classifier backed by the built-in coefficients
    pub fn builtin() -> Self {
        Self {
            model: LogisticModel::builtin(),
            name: "logistic-builtin".to_string(),
        }
    }

    /// Override the decision threshold
    pub fn with_threshold(mut self, threshold: f64) -> Result<Self, InferenceError> {
        self.model.threshold = threshold;
        self.model.check()?;
        Ok(self)
    }
}

impl RiskClassifier for LogisticClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, features: &FeatureVector) -> Result<ClassifierOutput, InferenceError> {
        let logit = self.model.logit(features);
        let probability = 1.0 / (1.0 + (-logit).exp());
        debug!("Logistic score {:.4} -> p={:.4}", logit, probability);

        let diagnosis = if probability >= self.model.threshold {
            Diagnosis::Positive
        } else {
            Diagnosis::Negative
        };

        Ok(ClassifierOutput {
            diagnosis,
            probability,
        })
    }
}
