//! Inference Engine Implementation

use crate::classifier::{Diagnosis, LogisticClassifier, LogisticModel, RiskClassifier};
use crate::onnx::OnnxClassifier;
use crate::risk::RiskLevel;
use crate::InferenceError;
use feature_engine::FeatureVector;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// Prediction result from inference
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Thresholded decision
    pub diagnosis: Diagnosis,
    /// Disease probability, clamped to [0, 1]
    pub probability: f64,
    /// Band of `probability`
    pub risk_level: RiskLevel,
}

impl Prediction {
    /// Probability as a percentage rounded to two decimals
    pub fn probability_percent(&self) -> f64 {
        (self.probability * 100.0 * 100.0).round() / 100.0
    }
}

/// Result of inference operation
#[derive(Debug, Clone)]
pub struct InferenceResult {
    /// The prediction
    pub prediction: Prediction,
    /// Inference latency in microseconds
    pub latency_us: u64,
}

/// Risk inference engine
pub struct InferenceEngine {
    classifier: Box<dyn RiskClassifier>,
}

impl InferenceEngine {
    /// Create an engine around any classifier
    pub fn new(classifier: Box<dyn RiskClassifier>) -> Self {
        info!("Creating inference engine with classifier: {}", classifier.name());
        Self { classifier }
    }

    /// Engine backed by the built-in logistic model
    pub fn builtin() -> Self {
        Self::new(Box::new(LogisticClassifier::builtin()))
    }

    /// Pick a classifier from a model path.
    ///
    /// No path uses the built-in model, `.json` loads logistic coefficients and
    /// `.onnx` loads an ONNX graph.
    pub fn from_model_path(path: Option<&str>, threshold: f64) -> Result<Self, InferenceError> {
        let Some(path) = path.filter(|p| !p.trim().is_empty()) else {
            return Ok(Self::new(Box::new(
                LogisticClassifier::builtin().with_threshold(threshold)?,
            )));
        };

        let extension = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        let classifier: Box<dyn RiskClassifier> = match extension.as_deref() {
            Some("json") => {
                let mut model = LogisticModel::from_path(path)?;
                model.threshold = threshold;
                Box::new(LogisticClassifier::new(model)?)
            }
            Some("onnx") => Box::new(OnnxClassifier::load(path, threshold)?),
            other => {
                warn!("Unsupported model format {:?} for {}", other, path);
                return Err(InferenceError::ModelLoadError(format!(
                    "unsupported model format: {path}"
                )));
            }
        };

        Ok(Self::new(classifier))
    }

    /// Run inference on a feature vector
    pub fn predict(&self, features: &FeatureVector) -> Result<InferenceResult, InferenceError> {
        let start = std::time::Instant::now();

        let output = self.classifier.predict(features)?;
        if !output.probability.is_finite() {
            return Err(InferenceError::InvalidOutput(output.probability));
        }

        let probability = output.probability.clamp(0.0, 1.0);
        if probability != output.probability {
            warn!(
                "Classifier {} returned p={} outside [0, 1], clamped",
                self.classifier.name(),
                output.probability
            );
        }

        let prediction = Prediction {
            diagnosis: output.diagnosis,
            probability,
            risk_level: RiskLevel::from_probability(probability),
        };

        let latency_us = start.elapsed().as_micros() as u64;
        debug!("Inference completed in {}us", latency_us);

        Ok(InferenceResult {
            prediction,
            latency_us,
        })
    }

    /// Name of the active classifier
    pub fn classifier_name(&self) -> &str {
        self.classifier.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::ClassifierOutput;

    struct FixedClassifier(f64);

    impl RiskClassifier for FixedClassifier {
        fn name(&self) -> &str {
            "fixed"
        }

        fn predict(&self, _features: &FeatureVector) -> Result<ClassifierOutput, InferenceError> {
            Ok(ClassifierOutput {
                diagnosis: Diagnosis::from_label((self.0 >= 0.5) as i64),
                probability: self.0,
            })
        }
    }

    fn example_features() -> FeatureVector {
        FeatureVector {
            values: [55.0, 1.0, 2.0, 130.0, 250.0, 0.0, 0.0, 150.0, 0.0, 1.5, 0.0, 0.0, 0.0],
        }
    }

    #[test]
    fn test_builtin_prediction() {
        let engine = InferenceEngine::builtin();
        let result = engine.predict(&example_features()).unwrap();

        assert_eq!(result.prediction.diagnosis, Diagnosis::Negative);
        assert_eq!(result.prediction.risk_level, RiskLevel::Moderate);
        assert_eq!(
            result.prediction.risk_level,
            RiskLevel::from_probability(result.prediction.probability)
        );
    }

    #[test]
    fn test_out_of_range_probability_clamped() {
        let engine = InferenceEngine::new(Box::new(FixedClassifier(1.2)));
        let result = engine.predict(&example_features()).unwrap();
        assert_eq!(result.prediction.probability, 1.0);
        assert_eq!(result.prediction.risk_level, RiskLevel::VeryHigh);
    }

    #[test]
    fn test_nan_probability_rejected() {
        let engine = InferenceEngine::new(Box::new(FixedClassifier(f64::NAN)));
        let err = engine.predict(&example_features()).unwrap_err();
        assert!(matches!(err, InferenceError::InvalidOutput(_)));
    }

    #[test]
    fn test_probability_percent_rounding() {
        let prediction = Prediction {
            diagnosis: Diagnosis::Negative,
            probability: 0.295_093,
            risk_level: RiskLevel::Moderate,
        };
        assert!((prediction.probability_percent() - 29.51).abs() < 1e-9);
    }

    #[test]
    fn test_model_path_selection() {
        let engine = InferenceEngine::from_model_path(None, 0.5).unwrap();
        assert_eq!(engine.classifier_name(), "logistic-builtin");

        let engine = InferenceEngine::from_model_path(Some("  "), 0.5).unwrap();
        assert_eq!(engine.classifier_name(), "logistic-builtin");

        assert!(InferenceEngine::from_model_path(Some("model.pkl"), 0.5).is_err());
        assert!(InferenceEngine::from_model_path(Some("/nonexistent/model.onnx"), 0.5).is_err());
    }
}
