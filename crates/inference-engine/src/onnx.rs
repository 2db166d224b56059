//! ONNX Classifier (tract)

use crate::classifier::{ClassifierOutput, Diagnosis, RiskClassifier};
use crate::InferenceError;
use feature_engine::{FeatureVector, FEATURE_DIMENSION};
use std::path::Path;
use tracing::{debug, info};
use tract_onnx::prelude::*;

type OnnxPlan = TypedRunnableModel<TypedModel>;

/// Classifier backed by an ONNX model.
///
/// The model takes a `[1, 13]` f32 input. The last element of its first output
/// is read as the positive-class probability, which covers both a single
/// sigmoid unit and a two-column softmax.
pub struct OnnxClassifier {
    plan: OnnxPlan,
    threshold: f64,
}

impl OnnxClassifier {
    /// Load and optimize a model from disk
    pub fn load(path: impl AsRef<Path>, threshold: f64) -> Result<Self, InferenceError> {
        let path = path.as_ref();
        info!("Loading ONNX model from {}", path.display());

        if !(threshold > 0.0 && threshold < 1.0) {
            return Err(InferenceError::ModelLoadError(format!(
                "threshold {threshold} outside (0, 1)"
            )));
        }

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| {
                model.with_input_fact(0, f32::fact([1, FEATURE_DIMENSION]).into())
            })
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|e| InferenceError::ModelLoadError(format!("{}: {e}", path.display())))?;

        info!("Model loaded successfully");
        Ok(Self { plan, threshold })
    }
}

impl RiskClassifier for OnnxClassifier {
    fn name(&self) -> &str {
        "onnx"
    }

    fn predict(&self, features: &FeatureVector) -> Result<ClassifierOutput, InferenceError> {
        let input = Tensor::from_shape(&[1, FEATURE_DIMENSION], &features.to_f32())
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;

        let first = outputs.first().ok_or_else(|| {
            InferenceError::InferenceFailed("model produced no output".to_string())
        })?;
        let view = first
            .to_array_view::<f32>()
            .map_err(|e| InferenceError::InferenceFailed(e.to_string()))?;
        let probability = view
            .iter()
            .last()
            .map(|p| *p as f64)
            .ok_or_else(|| InferenceError::InvalidInputShape {
                expected: "non-empty output".to_string(),
                actual: format!("{:?}", view.shape()),
            })?;

        debug!("ONNX output p={:.4}", probability);

        let diagnosis = if probability >= self.threshold {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_fails_to_load() {
        let result = OnnxClassifier::load("/nonexistent/heart.onnx", 0.5);
        assert!(matches!(result, Err(InferenceError::ModelLoadError(_))));
    }

    #[test]
    fn test_bad_threshold_rejected() {
        let result = OnnxClassifier::load("/nonexistent/heart.onnx", 0.0);
        assert!(matches!(
            result,
            Err(InferenceError::ModelLoadError(msg)) if msg.contains("threshold")
        ));
    }
}
