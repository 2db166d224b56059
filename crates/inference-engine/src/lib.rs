//! Risk Inference Engine
//!
//! Runs a heart-disease classifier over a clinical feature vector and bands the
//! resulting probability into an ordinal risk level. Classifiers are pluggable:
//! a built-in logistic model, coefficients loaded from JSON, or an ONNX model
//! executed with tract.

mod classifier;
mod engine;
mod onnx;
mod risk;

pub use classifier::{
    ClassifierOutput, Diagnosis, LogisticClassifier, LogisticModel, RiskClassifier,
};
pub use engine::{InferenceEngine, InferenceResult, Prediction};
pub use onnx::OnnxClassifier;
pub use risk::RiskLevel;

use thiserror::Error;

/// Errors during inference
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("Model load failed: {0}")]
    ModelLoadError(String),
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    #[error("Invalid input shape: expected {expected}, got {actual}")]
    InvalidInputShape { expected: String, actual: String },
    #[error("Classifier returned an invalid probability: {0}")]
    InvalidOutput(f64),
}
