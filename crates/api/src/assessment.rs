//! Risk Assessment Pipeline
//!
//! Shared by the JSON API and the prediction form: build the feature vector,
//! classify, band, then persist the record for the caller.

use feature_engine::{ClinicalInput, FeatureVector};
use inference_engine::Prediction;
use metrics::{counter, histogram};
use serde::Serialize;
use storage::NewPrediction;
use tracing::{error, info};

use crate::auth::AuthContext;
use crate::error::ApiError;
use crate::AppState;

/// JSON shape of a successful assessment
#[derive(Debug, Serialize)]
pub struct AssessmentResponse {
    pub success: bool,
    /// "Positive" or "Negative"
    pub prediction: &'static str,
    /// Percentage, two decimals
    pub probability: f64,
    pub risk_level: &'static str,
}

impl From<&Prediction> for AssessmentResponse {
    fn from(prediction: &Prediction) -> Self {
        Self {
            success: true,
            prediction: prediction.diagnosis.as_str(),
            probability: prediction.probability_percent(),
            risk_level: prediction.risk_level.as_str(),
        }
    }
}

/// Score `input` for `user` and store the result.
///
/// Nothing is written when the classifier fails. The record is inserted in a
/// single statement, so a stored record always carries its full result.
pub async fn assess(
    state: &AppState,
    user: &AuthContext,
    input: ClinicalInput,
) -> Result<Prediction, ApiError> {
    let features = FeatureVector::from_input(&input);

    let result = state.engine.predict(&features).map_err(|e| {
        counter!("heartwise_prediction_failures_total", "stage" => "inference").increment(1);
        error!("Prediction failed for user {}: {}", user.user_id, e);
        e
    })?;
    histogram!("heartwise_inference_latency_seconds")
        .record(result.latency_us as f64 / 1_000_000.0);

    let prediction = result.prediction;
    let record = NewPrediction {
        user_id: user.user_id,
        input,
        prediction_result: prediction.diagnosis.label(),
        probability: prediction.probability,
        risk_level: prediction.risk_level.as_str().to_string(),
    };

    let record_id = state.repository.insert_prediction(&record).await.map_err(|e| {
        counter!("heartwise_prediction_failures_total", "stage" => "storage").increment(1);
        e
    })?;

    counter!("heartwise_predictions_total", "risk_level" => prediction.risk_level.as_str())
        .increment(1);
    info!(
        "Stored prediction {} for user {}: {} ({:.4}, {})",
        record_id,
        user.user_id,
        prediction.diagnosis.as_str(),
        prediction.probability,
        prediction.risk_level
    );

    Ok(prediction)
}
