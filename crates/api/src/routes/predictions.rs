//! Prediction Routes

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    Extension, Json,
};
use feature_engine::{ApiPayload, ClinicalInput};
use inference_engine::RiskLevel;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::assessment::{assess, AssessmentResponse};
use crate::auth::AuthContext;
use crate::error::ApiError;
use crate::AppState;
use storage::PredictionRecord;

const MAX_LIMIT: usize = 500;

/// Score a JSON payload and store the result for the caller
pub async fn api_predict(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthContext>,
    payload: Result<Json<ApiPayload>, JsonRejection>,
) -> Result<Json<AssessmentResponse>, ApiError> {
    let Json(payload) = payload.map_err(|e| {
        ApiError::BadRequest(format!("Invalid request body: {}", e.body_text()))
    })?;

    let input = ClinicalInput::from_api_payload(&payload)?;

    if state.config.validation.enforce_api_ranges {
        let result = state.validator.validate_input(&input);
        if !result.valid {
            return Err(ApiError::Validation(result));
        }
    }

    let prediction = assess(&state, &user, input).await?;
    Ok(Json(AssessmentResponse::from(&prediction)))
}

/// Query parameters for the history endpoint
#[derive(Debug, Deserialize)]
pub struct PredictionQuery {
    /// Filter by risk level, e.g. "High Risk"
    pub risk_level: Option<String>,
    /// Maximum number of records
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

/// Response for the history endpoint
#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub data: Vec<PredictionRecord>,
    pub count: usize,
}

/// The caller's predictions, newest first
pub async fn get_predictions(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthContext>,
    params: Result<Query<PredictionQuery>, QueryRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let Query(params) =
        params.map_err(|e| ApiError::BadRequest(format!("Invalid query: {}", e.body_text())))?;
    let limit = params.limit.min(MAX_LIMIT);

    let risk_level = params
        .risk_level
        .as_deref()
        .map(|level| {
            level
                .parse::<RiskLevel>()
                .map_err(|_| ApiError::BadRequest(format!("Unknown risk level: {level}")))
        })
        .transpose()?;

    let data = state
        .repository
        .recent_predictions(user.user_id, risk_level.map(|l| l.as_str()), limit)
        .await?;
    debug!("Returning {} predictions for user {}", data.len(), user.user_id);

    Ok(Json(PredictionResponse {
        count: data.len(),
        data,
    }))
}
