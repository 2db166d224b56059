//! HTML Page Routes

use axum::{
    extract::{rejection::FormRejection, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Extension, Form,
};
use data_validator::{ClinicalForm, ValidationResult};
use inference_engine::Prediction;
use std::sync::Arc;
use tracing::{error, warn};

use crate::assessment::assess;
use crate::auth::{current_user, AuthContext};
use crate::error::ApiError;
use crate::views::{self, Notice, PredictionPage};
use crate::AppState;

/// Previous assessments shown under the form
const HISTORY_LIMIT: usize = 5;

/// `/` sends signed-in users home and everyone else to the login page
pub async fn index(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Redirect, ApiError> {
    let target = match current_user(&state, &headers).await? {
        Some(_) => "/home",
        None => "/login",
    };
    Ok(Redirect::to(target))
}

pub async fn home(Extension(user): Extension<AuthContext>) -> Html<String> {
    Html(views::home_page(&user.username, &[]))
}

/// Empty assessment form with recent history
pub async fn prediction_form(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthContext>,
) -> Result<Response, ApiError> {
    render_prediction(
        &state,
        &user,
        &ClinicalForm::default(),
        None,
        None,
        None,
        StatusCode::OK,
    )
    .await
}

/// Validate the submitted form, score it and show the result
pub async fn prediction_submit(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthContext>,
    form: Result<Form<ClinicalForm>, FormRejection>,
) -> Result<Response, ApiError> {
    let Form(form) = form.map_err(|e| {
        ApiError::BadRequest(format!("Invalid form submission: {}", e.body_text()))
    })?;

    let input = match form.validate(&state.validator) {
        Ok(input) => input,
        Err(errors) => {
            warn!("Prediction form rejected for user {}: {}", user.user_id, errors.summary());
            return render_prediction(
                &state,
                &user,
                &form,
                Some(&errors),
                None,
                None,
                StatusCode::BAD_REQUEST,
            )
            .await;
        }
    };

    match assess(&state, &user, input).await {
        Ok(prediction) => {
            render_prediction(
                &state,
                &user,
                &ClinicalForm::default(),
                None,
                Some(&prediction),
                None,
                StatusCode::OK,
            )
            .await
        }
        Err(e) => {
            error!("Form prediction failed for user {}: {}", user.user_id, e);
            let message = e.public_message();
            render_prediction(
                &state,
                &user,
                &form,
                None,
                None,
                Some(Notice::Danger(&message)),
                e.status(),
            )
            .await
        }
    }
}

async fn render_prediction(
    state: &AppState,
    user: &AuthContext,
    form: &ClinicalForm,
    errors: Option<&ValidationResult>,
    result: Option<&Prediction>,
    notice: Option<Notice<'_>>,
    status: StatusCode,
) -> Result<Response, ApiError> {
    let history = state
        .repository
        .recent_predictions(user.user_id, None, HISTORY_LIMIT)
        .await?;
    let notices: Vec<Notice<'_>> = notice.into_iter().collect();

    let page = PredictionPage {
        username: &user.username,
        form,
        errors,
        result,
        history: &history,
        notices: &notices,
    };

    Ok((status, Html(page.render())).into_response())
}
