//! Login, Registration and Logout

use axum::{
    extract::{rejection::FormRejection, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use chrono::Duration;
use data_validator::{LoginForm, RegistrationForm};
use metrics::counter;
use serde::Deserialize;
use std::sync::Arc;
use storage::StorageError;
use tracing::{info, warn};

use crate::auth::{
    clear_session_cookie, current_user, hash_password, safe_next, session_cookie, session_token,
    verify_password,
};
use crate::error::ApiError;
use crate::views::{self, Notice};
use crate::AppState;

/// Query string accepted by the login page
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    /// Where to go after signing in
    pub next: Option<String>,
    /// Set after a successful registration
    pub registered: Option<String>,
    /// Set after logging out
    pub logged_out: Option<String>,
}

impl LoginQuery {
    fn notices(&self) -> Vec<Notice<'static>> {
        let mut notices = Vec::new();
        if self.registered.is_some() {
            notices.push(Notice::Success("Registration successful! Please log in."));
        }
        if self.logged_out.is_some() {
            notices.push(Notice::Info("You have been logged out."));
        }
        if self.next.is_some() {
            notices.push(Notice::Warning("Please log in to access this page."));
        }
        notices
    }
}

fn form_body<T>(form: Result<Form<T>, FormRejection>) -> Result<T, ApiError> {
    form.map(|Form(value)| value)
        .map_err(|e| ApiError::BadRequest(format!("Invalid form submission: {}", e.body_text())))
}

pub async fn login_form(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<LoginQuery>,
) -> Result<Response, ApiError> {
    if current_user(&state, &headers).await?.is_some() {
        return Ok(Redirect::to("/home").into_response());
    }
    let next = safe_next(query.next.as_deref());
    Ok(Html(views::login_page(next, &query.notices(), None)).into_response())
}

/// Check credentials and open a session
pub async fn login_submit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<LoginQuery>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<Response, ApiError> {
    if current_user(&state, &headers).await?.is_some() {
        return Ok(Redirect::to("/home").into_response());
    }

    let form = form_body(form)?;
    let next = safe_next(query.next.as_deref());

    let (username, password) = match form.validate() {
        Ok(credentials) => credentials,
        Err(errors) => {
            let page = views::login_page(next, &[], Some(&errors));
            return Ok((StatusCode::BAD_REQUEST, Html(page)).into_response());
        }
    };

    let user = state.repository.find_user_by_username(&username).await?;
    let verified = match &user {
        Some(user) => verify_password(password, user.password_hash.clone()).await?,
        None => false,
    };

    let Some(user) = user.filter(|_| verified) else {
        counter!("heartwise_logins_total", "outcome" => "failure").increment(1);
        warn!("Failed login for username '{}'", username);
        let notices = [Notice::Danger("Invalid username or password.")];
        let page = views::login_page(next, &notices, None);
        return Ok((StatusCode::UNAUTHORIZED, Html(page)).into_response());
    };

    let ttl = Duration::hours(state.config.auth.session_ttl_hours);
    let session = state.repository.create_session(user.id, ttl).await?;
    counter!("heartwise_logins_total", "outcome" => "success").increment(1);
    info!("User {} logged in", user.id);

    let cookie = session_cookie(&session.token, &state.config.auth);
    let target = next.unwrap_or("/home");
    Ok(([(header::SET_COOKIE, cookie)], Redirect::to(target)).into_response())
}

pub async fn register_form(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if current_user(&state, &headers).await?.is_some() {
        return Ok(Redirect::to("/home").into_response());
    }
    Ok(Html(views::register_page(None, &[], None)).into_response())
}

/// Create an account, then send the user to the login page
pub async fn register_submit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    form: Result<Form<RegistrationForm>, FormRejection>,
) -> Result<Response, ApiError> {
    if current_user(&state, &headers).await?.is_some() {
        return Ok(Redirect::to("/home").into_response());
    }

    let form = form_body(form)?;
    let (username, password) = match form.validate() {
        Ok(credentials) => credentials,
        Err(errors) => {
            let page = views::register_page(form.username.as_deref(), &[], Some(&errors));
            return Ok((StatusCode::BAD_REQUEST, Html(page)).into_response());
        }
    };

    let password_hash = hash_password(state.password_params.clone(), password).await?;

    match state.repository.create_user(&username, &password_hash).await {
        Ok(user) => {
            counter!("heartwise_registrations_total").increment(1);
            info!("Registered user {} ({})", user.id, user.username);
            Ok(Redirect::to("/login?registered=1").into_response())
        }
        Err(StorageError::UsernameTaken(_)) => {
            let page = views::register_page(
                Some(&username),
                &[Notice::Danger("Username already exists. Please choose another.")],
                None,
            );
            Ok((StatusCode::CONFLICT, Html(page)).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// End the session, if any, and clear the cookie
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if let Some(token) = session_token(&headers) {
        state.repository.delete_session(&token).await?;
    }
    Ok((
        [(header::SET_COOKIE, clear_session_cookie())],
        Redirect::to("/login?logged_out=1"),
    )
        .into_response())
}
