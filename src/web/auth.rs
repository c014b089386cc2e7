//! Session resolution and account handlers: registration, login, logout.

use std::convert::Infallible;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Query, State},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;

use crate::db::DbError;
use crate::forms::{LoginForm, RegistrationForm};
use crate::models::{PasswordHash, User};
use crate::session;

use super::routes::AppState;
use super::{internal_error, views};

/// The user behind the current request, resolved once from the session
/// cookie and passed explicitly to handlers.
///
/// Resolution never fails: a missing cookie, a bad signature, an expired
/// token, or a deleted account all yield an anonymous request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::COOKIE)
            .and_then(|h| h.to_str().ok())
            .and_then(session::token_from_cookie_header);
        let Some(token) = token else {
            return Ok(Self(None));
        };
        let Some(user_id) = session::verify(token, &state.config.session_secret) else {
            return Ok(Self(None));
        };
        let user = state.db.user_by_id(user_id).await.ok().flatten();
        Ok(Self(user))
    }
}

/// Establish a session and redirect.
fn login_and_redirect(
    state: &AppState,
    user: &User,
    target: &str,
) -> Result<Response, (StatusCode, String)> {
    let token = session::issue(
        &state.config.session_secret,
        state.config.session_ttl_days,
        user,
    )
    .map_err(internal_error)?;
    Ok(([(header::SET_COOKIE, session::set_cookie(&token))], Redirect::to(target)).into_response())
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    next: Option<String>,
}

impl LoginQuery {
    /// Post-login destination. Only same-site paths are honored.
    fn target(&self) -> &str {
        match self.next.as_deref() {
            Some(next) if next.starts_with('/') && !next.starts_with("//") => next,
            _ => "/",
        }
    }
}

/// GET /login
pub async fn login_form() -> Response {
    views::login_page().into_response()
}

/// POST /login
///
/// An unknown username and a wrong password get the identical redirect, so
/// the response does not reveal which accounts exist.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LoginQuery>,
    Form(form): Form<LoginForm>,
) -> Result<Response, (StatusCode, String)> {
    let Some((username, password)) = form.credentials() else {
        return Ok(Redirect::to("/login").into_response());
    };

    let user = state
        .db
        .user_by_username(username)
        .await
        .map_err(internal_error)?;

    match user {
        Some(user) if user.password.check(password) => {
            tracing::info!(username, "user logged in");
            login_and_redirect(&state, &user, query.target())
        }
        _ => {
            tracing::debug!(username, "login rejected");
            Ok(Redirect::to("/login").into_response())
        }
    }
}

/// GET /logout
pub async fn logout() -> Response {
    ([(header::SET_COOKIE, session::clear_cookie())], Redirect::to("/")).into_response()
}

/// GET /registration
pub async fn registration_form() -> Response {
    views::registration_page(&RegistrationForm::default(), &[]).into_response()
}

/// POST /registration
pub async fn registration(
    State(state): State<Arc<AppState>>,
    Form(form): Form<RegistrationForm>,
) -> Result<Response, (StatusCode, String)> {
    let registration = match form.validate() {
        Ok(r) => r,
        Err(errors) => {
            return Ok(views::registration_page(&form, &errors).into_response());
        }
    };

    let hash = PasswordHash::new(&registration.password);
    match state.db.create_user(&registration.username, &hash).await {
        Ok(user) => {
            tracing::info!(username = %user.username, "user registered");
            login_and_redirect(&state, &user, "/")
        }
        // Taken username: send the visitor to the login page instead.
        Err(DbError::DuplicateUsername) => Ok(Redirect::to("/login").into_response()),
        Err(e) => Err(internal_error(e)),
    }
}
