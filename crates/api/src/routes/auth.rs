//! Authentication route handlers.
//!
//! Tokens are stateless: logout only clears the Sentry user context and
//! the client is expected to discard its token.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use super::{ApiJson, Message};
use crate::error::{Result, clear_sentry_user};
use crate::middleware::RequireAuth;
use crate::models::UserProfile;
use crate::services::auth::Session;
use crate::state::AppState;

/// Registration request body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// A signed-in user and their bearer token.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserProfile,
    pub token: String,
    pub message: &'static str,
}

impl AuthResponse {
    fn new(session: Session, message: &'static str) -> Self {
        Self {
            user: session.user.profile(),
            token: session.token,
            message,
        }
    }
}

/// Handle registration.
pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<Json<AuthResponse>> {
    let session = state
        .auth()
        .register(&body.name, &body.email, &body.password)
        .await?;
    Ok(Json(AuthResponse::new(session, "User registered successfully")))
}

/// Handle password login.
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    let session = state.auth().login(&body.email, &body.password).await?;
    Ok(Json(AuthResponse::new(session, "Logged in successfully")))
}

/// Handle logout.
pub async fn logout(RequireAuth(user_id): RequireAuth) -> Json<Message> {
    tracing::info!(user_id = %user_id, "User logged out");
    clear_sentry_user();
    Json(Message::new("Logged out successfully"))
}

/// The authenticated user's profile.
pub async fn me(
    State(state): State<AppState>,
    RequireAuth(user_id): RequireAuth,
) -> Result<Json<UserProfile>> {
    let user = state.auth().get_user(&user_id).await?;
    Ok(Json(user.profile()))
}
