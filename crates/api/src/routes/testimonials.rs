//! Testimonial route handlers.

use axum::{Json, extract::State};

use crate::error::Result;
use crate::models::Testimonial;
use crate::state::AppState;

/// Active testimonials, newest first.
pub async fn index(State(state): State<AppState>) -> Result<Json<Vec<Testimonial>>> {
    Ok(Json(state.store().list_active_testimonials().await?))
}
