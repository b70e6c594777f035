//! Demo pages behind the access chain.

use axum::Extension;
use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::context::{ANONYMOUS, RequestContext};
use crate::error::{AppError, AppResult};
use crate::models::WhoAmIResponse;

/// `GET /` and `GET /home`.
pub async fn home(ctx: Option<Extension<RequestContext>>) -> String {
    let actor = ctx
        .as_ref()
        .map(|Extension(ctx)| ctx.actor())
        .unwrap_or(ANONYMOUS);
    format!("Welcome, {actor}.")
}

/// `GET /whoami`: the caller as the pipeline resolved it.
pub async fn whoami(ctx: Option<Extension<RequestContext>>) -> AppResult<Json<WhoAmIResponse>> {
    let Extension(ctx) = ctx.ok_or_else(|| {
        AppError::Internal("request context missing; route is not behind the chain".to_string())
    })?;
    Ok(Json(WhoAmIResponse {
        actor: ctx.actor().to_string(),
        source_address: ctx.source_address().to_string(),
        request_id: ctx.request_id().to_string(),
        received_at: ctx.received_at(),
    }))
}

/// Fallback for unknown routes.
pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found")
}
