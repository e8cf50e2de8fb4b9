use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::AppError;
use crate::models::CurrentUser;
use crate::session::auth_key;
use crate::AppState;

/// Header carrying the session token
pub const TOKEN_HEADER: &str = "x-token";

/// Authentication middleware
/// Resolves the `x-token` session to a user and stores it in request extensions
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !state.sessions.is_alive() || !state.docs.is_alive() {
        return Err(AppError::ServiceUnavailable);
    }

    let token = request
        .headers()
        .get(TOKEN_HEADER)
        .and_then(|h| h.to_str().ok())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or(AppError::Unauthorized)?;

    let user_id = state
        .sessions
        .get(&auth_key(&token))
        .await?
        .ok_or(AppError::Unauthorized)?;

    tracing::debug!("Resolved session for user {}", user_id);
    request.extensions_mut().insert(CurrentUser { id: user_id });

    Ok(next.run(request).await)
}
