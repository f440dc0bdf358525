use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::mock_engine::handlers::ApiError;
use crate::mock_engine::MockEngineState;

/// Reject requests whose `Authorization` header is not the session token.
pub async fn bearer_auth(
    State(state): State<MockEngineState>,
    request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    if let Some(auth_val) = auth_header {
        if state.token().matches_header(auth_val) {
            return next.run(request).await;
        }
    }

    tracing::warn!(path = %request.uri().path(), "Rejected request with bad credential");
    ApiError::new(StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
}
