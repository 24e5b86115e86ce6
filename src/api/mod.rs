// HTTP adapter running the authenticator in front of axum handlers

use axum::{
    Extension, Router,
    extract::{Request, State},
    http::{StatusCode, header::AUTHORIZATION},
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::get,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::auth::{AuthOutcome, Authenticator, DHMAC_SCHEME, KeyPrincipal};

pub type AppState = Arc<Authenticator<KeyPrincipal>>;

pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/whoami", get(whoami))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_dhmac));

    Router::new()
        .route("/health", get(health_check))
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Middleware that authenticates the request before it reaches the handler.
///
/// On success the [`KeyPrincipal`] is available to handlers as an
/// `Extension`. Rejections get `401` with the authenticator's challenge; key
/// store faults get `503` when retryable and `500` otherwise.
pub async fn require_dhmac(
    State(authenticator): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    // The request is not `Sync`; nothing borrowed from it may cross the await
    let credentials = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let method = request.method().clone();
    let uri = request.uri().clone();

    let outcome = authenticator
        .authenticate(credentials.as_deref(), &method, &uri)
        .await;

    match outcome {
        Ok(AuthOutcome::Authenticated(principal)) => {
            request.extensions_mut().insert(principal);
            next.run(request).await
        }
        Ok(AuthOutcome::Rejected) => unauthorized(&authenticator),
        Err(e) if e.is_retryable() => {
            warn!("Authentication deferred: {}", e);
            StatusCode::SERVICE_UNAVAILABLE.into_response()
        }
        Err(e) => {
            error!("Authentication failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn unauthorized(authenticator: &Authenticator<KeyPrincipal>) -> Response {
    let challenge = authenticator.challenge();
    match challenge.header_value() {
        Ok(value) => (
            StatusCode::UNAUTHORIZED,
            [(crate::auth::Challenge::header_name(), value)],
        )
            .into_response(),
        Err(e) => {
            error!("Realm cannot be sent as a header: {}", e);
            StatusCode::UNAUTHORIZED.into_response()
        }
    }
}

/// Liveness check; reports the scheme and realm clients must authenticate with.
async fn health_check(State(authenticator): State<AppState>) -> Json<Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "scheme": DHMAC_SCHEME,
        "realm": authenticator.realm(),
    }))
}

async fn whoami(Extension(principal): Extension<KeyPrincipal>) -> Json<KeyPrincipal> {
    Json(principal)
}
