use axum::extract::{DefaultBodyLimit, Request};
use axum::http::{Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use pushr_types::wire::endpoints;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{require_read, require_write};
use crate::handler;
use crate::state::AppState;

/// `OPTIONS` is answered with an empty 200 on every path.
async fn answer_options(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    next.run(request).await
}

/// Build the axum router with all pushr endpoints.
pub fn build_router(state: AppState) -> Router {
    let reads = Router::new()
        .route(endpoints::RELEASE, get(handler::get_release))
        .route(endpoints::VERSION, get(handler::get_version))
        .route(endpoints::REPO_LATEST, get(handler::repo_latest))
        .route(endpoints::REPO_ASSET, get(handler::repo_asset))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_read));

    let writes = Router::new()
        .route(endpoints::UPLOAD, post(handler::upload))
        .route(endpoints::REPO_UPLOAD, post(handler::repo_upload))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_write));

    Router::new()
        .route(endpoints::PING, get(handler::ping))
        .merge(reads)
        .merge(writes)
        .layer(DefaultBodyLimit::disable())
        .layer(middleware::from_fn(answer_options))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
