//! HTTP router.
//!
//! Function routes live under `/functions/v1/`, management routes under
//! `/api/`. CORS is permissive: any origin, no credentials.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Base64 data URLs run about a third larger than the file.
const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

pub fn api_router(core: Arc<CoreState>) -> Router {
    build_router(ApiContext::new(core))
}

fn build_router(ctx: ApiContext) -> Router {
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let functions = Router::new()
        .route("/ocr-processing", post(endpoints::ocr::process))
        .route(
            "/ocr-document-processor",
            post(endpoints::ocr::process_document),
        )
        .route(
            "/critical-values-monitor",
            post(endpoints::monitor::run),
        );

    let api = Router::new()
        .route("/ocr-jobs", get(endpoints::jobs::list))
        .route(
            "/ocr-jobs/:id",
            get(endpoints::jobs::detail).delete(endpoints::jobs::delete),
        )
        .route("/ocr-jobs/:id/retry", post(endpoints::jobs::retry))
        .route("/ocr-jobs/:id/promote", post(endpoints::jobs::promote))
        .route("/ocr-jobs/:id/file", get(endpoints::jobs::file))
        .route("/notifications", get(endpoints::notifications::inbox))
        .route(
            "/notifications/read-all",
            post(endpoints::notifications::mark_all_read),
        )
        .route(
            "/notifications/:id/read",
            post(endpoints::notifications::mark_read),
        )
        .route("/profiles/:id/modules", get(endpoints::profiles::modules));

    Router::new()
        .route("/health", get(endpoints::health::check))
        .nest("/functions/v1", functions)
        .nest("/api", api)
        .with_state(ctx)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
}
