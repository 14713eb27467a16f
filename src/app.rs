use std::path::Path;

use axum::{routing::get, Router};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::{admin, auth, state::AppState};

/// Dashboard pages that all load the single-page `index.html`.
const FRONTEND_PAGES: [&str; 5] = ["/", "/login", "/register", "/dashboard", "/admin"];

fn frontend_routes(dir: &Path) -> Router<AppState> {
    let index = dir.join("index.html");
    let mut router = Router::new();
    for page in FRONTEND_PAGES {
        router = router.route_service(page, ServeFile::new(&index));
    }
    router.fallback_service(ServeDir::new(dir))
}

pub fn build_app(state: AppState) -> Router {
    let mut router = Router::new()
        .merge(auth::router(&state))
        .merge(admin::router(&state))
        .route("/health", get(|| async { "ok" }));

    if let Some(dir) = state.config.frontend_dir.as_deref() {
        router = router.merge(frontend_routes(dir));
    }

    router
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let request_id = req
                        .headers()
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("-");
                    tracing::info_span!(
                        "http_request",
                        method = %req.method(),
                        uri = %req.uri(),
                        request_id = %request_id,
                        status = tracing::field::Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}
