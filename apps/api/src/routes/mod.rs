pub mod application;
pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    handler::HandlerWithoutStateExt,
    routing::{get, post},
    Router,
};
use tower_http::services::ServeDir;

use crate::errors::AppError;
use crate::intake::upload::FORM_OVERHEAD_BYTES;
use crate::state::AppState;

async fn not_found() -> AppError {
    AppError::NotFound
}

/// Builds the full router. Anything that isn't an API route is looked up in
/// the static site directory, and falls through to a JSON 404. A known path
/// hit with the wrong method gets the same 404 envelope.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.uploads.max_bytes() as usize + FORM_OVERHEAD_BYTES;

    let static_site = ServeDir::new(&state.config.static_dir)
        .call_fallback_on_method_not_allowed(true)
        .not_found_service(not_found.into_service());

    Router::new()
        .route("/health", get(health::health_handler).fallback(not_found))
        .route(
            "/enviar-candidatura",
            post(application::handle_submit_application)
                .layer(DefaultBodyLimit::max(body_limit))
                .fallback(not_found),
        )
        .fallback_service(static_site)
        .with_state(state)
}
