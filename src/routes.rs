// src/routes.rs

use axum::{
    Router, http::Method, middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{handlers::quiz, state::AppState, utils::jwt::auth_middleware};

/// Assembles the main application router.
///
/// * All quiz routes require a valid Bearer token; role checks happen inside
///   the handlers through `Role` capabilities.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (pool, config, notifier).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let quiz_routes = Router::new()
        .route("/", post(quiz::create_quiz))
        .route("/{id}", get(quiz::get_quiz_view))
        .route("/{id}/submit", post(quiz::submit_quiz))
        .route("/{id}/student-results", get(quiz::student_results))
        .route("/{id}/statistics", get(quiz::quiz_statistics))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api/quizzes", quiz_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
