pub mod config;
pub mod content;
pub mod email;
pub mod error;
pub mod handlers;
pub mod images;
pub mod models;
pub mod payments;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Json, Router,
};

pub use handlers::AppState;

/// Room above the 5 MiB upload ceiling so our own validation produces the
/// 400 before the framework's limit kicks in.
const BODY_LIMIT: usize = 8 * 1024 * 1024;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/lead", post(handlers::leads::capture))
        .route("/guide-review", post(handlers::reviews::submit))
        .route("/guide-review/stats", get(handlers::reviews::stats))
        .route(
            "/admin/reviews/:id",
            get(handlers::reviews::get_review),
        )
        .route(
            "/admin/reviews/:id/approve",
            post(handlers::reviews::approve),
        )
        .route(
            "/admin/reviews/:id/feature",
            post(handlers::reviews::feature),
        )
        .route(
            "/admin/reviews/moderate",
            post(handlers::reviews::moderate_batch),
        )
        .route("/admin/posts", post(handlers::authoring::create_post))
        .route("/admin/posts/:id", put(handlers::authoring::update_post))
        .route("/admin/recipes", post(handlers::authoring::create_recipe))
        .route(
            "/admin/recipes/:id",
            put(handlers::authoring::update_recipe),
        )
        .route("/upload", post(handlers::upload::upload_asset))
        .route("/design-studio/generate", post(handlers::studio::generate))
        .route(
            "/design-studio/status/:task_id",
            get(handlers::studio::status),
        )
        .route(
            "/checkout/ebook",
            post(handlers::checkout::create_ebook_session),
        )
        .route("/webhook/payment", post(handlers::checkout::payment_webhook))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
