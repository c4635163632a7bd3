//! HTTP router.
//!
//! Returns a composable `Router` with every endpoint nested under `/api/`,
//! the uploaded files served under the configured URL prefix, and a JSON
//! envelope for anything that does not match.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::api::endpoints::{self, doctors, feedback, kids, media, voice};
use crate::api::AppState;
use crate::config::Config;

/// Build the application router.
///
/// Path params use `:param` syntax (axum 0.7). Trailing slashes are part of
/// every API path.
pub fn router(state: AppState, config: &Config) -> Router {
    let api = Router::new()
        // Doctors
        .route("/doctor/register/", post(doctors::register))
        .route("/doctor/login/", post(doctors::login))
        .route("/doctor/kids/", post(doctors::kids))
        .route("/doctors/", get(doctors::list))
        .route(
            "/doctor/profile/:job_id/edit/",
            put(doctors::edit).patch(doctors::edit),
        )
        .route(
            "/doctor/voice-records/:week_id/",
            get(voice::list_for_week),
        )
        // Kids
        .route("/kid/register/", post(kids::register))
        .route("/kid/login/", post(kids::login))
        .route("/kid/:kid_id/weeks/", get(kids::weeks))
        .route(
            "/kid/profile/:k_id/edit/",
            put(kids::edit).patch(kids::edit),
        )
        // Media
        .route(
            "/media/pictures/upload/:week_id/",
            post(media::upload_pictures),
        )
        .route("/media/video/upload/:week_id/", post(media::upload_video))
        .route("/media/pictures/save/", post(media::save_pictures))
        .route("/media/video/save/", post(media::save_video))
        .route("/media/list/:week_id/", get(media::list))
        // Voice
        .route("/voice/upload/", post(voice::upload))
        .route("/voice/save/", post(voice::save))
        // Feedback
        .route("/feedback/create/:voice_id/", post(feedback::create))
        .route("/feedback/kid/:k_id/", get(feedback::for_kid));

    Router::new()
        .nest("/api", api)
        .route("/health", get(endpoints::health))
        .nest_service(
            &config.uploads.url_prefix,
            ServeDir::new(config.upload_root()),
        )
        .fallback(endpoints::not_found)
        .layer(DefaultBodyLimit::max(config.server.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
