use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

pub mod announcements;
pub mod api_keys;
pub mod auth;
pub mod messages;
pub mod performance;
pub mod projects;
pub mod references;
pub mod tasks;
pub mod users;
pub mod wisdom;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(auth::router())
        .merge(users::router())
        .merge(projects::router())
        .merge(tasks::router())
        .merge(references::router())
        .merge(api_keys::router())
        .merge(announcements::router())
        .merge(messages::router())
        .merge(performance::router())
        .merge(wisdom::router());

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
