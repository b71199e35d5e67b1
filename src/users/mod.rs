mod handlers;
mod repo;

use axum::{routing::get, Router};

use crate::AppState;

pub use repo::{User, UserRepository, UserView};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list).post(handlers::create))
        .route("/{user_id}", get(handlers::get).delete(handlers::delete))
}
