pub mod appresult;
pub mod config;
pub mod extract;
pub mod index;
pub mod res;
pub mod rooms;
pub mod store;
pub mod timestamp;
pub mod users;

use std::time::Duration;

use axum::{extract::FromRef, routing::get, Router};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

pub use appresult::{AppError, AppResult};
pub use config::Config;
pub use rooms::RoomRepository;
pub use store::DocumentStore;
pub use users::UserRepository;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub rooms: RoomRepository,
    pub users: UserRepository,
}

impl AppState {
    pub async fn new(store: &DocumentStore) -> AppResult<Self> {
        Ok(Self {
            rooms: RoomRepository::new(store).await?,
            users: UserRepository::new(store).await?,
        })
    }
}

pub fn app(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/", get(index::index))
        .nest("/rooms", rooms::router())
        .nest("/users", users::router())
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
