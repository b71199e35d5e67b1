mod handlers;
mod membership;
mod messages;
mod model;
mod pages;
mod repo;

use axum::{routing::{delete, get, put}, Router};

use crate::AppState;

pub use model::{Chatter, Message, NewMessage, Room, RoomView};
pub use repo::RoomRepository;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list).post(handlers::create).delete(handlers::delete_all))
        .route("/{room_id}", get(handlers::get).delete(handlers::delete))
        .route("/{room_id}/chatters/{user_id}/chattername/{user_name}", put(handlers::join))
        .route("/{room_id}/chatters/{user_id}", delete(handlers::leave))
        .route("/{room_id}/messages", get(handlers::messages).post(handlers::post_message))
}
