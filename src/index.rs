use axum::{debug_handler, extract::State, response::{Html, IntoResponse, Response}, Json};
use serde_json::json;

use crate::{extract::Format, include_res, rooms::RoomRepository, users::UserRepository, AppResult};

#[debug_handler(state = crate::AppState)]
pub async fn index(
    State(rooms): State<RoomRepository>,
    State(users): State<UserRepository>,
    format: Format,
) -> AppResult<Response> {
    let room_count = rooms.count_rooms().await?;
    let user_count = users.count_users().await?;

    Ok(match format {
        Format::Json => Json(json!({
            "rooms": { "url": "/rooms", "count": room_count },
            "users": { "url": "/users", "count": user_count },
        }))
        .into_response(),
        Format::Html => Html(
            include_res!(str, "/pages/index.html")
                .replace("{room_count}", &room_count.to_string())
                .replace("{user_count}", &user_count.to_string()),
        )
        .into_response(),
    })
}
