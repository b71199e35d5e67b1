use axum::{
    debug_handler,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    extract::{BaseUrl, Format, JsonOrForm},
    AppError, AppResult,
};

use super::{
    model::{NewMessage, Room, RoomView},
    pages, RoomRepository,
};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RoomFields {
    name: Option<String>,
}

/// `{"room": {"name": ..}}` from API clients, a flat `name` field from forms.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum NewRoomBody {
    Nested { room: RoomFields },
    Flat(RoomFields),
}

impl NewRoomBody {
    fn name(self) -> Option<String> {
        match self {
            NewRoomBody::Nested { room } | NewRoomBody::Flat(room) => room.name,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum NewMessageBody {
    Nested { message: NewMessage },
    Flat(NewMessage),
}

impl NewMessageBody {
    fn into_message(self) -> Option<NewMessage> {
        match self {
            NewMessageBody::Nested { message } => Some(message),
            NewMessageBody::Flat(message) if !message.is_empty() => Some(message),
            NewMessageBody::Flat(_) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SinceQuery {
    since: Option<String>,
}

fn room_response(status: StatusCode, room: Room, format: Format, base: &BaseUrl) -> Response {
    let view = room.into_view(base);
    match format {
        Format::Json => (status, Json(view)).into_response(),
        Format::Html => pages::room(&view).into_response(),
    }
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn list(
    State(rooms): State<RoomRepository>,
    format: Format,
    base: BaseUrl,
) -> AppResult<Response> {
    let views: Vec<RoomView> = rooms
        .list_rooms()
        .await?
        .into_iter()
        .map(|room| room.into_view(&base))
        .collect();

    Ok(match format {
        Format::Json => Json(views).into_response(),
        Format::Html => pages::rooms(&views).into_response(),
    })
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn create(
    State(rooms): State<RoomRepository>,
    format: Format,
    base: BaseUrl,
    JsonOrForm(body): JsonOrForm<NewRoomBody>,
) -> AppResult<Response> {
    let name = body.name().ok_or_else(|| AppError::bad_request("room name is required"))?;
    let room = rooms.create_room(&name).await?;

    Ok(match format {
        Format::Json => (StatusCode::CREATED, Json(room.into_view(&base))).into_response(),
        Format::Html => Redirect::to(&room.path()).into_response(),
    })
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn get(
    State(rooms): State<RoomRepository>,
    Path(room_id): Path<String>,
    format: Format,
    base: BaseUrl,
) -> AppResult<Response> {
    let room = rooms.get_room(&room_id).await?;
    Ok(room_response(StatusCode::OK, room, format, &base))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn delete(
    State(rooms): State<RoomRepository>,
    Path(room_id): Path<String>,
    format: Format,
) -> AppResult<Response> {
    rooms.delete_room(&room_id).await?;

    Ok(match format {
        Format::Json => Json(json!({})).into_response(),
        Format::Html => Redirect::to("/rooms").into_response(),
    })
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn delete_all(
    State(rooms): State<RoomRepository>,
    format: Format,
) -> AppResult<Response> {
    let removed = rooms.delete_all_rooms().await?;

    Ok(match format {
        Format::Json => Json(json!({ "removed": removed })).into_response(),
        Format::Html => pages::rooms(&[]).into_response(),
    })
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn join(
    State(rooms): State<RoomRepository>,
    Path((room_id, user_id, user_name)): Path<(String, String, String)>,
    format: Format,
    base: BaseUrl,
) -> AppResult<Response> {
    let room = rooms.join_room(&room_id, &user_id, &user_name).await?;
    Ok(room_response(StatusCode::CREATED, room, format, &base))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn leave(
    State(rooms): State<RoomRepository>,
    Path((room_id, user_id)): Path<(String, String)>,
    format: Format,
    base: BaseUrl,
) -> AppResult<Response> {
    let room = rooms.leave_room(&room_id, &user_id).await?;
    Ok(room_response(StatusCode::CREATED, room, format, &base))
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn messages(
    State(rooms): State<RoomRepository>,
    Path(room_id): Path<String>,
    Query(SinceQuery { since }): Query<SinceQuery>,
    format: Format,
    base: BaseUrl,
) -> AppResult<Response> {
    let since = since.as_deref().filter(|since| !since.is_empty());
    let messages = rooms.get_messages(&room_id, since).await?;

    match format {
        Format::Json => Ok(Json(messages).into_response()),
        Format::Html => {
            let room = rooms.get_room(&room_id).await?;
            Ok(room_response(StatusCode::OK, room, format, &base))
        }
    }
}

#[debug_handler(state = crate::AppState)]
pub(crate) async fn post_message(
    State(rooms): State<RoomRepository>,
    Path(room_id): Path<String>,
    format: Format,
    base: BaseUrl,
    JsonOrForm(body): JsonOrForm<NewMessageBody>,
) -> AppResult<Response> {
    let room = rooms.post_message(&room_id, body.into_message()).await?;
    Ok(room_response(StatusCode::CREATED, room, format, &base))
}
