use axum::response::Html;

use crate::{
    include_res,
    res::{escape, human_time, markdown},
};

use super::model::{Message, RoomView};

pub(crate) fn rooms(rooms: &[RoomView]) -> Html<String> {
    let mut room_items = String::new();
    for room in rooms {
        room_items += &include_res!(str, "/pages/rooms/room_item.html")
            .replace("{id}", &escape(&room.id))
            .replace("{created}", &human_time(room.created))
            .replace("{chatter_count}", &room.chatters.len().to_string())
            .replace("{name}", &escape(&room.name));
    }

    Html(include_res!(str, "/pages/rooms/rooms.html").replace("{room_items}", &room_items))
}

pub(crate) fn room(room: &RoomView) -> Html<String> {
    let mut chatters = String::new();
    for chatter in &room.chatters {
        chatters += &include_res!(str, "/pages/rooms/chatter.html").replace("{name}", &escape(&chatter.name));
    }

    let mut messages = String::new();
    for msg in &room.messages {
        messages += &message(msg);
    }

    Html(
        include_res!(str, "/pages/rooms/room.html")
            .replace("{room_id}", &escape(&room.id))
            .replace("{created}", &human_time(room.created))
            .replace("{chatters}", &chatters)
            .replace("{messages}", &messages)
            .replace("{room_name}", &escape(&room.name)),
    )
}

fn message(msg: &Message) -> String {
    let author = if msg.author.is_empty() { "Anonymous" } else { &msg.author };

    include_res!(str, "/pages/rooms/message.html")
        .replace("{id}", &escape(&msg.id))
        .replace("{timestamp}", &human_time(msg.timestamp))
        .replace("{content}", &markdown(&msg.text))
        .replace("{author}", &escape(author))
}
