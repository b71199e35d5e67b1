use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{timestamp, AppError, AppResult};

use super::{
    model::{Message, NewMessage, Room},
    repo::{Nested, RoomRepository},
};

impl RoomRepository {
    /// Appends a message stamped with a fresh id and the append time.
    pub async fn post_message(&self, public_id: &str, message: Option<NewMessage>) -> AppResult<Room> {
        self.mutate(public_id, Nested::Messages, move |room| {
            let message = message.ok_or_else(|| AppError::bad_request("message payload is required"))?;

            let stamped = message.stamp(
                Uuid::now_v7().to_string(),
                next_timestamp(room.messages.last(), timestamp::now()),
            );
            tracing::debug!(room = public_id, message = %stamped.id, author = %stamped.author_id, "posted");

            room.messages.push(stamped);
            Ok(true)
        })
        .await
    }

    /// The room's messages in append order, or only those after `since`.
    pub async fn get_messages(&self, public_id: &str, since: Option<&str>) -> AppResult<Vec<Message>> {
        let messages = self.get_room(public_id).await?.messages;
        let Some(since) = since else {
            return Ok(messages);
        };

        let cursor = messages
            .iter()
            .find(|message| message.id == since)
            .map(|message| message.timestamp)
            .ok_or_else(|| AppError::not_found(format!("message {since} in room {public_id}")))?;

        Ok(messages
            .into_iter()
            .filter(|message| message.timestamp > cursor)
            .collect())
    }
}

// Strictly after the previous message even if the clock stalls or steps back.
fn next_timestamp(last: Option<&Message>, now: OffsetDateTime) -> OffsetDateTime {
    match last {
        Some(last) if now <= last.timestamp => last.timestamp + Duration::nanoseconds(1),
        _ => now,
    }
}
