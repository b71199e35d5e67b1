use crate::AppResult;

use super::{
    model::{Chatter, Room},
    repo::{Nested, RoomRepository},
};

impl RoomRepository {
    /// Appends a chatter. Repeated joins by the same user are kept as-is.
    pub async fn join_room(&self, public_id: &str, user_id: &str, user_name: &str) -> AppResult<Room> {
        self.mutate(public_id, Nested::Chatters, |room| {
            room.chatters.push(Chatter {
                id: user_id.to_owned(),
                name: user_name.to_owned(),
            });
            tracing::debug!(room = public_id, user = user_id, chatters = room.chatters.len(), "joined");
            Ok(true)
        })
        .await
    }

    /// Removes the first chatter with `user_id`; a user not in the room is a no-op.
    pub async fn leave_room(&self, public_id: &str, user_id: &str) -> AppResult<Room> {
        self.mutate(public_id, Nested::Chatters, |room| {
            let Some(index) = room.chatters.iter().position(|chatter| chatter.id == user_id) else {
                tracing::debug!(room = public_id, user = user_id, "leave ignored, not a chatter");
                return Ok(false);
            };
            room.chatters.remove(index);
            tracing::debug!(room = public_id, user = user_id, chatters = room.chatters.len(), "left");
            Ok(true)
        })
        .await
    }
}
