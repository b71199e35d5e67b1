use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{extract::BaseUrl, timestamp::fixed_utc};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chatter {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(with = "fixed_utc")]
    pub timestamp: OffsetDateTime,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub author: String,
    #[serde(rename = "authorID", default)]
    pub author_id: String,
}

/// Caller-supplied part of a message; id and timestamp are assigned on append.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewMessage {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub text: Option<String>,
    pub author: Option<String>,
    #[serde(rename = "authorID")]
    pub author_id: Option<String>,
}

impl NewMessage {
    pub fn is_empty(&self) -> bool {
        self.kind.is_none() && self.text.is_none() && self.author.is_none() && self.author_id.is_none()
    }

    pub(crate) fn stamp(self, id: String, timestamp: OffsetDateTime) -> Message {
        Message {
            id,
            timestamp,
            kind: self.kind.unwrap_or_default(),
            text: self.text.unwrap_or_default(),
            author: self.author.unwrap_or_default(),
            author_id: self.author_id.unwrap_or_default(),
        }
    }
}

/// A room document as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    #[serde(rename = "publicID")]
    pub public_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(with = "fixed_utc")]
    pub created: OffsetDateTime,
    #[serde(default)]
    pub chatters: Vec<Chatter>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// What clients see of a room.
#[derive(Debug, Clone, Serialize)]
pub struct RoomView {
    pub id: String,
    pub name: String,
    pub chatters: Vec<Chatter>,
    pub messages: Vec<Message>,
    #[serde(with = "fixed_utc")]
    pub created: OffsetDateTime,
    pub url: String,
}

impl Room {
    pub fn path(&self) -> String {
        format!("/rooms/{}", self.public_id)
    }

    pub fn into_view(self, base: &BaseUrl) -> RoomView {
        RoomView {
            url: base.join(&self.path()),
            id: self.public_id,
            name: self.name,
            chatters: self.chatters,
            messages: self.messages,
            created: self.created,
        }
    }
}
