// Room Domain
//
// 开放聊天室的值对象、错误与事件

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::modules::auth::AuthError;
use crate::modules::chat::domain::Message;
use crate::modules::store::{CollectionPath, StoreError};

/// 房间标识
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 消息集合路径 `rooms/{id}/messages`
    pub fn messages_collection(&self) -> Result<CollectionPath, StoreError> {
        Ok(CollectionPath::parse(&format!("rooms/{}/messages", self.0))?)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 聊天室错误类型
#[derive(Debug, Error)]
pub enum RoomError {
    #[error("Not joined to a room")]
    NotJoined,

    #[error("Message is empty")]
    EmptyMessage,

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// 聊天室事件
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RoomEvent {
    #[serde(rename_all = "camelCase")]
    Joined { room_id: RoomId, uid: String },
    #[serde(rename_all = "camelCase")]
    MessagesUpdated {
        room_id: RoomId,
        messages: Vec<Message>,
    },
    #[serde(rename_all = "camelCase")]
    Left { room_id: RoomId },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_collection() {
        let room = RoomId::new("lobby");
        assert_eq!(
            room.messages_collection().unwrap().to_string(),
            "rooms/lobby/messages"
        );
        assert!(RoomId::new("a/b").messages_collection().is_err());
    }
}
