use serde::{Deserialize, Serialize};
use std::fmt;

use crate::modules::auth::UserId;

/// 会话对标识（master 与 client 的一对一对话）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationId {
    master: UserId,
    client: UserId,
}

impl ConversationId {
    pub fn new(master: UserId, client: UserId) -> Self {
        Self { master, client }
    }

    pub fn master(&self) -> &UserId {
        &self.master
    }

    pub fn client(&self) -> &UserId {
        &self.client
    }

    /// 对话键 `{master}_{client}`，用作存储路径段
    pub fn key(&self) -> String {
        format!("{}_{}", self.master, self.client)
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_key() {
        let id = ConversationId::new(UserId::from("m1"), UserId::from("c1"));
        assert_eq!(id.key(), "m1_c1");
        assert_eq!(id.client().as_str(), "c1");
    }
}
