use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use super::super::value_objects::MessageId;
use crate::modules::auth::UserId;

/// 系统通知使用的保留发送者 ID
pub const SYSTEM_SENDER_ID: &str = "system";

/// 消息实体
///
/// 写入后不可变，按时间戳排序。时间戳以毫秒精度存储。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// 消息唯一标识（与文档 ID 一致）
    id: MessageId,
    /// 消息内容
    text: String,
    /// 发送者
    sender_id: UserId,
    /// 发送时间
    #[serde(with = "chrono::serde::ts_milliseconds")]
    timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(id: MessageId, sender_id: UserId, text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id,
            text: text.into(),
            sender_id,
            timestamp: timestamp.trunc_subsecs(3),
        }
    }

    /// 创建用户消息
    pub fn compose(sender_id: UserId, text: impl Into<String>) -> Self {
        Self::new(MessageId::new(), sender_id, text, Utc::now())
    }

    /// 创建系统通知
    pub fn system_notice(text: impl Into<String>) -> Self {
        Self::compose(UserId::from(SYSTEM_SENDER_ID), text)
    }

    // Getters
    pub fn id(&self) -> &MessageId {
        &self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn sender_id(&self) -> &UserId {
        &self.sender_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn is_system(&self) -> bool {
        self.sender_id.as_str() == SYSTEM_SENDER_ID
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_compose_message() {
        let msg = Message::compose(UserId::from("c1"), "hello");

        assert_eq!(msg.text(), "hello");
        assert_eq!(msg.sender_id().as_str(), "c1");
        assert!(!msg.is_system());
    }

    #[test]
    fn test_system_notice() {
        let notice = Message::system_notice("counter reset");
        assert!(notice.is_system());
    }

    #[test]
    fn test_wire_format() {
        let ts = DateTime::from_timestamp_millis(1_700_000_000_123).unwrap();
        let msg = Message::new(MessageId::from_document_id("m1"), UserId::from("c1"), "hi", ts);

        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({"id": "m1", "text": "hi", "senderId": "c1", "timestamp": 1_700_000_000_123i64})
        );
        assert_eq!(serde_json::from_value::<Message>(value).unwrap(), msg);
    }
}
