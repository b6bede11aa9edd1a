use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::modules::chat::{Message, Role, SendOutcome, SessionState, SessionView};

/// 登录身份选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginAs {
    Master,
    Client,
    Anonymous,
}

impl std::str::FromStr for LoginAs {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "master" => Ok(LoginAs::Master),
            "client" => Ok(LoginAs::Client),
            "anon" | "anonymous" => Ok(LoginAs::Anonymous),
            other => Err(format!("unknown identity '{}'", other)),
        }
    }
}

/// 消息展示数据
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: String,
    pub sender_id: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub is_system: bool,
}

impl From<&Message> for MessageView {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id().as_str().to_string(),
            sender_id: message.sender_id().to_string(),
            text: message.text().to_string(),
            timestamp: message.timestamp(),
            is_system: message.is_system(),
        }
    }
}

/// 会话概要
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub name: String,
    pub state: SessionState,
    pub uid: Option<String>,
    pub role: Option<Role>,
    pub conversation: Option<String>,
    pub msg_count: Option<u32>,
    /// client 剩余可发送条数，master 为 None
    pub remaining: Option<u32>,
    pub hold_armed: bool,
    pub message_count: usize,
}

impl SessionSummary {
    pub fn from_view(name: &str, view: &SessionView, max: u32, hold_armed: bool) -> Self {
        let status = view.status();
        let is_client = view.role().map(|r| r.is_client()).unwrap_or(false);
        Self {
            name: name.to_string(),
            state: view.state(),
            uid: view.user().map(|u| u.uid().to_string()),
            role: view.role(),
            conversation: view.conversation().map(|c| c.to_string()),
            msg_count: status.map(|s| s.msg_count()),
            remaining: if is_client {
                status.map(|s| max.saturating_sub(s.msg_count()))
            } else {
                None
            },
            hold_armed,
            message_count: view.messages().len(),
        }
    }
}

/// 发送结果
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SendResult {
    #[serde(rename_all = "camelCase")]
    Delivered { message: MessageView, counted: bool },
    #[serde(rename_all = "camelCase")]
    Unlocked { notice: MessageView },
}

impl From<&SendOutcome> for SendResult {
    fn from(outcome: &SendOutcome) -> Self {
        match outcome {
            SendOutcome::Delivered { message, counted } => SendResult::Delivered {
                message: message.into(),
                counted: *counted,
            },
            SendOutcome::Unlocked { notice } => SendResult::Unlocked {
                notice: notice.into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_as_from_str() {
        assert_eq!("Master".parse::<LoginAs>().unwrap(), LoginAs::Master);
        assert_eq!("anon".parse::<LoginAs>().unwrap(), LoginAs::Anonymous);
        assert!("root".parse::<LoginAs>().is_err());
    }

    #[test]
    fn test_message_view_marks_system() {
        let notice = Message::system_notice("reset");
        let view = MessageView::from(&notice);
        assert!(view.is_system);
        assert_eq!(view.text, "reset");
    }
}
