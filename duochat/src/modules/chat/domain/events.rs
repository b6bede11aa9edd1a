use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entities::{ClientStatus, Message};
use super::state_machine::SessionState;
use super::value_objects::ConversationId;
use crate::modules::auth::UserId;

/// 领域事件基础 trait
pub trait DomainEvent: Clone + Send + Sync {
    fn event_type(&self) -> &'static str;
    fn timestamp(&self) -> DateTime<Utc>;
}

/// 消息列表快照到达
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesUpdatedEvent {
    pub conversation: String,
    pub messages: Vec<Message>,
    pub timestamp: DateTime<Utc>,
}

impl MessagesUpdatedEvent {
    pub fn new(conversation: &ConversationId, messages: Vec<Message>) -> Self {
        Self {
            conversation: conversation.key(),
            messages,
            timestamp: Utc::now(),
        }
    }
}

impl DomainEvent for MessagesUpdatedEvent {
    fn event_type(&self) -> &'static str {
        "messages.updated"
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Client 状态快照到达（None 表示文档不存在）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdatedEvent {
    pub client_uid: UserId,
    pub status: Option<ClientStatus>,
    pub timestamp: DateTime<Utc>,
}

impl DomainEvent for StatusUpdatedEvent {
    fn event_type(&self) -> &'static str {
        "status.updated"
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStateChangedEvent {
    pub from: SessionState,
    pub to: SessionState,
    pub timestamp: DateTime<Utc>,
}

impl DomainEvent for SessionStateChangedEvent {
    fn event_type(&self) -> &'static str {
        "session.stateChanged"
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// 特殊口令生效
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterResetEvent {
    pub client_uid: UserId,
    pub timestamp: DateTime<Utc>,
}

impl DomainEvent for CounterResetEvent {
    fn event_type(&self) -> &'static str {
        "counter.reset"
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Master 请求强制登出
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForceLogoutRequestedEvent {
    pub client_uid: UserId,
    pub timestamp: DateTime<Utc>,
}

impl DomainEvent for ForceLogoutRequestedEvent {
    fn event_type(&self) -> &'static str {
        "session.forceLogoutRequested"
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// 会话结束原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TerminationReason {
    UserLogout,
    ForcedLogout,
    HoldTimeout,
    /// 认证服务侧登出
    SignedOut,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTerminatedEvent {
    pub reason: TerminationReason,
    /// 随登出一起删除的消息数（master 登出为 0）
    pub deleted_messages: usize,
    pub timestamp: DateTime<Utc>,
}

impl DomainEvent for SessionTerminatedEvent {
    fn event_type(&self) -> &'static str {
        "session.terminated"
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// 聊天领域事件枚举
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChatDomainEvent {
    MessagesUpdated(MessagesUpdatedEvent),
    StatusUpdated(StatusUpdatedEvent),
    SessionStateChanged(SessionStateChangedEvent),
    CounterReset(CounterResetEvent),
    ForceLogoutRequested(ForceLogoutRequestedEvent),
    SessionTerminated(SessionTerminatedEvent),
}

impl ChatDomainEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            ChatDomainEvent::MessagesUpdated(e) => e.event_type(),
            ChatDomainEvent::StatusUpdated(e) => e.event_type(),
            ChatDomainEvent::SessionStateChanged(e) => e.event_type(),
            ChatDomainEvent::CounterReset(e) => e.event_type(),
            ChatDomainEvent::ForceLogoutRequested(e) => e.event_type(),
            ChatDomainEvent::SessionTerminated(e) => e.event_type(),
        }
    }
}
