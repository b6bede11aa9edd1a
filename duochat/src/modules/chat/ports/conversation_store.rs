use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::super::domain::{ClientStatus, ConversationId, Message};
use crate::modules::auth::UserId;
use crate::modules::store::{StoreError, Subscription};

/// 对话存储端口
///
/// 聊天模块对文档存储的领域化视图。所有多文档写入都是原子的：
/// 要么全部生效，要么全部不生效。
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// 最近 `limit` 条消息，按时间升序
    async fn recent_messages(
        &self,
        conversation: &ConversationId,
        limit: usize,
    ) -> Result<Vec<Message>, StoreError>;

    /// 订阅最近 `limit` 条消息
    async fn watch_messages(
        &self,
        conversation: &ConversationId,
        limit: usize,
    ) -> Result<Subscription<Vec<Message>>, StoreError>;

    /// 读取 client 状态
    async fn client_status(&self, client: &UserId) -> Result<Option<ClientStatus>, StoreError>;

    /// 订阅 client 状态，文档不存在时推送 None
    async fn watch_client_status(
        &self,
        client: &UserId,
    ) -> Result<Subscription<Option<ClientStatus>>, StoreError>;

    /// 追加一条不计数的消息
    async fn append_message(
        &self,
        conversation: &ConversationId,
        message: &Message,
    ) -> Result<(), StoreError>;

    /// 追加消息并在同一批次中 msgCount +1
    async fn append_counted_message(
        &self,
        conversation: &ConversationId,
        message: &Message,
    ) -> Result<(), StoreError>;

    /// msgCount 清零并追加系统通知
    async fn reset_counter(
        &self,
        conversation: &ConversationId,
        notice: &Message,
    ) -> Result<(), StoreError>;

    /// client 登录：清空对话并写入新的状态，返回清除的消息数
    async fn begin_client_session(
        &self,
        conversation: &ConversationId,
        at: DateTime<Utc>,
    ) -> Result<usize, StoreError>;

    /// 设置 forceLogout 标记，状态文档不存在时返回 NotFound
    async fn request_force_logout(&self, client: &UserId) -> Result<(), StoreError>;

    /// client 登出：删除对话消息和状态文档，返回删除的消息数
    async fn end_client_session(&self, conversation: &ConversationId)
        -> Result<usize, StoreError>;
}
