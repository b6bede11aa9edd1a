use async_trait::async_trait;
use std::sync::Arc;

use super::super::{ApplicationError, QueryHandler};
use crate::modules::auth::UserId;
use crate::modules::chat::domain::{ClientStatus, GatingPolicy};
use crate::modules::chat::ports::ConversationStore;

/// 获取 client 状态查询
#[derive(Debug, Clone)]
pub struct GetClientStatusQuery {
    pub client: UserId,
}

impl GetClientStatusQuery {
    pub fn new(client: UserId) -> Self {
        Self { client }
    }
}

/// 获取 client 状态响应
#[derive(Debug, Clone)]
pub struct GetClientStatusResponse {
    pub status: Option<ClientStatus>,
    /// 锁定前剩余可发送条数
    pub remaining: Option<u32>,
}

/// 获取 client 状态查询处理器
pub struct GetClientStatusHandler {
    conversations: Arc<dyn ConversationStore>,
    policy: GatingPolicy,
}

impl GetClientStatusHandler {
    pub fn new(conversations: Arc<dyn ConversationStore>, policy: GatingPolicy) -> Self {
        Self {
            conversations,
            policy,
        }
    }
}

#[async_trait]
impl QueryHandler<GetClientStatusQuery, GetClientStatusResponse> for GetClientStatusHandler {
    async fn handle(
        &self,
        query: GetClientStatusQuery,
    ) -> Result<GetClientStatusResponse, ApplicationError> {
        let status = self.conversations.client_status(&query.client).await?;
        let remaining = status.as_ref().map(|s| self.policy.remaining(s));
        Ok(GetClientStatusResponse { status, remaining })
    }
}
