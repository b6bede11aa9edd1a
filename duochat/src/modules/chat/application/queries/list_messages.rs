use async_trait::async_trait;
use std::sync::Arc;

use super::super::{ApplicationError, QueryHandler};
use crate::modules::chat::domain::{ConversationId, Message};
use crate::modules::chat::ports::ConversationStore;

/// 默认消息窗口大小
pub const DEFAULT_MESSAGE_LIMIT: usize = 50;

/// 列出消息查询（最近 `limit` 条，时间升序）
#[derive(Debug, Clone)]
pub struct ListMessagesQuery {
    pub conversation: ConversationId,
    pub limit: usize,
}

impl ListMessagesQuery {
    pub fn new(conversation: ConversationId, limit: usize) -> Self {
        Self {
            conversation,
            limit,
        }
    }

    pub fn for_conversation(conversation: ConversationId) -> Self {
        Self::new(conversation, DEFAULT_MESSAGE_LIMIT)
    }
}

/// 列出消息响应
#[derive(Debug, Clone)]
pub struct ListMessagesResponse {
    pub messages: Vec<Message>,
}

/// 列出消息查询处理器
pub struct ListMessagesHandler {
    conversations: Arc<dyn ConversationStore>,
}

impl ListMessagesHandler {
    pub fn new(conversations: Arc<dyn ConversationStore>) -> Self {
        Self { conversations }
    }
}

#[async_trait]
impl QueryHandler<ListMessagesQuery, ListMessagesResponse> for ListMessagesHandler {
    async fn handle(
        &self,
        query: ListMessagesQuery,
    ) -> Result<ListMessagesResponse, ApplicationError> {
        if query.limit == 0 {
            return Err(ApplicationError::ValidationError(
                "limit must be at least 1".to_string(),
            ));
        }

        let messages = self
            .conversations
            .recent_messages(&query.conversation, query.limit)
            .await?;
        Ok(ListMessagesResponse { messages })
    }
}
