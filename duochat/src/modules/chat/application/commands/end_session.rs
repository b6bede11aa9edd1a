use async_trait::async_trait;
use std::sync::Arc;

use super::super::{ApplicationError, CommandHandler};
use crate::modules::chat::domain::{ConversationId, Role};
use crate::modules::chat::ports::ConversationStore;

/// 结束会话命令
#[derive(Debug, Clone)]
pub struct EndSessionCommand {
    pub role: Role,
    pub conversation: ConversationId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndSessionResponse {
    pub deleted_messages: usize,
}

/// 结束会话命令处理器
///
/// client 结束时删除对话消息和状态文档；master 结束不触碰存储
pub struct EndSessionHandler {
    conversations: Arc<dyn ConversationStore>,
}

impl EndSessionHandler {
    pub fn new(conversations: Arc<dyn ConversationStore>) -> Self {
        Self { conversations }
    }
}

#[async_trait]
impl CommandHandler<EndSessionCommand, EndSessionResponse> for EndSessionHandler {
    async fn handle(
        &self,
        command: EndSessionCommand,
    ) -> Result<EndSessionResponse, ApplicationError> {
        let deleted_messages = match command.role {
            Role::Client => {
                self.conversations
                    .end_client_session(&command.conversation)
                    .await?
            }
            Role::Master => 0,
        };

        Ok(EndSessionResponse { deleted_messages })
    }
}
