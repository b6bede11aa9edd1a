use async_trait::async_trait;
use std::sync::Arc;

use super::super::{ApplicationError, CommandHandler};
use crate::modules::auth::UserId;
use crate::modules::chat::domain::{
    ClientStatus, ConversationId, GatingPolicy, Message, Role, SendDecision, UNLOCK_NOTICE,
};
use crate::modules::chat::ports::ConversationStore;

/// 发送消息命令
#[derive(Debug, Clone)]
pub struct SendMessageCommand {
    pub sender: UserId,
    pub role: Role,
    pub conversation: ConversationId,
    /// 发送方本地同步到的 client 状态
    pub status: Option<ClientStatus>,
    pub text: String,
}

/// 发送结果
#[derive(Debug, Clone)]
pub enum SendOutcome {
    /// 普通消息已写入
    Delivered { message: Message, counted: bool },
    /// 特殊口令：计数已清零，系统通知已写入
    Unlocked { notice: Message },
}

/// 发送消息命令处理器
pub struct SendMessageHandler {
    conversations: Arc<dyn ConversationStore>,
    policy: GatingPolicy,
}

impl SendMessageHandler {
    pub fn new(conversations: Arc<dyn ConversationStore>, policy: GatingPolicy) -> Self {
        Self {
            conversations,
            policy,
        }
    }

    pub fn policy(&self) -> &GatingPolicy {
        &self.policy
    }
}

#[async_trait]
impl CommandHandler<SendMessageCommand, SendOutcome> for SendMessageHandler {
    async fn handle(&self, command: SendMessageCommand) -> Result<SendOutcome, ApplicationError> {
        let decision = self
            .policy
            .evaluate(command.role, command.status.as_ref(), &command.text);

        match decision {
            SendDecision::Reject(reason) => {
                tracing::debug!("[SendMessageHandler] Rejected send from {}: {}", command.sender, reason);
                Err(reason.into())
            }
            SendDecision::Unlock => {
                let notice = Message::system_notice(UNLOCK_NOTICE);
                self.conversations
                    .reset_counter(&command.conversation, &notice)
                    .await?;
                tracing::info!("[SendMessageHandler] Counter reset for {}", command.sender);
                Ok(SendOutcome::Unlocked { notice })
            }
            SendDecision::Deliver { counted } => {
                let message = Message::compose(command.sender, command.text.trim());
                if counted {
                    self.conversations
                        .append_counted_message(&command.conversation, &message)
                        .await?;
                } else {
                    self.conversations
                        .append_message(&command.conversation, &message)
                        .await?;
                }
                Ok(SendOutcome::Delivered { message, counted })
            }
        }
    }
}
