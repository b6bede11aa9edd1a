use async_trait::async_trait;
use std::sync::Arc;

use super::super::{ApplicationError, CommandHandler};
use crate::modules::auth::UserId;
use crate::modules::chat::domain::Role;
use crate::modules::chat::ports::ConversationStore;

/// 强制登出命令（仅 master）
#[derive(Debug, Clone)]
pub struct ForceLogoutCommand {
    pub requester_role: Role,
    pub client: UserId,
}

/// 强制登出命令处理器
///
/// 只设置状态标记，client 端通过订阅观察到后自行终止会话
pub struct ForceLogoutHandler {
    conversations: Arc<dyn ConversationStore>,
}

impl ForceLogoutHandler {
    pub fn new(conversations: Arc<dyn ConversationStore>) -> Self {
        Self { conversations }
    }
}

#[async_trait]
impl CommandHandler<ForceLogoutCommand, ()> for ForceLogoutHandler {
    async fn handle(&self, command: ForceLogoutCommand) -> Result<(), ApplicationError> {
        if command.requester_role != Role::Master {
            return Err(ApplicationError::Forbidden(
                "only the master can force a logout".to_string(),
            ));
        }

        self.conversations
            .request_force_logout(&command.client)
            .await?;
        tracing::info!("[ForceLogoutHandler] Force logout requested for {}", command.client);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::chat::domain::ConversationId;
    use crate::modules::chat::infrastructure::DocumentConversationStore;
    use crate::modules::store::{InMemoryDocumentStore, StoreError};
    use chrono::Utc;

    #[tokio::test]
    async fn test_force_logout_sets_flag() {
        let store = Arc::new(DocumentConversationStore::new(Arc::new(
            InMemoryDocumentStore::new(),
        )));
        let conv = ConversationId::new(UserId::from("m"), UserId::from("c"));
        store.begin_client_session(&conv, Utc::now()).await.unwrap();
        let handler = ForceLogoutHandler::new(store.clone());

        handler
            .handle(ForceLogoutCommand {
                requester_role: Role::Master,
                client: UserId::from("c"),
            })
            .await
            .unwrap();

        let status = store.client_status(&UserId::from("c")).await.unwrap().unwrap();
        assert!(status.force_logout());
    }

    #[tokio::test]
    async fn test_client_cannot_force_logout() {
        let store = Arc::new(DocumentConversationStore::new(Arc::new(
            InMemoryDocumentStore::new(),
        )));
        let handler = ForceLogoutHandler::new(store);

        let result = handler
            .handle(ForceLogoutCommand {
                requester_role: Role::Client,
                client: UserId::from("c"),
            })
            .await;
        assert!(matches!(result, Err(ApplicationError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_missing_status_is_not_found() {
        let store = Arc::new(DocumentConversationStore::new(Arc::new(
            InMemoryDocumentStore::new(),
        )));
        let handler = ForceLogoutHandler::new(store);

        let result = handler
            .handle(ForceLogoutCommand {
                requester_role: Role::Master,
                client: UserId::from("nobody"),
            })
            .await;
        assert!(matches!(
            result,
            Err(ApplicationError::StoreError(StoreError::NotFound(_)))
        ));
    }
}
