use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use super::super::{ApplicationError, CommandHandler};
use crate::modules::auth::{AuthService, AuthUser, UserId};
use crate::modules::chat::domain::{ConversationId, Role, RoleResolver};
use crate::modules::chat::ports::ConversationStore;

/// 登录凭据
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Anonymous,
    CustomToken(String),
}

/// 登录命令
#[derive(Debug, Clone)]
pub struct SignInCommand {
    pub credential: Credential,
}

impl SignInCommand {
    pub fn new(credential: Credential) -> Self {
        Self { credential }
    }

    pub fn anonymous() -> Self {
        Self::new(Credential::Anonymous)
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self::new(Credential::CustomToken(token.into()))
    }
}

/// 登录响应
#[derive(Debug, Clone)]
pub struct SignInResponse {
    pub user: AuthUser,
    pub role: Role,
    pub conversation: ConversationId,
    /// client 登录时清除的历史消息数
    pub cleared_messages: usize,
}

/// 登录命令处理器
///
/// 认证后解析角色；client 登录时在一个批次中清空对话并重置状态
pub struct SignInHandler {
    auth: Arc<dyn AuthService>,
    conversations: Arc<dyn ConversationStore>,
    resolver: RoleResolver,
    master_uid: UserId,
}

impl SignInHandler {
    pub fn new(
        auth: Arc<dyn AuthService>,
        conversations: Arc<dyn ConversationStore>,
        resolver: RoleResolver,
        master_uid: UserId,
    ) -> Self {
        Self {
            auth,
            conversations,
            resolver,
            master_uid,
        }
    }

    fn conversation_for(&self, user: &AuthUser, role: Role) -> ConversationId {
        match role {
            Role::Client => ConversationId::new(self.master_uid.clone(), user.uid().clone()),
            Role::Master => {
                ConversationId::new(user.uid().clone(), self.resolver.client_uid().clone())
            }
        }
    }
}

#[async_trait]
impl CommandHandler<SignInCommand, SignInResponse> for SignInHandler {
    async fn handle(&self, command: SignInCommand) -> Result<SignInResponse, ApplicationError> {
        let user = match &command.credential {
            Credential::Anonymous => self.auth.sign_in_anonymously().await?,
            Credential::CustomToken(token) => self.auth.sign_in_with_custom_token(token).await?,
        };

        let role = self.resolver.resolve(&user);
        let conversation = self.conversation_for(&user, role);

        let cleared_messages = match role {
            Role::Client => {
                match self
                    .conversations
                    .begin_client_session(&conversation, Utc::now())
                    .await
                {
                    Ok(cleared) => cleared,
                    Err(e) => {
                        tracing::error!("[SignInHandler] Login reset failed for {}: {}", user.uid(), e);
                        if let Err(sign_out_err) = self.auth.sign_out().await {
                            tracing::warn!("[SignInHandler] Sign-out after failed reset: {}", sign_out_err);
                        }
                        return Err(e.into());
                    }
                }
            }
            Role::Master => 0,
        };

        tracing::info!(
            "[SignInHandler] {} signed in as {} ({})",
            user.uid(),
            role,
            conversation
        );

        Ok(SignInResponse {
            user,
            role,
            conversation,
            cleared_messages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::auth::{AuthBackend, Claims, InMemoryAuthService};
    use crate::modules::chat::domain::Message;
    use crate::modules::chat::infrastructure::DocumentConversationStore;
    use crate::modules::store::InMemoryDocumentStore;

    struct Fixture {
        backend: Arc<AuthBackend>,
        auth: Arc<InMemoryAuthService>,
        conversations: Arc<DocumentConversationStore>,
        handler: SignInHandler,
    }

    fn fixture() -> Fixture {
        let backend = Arc::new(AuthBackend::new());
        let auth = Arc::new(InMemoryAuthService::new(backend.clone()));
        let conversations = Arc::new(DocumentConversationStore::new(Arc::new(
            InMemoryDocumentStore::new(),
        )));
        let handler = SignInHandler::new(
            auth.clone(),
            conversations.clone(),
            RoleResolver::new(UserId::from("client")),
            UserId::from("master"),
        );
        Fixture {
            backend,
            auth,
            conversations,
            handler,
        }
    }

    #[tokio::test]
    async fn test_client_sign_in_resets_conversation() {
        let f = fixture();
        let conv = ConversationId::new(UserId::from("master"), UserId::from("client"));
        f.conversations
            .append_message(&conv, &Message::compose(UserId::from("master"), "old"))
            .await
            .unwrap();

        let token = f
            .backend
            .mint_custom_token(UserId::from("client"), Claims::new())
            .await;
        let response = f.handler.handle(SignInCommand::with_token(token)).await.unwrap();

        assert_eq!(response.role, Role::Client);
        assert_eq!(response.conversation, conv);
        assert_eq!(response.cleared_messages, 1);

        let status = f
            .conversations
            .client_status(&UserId::from("client"))
            .await
            .unwrap()
            .unwrap();
        assert!(status.is_logged_in());
        assert_eq!(status.msg_count(), 0);
    }

    #[tokio::test]
    async fn test_anonymous_sign_in_is_master() {
        let f = fixture();
        let response = f.handler.handle(SignInCommand::anonymous()).await.unwrap();

        assert_eq!(response.role, Role::Master);
        assert_eq!(response.conversation.client().as_str(), "client");
        assert_eq!(response.cleared_messages, 0);
        assert!(f.auth.current_user().is_some());
    }

    #[tokio::test]
    async fn test_invalid_token_leaves_signed_out() {
        let f = fixture();
        let result = f.handler.handle(SignInCommand::with_token("bogus")).await;

        assert!(matches!(result, Err(ApplicationError::AuthError(_))));
        assert!(f.auth.current_user().is_none());
    }
}
