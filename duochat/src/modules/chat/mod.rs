// Chat Module - 聊天模块
//
// 实现六边形架构（Hexagonal Architecture）：
// - domain: 领域层，包含实体、值对象、门控策略、会话状态机和领域事件
// - ports: 端口层，定义对话存储的抽象接口
// - infrastructure: 基础设施层，基于文档存储的对话存储与自动登出计时器
// - application: 应用层，实现 CQRS 命令和查询处理器以及会话控制器

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;

// 重新导出常用类型
pub use application::{
    // Traits
    ApplicationError,
    CommandHandler,
    // Commands
    Credential,
    EndSessionCommand,
    EndSessionHandler,
    EndSessionResponse,
    ForceLogoutCommand,
    ForceLogoutHandler,
    SendMessageCommand,
    SendMessageHandler,
    SendOutcome,
    SignInCommand,
    SignInHandler,
    SignInResponse,
    // Queries
    GetClientStatusHandler,
    GetClientStatusQuery,
    GetClientStatusResponse,
    ListMessagesHandler,
    ListMessagesQuery,
    ListMessagesResponse,
    QueryHandler,
    // Session
    SessionController,
    SessionSettings,
    SessionView,
};

pub use domain::{
    ChatDomainEvent, ClientStatus, ConversationId, GatingPolicy, HoldAction, HoldMode, Message,
    MessageId, RejectReason, Role, RoleResolver, SessionState, TerminationReason,
};

pub use infrastructure::{DocumentConversationStore, HoldTimer};

pub use ports::ConversationStore;

use std::sync::Arc;

use crate::modules::auth::{AuthService, UserId};
use crate::modules::store::DocumentStore;

/// Chat 模块容器
///
/// 管理模块内的依赖注入，每次登录通过 `open_session` 获得独立的会话控制器
pub struct ChatModule {
    settings: SessionSettings,
    conversations: Arc<dyn ConversationStore>,
    // Handlers
    list_messages_handler: ListMessagesHandler,
    get_client_status_handler: GetClientStatusHandler,
}

impl ChatModule {
    /// 基于文档存储创建 ChatModule
    pub fn new(store: Arc<dyn DocumentStore>, settings: SessionSettings) -> Self {
        let conversations: Arc<dyn ConversationStore> =
            Arc::new(DocumentConversationStore::new(store));
        Self::with_conversation_store(conversations, settings)
    }

    /// 使用自定义对话存储创建 ChatModule
    pub fn with_conversation_store(
        conversations: Arc<dyn ConversationStore>,
        settings: SessionSettings,
    ) -> Self {
        let list_messages_handler = ListMessagesHandler::new(conversations.clone());
        let get_client_status_handler =
            GetClientStatusHandler::new(conversations.clone(), settings.gating_policy());

        Self {
            settings,
            conversations,
            list_messages_handler,
            get_client_status_handler,
        }
    }

    /// 为一个认证实例创建会话控制器
    pub fn open_session(&self, auth: Arc<dyn AuthService>) -> SessionController {
        SessionController::new(auth, self.conversations.clone(), self.settings.clone())
    }

    // Query handlers

    /// 列出对话的最近消息
    pub async fn list_messages(
        &self,
        query: ListMessagesQuery,
    ) -> Result<ListMessagesResponse, ApplicationError> {
        self.list_messages_handler.handle(query).await
    }

    /// 获取 client 状态
    pub async fn client_status(
        &self,
        client: UserId,
    ) -> Result<GetClientStatusResponse, ApplicationError> {
        self.get_client_status_handler
            .handle(GetClientStatusQuery::new(client))
            .await
    }

    // Accessors

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// 默认 master/client 对话
    pub fn default_conversation(&self) -> ConversationId {
        ConversationId::new(
            self.settings.master_uid.clone(),
            self.settings.client_uid.clone(),
        )
    }

    pub fn conversations(&self) -> &Arc<dyn ConversationStore> {
        &self.conversations
    }
}
