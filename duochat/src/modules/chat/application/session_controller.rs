use chrono::Utc;
use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use super::commands::{
    EndSessionCommand, EndSessionHandler, EndSessionResponse, ForceLogoutCommand,
    ForceLogoutHandler, SendMessageCommand, SendMessageHandler, SendOutcome, SignInCommand,
    SignInHandler, SignInResponse,
};
use super::settings::SessionSettings;
use super::{ApplicationError, CommandHandler};
use crate::modules::auth::{AuthService, AuthUser};
use crate::modules::chat::domain::{
    ChatDomainEvent, ClientStatus, ConversationId, CounterResetEvent, ForceLogoutRequestedEvent,
    HoldAction, Message, MessagesUpdatedEvent, Role, SessionEvent, SessionState,
    SessionStateChangedEvent, SessionTerminatedEvent, StatusUpdatedEvent, TerminationReason,
};
use crate::modules::chat::infrastructure::HoldTimer;
use crate::modules::chat::ports::ConversationStore;
use crate::modules::store::Subscription;

/// 领域事件通道容量
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// 会话视图快照
#[derive(Debug, Clone, Default)]
pub struct SessionView {
    state: SessionState,
    user: Option<AuthUser>,
    role: Option<Role>,
    conversation: Option<ConversationId>,
    status: Option<ClientStatus>,
    messages: Vec<Message>,
}

impl SessionView {
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn user(&self) -> Option<&AuthUser> {
        self.user.as_ref()
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn conversation(&self) -> Option<&ConversationId> {
        self.conversation.as_ref()
    }

    /// 最近同步到的 client 状态
    pub fn status(&self) -> Option<&ClientStatus> {
        self.status.as_ref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }
}

struct Inner {
    auth: Arc<dyn AuthService>,
    settings: SessionSettings,
    conversations: Arc<dyn ConversationStore>,
    sign_in_handler: SignInHandler,
    send_handler: SendMessageHandler,
    force_logout_handler: ForceLogoutHandler,
    end_session_handler: EndSessionHandler,
    view: RwLock<SessionView>,
    listeners: Mutex<Option<CancellationToken>>,
    hold_timer: HoldTimer,
    events: broadcast::Sender<ChatDomainEvent>,
    // 串行化状态迁移与写操作
    ops: Mutex<()>,
}

/// 会话控制器
///
/// 持有单个登录会话的全部状态：状态机、当前用户与角色、对话、
/// 同步到的 client 状态和消息缓冲。所有写操作先检查状态，
/// 会话结束后一律返回 NotAuthenticated。
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

impl SessionController {
    /// 创建控制器，必须在 tokio 运行时内调用
    pub fn new(
        auth: Arc<dyn AuthService>,
        conversations: Arc<dyn ConversationStore>,
        settings: SessionSettings,
    ) -> Self {
        let (fire_tx, mut fire_rx) = mpsc::unbounded_channel::<()>();
        let hold_timer = HoldTimer::new(settings.hold_timeout, move || {
            let _ = fire_tx.send(());
        });
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let inner = Arc::new(Inner {
            sign_in_handler: SignInHandler::new(
                auth.clone(),
                conversations.clone(),
                settings.role_resolver(),
                settings.master_uid.clone(),
            ),
            send_handler: SendMessageHandler::new(conversations.clone(), settings.gating_policy()),
            force_logout_handler: ForceLogoutHandler::new(conversations.clone()),
            end_session_handler: EndSessionHandler::new(conversations.clone()),
            auth,
            settings,
            conversations,
            view: RwLock::new(SessionView::default()),
            listeners: Mutex::new(None),
            hold_timer,
            events,
            ops: Mutex::new(()),
        });

        // 计时器触发后由独立任务结束会话
        let weak = Arc::downgrade(&inner);
        tokio::spawn(async move {
            while fire_rx.recv().await.is_some() {
                let Some(controller) = Self::upgrade(&weak) else {
                    break;
                };
                if let Err(e) = controller.terminate(TerminationReason::HoldTimeout).await {
                    tracing::error!("[SessionController] Hold timeout logout failed: {}", e);
                }
            }
        });

        Self { inner }
    }

    fn upgrade(weak: &Weak<Inner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.inner.settings
    }

    /// 当前视图快照
    pub async fn view(&self) -> SessionView {
        self.inner.view.read().await.clone()
    }

    pub async fn state(&self) -> SessionState {
        self.inner.view.read().await.state
    }

    /// 订阅领域事件
    pub fn subscribe(&self) -> broadcast::Receiver<ChatDomainEvent> {
        self.inner.events.subscribe()
    }

    pub async fn is_hold_armed(&self) -> bool {
        self.inner.hold_timer.is_armed().await
    }

    fn emit(&self, event: ChatDomainEvent) {
        // 没有订阅者时发送失败是正常情况
        let _ = self.inner.events.send(event);
    }

    /// 推进状态机，调用方需持有 ops 锁
    async fn transition(&self, event: SessionEvent) -> Result<SessionState, ApplicationError> {
        let (from, to) = {
            let mut view = self.inner.view.write().await;
            let from = view.state;
            let to = from.transition(event)?;
            view.state = to;
            (from, to)
        };

        tracing::debug!("[SessionController] {:?} -> {:?}", from, to);
        self.emit(ChatDomainEvent::SessionStateChanged(
            SessionStateChangedEvent {
                from,
                to,
                timestamp: Utc::now(),
            },
        ));
        Ok(to)
    }

    /// 登录
    pub async fn sign_in(&self, command: SignInCommand) -> Result<SignInResponse, ApplicationError> {
        let _guard = self.inner.ops.lock().await;
        self.transition(SessionEvent::SignInStarted).await?;

        let response = match self.inner.sign_in_handler.handle(command).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("[SessionController] Sign-in failed: {}", e);
                self.transition(SessionEvent::SignInFailed).await?;
                return Err(e);
            }
        };

        if let Err(e) = self.attach(&response).await {
            tracing::error!("[SessionController] Failed to attach listeners: {}", e);
            if let Err(sign_out_err) = self.inner.auth.sign_out().await {
                tracing::warn!("[SessionController] Sign-out after failed attach: {}", sign_out_err);
            }
            *self.inner.view.write().await = SessionView {
                state: SessionState::Authenticating,
                ..Default::default()
            };
            self.transition(SessionEvent::SignInFailed).await?;
            return Err(e);
        }

        self.transition(SessionEvent::SignedIn(response.role)).await?;
        Ok(response)
    }

    /// 载入初始数据并启动消息与状态订阅
    async fn attach(&self, response: &SignInResponse) -> Result<(), ApplicationError> {
        let conversations = &self.inner.conversations;
        let conversation = &response.conversation;
        let limit = self.inner.settings.message_limit;

        let messages_sub = conversations.watch_messages(conversation, limit).await?;
        let status_sub = conversations
            .watch_client_status(conversation.client())
            .await?;
        let status = conversations.client_status(conversation.client()).await?;
        let messages = conversations.recent_messages(conversation, limit).await?;

        {
            let mut view = self.inner.view.write().await;
            view.user = Some(response.user.clone());
            view.role = Some(response.role);
            view.conversation = Some(conversation.clone());
            view.status = status;
            view.messages = messages;
        }

        let token = CancellationToken::new();
        if let Some(previous) = self.inner.listeners.lock().await.replace(token.clone()) {
            previous.cancel();
        }

        self.spawn_message_listener(messages_sub, conversation.clone(), token.clone());
        self.spawn_status_listener(status_sub, conversation.clone(), response.role, token.clone());
        self.spawn_auth_listener(response.user.clone(), token);
        Ok(())
    }

    /// 认证服务侧登出或换号时结束会话
    fn spawn_auth_listener(&self, user: AuthUser, token: CancellationToken) {
        let mut auth_state = self.inner.auth.watch_auth_state();
        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    changed = auth_state.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
                let still_signed_in = auth_state
                    .borrow_and_update()
                    .as_ref()
                    .is_some_and(|current| current.uid() == user.uid());
                if still_signed_in {
                    continue;
                }
                let Some(controller) = Self::upgrade(&weak) else {
                    break;
                };

                tracing::info!("[SessionController] {} signed out externally", user.uid());
                if let Err(e) = controller.terminate(TerminationReason::SignedOut).await {
                    tracing::error!("[SessionController] External sign-out cleanup failed: {}", e);
                }
                break;
            }
            tracing::trace!("[SessionController] Auth listener stopped");
        });
    }

    fn spawn_message_listener(
        &self,
        mut subscription: Subscription<Vec<Message>>,
        conversation: ConversationId,
        token: CancellationToken,
    ) {
        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            loop {
                let messages = tokio::select! {
                    _ = token.cancelled() => break,
                    next = subscription.recv() => match next {
                        Some(messages) => messages,
                        None => break,
                    },
                };
                let Some(controller) = Self::upgrade(&weak) else {
                    break;
                };

                {
                    let mut view = controller.inner.view.write().await;
                    if token.is_cancelled() {
                        break;
                    }
                    view.messages = messages.clone();
                }
                controller.emit(ChatDomainEvent::MessagesUpdated(MessagesUpdatedEvent::new(
                    &conversation,
                    messages,
                )));
            }
            tracing::trace!("[SessionController] Message listener stopped");
        });
    }

    fn spawn_status_listener(
        &self,
        mut subscription: Subscription<Option<ClientStatus>>,
        conversation: ConversationId,
        role: Role,
        token: CancellationToken,
    ) {
        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            loop {
                let status = tokio::select! {
                    _ = token.cancelled() => break,
                    next = subscription.recv() => match next {
                        Some(status) => status,
                        None => break,
                    },
                };
                let Some(controller) = Self::upgrade(&weak) else {
                    break;
                };

                {
                    let mut view = controller.inner.view.write().await;
                    if token.is_cancelled() {
                        break;
                    }
                    view.status = status.clone();
                }
                let force_logout = status.as_ref().is_some_and(|s| s.force_logout());
                controller.emit(ChatDomainEvent::StatusUpdated(StatusUpdatedEvent {
                    client_uid: conversation.client().clone(),
                    status,
                    timestamp: Utc::now(),
                }));

                if role.is_client() && force_logout {
                    tracing::info!(
                        "[SessionController] Force logout observed for {}",
                        conversation.client()
                    );
                    if let Err(e) = controller.terminate(TerminationReason::ForcedLogout).await {
                        tracing::error!("[SessionController] Forced logout failed: {}", e);
                    }
                    break;
                }
            }
            tracing::trace!("[SessionController] Status listener stopped");
        });
    }

    /// 发送消息
    pub async fn send(&self, text: &str) -> Result<SendOutcome, ApplicationError> {
        let _guard = self.inner.ops.lock().await;
        let mut command = {
            let view = self.inner.view.read().await;
            match (&view.user, view.role, &view.conversation) {
                (Some(user), Some(role), Some(conversation)) if view.state.is_active() => {
                    SendMessageCommand {
                        sender: user.uid().clone(),
                        role,
                        conversation: conversation.clone(),
                        status: view.status.clone(),
                        text: text.to_string(),
                    }
                }
                _ => return Err(ApplicationError::NotAuthenticated),
            }
        };
        let client_uid = command.conversation.client().clone();
        // client 以存储中的最新计数为准，本地快照可能落后
        if command.role.is_client() {
            command.status = self.inner.conversations.client_status(&client_uid).await?;
        }
        let sent_from = command.status.as_ref().map(ClientStatus::msg_count);

        let outcome = self.inner.send_handler.handle(command).await?;

        // 本地先行更新计数，服务端快照到达后覆盖
        {
            let mut view = self.inner.view.write().await;
            if let Some(status) = view.status.as_mut() {
                match (&outcome, sent_from) {
                    (SendOutcome::Delivered { counted: true, .. }, Some(from)) => {
                        status.set_msg_count(status.msg_count().max(from + 1));
                    }
                    (SendOutcome::Unlocked { .. }, _) => status.set_msg_count(0),
                    _ => {}
                }
            }
        }

        if let SendOutcome::Unlocked { .. } = &outcome {
            self.emit(ChatDomainEvent::CounterReset(CounterResetEvent {
                client_uid,
                timestamp: Utc::now(),
            }));
        }
        Ok(outcome)
    }

    /// Master 强制 client 登出
    pub async fn force_logout_client(&self) -> Result<(), ApplicationError> {
        let _guard = self.inner.ops.lock().await;
        let (role, client) = {
            let view = self.inner.view.read().await;
            match (view.role, &view.conversation) {
                (Some(role), Some(conversation)) if view.state.is_active() => {
                    (role, conversation.client().clone())
                }
                _ => return Err(ApplicationError::NotAuthenticated),
            }
        };

        self.inner
            .force_logout_handler
            .handle(ForceLogoutCommand {
                requester_role: role,
                client: client.clone(),
            })
            .await?;

        self.emit(ChatDomainEvent::ForceLogoutRequested(
            ForceLogoutRequestedEvent {
                client_uid: client,
                timestamp: Utc::now(),
            },
        ));
        Ok(())
    }

    /// 用户主动登出
    pub async fn logout(&self) -> Result<Option<SessionTerminatedEvent>, ApplicationError> {
        self.terminate(TerminationReason::UserLogout).await
    }

    /// 结束会话
    ///
    /// 幂等：会话不处于登录状态时返回 Ok(None)。client 会话先删除
    /// 对话与状态文档再登出；删除失败时仍完成登出并返回该错误。
    pub async fn terminate(
        &self,
        reason: TerminationReason,
    ) -> Result<Option<SessionTerminatedEvent>, ApplicationError> {
        let _guard = self.inner.ops.lock().await;
        let (role, conversation) = {
            let view = self.inner.view.read().await;
            if !view.state.is_active() {
                tracing::debug!(
                    "[SessionController] Ignoring {:?} in state {:?}",
                    reason,
                    view.state
                );
                return Ok(None);
            }
            (view.role, view.conversation.clone())
        };

        self.transition(SessionEvent::LogoutStarted).await?;
        self.stop_background().await;

        let purge = match (role, conversation) {
            (Some(role), Some(conversation)) => {
                self.inner
                    .end_session_handler
                    .handle(EndSessionCommand { role, conversation })
                    .await
            }
            _ => Ok(EndSessionResponse {
                deleted_messages: 0,
            }),
        };
        if let Err(e) = &purge {
            tracing::error!("[SessionController] Failed to purge session data: {}", e);
        }

        if let Err(e) = self.inner.auth.sign_out().await {
            tracing::warn!("[SessionController] Sign-out failed: {}", e);
        }

        {
            let mut view = self.inner.view.write().await;
            *view = SessionView {
                state: view.state,
                ..Default::default()
            };
        }
        self.transition(SessionEvent::LoggedOut).await?;

        let event = SessionTerminatedEvent {
            reason,
            deleted_messages: purge
                .as_ref()
                .map(|response| response.deleted_messages)
                .unwrap_or(0),
            timestamp: Utc::now(),
        };
        tracing::info!(
            "[SessionController] Session terminated ({:?}), {} message(s) deleted",
            reason,
            event.deleted_messages
        );
        self.emit(ChatDomainEvent::SessionTerminated(event.clone()));

        purge?;
        Ok(Some(event))
    }

    /// 按下按钮
    pub async fn press_hold(&self) -> Result<HoldAction, ApplicationError> {
        self.apply_hold(self.inner.settings.hold_mode.on_press())
            .await
    }

    /// 松开按钮
    pub async fn release_hold(&self) -> Result<HoldAction, ApplicationError> {
        self.apply_hold(self.inner.settings.hold_mode.on_release())
            .await
    }

    async fn apply_hold(&self, action: HoldAction) -> Result<HoldAction, ApplicationError> {
        let _guard = self.inner.ops.lock().await;
        if !self.inner.view.read().await.state.is_active() {
            return Err(ApplicationError::NotAuthenticated);
        }

        match action {
            HoldAction::Arm => self.inner.hold_timer.start().await,
            HoldAction::Disarm => {
                self.inner.hold_timer.cancel().await;
            }
        }
        Ok(action)
    }

    /// 停止订阅和计时器，不登出
    pub async fn detach(&self) {
        let _guard = self.inner.ops.lock().await;
        self.stop_background().await;
    }

    async fn stop_background(&self) {
        if let Some(token) = self.inner.listeners.lock().await.take() {
            token.cancel();
        }
        self.inner.hold_timer.cancel().await;
    }
}
