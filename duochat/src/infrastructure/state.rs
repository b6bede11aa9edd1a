use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};

use super::{AppEvent, EventBus};
use crate::modules::auth::{AuthBackend, AuthService, InMemoryAuthService};
use crate::modules::chat::{ChatModule, SessionController, SessionSettings};
use crate::modules::config::{AppConfig, PartialAppConfig};
use crate::modules::room::{RoomModule, RoomSession};
use crate::modules::store::{DocumentStore, FileDocumentStore, InMemoryDocumentStore};
use crate::modules::ConfigModule;
use crate::shared::{AppError, AppResult};

/// 应用全局状态
///
/// 同一进程内可同时打开多个命名会话（例如一个 master 一个 client），
/// 各自拥有独立的认证实例
pub struct AppState {
    pub config: AppConfig,
    pub config_module: Arc<ConfigModule>,
    pub store: Arc<dyn DocumentStore>,
    pub auth_backend: Arc<AuthBackend>,
    pub chat: Arc<ChatModule>,
    pub room: Arc<RoomModule>,
    pub event_bus: Arc<EventBus>,
    sessions: RwLock<BTreeMap<String, SessionController>>,
    active_session: RwLock<Option<String>>,
    room_session: Mutex<Option<Arc<RoomSession>>>,
}

impl AppState {
    /// 读取配置，叠加命令行覆盖项，并按 `storage.persist` 选择文档存储
    pub async fn initialize(
        config_module: ConfigModule,
        overrides: PartialAppConfig,
    ) -> AppResult<Self> {
        let config = Self::load_config(&config_module, overrides).await?;
        Self::open(config, config_module).await
    }

    /// 读取配置并叠加覆盖项，覆盖项不写回
    pub async fn load_config(
        config_module: &ConfigModule,
        overrides: PartialAppConfig,
    ) -> AppResult<AppConfig> {
        let mut config = config_module.get_all().await?;
        config.merge(overrides);
        config
            .validate()
            .map_err(|errors| AppError::ConfigError(errors.join("; ")))?;
        Ok(config)
    }

    pub async fn open(config: AppConfig, config_module: ConfigModule) -> AppResult<Self> {
        let store: Arc<dyn DocumentStore> = if config.storage.persist {
            let store = FileDocumentStore::new(config.storage.data_dir.clone()).await?;
            tracing::info!("[AppState] Documents persisted to {:?}", store.file_path());
            Arc::new(store)
        } else {
            tracing::info!("[AppState] Using in-memory document store");
            Arc::new(InMemoryDocumentStore::new())
        };

        Ok(Self::with_store(config, config_module, store))
    }

    pub fn with_store(
        config: AppConfig,
        config_module: ConfigModule,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        let chat = ChatModule::new(store.clone(), SessionSettings::from(&config.chat));
        let room = RoomModule::from_config(store.clone(), &config.room);

        Self {
            config,
            config_module: Arc::new(config_module),
            store,
            auth_backend: Arc::new(AuthBackend::new()),
            chat: Arc::new(chat),
            room: Arc::new(room),
            event_bus: Arc::new(EventBus::new()),
            sessions: RwLock::new(BTreeMap::new()),
            active_session: RwLock::new(None),
            room_session: Mutex::new(None),
        }
    }

    /// 新的认证实例，共享同一个认证后端
    pub fn new_auth(&self) -> Arc<dyn AuthService> {
        Arc::new(InMemoryAuthService::new(self.auth_backend.clone()))
    }

    /// 注册命名会话并设为当前会话，领域事件转发到事件总线
    pub async fn insert_session(&self, name: &str, controller: SessionController) {
        spawn_forwarder(
            name.to_string(),
            controller.subscribe(),
            self.event_bus.clone(),
        );
        let previous = self
            .sessions
            .write()
            .await
            .insert(name.to_string(), controller);
        if let Some(previous) = previous {
            previous.detach().await;
        }
        *self.active_session.write().await = Some(name.to_string());
    }

    pub async fn session(&self, name: &str) -> Option<SessionController> {
        self.sessions.read().await.get(name).cloned()
    }

    pub async fn remove_session(&self, name: &str) -> Option<SessionController> {
        let removed = self.sessions.write().await.remove(name);
        let mut active = self.active_session.write().await;
        if active.as_deref() == Some(name) {
            *active = None;
        }
        removed
    }

    pub async fn session_names(&self) -> Vec<String> {
        self.sessions.read().await.keys().cloned().collect()
    }

    /// 切换当前会话
    pub async fn set_active(&self, name: &str) -> AppResult<()> {
        if !self.sessions.read().await.contains_key(name) {
            return Err(AppError::SessionNotFound(name.to_string()));
        }
        *self.active_session.write().await = Some(name.to_string());
        Ok(())
    }

    pub async fn active_name(&self) -> Option<String> {
        self.active_session.read().await.clone()
    }

    /// 当前会话
    pub async fn active_controller(&self) -> AppResult<(String, SessionController)> {
        let name = self.active_name().await.ok_or(AppError::NoActiveSession)?;
        let controller = self
            .session(&name)
            .await
            .ok_or_else(|| AppError::SessionNotFound(name.clone()))?;
        Ok((name, controller))
    }

    /// 当前聊天室会话，不存在时创建
    pub async fn room_session(&self) -> Arc<RoomSession> {
        let mut slot = self.room_session.lock().await;
        if let Some(session) = slot.as_ref() {
            return session.clone();
        }
        let session = Arc::new(self.room.open(self.new_auth()));
        let mut events = session.subscribe();
        let bus = self.event_bus.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => bus.publish(AppEvent::Room { event }),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("[AppState] Room forwarder lagged by {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        *slot = Some(session.clone());
        session
    }

    /// 结束所有会话，退出前调用
    pub async fn shutdown(&self) {
        let sessions: Vec<(String, SessionController)> =
            std::mem::take(&mut *self.sessions.write().await)
                .into_iter()
                .collect();
        for (name, controller) in sessions {
            if let Err(e) = controller.logout().await {
                tracing::warn!("[AppState] Logout of session '{}' failed: {}", name, e);
            }
        }
        *self.active_session.write().await = None;

        if let Some(room) = self.room_session.lock().await.take() {
            if let Err(e) = room.leave().await {
                tracing::warn!("[AppState] Leaving room failed: {}", e);
            }
        }
    }
}

fn spawn_forwarder(
    name: String,
    mut events: broadcast::Receiver<crate::modules::chat::ChatDomainEvent>,
    bus: Arc<EventBus>,
) {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => bus.publish(AppEvent::Chat {
                    session: name.clone(),
                    event,
                }),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("[AppState] Session '{}' forwarder lagged by {} events", name, n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        tracing::trace!("[AppState] Forwarder for '{}' stopped", name);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> AppState {
        AppState::with_store(
            AppConfig::default(),
            ConfigModule::new_in_memory(),
            Arc::new(InMemoryDocumentStore::new()),
        )
    }

    #[tokio::test]
    async fn test_initialize_in_memory() {
        let state = AppState::initialize(ConfigModule::new_in_memory(), PartialAppConfig::default())
            .await
            .unwrap();
        assert!(!state.config.storage.persist);
        assert!(state.active_name().await.is_none());
    }

    #[tokio::test]
    async fn test_initialize_rejects_invalid_overrides() {
        let overrides = PartialAppConfig {
            chat: Some(crate::modules::config::PartialChatConfig {
                client_uid: Some("master".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let result = AppState::initialize(ConfigModule::new_in_memory(), overrides).await;
        assert!(matches!(result, Err(AppError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_initialize_with_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let overrides = PartialAppConfig {
            storage: Some(crate::modules::config::PartialStorageConfig {
                persist: Some(true),
                data_dir: Some(dir.path().to_path_buf()),
            }),
            ..Default::default()
        };
        let state = AppState::initialize(ConfigModule::new_in_memory(), overrides)
            .await
            .unwrap();
        assert!(state.config.storage.persist);
    }

    #[tokio::test]
    async fn test_session_registry() {
        let state = state();
        assert!(matches!(
            state.active_controller().await,
            Err(AppError::NoActiveSession)
        ));

        let controller = state.chat.open_session(state.new_auth());
        state.insert_session("a", controller).await;
        let controller = state.chat.open_session(state.new_auth());
        state.insert_session("b", controller).await;

        assert_eq!(state.active_name().await.as_deref(), Some("b"));
        state.set_active("a").await.unwrap();
        assert_eq!(state.active_controller().await.unwrap().0, "a");
        assert!(state.set_active("zzz").await.is_err());

        state.remove_session("a").await;
        assert!(state.active_name().await.is_none());
        assert_eq!(state.session_names().await, vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn test_room_session_is_shared() {
        let state = state();
        let first = state.room_session().await;
        let second = state.room_session().await;
        assert!(Arc::ptr_eq(&first, &second));
    }
}
