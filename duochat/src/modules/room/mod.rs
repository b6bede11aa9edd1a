// Room Module - 开放聊天室模块
//
// 任何人匿名加入，消息不做门控也不随离开删除

pub mod domain;
pub mod session;

pub use domain::{RoomError, RoomEvent, RoomId};
pub use session::RoomSession;

use std::sync::Arc;

use crate::modules::auth::AuthService;
use crate::modules::config::RoomConfig;
use crate::modules::store::DocumentStore;

/// Room 模块容器
pub struct RoomModule {
    store: Arc<dyn DocumentStore>,
    room_id: RoomId,
    message_limit: usize,
}

impl RoomModule {
    pub fn new(store: Arc<dyn DocumentStore>, room_id: RoomId, message_limit: usize) -> Self {
        Self {
            store,
            room_id,
            message_limit,
        }
    }

    /// 从配置创建
    pub fn from_config(store: Arc<dyn DocumentStore>, config: &RoomConfig) -> Self {
        Self::new(store, RoomId::new(config.room_id.clone()), config.message_limit)
    }

    /// 为一个认证实例打开房间会话
    pub fn open(&self, auth: Arc<dyn AuthService>) -> RoomSession {
        RoomSession::new(
            self.room_id.clone(),
            self.message_limit,
            auth,
            self.store.clone(),
        )
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::auth::{AuthBackend, InMemoryAuthService};
    use crate::modules::store::InMemoryDocumentStore;

    #[tokio::test]
    async fn test_room_module_open() {
        let module = RoomModule::from_config(
            Arc::new(InMemoryDocumentStore::new()),
            &RoomConfig::default(),
        );
        let auth = Arc::new(InMemoryAuthService::new(Arc::new(AuthBackend::new())));
        let session = module.open(auth);

        assert_eq!(session.room_id().as_str(), "lobby");
        assert!(!session.is_joined().await);
        session.join().await.unwrap();
        assert!(session.is_joined().await);
    }
}
