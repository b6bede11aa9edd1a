use serde::Serialize;
use tokio::sync::broadcast;

use crate::modules::chat::ChatDomainEvent;
use crate::modules::room::RoomEvent;

const EVENT_BUS_CAPACITY: usize = 100;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AppEvent {
    /// 某个命名会话的领域事件
    Chat {
        session: String,
        event: ChatDomainEvent,
    },
    /// 阻塞式错误提示，携带原始错误文本
    ErrorDialog { message: String },
    AuthChanged {
        session: String,
        uid: Option<String>,
    },
    Room { event: RoomEvent },
}

pub struct EventBus {
    sender: broadcast::Sender<AppEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self { sender }
    }

    pub fn publish(&self, event: AppEvent) {
        match &event {
            AppEvent::ErrorDialog { message } => {
                tracing::error!("[EventBus] Error dialog: {}", message);
            }
            AppEvent::Chat { session, event } => {
                tracing::debug!("[EventBus] {} -> {}", session, event.event_type());
            }
            other => tracing::debug!("[EventBus] Publishing event: {:?}", other),
        }
        let _ = self.sender.send(event);
    }

    /// 发布错误提示
    pub fn error_dialog(&self, message: impl Into<String>) {
        self.publish(AppEvent::ErrorDialog {
            message: message.into(),
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
