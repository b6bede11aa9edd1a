// Room Session
//
// 开放聊天室会话：匿名加入、实时消息、无门控发送

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use super::domain::{RoomError, RoomEvent, RoomId};
use crate::modules::auth::{AuthService, AuthUser};
use crate::modules::chat::domain::{Message, MessageId};
use crate::modules::chat::infrastructure::decode_messages;
use crate::modules::store::{
    encode_fields, Direction, DocumentStore, Query, StoreError, WriteBatch,
};

const EVENT_CHANNEL_CAPACITY: usize = 64;
const TIMESTAMP_FIELD: &str = "timestamp";

struct Membership {
    user: AuthUser,
    listener: CancellationToken,
}

/// 聊天室会话
pub struct RoomSession {
    room_id: RoomId,
    message_limit: usize,
    auth: Arc<dyn AuthService>,
    store: Arc<dyn DocumentStore>,
    membership: Mutex<Option<Membership>>,
    messages: Arc<RwLock<Vec<Message>>>,
    events: broadcast::Sender<RoomEvent>,
}

impl RoomSession {
    pub fn new(
        room_id: RoomId,
        message_limit: usize,
        auth: Arc<dyn AuthService>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            room_id,
            message_limit,
            auth,
            store,
            membership: Mutex::new(None),
            messages: Arc::new(RwLock::new(Vec::new())),
            events,
        }
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoomEvent> {
        self.events.subscribe()
    }

    pub async fn is_joined(&self) -> bool {
        self.membership.lock().await.is_some()
    }

    /// 当前消息缓冲
    pub async fn messages(&self) -> Vec<Message> {
        self.messages.read().await.clone()
    }

    /// 加入房间，未登录时匿名登录。重复加入返回当前用户
    pub async fn join(&self) -> Result<AuthUser, RoomError> {
        let mut membership = self.membership.lock().await;
        if let Some(current) = membership.as_ref() {
            return Ok(current.user.clone());
        }

        let user = match self.auth.current_user() {
            Some(user) => user,
            None => self.auth.sign_in_anonymously().await?,
        };

        let query = Query::new(self.room_id.messages_collection()?)
            .order_by(TIMESTAMP_FIELD, Direction::Ascending)
            .limit_to_last(self.message_limit);
        let mut subscription = match self.store.watch_query(query).await {
            Ok(subscription) => subscription,
            Err(e) => {
                if let Err(sign_out_err) = self.auth.sign_out().await {
                    tracing::warn!("[RoomSession] Sign-out after failed join: {}", sign_out_err);
                }
                return Err(e.into());
            }
        };

        let token = CancellationToken::new();
        let listener = token.clone();
        let messages = self.messages.clone();
        let events = self.events.clone();
        let room_id = self.room_id.clone();

        tokio::spawn(async move {
            loop {
                let snapshot = tokio::select! {
                    _ = listener.cancelled() => break,
                    next = subscription.recv() => match next {
                        Some(snapshot) => snapshot,
                        None => break,
                    },
                };
                let decoded = decode_messages(snapshot.documents());
                {
                    let mut buffer = messages.write().await;
                    if listener.is_cancelled() {
                        break;
                    }
                    *buffer = decoded.clone();
                }
                let _ = events.send(RoomEvent::MessagesUpdated {
                    room_id: room_id.clone(),
                    messages: decoded,
                });
            }
            tracing::trace!("[RoomSession] Listener for {} stopped", room_id);
        });

        tracing::info!("[RoomSession] {} joined room {}", user.uid(), self.room_id);
        let _ = self.events.send(RoomEvent::Joined {
            room_id: self.room_id.clone(),
            uid: user.uid().to_string(),
        });
        *membership = Some(Membership {
            user: user.clone(),
            listener: token,
        });
        Ok(user)
    }

    /// 发送消息，无门控
    pub async fn post(&self, text: &str) -> Result<Message, RoomError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(RoomError::EmptyMessage);
        }

        let sender = {
            let membership = self.membership.lock().await;
            match membership.as_ref() {
                Some(current) => current.user.uid().clone(),
                None => return Err(RoomError::NotJoined),
            }
        };

        let id = self.store.new_document_id();
        let path = self
            .room_id
            .messages_collection()?
            .doc(&id)
            .map_err(StoreError::from)?;
        let message = Message::new(MessageId::from_document_id(id), sender, text, Utc::now());

        let mut batch = WriteBatch::new();
        batch.create(path, encode_fields(&message).map_err(StoreError::from)?);
        self.store.commit(batch).await?;
        Ok(message)
    }

    /// 离开房间并登出，未加入时返回 false
    pub async fn leave(&self) -> Result<bool, RoomError> {
        let Some(membership) = self.membership.lock().await.take() else {
            return Ok(false);
        };
        membership.listener.cancel();
        self.messages.write().await.clear();

        self.auth.sign_out().await?;
        tracing::info!("[RoomSession] {} left room {}", membership.user.uid(), self.room_id);
        let _ = self.events.send(RoomEvent::Left {
            room_id: self.room_id.clone(),
        });
        Ok(true)
    }
}

impl Drop for RoomSession {
    fn drop(&mut self) {
        if let Ok(mut membership) = self.membership.try_lock() {
            if let Some(current) = membership.take() {
                current.listener.cancel();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::auth::{AuthBackend, InMemoryAuthService};
    use crate::modules::store::InMemoryDocumentStore;
    use std::time::Duration;

    fn session(store: Arc<InMemoryDocumentStore>, backend: Arc<AuthBackend>) -> RoomSession {
        RoomSession::new(
            RoomId::new("lobby"),
            100,
            Arc::new(InMemoryAuthService::new(backend)),
            store,
        )
    }

    async fn wait_for_messages(session: &RoomSession, count: usize) {
        let result = tokio::time::timeout(Duration::from_secs(5), async {
            while session.messages().await.len() != count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await;
        assert!(result.is_ok(), "expected {} messages", count);
    }

    #[tokio::test]
    async fn test_join_post_and_leave() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let backend = Arc::new(AuthBackend::new());
        let alice = session(store.clone(), backend.clone());
        let bob = session(store.clone(), backend);

        let alice_user = alice.join().await.unwrap();
        assert!(alice_user.is_anonymous());
        // 重复加入不会重新登录
        assert_eq!(alice.join().await.unwrap().uid(), alice_user.uid());
        bob.join().await.unwrap();

        alice.post("  hello room  ").await.unwrap();
        bob.post("hi alice").await.unwrap();
        wait_for_messages(&alice, 2).await;
        wait_for_messages(&bob, 2).await;

        let texts: Vec<String> = bob
            .messages()
            .await
            .iter()
            .map(|m| m.text().to_string())
            .collect();
        assert_eq!(texts, vec!["hello room", "hi alice"]);

        assert!(alice.leave().await.unwrap());
        assert!(!alice.leave().await.unwrap());
        assert!(alice.messages().await.is_empty());
        assert!(matches!(
            alice.post("anyone?").await,
            Err(RoomError::NotJoined)
        ));

        // 消息不随离开删除
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let room = session(
            Arc::new(InMemoryDocumentStore::new()),
            Arc::new(AuthBackend::new()),
        );
        room.join().await.unwrap();

        assert!(matches!(room.post("   ").await, Err(RoomError::EmptyMessage)));
    }

    #[tokio::test]
    async fn test_join_emits_event() {
        let room = session(
            Arc::new(InMemoryDocumentStore::new()),
            Arc::new(AuthBackend::new()),
        );
        let mut events = room.subscribe();
        room.join().await.unwrap();

        let event = events.recv().await.unwrap();
        assert!(matches!(event, RoomEvent::Joined { .. }));
    }
}
