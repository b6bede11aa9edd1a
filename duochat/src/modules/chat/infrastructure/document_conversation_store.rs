use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;

use super::super::domain::{ClientStatus, ConversationId, Message};
use super::super::ports::ConversationStore;
use crate::modules::auth::UserId;
use crate::modules::store::{
    encode_fields, CollectionPath, Direction, Document, DocumentPath, DocumentStore,
    FieldUpdates, Query, StoreError, Subscription, WriteBatch,
};

const CHATS_COLLECTION: &str = "chats";
const MESSAGES_COLLECTION: &str = "messages";
const CLIENT_STATUS_COLLECTION: &str = "clientStatus";
const TIMESTAMP_FIELD: &str = "timestamp";
const MSG_COUNT_FIELD: &str = "msgCount";
const FORCE_LOGOUT_FIELD: &str = "forceLogout";

/// 消息集合路径 `chats/{master}_{client}/messages`
pub fn messages_collection(conversation: &ConversationId) -> Result<CollectionPath, StoreError> {
    Ok(CollectionPath::parse(&format!(
        "{}/{}/{}",
        CHATS_COLLECTION,
        conversation.key(),
        MESSAGES_COLLECTION
    ))?)
}

/// 状态文档路径 `clientStatus/{client}`
pub fn client_status_path(client: &UserId) -> Result<DocumentPath, StoreError> {
    Ok(DocumentPath::parse(&format!(
        "{}/{}",
        CLIENT_STATUS_COLLECTION, client
    ))?)
}

/// 将文档解码为消息，缺失的 id 字段由文档 ID 补齐
fn decode_message(doc: &Document) -> Option<Message> {
    let mut fields = doc.fields().clone();
    fields
        .entry("id")
        .or_insert_with(|| Value::String(doc.id().to_string()));

    match serde_json::from_value(Value::Object(fields)) {
        Ok(message) => Some(message),
        Err(e) => {
            tracing::warn!(
                "[ConversationStore] Skipping malformed message {}: {}",
                doc.path(),
                e
            );
            None
        }
    }
}

pub(crate) fn decode_messages(docs: &[Document]) -> Vec<Message> {
    docs.iter().filter_map(decode_message).collect()
}

/// 基于 DocumentStore 的对话存储
pub struct DocumentConversationStore {
    store: Arc<dyn DocumentStore>,
}

impl DocumentConversationStore {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn message_path(
        conversation: &ConversationId,
        message: &Message,
    ) -> Result<DocumentPath, StoreError> {
        Ok(messages_collection(conversation)?.doc(message.id().as_str())?)
    }

    fn recent_query(conversation: &ConversationId, limit: usize) -> Result<Query, StoreError> {
        Ok(Query::new(messages_collection(conversation)?)
            .order_by(TIMESTAMP_FIELD, Direction::Ascending)
            .limit_to_last(limit))
    }

    /// 对话下的全部消息文档
    async fn all_message_paths(
        &self,
        conversation: &ConversationId,
    ) -> Result<Vec<DocumentPath>, StoreError> {
        let snapshot = self
            .store
            .query(&Query::new(messages_collection(conversation)?))
            .await?;
        Ok(snapshot
            .documents()
            .iter()
            .map(|doc| doc.path().clone())
            .collect())
    }
}

#[async_trait]
impl ConversationStore for DocumentConversationStore {
    async fn recent_messages(
        &self,
        conversation: &ConversationId,
        limit: usize,
    ) -> Result<Vec<Message>, StoreError> {
        let snapshot = self
            .store
            .query(&Self::recent_query(conversation, limit)?)
            .await?;
        Ok(decode_messages(snapshot.documents()))
    }

    async fn watch_messages(
        &self,
        conversation: &ConversationId,
        limit: usize,
    ) -> Result<Subscription<Vec<Message>>, StoreError> {
        let subscription = self
            .store
            .watch_query(Self::recent_query(conversation, limit)?)
            .await?;
        Ok(subscription.filter_map(|snapshot| Some(decode_messages(snapshot.documents()))))
    }

    async fn client_status(&self, client: &UserId) -> Result<Option<ClientStatus>, StoreError> {
        match self.store.get(&client_status_path(client)?).await? {
            Some(doc) => Ok(Some(doc.decode()?)),
            None => Ok(None),
        }
    }

    async fn watch_client_status(
        &self,
        client: &UserId,
    ) -> Result<Subscription<Option<ClientStatus>>, StoreError> {
        let subscription = self
            .store
            .watch_document(client_status_path(client)?)
            .await?;
        Ok(subscription.filter_map(|snapshot| match snapshot.decode::<ClientStatus>() {
            Ok(status) => Some(status),
            Err(e) => {
                tracing::warn!(
                    "[ConversationStore] Skipping malformed status {}: {}",
                    snapshot.path(),
                    e
                );
                None
            }
        }))
    }

    async fn append_message(
        &self,
        conversation: &ConversationId,
        message: &Message,
    ) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch.create(
            Self::message_path(conversation, message)?,
            encode_fields(message)?,
        );
        self.store.commit(batch).await
    }

    async fn append_counted_message(
        &self,
        conversation: &ConversationId,
        message: &Message,
    ) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch
            .create(
                Self::message_path(conversation, message)?,
                encode_fields(message)?,
            )
            .update(
                client_status_path(conversation.client())?,
                FieldUpdates::new().increment(MSG_COUNT_FIELD, 1),
            );
        self.store.commit(batch).await
    }

    async fn reset_counter(
        &self,
        conversation: &ConversationId,
        notice: &Message,
    ) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch
            .update(
                client_status_path(conversation.client())?,
                FieldUpdates::new().set(MSG_COUNT_FIELD, 0),
            )
            .create(
                Self::message_path(conversation, notice)?,
                encode_fields(notice)?,
            );
        self.store.commit(batch).await
    }

    async fn begin_client_session(
        &self,
        conversation: &ConversationId,
        at: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let paths = self.all_message_paths(conversation).await?;
        let cleared = paths.len();

        let mut batch = WriteBatch::new();
        for path in paths {
            batch.delete(path);
        }
        batch.set(
            client_status_path(conversation.client())?,
            encode_fields(&ClientStatus::fresh_login(at))?,
            Default::default(),
        );
        self.store.commit(batch).await?;

        tracing::debug!(
            "[ConversationStore] Client session started for {}, cleared {} message(s)",
            conversation,
            cleared
        );
        Ok(cleared)
    }

    async fn request_force_logout(&self, client: &UserId) -> Result<(), StoreError> {
        self.store
            .update(
                &client_status_path(client)?,
                FieldUpdates::new().set(FORCE_LOGOUT_FIELD, true),
            )
            .await
    }

    async fn end_client_session(
        &self,
        conversation: &ConversationId,
    ) -> Result<usize, StoreError> {
        let paths = self.all_message_paths(conversation).await?;
        let deleted = paths.len();

        let mut batch = WriteBatch::new();
        for path in paths {
            batch.delete(path);
        }
        batch.delete(client_status_path(conversation.client())?);
        self.store.commit(batch).await?;

        tracing::debug!(
            "[ConversationStore] Client session ended for {}, deleted {} message(s)",
            conversation,
            deleted
        );
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::store::InMemoryDocumentStore;
    use serde_json::json;

    fn conversation() -> ConversationId {
        ConversationId::new(UserId::from("m1"), UserId::from("c1"))
    }

    fn setup() -> (Arc<InMemoryDocumentStore>, DocumentConversationStore) {
        let memory = Arc::new(InMemoryDocumentStore::new());
        let store = DocumentConversationStore::new(memory.clone());
        (memory, store)
    }

    #[tokio::test]
    async fn test_paths() {
        assert_eq!(
            messages_collection(&conversation()).unwrap().to_string(),
            "chats/m1_c1/messages"
        );
        assert_eq!(
            client_status_path(&UserId::from("c1")).unwrap().to_string(),
            "clientStatus/c1"
        );
        assert!(client_status_path(&UserId::from("a/b")).is_err());
    }

    #[tokio::test]
    async fn test_counted_message_increments_in_same_batch() {
        let (_, store) = setup();
        let conv = conversation();
        store.begin_client_session(&conv, Utc::now()).await.unwrap();

        store
            .append_counted_message(&conv, &Message::compose(UserId::from("c1"), "hi"))
            .await
            .unwrap();
        store
            .append_counted_message(&conv, &Message::compose(UserId::from("c1"), "again"))
            .await
            .unwrap();

        let status = store.client_status(conv.client()).await.unwrap().unwrap();
        assert_eq!(status.msg_count(), 2);
        assert_eq!(store.recent_messages(&conv, 50).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_counted_message_without_status_writes_nothing() {
        let (memory, store) = setup();
        let conv = conversation();

        let result = store
            .append_counted_message(&conv, &Message::compose(UserId::from("c1"), "hi"))
            .await;

        assert!(matches!(result, Err(StoreError::NotFound(_))));
        assert!(memory.is_empty().await);
    }

    #[tokio::test]
    async fn test_reset_counter_appends_notice() {
        let (_, store) = setup();
        let conv = conversation();
        store.begin_client_session(&conv, Utc::now()).await.unwrap();
        store
            .append_counted_message(&conv, &Message::compose(UserId::from("c1"), "hi"))
            .await
            .unwrap();

        store
            .reset_counter(&conv, &Message::system_notice("reset"))
            .await
            .unwrap();

        let status = store.client_status(conv.client()).await.unwrap().unwrap();
        assert_eq!(status.msg_count(), 0);
        let messages = store.recent_messages(&conv, 50).await.unwrap();
        assert_eq!(messages.iter().filter(|m| m.is_system()).count(), 1);
    }

    #[tokio::test]
    async fn test_recent_messages_keeps_latest() {
        let (_, store) = setup();
        let conv = conversation();
        let base = Utc::now();
        for i in 0..5 {
            let message = Message::new(
                crate::modules::chat::domain::MessageId::new(),
                UserId::from("m1"),
                format!("msg {}", i),
                base + chrono::Duration::milliseconds(i),
            );
            store.append_message(&conv, &message).await.unwrap();
        }

        let texts: Vec<String> = store
            .recent_messages(&conv, 3)
            .await
            .unwrap()
            .iter()
            .map(|m| m.text().to_string())
            .collect();
        assert_eq!(texts, vec!["msg 2", "msg 3", "msg 4"]);
    }

    #[tokio::test]
    async fn test_login_reset_and_logout_purge() {
        let (memory, store) = setup();
        let conv = conversation();
        let other = ConversationId::new(UserId::from("m1"), UserId::from("c2"));

        store
            .append_message(&conv, &Message::compose(UserId::from("m1"), "stale"))
            .await
            .unwrap();
        store
            .append_message(&other, &Message::compose(UserId::from("m1"), "keep"))
            .await
            .unwrap();

        let cleared = store.begin_client_session(&conv, Utc::now()).await.unwrap();
        assert_eq!(cleared, 1);
        let status = store.client_status(conv.client()).await.unwrap().unwrap();
        assert!(status.is_logged_in());
        assert_eq!(status.msg_count(), 0);

        store
            .append_message(&conv, &Message::compose(UserId::from("c1"), "bye"))
            .await
            .unwrap();
        let deleted = store.end_client_session(&conv).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(store.client_status(conv.client()).await.unwrap().is_none());

        // 其他对话不受影响
        assert_eq!(memory.len().await, 1);
    }

    #[tokio::test]
    async fn test_force_logout_requires_status() {
        let (_, store) = setup();
        let client = UserId::from("c1");

        let missing = store.request_force_logout(&client).await;
        assert!(matches!(missing, Err(StoreError::NotFound(_))));

        store
            .begin_client_session(&conversation(), Utc::now())
            .await
            .unwrap();
        store.request_force_logout(&client).await.unwrap();
        let status = store.client_status(&client).await.unwrap().unwrap();
        assert!(status.force_logout());
        assert!(status.is_logged_in());
    }

    #[tokio::test]
    async fn test_watch_status_and_skip_malformed_messages() {
        let (memory, store) = setup();
        let conv = conversation();

        let mut status = store.watch_client_status(conv.client()).await.unwrap();
        assert_eq!(status.recv().await, Some(None));

        store.begin_client_session(&conv, Utc::now()).await.unwrap();
        let observed = status.recv().await.unwrap().unwrap();
        assert!(observed.is_logged_in());

        let collection = messages_collection(&conv).unwrap();
        memory
            .add(
                &collection,
                json!({"text": 42, "timestamp": 1}).as_object().unwrap().clone(),
            )
            .await
            .unwrap();
        memory
            .add(
                &collection,
                json!({"text": "ok", "senderId": "m1", "timestamp": 2})
                    .as_object()
                    .unwrap()
                    .clone(),
            )
            .await
            .unwrap();

        let messages = store.recent_messages(&conv, 50).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text(), "ok");
    }
}
