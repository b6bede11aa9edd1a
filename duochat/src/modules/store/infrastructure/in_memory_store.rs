use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio_util::sync::CancellationToken;

use crate::modules::store::domain::{
    Document, DocumentPath, DocumentSnapshot, Query, QuerySnapshot, WriteBatch, WriteOp,
};
use crate::modules::store::ports::{DocumentStore, StoreError, Subscription};

/// 变更通知的缓冲容量
const CHANGE_CHANNEL_CAPACITY: usize = 256;

#[derive(Default)]
struct StoreState {
    documents: BTreeMap<DocumentPath, Document>,
    next_sequence: u64,
}

impl StoreState {
    fn allocate_sequence(&mut self) -> u64 {
        self.next_sequence += 1;
        self.next_sequence
    }
}

/// 订阅快照的内容比较（忽略读取时间）
trait SnapshotContent: Send + 'static {
    fn same_content(&self, other: &Self) -> bool;
}

impl SnapshotContent for QuerySnapshot {
    fn same_content(&self, other: &Self) -> bool {
        self.documents() == other.documents()
    }
}

impl SnapshotContent for DocumentSnapshot {
    fn same_content(&self, other: &Self) -> bool {
        self.document() == other.document()
    }
}

/// 内存文档存储
///
/// 用于开发和测试。所有写入经过批次提交，提交后通过广播通道
/// 通知订阅者，订阅者重新计算结果，内容变化时才推送新快照。
#[derive(Clone)]
pub struct InMemoryDocumentStore {
    state: Arc<RwLock<StoreState>>,
    changes: broadcast::Sender<Arc<Vec<DocumentPath>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::from_documents(Vec::new())
    }

    /// 从已有文档构建（用于加载持久化数据）
    pub fn from_documents(documents: Vec<Document>) -> Self {
        let next_sequence = documents.iter().map(Document::sequence).max().unwrap_or(0);
        let documents = documents
            .into_iter()
            .map(|doc| (doc.path().clone(), doc))
            .collect();
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);

        Self {
            state: Arc::new(RwLock::new(StoreState {
                documents,
                next_sequence,
            })),
            changes,
        }
    }

    /// 导出全部文档
    pub async fn export(&self) -> Vec<Document> {
        self.state.read().await.documents.values().cloned().collect()
    }

    /// 文档总数
    pub async fn len(&self) -> usize {
        self.state.read().await.documents.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn spawn_watcher<T, R, E>(&self, relevant: R, evaluate: E) -> Subscription<T>
    where
        T: SnapshotContent + Clone,
        R: Fn(&DocumentPath) -> bool + Send + 'static,
        E: Fn(&StoreState) -> T + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let state = self.state.clone();
        // 先订阅再读取初始快照，之后提交的变更不会漏掉
        let mut changes = self.changes.subscribe();
        let initial = {
            let state = self.state.read().await;
            evaluate(&state)
        };

        let _ = tx.send(initial.clone());

        tokio::spawn(async move {
            let mut last = initial;
            loop {
                let notice = tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tx.closed() => break,
                    notice = changes.recv() => notice,
                };

                let affected = match notice {
                    Ok(paths) => paths.iter().any(|path| relevant(path)),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!("[InMemoryDocumentStore] Watcher lagged by {} notices", skipped);
                        true
                    }
                    Err(RecvError::Closed) => break,
                };
                if !affected {
                    continue;
                }

                let snapshot = {
                    let state = state.read().await;
                    evaluate(&state)
                };
                if snapshot.same_content(&last) {
                    continue;
                }
                last = snapshot.clone();
                if tx.send(snapshot).is_err() {
                    break;
                }
            }
            tracing::trace!("[InMemoryDocumentStore] Watcher stopped");
        });

        Subscription::new(rx, cancel)
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>, StoreError> {
        let state = self.state.read().await;
        Ok(state.documents.get(path).cloned())
    }

    async fn query(&self, query: &Query) -> Result<QuerySnapshot, StoreError> {
        let state = self.state.read().await;
        Ok(QuerySnapshot::new(
            query.apply(state.documents.values()),
            Utc::now(),
        ))
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let now = Utc::now();

        // 先在暂存区计算全部结果，任一操作失败则整批放弃
        let mut staged: BTreeMap<DocumentPath, Option<Document>> = BTreeMap::new();
        for op in batch.into_ops() {
            let path = op.path().clone();
            let current = match staged.get(&path) {
                Some(pending) => pending.clone(),
                None => state.documents.get(&path).cloned(),
            };

            let next = match op {
                WriteOp::Create { path, fields } => {
                    if current.is_some() {
                        return Err(StoreError::AlreadyExists(path.to_string()));
                    }
                    Some(Document::new(path, fields, state.allocate_sequence(), now))
                }
                WriteOp::Set {
                    path,
                    fields,
                    options,
                } => match current {
                    Some(mut doc) => {
                        if options.merge {
                            doc.merge_fields(fields, now);
                        } else {
                            doc.replace_fields(fields, now);
                        }
                        Some(doc)
                    }
                    None => Some(Document::new(path, fields, state.allocate_sequence(), now)),
                },
                WriteOp::Update { path, updates } => match current {
                    Some(mut doc) => {
                        updates.apply(doc.fields_mut(), now);
                        doc.touch(now);
                        Some(doc)
                    }
                    None => return Err(StoreError::NotFound(path.to_string())),
                },
                WriteOp::Delete { .. } => None,
            };

            staged.insert(path, next);
        }

        let changed: Vec<DocumentPath> = staged.keys().cloned().collect();
        for (path, doc) in staged {
            match doc {
                Some(doc) => {
                    state.documents.insert(path, doc);
                }
                None => {
                    state.documents.remove(&path);
                }
            }
        }
        drop(guard);

        tracing::trace!("[InMemoryDocumentStore] Committed {} document(s)", changed.len());
        // 没有订阅者时发送失败是正常情况
        let _ = self.changes.send(Arc::new(changed));
        Ok(())
    }

    async fn watch_query(&self, query: Query) -> Result<Subscription<QuerySnapshot>, StoreError> {
        let matcher = query.clone();

        Ok(self
            .spawn_watcher(
                move |path| matcher.matches(path),
                move |state| QuerySnapshot::new(query.apply(state.documents.values()), Utc::now()),
            )
            .await)
    }

    async fn watch_document(
        &self,
        path: DocumentPath,
    ) -> Result<Subscription<DocumentSnapshot>, StoreError> {
        let watched = path.clone();

        Ok(self
            .spawn_watcher(
                move |changed| changed == &watched,
                move |state| {
                    DocumentSnapshot::new(path.clone(), state.documents.get(&path).cloned(), Utc::now())
                },
            )
            .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::store::domain::{
        CollectionPath, Direction, FieldUpdates, Fields, SetOptions,
    };
    use serde_json::json;
    use std::time::Duration;

    fn fields(value: serde_json::Value) -> Fields {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn messages() -> CollectionPath {
        CollectionPath::parse("chats/m_c/messages").unwrap()
    }

    async fn next<T>(subscription: &mut Subscription<T>) -> T {
        tokio::time::timeout(Duration::from_secs(1), subscription.recv())
            .await
            .expect("snapshot timed out")
            .expect("subscription closed")
    }

    #[tokio::test]
    async fn test_set_get_update_delete() {
        let store = InMemoryDocumentStore::new();
        let path = DocumentPath::parse("clientStatus/c1").unwrap();

        store
            .set(&path, fields(json!({"msgCount": 1, "isLoggedIn": true})), SetOptions::overwrite())
            .await
            .unwrap();
        store
            .set(&path, fields(json!({"forceLogout": false})), SetOptions::merge())
            .await
            .unwrap();
        store
            .update(&path, FieldUpdates::new().increment("msgCount", 1))
            .await
            .unwrap();

        let doc = store.get(&path).await.unwrap().unwrap();
        assert_eq!(doc.get("msgCount"), Some(&json!(2)));
        assert_eq!(doc.get("isLoggedIn"), Some(&json!(true)));
        assert_eq!(doc.get("forceLogout"), Some(&json!(false)));

        store
            .set(&path, fields(json!({"msgCount": 0})), SetOptions::overwrite())
            .await
            .unwrap();
        let doc = store.get(&path).await.unwrap().unwrap();
        assert!(doc.get("isLoggedIn").is_none());

        store.delete(&path).await.unwrap();
        assert!(store.get(&path).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_missing_document_fails() {
        let store = InMemoryDocumentStore::new();
        let path = DocumentPath::parse("clientStatus/ghost").unwrap();

        let result = store
            .update(&path, FieldUpdates::new().set("forceLogout", true))
            .await;

        assert!(matches!(result, Err(StoreError::NotFound(_))));
        assert!(store.get(&path).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_batch_is_all_or_nothing() {
        let store = InMemoryDocumentStore::new();
        let added = store
            .add(&messages(), fields(json!({"text": "keep", "timestamp": 1})))
            .await
            .unwrap();

        let mut batch = WriteBatch::new();
        batch
            .delete(added.clone())
            .update(
                DocumentPath::parse("clientStatus/missing").unwrap(),
                FieldUpdates::new().increment("msgCount", 1),
            );

        assert!(store.commit(batch).await.is_err());
        assert!(store.get(&added).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_create_existing_document_fails() {
        let store = InMemoryDocumentStore::new();
        let path = messages().doc("fixed").unwrap();

        let mut batch = WriteBatch::new();
        batch.create(path.clone(), Fields::new());
        store.commit(batch.clone()).await.unwrap();

        assert!(matches!(
            store.commit(batch).await,
            Err(StoreError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_watch_query_pushes_ordered_snapshots() {
        let store = InMemoryDocumentStore::new();
        let query = Query::new(messages())
            .order_by("timestamp", Direction::Ascending)
            .limit_to_last(2);
        let mut subscription = store.watch_query(query).await.unwrap();

        assert!(next(&mut subscription).await.is_empty());

        for (text, ts) in [("b", 200), ("a", 100), ("c", 300)] {
            store
                .add(&messages(), fields(json!({"text": text, "timestamp": ts})))
                .await
                .unwrap();
        }

        let mut latest = next(&mut subscription).await;
        while latest.len() < 2 || latest.documents()[1].get("text") != Some(&json!("c")) {
            latest = next(&mut subscription).await;
        }
        let texts: Vec<_> = latest
            .documents()
            .iter()
            .map(|doc| doc.get("text").cloned().unwrap())
            .collect();
        assert_eq!(texts, vec![json!("b"), json!("c")]);
    }

    #[tokio::test]
    async fn test_watch_ignores_unrelated_changes() {
        let store = InMemoryDocumentStore::new();
        let mut subscription = store.watch_query(Query::new(messages())).await.unwrap();
        next(&mut subscription).await;

        store
            .add(&CollectionPath::parse("rooms/lobby/messages").unwrap(), Fields::new())
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(subscription.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_watch_document_sees_creation_and_deletion() {
        let store = InMemoryDocumentStore::new();
        let path = DocumentPath::parse("clientStatus/c1").unwrap();
        let mut subscription = store.watch_document(path.clone()).await.unwrap();

        assert!(!next(&mut subscription).await.exists());

        store
            .set(&path, fields(json!({"forceLogout": true})), SetOptions::merge())
            .await
            .unwrap();
        let snapshot = next(&mut subscription).await;
        assert_eq!(
            snapshot.document().and_then(|doc| doc.get("forceLogout")),
            Some(&json!(true))
        );

        store.delete(&path).await.unwrap();
        assert!(!next(&mut subscription).await.exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_watch_document_sees_write_racing_subscribe() {
        let store = InMemoryDocumentStore::new();

        for round in 0..200 {
            let path = DocumentPath::parse(&format!("clientStatus/c{}", round)).unwrap();
            store
                .set(&path, fields(json!({"forceLogout": false})), SetOptions::overwrite())
                .await
                .unwrap();

            let writer = {
                let store = store.clone();
                let path = path.clone();
                tokio::spawn(async move {
                    store
                        .update(&path, FieldUpdates::new().set("forceLogout", true))
                        .await
                        .unwrap();
                })
            };
            let mut subscription = store.watch_document(path.clone()).await.unwrap();
            writer.await.unwrap();

            // 最终推送的快照必须与存储一致
            let expected = store.get(&path).await.unwrap();
            let mut latest = next(&mut subscription).await;
            while latest.document() != expected.as_ref() {
                latest = next(&mut subscription).await;
            }
            assert_eq!(
                latest.document().and_then(|doc| doc.get("forceLogout")),
                Some(&json!(true))
            );
        }
    }

    #[tokio::test]
    async fn test_from_documents_continues_sequence() {
        let store = InMemoryDocumentStore::new();
        store.add(&messages(), Fields::new()).await.unwrap();
        store.add(&messages(), Fields::new()).await.unwrap();

        let restored = InMemoryDocumentStore::from_documents(store.export().await);
        let path = restored.add(&messages(), Fields::new()).await.unwrap();

        let doc = restored.get(&path).await.unwrap().unwrap();
        assert_eq!(doc.sequence(), 3);
        assert_eq!(restored.len().await, 3);
    }
}
