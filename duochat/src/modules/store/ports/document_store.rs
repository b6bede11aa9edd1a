use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use super::subscription::Subscription;
use crate::modules::store::domain::{
    CollectionPath, Document, DocumentPath, DocumentSnapshot, FieldUpdates, Fields, PathError,
    Query, QuerySnapshot, SetOptions, WriteBatch,
};

/// 存储错误类型
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Document already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid path: {0}")]
    InvalidPath(#[from] PathError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::SerializationError(err.to_string())
    }
}

/// 文档存储端口
///
/// 对外部文档数据库的抽象：路径寻址的文档 CRUD、有序限量查询、
/// 实时快照订阅和原子批量写入。单文档写操作默认通过单操作批次实现。
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// 读取文档
    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>, StoreError>;

    /// 执行查询
    async fn query(&self, query: &Query) -> Result<QuerySnapshot, StoreError>;

    /// 原子提交批量写入
    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;

    /// 订阅查询结果，订阅后立即推送当前快照
    async fn watch_query(&self, query: Query) -> Result<Subscription<QuerySnapshot>, StoreError>;

    /// 订阅单个文档，订阅后立即推送当前快照
    async fn watch_document(
        &self,
        path: DocumentPath,
    ) -> Result<Subscription<DocumentSnapshot>, StoreError>;

    /// 生成新的文档 ID
    fn new_document_id(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }

    /// 写入文档
    async fn set(
        &self,
        path: &DocumentPath,
        fields: Fields,
        options: SetOptions,
    ) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch.set(path.clone(), fields, options);
        self.commit(batch).await
    }

    /// 部分更新，文档不存在时返回 NotFound
    async fn update(&self, path: &DocumentPath, updates: FieldUpdates) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch.update(path.clone(), updates);
        self.commit(batch).await
    }

    /// 删除文档
    async fn delete(&self, path: &DocumentPath) -> Result<(), StoreError> {
        let mut batch = WriteBatch::new();
        batch.delete(path.clone());
        self.commit(batch).await
    }

    /// 以自动生成的 ID 新增文档
    async fn add(
        &self,
        collection: &CollectionPath,
        fields: Fields,
    ) -> Result<DocumentPath, StoreError> {
        let path = collection.doc(&self.new_document_id())?;
        let mut batch = WriteBatch::new();
        batch.create(path.clone(), fields);
        self.commit(batch).await?;
        Ok(path)
    }
}
