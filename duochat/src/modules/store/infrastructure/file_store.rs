// 文件持久化文档存储
//
// 在内存存储之上，每次提交成功后把全部文档写入 JSON 文件，
// 启动时从文件恢复。实时订阅由内存存储负责。

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::Mutex;

use super::InMemoryDocumentStore;
use crate::modules::store::domain::{
    Document, DocumentPath, DocumentSnapshot, Query, QuerySnapshot, WriteBatch,
};
use crate::modules::store::ports::{DocumentStore, StoreError, Subscription};

const DOCUMENTS_FILE_NAME: &str = "documents.json";

/// 文件持久化文档存储
pub struct FileDocumentStore {
    memory: InMemoryDocumentStore,
    file_path: PathBuf,
    /// 串行化文件写入
    write_lock: Mutex<()>,
}

impl FileDocumentStore {
    /// 创建新的文件文档存储
    ///
    /// # Arguments
    /// * `data_dir` - 应用数据目录路径
    pub async fn new(data_dir: PathBuf) -> Result<Self, StoreError> {
        let file_path = data_dir.join(DOCUMENTS_FILE_NAME);

        fs::create_dir_all(&data_dir)
            .await
            .map_err(|e| StoreError::StorageError(e.to_string()))?;

        let documents: Vec<Document> = if file_path.exists() {
            let content = fs::read_to_string(&file_path)
                .await
                .map_err(|e| StoreError::StorageError(e.to_string()))?;
            serde_json::from_str(&content)?
        } else {
            Vec::new()
        };

        tracing::info!(
            "[FileDocumentStore] Loaded {} document(s) from {:?}",
            documents.len(),
            file_path
        );

        Ok(Self {
            memory: InMemoryDocumentStore::from_documents(documents),
            file_path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn file_path(&self) -> &PathBuf {
        &self.file_path
    }

    /// 将数据持久化到文件
    async fn persist(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let documents = self.memory.export().await;
        let content = serde_json::to_string_pretty(&documents)?;

        fs::write(&self.file_path, content)
            .await
            .map_err(|e| StoreError::StorageError(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>, StoreError> {
        self.memory.get(path).await
    }

    async fn query(&self, query: &Query) -> Result<QuerySnapshot, StoreError> {
        self.memory.query(query).await
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        self.memory.commit(batch).await?;
        self.persist().await
    }

    async fn watch_query(&self, query: Query) -> Result<Subscription<QuerySnapshot>, StoreError> {
        self.memory.watch_query(query).await
    }

    async fn watch_document(
        &self,
        path: DocumentPath,
    ) -> Result<Subscription<DocumentSnapshot>, StoreError> {
        self.memory.watch_document(path).await
    }
}
