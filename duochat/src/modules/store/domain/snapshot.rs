use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

use super::document::Document;
use super::path::DocumentPath;

/// 查询快照
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySnapshot {
    documents: Vec<Document>,
    read_time: DateTime<Utc>,
}

impl QuerySnapshot {
    pub fn new(documents: Vec<Document>, read_time: DateTime<Utc>) -> Self {
        Self {
            documents,
            read_time,
        }
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn into_documents(self) -> Vec<Document> {
        self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn read_time(&self) -> DateTime<Utc> {
        self.read_time
    }

    /// 解码全部文档，任一文档解码失败则返回错误
    pub fn decode_all<T: DeserializeOwned>(&self) -> Result<Vec<T>, serde_json::Error> {
        self.documents.iter().map(Document::decode).collect()
    }
}

/// 单文档快照
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    path: DocumentPath,
    document: Option<Document>,
    read_time: DateTime<Utc>,
}

impl DocumentSnapshot {
    pub fn new(path: DocumentPath, document: Option<Document>, read_time: DateTime<Utc>) -> Self {
        Self {
            path,
            document,
            read_time,
        }
    }

    pub fn path(&self) -> &DocumentPath {
        &self.path
    }

    pub fn document(&self) -> Option<&Document> {
        self.document.as_ref()
    }

    pub fn exists(&self) -> bool {
        self.document.is_some()
    }

    pub fn read_time(&self) -> DateTime<Utc> {
        self.read_time
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<Option<T>, serde_json::Error> {
        self.document.as_ref().map(Document::decode).transpose()
    }
}
