// Store Module - 文档存储模块
//
// 外部文档数据库的端口与适配器：
// - domain: 路径、文档、查询、批量写入、快照
// - ports: DocumentStore 端口与实时订阅
// - infrastructure: 内存与文件持久化实现

pub mod domain;
pub mod infrastructure;
pub mod ports;

// 重新导出常用类型
pub use domain::{
    encode_fields, CollectionPath, Direction, Document, DocumentPath, DocumentSnapshot,
    FieldUpdates, FieldValue, Fields, Limit, PathError, Query, QuerySnapshot, SetOptions,
    WriteBatch, WriteOp,
};
pub use infrastructure::{FileDocumentStore, InMemoryDocumentStore};
pub use ports::{DocumentStore, StoreError, Subscription};
