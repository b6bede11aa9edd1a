// Store Domain Layer
// 文档存储的领域模型：路径、文档、查询、批量写入和快照

pub mod batch;
pub mod document;
pub mod path;
pub mod query;
pub mod snapshot;

// 重导出常用类型
pub use batch::{FieldUpdates, FieldValue, SetOptions, WriteBatch, WriteOp};
pub use document::{encode_fields, Document, Fields};
pub use path::{CollectionPath, DocumentPath, PathError};
pub use query::{Direction, Limit, Query};
pub use snapshot::{DocumentSnapshot, QuerySnapshot};
