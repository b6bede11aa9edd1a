// Store Infrastructure Layer
//
// 文档存储实现：
// - InMemoryDocumentStore: 内存存储，用于开发和测试
// - FileDocumentStore: 文件持久化存储

mod file_store;
mod in_memory_store;

pub use file_store::*;
pub use in_memory_store::*;
