// Store Ports Layer
// 端口定义了外部文档数据库的接口

mod document_store;
mod subscription;

pub use document_store::*;
pub use subscription::*;
