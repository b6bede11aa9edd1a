// Chat Infrastructure Layer
// 基础设施层包含端口的具体实现

mod document_conversation_store;
mod hold_timer;

// 重导出常用类型
pub use document_conversation_store::*;
pub(crate) use document_conversation_store::decode_messages;
pub use hold_timer::*;
