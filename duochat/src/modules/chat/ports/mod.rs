// Chat Ports Layer
// 端口定义了模块与外部世界的接口

mod conversation_store;

pub use conversation_store::*;
