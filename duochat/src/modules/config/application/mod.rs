// Config Application Layer
//
// 读取、合并校验后保存、恢复默认

pub mod service;

pub use service::*;
