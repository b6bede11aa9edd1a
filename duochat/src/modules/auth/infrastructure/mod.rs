// Auth Infrastructure Layer
//
// - AuthBackend: 共享的令牌签发方（模拟托管认证服务）
// - InMemoryAuthService: 单个客户端会话的认证状态

mod in_memory_auth;

pub use in_memory_auth::*;
