// Auth Module - 认证模块
//
// 外部认证服务的端口与适配器：匿名 / 自定义令牌登录、登出、认证状态订阅

pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use domain::{AuthUser, Claims, UserId};
pub use infrastructure::{AuthBackend, InMemoryAuthService};
pub use ports::{AuthError, AuthService};
