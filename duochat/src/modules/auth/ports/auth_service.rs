use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;

use crate::modules::auth::domain::AuthUser;

/// 认证错误类型
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid custom token")]
    InvalidToken,

    #[error("Auth service unavailable: {0}")]
    Unavailable(String),
}

/// 认证服务端口
///
/// 对外部托管认证服务的抽象，每个客户端会话持有一个实例
#[async_trait]
pub trait AuthService: Send + Sync {
    /// 匿名登录
    async fn sign_in_anonymously(&self) -> Result<AuthUser, AuthError>;

    /// 使用自定义令牌登录
    async fn sign_in_with_custom_token(&self, token: &str) -> Result<AuthUser, AuthError>;

    /// 登出，未登录时为空操作
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// 当前用户
    fn current_user(&self) -> Option<AuthUser>;

    /// 订阅认证状态变化
    fn watch_auth_state(&self) -> watch::Receiver<Option<AuthUser>>;
}
