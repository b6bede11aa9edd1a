// Chat Application Layer - 应用层
// 实现 CQRS 模式的命令和查询处理器，以及驱动会话状态机的 SessionController

pub mod commands;
pub mod queries;
mod session_controller;
mod settings;

// 导出命令和查询
pub use commands::*;
pub use queries::*;
pub use session_controller::*;
pub use settings::*;

use async_trait::async_trait;
use thiserror::Error;

use super::domain::{InvalidTransition, RejectReason};
use crate::modules::auth::AuthError;
use crate::modules::store::StoreError;

/// 应用层错误类型
#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Message rejected: {0}")]
    Rejected(#[from] RejectReason),

    #[error("Auth error: {0}")]
    AuthError(#[from] AuthError),

    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    #[error("{0}")]
    InvalidTransition(#[from] InvalidTransition),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// 命令处理器 trait
///
/// 遵循 CQRS 模式，命令处理器负责执行有副作用的操作
#[async_trait]
pub trait CommandHandler<C, R>: Send + Sync
where
    C: Send + Sync,
{
    /// 执行命令
    async fn handle(&self, command: C) -> Result<R, ApplicationError>;
}

/// 查询处理器 trait
///
/// 遵循 CQRS 模式，查询处理器负责只读操作
#[async_trait]
pub trait QueryHandler<Q, R>: Send + Sync
where
    Q: Send + Sync,
{
    /// 执行查询
    async fn handle(&self, query: Q) -> Result<R, ApplicationError>;
}
