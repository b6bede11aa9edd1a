// 前端命令层
//
// 视图调用的全部操作，错误统一转为 AppError：
// 存储和配置错误弹出错误提示，认证错误只记录日志

pub mod chat;
pub mod config;
pub mod room;
pub mod session;

pub use chat::*;
pub use config::*;
pub use room::*;
pub use session::*;

use crate::infrastructure::AppState;
use crate::shared::AppError;

/// 上报错误并原样返回
pub(crate) fn report(state: &AppState, command: &str, err: impl Into<AppError>) -> AppError {
    let err = err.into();
    match &err {
        AppError::AuthError(msg) => {
            tracing::warn!("[{}] Authentication failed: {}", command, msg);
        }
        e if e.is_dialog_worthy() => {
            state.event_bus.error_dialog(e.to_string());
        }
        e => tracing::debug!("[{}] {}", command, e),
    }
    err
}
