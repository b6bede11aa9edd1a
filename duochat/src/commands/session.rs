// Session Commands
//
// 登录、切换、登出、强制登出和按住保持

use crate::commands::report;
use crate::infrastructure::{AppEvent, AppState};
use crate::modules::auth::Claims;
use crate::modules::chat::{HoldAction, Role, SessionController, SignInCommand};
use crate::modules::chat::domain::ROLE_CLAIM;
use crate::shared::{AppError, AppResult, LoginAs, SessionSummary};

async fn summarize(name: &str, controller: &SessionController) -> SessionSummary {
    let view = controller.view().await;
    SessionSummary::from_view(
        name,
        &view,
        controller.settings().max_messages_before_lock,
        controller.is_hold_armed().await,
    )
}

/// 以指定身份登录一个命名会话
pub async fn session_login(state: &AppState, name: &str, login_as: LoginAs) -> AppResult<SessionSummary> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidInput("session name must not be empty".to_string()));
    }
    if let Some(existing) = state.session(name).await {
        if existing.state().await.is_active() {
            return Err(AppError::InvalidInput(format!(
                "session '{}' is already signed in",
                name
            )));
        }
    }

    let settings = state.chat.settings();
    let command = match login_as {
        LoginAs::Anonymous => SignInCommand::anonymous(),
        LoginAs::Master | LoginAs::Client => {
            let (uid, role) = if login_as == LoginAs::Master {
                (settings.master_uid.clone(), Role::Master)
            } else {
                (settings.client_uid.clone(), Role::Client)
            };
            let mut claims = Claims::new();
            claims.insert(ROLE_CLAIM.to_string(), role.as_str().to_string());
            let token = state.auth_backend.mint_custom_token(uid, claims).await;
            SignInCommand::with_token(token)
        }
    };

    let controller = state.chat.open_session(state.new_auth());
    state.insert_session(name, controller.clone()).await;

    match controller.sign_in(command).await {
        Ok(response) => {
            tracing::info!(
                "[session_login] '{}' signed in as {} ({})",
                name,
                response.user.uid(),
                response.role.as_str()
            );
            state.event_bus.publish(AppEvent::AuthChanged {
                session: name.to_string(),
                uid: Some(response.user.uid().to_string()),
            });
            Ok(summarize(name, &controller).await)
        }
        Err(e) => {
            state.remove_session(name).await;
            Err(report(state, "session_login", e))
        }
    }
}

/// 切换当前会话
pub async fn session_use(state: &AppState, name: &str) -> AppResult<SessionSummary> {
    state.set_active(name).await?;
    let (name, controller) = state.active_controller().await?;
    Ok(summarize(&name, &controller).await)
}

/// 当前会话概要
pub async fn session_status(state: &AppState) -> AppResult<SessionSummary> {
    let (name, controller) = state.active_controller().await?;
    Ok(summarize(&name, &controller).await)
}

/// 全部会话概要
pub async fn session_list(state: &AppState) -> Vec<SessionSummary> {
    let mut summaries = Vec::new();
    for name in state.session_names().await {
        if let Some(controller) = state.session(&name).await {
            summaries.push(summarize(&name, &controller).await);
        }
    }
    summaries
}

/// 登出当前会话，返回删除的消息数
pub async fn session_logout(state: &AppState) -> AppResult<usize> {
    let (name, controller) = state.active_controller().await?;
    let result = controller.logout().await;
    state.remove_session(&name).await;
    state.event_bus.publish(AppEvent::AuthChanged {
        session: name.clone(),
        uid: None,
    });

    let terminated = result.map_err(|e| report(state, "session_logout", e))?;
    Ok(terminated.map(|event| event.deleted_messages).unwrap_or(0))
}

/// master 强制 client 登出
pub async fn session_force_logout(state: &AppState) -> AppResult<()> {
    let (_, controller) = state.active_controller().await?;
    controller
        .force_logout_client()
        .await
        .map_err(|e| report(state, "session_force_logout", e))
}

/// 按下保持控件，返回计时器是否处于待触发状态
pub async fn session_press_hold(state: &AppState) -> AppResult<bool> {
    let (_, controller) = state.active_controller().await?;
    let action = controller
        .press_hold()
        .await
        .map_err(|e| report(state, "session_press_hold", e))?;
    Ok(action == HoldAction::Arm)
}

/// 松开保持控件
pub async fn session_release_hold(state: &AppState) -> AppResult<bool> {
    let (_, controller) = state.active_controller().await?;
    let action = controller
        .release_hold()
        .await
        .map_err(|e| report(state, "session_release_hold", e))?;
    Ok(action == HoldAction::Arm)
}

/// 清理已被动结束（超时或强制登出）的会话
pub async fn session_prune(state: &AppState) -> Vec<String> {
    let mut pruned = Vec::new();
    for name in state.session_names().await {
        let Some(controller) = state.session(&name).await else {
            continue;
        };
        if !controller.state().await.is_active() {
            state.remove_session(&name).await;
            pruned.push(name);
        }
    }
    pruned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::config::AppConfig;
    use crate::modules::store::InMemoryDocumentStore;
    use crate::modules::ConfigModule;
    use std::sync::Arc;

    fn state() -> AppState {
        AppState::with_store(
            AppConfig::default(),
            ConfigModule::new_in_memory(),
            Arc::new(InMemoryDocumentStore::new()),
        )
    }

    #[tokio::test]
    async fn test_login_master_and_client() {
        let state = state();

        let master = session_login(&state, "m", LoginAs::Master).await.unwrap();
        assert_eq!(master.role, Some(Role::Master));
        assert_eq!(master.remaining, None);

        let client = session_login(&state, "c", LoginAs::Client).await.unwrap();
        assert_eq!(client.role, Some(Role::Client));
        assert_eq!(client.remaining, Some(3));
        assert_eq!(state.active_name().await.as_deref(), Some("c"));

        // 重复登录同名会话被拒绝
        assert!(matches!(
            session_login(&state, "c", LoginAs::Client).await,
            Err(AppError::InvalidInput(_))
        ));

        assert_eq!(session_list(&state).await.len(), 2);
    }

    #[tokio::test]
    async fn test_logout_removes_session() {
        let state = state();
        session_login(&state, "c", LoginAs::Client).await.unwrap();

        assert_eq!(session_logout(&state).await.unwrap(), 0);
        assert!(state.session_names().await.is_empty());
        assert!(matches!(
            session_status(&state).await,
            Err(AppError::NoActiveSession)
        ));
    }

    #[tokio::test]
    async fn test_force_logout_requires_master() {
        let state = state();
        session_login(&state, "c", LoginAs::Client).await.unwrap();

        assert!(session_force_logout(&state).await.is_err());
    }

    #[tokio::test]
    async fn test_anonymous_is_master() {
        let state = state();
        let summary = session_login(&state, "guest", LoginAs::Anonymous)
            .await
            .unwrap();
        assert_eq!(summary.role, Some(Role::Master));
        assert_ne!(summary.uid.as_deref(), Some("master"));
    }
}
