// Chat Commands
//
// 当前会话的发送、消息列表和 client 状态查询

use serde::Serialize;

use crate::commands::report;
use crate::infrastructure::AppState;
use crate::modules::chat::{ClientStatus, ListMessagesQuery};
use crate::shared::{AppResult, MessageView, SendResult};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientStatusResponse {
    pub client_uid: String,
    pub status: Option<ClientStatus>,
    pub remaining: Option<u32>,
}

/// 从当前会话发送消息
pub async fn chat_send_message(state: &AppState, text: &str) -> AppResult<SendResult> {
    let (name, controller) = state.active_controller().await?;
    tracing::debug!("[chat_send_message] Sending from session '{}'", name);

    let outcome = controller
        .send(text)
        .await
        .map_err(|e| report(state, "chat_send_message", e))?;
    Ok(SendResult::from(&outcome))
}

/// 当前会话缓冲中的消息
pub async fn chat_get_messages(state: &AppState) -> AppResult<Vec<MessageView>> {
    let (_, controller) = state.active_controller().await?;
    let view = controller.view().await;
    Ok(view.messages().iter().map(MessageView::from).collect())
}

/// 直接查询对话的最近消息，不依赖登录会话
pub async fn chat_fetch_history(state: &AppState, limit: usize) -> AppResult<Vec<MessageView>> {
    let response = state
        .chat
        .list_messages(ListMessagesQuery::new(state.chat.default_conversation(), limit))
        .await
        .map_err(|e| report(state, "chat_fetch_history", e))?;
    Ok(response.messages.iter().map(MessageView::from).collect())
}

/// 查询配置的 client 状态文档
pub async fn chat_client_status(state: &AppState) -> AppResult<ClientStatusResponse> {
    let client = state.chat.settings().client_uid.clone();
    let response = state
        .chat
        .client_status(client.clone())
        .await
        .map_err(|e| report(state, "chat_client_status", e))?;
    Ok(ClientStatusResponse {
        client_uid: client.to_string(),
        status: response.status,
        remaining: response.remaining,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::session_login;
    use crate::modules::config::AppConfig;
    use crate::modules::store::InMemoryDocumentStore;
    use crate::modules::ConfigModule;
    use crate::shared::{AppError, LoginAs};
    use std::sync::Arc;

    fn state() -> AppState {
        AppState::with_store(
            AppConfig::default(),
            ConfigModule::new_in_memory(),
            Arc::new(InMemoryDocumentStore::new()),
        )
    }

    #[tokio::test]
    async fn test_send_requires_session() {
        let state = state();
        assert!(matches!(
            chat_send_message(&state, "hi").await,
            Err(AppError::NoActiveSession)
        ));
    }

    #[tokio::test]
    async fn test_client_lock_and_unlock() {
        let state = state();
        session_login(&state, "c", LoginAs::Client).await.unwrap();

        for text in ["one", "two", "three"] {
            let result = chat_send_message(&state, text).await.unwrap();
            assert!(matches!(result, SendResult::Delivered { counted: true, .. }));
        }
        assert!(matches!(
            chat_send_message(&state, "four").await,
            Err(AppError::Rejected(_))
        ));

        let result = chat_send_message(&state, "unlock123").await.unwrap();
        assert!(matches!(result, SendResult::Unlocked { .. }));

        let status = chat_client_status(&state).await.unwrap();
        assert_eq!(status.remaining, Some(3));

        let history = chat_fetch_history(&state, 50).await.unwrap();
        assert_eq!(history.len(), 4);
        assert!(history[3].is_system);
    }

    #[tokio::test]
    async fn test_fetch_history_rejects_zero_limit() {
        let state = state();
        assert!(matches!(
            chat_fetch_history(&state, 0).await,
            Err(AppError::InvalidInput(_))
        ));
    }
}
