// Room Commands

use crate::commands::report;
use crate::infrastructure::AppState;
use crate::shared::{AppResult, MessageView};

/// 加入开放聊天室，返回匿名 uid
pub async fn room_join(state: &AppState) -> AppResult<String> {
    let room = state.room_session().await;
    let user = room
        .join()
        .await
        .map_err(|e| report(state, "room_join", e))?;
    Ok(user.uid().to_string())
}

/// 离开聊天室
pub async fn room_leave(state: &AppState) -> AppResult<bool> {
    let room = state.room_session().await;
    room.leave().await.map_err(|e| report(state, "room_leave", e))
}

pub async fn room_say(state: &AppState, text: &str) -> AppResult<MessageView> {
    let room = state.room_session().await;
    let message = room
        .post(text)
        .await
        .map_err(|e| report(state, "room_say", e))?;
    Ok(MessageView::from(&message))
}

pub async fn room_messages(state: &AppState) -> Vec<MessageView> {
    let room = state.room_session().await;
    room.messages().await.iter().map(MessageView::from).collect()
}
