// Config Domain Entities
//
// 配置领域实体定义

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::value_objects::LogLevel;
use crate::modules::chat::domain::{
    HoldMode, DEFAULT_MAX_MESSAGES_BEFORE_LOCK, DEFAULT_UNLOCK_CODE,
};

/// 聊天配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChatConfig {
    pub master_uid: String,
    pub client_uid: String,
    pub max_messages_before_lock: u32,
    pub unlock_code: String,
    pub hold_timeout_ms: u64,
    pub hold_mode: HoldMode,
    pub message_limit: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            master_uid: "master".to_string(),
            client_uid: "client".to_string(),
            max_messages_before_lock: DEFAULT_MAX_MESSAGES_BEFORE_LOCK,
            unlock_code: DEFAULT_UNLOCK_CODE.to_string(),
            hold_timeout_ms: 3000,
            hold_mode: HoldMode::default(),
            message_limit: 50,
        }
    }
}

/// 开放聊天室配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RoomConfig {
    pub room_id: String,
    pub message_limit: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            room_id: "lobby".to_string(),
            message_limit: 100,
        }
    }
}

/// 存储配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StorageConfig {
    /// 是否持久化到磁盘
    pub persist: bool,
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            persist: false,
            data_dir: PathBuf::from(".duochat"),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggingConfig {
    pub level: LogLevel,
}

/// 应用配置聚合根
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    pub chat: ChatConfig,
    pub room: RoomConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// 创建新的默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 合并部分配置更新
    pub fn merge(&mut self, partial: PartialAppConfig) {
        if let Some(chat) = partial.chat {
            if let Some(master_uid) = chat.master_uid {
                self.chat.master_uid = master_uid;
            }
            if let Some(client_uid) = chat.client_uid {
                self.chat.client_uid = client_uid;
            }
            if let Some(max) = chat.max_messages_before_lock {
                self.chat.max_messages_before_lock = max;
            }
            if let Some(unlock_code) = chat.unlock_code {
                self.chat.unlock_code = unlock_code;
            }
            if let Some(hold_timeout_ms) = chat.hold_timeout_ms {
                self.chat.hold_timeout_ms = hold_timeout_ms;
            }
            if let Some(hold_mode) = chat.hold_mode {
                self.chat.hold_mode = hold_mode;
            }
            if let Some(message_limit) = chat.message_limit {
                self.chat.message_limit = message_limit;
            }
        }

        if let Some(room) = partial.room {
            if let Some(room_id) = room.room_id {
                self.room.room_id = room_id;
            }
            if let Some(message_limit) = room.message_limit {
                self.room.message_limit = message_limit;
            }
        }

        if let Some(storage) = partial.storage {
            if let Some(persist) = storage.persist {
                self.storage.persist = persist;
            }
            if let Some(data_dir) = storage.data_dir {
                self.storage.data_dir = data_dir;
            }
        }

        if let Some(logging) = partial.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
        }
    }

    /// 验证配置是否有效
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.chat.master_uid.trim().is_empty() || self.chat.client_uid.trim().is_empty() {
            errors.push("Master and client uids must not be empty".to_string());
        }
        if self.chat.master_uid == self.chat.client_uid {
            errors.push("Master and client uids must differ".to_string());
        }
        if self.chat.max_messages_before_lock == 0 {
            errors.push("Max messages before lock must be at least 1".to_string());
        }
        if self.chat.unlock_code.trim().is_empty() {
            errors.push("Unlock code must not be empty".to_string());
        }
        if self.chat.hold_timeout_ms == 0 {
            errors.push("Hold timeout must be positive".to_string());
        }
        if self.chat.message_limit == 0 || self.room.message_limit == 0 {
            errors.push("Message limits must be at least 1".to_string());
        }
        if self.room.room_id.is_empty() || self.room.room_id.contains('/') {
            errors.push("Room id must be a non-empty path segment".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// 部分配置更新（用于合并）
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PartialAppConfig {
    pub chat: Option<PartialChatConfig>,
    pub room: Option<PartialRoomConfig>,
    pub storage: Option<PartialStorageConfig>,
    pub logging: Option<PartialLoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PartialChatConfig {
    pub master_uid: Option<String>,
    pub client_uid: Option<String>,
    pub max_messages_before_lock: Option<u32>,
    pub unlock_code: Option<String>,
    pub hold_timeout_ms: Option<u64>,
    pub hold_mode: Option<HoldMode>,
    pub message_limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PartialRoomConfig {
    pub room_id: Option<String>,
    pub message_limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PartialStorageConfig {
    pub persist: Option<bool>,
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PartialLoggingConfig {
    pub level: Option<LogLevel>,
}
