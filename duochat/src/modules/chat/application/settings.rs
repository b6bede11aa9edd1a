use std::time::Duration;

use crate::modules::auth::UserId;
use crate::modules::chat::domain::{
    GatingPolicy, HoldMode, RoleResolver, DEFAULT_MAX_MESSAGES_BEFORE_LOCK, DEFAULT_UNLOCK_CODE,
};
use crate::modules::chat::infrastructure::DEFAULT_HOLD_TIMEOUT;
use crate::modules::chat::application::DEFAULT_MESSAGE_LIMIT;
use crate::modules::config::ChatConfig;

/// 会话运行参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub master_uid: UserId,
    pub client_uid: UserId,
    pub max_messages_before_lock: u32,
    pub unlock_code: String,
    pub hold_timeout: Duration,
    pub hold_mode: HoldMode,
    pub message_limit: usize,
}

impl SessionSettings {
    pub fn gating_policy(&self) -> GatingPolicy {
        GatingPolicy::new(self.max_messages_before_lock, self.unlock_code.clone())
    }

    pub fn role_resolver(&self) -> RoleResolver {
        RoleResolver::new(self.client_uid.clone())
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            master_uid: UserId::from("master"),
            client_uid: UserId::from("client"),
            max_messages_before_lock: DEFAULT_MAX_MESSAGES_BEFORE_LOCK,
            unlock_code: DEFAULT_UNLOCK_CODE.to_string(),
            hold_timeout: DEFAULT_HOLD_TIMEOUT,
            hold_mode: HoldMode::default(),
            message_limit: DEFAULT_MESSAGE_LIMIT,
        }
    }
}

impl From<&ChatConfig> for SessionSettings {
    fn from(config: &ChatConfig) -> Self {
        Self {
            master_uid: UserId::new(config.master_uid.clone()),
            client_uid: UserId::new(config.client_uid.clone()),
            max_messages_before_lock: config.max_messages_before_lock,
            unlock_code: config.unlock_code.clone(),
            hold_timeout: Duration::from_millis(config.hold_timeout_ms),
            hold_mode: config.hold_mode,
            message_limit: config.message_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_config_defaults() {
        let from_config = SessionSettings::from(&ChatConfig::default());
        assert_eq!(from_config, SessionSettings::default());
        assert_eq!(from_config.hold_timeout, Duration::from_millis(3000));
    }
}
