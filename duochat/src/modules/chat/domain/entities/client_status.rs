use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Client 状态实体
///
/// 每个 client 身份一份，由双方实时订阅
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientStatus {
    #[serde(default)]
    is_logged_in: bool,
    #[serde(default)]
    msg_count: u32,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    last_login: Option<DateTime<Utc>>,
    #[serde(default)]
    force_logout: bool,
}

impl ClientStatus {
    /// 登录时的初始状态（计数清零）
    pub fn fresh_login(at: DateTime<Utc>) -> Self {
        Self {
            is_logged_in: true,
            msg_count: 0,
            last_login: Some(at.trunc_subsecs(3)),
            force_logout: false,
        }
    }

    // Getters
    pub fn is_logged_in(&self) -> bool {
        self.is_logged_in
    }

    pub fn msg_count(&self) -> u32 {
        self.msg_count
    }

    pub fn last_login(&self) -> Option<DateTime<Utc>> {
        self.last_login
    }

    pub fn force_logout(&self) -> bool {
        self.force_logout
    }

    // Setters
    pub fn set_msg_count(&mut self, count: u32) {
        self.msg_count = count;
    }

    pub fn set_force_logout(&mut self, force_logout: bool) {
        self.force_logout = force_logout;
    }

    pub fn set_logged_in(&mut self, is_logged_in: bool) {
        self.is_logged_in = is_logged_in;
    }
}
