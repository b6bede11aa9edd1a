use thiserror::Error;

use super::super::entities::ClientStatus;
use super::super::value_objects::Role;

/// 锁定前 client 可发送的消息数
pub const DEFAULT_MAX_MESSAGES_BEFORE_LOCK: u32 = 3;
/// 重置计数的特殊口令
pub const DEFAULT_UNLOCK_CODE: &str = "UNLOCK123";
/// 口令生效后追加的系统通知
pub const UNLOCK_NOTICE: &str = "Message limit reset. You can send messages again.";

/// 拒绝原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("message is empty")]
    Empty,

    #[error("client is not logged in")]
    NotLoggedIn,

    #[error("message limit of {max} reached")]
    Locked { max: u32 },
}

/// 发送判定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendDecision {
    /// 作为普通消息投递，`counted` 为 true 时同批次计数 +1
    Deliver { counted: bool },
    /// 特殊口令：计数清零并追加系统通知
    Unlock,
    /// 拒绝，不产生任何写入
    Reject(RejectReason),
}

/// 发送门控策略
///
/// 基于实时同步的 ClientStatus 在本地判定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatingPolicy {
    max_messages_before_lock: u32,
    unlock_code: String,
}

impl GatingPolicy {
    pub fn new(max_messages_before_lock: u32, unlock_code: impl Into<String>) -> Self {
        Self {
            max_messages_before_lock,
            unlock_code: unlock_code.into(),
        }
    }

    pub fn max_messages_before_lock(&self) -> u32 {
        self.max_messages_before_lock
    }

    /// 是否为特殊口令（忽略大小写和首尾空白）
    pub fn is_unlock_code(&self, text: &str) -> bool {
        text.trim().to_lowercase() == self.unlock_code.to_lowercase()
    }

    /// 剩余可发送条数
    pub fn remaining(&self, status: &ClientStatus) -> u32 {
        self.max_messages_before_lock
            .saturating_sub(status.msg_count())
    }

    pub fn evaluate(&self, role: Role, status: Option<&ClientStatus>, text: &str) -> SendDecision {
        if text.trim().is_empty() {
            return SendDecision::Reject(RejectReason::Empty);
        }

        match role {
            Role::Master => SendDecision::Deliver { counted: false },
            Role::Client => {
                let Some(status) = status.filter(|s| s.is_logged_in()) else {
                    return SendDecision::Reject(RejectReason::NotLoggedIn);
                };
                if self.is_unlock_code(text) {
                    return SendDecision::Unlock;
                }
                if status.msg_count() >= self.max_messages_before_lock {
                    return SendDecision::Reject(RejectReason::Locked {
                        max: self.max_messages_before_lock,
                    });
                }
                SendDecision::Deliver { counted: true }
            }
        }
    }
}

impl Default for GatingPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGES_BEFORE_LOCK, DEFAULT_UNLOCK_CODE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn status_with(count: u32) -> ClientStatus {
        let mut status = ClientStatus::fresh_login(Utc::now());
        status.set_msg_count(count);
        status
    }

    #[test]
    fn test_client_under_limit_is_counted() {
        let policy = GatingPolicy::default();
        for count in 0..DEFAULT_MAX_MESSAGES_BEFORE_LOCK {
            assert_eq!(
                policy.evaluate(Role::Client, Some(&status_with(count)), "hi"),
                SendDecision::Deliver { counted: true }
            );
        }
    }

    #[test]
    fn test_client_at_limit_is_rejected() {
        let policy = GatingPolicy::default();
        let decision = policy.evaluate(Role::Client, Some(&status_with(3)), "one more");

        assert_eq!(
            decision,
            SendDecision::Reject(RejectReason::Locked { max: 3 })
        );
    }

    #[test]
    fn test_unlock_code_any_case_even_when_locked() {
        let policy = GatingPolicy::default();
        for text in ["UNLOCK123", "unlock123", "  UnLoCk123 "] {
            assert_eq!(
                policy.evaluate(Role::Client, Some(&status_with(3)), text),
                SendDecision::Unlock
            );
        }
        assert_ne!(
            policy.evaluate(Role::Client, Some(&status_with(0)), "UNLOCK1234"),
            SendDecision::Unlock
        );
    }

    #[test]
    fn test_client_not_logged_in() {
        let policy = GatingPolicy::default();
        let mut logged_out = status_with(0);
        logged_out.set_logged_in(false);

        assert_eq!(
            policy.evaluate(Role::Client, None, "hi"),
            SendDecision::Reject(RejectReason::NotLoggedIn)
        );
        assert_eq!(
            policy.evaluate(Role::Client, Some(&logged_out), "UNLOCK123"),
            SendDecision::Reject(RejectReason::NotLoggedIn)
        );
    }

    #[test]
    fn test_master_is_never_gated() {
        let policy = GatingPolicy::default();
        assert_eq!(
            policy.evaluate(Role::Master, Some(&status_with(99)), "UNLOCK123"),
            SendDecision::Deliver { counted: false }
        );
        assert_eq!(
            policy.evaluate(Role::Master, None, "   "),
            SendDecision::Reject(RejectReason::Empty)
        );
    }

    #[test]
    fn test_remaining() {
        let policy = GatingPolicy::new(5, "open");
        assert_eq!(policy.remaining(&status_with(2)), 3);
        assert_eq!(policy.remaining(&status_with(7)), 0);
    }
}
