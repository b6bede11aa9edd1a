use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::value_objects::Role;

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Authenticating,
    MasterView,
    ClientView,
    LoggingOut,
}

/// 驱动状态迁移的事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    SignInStarted,
    SignedIn(Role),
    SignInFailed,
    LogoutStarted,
    LoggedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid session transition: {event:?} in state {from:?}")]
pub struct InvalidTransition {
    pub from: SessionState,
    pub event: SessionEvent,
}

impl SessionState {
    pub fn transition(self, event: SessionEvent) -> Result<SessionState, InvalidTransition> {
        use SessionEvent::*;
        use SessionState::*;

        match (self, event) {
            (Unauthenticated, SignInStarted) => Ok(Authenticating),
            (Authenticating, SignedIn(Role::Master)) => Ok(MasterView),
            (Authenticating, SignedIn(Role::Client)) => Ok(ClientView),
            (Authenticating, SignInFailed) => Ok(Unauthenticated),
            (MasterView | ClientView, LogoutStarted) => Ok(LoggingOut),
            (LoggingOut, LoggedOut) => Ok(Unauthenticated),
            (from, event) => Err(InvalidTransition { from, event }),
        }
    }

    /// 已登录且可以写入
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::MasterView | SessionState::ClientView)
    }

    pub fn role(&self) -> Option<Role> {
        match self {
            SessionState::MasterView => Some(Role::Master),
            SessionState::ClientView => Some(Role::Client),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_lifecycle() {
        let state = SessionState::default();
        let state = state.transition(SessionEvent::SignInStarted).unwrap();
        assert_eq!(state, SessionState::Authenticating);

        let state = state.transition(SessionEvent::SignedIn(Role::Client)).unwrap();
        assert_eq!(state, SessionState::ClientView);
        assert!(state.is_active());
        assert_eq!(state.role(), Some(Role::Client));

        let state = state.transition(SessionEvent::LogoutStarted).unwrap();
        assert!(!state.is_active());

        let state = state.transition(SessionEvent::LoggedOut).unwrap();
        assert_eq!(state, SessionState::Unauthenticated);
    }

    #[test]
    fn test_failed_sign_in_returns_to_unauthenticated() {
        let state = SessionState::Authenticating
            .transition(SessionEvent::SignInFailed)
            .unwrap();
        assert_eq!(state, SessionState::Unauthenticated);
    }

    #[test]
    fn test_invalid_transitions() {
        let err = SessionState::Unauthenticated
            .transition(SessionEvent::LogoutStarted)
            .unwrap_err();
        assert_eq!(err.from, SessionState::Unauthenticated);

        assert!(SessionState::LoggingOut
            .transition(SessionEvent::LogoutStarted)
            .is_err());
        assert!(SessionState::MasterView
            .transition(SessionEvent::SignedIn(Role::Client))
            .is_err());
    }
}
