use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use uuid::Uuid;

use crate::modules::auth::domain::{AuthUser, Claims, UserId};
use crate::modules::auth::ports::{AuthError, AuthService};

#[derive(Debug, Clone)]
struct TokenGrant {
    uid: UserId,
    claims: Claims,
}

/// 令牌签发方
///
/// 模拟托管认证服务的服务端：签发携带声明的自定义令牌，
/// 所有会话共享同一个实例
#[derive(Default)]
pub struct AuthBackend {
    grants: RwLock<HashMap<String, TokenGrant>>,
}

impl AuthBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为用户签发自定义令牌
    pub async fn mint_custom_token(&self, uid: UserId, claims: Claims) -> String {
        let token = Uuid::new_v4().simple().to_string();
        tracing::debug!("[AuthBackend] Minted custom token for {}", uid);
        self.grants
            .write()
            .await
            .insert(token.clone(), TokenGrant { uid, claims });
        token
    }

    /// 吊销令牌
    pub async fn revoke(&self, token: &str) -> bool {
        self.grants.write().await.remove(token).is_some()
    }

    async fn verify(&self, token: &str) -> Option<TokenGrant> {
        self.grants.read().await.get(token).cloned()
    }
}

/// 内存认证服务
///
/// 持有单个会话的认证状态，令牌校验委托给共享的 AuthBackend
pub struct InMemoryAuthService {
    backend: Arc<AuthBackend>,
    state: watch::Sender<Option<AuthUser>>,
}

impl InMemoryAuthService {
    pub fn new(backend: Arc<AuthBackend>) -> Self {
        let (state, _) = watch::channel(None);
        Self { backend, state }
    }

    fn publish(&self, user: Option<AuthUser>) {
        self.state.send_replace(user);
    }
}

#[async_trait]
impl AuthService for InMemoryAuthService {
    async fn sign_in_anonymously(&self) -> Result<AuthUser, AuthError> {
        let user = AuthUser::anonymous(UserId::generate());
        tracing::info!("[InMemoryAuthService] Anonymous sign-in as {}", user.uid());
        self.publish(Some(user.clone()));
        Ok(user)
    }

    async fn sign_in_with_custom_token(&self, token: &str) -> Result<AuthUser, AuthError> {
        let grant = self.backend.verify(token).await.ok_or_else(|| {
            tracing::warn!("[InMemoryAuthService] Rejected unknown custom token");
            AuthError::InvalidToken
        })?;

        let user = AuthUser::with_claims(grant.uid, grant.claims);
        tracing::info!("[InMemoryAuthService] Custom-token sign-in as {}", user.uid());
        self.publish(Some(user.clone()));
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if let Some(user) = self.current_user() {
            tracing::info!("[InMemoryAuthService] Signed out {}", user.uid());
        }
        self.publish(None);
        Ok(())
    }

    fn current_user(&self) -> Option<AuthUser> {
        self.state.borrow().clone()
    }

    fn watch_auth_state(&self) -> watch::Receiver<Option<AuthUser>> {
        self.state.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_custom_token_carries_claims() {
        let backend = Arc::new(AuthBackend::new());
        let mut claims = Claims::new();
        claims.insert("role".to_string(), "client".to_string());
        let token = backend.mint_custom_token(UserId::from("c1"), claims).await;

        let auth = InMemoryAuthService::new(backend);
        let user = auth.sign_in_with_custom_token(&token).await.unwrap();

        assert_eq!(user.uid().as_str(), "c1");
        assert!(!user.is_anonymous());
        assert_eq!(user.claim("role"), Some("client"));
        assert_eq!(auth.current_user(), Some(user));
    }

    #[tokio::test]
    async fn test_invalid_and_revoked_tokens() {
        let backend = Arc::new(AuthBackend::new());
        let token = backend
            .mint_custom_token(UserId::from("m1"), Claims::new())
            .await;
        assert!(backend.revoke(&token).await);

        let auth = InMemoryAuthService::new(backend);
        assert!(matches!(
            auth.sign_in_with_custom_token(&token).await,
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            auth.sign_in_with_custom_token("forged").await,
            Err(AuthError::InvalidToken)
        ));
        assert!(auth.current_user().is_none());
    }

    #[tokio::test]
    async fn test_auth_state_notifications() {
        let auth = InMemoryAuthService::new(Arc::new(AuthBackend::new()));
        let mut state = auth.watch_auth_state();
        assert!(state.borrow().is_none());

        let user = auth.sign_in_anonymously().await.unwrap();
        state.changed().await.unwrap();
        assert_eq!(state.borrow().as_ref().map(AuthUser::uid), Some(user.uid()));

        auth.sign_out().await.unwrap();
        state.changed().await.unwrap();
        assert!(state.borrow().is_none());
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let backend = Arc::new(AuthBackend::new());
        let first = InMemoryAuthService::new(backend.clone());
        let second = InMemoryAuthService::new(backend);

        first.sign_in_anonymously().await.unwrap();
        assert!(first.current_user().is_some());
        assert!(second.current_user().is_none());
    }
}
