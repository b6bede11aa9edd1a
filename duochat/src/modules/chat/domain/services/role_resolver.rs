use super::super::value_objects::Role;
use crate::modules::auth::{AuthUser, UserId};

/// 认证服务签发的角色声明名
pub const ROLE_CLAIM: &str = "role";

/// 角色解析
///
/// 优先使用服务端签发的角色声明；没有声明时退回到
/// 与配置的 client 身份做精确比较
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleResolver {
    client_uid: UserId,
}

impl RoleResolver {
    pub fn new(client_uid: UserId) -> Self {
        Self { client_uid }
    }

    pub fn client_uid(&self) -> &UserId {
        &self.client_uid
    }

    pub fn resolve(&self, user: &AuthUser) -> Role {
        if let Some(claim) = user.claim(ROLE_CLAIM) {
            match claim.parse::<Role>() {
                Ok(role) => return role,
                Err(e) => {
                    tracing::warn!(
                        "[RoleResolver] Ignoring role claim for {}: {}",
                        user.uid(),
                        e
                    );
                }
            }
        }
        self.resolve_uid(user.uid())
    }

    /// 仅按身份比较
    pub fn resolve_uid(&self, uid: &UserId) -> Role {
        if uid == &self.client_uid {
            Role::Client
        } else {
            Role::Master
        }
    }
}
