use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// 用户唯一标识
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// 生成匿名用户 ID
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// 认证服务签发的自定义声明
pub type Claims = BTreeMap<String, String>;

/// 已认证用户
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    uid: UserId,
    is_anonymous: bool,
    claims: Claims,
    signed_in_at: DateTime<Utc>,
}

impl AuthUser {
    pub fn anonymous(uid: UserId) -> Self {
        Self {
            uid,
            is_anonymous: true,
            claims: Claims::new(),
            signed_in_at: Utc::now(),
        }
    }

    pub fn with_claims(uid: UserId, claims: Claims) -> Self {
        Self {
            uid,
            is_anonymous: false,
            claims,
            signed_in_at: Utc::now(),
        }
    }

    // Getters
    pub fn uid(&self) -> &UserId {
        &self.uid
    }

    pub fn is_anonymous(&self) -> bool {
        self.is_anonymous
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    pub fn claim(&self, name: &str) -> Option<&str> {
        self.claims.get(name).map(String::as_str)
    }

    pub fn signed_in_at(&self) -> DateTime<Utc> {
        self.signed_in_at
    }
}
