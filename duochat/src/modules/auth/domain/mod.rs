// Auth Domain Layer
// 认证领域：用户标识与已认证用户

mod user;

pub use user::*;
