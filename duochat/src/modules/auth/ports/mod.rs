// Auth Ports Layer
// 外部认证服务的接口

mod auth_service;

pub use auth_service::*;
