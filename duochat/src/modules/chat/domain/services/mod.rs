// Chat Domain Services
// 领域服务：发送门控与角色解析

mod gating_policy;
mod role_resolver;

pub use gating_policy::*;
pub use role_resolver::*;
