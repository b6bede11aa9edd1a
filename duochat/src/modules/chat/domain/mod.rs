// Chat Domain Layer
// 领域层包含业务实体、值对象、领域服务、会话状态机和领域事件

pub mod entities;
pub mod events;
pub mod services;
pub mod state_machine;
pub mod value_objects;

// 重导出常用类型
pub use entities::{ClientStatus, Message, SYSTEM_SENDER_ID};
pub use events::*;
pub use services::{
    GatingPolicy, RejectReason, RoleResolver, SendDecision, DEFAULT_MAX_MESSAGES_BEFORE_LOCK,
    DEFAULT_UNLOCK_CODE, ROLE_CLAIM, UNLOCK_NOTICE,
};
pub use state_machine::{InvalidTransition, SessionEvent, SessionState};
pub use value_objects::{ConversationId, HoldAction, HoldMode, MessageId, Role, UnknownRole};
