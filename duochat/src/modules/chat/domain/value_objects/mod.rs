// Chat Domain - Value Objects
// 值对象是不可变的，通过值而非标识来比较

mod conversation_id;
mod hold_mode;
mod message_id;
mod role;

pub use conversation_id::*;
pub use hold_mode::*;
pub use message_id::*;
pub use role::*;
