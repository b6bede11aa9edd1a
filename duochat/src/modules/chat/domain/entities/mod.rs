// Chat Domain - Entities
// 实体具有唯一标识

mod client_status;
mod message;

pub use client_status::*;
pub use message::*;
