// Chat Queries - 查询定义和处理器

mod get_client_status;
mod list_messages;

pub use get_client_status::*;
pub use list_messages::*;
