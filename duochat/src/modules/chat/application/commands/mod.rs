// Chat Commands - 命令定义和处理器

mod end_session;
mod force_logout;
mod send_message;
mod sign_in;

pub use end_session::*;
pub use force_logout::*;
pub use send_message::*;
pub use sign_in::*;
