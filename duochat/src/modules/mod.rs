// Modules Layer - 业务模块
//
// 按照六边形架构组织的业务模块：
// - auth: 认证模块，匿名与自定义令牌登录
// - store: 文档存储模块，路径、查询、批量写入和实时订阅
// - chat: 私聊模块，master/client 门控对话与会话控制
// - room: 开放聊天室模块
// - config: 配置模块，处理应用设置

pub mod auth;
pub mod chat;
pub mod config;
pub mod room;
pub mod store;

pub use chat::ChatModule;
pub use config::ConfigModule;
pub use room::RoomModule;
