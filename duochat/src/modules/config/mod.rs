// Config Module
//
// 配置管理模块，采用六边形架构
//
// 层次结构:
// - domain: 领域层，包含配置实体和值对象
// - ports: 端口层，定义配置读写的抽象接口
// - infrastructure: 基础设施层，实现具体的配置存储适配器
// - application: 应用层，配置服务（读取、合并校验、恢复默认）

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;

// 重新导出常用类型

// Domain
pub use domain::{
    AppConfig, ChatConfig, LogLevel, LoggingConfig, PartialAppConfig, PartialChatConfig,
    PartialLoggingConfig, PartialRoomConfig, PartialStorageConfig, RoomConfig, StorageConfig,
};

// Ports
pub use ports::{ConfigError, ConfigRepository};

// Infrastructure
pub use infrastructure::{FileConfigRepository, InMemoryConfigRepository, CONFIG_FILE_NAME};

// Application
pub use application::{ConfigService, ConfigUpdate};

use std::path::PathBuf;
use std::sync::Arc;

/// Config 模块容器
///
/// 管理模块内的依赖注入
pub struct ConfigModule {
    service: ConfigService,
}

impl ConfigModule {
    /// 使用内存仓储创建（用于测试）
    pub fn new_in_memory() -> Self {
        Self::with_repository(Arc::new(InMemoryConfigRepository::new()))
    }

    /// 使用 JSON 配置文件创建
    pub fn new_with_file(config_path: PathBuf) -> Self {
        Self::with_repository(Arc::new(FileConfigRepository::new(config_path)))
    }

    /// 使用自定义仓储创建
    pub fn with_repository(repository: Arc<dyn ConfigRepository>) -> Self {
        Self {
            service: ConfigService::new(repository),
        }
    }

    /// 获取配置服务
    pub fn service(&self) -> &ConfigService {
        &self.service
    }

    /// 获取全部配置
    pub async fn get_all(&self) -> Result<AppConfig, ConfigError> {
        self.service.get_all().await
    }

    /// 更新配置
    pub async fn update(&self, partial: PartialAppConfig) -> Result<ConfigUpdate, ConfigError> {
        self.service.update(partial).await
    }

    /// 重置配置
    pub async fn reset(&self) -> Result<AppConfig, ConfigError> {
        self.service.reset().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::chat::domain::HoldMode;

    #[tokio::test]
    async fn test_config_module_integration() {
        let module = ConfigModule::new_in_memory();

        // 获取默认配置
        let config = module.get_all().await.unwrap();
        assert_eq!(config.chat.hold_mode, HoldMode::DeadMan);

        // 更新配置
        let updated = module
            .update(PartialAppConfig {
                chat: Some(PartialChatConfig {
                    hold_mode: Some(HoldMode::LongPress),
                    hold_timeout_ms: Some(1500),
                    ..Default::default()
                }),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(updated.changed, vec!["chat"]);
        assert_eq!(updated.config.chat.hold_mode, HoldMode::LongPress);
        assert_eq!(updated.config.chat.hold_timeout_ms, 1500);

        // 重置配置
        let reset = module.reset().await.unwrap();
        assert_eq!(reset.chat.hold_mode, HoldMode::DeadMan);
        assert_eq!(reset.chat.hold_timeout_ms, 3000);
    }
}
