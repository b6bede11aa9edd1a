// Config Service

use std::sync::Arc;

use crate::modules::config::domain::{AppConfig, PartialAppConfig};
use crate::modules::config::ports::{ConfigError, ConfigRepository};

/// 配置更新结果
#[derive(Debug, Clone)]
pub struct ConfigUpdate {
    pub config: AppConfig,
    /// 发生变化的配置段，如 `chat`、`room`
    pub changed: Vec<&'static str>,
}

impl ConfigUpdate {
    pub fn is_noop(&self) -> bool {
        self.changed.is_empty()
    }
}

fn changed_sections(before: &AppConfig, after: &AppConfig) -> Vec<&'static str> {
    let mut changed = Vec::new();
    if before.chat != after.chat {
        changed.push("chat");
    }
    if before.room != after.room {
        changed.push("room");
    }
    if before.storage != after.storage {
        changed.push("storage");
    }
    if before.logging != after.logging {
        changed.push("logging");
    }
    changed
}

/// 配置服务
pub struct ConfigService {
    repository: Arc<dyn ConfigRepository>,
}

impl ConfigService {
    pub fn new(repository: Arc<dyn ConfigRepository>) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &Arc<dyn ConfigRepository> {
        &self.repository
    }

    pub async fn get_all(&self) -> Result<AppConfig, ConfigError> {
        self.repository.load().await
    }

    /// 合并部分配置，校验失败时不保存
    pub async fn update(&self, partial: PartialAppConfig) -> Result<ConfigUpdate, ConfigError> {
        let before = self.repository.load().await?;
        let mut config = before.clone();
        config.merge(partial);
        config
            .validate()
            .map_err(|errors| ConfigError::ValidationError { errors })?;

        let changed = changed_sections(&before, &config);
        if !changed.is_empty() {
            self.repository.save(&config).await?;
            tracing::info!("[Config] Updated sections: {}", changed.join(", "));
        }
        Ok(ConfigUpdate { config, changed })
    }

    /// 删除已保存配置，恢复默认
    pub async fn reset(&self) -> Result<AppConfig, ConfigError> {
        self.repository.clear().await?;
        tracing::info!("[Config] Configuration reset to defaults");
        self.repository.load().await
    }
}
