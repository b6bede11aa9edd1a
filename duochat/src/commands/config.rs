// Config Commands
//
// 配置读写，修改在下次启动时生效

use crate::commands::report;
use crate::infrastructure::AppState;
use crate::modules::config::{AppConfig, ConfigUpdate, PartialAppConfig};
use crate::shared::AppResult;

pub async fn config_get_all(state: &AppState) -> AppResult<AppConfig> {
    state
        .config_module
        .get_all()
        .await
        .map_err(|e| report(state, "config_get_all", e))
}

pub async fn config_update(state: &AppState, partial: PartialAppConfig) -> AppResult<ConfigUpdate> {
    let update = state
        .config_module
        .update(partial)
        .await
        .map_err(|e| report(state, "config_update", e))?;
    if !update.is_noop() {
        tracing::info!(
            "[config_update] Saved {}, restart to apply",
            update.changed.join(", ")
        );
    }
    Ok(update)
}

pub async fn config_reset(state: &AppState) -> AppResult<AppConfig> {
    state
        .config_module
        .reset()
        .await
        .map_err(|e| report(state, "config_reset", e))
}
