pub mod cli;
pub mod commands;
pub mod frontend;
pub mod infrastructure;
pub mod modules;
pub mod shared;

use std::sync::Arc;

use cli::Cli;
use infrastructure::{init_tracing, AppState};
use modules::ConfigModule;
use shared::AppResult;

pub async fn run(cli: Cli) -> AppResult<()> {
    let config_module = ConfigModule::new_with_file(cli.config_path());
    let config = AppState::load_config(&config_module, cli.overrides()).await?;

    // 命令行级别已合并进配置
    init_tracing(config.logging.level);
    tracing::info!("duochat starting...");
    tracing::info!(
        "Chat between '{}' and '{}', room '{}'",
        config.chat.master_uid,
        config.chat.client_uid,
        config.room.room_id
    );

    let state = Arc::new(AppState::open(config, config_module).await?);
    frontend::run_terminal(state).await
}
