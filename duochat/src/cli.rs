use clap::Parser;
use std::path::PathBuf;

use crate::modules::config::{
    LogLevel, PartialAppConfig, PartialLoggingConfig, PartialStorageConfig, CONFIG_FILE_NAME,
};

#[derive(Parser, Debug, Default)]
#[command(name = "duochat", version, about = "Private master/client chat with an open room")]
pub struct Cli {
    /// Config file path (defaults to <data-dir>/config.json)
    #[arg(long = "config", env = "DUOCHAT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Data directory for config and persisted documents
    #[arg(long = "data-dir", env = "DUOCHAT_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Persist documents to <data-dir>/documents.json
    #[arg(long = "persist")]
    pub persist: bool,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long = "log-level")]
    pub log_level: Option<String>,
}

impl Cli {
    /// 配置文件路径
    pub fn config_path(&self) -> PathBuf {
        match (&self.config, &self.data_dir) {
            (Some(path), _) => path.clone(),
            (None, Some(dir)) => dir.join(CONFIG_FILE_NAME),
            (None, None) => PathBuf::from(".duochat").join(CONFIG_FILE_NAME),
        }
    }

    /// 命令行覆盖项，不写回配置文件
    pub fn overrides(&self) -> PartialAppConfig {
        let storage = if self.persist || self.data_dir.is_some() {
            Some(PartialStorageConfig {
                persist: self.persist.then_some(true),
                data_dir: self.data_dir.clone(),
            })
        } else {
            None
        };

        PartialAppConfig {
            storage,
            logging: self.log_level.as_deref().map(|level| PartialLoggingConfig {
                level: Some(LogLevel::from(level)),
            }),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arguments() {
        let cli = Cli::parse_from([
            "duochat",
            "--data-dir",
            "/tmp/duo",
            "--persist",
            "--log-level",
            "debug",
        ]);
        assert_eq!(cli.config_path(), PathBuf::from("/tmp/duo/config.json"));

        let overrides = cli.overrides();
        let storage = overrides.storage.unwrap();
        assert_eq!(storage.persist, Some(true));
        assert_eq!(storage.data_dir, Some(PathBuf::from("/tmp/duo")));
        assert_eq!(overrides.logging.unwrap().level, Some(LogLevel::Debug));
    }

    #[test]
    fn test_no_overrides_by_default() {
        let overrides = Cli::default().overrides();
        assert!(overrides.storage.is_none());
        assert!(overrides.logging.is_none());
    }
}
