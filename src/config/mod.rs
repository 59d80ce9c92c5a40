//! 客户端选项模块
//!
//! 提供选项文件解析、环境变量覆盖和验证功能

pub mod loader;
pub mod types;

// 重新导出主要类型
pub use loader::{apply_extension_env, ConfigLoader, TomlConfigLoader};
pub use types::{
    validate_config, validate_options, AppConfigOptions, ClientConfig, LoggingOptions,
    PollInterval,
};
