//! AppConfig Poller - AppConfig 扩展轮询客户端
//!
//! 通过本地 AppConfig 扩展拉取配置档案，支持：
//! - JSON 文档扁平化为忽略大小写的键值映射
//! - 基于指纹的变化检测
//! - 后台轮询与失败时保留缓存配置
//! - 重载状态等待与变更通知
//! - 结构化日志记录

pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod reload;
pub mod snapshot;

// 重新导出主要类型
pub use config::{AppConfigOptions, ClientConfig, PollInterval};
pub use error::{AppConfigError, OptionsError, ReloadError};
pub use fetch::{ConfigFetcher, HttpConfigFetcher};
pub use reload::{wait_all, PollerHandle, ReloadEngine, ReloadNotification, ReloadState};
pub use snapshot::{FlatMap, Snapshot, SnapshotDiff};

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
