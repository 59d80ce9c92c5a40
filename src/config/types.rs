//! 客户端选项数据结构定义
//!
//! 定义 AppConfig 轮询客户端的选项结构体和验证逻辑

use crate::error::OptionsError;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// 选项文件的主结构
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// AppConfig 选项
    pub appconfig: AppConfigOptions,
    /// 日志选项
    #[serde(default)]
    pub logging: LoggingOptions,
}

/// AppConfig 扩展选项
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfigOptions {
    /// AppConfig 应用名称
    pub application: String,
    /// AppConfig 环境名称
    pub environment: String,
    /// AppConfig 配置档案名称
    #[serde(alias = "configuration")]
    pub configuration_profile: String,
    /// AppConfig 扩展监听的端口
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// 轮询间隔（秒），负数表示只加载一次
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: i64,
}

/// 日志选项
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingOptions {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,
    /// 是否使用JSON格式
    #[serde(default)]
    pub json_format: bool,
    /// 日志文件路径，未设置时不写文件
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// 是否输出到控制台
    #[serde(default = "default_console")]
    pub console: bool,
    /// 模块级别日志控制，例如 `"appconfig_poller::reload" = "debug"`
    #[serde(default)]
    pub module_levels: HashMap<String, String>,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            file: None,
            console: default_console(),
            module_levels: HashMap::new(),
        }
    }
}

/// 轮询节奏
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollInterval {
    /// 每隔固定时间轮询一次
    Every(Duration),
    /// 仅初始加载，不再轮询
    Never,
}

impl PollInterval {
    /// 由选项中的秒数换算
    pub fn from_seconds(seconds: i64) -> Self {
        if seconds < 0 {
            PollInterval::Never
        } else {
            PollInterval::Every(Duration::from_secs(seconds.unsigned_abs()))
        }
    }

    /// 固定间隔；`Never` 时为 `None`
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            PollInterval::Every(interval) => Some(*interval),
            PollInterval::Never => None,
        }
    }
}

/// 默认的 AppConfig 扩展端口
pub const DEFAULT_HTTP_PORT: u16 = 2772;

/// 默认轮询间隔（秒）
pub const DEFAULT_POLL_INTERVAL_SECONDS: i64 = 45;

// 默认值函数
fn default_http_port() -> u16 {
    DEFAULT_HTTP_PORT
}
fn default_poll_interval() -> i64 {
    DEFAULT_POLL_INTERVAL_SECONDS
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_console() -> bool {
    true
}

impl AppConfigOptions {
    /// 创建使用默认端口和轮询间隔的选项
    pub fn new(
        application: impl Into<String>,
        environment: impl Into<String>,
        configuration_profile: impl Into<String>,
    ) -> Self {
        Self {
            application: application.into(),
            environment: environment.into(),
            configuration_profile: configuration_profile.into(),
            http_port: DEFAULT_HTTP_PORT,
            poll_interval_seconds: DEFAULT_POLL_INTERVAL_SECONDS,
        }
    }

    /// 轮询节奏
    pub fn poll_interval(&self) -> PollInterval {
        PollInterval::from_seconds(self.poll_interval_seconds)
    }

    /// 配置档案的请求地址
    ///
    /// 路径段会被百分号编码。
    pub fn url(&self) -> Result<Url, OptionsError> {
        let base = format!("http://localhost:{}", self.http_port);
        let mut url = Url::parse(&base)
            .map_err(|e| OptionsError::ValidationError(format!("无效的请求地址 {base}: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| OptionsError::ValidationError(format!("请求地址不支持路径: {base}")))?
            .clear()
            .extend([
                "applications",
                self.application.as_str(),
                "environments",
                self.environment.as_str(),
                "configurations",
                self.configuration_profile.as_str(),
            ]);
        Ok(url)
    }
}

/// 选项验证函数
///
/// # 参数
/// * `config` - 要验证的选项
///
/// # 返回
/// * `Result<(), String>` - 验证结果，错误时返回错误信息
pub fn validate_config(config: &ClientConfig) -> Result<(), String> {
    validate_options(&config.appconfig)?;

    // 验证日志级别
    let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_log_levels.contains(&config.logging.level.as_str()) {
        return Err(format!(
            "无效的日志级别: {}，支持的级别: {:?}",
            config.logging.level, valid_log_levels
        ));
    }

    for (module, level) in &config.logging.module_levels {
        if !valid_log_levels.contains(&level.as_str()) {
            return Err(format!("模块 {module} 的日志级别无效: {level}"));
        }
    }

    if !config.logging.console && config.logging.file.is_none() {
        return Err("关闭控制台输出时必须设置日志文件".to_string());
    }

    Ok(())
}

/// 验证 AppConfig 选项
pub fn validate_options(options: &AppConfigOptions) -> Result<(), String> {
    if options.application.trim().is_empty() {
        return Err("应用名称不能为空".to_string());
    }

    if options.environment.trim().is_empty() {
        return Err("环境名称不能为空".to_string());
    }

    if options.configuration_profile.trim().is_empty() {
        return Err("配置档案名称不能为空".to_string());
    }

    if options.http_port == 0 {
        return Err("AppConfig 扩展端口不能为0".to_string());
    }

    if options.poll_interval_seconds == 0 {
        return Err("轮询间隔不能为0，使用负数表示只加载一次".to_string());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_options() -> AppConfigOptions {
        AppConfigOptions::new("orders", "production", "service-settings")
    }

    #[test]
    fn test_defaults() {
        let options = create_test_options();
        assert_eq!(options.http_port, 2772);
        assert_eq!(
            options.poll_interval(),
            PollInterval::Every(Duration::from_secs(45))
        );
    }

    #[test]
    fn test_negative_interval_means_never() {
        let mut options = create_test_options();
        options.poll_interval_seconds = -1;
        assert_eq!(options.poll_interval(), PollInterval::Never);
        assert_eq!(options.poll_interval().as_duration(), None);
    }

    #[test]
    fn test_url_layout() {
        let options = create_test_options();
        assert_eq!(
            options.url().unwrap().as_str(),
            "http://localhost:2772/applications/orders/environments/production/configurations/service-settings"
        );
    }

    #[test]
    fn test_url_escapes_segments() {
        let options = AppConfigOptions::new("my app", "prod/eu", "profile");
        let url = options.url().unwrap();
        assert!(url.path().contains("/applications/my%20app/"));
        assert!(url.path().contains("/environments/prod%2Feu/"));
    }

    #[test]
    fn test_validation() {
        let mut config = ClientConfig {
            appconfig: create_test_options(),
            logging: LoggingOptions::default(),
        };
        assert!(validate_config(&config).is_ok());

        config.appconfig.poll_interval_seconds = 0;
        assert!(validate_config(&config).is_err());

        config.appconfig.poll_interval_seconds = -1;
        config.appconfig.application = "  ".to_string();
        assert!(validate_config(&config).is_err());

        config.appconfig.application = "orders".to_string();
        config.logging.level = "verbose".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_logging_table_outputs_and_module_levels() {
        let config: ClientConfig = toml::from_str(
            r#"
[appconfig]
application = "orders"
environment = "production"
configuration_profile = "settings"

[logging]
level = "warn"
file = "/var/log/appconfig-poller.log"
console = false

[logging.module_levels]
"appconfig_poller::reload" = "debug"
"#,
        )
        .unwrap();

        assert_eq!(
            config.logging.file,
            Some(PathBuf::from("/var/log/appconfig-poller.log"))
        );
        assert!(!config.logging.console);
        assert_eq!(
            config.logging.module_levels.get("appconfig_poller::reload"),
            Some(&"debug".to_string())
        );
        assert!(validate_config(&config).is_ok());

        let mut invalid = config.clone();
        invalid
            .logging
            .module_levels
            .insert("reqwest".to_string(), "loud".to_string());
        assert!(validate_config(&invalid).is_err());

        let mut silent = config;
        silent.logging.file = None;
        assert!(validate_config(&silent).is_err());
    }

    #[test]
    fn test_logging_defaults_to_console_only() {
        let logging = LoggingOptions::default();
        assert!(logging.console);
        assert!(logging.file.is_none());
        assert!(logging.module_levels.is_empty());
    }
}
