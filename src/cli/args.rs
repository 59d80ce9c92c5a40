//! 命令行参数定义
//!
//! 使用clap定义应用程序的命令行接口

use crate::config::{AppConfigOptions, LoggingOptions};
use crate::logging::LogConfig;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// AppConfig Poller - AppConfig 扩展轮询客户端
#[derive(Parser, Debug, Clone)]
#[command(
    name = "appconfig-poller",
    version = crate::VERSION,
    about = crate::APP_DESCRIPTION,
    long_about = None
)]
pub struct Args {
    /// 选项文件路径
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "选项文件路径",
        env = "APPCONFIG_CONFIG"
    )]
    pub config: Option<PathBuf>,

    /// 日志级别，未指定时使用选项文件中的设置
    #[arg(
        short,
        long,
        value_enum,
        help = "日志级别",
        env = "APPCONFIG_LOG_LEVEL"
    )]
    pub log_level: Option<LogLevel>,

    /// 是否以JSON格式输出日志
    #[arg(long, help = "以JSON格式输出日志")]
    pub json_logs: bool,

    /// AppConfig 应用名称
    #[arg(long, value_name = "NAME", env = "APPCONFIG_APPLICATION")]
    pub application: Option<String>,

    /// AppConfig 环境名称
    #[arg(long, value_name = "NAME", env = "APPCONFIG_ENVIRONMENT")]
    pub environment: Option<String>,

    /// AppConfig 配置档案名称
    #[arg(long, value_name = "NAME", env = "APPCONFIG_PROFILE")]
    pub profile: Option<String>,

    /// AppConfig 扩展端口
    #[arg(long, value_name = "PORT", env = "APPCONFIG_HTTP_PORT")]
    pub port: Option<u16>,

    /// 轮询间隔（秒），负数表示只加载一次
    #[arg(
        long,
        value_name = "SECONDS",
        allow_hyphen_values = true,
        env = "APPCONFIG_POLL_INTERVAL_SECONDS"
    )]
    pub poll_interval: Option<i64>,

    /// 子命令
    #[command(subcommand)]
    pub command: Commands,
}

/// 日志级别枚举
#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum LogLevel {
    /// 跟踪级别
    Trace,
    /// 调试级别
    Debug,
    /// 信息级别
    Info,
    /// 警告级别
    Warn,
    /// 错误级别
    Error,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// 子命令定义
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// 加载一次配置并输出单个键的值
    Get {
        /// 配置键，例如 Logging:Level
        #[arg(value_name = "KEY", help = "配置键（忽略大小写）")]
        key: String,
    },

    /// 加载一次配置并输出全部键值
    Dump {
        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },

    /// 持续轮询并记录每次重载，Ctrl+C 停止
    Watch,

    /// 初始化选项文件
    Init {
        /// 选项文件路径
        #[arg(
            value_name = "FILE",
            help = "选项文件路径",
            default_value = "appconfig.toml"
        )]
        config_path: PathBuf,

        /// 是否覆盖现有文件
        #[arg(short, long, help = "覆盖现有文件")]
        force: bool,
    },

    /// 验证选项文件
    Validate {
        /// 选项文件路径
        #[arg(value_name = "FILE", help = "选项文件路径")]
        config_path: Option<PathBuf>,

        /// 是否显示详细信息
        #[arg(short, long, help = "显示详细信息")]
        verbose: bool,
    },

    /// 显示版本信息
    Version {
        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },
}

/// 输出格式枚举
#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum OutputFormat {
    /// 文本格式
    Text,
    /// JSON格式
    Json,
}

impl Args {
    /// 获取选项文件路径
    pub fn get_config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(crate::config::loader::get_default_config_path)
    }

    /// 三个 AppConfig 名称是否都由命令行给出
    pub fn has_inline_options(&self) -> bool {
        self.application.is_some() && self.environment.is_some() && self.profile.is_some()
    }

    /// 用命令行参数覆盖选项
    pub fn apply_overrides(&self, options: &mut AppConfigOptions) {
        if let Some(application) = &self.application {
            options.application = application.clone();
        }
        if let Some(environment) = &self.environment {
            options.environment = environment.clone();
        }
        if let Some(profile) = &self.profile {
            options.configuration_profile = profile.clone();
        }
        if let Some(port) = self.port {
            options.http_port = port;
        }
        if let Some(seconds) = self.poll_interval {
            options.poll_interval_seconds = seconds;
        }
    }

    /// 组合选项文件与命令行中的日志设置
    pub fn log_config(&self, file_options: Option<&LoggingOptions>) -> LogConfig {
        let mut config = file_options
            .map(LogConfig::from_options)
            .unwrap_or_default();

        if let Some(level) = &self.log_level {
            config.level = level.clone().into();
        }
        if self.json_logs {
            config.json_format = true;
        }

        config
    }
}
