//! 错误处理模块
//!
//! 定义应用程序的统一错误类型

use thiserror::Error;

/// AppConfig 轮询客户端的主要错误类型
#[derive(Error, Debug)]
pub enum AppConfigError {
    /// 客户端选项相关错误
    #[error("选项错误: {0}")]
    Options(#[from] OptionsError),

    /// 配置拉取/重载相关错误
    #[error("重载错误: {0}")]
    Reload(#[from] ReloadError),

    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON序列化/反序列化错误
    #[error("JSON错误: {0}")]
    Json(#[from] serde_json::Error),

    /// 其他错误
    #[error("其他错误: {0}")]
    Other(#[from] anyhow::Error),
}

/// 客户端选项错误类型
#[derive(Error, Debug)]
pub enum OptionsError {
    /// 选项文件解析错误
    #[error("选项文件解析失败: {0}")]
    ParseError(String),

    /// 选项验证错误
    #[error("选项验证失败: {0}")]
    ValidationError(String),

    /// 选项文件不存在
    #[error("选项文件不存在: {path}")]
    FileNotFound { path: String },

    /// 环境变量替换错误
    #[error("环境变量替换失败: {var}")]
    EnvVarError { var: String },
}

/// 单次重载周期可能出现的失败
///
/// 首次加载时所有失败都会返回给调用方；后台轮询中的失败只记录日志，
/// 已发布的配置保持不变。
#[derive(Error, Debug)]
pub enum ReloadError {
    /// 无法联系 sidecar，或 sidecar 返回了非 2xx 状态码
    #[error("联系 AppConfig 扩展失败 (状态码: {status:?}): {message}")]
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// 拉取超过了轮询间隔
    #[error("拉取配置超时")]
    Timeout,

    /// 被外部取消
    #[error("拉取配置已取消")]
    Canceled,

    /// 响应体不是合法的 JSON
    #[error("配置反序列化失败: {0}")]
    Parse(#[source] serde_json::Error),

    /// 合法 JSON，但结构不符合要求
    #[error("配置格式错误: {0}")]
    MalformedInput(String),
}

impl ReloadError {
    /// 错误种类标签，用于结构化日志
    pub fn kind(&self) -> &'static str {
        match self {
            ReloadError::Transport { .. } => "transport",
            ReloadError::Timeout => "timeout",
            ReloadError::Canceled => "canceled",
            ReloadError::Parse(_) => "parse",
            ReloadError::MalformedInput(_) => "malformed_input",
        }
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, AppConfigError>;
