//! AppConfig 扩展拉取器实现
//!
//! 通过本地 sidecar 拉取配置档案，并把各种失败归类为 `ReloadError`

use crate::config::AppConfigOptions;
use crate::error::{OptionsError, ReloadError};
use crate::snapshot::flatten::json_kind;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::debug;

/// 进程内共享的 HTTP 客户端，所有拉取器复用同一连接池
static SHARED_CLIENT: OnceLock<Client> = OnceLock::new();

/// 获取共享客户端，首次调用时创建
fn shared_client() -> Result<Client, OptionsError> {
    if let Some(client) = SHARED_CLIENT.get() {
        return Ok(client.clone());
    }

    let client = Client::builder()
        .user_agent(format!("{}/{}", crate::APP_NAME, crate::VERSION))
        .build()
        .map_err(|e| OptionsError::ValidationError(format!("创建HTTP客户端失败: {e}")))?;

    // 并发初始化时以先写入者为准
    Ok(SHARED_CLIENT.get_or_init(|| client).clone())
}

/// 拉取器trait，定义单次拉取接口
#[async_trait]
pub trait ConfigFetcher: Send + Sync {
    /// 执行一次拉取
    ///
    /// # 返回
    /// * `Result<Value, ReloadError>` - 顶层为对象的 JSON 文档
    async fn fetch(&self) -> Result<Value, ReloadError>;

    /// 拉取目标，用于日志
    fn endpoint(&self) -> &str;
}

/// 基于 HTTP 的拉取器
///
/// 内部的 `Client` 持有连接池，在多个轮询周期和多个引擎之间复用。
#[derive(Debug, Clone)]
pub struct HttpConfigFetcher {
    /// HTTP客户端
    client: Client,
    /// 配置档案地址
    url: String,
}

impl HttpConfigFetcher {
    /// 创建使用共享客户端的拉取器
    ///
    /// # 参数
    /// * `options` - AppConfig 选项
    ///
    /// # 返回
    /// * `Result<Self, OptionsError>` - 拉取器实例
    pub fn new(options: &AppConfigOptions) -> Result<Self, OptionsError> {
        Self::with_client(shared_client()?, options)
    }

    /// 使用指定的 `Client` 创建拉取器
    pub fn with_client(client: Client, options: &AppConfigOptions) -> Result<Self, OptionsError> {
        Ok(Self {
            client,
            url: options.url()?.to_string(),
        })
    }

    /// 将 reqwest 错误归类
    fn classify_request_error(error: &reqwest::Error) -> ReloadError {
        if error.is_timeout() {
            return ReloadError::Timeout;
        }

        ReloadError::Transport {
            status: error.status().map(|s| s.as_u16()),
            message: Self::format_request_error(error),
        }
    }

    /// 格式化请求错误信息，使其更加清晰易读
    fn format_request_error(error: &reqwest::Error) -> String {
        if error.is_connect() {
            "Connection refused".to_string()
        } else if error.is_request() {
            "Invalid request".to_string()
        } else if let Some(status) = error.status() {
            format!(
                "HTTP {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )
        } else if error.is_body() || error.is_decode() {
            "Response body error".to_string()
        } else {
            format!("Request failed: {}", error)
        }
    }
}

#[async_trait]
impl ConfigFetcher for HttpConfigFetcher {
    async fn fetch(&self) -> Result<Value, ReloadError> {
        debug!("拉取配置: {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Self::classify_request_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReloadError::Transport {
                status: Some(status.as_u16()),
                message: format!(
                    "HTTP {} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown")
                ),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Self::classify_request_error(&e))?;

        let document: Value = serde_json::from_slice(&body).map_err(ReloadError::Parse)?;
        if !document.is_object() {
            return Err(ReloadError::MalformedInput(format!(
                "顶层 JSON 必须是对象，实际为 {}",
                json_kind(&document)
            )));
        }

        Ok(document)
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}
