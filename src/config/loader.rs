//! 选项加载器实现
//!
//! 提供TOML选项文件解析、环境变量替换和 AppConfig 扩展环境变量覆盖

use crate::config::types::{validate_config, AppConfigOptions, ClientConfig};
use crate::error::{OptionsError, Result};
use async_trait::async_trait;
use regex::Regex;
use std::path::Path;

/// AppConfig 扩展使用的环境变量前缀
pub const EXTENSION_ENV_PREFIX: &str = "AWS_APPCONFIG_EXTENSION_";

/// 选项加载器trait，定义加载接口
#[async_trait]
pub trait ConfigLoader: Send + Sync {
    /// 从文件加载选项
    ///
    /// # 参数
    /// * `path` - 选项文件路径
    ///
    /// # 返回
    /// * `Result<ClientConfig>` - 加载的选项或错误
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<ClientConfig>;

    /// 从字符串加载选项
    ///
    /// # 参数
    /// * `content` - 选项文件内容
    ///
    /// # 返回
    /// * `Result<ClientConfig>` - 加载的选项或错误
    async fn load_from_string(&self, content: &str) -> Result<ClientConfig>;

    /// 验证选项
    fn validate(&self, config: &ClientConfig) -> Result<()>;
}

/// TOML选项加载器实现
#[derive(Debug, Clone)]
pub struct TomlConfigLoader {
    /// 是否启用环境变量替换
    enable_env_substitution: bool,
}

impl TomlConfigLoader {
    /// 创建新的TOML选项加载器
    ///
    /// # 参数
    /// * `enable_env_substitution` - 是否启用 `${VAR}` 替换
    pub fn new(enable_env_substitution: bool) -> Self {
        Self {
            enable_env_substitution,
        }
    }

    /// 替换字符串中的环境变量
    fn substitute_env_vars(&self, content: &str) -> Result<String> {
        if !self.enable_env_substitution {
            return Ok(content.to_string());
        }

        // 匹配 ${VAR_NAME} 格式的环境变量
        let env_var_regex = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
            .map_err(|e| OptionsError::ParseError(format!("正则表达式错误: {}", e)))?;

        let mut result = content.to_string();

        for captures in env_var_regex.captures_iter(content) {
            let full_match = &captures[0];
            let var_name = &captures[1];

            match std::env::var(var_name) {
                Ok(value) => {
                    result = result.replace(full_match, &value);
                }
                Err(_) => {
                    return Err(OptionsError::EnvVarError {
                        var: var_name.to_string(),
                    }
                    .into());
                }
            }
        }

        Ok(result)
    }

    /// 解析TOML内容并应用扩展环境变量
    fn parse_toml(&self, content: &str) -> Result<ClientConfig> {
        let processed_content = self.substitute_env_vars(content)?;

        let mut config: ClientConfig = toml::from_str(&processed_content)
            .map_err(|e| OptionsError::ParseError(format!("TOML解析失败: {}", e)))?;

        apply_extension_env(&mut config.appconfig)?;

        Ok(config)
    }
}

/// 读取 AppConfig 扩展的环境变量并覆盖端口与轮询间隔
///
/// 识别 `AWS_APPCONFIG_EXTENSION_HTTP_PORT` 和
/// `AWS_APPCONFIG_EXTENSION_POLL_INTERVAL_SECONDS`。
pub fn apply_extension_env(options: &mut AppConfigOptions) -> Result<()> {
    if let Some(port) = read_extension_var("HTTP_PORT")? {
        options.http_port = port;
    }

    if let Some(seconds) = read_extension_var("POLL_INTERVAL_SECONDS")? {
        options.poll_interval_seconds = seconds;
    }

    Ok(())
}

fn read_extension_var<T: std::str::FromStr>(suffix: &str) -> Result<Option<T>> {
    let var = format!("{EXTENSION_ENV_PREFIX}{suffix}");
    match std::env::var(&var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| OptionsError::ParseError(format!("环境变量 {var} 的值无效: {raw}")).into()),
        Err(_) => Ok(None),
    }
}

#[async_trait]
impl ConfigLoader for TomlConfigLoader {
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<ClientConfig> {
        let path = path.as_ref();

        // 检查文件是否存在
        if !path.exists() {
            return Err(OptionsError::FileNotFound {
                path: path.to_string_lossy().to_string(),
            }
            .into());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| OptionsError::ParseError(format!("读取文件失败: {}", e)))?;

        let config = self.parse_toml(&content)?;
        self.validate(&config)?;

        log::info!("成功加载选项文件: {}", path.display());
        log::debug!("选项内容: {:?}", config);

        Ok(config)
    }

    async fn load_from_string(&self, content: &str) -> Result<ClientConfig> {
        let config = self.parse_toml(content)?;
        self.validate(&config)?;

        log::debug!("成功解析选项字符串");

        Ok(config)
    }

    fn validate(&self, config: &ClientConfig) -> Result<()> {
        validate_config(config).map_err(|e| OptionsError::ValidationError(e).into())
    }
}

/// 获取默认选项文件路径
pub fn get_default_config_path() -> std::path::PathBuf {
    // 优先使用当前目录下的 appconfig.toml，其次为用户配置目录
    if std::path::Path::new("appconfig.toml").exists() {
        std::path::PathBuf::from("appconfig.toml")
    } else {
        dirs::config_dir()
            .map(|config_dir| config_dir.join("appconfig-poller").join("appconfig.toml"))
            .unwrap_or_else(|| std::path::PathBuf::from("appconfig.toml"))
    }
}
