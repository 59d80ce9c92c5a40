//! 命令处理逻辑
//!
//! 实现各种CLI命令的处理逻辑

use crate::cli::args::{Args, Commands, OutputFormat};
use crate::config::{
    apply_extension_env, validate_config, AppConfigOptions, ClientConfig, ConfigLoader,
    LoggingOptions, TomlConfigLoader,
};
use crate::error::{AppConfigError, OptionsError, Result};
use crate::logging::LoggingSystem;
use crate::reload::ReloadEngine;
use crate::snapshot::FlatMap;
use async_trait::async_trait;
use std::path::Path;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

/// 选项文件模板
const CONFIG_TEMPLATE: &str = include_str!("../../demos/appconfig.toml");

/// 命令处理器trait
#[async_trait]
pub trait Command: Send + Sync {
    /// 执行命令
    async fn execute(&self, args: &Args) -> Result<()>;
}

/// 解析最终生效的客户端选项
///
/// 选项文件存在时以文件为基础；否则要求命令行给出全部三个名称。
/// 命令行参数最后覆盖。
pub async fn resolve_client_config(args: &Args) -> Result<ClientConfig> {
    let config_path = args.get_config_path();

    let mut config = if config_path.exists() {
        TomlConfigLoader::new(true)
            .load_from_file(&config_path)
            .await?
    } else if args.has_inline_options() || args.config.is_none() {
        let mut options = AppConfigOptions::new("", "", "");
        apply_extension_env(&mut options)?;
        ClientConfig {
            appconfig: options,
            logging: LoggingOptions::default(),
        }
    } else {
        return Err(OptionsError::FileNotFound {
            path: config_path.to_string_lossy().to_string(),
        }
        .into());
    };

    args.apply_overrides(&mut config.appconfig);
    validate_config(&config).map_err(OptionsError::ValidationError)?;

    Ok(config)
}

/// 根据选项创建引擎并完成首次加载
async fn load_engine(args: &Args) -> Result<ReloadEngine> {
    let config = resolve_client_config(args).await?;
    let engine = ReloadEngine::from_options(&config.appconfig)?;
    engine.load().await?;
    Ok(engine)
}

/// 按指定格式渲染扁平化配置
pub fn render_flat_map(data: &FlatMap, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            let object: serde_json::Map<String, serde_json::Value> = data
                .sorted()
                .into_iter()
                .map(|(key, value)| (key.to_string(), serde_json::Value::from(value)))
                .collect();
            Ok(serde_json::to_string_pretty(&object)?)
        }
        OutputFormat::Text => Ok(data
            .sorted()
            .into_iter()
            .map(|(key, value)| format!("{key} = {value}"))
            .collect::<Vec<_>>()
            .join("\n")),
    }
}

/// 单键查询命令
pub struct GetCommand;

#[async_trait]
impl Command for GetCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Get { key } = &args.command {
            let engine = load_engine(args).await?;
            match engine.try_get(key) {
                Some(value) => println!("{value}"),
                None => {
                    return Err(AppConfigError::Other(anyhow::anyhow!(
                        "未找到配置键: {key}"
                    )))
                }
            }
        }
        Ok(())
    }
}

/// 全量输出命令
pub struct DumpCommand;

#[async_trait]
impl Command for DumpCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Dump { format } = &args.command {
            let engine = load_engine(args).await?;
            let snapshot = engine.snapshot();
            let rendered = render_flat_map(&snapshot.data, format)?;
            if !rendered.is_empty() {
                println!("{rendered}");
            }
        }
        Ok(())
    }
}

/// 持续轮询命令
pub struct WatchCommand;

#[async_trait]
impl Command for WatchCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let config = resolve_client_config(args).await?;
        let engine = ReloadEngine::from_options(&config.appconfig)?;
        let logging = LoggingSystem::new(LoggingSystem::current_config().unwrap_or_default());

        if let Err(e) = engine.load().await {
            logging.fetch_failure_log(engine.endpoint(), &e);
            return Err(e.into());
        }

        let mut updates = engine.subscribe();
        let poller = engine.start();
        info!(
            "已加载 {} 个配置键，开始监听变化，按 Ctrl+C 停止",
            engine.snapshot().data.len()
        );

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("收到停止信号");
                    break;
                }
                update = updates.recv() => match update {
                    Ok(notification) => logging.reload_log(engine.endpoint(), &notification),
                    Err(RecvError::Lagged(skipped)) => warn!("跳过了 {} 条重载通知", skipped),
                    Err(RecvError::Closed) => break,
                },
            }
        }

        poller.shutdown().await;
        engine.close();
        Ok(())
    }
}

/// 初始化命令
pub struct InitCommand;

#[async_trait]
impl Command for InitCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Init { config_path, force } = &args.command {
            self.create_config_file(config_path, *force).await
        } else {
            Ok(())
        }
    }
}

impl InitCommand {
    /// 创建选项文件
    async fn create_config_file(&self, config_path: &Path, force: bool) -> Result<()> {
        if config_path.exists() && !force {
            eprintln!("选项文件已存在: {}", config_path.display());
            eprintln!("使用 --force 参数覆盖现有文件");
            return Ok(());
        }

        if let Some(parent) = config_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(config_path, CONFIG_TEMPLATE).await?;

        println!("选项文件已创建: {}", config_path.display());
        println!("请编辑应用、环境和配置档案名称");

        Ok(())
    }
}

/// 验证命令
pub struct ValidateCommand;

#[async_trait]
impl Command for ValidateCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Validate {
            config_path,
            verbose,
        } = &args.command
        {
            let config_file = config_path
                .clone()
                .unwrap_or_else(|| args.get_config_path());

            self.validate_config_file(&config_file, *verbose).await
        } else {
            Ok(())
        }
    }
}

impl ValidateCommand {
    /// 验证选项文件
    async fn validate_config_file(&self, config_path: &Path, verbose: bool) -> Result<()> {
        println!("验证选项文件: {}", config_path.display());

        let loader = TomlConfigLoader::new(true);
        let config = loader.load_from_file(config_path).await?;
        let options = &config.appconfig;

        if verbose {
            println!("选项验证通过！");
            println!("  应用: {}", options.application);
            println!("  环境: {}", options.environment);
            println!("  配置档案: {}", options.configuration_profile);
            println!("  请求地址: {}", options.url()?);
            match options.poll_interval().as_duration() {
                Some(interval) => println!("  轮询间隔: {}秒", interval.as_secs()),
                None => println!("  轮询间隔: 仅初始加载"),
            }
            println!("  日志级别: {}", config.logging.level);
        } else {
            println!("✓ 选项文件验证通过");
        }

        Ok(())
    }
}

/// 版本命令
pub struct VersionCommand;

#[async_trait]
impl Command for VersionCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Version { format } = &args.command {
            match format {
                OutputFormat::Json => {
                    let version_info = serde_json::json!({
                        "name": crate::APP_NAME,
                        "version": crate::VERSION,
                        "description": crate::APP_DESCRIPTION
                    });
                    println!("{}", serde_json::to_string_pretty(&version_info)?);
                }
                OutputFormat::Text => {
                    println!("{} v{}", crate::APP_NAME, crate::VERSION);
                    println!("{}", crate::APP_DESCRIPTION);
                }
            }
        }
        Ok(())
    }
}
