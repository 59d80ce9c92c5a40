//! AppConfig Poller 主程序入口
//!
//! AppConfig 扩展轮询客户端

use anyhow::{Context, Result};
use appconfig_poller::cli::args::{Args, Commands};
use appconfig_poller::cli::commands::{
    Command, DumpCommand, GetCommand, InitCommand, ValidateCommand, VersionCommand, WatchCommand,
};
use appconfig_poller::config::{ConfigLoader, LoggingOptions, TomlConfigLoader};
use appconfig_poller::logging::LoggingSystem;
use clap::Parser;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 选项文件中的日志设置优先于默认值，命令行再覆盖它
    let file_logging = read_logging_options(&args).await;
    let log_config = args.log_config(file_logging.as_ref());
    let _logging_system = LoggingSystem::setup_logging(log_config).context("初始化日志系统失败")?;

    debug!("AppConfig Poller v{} 启动", appconfig_poller::VERSION);

    if let Err(e) = execute_command(&args).await {
        error!("命令执行失败: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// 尝试读取选项文件中的 `[logging]` 表；读取失败时交给具体命令报告
async fn read_logging_options(args: &Args) -> Option<LoggingOptions> {
    if !matches!(
        args.command,
        Commands::Get { .. } | Commands::Dump { .. } | Commands::Watch
    ) {
        return None;
    }

    let path = args.get_config_path();
    if !path.exists() {
        return None;
    }

    TomlConfigLoader::new(true)
        .load_from_file(&path)
        .await
        .ok()
        .map(|config| config.logging)
}

/// 执行CLI命令
async fn execute_command(args: &Args) -> Result<()> {
    let command: Box<dyn Command> = match &args.command {
        Commands::Get { .. } => Box::new(GetCommand),
        Commands::Dump { .. } => Box::new(DumpCommand),
        Commands::Watch => {
            info!("启动配置监听");
            Box::new(WatchCommand)
        }
        Commands::Init { .. } => Box::new(InitCommand),
        Commands::Validate { .. } => Box::new(ValidateCommand),
        Commands::Version { .. } => Box::new(VersionCommand),
    };

    command.execute(args).await.map_err(|e| anyhow::anyhow!(e))
}
