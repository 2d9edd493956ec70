//! Site Vitals 主程序入口
//!
//! 限速的HTTP(S)站点可用性监控工具

use anyhow::{Context, Result};
use clap::Parser;
use site_vitals::cli::Args;
use site_vitals::config::{ConfigLoader, FileConfigLoader};
use site_vitals::core::{spawn_deadline, spawn_signal_watcher, Monitor};
use site_vitals::logging::{LogConfig, LoggingSystem};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    match run(args).await {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("错误: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// 加载配置并运行监控
///
/// # 返回
/// * `Result<i32>` - 进程退出码，正常关闭为 0，运行中出现致命错误为 1
async fn run(args: Args) -> Result<i32> {
    let loaded = FileConfigLoader::new(true)
        .load_from_file(&args.config)
        .await
        .with_context(|| format!("加载配置文件失败: {}", args.config.display()))?;
    let config = loaded.config;

    let log_config = LogConfig::from_config(&config, args.log_level_override());
    let _logging_system = LoggingSystem::setup_logging(log_config).context("初始化日志系统失败")?;

    info!("Site Vitals v{} 启动", site_vitals::VERSION);
    for adjustment in &loaded.adjustments {
        warn!("配置调整: {}", adjustment);
    }

    let shutdown = CancellationToken::new();
    let signal_watcher = spawn_signal_watcher(shutdown.clone()).context("注册信号处理器失败")?;
    let deadline = args.runtime().map(|runtime| {
        info!("将在 {:?} 后停止", runtime);
        spawn_deadline(shutdown.clone(), runtime)
    });

    let result = Monitor::new(config).run(shutdown.clone()).await;

    // 启动失败时监听任务仍在等待，取消后它们会自行退出
    shutdown.cancel();
    if let Err(e) = signal_watcher.await {
        warn!("信号监听任务异常退出: {}", e);
    }
    if let Some(deadline) = deadline {
        if let Err(e) = deadline.await {
            warn!("运行时限任务异常退出: {}", e);
        }
    }

    let summary = result.context("启动监控失败")?;
    if summary.fatal {
        error!("监控因致命错误提前结束");
    } else {
        info!("监控已正常关闭");
    }
    Ok(summary.exit_code())
}
