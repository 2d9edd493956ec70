//! 命令行参数定义
//!
//! 使用clap定义应用程序的命令行接口

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Site Vitals - 限速的HTTP(S)站点可用性监控工具
#[derive(Parser, Debug, Clone)]
#[command(
    name = "site-vitals",
    version = crate::VERSION,
    about = crate::APP_DESCRIPTION,
    long_about = None
)]
pub struct Args {
    /// 配置文件路径
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config.json",
        help = "配置文件路径（.toml 按TOML解析，其余按JSON解析）",
        env = "SITE_VITALS_CONFIG"
    )]
    pub config: PathBuf,

    /// 运行时长（秒）
    #[arg(
        short,
        long,
        value_name = "SECONDS",
        help = "运行时长（秒，至少为1），不指定则一直运行到收到信号",
        env = "SITE_VITALS_RUNTIME",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub runtime: Option<u64>,

    /// 日志级别，覆盖配置文件中的 log_level
    #[arg(
        short,
        long,
        value_enum,
        help = "日志级别，覆盖配置文件",
        env = "SITE_VITALS_LOG_LEVEL"
    )]
    pub log_level: Option<LogLevel>,
}

/// 日志级别枚举
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum LogLevel {
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
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl Args {
    /// 运行时长，未指定时返回 `None`
    pub fn runtime(&self) -> Option<Duration> {
        self.runtime.map(Duration::from_secs)
    }

    /// 命令行指定的日志级别
    pub fn log_level_override(&self) -> Option<log::LevelFilter> {
        self.log_level.map(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["site-vitals"]).unwrap();
        assert_eq!(args.config, PathBuf::from("config.json"));
        assert!(args.runtime().is_none());
        assert!(args.log_level_override().is_none());
    }

    #[test]
    fn test_all_flags() {
        let args = Args::try_parse_from([
            "site-vitals",
            "--config",
            "monitor.toml",
            "--runtime",
            "90",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(args.config, PathBuf::from("monitor.toml"));
        assert_eq!(args.runtime(), Some(Duration::from_secs(90)));
        assert_eq!(args.log_level_override(), Some(log::LevelFilter::Debug));
    }

    #[test]
    fn test_zero_runtime_rejected() {
        assert!(Args::try_parse_from(["site-vitals", "-r", "0"]).is_err());

        let args = Args::try_parse_from(["site-vitals", "-r", "1"]).unwrap();
        assert_eq!(args.runtime(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_invalid_runtime_rejected() {
        assert!(Args::try_parse_from(["site-vitals", "--runtime", "soon"]).is_err());
    }
}
