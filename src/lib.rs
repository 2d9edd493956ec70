//! Site Vitals - 限速的HTTP(S)站点可用性监控工具
//!
//! 支持：
//! - 全局限速的并发HTTP(S)探测
//! - 探测结果与事件的 JSON Lines 持久化
//! - 基于连续失败的故障检测与恢复报告
//! - Discord 与邮件通知
//! - 结构化日志记录

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod health;
pub mod logging;
pub mod notification;
pub mod pipeline;

// 重新导出主要类型
pub use config::Config;
pub use crate::core::{Monitor, RunSummary};
pub use error::SiteVitalsError;
pub use health::ProbeResult;
pub use notification::Event;

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
