//! 核心模块
//!
//! 包含监控编排、关闭控制和运行报告

pub mod monitor;
pub mod report;
pub mod shutdown;

// 重新导出主要类型
pub use monitor::Monitor;
pub use report::{RunSummary, TaskReport};
pub use shutdown::{spawn_deadline, spawn_signal_watcher, TaskBarrier};
