//! 配置管理模块
//!
//! 提供配置文件解析、环境变量替换与规范化功能

pub mod loader;
pub mod types;

// 重新导出主要类型
pub use loader::{ConfigFormat, ConfigLoader, FileConfigLoader, LoadedConfig};
pub use types::{normalize_config, Config, LogFormat, KNOWN_NOTIFICATION_SERVICES};
