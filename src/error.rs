//! 错误处理模块
//!
//! 定义应用程序的统一错误类型

use std::path::PathBuf;
use thiserror::Error;

/// Site Vitals 应用程序的主要错误类型
#[derive(Error, Debug)]
pub enum SiteVitalsError {
    /// 配置相关错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 结果/事件持久化错误
    #[error("持久化错误: {0}")]
    Persistence(#[from] PersistenceError),

    /// 通知相关错误
    #[error("通知错误: {0}")]
    Notification(#[from] NotificationError),

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

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 配置文件解析错误
    #[error("配置文件解析失败: {0}")]
    ParseError(String),

    /// 配置验证错误
    #[error("配置验证失败: {0}")]
    ValidationError(String),

    /// 配置文件不存在
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    /// 环境变量替换错误
    #[error("环境变量替换失败: {var}")]
    EnvVarError { var: String },
}

/// 持久化错误类型，出现即视为致命错误
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// 打开输出文件失败
    #[error("无法打开输出文件 {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 写入输出文件失败
    #[error("写入输出文件 {path} 失败: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 记录序列化失败
    #[error("记录序列化失败: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// 通知错误类型
#[derive(Error, Debug)]
pub enum NotificationError {
    /// HTTP请求失败
    #[error("通知请求失败: {0}")]
    Http(#[from] reqwest::Error),

    /// 服务端拒绝
    #[error("通知服务返回 {status}: {body}")]
    Rejected { status: u16, body: String },

    /// 模板渲染错误
    #[error("模板渲染失败: {0}")]
    TemplateError(String),

    /// 配置错误
    #[error("通知配置错误: {0}")]
    ConfigError(String),
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, SiteVitalsError>;
