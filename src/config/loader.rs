//! 配置加载器实现
//!
//! 提供JSON/TOML配置文件解析、环境变量替换和错误处理功能

use crate::config::types::{normalize_config, Config};
use crate::error::{ConfigError, Result};
use async_trait::async_trait;
use regex::Regex;
use std::path::Path;

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON（默认）
    Json,
    /// TOML
    Toml,
}

impl ConfigFormat {
    /// 根据文件扩展名判断格式，`.toml` 以外一律按JSON处理
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }
}

/// 加载结果：规范化后的配置以及规范化过程中的调整说明
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// 规范化后的配置
    pub config: Config,
    /// 调整说明，日志系统初始化后以警告级别输出
    pub adjustments: Vec<String>,
}

/// 配置加载器trait，定义配置加载接口
#[async_trait]
pub trait ConfigLoader: Send + Sync {
    /// 从文件加载配置
    ///
    /// # 参数
    /// * `path` - 配置文件路径
    ///
    /// # 返回
    /// * `Result<LoadedConfig>` - 加载的配置或错误
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<LoadedConfig>;

    /// 从字符串加载配置
    ///
    /// # 参数
    /// * `content` - 配置文件内容
    /// * `format` - 内容格式
    ///
    /// # 返回
    /// * `Result<LoadedConfig>` - 加载的配置或错误
    fn load_from_string(&self, content: &str, format: ConfigFormat) -> Result<LoadedConfig>;
}

/// 基于文件的配置加载器
#[derive(Debug, Clone)]
pub struct FileConfigLoader {
    /// 是否启用环境变量替换
    enable_env_substitution: bool,
}

impl FileConfigLoader {
    /// 创建新的配置加载器
    ///
    /// # 参数
    /// * `enable_env_substitution` - 是否启用 `${VAR}` 环境变量替换
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
            .map_err(|e| ConfigError::ParseError(format!("正则表达式错误: {}", e)))?;

        let mut result = content.to_string();
        for captures in env_var_regex.captures_iter(content) {
            let full_match = &captures[0];
            let var_name = &captures[1];

            let value = std::env::var(var_name).map_err(|_| ConfigError::EnvVarError {
                var: var_name.to_string(),
            })?;
            result = result.replace(full_match, &value);
        }

        Ok(result)
    }

    fn parse(&self, content: &str, format: ConfigFormat) -> Result<Config> {
        let processed = self.substitute_env_vars(content)?;

        let config = match format {
            ConfigFormat::Json => serde_json::from_str(&processed)
                .map_err(|e| ConfigError::ParseError(format!("JSON解析失败: {}", e)))?,
            ConfigFormat::Toml => toml::from_str(&processed)
                .map_err(|e| ConfigError::ParseError(format!("TOML解析失败: {}", e)))?,
        };
        Ok(config)
    }
}

impl Default for FileConfigLoader {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl ConfigLoader for FileConfigLoader {
    async fn load_from_file<P: AsRef<Path> + Send>(&self, path: P) -> Result<LoadedConfig> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_string_lossy().to_string(),
            }
            .into());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::ParseError(format!("读取文件失败: {}", e)))?;

        self.load_from_string(&content, ConfigFormat::from_path(path))
    }

    fn load_from_string(&self, content: &str, format: ConfigFormat) -> Result<LoadedConfig> {
        let mut config = self.parse(content, format)?;
        let adjustments = normalize_config(&mut config).map_err(ConfigError::ValidationError)?;
        Ok(LoadedConfig {
            config,
            adjustments,
        })
    }
}
