//! 日志系统模块
//!
//! 基于 tracing 的结构化日志配置，支持JSON与文本两种输出格式

use crate::config::{Config, LogFormat};
use log::LevelFilter;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, OnceLock};
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter, Layer};

/// 全局日志初始化状态
#[derive(Debug, Default)]
struct GlobalLoggingState {
    /// 是否已初始化
    initialized: bool,
    /// 初始化失败时的错误信息
    init_error: Option<String>,
    /// 当前配置
    current_config: Option<LogConfig>,
}

/// 全局日志状态管理器
static GLOBAL_LOGGING_STATE: OnceLock<Mutex<GlobalLoggingState>> = OnceLock::new();

fn global_state() -> MutexGuard<'static, GlobalLoggingState> {
    GLOBAL_LOGGING_STATE
        .get_or_init(|| Mutex::new(GlobalLoggingState::default()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 日志配置结构
#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    /// 日志级别
    pub level: LevelFilter,
    /// 是否使用JSON格式
    pub json_format: bool,
    /// 模块级别日志控制
    pub module_levels: HashMap<String, LevelFilter>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Info,
            json_format: true,
            module_levels: HashMap::new(),
        }
    }
}

impl LogConfig {
    /// 根据监控配置构建日志配置
    ///
    /// # 参数
    /// * `config` - 已规范化的监控配置
    /// * `level_override` - 命令行指定的日志级别，优先于配置文件
    pub fn from_config(config: &Config, level_override: Option<LevelFilter>) -> Self {
        let level = level_override
            .or_else(|| LevelFilter::from_str(&config.log_level).ok())
            .unwrap_or(LevelFilter::Info);

        // 依赖库的连接细节在 debug 级别下过于嘈杂
        let mut module_levels = HashMap::new();
        module_levels.insert("hyper_util".to_string(), LevelFilter::Warn);
        module_levels.insert("rustls".to_string(), LevelFilter::Warn);

        Self {
            level,
            json_format: config.log_format == LogFormat::Json,
            module_levels,
        }
    }
}

/// 日志系统管理器
#[derive(Debug)]
pub struct LoggingSystem {
    config: LogConfig,
}

impl LoggingSystem {
    /// 初始化日志系统
    ///
    /// 可重复调用，只有第一次调用会真正安装全局 subscriber。
    ///
    /// # 参数
    /// * `config` - 日志配置
    ///
    /// # 返回
    /// * `Result<LoggingSystem, anyhow::Error>` - 初始化结果
    pub fn setup_logging(config: LogConfig) -> anyhow::Result<Self> {
        {
            let state = global_state();
            if state.initialized {
                return match &state.init_error {
                    None => Ok(Self { config }),
                    Some(e) => Err(anyhow::anyhow!("日志系统之前初始化失败: {}", e)),
                };
            }
        }

        let init_result = Self::perform_initialization(&config);

        {
            let mut state = global_state();
            state.initialized = true;
            state.current_config = Some(config.clone());
            state.init_error = init_result.as_ref().err().map(|e| e.to_string());
        }

        init_result.map(|()| Self { config })
    }

    /// 当前实例的配置
    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    fn perform_initialization(config: &LogConfig) -> anyhow::Result<()> {
        Self::init_log_tracer()?;
        Self::init_tracing_subscriber(config)
    }

    /// 初始化 LogTracer（log crate 到 tracing 的桥接）
    fn init_log_tracer() -> anyhow::Result<()> {
        use tracing_log::LogTracer;

        static LOG_TRACER_INIT: OnceLock<Result<(), String>> = OnceLock::new();

        let result = LOG_TRACER_INIT.get_or_init(|| match LogTracer::init() {
            Ok(()) => Ok(()),
            Err(e) if Self::is_already_initialized(&e.to_string()) => Ok(()),
            Err(e) => Err(e.to_string()),
        });

        result
            .as_ref()
            .map_err(|e| anyhow::anyhow!("LogTracer初始化失败: {}", e))?;
        Ok(())
    }

    /// 全局 logger 或 dispatcher 已被安装时返回的错误
    fn is_already_initialized(error_msg: &str) -> bool {
        error_msg.contains(
            "attempted to set a logger after the logging system was already initialized",
        ) || error_msg.contains("a global default trace dispatcher has already been set")
    }

    fn init_tracing_subscriber(config: &LogConfig) -> anyhow::Result<()> {
        let mut env_filter = EnvFilter::from_default_env()
            .add_directive(Self::convert_level_to_directive(config.level));

        for (module, level) in &config.module_levels {
            match format!("{}={}", module, Self::level_to_string(*level)).parse() {
                Ok(directive) => env_filter = env_filter.add_directive(directive),
                Err(e) => eprintln!("忽略无效的模块日志级别 {}: {}", module, e),
            }
        }

        let fmt_layer = if config.json_format {
            fmt::layer()
                .json()
                .with_timer(fmt::time::ChronoUtc::rfc_3339())
                .with_target(true)
                .boxed()
        } else {
            fmt::layer()
                .with_timer(fmt::time::ChronoUtc::rfc_3339())
                .with_ansi(true)
                .with_target(true)
                .with_thread_ids(true)
                .boxed()
        };

        // log 桥接已由 init_log_tracer 安装，这里只设置 dispatcher
        let subscriber = registry().with(env_filter).with(fmt_layer);
        match tracing::subscriber::set_global_default(subscriber) {
            Ok(()) => {
                tracing::debug!("日志配置: {:?}", config);
                Ok(())
            }
            Err(e) => {
                let error_msg = e.to_string();
                if Self::is_already_initialized(&error_msg) {
                    // 测试中其他用例可能已经安装了 subscriber
                    tracing::debug!("日志系统已经初始化过了");
                    Ok(())
                } else {
                    Err(anyhow::anyhow!("tracing subscriber初始化失败: {}", error_msg))
                }
            }
        }
    }

    /// 将 log::LevelFilter 转换为 tracing 的指令
    fn convert_level_to_directive(level: LevelFilter) -> tracing_subscriber::filter::Directive {
        use tracing_subscriber::filter::{Directive, LevelFilter as TracingLevel};
        match level {
            LevelFilter::Off => Directive::from(TracingLevel::OFF),
            LevelFilter::Error => Directive::from(tracing::Level::ERROR),
            LevelFilter::Warn => Directive::from(tracing::Level::WARN),
            LevelFilter::Info => Directive::from(tracing::Level::INFO),
            LevelFilter::Debug => Directive::from(tracing::Level::DEBUG),
            LevelFilter::Trace => Directive::from(tracing::Level::TRACE),
        }
    }

    fn level_to_string(level: LevelFilter) -> &'static str {
        match level {
            LevelFilter::Off => "off",
            LevelFilter::Error => "error",
            LevelFilter::Warn => "warn",
            LevelFilter::Info => "info",
            LevelFilter::Debug => "debug",
            LevelFilter::Trace => "trace",
        }
    }

    /// 检查日志系统是否已初始化
    pub fn is_initialized() -> bool {
        global_state().initialized
    }

    /// 获取当前日志配置（如果已初始化）
    pub fn current_config() -> Option<LogConfig> {
        global_state().current_config.clone()
    }

    /// 重置日志系统状态（主要用于测试）
    #[cfg(test)]
    pub fn reset_for_testing() {
        let mut state = global_state();
        state.initialized = false;
        state.init_error = None;
        state.current_config = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_log_config_from_config() {
        let config = Config {
            log_level: "debug".to_string(),
            log_format: LogFormat::Text,
            ..Default::default()
        };

        let log_config = LogConfig::from_config(&config, None);
        assert_eq!(log_config.level, LevelFilter::Debug);
        assert!(!log_config.json_format);

        let overridden = LogConfig::from_config(&config, Some(LevelFilter::Error));
        assert_eq!(overridden.level, LevelFilter::Error);
    }

    #[test]
    fn test_unknown_level_falls_back_to_info() {
        let config = Config {
            log_level: "loud".to_string(),
            ..Default::default()
        };
        assert_eq!(LogConfig::from_config(&config, None).level, LevelFilter::Info);
    }

    #[test]
    #[serial]
    fn test_logging_system_single_initialization() {
        LoggingSystem::reset_for_testing();

        let config = LogConfig::default();
        assert!(LoggingSystem::setup_logging(config.clone()).is_ok());
        assert!(LoggingSystem::is_initialized());

        let second = LogConfig {
            json_format: false,
            ..config.clone()
        };
        let system = LoggingSystem::setup_logging(second.clone()).unwrap();
        assert_eq!(system.config(), &second);
        assert_eq!(LoggingSystem::current_config(), Some(config));
    }

    #[test]
    #[serial]
    fn test_setup_installs_dispatcher_and_log_bridge() {
        LoggingSystem::reset_for_testing();

        assert!(LoggingSystem::setup_logging(LogConfig::default()).is_ok());
        assert!(tracing::dispatcher::has_been_set());
        assert!(log::max_level() >= LevelFilter::Info);

        // 进程内全局对象已存在时再次完整初始化仍然成功
        LoggingSystem::reset_for_testing();
        assert!(LoggingSystem::setup_logging(LogConfig::default()).is_ok());
        assert!(LoggingSystem::current_config().is_some());
    }

    #[test]
    fn test_already_initialized_errors_are_recognised() {
        assert!(LoggingSystem::is_already_initialized(
            "attempted to set a logger after the logging system was already initialized"
        ));
        assert!(LoggingSystem::is_already_initialized(
            "a global default trace dispatcher has already been set"
        ));
        assert!(!LoggingSystem::is_already_initialized("permission denied"));
    }

    #[test]
    #[serial]
    fn test_module_level_filtering() {
        LoggingSystem::reset_for_testing();

        let mut config = LogConfig::default();
        config
            .module_levels
            .insert("site_vitals::health".to_string(), LevelFilter::Debug);
        assert!(LoggingSystem::setup_logging(config).is_ok());
    }
}
