//! 配置数据结构定义
//!
//! 定义监控配置结构体以及规范化/验证逻辑。
//! 数值字段超出范围时不会报错，而是被修正为安全值并记录一条调整说明。

use crate::notification::email::DEFAULT_MAILERSEND_API_URL;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

/// 已知的通知服务
pub const KNOWN_NOTIFICATION_SERVICES: [&str; 2] = ["discord", "email"];

const MIN_WORKERS: i64 = 1;
const DEFAULT_WORKERS: i64 = 5;
const MAX_WORKERS: i64 = 500;
const MIN_RATE_PER_SEC: i64 = 1;
const MAX_RATE_PER_SEC: i64 = 10;
const MIN_TIMEOUT_SECS: i64 = 1;
const DEFAULT_TIMEOUT_SECS: i64 = 5;
const MIN_INTERVAL_SECS: i64 = 5;
const DEFAULT_INTERVAL_SECS: i64 = 10;
const DEFAULT_OUTPUT_DIR: &str = "site_vitals_logs";

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON 行
    #[default]
    Json,
    /// 人类可读文本
    Text,
}

/// 主配置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// 监控的URL列表
    pub urls: Vec<String>,
    /// 工作者数量
    pub worker_count: i64,
    /// 全局每秒请求数上限
    pub rate_limit_per_sec: i64,
    /// 单次请求超时（秒）
    pub request_timeout_secs: i64,
    /// 两轮作业之间的间隔（秒）
    pub request_interval: i64,
    /// 每轮每个URL入队的次数，缺省时等于速率
    pub refill_multiplicity: Option<i64>,
    /// 输出目录
    pub output_dir: String,
    /// 日志级别
    pub log_level: String,
    /// 日志格式
    pub log_format: LogFormat,
    /// 启用的通知服务
    pub notification_services: Vec<String>,
    /// Discord webhook 地址
    pub discord_webhook_address: String,
    /// MailerSend API令牌
    pub mailersend_api_token: String,
    /// 发件地址
    pub mailersend_email_id: String,
    /// 收件地址
    pub mail_id: String,
    /// MailerSend 接口地址
    pub mailersend_api_url: Option<String>,
    /// Discord 消息模板（Handlebars）
    pub message_template: Option<String>,
}

impl Config {
    /// 工作者数量
    pub fn worker_count(&self) -> usize {
        self.worker_count.max(MIN_WORKERS) as usize
    }

    /// 每秒许可数
    pub fn rate_limit(&self) -> u32 {
        self.rate_limit_per_sec
            .clamp(MIN_RATE_PER_SEC, MAX_RATE_PER_SEC) as u32
    }

    /// 单次请求超时
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(MIN_TIMEOUT_SECS) as u64)
    }

    /// 作业补充间隔
    pub fn request_interval(&self) -> Duration {
        Duration::from_secs(self.request_interval.max(MIN_INTERVAL_SECS) as u64)
    }

    /// 每轮每个URL入队的次数
    pub fn refill_multiplicity(&self) -> u32 {
        self.refill_multiplicity
            .unwrap_or(self.rate_limit_per_sec)
            .clamp(1, i64::from(u32::MAX)) as u32
    }

    /// 输出目录
    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(&self.output_dir)
    }

    /// MailerSend 接口地址
    pub fn mailersend_api_url(&self) -> &str {
        self.mailersend_api_url
            .as_deref()
            .unwrap_or(DEFAULT_MAILERSEND_API_URL)
    }

    /// 关闭阶段等待任务退出的宽限期
    pub fn shutdown_grace(&self) -> Duration {
        self.request_timeout() + Duration::from_secs(5)
    }

    /// 是否启用了指定的通知服务
    pub fn notification_enabled(&self, name: &str) -> bool {
        self.notification_services.iter().any(|s| s == name)
    }
}

/// 规范化并验证配置
///
/// # 参数
/// * `config` - 要规范化的配置，原地修改
///
/// # 返回
/// * `Result<Vec<String>, String>` - 成功时返回所做的调整说明，失败时返回错误信息
pub fn normalize_config(config: &mut Config) -> Result<Vec<String>, String> {
    let mut adjustments = Vec::new();

    config.urls = normalize_urls(&config.urls, &mut adjustments)?;

    if config.worker_count < MIN_WORKERS {
        adjustments.push(format!(
            "worker_count 过小 ({})，使用默认值 {}",
            config.worker_count, DEFAULT_WORKERS
        ));
        config.worker_count = DEFAULT_WORKERS;
    }
    if config.worker_count > MAX_WORKERS {
        adjustments.push(format!(
            "worker_count 过大 ({})，限制为 {}",
            config.worker_count, MAX_WORKERS
        ));
        config.worker_count = MAX_WORKERS;
    }

    if config.rate_limit_per_sec < MIN_RATE_PER_SEC {
        adjustments.push(format!(
            "rate_limit_per_sec 过小 ({})，使用 {}",
            config.rate_limit_per_sec, MIN_RATE_PER_SEC
        ));
        config.rate_limit_per_sec = MIN_RATE_PER_SEC;
    }
    if config.rate_limit_per_sec > MAX_RATE_PER_SEC {
        adjustments.push(format!(
            "rate_limit_per_sec 过大 ({})，限制为 {}",
            config.rate_limit_per_sec, MAX_RATE_PER_SEC
        ));
        config.rate_limit_per_sec = MAX_RATE_PER_SEC;
    }

    if config.request_timeout_secs < MIN_TIMEOUT_SECS {
        adjustments.push(format!(
            "request_timeout_secs 过小 ({})，使用默认值 {} 秒",
            config.request_timeout_secs, DEFAULT_TIMEOUT_SECS
        ));
        config.request_timeout_secs = DEFAULT_TIMEOUT_SECS;
    }

    if config.request_interval < MIN_INTERVAL_SECS {
        adjustments.push(format!(
            "request_interval 过短 ({})，使用默认值 {} 秒",
            config.request_interval, DEFAULT_INTERVAL_SECS
        ));
        config.request_interval = DEFAULT_INTERVAL_SECS;
    }
    if config.request_interval <= config.request_timeout_secs {
        let bumped = config.request_timeout_secs + 1;
        adjustments.push(format!(
            "request_interval ({}) 不大于 request_timeout_secs ({})，调整为 {} 秒以避免批次重叠",
            config.request_interval, config.request_timeout_secs, bumped
        ));
        config.request_interval = bumped;
    }

    match config.refill_multiplicity {
        None => config.refill_multiplicity = Some(config.rate_limit_per_sec),
        Some(m) if m < 1 => {
            adjustments.push(format!("refill_multiplicity 过小 ({})，使用 1", m));
            config.refill_multiplicity = Some(1);
        }
        Some(_) => {}
    }

    if config.output_dir.trim().is_empty() {
        adjustments.push(format!("未指定 output_dir，使用默认值 {}", DEFAULT_OUTPUT_DIR));
        config.output_dir = DEFAULT_OUTPUT_DIR.to_string();
    }

    let level = config.log_level.trim().to_lowercase();
    let known = matches!(level.as_str(), "debug" | "info" | "warn" | "error");
    if !known && !level.is_empty() {
        adjustments.push(format!("无法识别的日志级别 {}，使用 info", level));
    }
    config.log_level = if known { level } else { "info".to_string() };

    config.notification_services =
        normalize_notification_services(&config.notification_services, &mut adjustments);

    config.discord_webhook_address = config.discord_webhook_address.trim().to_string();
    config.mailersend_api_token = config.mailersend_api_token.trim().to_string();
    config.mailersend_email_id = config.mailersend_email_id.trim().to_string();
    config.mail_id = config.mail_id.trim().to_string();

    if config.notification_enabled("discord") && config.discord_webhook_address.is_empty() {
        return Err("启用了 discord 通知但 discord_webhook_address 为空".to_string());
    }

    if config.notification_enabled("email") {
        if config.mailersend_api_token.is_empty()
            || config.mailersend_email_id.is_empty()
            || config.mail_id.is_empty()
        {
            return Err(
                "启用了 email 通知但 mailersend_api_token、mailersend_email_id 或 mail_id 为空"
                    .to_string(),
            );
        }
        for address in [&config.mailersend_email_id, &config.mail_id] {
            if !is_valid_email(address) {
                return Err(format!("邮件地址格式无效: {}", address));
            }
        }
    }

    Ok(adjustments)
}

/// 去除空白项、校验协议并去重，保留首次出现的顺序
fn normalize_urls(urls: &[String], adjustments: &mut Vec<String>) -> Result<Vec<String>, String> {
    if urls.is_empty() {
        return Err("配置中没有提供URL".to_string());
    }

    let mut seen = HashSet::new();
    let mut cleaned = Vec::with_capacity(urls.len());

    for (index, raw) in urls.iter().enumerate() {
        let raw = raw.trim();
        if raw.is_empty() {
            adjustments.push(format!("跳过索引 {} 处的空URL", index));
            continue;
        }

        let parsed = reqwest::Url::parse(raw)
            .map_err(|_| format!("索引 {} 处的URL无效: {:?}", index, raw))?;
        if parsed.host_str().map_or(true, str::is_empty) {
            return Err(format!("索引 {} 处的URL无效: {:?}", index, raw));
        }
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(format!("索引 {} 处的URL协议不受支持: {:?}", index, raw));
        }

        let normalized = parsed.to_string();
        if seen.insert(normalized.clone()) {
            cleaned.push(normalized);
        } else {
            adjustments.push(format!("跳过重复的URL {}", normalized));
        }
    }

    if cleaned.is_empty() {
        return Err("没有可监控的有效URL".to_string());
    }
    Ok(cleaned)
}

fn normalize_notification_services(
    services: &[String],
    adjustments: &mut Vec<String>,
) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(services.len());
    for name in services {
        let name = name.trim();
        if name.is_empty() {
            adjustments.push("忽略空的通知服务名称".to_string());
        } else if !KNOWN_NOTIFICATION_SERVICES.contains(&name) {
            adjustments.push(format!("忽略无效的通知服务: {}", name));
        } else if !cleaned.iter().any(|s| s == name) {
            cleaned.push(name.to_string());
        }
    }
    cleaned
}

fn is_valid_email(address: &str) -> bool {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[^\s@<>,]+@[^\s@<>,]+\.[^\s@<>,]+$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(address))
}
