//! 通知发送器模块
//!
//! 定义通知发送的trait与按名称查找的发送器注册表

use crate::config::Config;
use crate::error::NotificationError;
use crate::notification::discord::DiscordSender;
use crate::notification::email::EmailSender;
use crate::notification::event::Event;
use crate::notification::template::HandlebarsTemplate;
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// 单次发送的超时时间
pub const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// 通知发送器trait
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// 发送器名称，与配置中的 `notification_services` 对应
    fn name(&self) -> &str;

    /// 发送一个事件
    ///
    /// # 参数
    /// * `event` - 健康事件
    ///
    /// # 返回
    /// * `Result<(), NotificationError>` - 发送结果
    async fn send(&self, event: &Event) -> Result<(), NotificationError>;
}

/// 发送器注册表，启动时构建一次，之后只读
#[derive(Clone, Default)]
pub struct SenderRegistry {
    senders: HashMap<String, Arc<dyn NotificationSender>>,
}

impl SenderRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 根据配置构建注册表，只注册已启用的通知服务
    ///
    /// # 参数
    /// * `config` - 已规范化的配置
    /// * `client` - 共享HTTP客户端
    ///
    /// # 返回
    /// * `Result<Self, NotificationError>` - 注册表，模板无法编译或缺少凭据时返回错误
    pub fn from_config(config: &Config, client: &Client) -> Result<Self, NotificationError> {
        let mut registry = Self::new();

        if config.notification_enabled("discord") {
            if config.discord_webhook_address.trim().is_empty() {
                return Err(NotificationError::ConfigError(
                    "discord 已启用但未设置 discord_webhook_address".to_string(),
                ));
            }
            let template = match config.message_template.as_deref() {
                Some(template) => HandlebarsTemplate::new(template)?,
                None => HandlebarsTemplate::discord_default()?,
            };
            registry = registry.register(Arc::new(DiscordSender::new(
                client.clone(),
                config.discord_webhook_address.clone(),
                Box::new(template),
            )));
        }

        if config.notification_enabled("email") {
            if config.mailersend_api_token.trim().is_empty() {
                return Err(NotificationError::ConfigError(
                    "email 已启用但未设置 mailersend_api_token".to_string(),
                ));
            }
            registry = registry.register(Arc::new(EmailSender::new(
                client.clone(),
                config.mailersend_api_url(),
                config.mailersend_api_token.clone(),
                config.mailersend_email_id.clone(),
                config.mail_id.clone(),
            )));
        }

        Ok(registry)
    }

    /// 注册发送器，同名发送器会被替换
    pub fn register(mut self, sender: Arc<dyn NotificationSender>) -> Self {
        self.senders.insert(sender.name().to_string(), sender);
        self
    }

    /// 按名称查找发送器
    pub fn get(&self, name: &str) -> Option<Arc<dyn NotificationSender>> {
        self.senders.get(name).cloned()
    }

    /// 已注册的发送器名称（排序后）
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.senders.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// 已注册的发送器数量
    pub fn len(&self) -> usize {
        self.senders.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}

impl std::fmt::Debug for SenderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SenderRegistry")
            .field("senders", &self.names())
            .finish()
    }
}
