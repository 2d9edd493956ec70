//! 消息模板模块
//!
//! 基于 Handlebars 渲染事件通知内容

use crate::error::NotificationError;
use crate::notification::event::Event;
use handlebars::Handlebars;
use serde::Serialize;

/// 默认的 Discord 消息模板
pub const DEFAULT_DISCORD_TEMPLATE: &str = "**{{message}}**\n```json\n{{{payload}}}\n```";

const TEMPLATE_NAME: &str = "message";

/// 模板上下文数据
#[derive(Debug, Clone, Serialize)]
pub struct TemplateContext {
    /// 事件标签
    pub message: String,
    /// 目标URL
    pub url: String,
    /// 连续失败次数
    pub consecutive_fails: u32,
    /// 累计失败次数
    pub total_fails: u64,
    /// 最大响应时间（毫秒）
    pub max_latency_ms: u64,
    /// 故障开始时间，RFC 3339
    pub outage_start: Option<String>,
    /// 故障最近时间，RFC 3339
    pub outage_latest: Option<String>,
    /// 事件时间，RFC 3339
    pub timestamp: String,
    /// 缩进格式的统计快照
    pub payload: String,
}

impl TemplateContext {
    /// 从事件构造模板上下文
    pub fn from_event(event: &Event) -> Result<Self, NotificationError> {
        let payload = event
            .pretty_data()
            .map_err(|e| NotificationError::TemplateError(format!("序列化事件数据失败: {}", e)))?;
        let data = &event.data;

        Ok(Self {
            message: event.message().to_string(),
            url: data.url.clone(),
            consecutive_fails: data.consecutive_fails,
            total_fails: data.total_fails,
            max_latency_ms: data.max_latency_ms,
            outage_start: data.outage_start.map(|t| t.to_rfc3339()),
            outage_latest: data.outage_latest.map(|t| t.to_rfc3339()),
            timestamp: event.timestamp.to_rfc3339(),
            payload,
        })
    }
}

/// 消息模板trait
pub trait MessageTemplate: Send + Sync {
    /// 渲染模板
    ///
    /// # 参数
    /// * `context` - 模板上下文
    ///
    /// # 返回
    /// * `Result<String, NotificationError>` - 渲染后的消息
    fn render(&self, context: &TemplateContext) -> Result<String, NotificationError>;
}

/// Handlebars模板
///
/// 模板在构造时编译，语法错误在启动阶段就会暴露。
/// 输出用于 Markdown 渠道，不做 HTML 转义。
pub struct HandlebarsTemplate {
    registry: Handlebars<'static>,
}

impl HandlebarsTemplate {
    /// 编译模板
    ///
    /// # 参数
    /// * `template` - 模板字符串
    ///
    /// # 返回
    /// * `Result<Self, NotificationError>` - 模板实例
    pub fn new(template: &str) -> Result<Self, NotificationError> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        registry
            .register_template_string(TEMPLATE_NAME, template)
            .map_err(|e| NotificationError::TemplateError(format!("模板语法错误: {}", e)))?;
        Ok(Self { registry })
    }

    /// 默认的 Discord 模板
    pub fn discord_default() -> Result<Self, NotificationError> {
        Self::new(DEFAULT_DISCORD_TEMPLATE)
    }
}

impl MessageTemplate for HandlebarsTemplate {
    fn render(&self, context: &TemplateContext) -> Result<String, NotificationError> {
        self.registry
            .render(TEMPLATE_NAME, context)
            .map_err(|e| NotificationError::TemplateError(format!("模板渲染失败: {}", e)))
    }
}

/// 邮件正文的 HTML 版本：转义后的快照放在 `<pre>` 中
pub fn html_payload(context: &TemplateContext) -> String {
    format!("<pre>{}</pre>", handlebars::html_escape(&context.payload))
}
