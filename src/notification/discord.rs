//! Discord 通知发送器
//!
//! 通过 webhook 推送 Markdown 格式的事件消息

use crate::error::NotificationError;
use crate::notification::event::Event;
use crate::notification::sender::{NotificationSender, SEND_TIMEOUT};
use crate::notification::template::{MessageTemplate, TemplateContext};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, info};

/// Discord 通知发送器
pub struct DiscordSender {
    /// 共享HTTP客户端
    client: Client,
    /// webhook 地址
    webhook_url: String,
    /// 消息模板
    template: Box<dyn MessageTemplate>,
}

impl DiscordSender {
    /// 创建新的 Discord 发送器
    ///
    /// # 参数
    /// * `client` - 共享HTTP客户端
    /// * `webhook_url` - webhook 地址
    /// * `template` - 已编译的消息模板
    pub fn new(
        client: Client,
        webhook_url: impl Into<String>,
        template: Box<dyn MessageTemplate>,
    ) -> Self {
        Self {
            client,
            webhook_url: webhook_url.into(),
            template,
        }
    }
}

#[async_trait]
impl NotificationSender for DiscordSender {
    fn name(&self) -> &str {
        "discord"
    }

    async fn send(&self, event: &Event) -> Result<(), NotificationError> {
        let context = TemplateContext::from_event(event)?;
        let content = self.template.render(&context)?;
        let body = json!({ "content": content });

        debug!("发送消息到 Discord webhook: {}", event.data.url);

        let response = self
            .client
            .post(&self.webhook_url)
            .timeout(SEND_TIMEOUT)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            info!("Discord 消息发送成功: {} {}", event.kind, event.data.url);
            Ok(())
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(NotificationError::Rejected {
                status: status.as_u16(),
                body: text,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::event::EventKind;
    use crate::notification::template::HandlebarsTemplate;
    use crate::pipeline::stat::EndpointStat;
    use mockito::Matcher;

    fn event() -> Event {
        let mut stat = EndpointStat::new("https://example.com/");
        stat.consecutive_fails = 3;
        Event::new(EventKind::PossibleOutage, stat)
    }

    fn sender(server: &mockito::Server) -> DiscordSender {
        DiscordSender::new(
            Client::new(),
            format!("{}/webhook", server.url()),
            Box::new(HandlebarsTemplate::discord_default().unwrap()),
        )
    }

    #[tokio::test]
    async fn test_send_posts_rendered_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/webhook")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Regex(
                r#"^\{"content":"\*\*possible outage in progress\*\*\\n```json\\n\{.*"#.to_string(),
            ))
            .with_status(204)
            .create_async()
            .await;

        sender(&server).send(&event()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/webhook")
            .with_status(429)
            .with_body("rate limited")
            .create_async()
            .await;

        let err = sender(&server).send(&event()).await.unwrap_err();
        match err {
            NotificationError::Rejected { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
