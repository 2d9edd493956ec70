//! 邮件通知发送器
//!
//! 通过 MailerSend HTTP API 发送事件邮件

use crate::error::NotificationError;
use crate::notification::event::Event;
use crate::notification::sender::{NotificationSender, SEND_TIMEOUT};
use crate::notification::template::{html_payload, TemplateContext};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{debug, info};

/// MailerSend 默认接口地址
pub const DEFAULT_MAILERSEND_API_URL: &str = "https://api.mailersend.com/v1/email";

const FROM_NAME: &str = "SiteVitals";
const TO_NAME: &str = "SiteVitalsUser";
const TEXT_BODY: &str = "Find the details below";
const TAGS: [&str; 2] = ["SiteVitals", "Alert"];

/// 邮件地址与显示名称
#[derive(Debug, Clone, Serialize)]
struct Mailbox<'a> {
    email: &'a str,
    name: &'a str,
}

/// MailerSend 请求体
#[derive(Debug, Serialize)]
struct EmailRequest<'a> {
    from: Mailbox<'a>,
    to: Vec<Mailbox<'a>>,
    subject: &'a str,
    text: &'a str,
    html: String,
    tags: [&'a str; 2],
}

/// 邮件通知发送器
pub struct EmailSender {
    /// 共享HTTP客户端
    client: Client,
    /// 接口地址
    api_url: String,
    /// API令牌
    api_token: String,
    /// 发件地址
    from_address: String,
    /// 收件地址
    to_address: String,
}

impl EmailSender {
    /// 创建新的邮件发送器
    ///
    /// # 参数
    /// * `client` - 共享HTTP客户端
    /// * `api_url` - MailerSend 接口地址
    /// * `api_token` - API令牌
    /// * `from_address` - 发件地址
    /// * `to_address` - 收件地址
    pub fn new(
        client: Client,
        api_url: impl Into<String>,
        api_token: impl Into<String>,
        from_address: impl Into<String>,
        to_address: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_url: api_url.into(),
            api_token: api_token.into(),
            from_address: from_address.into(),
            to_address: to_address.into(),
        }
    }

    fn build_request<'a>(&'a self, event: &'a Event, context: &TemplateContext) -> EmailRequest<'a> {
        EmailRequest {
            from: Mailbox {
                email: &self.from_address,
                name: FROM_NAME,
            },
            to: vec![Mailbox {
                email: &self.to_address,
                name: TO_NAME,
            }],
            subject: event.message(),
            text: TEXT_BODY,
            html: html_payload(context),
            tags: TAGS,
        }
    }
}

#[async_trait]
impl NotificationSender for EmailSender {
    fn name(&self) -> &str {
        "email"
    }

    async fn send(&self, event: &Event) -> Result<(), NotificationError> {
        let context = TemplateContext::from_event(event)?;
        let request = self.build_request(event, &context);

        debug!("发送邮件通知: {} -> {}", event.kind, self.to_address);

        let response = self
            .client
            .post(&self.api_url)
            .timeout(SEND_TIMEOUT)
            .bearer_auth(&self.api_token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::ACCEPTED {
            info!("邮件已投递: {} {}", event.kind, event.data.url);
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(NotificationError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::event::EventKind;
    use crate::pipeline::stat::EndpointStat;
    use mockito::Matcher;
    use serde_json::json;

    fn event() -> Event {
        Event::new(EventKind::OutageReport, EndpointStat::new("https://example.com/"))
    }

    fn sender(server: &mockito::Server) -> EmailSender {
        EmailSender::new(
            Client::new(),
            format!("{}/v1/email", server.url()),
            "token-123",
            "alerts@example.com",
            "ops@example.com",
        )
    }

    #[tokio::test]
    async fn test_send_accepted() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/email")
            .match_header("authorization", "Bearer token-123")
            .match_body(Matcher::PartialJson(json!({
                "from": {"email": "alerts@example.com", "name": "SiteVitals"},
                "to": [{"email": "ops@example.com", "name": "SiteVitalsUser"}],
                "subject": "outage report",
                "text": "Find the details below",
                "tags": ["SiteVitals", "Alert"]
            })))
            .with_status(202)
            .create_async()
            .await;

        sender(&server).send(&event()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_other_success_status_is_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/email")
            .with_status(200)
            .create_async()
            .await;

        let err = sender(&server).send(&event()).await.unwrap_err();
        assert!(matches!(err, NotificationError::Rejected { status: 200, .. }));
    }

    #[test]
    fn test_html_body_is_escaped_snapshot() {
        let event = event();
        let context = TemplateContext::from_event(&event).unwrap();
        let email = EmailSender::new(Client::new(), "http://x", "t", "a@b.co", "c@d.co");
        let request = email.build_request(&event, &context);

        assert!(request.html.starts_with("<pre>"));
        assert!(request.html.contains("&quot;url&quot;"));
    }
}
