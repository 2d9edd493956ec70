//! HTTP探测器实现
//!
//! 提供带超时的单次 HTTP GET 探测，以及工作者与通知发送器共享的HTTP客户端

use crate::health::result::ProbeResult;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio::time::timeout;

/// 探测器trait，定义单次探测接口
///
/// 探测本身不返回错误：传输失败会被记录为 `status = -1` 的结果，
/// 这是被监控的信号而不是系统故障。
#[async_trait]
pub trait Prober: Send + Sync {
    /// 对 `url` 执行一次探测，结果标记为 `worker_id`
    async fn probe(&self, url: &str, worker_id: usize) -> ProbeResult;
}

/// 构建共享HTTP客户端
///
/// 连接池与 keep-alive 设置在这里统一配置，由所有工作者和通知发送器只读共享。
pub fn build_http_client() -> reqwest::Result<Client> {
    Client::builder()
        .user_agent(format!("{}/{}", crate::APP_NAME, crate::VERSION))
        .pool_max_idle_per_host(20)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
}

/// 基于 reqwest 的HTTP探测器
#[derive(Clone)]
pub struct HttpProber {
    /// 共享HTTP客户端
    client: Client,
    /// 单次请求超时时间
    request_timeout: Duration,
}

impl HttpProber {
    /// 创建新的HTTP探测器
    ///
    /// # 参数
    /// * `client` - 共享HTTP客户端
    /// * `request_timeout` - 单次请求超时时间
    pub fn new(client: Client, request_timeout: Duration) -> Self {
        Self {
            client,
            request_timeout,
        }
    }

    /// 格式化请求错误信息，使其更加清晰易读
    fn format_request_error(error: &reqwest::Error) -> String {
        if error.is_timeout() {
            "Request timeout".to_string()
        } else if error.is_connect() {
            let error_str = format!("{error:?}");
            if error_str.contains("dns") || error_str.contains("failed to lookup") {
                "DNS resolution failed".to_string()
            } else {
                "Connection refused".to_string()
            }
        } else if error.is_builder() {
            format!("Invalid request: {error}")
        } else if error.is_request() {
            "Invalid request".to_string()
        } else {
            let error_str = error.to_string();
            if error_str.contains("certificate")
                || error_str.contains("tls")
                || error_str.contains("ssl")
            {
                "SSL/TLS certificate error".to_string()
            } else {
                format!("Request failed: {error_str}")
            }
        }
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str, worker_id: usize) -> ProbeResult {
        let request = match self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .build()
        {
            Ok(request) => request,
            Err(e) => {
                return ProbeResult::transport_failure(
                    url,
                    Self::format_request_error(&e),
                    0,
                    Utc::now(),
                    worker_id,
                )
            }
        };

        let timestamp = Utc::now();
        let start = Instant::now();
        let outcome = timeout(self.request_timeout, self.client.execute(request)).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match outcome {
            // 响应体不读取，非2xx同样记录为正常响应
            Ok(Ok(response)) => ProbeResult::response(
                url,
                response.status().as_u16(),
                latency_ms,
                timestamp,
                worker_id,
            ),
            Ok(Err(e)) => ProbeResult::transport_failure(
                url,
                Self::format_request_error(&e),
                latency_ms,
                timestamp,
                worker_id,
            ),
            Err(_) => ProbeResult::transport_failure(
                url,
                "Request timeout",
                latency_ms,
                timestamp,
                worker_id,
            ),
        }
    }
}
