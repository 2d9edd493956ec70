//! 探测结果数据结构
//!
//! 定义单次探测的结果类型及失败判定

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 传输层失败时使用的状态码哨兵值
pub const TRANSPORT_FAILURE: i32 = -1;

/// 单次探测结果，创建后不可变
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// 目标URL
    pub url: String,
    /// HTTP状态码，传输失败时为 -1
    pub status: i32,
    /// 响应时间（毫秒）
    #[serde(rename = "response_time_ms")]
    pub latency_ms: u64,
    /// 错误信息（仅传输失败时存在）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// 探测发起时间（UTC）
    #[serde(rename = "timestamp_utc")]
    pub timestamp: DateTime<Utc>,
    /// 执行探测的工作者ID
    pub worker_id: usize,
}

impl ProbeResult {
    /// 创建收到HTTP响应的结果
    pub fn response(
        url: impl Into<String>,
        status: u16,
        latency_ms: u64,
        timestamp: DateTime<Utc>,
        worker_id: usize,
    ) -> Self {
        Self {
            url: url.into(),
            status: i32::from(status),
            latency_ms,
            error: None,
            timestamp,
            worker_id,
        }
    }

    /// 创建传输失败的结果
    pub fn transport_failure(
        url: impl Into<String>,
        error: impl Into<String>,
        latency_ms: u64,
        timestamp: DateTime<Utc>,
        worker_id: usize,
    ) -> Self {
        Self {
            url: url.into(),
            status: TRANSPORT_FAILURE,
            latency_ms,
            error: Some(error.into()),
            timestamp,
            worker_id,
        }
    }

    /// 是否为传输层失败
    pub fn is_transport_failure(&self) -> bool {
        self.status == TRANSPORT_FAILURE
    }

    /// 是否计为失败：传输失败或状态码 >= 400
    pub fn is_failure(&self) -> bool {
        self.is_transport_failure() || self.status >= 400
    }
}
