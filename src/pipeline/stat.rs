//! 端点健康状态机
//!
//! 每个URL一个 [`EndpointStat`]，只由探测结果驱动，没有外部定时器。
//!
//! 状态：
//! - `Healthy`：`consecutive_fails == 0` 且没有进行中的故障
//! - `Failing`：`consecutive_fails > 0`
//!
//! 连续失败第 [`OUTAGE_THRESHOLD`] 次时触发一次“疑似故障”，
//! 之后第一次成功时触发一次“故障报告”并复位。

use crate::health::ProbeResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 触发疑似故障告警的连续失败次数
pub const OUTAGE_THRESHOLD: u32 = 3;

/// 端点健康状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    /// 正常
    Healthy,
    /// 连续失败中
    Failing,
}

/// 单个URL的统计信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointStat {
    /// 目标URL
    pub url: String,
    /// 本次故障的开始时间
    pub outage_start: Option<DateTime<Utc>>,
    /// 本次故障最近一次失败（或恢复）的时间
    pub outage_latest: Option<DateTime<Utc>>,
    /// 连续失败次数
    pub consecutive_fails: u32,
    /// 累计失败次数，只增不减
    pub total_fails: u64,
    /// 成功探测的最大响应时间（毫秒）
    pub max_latency_ms: u64,
}

/// 状态转换，携带触发时的统计快照
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// 连续失败达到阈值
    OutageSuspected(EndpointStat),
    /// 故障结束，快照为复位前的状态
    OutageConcluded(EndpointStat),
}

impl Transition {
    /// 统计快照
    pub fn snapshot(&self) -> &EndpointStat {
        match self {
            Transition::OutageSuspected(stat) | Transition::OutageConcluded(stat) => stat,
        }
    }
}

impl EndpointStat {
    /// 创建健康状态的统计
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            outage_start: None,
            outage_latest: None,
            consecutive_fails: 0,
            total_fails: 0,
            max_latency_ms: 0,
        }
    }

    /// 当前状态
    pub fn state(&self) -> HealthState {
        if self.consecutive_fails > 0 {
            HealthState::Failing
        } else {
            HealthState::Healthy
        }
    }

    /// 应用一条探测结果，返回触发的状态转换（如有）
    pub fn apply(&mut self, result: &ProbeResult) -> Option<Transition> {
        if result.is_failure() {
            self.record_failure(result.timestamp)
        } else {
            let transition = self.record_success(result.timestamp);
            self.max_latency_ms = self.max_latency_ms.max(result.latency_ms);
            transition
        }
    }

    fn record_failure(&mut self, at: DateTime<Utc>) -> Option<Transition> {
        match self.state() {
            HealthState::Healthy => {
                self.outage_start = Some(at);
                self.outage_latest = Some(at);
                self.consecutive_fails = 1;
            }
            HealthState::Failing => {
                self.outage_latest = Some(at);
                self.consecutive_fails += 1;
            }
        }
        self.total_fails += 1;

        (self.consecutive_fails == OUTAGE_THRESHOLD)
            .then(|| Transition::OutageSuspected(self.clone()))
    }

    fn record_success(&mut self, at: DateTime<Utc>) -> Option<Transition> {
        match self.state() {
            HealthState::Healthy => None,
            HealthState::Failing => {
                self.outage_latest = Some(at);
                let snapshot = self.clone();

                self.consecutive_fails = 0;
                self.outage_start = None;
                self.outage_latest = None;

                Some(Transition::OutageConcluded(snapshot))
            }
        }
    }
}
