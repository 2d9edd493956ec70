//! 健康事件
//!
//! 分析器在状态转换时产生事件，经分发器写入事件文件并推送到各通知渠道。

use crate::pipeline::stat::{EndpointStat, Transition};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 事件类型，序列化为人类可读的标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// 连续失败达到阈值
    #[serde(rename = "possible outage in progress")]
    PossibleOutage,
    /// 故障已结束
    #[serde(rename = "outage report")]
    OutageReport,
}

impl EventKind {
    /// 事件标签
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::PossibleOutage => "possible outage in progress",
            EventKind::OutageReport => "outage report",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 健康事件，构造后不可变
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// 事件ID
    pub id: Uuid,
    /// 事件类型
    #[serde(rename = "message")]
    pub kind: EventKind,
    /// 触发时的端点统计快照
    pub data: EndpointStat,
    /// 事件产生时间
    #[serde(rename = "timestamp_utc")]
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// 创建新事件
    pub fn new(kind: EventKind, data: EndpointStat) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            data,
            timestamp: Utc::now(),
        }
    }

    /// 事件标签
    pub fn message(&self) -> &'static str {
        self.kind.label()
    }

    /// 以缩进格式输出统计快照
    pub fn pretty_data(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.data)
    }
}

impl From<Transition> for Event {
    fn from(transition: Transition) -> Self {
        match transition {
            Transition::OutageSuspected(stat) => Event::new(EventKind::PossibleOutage, stat),
            Transition::OutageConcluded(stat) => Event::new(EventKind::OutageReport, stat),
        }
    }
}
