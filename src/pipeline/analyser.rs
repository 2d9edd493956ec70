//! 故障分析器
//!
//! 独占每个URL的 [`EndpointStat`] 表，按到达顺序逐条应用探测结果，
//! 在状态转换时向有界事件队列发送事件。

use crate::core::report::TaskReport;
use crate::health::ProbeResult;
use crate::notification::event::{Event, EventKind};
use crate::pipeline::stat::EndpointStat;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// 故障分析器
#[derive(Debug, Clone)]
pub struct Analyser {
    /// URL到统计信息的映射，启动时预先填充
    stats: HashMap<String, EndpointStat>,
}

impl Analyser {
    /// 为每个配置的URL预先创建统计信息
    pub fn new<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let stats = urls
            .into_iter()
            .map(|url| {
                let url = url.into();
                (url.clone(), EndpointStat::new(url))
            })
            .collect();
        Self { stats }
    }

    /// 查询某个URL的统计信息
    pub fn stat(&self, url: &str) -> Option<&EndpointStat> {
        self.stats.get(url)
    }

    /// 监控的URL数量
    pub fn len(&self) -> usize {
        self.stats.len()
    }

    /// 是否没有任何URL
    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// 应用一条结果，返回需要发出的事件（如有）
    pub fn analyse(&mut self, result: &ProbeResult) -> Option<Event> {
        let Some(stat) = self.stats.get_mut(&result.url) else {
            warn!("收到未配置URL的结果，已忽略: {}", result.url);
            return None;
        };

        let event = Event::from(stat.apply(result)?);
        match event.kind {
            EventKind::PossibleOutage => error!(
                url = %event.data.url,
                consecutive_fails = event.data.consecutive_fails,
                outage_start = ?event.data.outage_start,
                "疑似故障进行中"
            ),
            EventKind::OutageReport => warn!(
                url = %event.data.url,
                consecutive_fails = event.data.consecutive_fails,
                outage_start = ?event.data.outage_start,
                outage_latest = ?event.data.outage_latest,
                "故障报告"
            ),
        }
        Some(event)
    }

    /// 运行分析循环
    ///
    /// 结果通过无界通道到达，分析不会反压结果队列。
    /// 关闭时无法入队的事件与尚未分析的结果都计为丢弃。
    pub async fn run(
        mut self,
        mut results: mpsc::UnboundedReceiver<ProbeResult>,
        events: mpsc::Sender<Event>,
        shutdown: CancellationToken,
    ) -> TaskReport {
        let mut report = TaskReport::new("analyser");
        info!("故障分析器已启动，监控URL数量: {}", self.len());

        loop {
            let result = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                received = results.recv() => match received {
                    Some(result) => result,
                    None => break,
                },
            };
            report.processed += 1;

            let Some(event) = self.analyse(&result) else {
                continue;
            };
            let kind = event.kind;

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    debug!("正在关闭，丢弃事件: {} {}", kind, result.url);
                    report.dropped += 1;
                    break;
                }
                sent = events.send(event) => {
                    if sent.is_err() {
                        report.dropped += 1;
                        break;
                    }
                }
            }
        }

        results.close();
        while results.try_recv().is_ok() {
            report.dropped += 1;
        }

        info!(
            "故障分析器已停止，分析结果 {} 条，丢弃 {} 条",
            report.processed, report.dropped
        );
        report
    }
}
