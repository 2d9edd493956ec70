//! 通知分发器
//!
//! 事件队列的唯一消费者：先写入事件文件，再并发推送到所有启用的发送器。

use crate::core::report::TaskReport;
use crate::notification::event::Event;
use crate::notification::sender::{NotificationSender, SenderRegistry};
use crate::pipeline::recorder::JsonLinesWriter;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// 通知分发器
#[derive(Debug)]
pub struct Dispatcher {
    registry: SenderRegistry,
    active: Vec<String>,
    writer: JsonLinesWriter,
}

impl Dispatcher {
    /// 创建分发器
    ///
    /// # 参数
    /// * `registry` - 发送器注册表
    /// * `active` - 启用的发送器名称，按配置顺序
    /// * `writer` - 事件文件写入器
    pub fn new(registry: SenderRegistry, active: Vec<String>, writer: JsonLinesWriter) -> Self {
        Self {
            registry,
            active,
            writer,
        }
    }

    /// 运行分发循环
    ///
    /// 事件文件写入失败是致命的；发送失败只记录日志，不影响其他发送器。
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<Event>,
        shutdown: CancellationToken,
    ) -> TaskReport {
        let mut report = TaskReport::new("dispatcher");
        let senders = self.resolve_senders();
        info!(
            "通知分发器已启动，启用的发送器: {:?}",
            senders.iter().map(|s| s.name()).collect::<Vec<_>>()
        );

        loop {
            let event = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                received = events.recv() => match received {
                    Some(event) => event,
                    None => break,
                },
            };

            if let Err(e) = self.writer.append(&event).await {
                error!("写入事件文件失败，停止监控: {}", e);
                report.fatal = true;
                report.dropped += 1;
                shutdown.cancel();
                break;
            }
            report.processed += 1;

            if senders.is_empty() {
                continue;
            }

            let deliveries = join_all(senders.iter().map(|sender| {
                let event = &event;
                async move { (sender.name(), sender.send(event).await) }
            }));

            let outcomes = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    warn!("正在关闭，放弃未完成的通知: {} {}", event.kind, event.data.url);
                    break;
                }
                outcomes = deliveries => outcomes,
            };

            for (name, outcome) in outcomes {
                match outcome {
                    Ok(()) => {
                        debug!("通知已发送: {} -> {}", event.kind, name);
                        report.sent += 1;
                    }
                    Err(e) => {
                        error!("通过 {} 发送通知失败: {}", name, e);
                        report.send_failures += 1;
                    }
                }
            }
        }

        events.close();
        while events.try_recv().is_ok() {
            report.dropped += 1;
        }

        info!(
            "通知分发器已停止，处理事件 {} 个，发送成功 {} 次，失败 {} 次，丢弃 {} 个",
            report.processed, report.sent, report.send_failures, report.dropped
        );
        report
    }

    /// 按配置顺序解析发送器，未知名称记录警告后跳过
    fn resolve_senders(&self) -> Vec<Arc<dyn NotificationSender>> {
        self.active
            .iter()
            .filter_map(|name| {
                let sender = self.registry.get(name);
                if sender.is_none() {
                    warn!("未知的通知服务: {}", name);
                }
                sender
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NotificationError;
    use crate::notification::event::EventKind;
    use crate::pipeline::stat::EndpointStat;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Recording {
        name: &'static str,
        fail: bool,
        seen: Mutex<Vec<EventKind>>,
    }

    impl Recording {
        fn new(name: &'static str, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                name,
                fail,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl NotificationSender for Recording {
        fn name(&self) -> &str {
            self.name
        }

        async fn send(&self, event: &Event) -> Result<(), NotificationError> {
            self.seen.lock().unwrap().push(event.kind);
            if self.fail {
                Err(NotificationError::Rejected {
                    status: 500,
                    body: "boom".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn test_failing_sender_does_not_block_others() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let writer = JsonLinesWriter::open(&path).await.unwrap();

        let discord = Recording::new("discord", true);
        let email = Recording::new("email", false);
        let registry = SenderRegistry::new()
            .register(discord.clone())
            .register(email.clone());
        let active = vec!["discord".to_string(), "email".to_string(), "pager".to_string()];

        let (tx, rx) = mpsc::channel(4);
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(Dispatcher::new(registry, active, writer).run(rx, shutdown));

        tx.send(Event::new(EventKind::PossibleOutage, EndpointStat::new("http://a/")))
            .await
            .unwrap();
        tx.send(Event::new(EventKind::OutageReport, EndpointStat::new("http://a/")))
            .await
            .unwrap();
        drop(tx);

        let report = handle.await.unwrap();
        assert_eq!(report.processed, 2);
        assert_eq!(report.sent, 2);
        assert_eq!(report.send_failures, 2);
        assert!(!report.fatal);

        let expected = vec![EventKind::PossibleOutage, EventKind::OutageReport];
        assert_eq!(*email.seen.lock().unwrap(), expected);
        assert_eq!(*discord.seen.lock().unwrap(), expected);

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let persisted: Vec<Event> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(persisted.len(), 2);
        assert_eq!(persisted[0].kind, EventKind::PossibleOutage);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_event_write_failure_is_fatal_and_skips_senders() {
        let writer = JsonLinesWriter::open("/dev/full").await.unwrap();
        let email = Recording::new("email", false);
        let registry = SenderRegistry::new().register(email.clone());

        let (tx, rx) = mpsc::channel(4);
        tx.send(Event::new(EventKind::PossibleOutage, EndpointStat::new("http://a/")))
            .await
            .unwrap();
        tx.send(Event::new(EventKind::OutageReport, EndpointStat::new("http://a/")))
            .await
            .unwrap();
        let shutdown = CancellationToken::new();

        let report = Dispatcher::new(registry, vec!["email".to_string()], writer)
            .run(rx, shutdown.clone())
            .await;

        assert!(report.fatal);
        assert!(shutdown.is_cancelled());
        assert_eq!(report.processed, 0);
        assert_eq!(report.dropped, 2);
        assert_eq!(report.sent, 0);
        assert!(email.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_queued_events_dropped_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let writer = JsonLinesWriter::open(dir.path().join("events.jsonl"))
            .await
            .unwrap();

        let (tx, rx) = mpsc::channel(4);
        for _ in 0..2 {
            tx.send(Event::new(EventKind::OutageReport, EndpointStat::new("http://a/")))
                .await
                .unwrap();
        }
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let report = Dispatcher::new(SenderRegistry::new(), Vec::new(), writer)
            .run(rx, shutdown)
            .await;
        assert_eq!(report.processed, 0);
        assert_eq!(report.dropped, 2);
    }
}
