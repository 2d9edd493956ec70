//! 探测工作者池
//!
//! N 个相同的工作者共享作业队列和许可队列。每个工作者循环执行：
//! 取作业 → 取许可 → 带超时探测 → 发布结果，每一步都与取消信号竞争。

use crate::core::report::TaskReport;
use crate::core::shutdown::TaskBarrier;
use crate::health::checker::Prober;
use crate::health::result::ProbeResult;
use crate::health::scheduler::Permit;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// 多个消费者共享的接收端
pub struct SharedReceiver<T> {
    inner: Arc<Mutex<mpsc::Receiver<T>>>,
}

impl<T> SharedReceiver<T> {
    /// 包装一个接收端
    pub fn new(receiver: mpsc::Receiver<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(receiver)),
        }
    }

    /// 接收下一条消息，队列关闭且为空时返回 `None`
    pub async fn recv(&self) -> Option<T> {
        self.inner.lock().await.recv().await
    }
}

impl<T> Clone for SharedReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// 工作者池
pub struct WorkerPool {
    /// 工作者数量
    size: usize,
    /// 探测器
    prober: Arc<dyn Prober>,
}

impl WorkerPool {
    /// 创建新的工作者池
    pub fn new(size: usize, prober: Arc<dyn Prober>) -> Self {
        Self {
            size: size.max(1),
            prober,
        }
    }

    /// 工作者数量
    pub fn size(&self) -> usize {
        self.size
    }

    /// 将所有工作者生成到 `tasks` 中
    pub fn spawn(
        &self,
        tasks: &mut TaskBarrier,
        jobs: SharedReceiver<String>,
        permits: SharedReceiver<Permit>,
        results: mpsc::Sender<ProbeResult>,
        shutdown: CancellationToken,
    ) {
        for id in 0..self.size {
            tasks.spawn(
                format!("worker-{id}"),
                run_worker(
                    id,
                    Arc::clone(&self.prober),
                    jobs.clone(),
                    permits.clone(),
                    results.clone(),
                    shutdown.clone(),
                ),
            );
        }
        info!("已启动 {} 个探测工作者", self.size);
    }
}

/// 单个工作者的主循环
pub async fn run_worker(
    id: usize,
    prober: Arc<dyn Prober>,
    jobs: SharedReceiver<String>,
    permits: SharedReceiver<Permit>,
    results: mpsc::Sender<ProbeResult>,
    shutdown: CancellationToken,
) -> TaskReport {
    let mut report = TaskReport::new(format!("worker-{id}"));

    loop {
        let url = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            job = jobs.recv() => match job {
                Some(url) => url,
                None => break,
            },
        };

        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            permit = permits.recv() => {
                if permit.is_none() {
                    break;
                }
            }
        }

        let result = tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                debug!("工作者 {} 放弃进行中的探测: {}", id, url);
                report.dropped += 1;
                break;
            }
            result = prober.probe(&url, id) => result,
        };

        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                debug!("工作者 {} 丢弃未发布的结果: {}", id, url);
                report.dropped += 1;
                break;
            }
            sent = results.send(result) => {
                if sent.is_err() {
                    report.dropped += 1;
                    break;
                }
                report.processed += 1;
            }
        }
    }

    debug!("工作者 {} 已停止，完成探测 {} 次", id, report.processed);
    report
}
