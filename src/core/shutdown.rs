//! 关闭控制
//!
//! 信号与运行时限都只触发同一个 [`CancellationToken`]；
//! [`TaskBarrier`] 在取消后等待所有任务退出，超过宽限期的任务被强制中止。

use crate::core::report::TaskReport;
use crate::error::Result;
use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[cfg(unix)]
use signal_hook::consts::{SIGINT, SIGTERM};
#[cfg(unix)]
use signal_hook_tokio::Signals;

/// 监听 SIGINT/SIGTERM（非Unix系统为 Ctrl+C），收到后触发全局取消
///
/// # 参数
/// * `shutdown` - 全局取消令牌
///
/// # 返回
/// * `Result<JoinHandle<()>>` - 监听任务句柄，取消后自动退出
pub fn spawn_signal_watcher(shutdown: CancellationToken) -> Result<JoinHandle<()>> {
    #[cfg(unix)]
    {
        use futures::stream::StreamExt;

        let mut signals = Signals::new([SIGINT, SIGTERM])?;
        let handle = signals.handle();

        Ok(tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {}
                signal = signals.next() => {
                    match signal {
                        Some(SIGINT) => info!("接收到 SIGINT 信号，开始优雅关闭..."),
                        Some(SIGTERM) => info!("接收到 SIGTERM 信号，开始优雅关闭..."),
                        Some(other) => warn!("接收到未处理的信号: {other}"),
                        None => warn!("信号流已结束"),
                    }
                    shutdown.cancel();
                }
            }
            handle.close();
        }))
    }

    #[cfg(not(unix))]
    {
        Ok(tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {}
                received = tokio::signal::ctrl_c() => {
                    match received {
                        Ok(()) => info!("接收到 Ctrl+C，开始优雅关闭..."),
                        Err(e) => error!("监听 Ctrl+C 失败: {e}"),
                    }
                    shutdown.cancel();
                }
            }
        }))
    }
}

/// 运行时限到达后触发全局取消
///
/// # 参数
/// * `shutdown` - 全局取消令牌
/// * `runtime` - 总运行时长
pub fn spawn_deadline(shutdown: CancellationToken, runtime: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {}
            _ = tokio::time::sleep(runtime) => {
                info!("已达到运行时限 {:?}，开始优雅关闭...", runtime);
                shutdown.cancel();
            }
        }
    })
}

/// 关闭屏障：持有所有流水线任务
#[derive(Default)]
pub struct TaskBarrier {
    tasks: JoinSet<TaskReport>,
    names: Vec<String>,
}

impl TaskBarrier {
    /// 创建空屏障
    pub fn new() -> Self {
        Self::default()
    }

    /// 生成一个任务，`name` 必须与任务报告中的名称一致
    pub fn spawn<F>(&mut self, name: impl Into<String>, task: F)
    where
        F: Future<Output = TaskReport> + Send + 'static,
    {
        self.names.push(name.into());
        self.tasks.spawn(task);
    }

    /// 任务数量
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// 是否没有任务
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// 等待所有任务退出
    ///
    /// 应在触发取消之后调用。超过宽限期仍未退出的任务会被中止，
    /// 并以 `aborted` 报告记入结果。
    ///
    /// # 参数
    /// * `grace` - 宽限期
    ///
    /// # 返回
    /// * `Vec<TaskReport>` - 每个任务一份报告
    pub async fn wait(mut self, grace: Duration) -> Vec<TaskReport> {
        let mut reports = Vec::with_capacity(self.names.len());

        let drained = tokio::time::timeout(grace, async {
            while let Some(joined) = self.tasks.join_next().await {
                match joined {
                    Ok(report) => reports.push(report),
                    Err(e) => error!("流水线任务异常退出: {e}"),
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!("等待任务退出超时 ({:?})，强制中止剩余任务", grace);
            self.tasks.abort_all();
            while self.tasks.join_next().await.is_some() {}
        }

        let finished: HashSet<&str> = reports.iter().map(|r| r.task.as_str()).collect();
        let missing: Vec<TaskReport> = self
            .names
            .iter()
            .filter(|name| !finished.contains(name.as_str()))
            .map(TaskReport::aborted)
            .collect();

        for report in &missing {
            warn!("任务未能按时退出: {}", report.task);
        }
        reports.extend(missing);
        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finished(name: &'static str) -> impl Future<Output = TaskReport> {
        async move {
            TaskReport {
                processed: 1,
                ..TaskReport::new(name)
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_cancels_token() {
        let shutdown = CancellationToken::new();
        let handle = spawn_deadline(shutdown.clone(), Duration::from_secs(30));

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert!(!shutdown.is_cancelled());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(shutdown.is_cancelled());
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_deadline_exits_on_external_cancel() {
        let shutdown = CancellationToken::new();
        let handle = spawn_deadline(shutdown.clone(), Duration::from_secs(3600));
        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_barrier_collects_all_reports() {
        let mut barrier = TaskBarrier::new();
        barrier.spawn("a", finished("a"));
        barrier.spawn("b", finished("b"));
        assert_eq!(barrier.len(), 2);

        let mut reports = barrier.wait(Duration::from_secs(1)).await;
        reports.sort_by(|x, y| x.task.cmp(&y.task));
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| !r.aborted && r.processed == 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_barrier_aborts_stragglers() {
        let mut barrier = TaskBarrier::new();
        barrier.spawn("quick", finished("quick"));
        barrier.spawn("stuck", async {
            std::future::pending::<()>().await;
            TaskReport::new("stuck")
        });

        let started = tokio::time::Instant::now();
        let reports = barrier.wait(Duration::from_secs(5)).await;
        assert!(started.elapsed() >= Duration::from_secs(5));

        let stuck = reports.iter().find(|r| r.task == "stuck").unwrap();
        assert!(stuck.aborted);
        let quick = reports.iter().find(|r| r.task == "quick").unwrap();
        assert!(!quick.aborted);
    }

    #[tokio::test]
    async fn test_signal_watcher_exits_on_cancel() {
        let shutdown = CancellationToken::new();
        let handle = spawn_signal_watcher(shutdown.clone()).unwrap();
        shutdown.cancel();
        handle.await.unwrap();
    }
}
