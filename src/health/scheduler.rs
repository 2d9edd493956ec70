//! 探测调度模块
//!
//! 由两个协作部分组成：
//! - 许可发放器：按 `1/rate_limit_per_sec` 的周期向有界队列投放许可，限制全局探测速率
//! - 作业补充器：每个补充周期为每个URL投放固定份数的作业，队列满时阻塞形成背压
//!
//! 两者都在下一个阻塞点（定时器等待或队列写入）观察取消信号。

use crate::core::report::TaskReport;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// 一次探测的授权令牌
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permit;

/// 许可发放器
#[derive(Debug, Clone)]
pub struct PermitIssuer {
    /// 每秒许可数
    rate_per_sec: u32,
}

impl PermitIssuer {
    /// 创建新的许可发放器，速率至少为1
    pub fn new(rate_per_sec: u32) -> Self {
        Self {
            rate_per_sec: rate_per_sec.max(1),
        }
    }

    /// 许可队列容量，与每秒速率相同
    pub fn capacity(&self) -> usize {
        self.rate_per_sec as usize
    }

    /// 两次发放之间的周期
    pub fn period(&self) -> Duration {
        Duration::from_secs(1) / self.rate_per_sec
    }

    /// 运行发放循环，直到取消或许可队列关闭
    ///
    /// 队列满时只阻塞在单次写入上；每次写入完成后重新计时，错过的定时触发不会累积成突发。
    pub async fn run(
        self,
        permits: mpsc::Sender<Permit>,
        shutdown: CancellationToken,
    ) -> TaskReport {
        let mut report = TaskReport::new("permit-issuer");
        let period = self.period();
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("许可发放器已启动，周期: {:?}", period);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                sent = permits.send(Permit) => {
                    if sent.is_err() {
                        debug!("许可队列已关闭");
                        break;
                    }
                    report.processed += 1;
                }
            }

            // 写入可能因队列满而阻塞过，下一次发放从现在起重新计时
            ticker.reset();
        }

        info!("许可发放器已停止，共发放 {} 个许可", report.processed);
        report
    }
}

/// 作业补充器
#[derive(Debug, Clone)]
pub struct JobRefiller {
    /// 监控的URL列表
    urls: Arc<[String]>,
    /// 每个周期每个URL的作业份数
    multiplicity: u32,
    /// 补充周期
    interval: Duration,
}

impl JobRefiller {
    /// 创建新的作业补充器
    ///
    /// # 参数
    /// * `urls` - 监控的URL列表
    /// * `multiplicity` - 每个周期每个URL投放的作业份数
    /// * `interval` - 补充周期
    pub fn new(urls: Arc<[String]>, multiplicity: u32, interval: Duration) -> Self {
        Self {
            urls,
            multiplicity: multiplicity.max(1),
            interval,
        }
    }

    /// 作业队列容量，与URL数量相同
    pub fn capacity(&self) -> usize {
        self.urls.len().max(1)
    }

    /// 单个周期投放的作业总数
    pub fn burst_size(&self) -> usize {
        self.urls.len() * self.multiplicity as usize
    }

    /// 运行补充循环：启动时立即投放第一批，之后每个周期投放一批
    pub async fn run(self, jobs: mpsc::Sender<String>, shutdown: CancellationToken) -> TaskReport {
        let mut report = TaskReport::new("job-refiller");
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "作业补充器已启动，URL数量: {}，每批作业数: {}，周期: {:?}",
            self.urls.len(),
            self.burst_size(),
            self.interval
        );

        'refill: loop {
            for url in self.urls.iter() {
                for _ in 0..self.multiplicity {
                    tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => break 'refill,
                        sent = jobs.send(url.clone()) => {
                            if sent.is_err() {
                                debug!("作业队列已关闭");
                                break 'refill;
                            }
                            report.processed += 1;
                        }
                    }
                }
            }
            debug!("本批作业已全部入队");

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }
        }

        info!("作业补充器已停止，共投放 {} 个作业", report.processed);
        report
    }
}
