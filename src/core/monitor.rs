//! 监控编排
//!
//! 负责创建输出文件与队列、启动全部流水线任务，
//! 并在取消后通过关闭屏障汇总各任务的报告。

use crate::config::Config;
use crate::core::report::RunSummary;
use crate::core::shutdown::TaskBarrier;
use crate::error::Result;
use crate::health::{
    build_http_client, HttpProber, JobRefiller, PermitIssuer, Prober, SharedReceiver, WorkerPool,
};
use crate::notification::{Dispatcher, SenderRegistry};
use crate::pipeline::{Aggregator, Analyser, JsonLinesWriter, RunFiles};
use anyhow::Context;
use chrono::Local;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// 事件队列容量
pub const EVENT_QUEUE_CAPACITY: usize = 100;

/// 监控编排器
pub struct Monitor {
    config: Config,
    prober: Option<Arc<dyn Prober>>,
    registry: Option<SenderRegistry>,
}

impl Monitor {
    /// 创建编排器
    ///
    /// # 参数
    /// * `config` - 已规范化的配置
    pub fn new(config: Config) -> Self {
        Self {
            config,
            prober: None,
            registry: None,
        }
    }

    /// 替换默认的HTTP探测器
    pub fn with_prober(mut self, prober: Arc<dyn Prober>) -> Self {
        self.prober = Some(prober);
        self
    }

    /// 替换根据配置构建的发送器注册表
    pub fn with_senders(mut self, registry: SenderRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// 运行监控直到 `shutdown` 被取消
    ///
    /// 启动阶段的失败（输出目录、输出文件、HTTP客户端、消息模板）直接返回错误；
    /// 启动之后的致命错误通过取消令牌结束运行，并体现在 [`RunSummary::fatal`] 中。
    ///
    /// # 参数
    /// * `shutdown` - 全局取消令牌
    ///
    /// # 返回
    /// * `Result<RunSummary>` - 所有任务的报告
    pub async fn run(self, shutdown: CancellationToken) -> Result<RunSummary> {
        let Monitor {
            config,
            prober,
            registry,
        } = self;

        let output_dir = config.output_dir();
        tokio::fs::create_dir_all(&output_dir)
            .await
            .with_context(|| format!("创建输出目录失败: {}", output_dir.display()))?;

        let files = RunFiles::new(&output_dir, Local::now());
        let results_writer = JsonLinesWriter::open(&files.results).await?;
        let events_writer = JsonLinesWriter::open(&files.events).await?;

        let client = build_http_client().context("创建HTTP客户端失败")?;
        let prober = prober.unwrap_or_else(|| {
            Arc::new(HttpProber::new(client.clone(), config.request_timeout()))
        });
        let registry = match registry {
            Some(registry) => registry,
            None => SenderRegistry::from_config(&config, &client)?,
        };

        let urls: Arc<[String]> = config.urls.clone().into();
        let issuer = PermitIssuer::new(config.rate_limit());
        let refiller = JobRefiller::new(
            Arc::clone(&urls),
            config.refill_multiplicity(),
            config.request_interval(),
        );
        let pool = WorkerPool::new(config.worker_count(), prober);

        let (permit_tx, permit_rx) = mpsc::channel(issuer.capacity());
        let (job_tx, job_rx) = mpsc::channel(refiller.capacity());
        let (result_tx, result_rx) = mpsc::channel(pool.size());
        let (analysis_tx, analysis_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);

        info!(
            urls = urls.len(),
            workers = pool.size(),
            rate_limit_per_sec = config.rate_limit(),
            request_interval_secs = config.request_interval().as_secs(),
            refill_multiplicity = config.refill_multiplicity(),
            notification_services = ?config.notification_services,
            "监控启动"
        );
        info!("结果文件: {}", files.results.display());
        info!("事件文件: {}", files.events.display());

        let mut tasks = TaskBarrier::new();
        tasks.spawn("permit-issuer", issuer.run(permit_tx, shutdown.clone()));
        tasks.spawn("job-refiller", refiller.run(job_tx, shutdown.clone()));
        pool.spawn(
            &mut tasks,
            SharedReceiver::new(job_rx),
            SharedReceiver::new(permit_rx),
            result_tx,
            shutdown.clone(),
        );
        tasks.spawn(
            "aggregator",
            Aggregator::new(results_writer, analysis_tx).run(result_rx, shutdown.clone()),
        );
        tasks.spawn(
            "analyser",
            Analyser::new(urls.iter().cloned()).run(analysis_rx, event_tx, shutdown.clone()),
        );
        tasks.spawn(
            "dispatcher",
            Dispatcher::new(registry, config.notification_services.clone(), events_writer)
                .run(event_rx, shutdown.clone()),
        );

        shutdown.cancelled().await;
        info!("开始关闭，等待 {} 个任务退出...", tasks.len());

        let grace = config.shutdown_grace();
        let summary = RunSummary::from_reports(tasks.wait(grace).await);

        for report in &summary.reports {
            if report.aborted {
                warn!("{}", report);
            } else {
                info!("{}", report);
            }
        }
        info!(
            total_dropped = summary.total_dropped(),
            aborted_tasks = summary.aborted_tasks(),
            fatal = summary.fatal,
            "监控已停止"
        );

        Ok(summary)
    }
}
