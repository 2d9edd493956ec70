//! 结果汇聚器
//!
//! 结果队列的唯一消费者：逐条落盘后转交分析器。

use crate::core::report::TaskReport;
use crate::health::ProbeResult;
use crate::pipeline::recorder::JsonLinesWriter;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// 结果汇聚器
#[derive(Debug)]
pub struct Aggregator {
    writer: JsonLinesWriter,
    analysis: mpsc::UnboundedSender<ProbeResult>,
}

impl Aggregator {
    /// 创建汇聚器
    ///
    /// # 参数
    /// * `writer` - 结果文件写入器，启动时已打开
    /// * `analysis` - 到分析器的无界通道
    pub fn new(writer: JsonLinesWriter, analysis: mpsc::UnboundedSender<ProbeResult>) -> Self {
        Self { writer, analysis }
    }

    /// 运行汇聚循环
    ///
    /// 写入失败是致命的：记录错误并触发全局取消。
    ///
    /// # 返回
    /// * `TaskReport` - 处理与丢弃计数
    pub async fn run(
        mut self,
        mut results: mpsc::Receiver<ProbeResult>,
        shutdown: CancellationToken,
    ) -> TaskReport {
        let mut report = TaskReport::new("aggregator");
        info!("结果汇聚器已启动，输出文件: {}", self.writer.path().display());

        loop {
            let result = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                received = results.recv() => match received {
                    Some(result) => result,
                    None => break,
                },
            };

            log_result(&result);

            if let Err(e) = self.writer.append(&result).await {
                error!("写入结果文件失败，停止监控: {}", e);
                report.fatal = true;
                report.dropped += 1;
                shutdown.cancel();
                break;
            }
            report.processed += 1;

            // 分析器已退出时只影响分析，不影响落盘
            if self.analysis.send(result).is_err() {
                debug!("分析器已停止，结果未转交");
            }
        }

        results.close();
        while results.try_recv().is_ok() {
            report.dropped += 1;
        }

        info!(
            "结果汇聚器已停止，写入 {} 条，丢弃 {} 条",
            self.writer.written(),
            report.dropped
        );
        report
    }
}

fn log_result(result: &ProbeResult) {
    if result.is_transport_failure() {
        error!(
            url = %result.url,
            worker_id = result.worker_id,
            response_time_ms = result.latency_ms,
            error = result.error.as_deref().unwrap_or(""),
            "请求失败"
        );
    } else if !(200..300).contains(&result.status) {
        warn!(
            url = %result.url,
            worker_id = result.worker_id,
            status = result.status,
            response_time_ms = result.latency_ms,
            "非2xx响应"
        );
    } else {
        debug!(
            url = %result.url,
            worker_id = result.worker_id,
            status = result.status,
            response_time_ms = result.latency_ms,
            "探测成功"
        );
    }
}
