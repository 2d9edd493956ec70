//! 任务运行报告
//!
//! 每个流水线任务退出时返回一份报告，编排器在关闭屏障处汇总

use serde::Serialize;
use std::fmt;

/// 单个任务的退出报告
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaskReport {
    /// 任务名称
    pub task: String,
    /// 已完成处理的条目数（许可、作业、结果或事件）
    pub processed: u64,
    /// 因关闭而显式丢弃的条目数
    pub dropped: u64,
    /// 通知发送成功次数
    pub sent: u64,
    /// 通知发送失败次数
    pub send_failures: u64,
    /// 是否在宽限期后被强制中止
    pub aborted: bool,
    /// 是否因致命错误（持久化失败）而触发了全局取消
    pub fatal: bool,
}

impl TaskReport {
    /// 创建空报告
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            ..Default::default()
        }
    }

    /// 创建被强制中止任务的报告
    pub fn aborted(task: impl Into<String>) -> Self {
        Self {
            aborted: true,
            ..Self::new(task)
        }
    }
}

impl fmt::Display for TaskReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: processed={} dropped={}",
            self.task, self.processed, self.dropped
        )?;
        if self.sent > 0 || self.send_failures > 0 {
            write!(f, " sent={} send_failures={}", self.sent, self.send_failures)?;
        }
        if self.fatal {
            write!(f, " (fatal)")?;
        }
        if self.aborted {
            write!(f, " (aborted)")?;
        }
        Ok(())
    }
}

/// 一次运行的汇总
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// 所有任务的报告
    pub reports: Vec<TaskReport>,
    /// 是否因持久化失败等致命错误而提前结束
    pub fatal: bool,
}

impl RunSummary {
    /// 按任务名称查找报告
    pub fn report(&self, task: &str) -> Option<&TaskReport> {
        self.reports.iter().find(|r| r.task == task)
    }

    /// 所有任务中显式丢弃的条目总数
    pub fn total_dropped(&self) -> u64 {
        self.reports.iter().map(|r| r.dropped).sum()
    }

    /// 汇总任务报告，任一任务致命则整体致命
    pub fn from_reports(reports: Vec<TaskReport>) -> Self {
        let fatal = reports.iter().any(|r| r.fatal);
        Self { reports, fatal }
    }

    /// 进程退出码：致命结束为 1，正常关闭为 0
    pub fn exit_code(&self) -> i32 {
        if self.fatal {
            1
        } else {
            0
        }
    }

    /// 被强制中止的任务数
    pub fn aborted_tasks(&self) -> usize {
        self.reports.iter().filter(|r| r.aborted).count()
    }

    /// 指定前缀的任务处理总数，例如 `worker` 汇总所有工作者
    pub fn processed_by_prefix(&self, prefix: &str) -> u64 {
        self.reports
            .iter()
            .filter(|r| r.task.starts_with(prefix))
            .map(|r| r.processed)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_totals() {
        let summary = RunSummary {
            reports: vec![
                TaskReport {
                    processed: 3,
                    dropped: 1,
                    ..TaskReport::new("worker-0")
                },
                TaskReport {
                    processed: 4,
                    ..TaskReport::new("worker-1")
                },
                TaskReport {
                    dropped: 2,
                    ..TaskReport::aborted("dispatcher")
                },
            ],
            fatal: false,
        };

        assert_eq!(summary.total_dropped(), 3);
        assert_eq!(summary.aborted_tasks(), 1);
        assert_eq!(summary.processed_by_prefix("worker"), 7);
        assert!(summary.report("dispatcher").unwrap().aborted);
        assert!(summary.report("aggregator").is_none());
    }

    #[test]
    fn test_summary_fatal_from_reports() {
        let summary = RunSummary::from_reports(vec![
            TaskReport::new("analyser"),
            TaskReport {
                fatal: true,
                ..TaskReport::new("aggregator")
            },
        ]);
        assert!(summary.fatal);
        assert_eq!(summary.exit_code(), 1);
        assert_eq!(
            summary.report("aggregator").unwrap().to_string(),
            "aggregator: processed=0 dropped=0 (fatal)"
        );
    }

    #[test]
    fn test_graceful_summary_exits_zero() {
        let summary = RunSummary::from_reports(vec![
            TaskReport {
                dropped: 3,
                ..TaskReport::new("worker-0")
            },
            TaskReport::aborted("dispatcher"),
        ]);
        assert!(!summary.fatal);
        assert_eq!(summary.exit_code(), 0);
    }

    #[test]
    fn test_report_display() {
        let report = TaskReport {
            processed: 2,
            sent: 2,
            send_failures: 1,
            ..TaskReport::new("dispatcher")
        };
        assert_eq!(
            report.to_string(),
            "dispatcher: processed=2 dropped=0 sent=2 send_failures=1"
        );
    }
}
