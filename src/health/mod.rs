//! 探测模块
//!
//! 提供HTTP探测、结果类型、速率调度与工作者池

pub mod checker;
pub mod result;
pub mod scheduler;
pub mod worker;

// 重新导出主要类型
pub use checker::{build_http_client, HttpProber, Prober};
pub use result::ProbeResult;
pub use scheduler::{JobRefiller, Permit, PermitIssuer};
pub use worker::{SharedReceiver, WorkerPool};
