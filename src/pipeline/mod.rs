//! 结果处理流水线
//!
//! 结果落盘、状态机分析与事件生成

pub mod aggregator;
pub mod analyser;
pub mod recorder;
pub mod stat;

pub use aggregator::Aggregator;
pub use analyser::Analyser;
pub use recorder::{JsonLinesWriter, RunFiles};
pub use stat::{EndpointStat, HealthState, Transition, OUTAGE_THRESHOLD};
