//! 流监控（flow monitor）
//!
//! 按五元组把包归入流，在各节点 IP 层探针处统计，仿真结束后写出 JSON。

mod classifier;
mod document;
mod histogram;
mod monitor;

pub use classifier::{ClassifierEntry, FlowClassifier, FlowId};
pub use document::{FlowHistograms, FlowMonitorDocument, FlowStatsRecord, ProbeFlowRecord, ProbeRecord};
pub use histogram::{Histogram, HistogramBin};
pub use monitor::{FlowMonitor, FlowMonitorConfig, FlowStats, ProbeFlowStats};
