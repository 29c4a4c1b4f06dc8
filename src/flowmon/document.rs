//! 流监控输出文档（JSON）

use std::collections::BTreeMap;

use serde::Serialize;

use super::classifier::{ClassifierEntry, FlowId};
use super::histogram::HistogramBin;
use super::monitor::{FlowStats, ProbeFlowStats};
use crate::net::DropReason;

#[derive(Debug, Clone, Serialize)]
pub struct FlowMonitorDocument {
    pub generated_at_ns: u64,
    pub flow_stats: Vec<FlowStatsRecord>,
    pub classifier: Vec<ClassifierEntry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub probes: Vec<ProbeRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlowStatsRecord {
    pub flow_id: FlowId,
    pub time_first_tx_packet_ns: u64,
    pub time_first_rx_packet_ns: Option<u64>,
    pub time_last_tx_packet_ns: u64,
    pub time_last_rx_packet_ns: Option<u64>,
    pub delay_sum_ns: u64,
    pub jitter_sum_ns: u64,
    pub last_delay_ns: Option<u64>,
    pub tx_bytes: u64,
    pub rx_bytes: u64,
    pub tx_packets: u64,
    pub rx_packets: u64,
    pub lost_packets: u64,
    pub times_forwarded: u64,
    pub packets_dropped: BTreeMap<DropReason, u64>,
    pub bytes_dropped: BTreeMap<DropReason, u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub histograms: Option<FlowHistograms>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FlowHistograms {
    pub delay: Vec<HistogramBin>,
    pub jitter: Vec<HistogramBin>,
    pub packet_size: Vec<HistogramBin>,
    pub flow_interruptions: Vec<HistogramBin>,
}

impl FlowStatsRecord {
    pub(crate) fn from_stats(flow_id: FlowId, s: &FlowStats, histograms: bool) -> Self {
        Self {
            flow_id,
            time_first_tx_packet_ns: s.time_first_tx_packet.0,
            time_first_rx_packet_ns: s.time_first_rx_packet.map(|t| t.0),
            time_last_tx_packet_ns: s.time_last_tx_packet.0,
            time_last_rx_packet_ns: s.time_last_rx_packet.map(|t| t.0),
            delay_sum_ns: s.delay_sum.0,
            jitter_sum_ns: s.jitter_sum.0,
            last_delay_ns: s.last_delay.map(|t| t.0),
            tx_bytes: s.tx_bytes,
            rx_bytes: s.rx_bytes,
            tx_packets: s.tx_packets,
            rx_packets: s.rx_packets,
            lost_packets: s.lost_packets,
            times_forwarded: s.times_forwarded,
            packets_dropped: s.packets_dropped.clone(),
            bytes_dropped: s.bytes_dropped.clone(),
            histograms: histograms.then(|| FlowHistograms {
                delay: s.delay_histogram.bins(),
                jitter: s.jitter_histogram.bins(),
                packet_size: s.packet_size_histogram.bins(),
                flow_interruptions: s.flow_interruptions_histogram.bins(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeRecord {
    /// 探针所在节点
    pub index: usize,
    pub flows: Vec<ProbeFlowRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeFlowRecord {
    pub flow_id: FlowId,
    pub packets: u64,
    pub bytes: u64,
    pub delay_from_first_probe_sum_ns: u64,
    pub packets_dropped: BTreeMap<DropReason, u64>,
    pub bytes_dropped: BTreeMap<DropReason, u64>,
}

impl ProbeFlowRecord {
    pub(crate) fn from_stats(flow_id: FlowId, p: &ProbeFlowStats) -> Self {
        Self {
            flow_id,
            packets: p.packets,
            bytes: p.bytes,
            delay_from_first_probe_sum_ns: p.delay_from_first_probe_sum.0,
            packets_dropped: p.packets_dropped.clone(),
            bytes_dropped: p.bytes_dropped.clone(),
        }
    }
}
