//! 流监控器
//!
//! 在每个节点的 IP 层挂探针：源节点首次发送、路由器转发、目的节点本地交付、丢包。
//! 统计按流汇总（时延、抖动、吞吐、丢包），并可按探针（节点）拆分。

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::classifier::{FlowClassifier, FlowId};
use super::document::{FlowMonitorDocument, FlowStatsRecord, ProbeFlowRecord, ProbeRecord};
use super::histogram::Histogram;
use crate::error::SimError;
use crate::net::{DropReason, FlowTag, NodeId, Packet};
use crate::sim::SimTime;

/// 流监控参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowMonitorConfig {
    /// 超过该时间未被任何探针看到的包视为丢失
    pub max_per_hop_delay: SimTime,
    /// 早于该时间发出的包不纳入统计
    pub start_time: SimTime,
    pub delay_bin_width: f64,
    pub jitter_bin_width: f64,
    pub packet_size_bin_width: f64,
    pub flow_interruptions_bin_width: f64,
    pub flow_interruptions_min_time: SimTime,
}

impl Default for FlowMonitorConfig {
    fn default() -> Self {
        Self {
            max_per_hop_delay: SimTime::from_secs(10),
            start_time: SimTime::ZERO,
            delay_bin_width: 0.001,
            jitter_bin_width: 0.001,
            packet_size_bin_width: 20.0,
            flow_interruptions_bin_width: 0.25,
            flow_interruptions_min_time: SimTime::from_millis(500),
        }
    }
}

/// 单条流的累计统计
#[derive(Debug, Clone)]
pub struct FlowStats {
    pub time_first_tx_packet: SimTime,
    pub time_first_rx_packet: Option<SimTime>,
    pub time_last_tx_packet: SimTime,
    pub time_last_rx_packet: Option<SimTime>,
    pub delay_sum: SimTime,
    pub jitter_sum: SimTime,
    pub last_delay: Option<SimTime>,
    pub tx_bytes: u64,
    pub rx_bytes: u64,
    pub tx_packets: u64,
    pub rx_packets: u64,
    pub lost_packets: u64,
    pub times_forwarded: u64,
    pub packets_dropped: BTreeMap<DropReason, u64>,
    pub bytes_dropped: BTreeMap<DropReason, u64>,
    pub delay_histogram: Histogram,
    pub jitter_histogram: Histogram,
    pub packet_size_histogram: Histogram,
    pub flow_interruptions_histogram: Histogram,
}

impl FlowStats {
    fn new(first_tx: SimTime, cfg: &FlowMonitorConfig) -> Self {
        Self {
            time_first_tx_packet: first_tx,
            time_first_rx_packet: None,
            time_last_tx_packet: first_tx,
            time_last_rx_packet: None,
            delay_sum: SimTime::ZERO,
            jitter_sum: SimTime::ZERO,
            last_delay: None,
            tx_bytes: 0,
            rx_bytes: 0,
            tx_packets: 0,
            rx_packets: 0,
            lost_packets: 0,
            times_forwarded: 0,
            packets_dropped: BTreeMap::new(),
            bytes_dropped: BTreeMap::new(),
            delay_histogram: Histogram::new(cfg.delay_bin_width),
            jitter_histogram: Histogram::new(cfg.jitter_bin_width),
            packet_size_histogram: Histogram::new(cfg.packet_size_bin_width),
            flow_interruptions_histogram: Histogram::new(cfg.flow_interruptions_bin_width),
        }
    }

    pub fn mean_delay(&self) -> Option<SimTime> {
        (self.rx_packets > 0).then(|| SimTime(self.delay_sum.0 / self.rx_packets))
    }

    pub fn mean_jitter(&self) -> Option<SimTime> {
        (self.rx_packets > 1).then(|| SimTime(self.jitter_sum.0 / (self.rx_packets - 1)))
    }

    /// 接收吞吐（bit/s），按首包发送到末包接收的区间计算
    pub fn rx_throughput_bps(&self) -> f64 {
        let Some(last_rx) = self.time_last_rx_packet else {
            return 0.0;
        };
        let span = last_rx.saturating_sub(self.time_first_tx_packet).as_secs_f64();
        if span <= 0.0 {
            0.0
        } else {
            self.rx_bytes as f64 * 8.0 / span
        }
    }

    /// 未到达比例 (tx - rx) / tx
    pub fn loss_ratio(&self) -> f64 {
        if self.tx_packets == 0 {
            0.0
        } else {
            self.tx_packets.saturating_sub(self.rx_packets) as f64 / self.tx_packets as f64
        }
    }

    pub fn total_dropped(&self) -> u64 {
        self.packets_dropped.values().sum()
    }
}

/// 单个探针上某条流的统计
#[derive(Debug, Clone, Default)]
pub struct ProbeFlowStats {
    pub packets: u64,
    pub bytes: u64,
    pub delay_from_first_probe_sum: SimTime,
    pub packets_dropped: BTreeMap<DropReason, u64>,
    pub bytes_dropped: BTreeMap<DropReason, u64>,
}

#[derive(Debug, Clone, Copy)]
struct TrackedPacket {
    first_seen: SimTime,
    last_seen: SimTime,
    times_forwarded: u32,
}

#[derive(Debug, Default)]
pub struct FlowMonitor {
    cfg: FlowMonitorConfig,
    classifier: FlowClassifier,
    flows: BTreeMap<FlowId, FlowStats>,
    next_packet_id: HashMap<FlowId, u32>,
    tracked: HashMap<FlowTag, TrackedPacket>,
    probes: BTreeMap<NodeId, BTreeMap<FlowId, ProbeFlowStats>>,
}

impl FlowMonitor {
    pub fn new(cfg: FlowMonitorConfig) -> Self {
        Self {
            cfg,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &FlowMonitorConfig {
        &self.cfg
    }

    pub fn classifier(&self) -> &FlowClassifier {
        &self.classifier
    }

    pub fn flow_stats(&self) -> &BTreeMap<FlowId, FlowStats> {
        &self.flows
    }

    pub fn flow(&self, id: FlowId) -> Option<&FlowStats> {
        self.flows.get(&id)
    }

    pub fn probe(&self, node: NodeId) -> Option<&BTreeMap<FlowId, ProbeFlowStats>> {
        self.probes.get(&node)
    }

    /// 仍在途中的被跟踪包数
    pub fn tracked_packets(&self) -> usize {
        self.tracked.len()
    }

    fn probe_entry(&mut self, node: NodeId, flow: FlowId) -> &mut ProbeFlowStats {
        self.probes.entry(node).or_default().entry(flow).or_default()
    }

    /// 源节点探针：分类、打标签、记录发送
    pub fn report_first_tx(&mut self, node: NodeId, pkt: &mut Packet, now: SimTime) {
        if now < self.cfg.start_time {
            return;
        }
        let flow_id = self.classifier.classify(pkt.five_tuple());
        let counter = self.next_packet_id.entry(flow_id).or_insert(0);
        let packet_id = *counter;
        *counter = counter.wrapping_add(1);
        let tag = FlowTag { flow_id, packet_id };
        pkt.tag = Some(tag);

        self.tracked.insert(
            tag,
            TrackedPacket {
                first_seen: now,
                last_seen: now,
                times_forwarded: 0,
            },
        );

        let size = u64::from(pkt.ip_bytes());
        let cfg = &self.cfg;
        let stats = self
            .flows
            .entry(flow_id)
            .or_insert_with(|| FlowStats::new(now, cfg));
        stats.time_last_tx_packet = now;
        stats.tx_packets += 1;
        stats.tx_bytes += size;
        stats.packet_size_histogram.add_value(size as f64);

        let probe = self.probe_entry(node, flow_id);
        probe.packets += 1;
        probe.bytes += size;
        debug!(%node, flow_id, packet_id, size, "flowmon: 首次发送");
    }

    /// 转发探针
    pub fn report_forwarding(&mut self, node: NodeId, pkt: &Packet, now: SimTime) {
        let Some(tag) = pkt.tag else {
            return;
        };
        let Some(tracked) = self.tracked.get_mut(&tag) else {
            return;
        };
        tracked.times_forwarded += 1;
        tracked.last_seen = now;
        let delay = now.saturating_sub(tracked.first_seen);

        let probe = self.probe_entry(node, tag.flow_id);
        probe.packets += 1;
        probe.bytes += u64::from(pkt.ip_bytes());
        probe.delay_from_first_probe_sum = probe.delay_from_first_probe_sum.saturating_add(delay);
    }

    /// 目的节点探针：计算时延与抖动
    pub fn report_last_rx(&mut self, node: NodeId, pkt: &Packet, now: SimTime) {
        let Some(tag) = pkt.tag else {
            return;
        };
        let Some(tracked) = self.tracked.remove(&tag) else {
            return;
        };
        let delay = now.saturating_sub(tracked.first_seen);
        let size = u64::from(pkt.ip_bytes());

        let min_gap = self.cfg.flow_interruptions_min_time;
        if let Some(stats) = self.flows.get_mut(&tag.flow_id) {
            stats.delay_sum = stats.delay_sum.saturating_add(delay);
            stats.delay_histogram.add_value(delay.as_secs_f64());
            if let Some(last) = stats.last_delay {
                let jitter = SimTime(delay.0.abs_diff(last.0));
                stats.jitter_sum = stats.jitter_sum.saturating_add(jitter);
                stats.jitter_histogram.add_value(jitter.as_secs_f64());
            }
            stats.last_delay = Some(delay);

            if let Some(prev_rx) = stats.time_last_rx_packet {
                let gap = now.saturating_sub(prev_rx);
                if gap > min_gap {
                    stats.flow_interruptions_histogram.add_value(gap.as_secs_f64());
                }
            }

            stats.rx_bytes += size;
            stats.rx_packets += 1;
            if stats.rx_packets == 1 {
                stats.time_first_rx_packet = Some(now);
            }
            stats.time_last_rx_packet = Some(now);
            stats.times_forwarded += u64::from(tracked.times_forwarded);
        }

        let probe = self.probe_entry(node, tag.flow_id);
        probe.packets += 1;
        probe.bytes += size;
        probe.delay_from_first_probe_sum = probe.delay_from_first_probe_sum.saturating_add(delay);
    }

    /// 丢包探针。被丢弃的包不再跟踪。
    pub fn report_drop(&mut self, node: NodeId, pkt: &Packet, _now: SimTime, reason: DropReason) {
        let Some(tag) = pkt.tag else {
            return;
        };
        self.tracked.remove(&tag);
        let size = u64::from(pkt.ip_bytes());

        if let Some(stats) = self.flows.get_mut(&tag.flow_id) {
            *stats.packets_dropped.entry(reason).or_insert(0) += 1;
            *stats.bytes_dropped.entry(reason).or_insert(0) += size;
        }
        let probe = self.probe_entry(node, tag.flow_id);
        *probe.packets_dropped.entry(reason).or_insert(0) += 1;
        *probe.bytes_dropped.entry(reason).or_insert(0) += size;
    }

    /// 把长时间未出现的在途包记为丢失
    pub fn check_for_lost_packets(&mut self, now: SimTime, max_delay: SimTime) {
        let flows = &mut self.flows;
        self.tracked.retain(|tag, t| {
            if now.saturating_sub(t.last_seen) >= max_delay {
                if let Some(stats) = flows.get_mut(&tag.flow_id) {
                    stats.lost_packets += 1;
                }
                false
            } else {
                true
            }
        });
    }

    /// 生成可序列化文档（会先做一次丢包检查）
    pub fn to_document(
        &mut self,
        now: SimTime,
        enable_histograms: bool,
        enable_probes: bool,
    ) -> FlowMonitorDocument {
        self.check_for_lost_packets(now, self.cfg.max_per_hop_delay);

        let flow_stats = self
            .flows
            .iter()
            .map(|(&id, s)| FlowStatsRecord::from_stats(id, s, enable_histograms))
            .collect();

        let probes = if enable_probes {
            self.probes
                .iter()
                .map(|(&node, flows)| ProbeRecord {
                    index: node.0,
                    flows: flows
                        .iter()
                        .map(|(&flow_id, p)| ProbeFlowRecord::from_stats(flow_id, p))
                        .collect(),
                })
                .collect()
        } else {
            Vec::new()
        };

        FlowMonitorDocument {
            generated_at_ns: now.0,
            flow_stats,
            classifier: self.classifier.entries(),
            probes,
        }
    }

    /// 写出 JSON 文件
    pub fn serialize_to_file(
        &mut self,
        path: &Path,
        now: SimTime,
        enable_histograms: bool,
        enable_probes: bool,
    ) -> Result<(), SimError> {
        let doc = self.to_document(now, enable_histograms, enable_probes);
        let json = serde_json::to_string_pretty(&doc)?;
        std::fs::write(path, json).map_err(|e| SimError::io(path, e))?;
        info!(path = %path.display(), flows = doc.flow_stats.len(), "flow monitor 已写出");
        Ok(())
    }
}
