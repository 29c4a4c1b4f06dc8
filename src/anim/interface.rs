//! 动画事件收集器
//!
//! 在内存中累积事件，仿真结束后一次性写成 JSON 文件。

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::types::{
    AnimEvent, AnimEventKind, AnimLinkInfo, AnimNodeInfo, AnimPacketKind, Ipv4Counters,
};
use crate::error::SimError;
use crate::net::{DropReason, NetWorld, NodeId, Packet, Transport};
use crate::sim::{Event, SimTime, Simulator, World};

/// IPv4 计数器采样窗口
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterWindow {
    pub start: SimTime,
    pub stop: SimTime,
    pub poll_interval: SimTime,
}

#[derive(Debug)]
pub struct AnimationInterface {
    path: PathBuf,
    packet_metadata: bool,
    counters: Option<CounterWindow>,
    node_counters: Vec<Ipv4Counters>,
    events: Vec<AnimEvent>,
}

impl AnimationInterface {
    pub const DEFAULT_POLL_INTERVAL: SimTime = SimTime(1_000_000_000);

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            packet_metadata: false,
            counters: None,
            node_counters: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn events(&self) -> &[AnimEvent] {
        &self.events
    }

    /// 每条 Tx 事件附带包头描述
    pub fn enable_packet_metadata(&mut self) {
        self.packet_metadata = true;
    }

    pub fn packet_metadata_enabled(&self) -> bool {
        self.packet_metadata
    }

    /// 在 `[start, stop]` 内按默认间隔采样 IPv4 L3 计数器
    pub fn enable_ipv4_l3_counters(&mut self, start: SimTime, stop: SimTime) {
        self.counters = Some(CounterWindow {
            start,
            stop,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
        });
    }

    pub fn set_counter_poll_interval(&mut self, interval: SimTime) {
        if let Some(w) = &mut self.counters {
            w.poll_interval = interval.max(SimTime(1));
        }
    }

    pub fn counter_window(&self) -> Option<CounterWindow> {
        self.counters
    }

    pub fn counters(&self, node: NodeId) -> Ipv4Counters {
        self.node_counters.get(node.0).copied().unwrap_or_default()
    }

    fn counters_mut(&mut self, node: NodeId) -> &mut Ipv4Counters {
        if self.node_counters.len() <= node.0 {
            self.node_counters.resize(node.0 + 1, Ipv4Counters::default());
        }
        &mut self.node_counters[node.0]
    }

    fn push(&mut self, ev: AnimEvent) {
        self.events.push(ev);
    }

    pub(crate) fn packet_kind(pkt: &Packet) -> AnimPacketKind {
        match &pkt.transport {
            Transport::Udp => AnimPacketKind::Udp,
            Transport::Tcp(seg) if seg.len > 0 => AnimPacketKind::TcpData,
            Transport::Tcp(seg) if seg.is_pure_ack() => AnimPacketKind::TcpAck,
            Transport::Tcp(_) => AnimPacketKind::TcpControl,
        }
    }

    pub fn record_meta(&mut self, nodes: Vec<AnimNodeInfo>, links: Vec<AnimLinkInfo>) {
        // meta 总是放在最前面
        self.events.insert(
            0,
            AnimEvent {
                t_ns: 0,
                pkt_id: None,
                pkt_bytes: None,
                pkt_kind: None,
                kind: AnimEventKind::Meta { nodes, links },
            },
        );
    }

    #[allow(clippy::too_many_arguments)]
    pub fn packet_tx(
        &mut self,
        pkt: &Packet,
        from: NodeId,
        to: NodeId,
        fb_tx: SimTime,
        lb_tx: SimTime,
        fb_rx: SimTime,
        lb_rx: SimTime,
    ) {
        let meta = self.packet_metadata.then(|| pkt.describe());
        self.push(AnimEvent {
            t_ns: fb_tx.0,
            pkt_id: Some(pkt.id),
            pkt_bytes: Some(pkt.wire_bytes()),
            pkt_kind: Some(Self::packet_kind(pkt)),
            kind: AnimEventKind::Tx {
                from: from.0,
                to: to.0,
                fb_tx_ns: fb_tx.0,
                lb_tx_ns: lb_tx.0,
                fb_rx_ns: fb_rx.0,
                lb_rx_ns: lb_rx.0,
                meta,
            },
        });
    }

    pub fn packet_drop(&mut self, t: SimTime, pkt: &Packet, node: NodeId, reason: DropReason) {
        self.counters_mut(node).drop += 1;
        self.push(AnimEvent {
            t_ns: t.0,
            pkt_id: Some(pkt.id),
            pkt_bytes: Some(pkt.wire_bytes()),
            pkt_kind: Some(Self::packet_kind(pkt)),
            kind: AnimEventKind::Drop {
                node: node.0,
                reason,
            },
        });
    }

    pub fn ipv4_tx(&mut self, node: NodeId) {
        self.counters_mut(node).tx += 1;
    }

    pub fn ipv4_rx(&mut self, node: NodeId) {
        self.counters_mut(node).rx += 1;
    }

    /// 采样全部节点的计数器
    pub fn poll_counters(&mut self, t: SimTime, node_count: usize) {
        for id in 0..node_count {
            let c = self.counters(NodeId(id));
            self.push(AnimEvent {
                t_ns: t.0,
                pkt_id: None,
                pkt_bytes: None,
                pkt_kind: None,
                kind: AnimEventKind::Ipv4Counters {
                    node: id,
                    tx: c.tx,
                    rx: c.rx,
                    drop: c.drop,
                },
            });
        }
    }

    pub fn tcp_cwnd(&mut self, t: SimTime, conn_id: u64, cwnd: u64, ssthresh: u64, inflight: u64) {
        self.push(AnimEvent {
            t_ns: t.0,
            pkt_id: None,
            pkt_bytes: None,
            pkt_kind: None,
            kind: AnimEventKind::TcpCwnd {
                conn_id,
                cwnd_bytes: cwnd,
                ssthresh_bytes: ssthresh,
                inflight_bytes: inflight,
            },
        });
    }

    pub fn tcp_rto(&mut self, t: SimTime, conn_id: u64, seq: u64) {
        self.push(AnimEvent {
            t_ns: t.0,
            pkt_id: None,
            pkt_bytes: None,
            pkt_kind: Some(AnimPacketKind::TcpData),
            kind: AnimEventKind::TcpRto { conn_id, seq },
        });
    }

    /// 写出 JSON 事件列表
    pub fn write(&self) -> Result<(), SimError> {
        self.write_to(&self.path)
    }

    /// 写到指定文件，不改变默认输出路径
    pub fn write_to(&self, path: &Path) -> Result<(), SimError> {
        let json = serde_json::to_string_pretty(&self.events)?;
        std::fs::write(path, json).map_err(|e| SimError::io(path, e))?;
        info!(path = %path.display(), events = self.events.len(), "动画事件已写出");
        Ok(())
    }
}

/// 事件：周期性采样 IPv4 计数器，直到窗口结束
#[derive(Debug)]
pub struct AnimCounterPoll;

impl Event for AnimCounterPoll {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let w = world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld");
        let node_count = w.net.node_count();
        let Some(anim) = w.net.anim.as_mut() else {
            return;
        };
        let Some(window) = anim.counter_window() else {
            return;
        };
        let now = sim.now();
        anim.poll_counters(now, node_count);
        debug!(now = %now, "采样 IPv4 计数器");

        let next = now.saturating_add(window.poll_interval);
        if next <= window.stop {
            sim.schedule(next, AnimCounterPoll);
        }
    }
}
