//! Animation hooks for the network.

use crate::anim::{AnimCounterPoll, AnimLinkInfo, AnimNodeInfo};
use crate::queue::QueueLimit;
use crate::sim::Simulator;

use super::{Network, NodeId, NodeKind};

impl Network {
    /// 生成拓扑元信息（节点位置、地址、链路参数）写入动画轨迹
    pub fn emit_anim_meta(&mut self) {
        if self.anim.is_none() {
            return;
        }
        let nodes = (0..self.node_count())
            .map(|id| {
                let node = NodeId(id);
                AnimNodeInfo {
                    id,
                    name: self.node_name(node).unwrap_or_default().to_string(),
                    kind: self.node_kind(node).unwrap_or(NodeKind::Router),
                    position: self.mobility.position(node),
                    ipv4: self
                        .addresses(node)
                        .iter()
                        .map(|i| format!("{}/{}", i.addr, i.prefix_len()))
                        .collect(),
                }
            })
            .collect::<Vec<_>>();
        let links = self
            .links()
            .iter()
            .map(|l| AnimLinkInfo {
                from: l.from.0,
                to: l.to.0,
                from_addr: self.device(l.from_dev).iface.map(|i| i.addr.to_string()),
                to_addr: self.device(l.to_dev).iface.map(|i| i.addr.to_string()),
                data_rate_bps: l.rate.bps(),
                delay_ns: l.delay.0,
                queue: match l.queue.limit() {
                    QueueLimit::Packets(n) => format!("{n}p"),
                    QueueLimit::Bytes(n) => format!("{n}B"),
                },
            })
            .collect::<Vec<_>>();
        if let Some(anim) = &mut self.anim {
            anim.record_meta(nodes, links);
        }
    }

    /// 记录元信息并启动计数器采样
    pub fn start_animation(&mut self, sim: &mut Simulator) {
        self.emit_anim_meta();
        if let Some(window) = self.anim.as_ref().and_then(|a| a.counter_window()) {
            sim.schedule(window.start, AnimCounterPoll);
        }
    }
}
