//! Local delivery and protocol dispatch.

use tracing::{debug, trace};

use super::{Delivery, DropReason, Network, NodeId, Packet, Transport};
use crate::sim::Simulator;

impl Network {
    /// 数据包送达目的节点：流监控记录后交给传输层。
    #[tracing::instrument(level = "debug", skip(self, pkt, sim), fields(pkt_id = pkt.id))]
    pub(crate) fn local_deliver(
        &mut self,
        node: NodeId,
        pkt: Packet,
        sim: &mut Simulator,
    ) -> Option<Delivery> {
        let now = sim.now();
        self.stats.delivered_pkts += 1;
        self.stats.delivered_bytes += u64::from(pkt.ip_bytes());
        if let Some(fm) = &mut self.flowmon {
            fm.report_last_rx(node, &pkt, now);
        }
        trace!(src = %pkt.src, dst = %pkt.dst, "✅ 数据包送达目的地");

        let result = match pkt.transport {
            Transport::Udp => self.udp.receive(node, &pkt, now),
            Transport::Tcp(seg) => {
                // 规避同时借用 `self` 与 `self.tcp`
                let mut tcp = std::mem::take(&mut self.tcp);
                let r = tcp.on_segment(node, &pkt, seg, sim, self);
                self.tcp = tcp;
                r
            }
        };
        match result {
            Ok(up) => up,
            Err(reason) => {
                debug!(?reason, port = pkt.dst.port(), "传输层拒收");
                self.drop_packet(node, pkt, now, reason);
                None
            }
        }
    }
}
