//! Network-facing API used by protocol stacks.

use std::net::Ipv4Addr;

use crate::sim::{SimTime, Simulator};

use super::{NodeId, Packet};

/// Minimal network API for protocol stacks.
pub trait NetApi {
    fn next_packet_id(&mut self) -> u64;
    fn source_addr(&self, node: NodeId, dst: Ipv4Addr) -> Option<Ipv4Addr>;
    fn alloc_ephemeral_port(&mut self, node: NodeId) -> u16;
    fn send_from(&mut self, from: NodeId, pkt: Packet, sim: &mut Simulator);

    fn trace_tcp_cwnd(&mut self, t: SimTime, conn_id: u64, cwnd: u64, ssthresh: u64, inflight: u64);
    fn trace_tcp_rto(&mut self, t: SimTime, conn_id: u64, seq: u64);
}

impl NetApi for super::Network {
    fn next_packet_id(&mut self) -> u64 {
        super::Network::next_packet_id(self)
    }

    fn source_addr(&self, node: NodeId, dst: Ipv4Addr) -> Option<Ipv4Addr> {
        super::Network::source_addr(self, node, dst)
    }

    fn alloc_ephemeral_port(&mut self, node: NodeId) -> u16 {
        super::Network::alloc_ephemeral_port(self, node)
    }

    fn send_from(&mut self, from: NodeId, pkt: Packet, sim: &mut Simulator) {
        super::Network::send_from(self, from, pkt, sim)
    }

    fn trace_tcp_cwnd(&mut self, t: SimTime, conn_id: u64, cwnd: u64, ssthresh: u64, inflight: u64) {
        if let Some(anim) = &mut self.anim {
            anim.tcp_cwnd(t, conn_id, cwnd, ssthresh, inflight);
        }
    }

    fn trace_tcp_rto(&mut self, t: SimTime, conn_id: u64, seq: u64) {
        if let Some(anim) = &mut self.anim {
            anim.tcp_rto(t, conn_id, seq);
        }
    }
}
