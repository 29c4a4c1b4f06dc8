//! UDP：无连接数据报

use std::collections::HashSet;
use std::net::SocketAddrV4;

use tracing::trace;

use crate::error::ConfigError;
use crate::net::{Delivery, DropReason, IpProtocol, NetApi, NodeId, Packet, Transport};
use crate::sim::{SimTime, Simulator};

#[derive(Debug, Default)]
pub struct UdpStack {
    bound: HashSet<(NodeId, u16)>,
}

impl UdpStack {
    /// 在节点上监听端口
    pub fn bind(&mut self, node: NodeId, port: u16) -> Result<(), ConfigError> {
        if !self.bound.insert((node, port)) {
            return Err(ConfigError::PortInUse { node: node.0, port });
        }
        Ok(())
    }

    pub fn unbind(&mut self, node: NodeId, port: u16) {
        self.bound.remove(&(node, port));
    }

    pub fn is_bound(&self, node: NodeId, port: u16) -> bool {
        self.bound.contains(&(node, port))
    }

    /// 发送一个数据报；返回包号
    pub fn send_to(
        &mut self,
        net: &mut dyn NetApi,
        node: NodeId,
        local: SocketAddrV4,
        remote: SocketAddrV4,
        payload_bytes: u32,
        sim: &mut Simulator,
    ) -> u64 {
        let id = net.next_packet_id();
        let pkt = Packet::new(id, local, remote, Transport::Udp, payload_bytes, sim.now());
        trace!(%local, %remote, payload_bytes, "UDP 发送");
        net.send_from(node, pkt, sim);
        id
    }

    /// 目的节点收到数据报
    pub fn receive(
        &mut self,
        node: NodeId,
        pkt: &Packet,
        now: SimTime,
    ) -> Result<Option<Delivery>, DropReason> {
        if !self.is_bound(node, pkt.dst.port()) {
            return Err(DropReason::NoSocket);
        }
        Ok(Some(Delivery {
            node,
            protocol: IpProtocol::Udp,
            local: pkt.dst,
            remote: pkt.src,
            bytes: u64::from(pkt.payload_bytes),
            at: now,
        }))
    }
}
