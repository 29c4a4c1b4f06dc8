//! 节点类型
//!
//! 定义网络节点，包括节点 trait 和具体实现（主机、路由器）。

use serde::{Deserialize, Serialize};

use super::id::NodeId;
use super::network::Network;
use super::packet::Packet;
use super::stats::{Delivery, DropReason};
use crate::sim::Simulator;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Host,
    Router,
}

/// 节点接口
pub trait Node: Send {
    /// 获取节点标识符
    fn id(&self) -> NodeId;

    /// 获取节点名称
    fn name(&self) -> &str;

    fn kind(&self) -> NodeKind;

    /// 处理到达的数据包；本地交付给应用的数据通过返回值上交
    fn on_packet(&mut self, pkt: Packet, sim: &mut Simulator, net: &mut Network)
    -> Option<Delivery>;
}

/// 主机节点：只接收发给自己的包，不转发
#[derive(Debug)]
pub struct Host {
    id: NodeId,
    name: String,
}

impl Host {
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl Node for Host {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Host
    }

    #[tracing::instrument(level = "debug", skip(self, sim, net), fields(node = %self.name, pkt_id = pkt.id))]
    fn on_packet(
        &mut self,
        pkt: Packet,
        sim: &mut Simulator,
        net: &mut Network,
    ) -> Option<Delivery> {
        trace!(src = %pkt.src, dst = %pkt.dst, "🖥️  Host 收到数据包");
        if net.is_local(self.id, *pkt.dst.ip()) {
            net.local_deliver(self.id, pkt, sim)
        } else {
            debug!("目的地址不属于本机，丢弃");
            net.drop_packet(self.id, pkt, sim.now(), DropReason::NoRoute);
            None
        }
    }
}

/// 路由器节点：转发经过的包
#[derive(Debug)]
pub struct Router {
    id: NodeId,
    name: String,
}

impl Router {
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl Node for Router {
    fn id(&self) -> NodeId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Router
    }

    #[tracing::instrument(level = "debug", skip(self, sim, net), fields(node = %self.name, pkt_id = pkt.id))]
    fn on_packet(
        &mut self,
        pkt: Packet,
        sim: &mut Simulator,
        net: &mut Network,
    ) -> Option<Delivery> {
        trace!(src = %pkt.src, dst = %pkt.dst, ttl = pkt.ttl, "🔀 Router 收到数据包");
        if net.is_local(self.id, *pkt.dst.ip()) {
            net.local_deliver(self.id, pkt, sim)
        } else {
            net.forward(self.id, pkt, sim);
            None
        }
    }
}
