//! 网络拓扑管理
//!
//! 节点、点对点链路、IPv4 地址、路由，以及数据包的发送/转发/排队。

use std::collections::HashMap;
use std::net::Ipv4Addr;

use super::addr::Ipv4Interface;
use super::deliver_packet::DeliverPacket;
use super::id::{DeviceId, LinkId, NodeId};
use super::link::{Device, Link, P2pConfig};
use super::link_ready::LinkReady;
use super::node::{Host, Node, NodeKind, Router};
use super::packet::Packet;
use super::routing::{EcmpMode, RoutingTable};
use super::stats::{Delivery, DropReason, Stats};
use crate::anim::AnimationInterface;
use crate::flowmon::FlowMonitor;
use crate::mobility::ConstantPositionMobility;
use crate::proto::tcp::TcpStack;
use crate::proto::udp::UdpStack;
use crate::queue::QueueLimit;
use crate::sim::{SimTime, Simulator};
use tracing::{debug, info, trace, warn};

/// 第一个临时端口
pub const EPHEMERAL_PORT_START: u16 = 49153;

/// 网络拓扑
#[derive(Default)]
pub struct Network {
    nodes: Vec<Option<Box<dyn Node>>>,
    node_names: Vec<String>,
    node_kinds: Vec<NodeKind>,
    node_devices: Vec<Vec<DeviceId>>,
    devices: Vec<Device>,
    links: Vec<Link>,
    edges: HashMap<(NodeId, NodeId), LinkId>,
    addr_owner: HashMap<Ipv4Addr, NodeId>,
    routing: RoutingTable,
    next_pkt_id: u64,
    next_ephemeral: HashMap<NodeId, u16>,
    pub stats: Stats,
    pub tcp: TcpStack,
    pub udp: UdpStack,
    pub flowmon: Option<FlowMonitor>,
    pub anim: Option<AnimationInterface>,
    pub mobility: ConstantPositionMobility,
}

impl Network {
    fn add_node(&mut self, node: Box<dyn Node>) -> NodeId {
        let id = node.id();
        self.node_names.push(node.name().to_string());
        self.node_kinds.push(node.kind());
        self.node_devices.push(Vec::new());
        self.nodes.push(Some(node));
        id
    }

    /// 添加主机节点
    pub fn add_host(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.add_node(Box::new(Host::new(id, name)))
    }

    /// 添加路由器节点
    pub fn add_router(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.add_node(Box::new(Router::new(id, name)))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        self.node_names.get(id.0).map(String::as_str)
    }

    pub fn node_kind(&self, id: NodeId) -> Option<NodeKind> {
        self.node_kinds.get(id.0).copied()
    }

    /// 安装一条双工点对点链路，返回 (a 端设备, b 端设备)
    pub fn install_p2p(&mut self, a: NodeId, b: NodeId, cfg: &P2pConfig) -> (DeviceId, DeviceId) {
        let dev_a = DeviceId(self.devices.len());
        let dev_b = DeviceId(self.devices.len() + 1);
        let ab = LinkId(self.links.len());
        let ba = LinkId(self.links.len() + 1);

        self.links.push(Link::new(a, b, dev_a, dev_b, cfg));
        self.links.push(Link::new(b, a, dev_b, dev_a, cfg));
        self.devices.push(Device {
            node: a,
            peer: b,
            tx_link: ab,
            rx_link: ba,
            iface: None,
        });
        self.devices.push(Device {
            node: b,
            peer: a,
            tx_link: ba,
            rx_link: ab,
            iface: None,
        });
        self.node_devices[a.0].push(dev_a);
        self.node_devices[b.0].push(dev_b);
        self.edges.insert((a, b), ab);
        self.edges.insert((b, a), ba);
        debug!(%a, %b, rate = %cfg.data_rate, delay = %cfg.delay, "安装点对点链路");
        (dev_a, dev_b)
    }

    /// 给设备绑定 IPv4 地址
    pub fn assign(&mut self, dev: DeviceId, iface: Ipv4Interface) {
        let node = self.devices[dev.0].node;
        self.devices[dev.0].iface = Some(iface);
        self.addr_owner.insert(iface.addr, node);
        trace!(%node, addr = %iface.addr, "分配地址");
    }

    pub fn device(&self, dev: DeviceId) -> &Device {
        &self.devices[dev.0]
    }

    pub fn devices_of(&self, node: NodeId) -> &[DeviceId] {
        self.node_devices
            .get(node.0)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn addresses(&self, node: NodeId) -> Vec<Ipv4Interface> {
        self.devices_of(node)
            .iter()
            .filter_map(|d| self.devices[d.0].iface)
            .collect()
    }

    pub fn owner_of(&self, ip: Ipv4Addr) -> Option<NodeId> {
        self.addr_owner.get(&ip).copied()
    }

    pub fn is_local(&self, node: NodeId, ip: Ipv4Addr) -> bool {
        self.owner_of(ip) == Some(node)
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn link_between(&self, from: NodeId, to: NodeId) -> Option<&Link> {
        self.edges.get(&(from, to)).map(|id| &self.links[id.0])
    }

    /// 修改单向链路的设备队列容量；在仿真开始前调用，已排队的包会被清掉
    pub fn set_queue_limit(&mut self, from: NodeId, to: NodeId, limit: QueueLimit) {
        if let Some(id) = self.edges.get(&(from, to)) {
            let link = &mut self.links[id.0];
            link.queue = Box::new(crate::queue::DropTailQueue::new(limit));
        }
    }

    pub fn set_ecmp_mode(&mut self, mode: EcmpMode) {
        self.routing.set_mode(mode);
    }

    pub fn routing(&self) -> &RoutingTable {
        &self.routing
    }

    /// 基于当前链路计算全局路由
    pub fn populate_routing_tables(&mut self) {
        let n = self.nodes.len();
        let mut adj = vec![Vec::new(); n];
        let mut rev_adj = vec![Vec::new(); n];
        for l in &self.links {
            adj[l.from.0].push(l.to);
            rev_adj[l.to.0].push(l.from);
        }
        self.routing.populate(&adj, &rev_adj);
        info!(nodes = n, links = self.links.len(), "🧭 路由表已生成");
    }

    pub fn next_packet_id(&mut self) -> u64 {
        let id = self.next_pkt_id;
        self.next_pkt_id = self.next_pkt_id.wrapping_add(1);
        id
    }

    /// 为节点分配一个临时端口
    pub fn alloc_ephemeral_port(&mut self, node: NodeId) -> u16 {
        let next = self
            .next_ephemeral
            .entry(node)
            .or_insert(EPHEMERAL_PORT_START);
        let port = *next;
        *next = if *next == u16::MAX {
            EPHEMERAL_PORT_START
        } else {
            *next + 1
        };
        port
    }

    fn egress_link(&self, from: NodeId, pkt: &Packet) -> Option<LinkId> {
        let dst = self.owner_of(*pkt.dst.ip())?;
        let next = self.routing.lookup(from, dst, pkt.flow_hash())?;
        self.edges.get(&(from, next)).copied()
    }

    /// 选择源地址：去往 `dst` 的出接口地址，否则取第一个接口
    pub fn source_addr(&self, node: NodeId, dst: Ipv4Addr) -> Option<Ipv4Addr> {
        let via_route = self.owner_of(dst).and_then(|dst_node| {
            let next = self.routing.lookup(node, dst_node, 0)?;
            let link = self.edges.get(&(node, next))?;
            self.devices[self.links[link.0].from_dev.0].iface
        });
        via_route
            .or_else(|| self.addresses(node).first().copied())
            .map(|i| i.addr)
    }

    /// 本节点发出的新包：经过流监控的源探针后进入发送路径
    #[tracing::instrument(level = "debug", skip(self, pkt, sim), fields(pkt_id = pkt.id))]
    pub fn send_from(&mut self, node: NodeId, mut pkt: Packet, sim: &mut Simulator) {
        let now = sim.now();
        pkt.created_at = now;
        self.stats.sent_pkts += 1;
        if let Some(fm) = &mut self.flowmon {
            fm.report_first_tx(node, &mut pkt, now);
        }
        self.transmit(node, pkt, sim);
    }

    /// 路由器转发
    #[tracing::instrument(level = "debug", skip(self, pkt, sim), fields(pkt_id = pkt.id, ttl = pkt.ttl))]
    pub fn forward(&mut self, node: NodeId, mut pkt: Packet, sim: &mut Simulator) {
        let now = sim.now();
        if pkt.ttl <= 1 {
            self.drop_packet(node, pkt, now, DropReason::TtlExpired);
            return;
        }
        pkt.ttl -= 1;
        self.stats.forwarded_pkts += 1;
        if let Some(fm) = &mut self.flowmon {
            fm.report_forwarding(node, &pkt, now);
        }
        self.transmit(node, pkt, sim);
    }

    fn transmit(&mut self, node: NodeId, pkt: Packet, sim: &mut Simulator) {
        if !self.routing.is_built() {
            warn!("路由表尚未生成，按当前拓扑即时计算");
            self.populate_routing_tables();
        }
        let now = sim.now();
        let Some(link_id) = self.egress_link(node, &pkt) else {
            debug!(%node, dst = %pkt.dst, "无路由");
            self.drop_packet(node, pkt, now, DropReason::NoRoute);
            return;
        };

        if let Some(anim) = &mut self.anim {
            anim.ipv4_tx(node);
        }

        let link = &mut self.links[link_id.0];
        if !link.busy {
            self.start_tx(link_id, pkt, sim);
            return;
        }
        match link.queue.enqueue(pkt) {
            Ok(()) => {
                trace!(?link_id, q_len = link.queue.len(), "入队");
            }
            Err(pkt) => {
                debug!(?link_id, pkt_id = pkt.id, "📉 队列已满，丢包");
                self.stats.queue_drops += 1;
                self.drop_packet(node, pkt, now, DropReason::Queue);
            }
        }
    }

    /// 链路空闲：开始串行化一个包
    fn start_tx(&mut self, link_id: LinkId, pkt: Packet, sim: &mut Simulator) {
        let now = sim.now();
        let link = &mut self.links[link_id.0];
        let bytes = pkt.wire_bytes();
        let depart = now.saturating_add(link.tx_time(bytes));
        let arrive = depart.saturating_add(link.delay);
        link.busy = true;
        link.tx_packets += 1;
        link.tx_bytes += u64::from(bytes);
        let (from, to, delay) = (link.from, link.to, link.delay);

        trace!(?link_id, %now, %depart, %arrive, bytes, "开始发送");
        if let Some(anim) = &mut self.anim {
            anim.packet_tx(&pkt, from, to, now, depart, now.saturating_add(delay), arrive);
        }
        sim.schedule(depart, LinkReady { link_id });
        sim.schedule(arrive, DeliverPacket { to, pkt });
    }

    /// 链路完成一次发送：取下一个排队的包
    pub(crate) fn on_link_ready(&mut self, link_id: LinkId, sim: &mut Simulator) {
        let link = &mut self.links[link_id.0];
        link.busy = false;
        if let Some(pkt) = link.queue.dequeue() {
            self.start_tx(link_id, pkt, sim);
        }
    }

    /// 将数据包交付给节点处理
    #[tracing::instrument(level = "debug", skip(self, pkt, sim), fields(pkt_id = pkt.id, to = %to))]
    pub fn deliver(&mut self, to: NodeId, pkt: Packet, sim: &mut Simulator) -> Option<Delivery> {
        if let Some(anim) = &mut self.anim {
            anim.ipv4_rx(to);
        }
        // 暂时把节点取出来，避免 &mut self 与 &mut node 的重叠借用。
        let mut node = self.nodes[to.0].take().expect("node exists");
        let up = node.on_packet(pkt, sim, self);
        self.nodes[to.0] = Some(node);
        up
    }

    /// 丢包：统计、流监控、动画
    pub(crate) fn drop_packet(&mut self, node: NodeId, pkt: Packet, now: SimTime, reason: DropReason) {
        self.stats.dropped_pkts += 1;
        self.stats.dropped_bytes += u64::from(pkt.ip_bytes());
        if reason.is_ip_level() {
            if let Some(fm) = &mut self.flowmon {
                fm.report_drop(node, &pkt, now, reason);
            }
        }
        if let Some(anim) = &mut self.anim {
            anim.packet_drop(now, &pkt, node, reason);
        }
    }
}
