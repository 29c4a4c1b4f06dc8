//! 网络模拟模块
//!
//! 节点、点对点链路、IPv4 地址与路由、数据包及其转发。

mod addr;
mod api;
mod deliver_packet;
mod id;
mod link;
mod link_ready;
mod net_world;
mod network;
mod network_anim;
mod network_proto;
mod node;
mod packet;
mod routing;
mod stats;
mod transport;
mod units;

pub use addr::{Ipv4Allocator, Ipv4Interface};
pub use api::NetApi;
pub use deliver_packet::DeliverPacket;
pub use id::{DeviceId, LinkId, NodeId};
pub use link::{Device, Link, P2pConfig};
pub use link_ready::LinkReady;
pub use net_world::NetWorld;
pub use network::{EPHEMERAL_PORT_START, Network};
pub use node::{Host, Node, NodeKind, Router};
pub use packet::{DEFAULT_TTL, FiveTuple, FlowTag, Packet};
pub use routing::{EcmpMode, RoutingTable};
pub use stats::{Delivery, DropReason, Stats};
pub use transport::{
    IPV4_HEADER_BYTES, IpProtocol, PPP_HEADER_BYTES, TCP_HEADER_BYTES, TcpFlags, TcpSegment,
    Transport, UDP_HEADER_BYTES,
};
pub use units::DataRate;
