//! 数据包类型
//!
//! IPv4 数据包：五元组、TTL、传输层头部与载荷长度，以及流监控打上的标签。

use std::net::{Ipv4Addr, SocketAddrV4};

use super::transport::{IPV4_HEADER_BYTES, IpProtocol, PPP_HEADER_BYTES, Transport};
use crate::sim::SimTime;

pub const DEFAULT_TTL: u8 = 64;

/// 流监控给数据包打的标签（流号 + 流内包序号）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlowTag {
    pub flow_id: u32,
    pub packet_id: u32,
}

/// 五元组
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FiveTuple {
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub protocol: IpProtocol,
    pub src_port: u16,
    pub dst_port: u16,
}

/// 网络数据包
#[derive(Debug, Clone)]
pub struct Packet {
    pub id: u64,
    pub src: SocketAddrV4,
    pub dst: SocketAddrV4,
    pub ttl: u8,
    pub transport: Transport,
    pub payload_bytes: u32,
    pub tag: Option<FlowTag>,
    /// 源节点发出的时刻
    pub created_at: SimTime,
}

impl Packet {
    pub fn new(
        id: u64,
        src: SocketAddrV4,
        dst: SocketAddrV4,
        transport: Transport,
        payload_bytes: u32,
        created_at: SimTime,
    ) -> Self {
        Self {
            id,
            src,
            dst,
            ttl: DEFAULT_TTL,
            transport,
            payload_bytes,
            tag: None,
            created_at,
        }
    }

    pub fn protocol(&self) -> IpProtocol {
        self.transport.protocol()
    }

    pub fn five_tuple(&self) -> FiveTuple {
        FiveTuple {
            src: *self.src.ip(),
            dst: *self.dst.ip(),
            protocol: self.protocol(),
            src_port: self.src.port(),
            dst_port: self.dst.port(),
        }
    }

    /// IP 层大小（含 IPv4 与传输层头部）
    pub fn ip_bytes(&self) -> u32 {
        self.payload_bytes
            .saturating_add(self.transport.header_bytes())
            .saturating_add(IPV4_HEADER_BYTES)
    }

    /// 链路上的帧大小（再加 PPP 头）
    pub fn wire_bytes(&self) -> u32 {
        self.ip_bytes().saturating_add(PPP_HEADER_BYTES)
    }

    /// 流哈希（ECMP 用）
    pub fn flow_hash(&self) -> u64 {
        let t = self.five_tuple();
        (u64::from(u32::from(t.src)) << 32 | u64::from(u32::from(t.dst)))
            ^ (u64::from(t.src_port) << 24)
            ^ (u64::from(t.dst_port) << 8)
            ^ u64::from(t.protocol.number())
    }

    /// 动画包元数据中的头部描述
    pub fn describe(&self) -> String {
        let l4 = match &self.transport {
            Transport::Udp => format!("UDP({} > {})", self.src.port(), self.dst.port()),
            Transport::Tcp(seg) => format!(
                "TCP({} > {} {})",
                self.src.port(),
                self.dst.port(),
                seg.describe()
            ),
        };
        format!(
            "PPP(IP) IPv4(ttl {} proto {} len {} {} > {}) {} Payload(size={})",
            self.ttl,
            self.protocol().number(),
            self.ip_bytes(),
            self.src.ip(),
            self.dst.ip(),
            l4,
            self.payload_bytes
        )
    }
}
