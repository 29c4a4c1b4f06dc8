//! 统计信息与本地交付记录

use std::net::SocketAddrV4;

use serde::{Deserialize, Serialize};

use super::id::NodeId;
use super::transport::IpProtocol;
use crate::sim::SimTime;

/// 丢包原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// 设备发送队列已满
    Queue,
    /// 没有到目的地址的路由
    NoRoute,
    /// TTL 减到 0
    TtlExpired,
    /// 目的端口上没有 socket
    NoSocket,
}

impl DropReason {
    /// 是否发生在 IP 层（流监控只统计这一类）
    pub fn is_ip_level(self) -> bool {
        !matches!(self, DropReason::NoSocket)
    }
}

/// 网络统计信息
#[derive(Debug, Default, Clone, Serialize)]
pub struct Stats {
    pub sent_pkts: u64,
    pub forwarded_pkts: u64,
    pub delivered_pkts: u64,
    pub delivered_bytes: u64,
    pub dropped_pkts: u64,
    pub dropped_bytes: u64,
    pub queue_drops: u64,
}

/// 交给应用层的数据（UDP 数据报或 TCP 按序到达的字节）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub node: NodeId,
    pub protocol: IpProtocol,
    pub local: SocketAddrV4,
    pub remote: SocketAddrV4,
    pub bytes: u64,
    pub at: SimTime,
}
