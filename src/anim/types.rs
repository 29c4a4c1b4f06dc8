use serde::{Deserialize, Serialize};

use crate::mobility::Vector;
use crate::net::{DropReason, NodeKind};

/// 动画事件类型
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnimEventKind {
    /// 拓扑元信息（总是第一条事件）
    Meta {
        nodes: Vec<AnimNodeInfo>,
        links: Vec<AnimLinkInfo>,
    },
    /// 一次链路传输：首比特/末比特的发送与接收时刻
    Tx {
        from: usize,
        to: usize,
        fb_tx_ns: u64,
        lb_tx_ns: u64,
        fb_rx_ns: u64,
        lb_rx_ns: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        meta: Option<String>,
    },
    /// 丢包
    Drop { node: usize, reason: DropReason },
    /// IPv4 L3 计数器采样（累计值）
    Ipv4Counters {
        node: usize,
        tx: u64,
        rx: u64,
        drop: u64,
    },
    /// TCP 拥塞窗口采样
    TcpCwnd {
        conn_id: u64,
        cwnd_bytes: u64,
        ssthresh_bytes: u64,
        inflight_bytes: u64,
    },
    /// TCP 重传超时
    TcpRto { conn_id: u64, seq: u64 },
}

/// packet 的类别（便于上色）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimPacketKind {
    TcpData,
    TcpAck,
    TcpControl,
    Udp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimNodeInfo {
    pub id: usize,
    pub name: String,
    pub kind: NodeKind,
    pub position: Option<Vector>,
    pub ipv4: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimLinkInfo {
    pub from: usize,
    pub to: usize,
    pub from_addr: Option<String>,
    pub to_addr: Option<String>,
    /// 单向链路带宽（bps）
    pub data_rate_bps: u64,
    /// 单向传播时延（ns）
    pub delay_ns: u64,
    /// 设备队列容量描述，例如 "100p"
    pub queue: String,
}

/// 一条可回放的事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimEvent {
    /// 仿真时间（纳秒）
    pub t_ns: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pkt_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pkt_bytes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pkt_kind: Option<AnimPacketKind>,
    #[serde(flatten)]
    pub kind: AnimEventKind,
}

/// 单个节点的 IPv4 L3 计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ipv4Counters {
    pub tx: u64,
    pub rx: u64,
    pub drop: u64,
}
