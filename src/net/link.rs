//! 点对点链路
//!
//! 一条双工点对点链路由两个单向信道组成，每个方向一个发送队列。

use serde::{Deserialize, Serialize};

use super::addr::Ipv4Interface;
use super::id::{DeviceId, LinkId, NodeId};
use super::units::DataRate;
use crate::queue::{DropTailQueue, PacketQueue, QueueLimit};
use crate::sim::SimTime;

/// 点对点链路参数（设备速率、信道时延、设备队列）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct P2pConfig {
    pub data_rate: DataRate,
    pub delay: SimTime,
    pub queue: QueueLimit,
}

impl Default for P2pConfig {
    fn default() -> Self {
        Self {
            data_rate: DataRate::from_mbps(5),
            delay: SimTime::from_millis(1),
            queue: QueueLimit::default(),
        }
    }
}

/// 网络设备：挂在节点上，一收一发两个单向信道
#[derive(Debug, Clone)]
pub struct Device {
    pub node: NodeId,
    pub peer: NodeId,
    pub tx_link: LinkId,
    pub rx_link: LinkId,
    pub iface: Option<Ipv4Interface>,
}

/// 单向信道
#[derive(Debug)]
pub struct Link {
    pub from: NodeId,
    pub to: NodeId,
    pub from_dev: DeviceId,
    pub to_dev: DeviceId,
    pub rate: DataRate,
    pub delay: SimTime,
    /// 是否正在串行化一个 packet
    pub busy: bool,
    pub queue: Box<dyn PacketQueue>,
    pub tx_packets: u64,
    pub tx_bytes: u64,
}

impl Link {
    pub fn new(
        from: NodeId,
        to: NodeId,
        from_dev: DeviceId,
        to_dev: DeviceId,
        cfg: &P2pConfig,
    ) -> Self {
        Self {
            from,
            to,
            from_dev,
            to_dev,
            rate: cfg.data_rate,
            delay: cfg.delay,
            busy: false,
            queue: Box::new(DropTailQueue::new(cfg.queue)),
            tx_packets: 0,
            tx_bytes: 0,
        }
    }

    /// 计算传输指定字节数所需的时间
    pub(crate) fn tx_time(&self, bytes: u32) -> SimTime {
        self.rate.tx_time(bytes)
    }
}
