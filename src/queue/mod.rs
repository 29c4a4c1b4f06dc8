//! 队列策略（Queue disciplines）
//!
//! 点对点设备上的发送队列。目前只有 DropTail。

use serde::{Deserialize, Serialize};

use crate::net::Packet;

mod drop_tail;

pub use drop_tail::DropTailQueue;

/// 设备队列的默认长度（包数）
pub const DEFAULT_QUEUE_PACKETS: u32 = 100;

/// 队列容量，按包数或字节数计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueLimit {
    Packets(u32),
    Bytes(u64),
}

impl Default for QueueLimit {
    fn default() -> Self {
        QueueLimit::Packets(DEFAULT_QUEUE_PACKETS)
    }
}

/// Packet 队列抽象
pub trait PacketQueue: std::fmt::Debug + Send {
    /// 入队：成功返回 Ok；若被丢弃则返回 Err(pkt)
    fn enqueue(&mut self, pkt: Packet) -> Result<(), Packet>;
    /// 出队：按队列策略返回下一个 packet
    fn dequeue(&mut self) -> Option<Packet>;

    fn len(&self) -> usize;
    fn bytes(&self) -> u64;
    fn limit(&self) -> QueueLimit;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
