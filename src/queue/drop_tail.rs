//! DropTail（尾丢弃）队列
//!
//! 当队列容量不足时，直接丢弃新到达的 packet。

use std::collections::VecDeque;

use crate::net::Packet;

use super::{PacketQueue, QueueLimit};

#[derive(Debug)]
pub struct DropTailQueue {
    limit: QueueLimit,
    cur_bytes: u64,
    q: VecDeque<Packet>,
}

impl DropTailQueue {
    pub fn new(limit: QueueLimit) -> Self {
        Self {
            limit,
            cur_bytes: 0,
            q: VecDeque::new(),
        }
    }

    fn would_overflow(&self, pkt: &Packet) -> bool {
        match self.limit {
            QueueLimit::Packets(max) => self.q.len() >= max as usize,
            QueueLimit::Bytes(max) => {
                self.cur_bytes.saturating_add(u64::from(pkt.wire_bytes())) > max
            }
        }
    }
}

impl PacketQueue for DropTailQueue {
    fn enqueue(&mut self, pkt: Packet) -> Result<(), Packet> {
        if self.would_overflow(&pkt) {
            return Err(pkt);
        }
        self.cur_bytes = self.cur_bytes.saturating_add(u64::from(pkt.wire_bytes()));
        self.q.push_back(pkt);
        Ok(())
    }

    fn dequeue(&mut self) -> Option<Packet> {
        let pkt = self.q.pop_front()?;
        self.cur_bytes = self.cur_bytes.saturating_sub(u64::from(pkt.wire_bytes()));
        Some(pkt)
    }

    fn len(&self) -> usize {
        self.q.len()
    }

    fn bytes(&self) -> u64 {
        self.cur_bytes
    }

    fn limit(&self) -> QueueLimit {
        self.limit
    }
}
