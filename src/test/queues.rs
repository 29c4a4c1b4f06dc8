use std::net::{Ipv4Addr, SocketAddrV4};

use crate::net::{Packet, Transport};
use crate::queue::{DEFAULT_QUEUE_PACKETS, DropTailQueue, PacketQueue, QueueLimit};
use crate::sim::SimTime;

fn udp_pkt(id: u64, payload: u32) -> Packet {
    Packet::new(
        id,
        SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 1), 1000),
        SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 2), 2000),
        Transport::Udp,
        payload,
        SimTime::ZERO,
    )
}

#[test]
fn default_limit_is_one_hundred_packets() {
    assert_eq!(QueueLimit::default(), QueueLimit::Packets(DEFAULT_QUEUE_PACKETS));
    assert_eq!(DEFAULT_QUEUE_PACKETS, 100);
}

#[test]
fn droptail_packet_limit_drops_arrivals_when_full_and_preserves_order() {
    let mut q = DropTailQueue::new(QueueLimit::Packets(2));
    assert!(q.is_empty());
    assert!(q.enqueue(udp_pkt(1, 100)).is_ok());
    assert!(q.enqueue(udp_pkt(2, 100)).is_ok());

    let dropped = q.enqueue(udp_pkt(3, 1)).expect_err("should drop");
    assert_eq!(dropped.id, 3);
    assert_eq!(q.len(), 2);

    assert_eq!(q.dequeue().expect("pkt").id, 1);
    assert!(q.enqueue(udp_pkt(4, 1)).is_ok());
    assert_eq!(q.dequeue().expect("pkt").id, 2);
    assert_eq!(q.dequeue().expect("pkt").id, 4);
    assert!(q.dequeue().is_none());
}

#[test]
fn droptail_byte_limit_counts_wire_bytes() {
    // 100B 载荷 + UDP 8 + IPv4 20 + PPP 2 = 130B
    let mut q = DropTailQueue::new(QueueLimit::Bytes(260));
    assert!(q.enqueue(udp_pkt(1, 100)).is_ok());
    assert_eq!(q.bytes(), 130);
    assert!(q.enqueue(udp_pkt(2, 100)).is_ok());
    assert_eq!(q.bytes(), 260);
    assert!(q.enqueue(udp_pkt(3, 1)).is_err());

    q.dequeue();
    assert_eq!(q.bytes(), 130);
    assert_eq!(q.limit(), QueueLimit::Bytes(260));
}
