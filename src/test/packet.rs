use std::net::{Ipv4Addr, SocketAddrV4};

use crate::net::{DEFAULT_TTL, IpProtocol, Packet, TcpSegment, Transport};
use crate::sim::SimTime;

fn sock(last: u8, port: u16) -> SocketAddrV4 {
    SocketAddrV4::new(Ipv4Addr::new(10, 1, 1, last), port)
}

#[test]
fn wire_size_adds_transport_ip_and_ppp_headers() {
    let udp = Packet::new(1, sock(1, 49153), sock(2, 4000), Transport::Udp, 512, SimTime::ZERO);
    assert_eq!(udp.ip_bytes(), 512 + 8 + 20);
    assert_eq!(udp.wire_bytes(), 512 + 8 + 20 + 2);
    assert_eq!(udp.ttl, DEFAULT_TTL);

    let seg = TcpSegment::data(1, 1, 536);
    let tcp = Packet::new(2, sock(1, 49153), sock(2, 50000), Transport::Tcp(seg), 536, SimTime::ZERO);
    assert_eq!(tcp.wire_bytes(), 536 + 20 + 20 + 2);
    assert_eq!(tcp.protocol(), IpProtocol::Tcp);
}

#[test]
fn five_tuple_reflects_addresses_ports_and_protocol() {
    let p = Packet::new(1, sock(1, 49153), sock(2, 4000), Transport::Udp, 10, SimTime::ZERO);
    let t = p.five_tuple();
    assert_eq!(t.src, Ipv4Addr::new(10, 1, 1, 1));
    assert_eq!(t.dst, Ipv4Addr::new(10, 1, 1, 2));
    assert_eq!((t.src_port, t.dst_port), (49153, 4000));
    assert_eq!(t.protocol.number(), 17);
}

#[test]
fn tcp_segment_helpers_set_flags() {
    assert!(TcpSegment::syn(0).flags.syn);
    assert!(!TcpSegment::syn(0).flags.ack);
    let sa = TcpSegment::syn_ack(0, 1);
    assert!(sa.flags.syn && sa.flags.ack);
    assert!(TcpSegment::ack(1, 537).is_pure_ack());
    assert!(!TcpSegment::data(1, 1, 10).is_pure_ack());
    assert!(!sa.is_pure_ack());
}

#[test]
fn describe_lists_header_stack() {
    let seg = TcpSegment::syn(0);
    let p = Packet::new(1, sock(1, 49153), sock(2, 50000), Transport::Tcp(seg), 0, SimTime::ZERO);
    let d = p.describe();
    assert!(d.starts_with("PPP(IP) IPv4("));
    assert!(d.contains("10.1.1.1 > 10.1.1.2"));
    assert!(d.contains("[SYN]"));
    assert!(d.ends_with("Payload(size=0)"));
}
