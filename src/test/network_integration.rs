use std::net::{Ipv4Addr, SocketAddrV4};

use super::support::line;
use crate::anim::{AnimEventKind, AnimationInterface};
use crate::flowmon::{FlowMonitor, FlowMonitorConfig};
use crate::net::{DataRate, DropReason, NetWorld, NodeId, P2pConfig, Packet, Transport};
use crate::queue::QueueLimit;
use crate::sim::{SimTime, Simulator};

fn p2p(rate: &str, delay: SimTime, queue: QueueLimit) -> P2pConfig {
    P2pConfig {
        data_rate: rate.parse::<DataRate>().expect("rate"),
        delay,
        queue,
    }
}

fn send_udp(world: &mut NetWorld, sim: &mut Simulator, from: NodeId, src: SocketAddrV4, dst: SocketAddrV4, payload: u32) {
    let mut udp = std::mem::take(&mut world.net.udp);
    udp.send_to(&mut world.net, from, src, dst, payload, sim);
    world.net.udp = udp;
}

fn drops(world: &NetWorld) -> Vec<(usize, DropReason)> {
    world
        .net
        .anim
        .as_ref()
        .expect("anim enabled")
        .events()
        .iter()
        .filter_map(|e| match e.kind {
            AnimEventKind::Drop { node, reason } => Some((node, reason)),
            _ => None,
        })
        .collect()
}

#[test]
fn udp_datagram_arrival_time_is_serialisation_plus_propagation_per_hop() {
    let cfg = p2p("5Mbps", SimTime::from_millis(1), QueueLimit::default());
    let mut l = line(cfg, cfg);
    l.world.net.flowmon = Some(FlowMonitor::new(FlowMonitorConfig::default()));
    l.world.net.udp.bind(l.h1, 4000).unwrap();

    let (src, dst) = (l.h0_sock(49153), l.h1_sock(4000));
    send_udp(&mut l.world, &mut l.sim, l.h0, src, dst, 512);
    l.sim.run(&mut l.world);

    // 542B 帧 @ 5Mbps = 867.2us，两跳，每跳 1ms 传播
    let expected = SimTime(2 * (867_200 + 1_000_000));
    let fm = l.world.net.flowmon.as_ref().unwrap();
    let flow = fm.flow(1).expect("flow 1");
    assert_eq!(flow.rx_packets, 1);
    assert_eq!(flow.time_last_rx_packet, Some(expected));
    assert_eq!(flow.delay_sum, expected);
    assert_eq!(flow.times_forwarded, 1);
    assert_eq!(l.world.net.stats.delivered_pkts, 1);
    assert_eq!(l.world.net.stats.forwarded_pkts, 1);
}

#[test]
fn back_to_back_packets_are_spaced_by_serialisation_time() {
    let cfg = p2p("5Mbps", SimTime::from_millis(1), QueueLimit::default());
    let mut l = line(cfg, cfg);
    l.world.net.anim = Some(AnimationInterface::new("unused.json"));
    l.world.net.udp.bind(l.h1, 4000).unwrap();

    let (src, dst) = (l.h0_sock(49153), l.h1_sock(4000));
    send_udp(&mut l.world, &mut l.sim, l.h0, src, dst, 512);
    send_udp(&mut l.world, &mut l.sim, l.h0, src, dst, 512);
    l.sim.run(&mut l.world);

    let first_hop: Vec<(u64, u64)> = l
        .world
        .net
        .anim
        .as_ref()
        .unwrap()
        .events()
        .iter()
        .filter_map(|e| match e.kind {
            AnimEventKind::Tx { from: 0, fb_tx_ns, lb_tx_ns, .. } => Some((fb_tx_ns, lb_tx_ns)),
            _ => None,
        })
        .collect();
    assert_eq!(first_hop, vec![(0, 867_200), (867_200, 1_734_400)]);
}

#[test]
fn full_device_queue_drops_arrivals() {
    let fast = p2p("100Mbps", SimTime::from_millis(1), QueueLimit::default());
    let slow = p2p("1Mbps", SimTime::from_millis(1), QueueLimit::Packets(2));
    let mut l = line(fast, slow);
    l.world.net.anim = Some(AnimationInterface::new("unused.json"));
    l.world.net.udp.bind(l.h1, 4000).unwrap();

    let (src, dst) = (l.h0_sock(49153), l.h1_sock(4000));
    for _ in 0..10 {
        send_udp(&mut l.world, &mut l.sim, l.h0, src, dst, 512);
    }
    l.sim.run(&mut l.world);

    let stats = &l.world.net.stats;
    assert_eq!(stats.delivered_pkts, 3);
    assert_eq!(stats.queue_drops, 7);
    let d = drops(&l.world);
    assert_eq!(d.len(), 7);
    assert!(d.iter().all(|&(node, r)| node == l.r.0 && r == DropReason::Queue));
}

#[test]
fn queue_limit_can_be_tightened_per_direction() {
    let fast = p2p("100Mbps", SimTime::from_millis(1), QueueLimit::default());
    let slow = p2p("1Mbps", SimTime::from_millis(1), QueueLimit::default());
    let mut l = line(fast, slow);
    l.world.net.set_queue_limit(l.r, l.h1, QueueLimit::Packets(2));
    let net = &l.world.net;
    assert_eq!(net.link_between(l.r, l.h1).unwrap().queue.limit(), QueueLimit::Packets(2));
    assert_eq!(net.link_between(l.h1, l.r).unwrap().queue.limit(), QueueLimit::default());

    l.world.net.udp.bind(l.h1, 4000).unwrap();
    let (src, dst) = (l.h0_sock(49153), l.h1_sock(4000));
    for _ in 0..10 {
        send_udp(&mut l.world, &mut l.sim, l.h0, src, dst, 512);
    }
    l.sim.run(&mut l.world);

    assert_eq!(l.world.net.stats.delivered_pkts, 3);
    assert_eq!(l.world.net.stats.queue_drops, 7);
}

#[test]
fn unknown_destination_is_dropped_at_the_sender() {
    let cfg = P2pConfig::default();
    let mut l = line(cfg, cfg);
    l.world.net.anim = Some(AnimationInterface::new("unused.json"));

    let src = l.h0_sock(49153);
    let dst = SocketAddrV4::new(Ipv4Addr::new(10, 9, 9, 9), 4000);
    send_udp(&mut l.world, &mut l.sim, l.h0, src, dst, 100);
    l.sim.run(&mut l.world);

    assert_eq!(drops(&l.world), vec![(l.h0.0, DropReason::NoRoute)]);
    assert_eq!(l.world.net.stats.sent_pkts, 1);
    assert_eq!(l.world.net.stats.delivered_pkts, 0);
}

#[test]
fn datagram_to_unbound_port_is_dropped_at_destination() {
    let cfg = P2pConfig::default();
    let mut l = line(cfg, cfg);
    l.world.net.anim = Some(AnimationInterface::new("unused.json"));
    l.world.net.flowmon = Some(FlowMonitor::new(FlowMonitorConfig::default()));

    let (src, dst) = (l.h0_sock(49153), l.h1_sock(9));
    send_udp(&mut l.world, &mut l.sim, l.h0, src, dst, 100);
    l.sim.run(&mut l.world);

    assert_eq!(drops(&l.world), vec![(l.h1.0, DropReason::NoSocket)]);
    // 包已到达目的 IP 层，流监控视为接收成功
    let flow = l.world.net.flowmon.as_ref().unwrap().flow(1).unwrap();
    assert_eq!(flow.rx_packets, 1);
    assert!(flow.packets_dropped.is_empty());
}

#[test]
fn ttl_expires_at_router() {
    let cfg = P2pConfig::default();
    let mut l = line(cfg, cfg);
    l.world.net.anim = Some(AnimationInterface::new("unused.json"));
    l.world.net.udp.bind(l.h1, 4000).unwrap();

    let id = l.world.net.next_packet_id();
    let mut pkt = Packet::new(id, l.h0_sock(49153), l.h1_sock(4000), Transport::Udp, 64, SimTime::ZERO);
    pkt.ttl = 1;
    l.world.net.send_from(l.h0, pkt, &mut l.sim);
    l.sim.run(&mut l.world);

    assert_eq!(drops(&l.world), vec![(l.r.0, DropReason::TtlExpired)]);
}

#[test]
fn routing_is_computed_lazily_when_not_populated() {
    let mut world = NetWorld::default();
    let mut sim = Simulator::default();
    let a = world.net.add_host("a");
    let b = world.net.add_host("b");
    let (da, db) = world.net.install_p2p(a, b, &P2pConfig::default());
    let a_ip = Ipv4Addr::new(10, 0, 0, 1);
    let b_ip = Ipv4Addr::new(10, 0, 0, 2);
    let mask = Ipv4Addr::new(255, 255, 255, 0);
    world.net.assign(da, crate::net::Ipv4Interface::new(a_ip, mask));
    world.net.assign(db, crate::net::Ipv4Interface::new(b_ip, mask));
    world.net.udp.bind(b, 7).unwrap();

    assert!(!world.net.routing().is_built());
    send_udp(&mut world, &mut sim, a, SocketAddrV4::new(a_ip, 1), SocketAddrV4::new(b_ip, 7), 10);
    sim.run(&mut world);

    assert!(world.net.routing().is_built());
    assert_eq!(world.net.stats.delivered_pkts, 1);
}

#[test]
fn source_address_follows_the_egress_interface() {
    let cfg = P2pConfig::default();
    let l = line(cfg, cfg);
    assert_eq!(l.world.net.source_addr(l.h0, l.h1_addr), Some(l.h0_addr));
    assert_eq!(
        l.world.net.source_addr(l.r, l.h1_addr),
        Some(Ipv4Addr::new(10, 0, 2, 1))
    );
}

#[test]
fn ephemeral_ports_are_per_node_and_sequential() {
    let cfg = P2pConfig::default();
    let mut l = line(cfg, cfg);
    assert_eq!(l.world.net.alloc_ephemeral_port(l.h0), 49153);
    assert_eq!(l.world.net.alloc_ephemeral_port(l.h0), 49154);
    assert_eq!(l.world.net.alloc_ephemeral_port(l.h1), 49153);
}
