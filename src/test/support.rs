//! 测试用小拓扑：h0 <-> r <-> h1

use std::net::{Ipv4Addr, SocketAddrV4};

use crate::net::{Ipv4Allocator, NetWorld, NodeId, P2pConfig};
use crate::sim::Simulator;

pub(super) struct Line {
    pub sim: Simulator,
    pub world: NetWorld,
    pub h0: NodeId,
    pub r: NodeId,
    pub h1: NodeId,
    pub h0_addr: Ipv4Addr,
    pub h1_addr: Ipv4Addr,
}

impl Line {
    pub fn h0_sock(&self, port: u16) -> SocketAddrV4 {
        SocketAddrV4::new(self.h0_addr, port)
    }

    pub fn h1_sock(&self, port: u16) -> SocketAddrV4 {
        SocketAddrV4::new(self.h1_addr, port)
    }
}

/// 两段链路参数可以不同（第二段常用作瓶颈）
pub(super) fn line(first: P2pConfig, second: P2pConfig) -> Line {
    let mut world = NetWorld::default();
    let net = &mut world.net;
    let h0 = net.add_host("h0");
    let r = net.add_router("r");
    let h1 = net.add_host("h1");

    let mask = Ipv4Addr::new(255, 255, 255, 0);
    let mut a = Ipv4Allocator::new(Ipv4Addr::new(10, 0, 1, 0), mask).expect("mask");
    let (d0, d1) = net.install_p2p(h0, r, &first);
    let h0_if = a.next_addr().expect("addr");
    net.assign(d0, h0_if);
    net.assign(d1, a.next_addr().expect("addr"));

    let mut b = Ipv4Allocator::new(Ipv4Addr::new(10, 0, 2, 0), mask).expect("mask");
    let (d2, d3) = net.install_p2p(r, h1, &second);
    net.assign(d2, b.next_addr().expect("addr"));
    let h1_if = b.next_addr().expect("addr");
    net.assign(d3, h1_if);

    net.populate_routing_tables();
    Line {
        sim: Simulator::default(),
        world,
        h0,
        r,
        h1,
        h0_addr: h0_if.addr,
        h1_addr: h1_if.addr,
    }
}

/// 每个测试独立的临时目录
pub(super) fn unique_temp_dir(prefix: &str) -> std::path::PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "dumbbell-sim-{prefix}-{}-{nanos}",
        std::process::id()
    ));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}
