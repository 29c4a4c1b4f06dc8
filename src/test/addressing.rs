use std::net::Ipv4Addr;

use crate::error::ConfigError;
use crate::net::{Ipv4Allocator, Ipv4Interface};

const MASK24: Ipv4Addr = Ipv4Addr::new(255, 255, 255, 0);

#[test]
fn allocator_hands_out_consecutive_hosts_from_dot_one() {
    let mut a = Ipv4Allocator::new(Ipv4Addr::new(10, 1, 1, 0), MASK24).unwrap();
    let ifs = a.assign(2).unwrap();
    assert_eq!(ifs[0].addr, Ipv4Addr::new(10, 1, 1, 1));
    assert_eq!(ifs[1].addr, Ipv4Addr::new(10, 1, 1, 2));
    assert_eq!(ifs[0].mask, MASK24);
}

#[test]
fn new_network_advances_subnet_and_resets_host_counter() {
    let mut a = Ipv4Allocator::new(Ipv4Addr::new(10, 1, 1, 0), MASK24).unwrap();
    a.next_addr().unwrap();
    assert_eq!(a.new_network().unwrap(), Ipv4Addr::new(10, 1, 2, 0));
    assert_eq!(a.next_addr().unwrap().addr, Ipv4Addr::new(10, 1, 2, 1));
}

#[test]
fn base_address_is_masked_to_its_network() {
    let a = Ipv4Allocator::new(Ipv4Addr::new(10, 3, 1, 77), MASK24).unwrap();
    assert_eq!(a.network(), Ipv4Addr::new(10, 3, 1, 0));
}

#[test]
fn non_contiguous_mask_is_rejected() {
    let bad = Ipv4Addr::new(255, 0, 255, 0);
    assert_eq!(
        Ipv4Allocator::new(Ipv4Addr::new(10, 0, 0, 0), bad).unwrap_err(),
        ConfigError::BadMask(bad)
    );
}

#[test]
fn small_subnet_runs_out_of_hosts() {
    // /30：只有 .1 和 .2 可用
    let mut a =
        Ipv4Allocator::new(Ipv4Addr::new(192, 168, 0, 0), Ipv4Addr::new(255, 255, 255, 252))
            .unwrap();
    a.assign(2).unwrap();
    assert!(matches!(
        a.next_addr(),
        Err(ConfigError::HostsExhausted { .. })
    ));
}

#[test]
fn last_network_cannot_advance() {
    let mut a = Ipv4Allocator::new(Ipv4Addr::new(255, 255, 255, 0), MASK24).unwrap();
    assert!(matches!(
        a.new_network(),
        Err(ConfigError::NetworksExhausted(_))
    ));
}

#[test]
fn interface_reports_network_prefix_and_membership() {
    let i = Ipv4Interface::new(Ipv4Addr::new(10, 2, 3, 1), MASK24);
    assert_eq!(i.network(), Ipv4Addr::new(10, 2, 3, 0));
    assert_eq!(i.prefix_len(), 24);
    assert!(i.contains(Ipv4Addr::new(10, 2, 3, 200)));
    assert!(!i.contains(Ipv4Addr::new(10, 2, 4, 1)));
}
