use std::collections::HashSet;

use crate::net::{EcmpMode, NodeId, RoutingTable};

fn build_rev_adj(adj: &[Vec<NodeId>]) -> Vec<Vec<NodeId>> {
    let mut rev = vec![Vec::new(); adj.len()];
    for (from, nbrs) in adj.iter().enumerate() {
        for &to in nbrs {
            rev[to.0].push(NodeId(from));
        }
    }
    rev
}

/// Diamond:
/// 0 -> 1 -> 3
///  \-> 2 ->/
fn diamond() -> Vec<Vec<NodeId>> {
    vec![
        vec![NodeId(1), NodeId(2)],
        vec![NodeId(3)],
        vec![NodeId(3)],
        vec![],
    ]
}

#[test]
fn routing_table_builds_next_hops_for_shortest_paths() {
    let adj = diamond();
    let rev_adj = build_rev_adj(&adj);

    let mut rt = RoutingTable::new(EcmpMode::First);
    assert!(!rt.is_built());
    rt.populate(&adj, &rev_adj);
    assert!(rt.is_built());

    let nh_03: HashSet<NodeId> = rt
        .next_hops(NodeId(0), NodeId(3))
        .expect("next_hops(0,3)")
        .iter()
        .copied()
        .collect();
    assert_eq!(nh_03, HashSet::from([NodeId(1), NodeId(2)]));

    assert_eq!(rt.next_hops(NodeId(0), NodeId(1)).unwrap(), &[NodeId(1)]);
    assert_eq!(rt.next_hops(NodeId(1), NodeId(3)).unwrap(), &[NodeId(3)]);

    assert!(rt.next_hops(NodeId(3), NodeId(0)).is_none());
    assert!(rt.next_hops(NodeId(0), NodeId(0)).is_none());
}

#[test]
fn first_mode_always_picks_first_candidate() {
    let adj = diamond();
    let mut rt = RoutingTable::new(EcmpMode::First);
    rt.populate(&adj, &build_rev_adj(&adj));
    for key in 0..32 {
        assert_eq!(rt.lookup(NodeId(0), NodeId(3), key), Some(NodeId(1)));
    }
}

#[test]
fn flow_hash_mode_is_stable_per_key_and_spreads_keys() {
    let adj = diamond();
    let mut rt = RoutingTable::new(EcmpMode::FlowHash);
    rt.populate(&adj, &build_rev_adj(&adj));

    let mut seen = HashSet::new();
    for key in 0..64u64 {
        let a = rt.lookup(NodeId(0), NodeId(3), key).unwrap();
        let b = rt.lookup(NodeId(0), NodeId(3), key).unwrap();
        assert_eq!(a, b);
        assert!(a == NodeId(1) || a == NodeId(2));
        seen.insert(a);
    }
    assert_eq!(seen.len(), 2);
}

#[test]
fn repopulate_reflects_topology_changes() {
    let mut adj = diamond();
    let mut rt = RoutingTable::new(EcmpMode::First);
    rt.populate(&adj, &build_rev_adj(&adj));

    adj[0] = vec![NodeId(2)];
    rt.populate(&adj, &build_rev_adj(&adj));
    assert_eq!(rt.next_hops(NodeId(0), NodeId(3)).unwrap(), &[NodeId(2)]);
    assert!(rt.next_hops(NodeId(0), NodeId(1)).is_none());
}
