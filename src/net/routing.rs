//! 全局路由（含可选 ECMP）
//!
//! 在当前链路图上按最短跳数为每个 (from, dst) 预计算所有等价下一跳，
//! 相当于每条链路 metric 为 1 的全局路由。目的 IP 到节点的映射由 `Network` 维护。

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use super::id::NodeId;

/// 等价路径的选择方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EcmpMode {
    /// 总是选第一个候选（确定性，默认）
    #[default]
    First,
    /// 按五元组哈希选择，同一条流始终走同一路径
    FlowHash,
}

#[derive(Debug, Default, Clone)]
pub struct RoutingTable {
    built: bool,
    /// (from, dst) -> 多个等价最短路径下一跳
    next_hops: HashMap<(NodeId, NodeId), Vec<NodeId>>,
    mode: EcmpMode,
}

impl RoutingTable {
    pub fn new(mode: EcmpMode) -> Self {
        Self {
            built: false,
            next_hops: HashMap::new(),
            mode,
        }
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    pub fn mode(&self) -> EcmpMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: EcmpMode) {
        self.mode = mode;
    }

    /// 根据拓扑重新计算路由表。
    ///
    /// `adj[from]` 为从 `from` 出发的所有出边邻居；
    /// `rev_adj[to]` 为所有能到达 `to` 的前驱节点集合。
    pub fn populate(&mut self, adj: &[Vec<NodeId>], rev_adj: &[Vec<NodeId>]) {
        let n = adj.len();
        self.next_hops.clear();

        // 对每个 dst 在反向图上做 BFS 得到 dist[*]，
        // 再对每个 from 选出 dist[next] = dist[from] - 1 的邻居。
        let mut dist: Vec<u32> = vec![u32::MAX; n];
        let mut q: VecDeque<usize> = VecDeque::new();

        for dst_idx in 0..n {
            dist.fill(u32::MAX);
            q.clear();
            dist[dst_idx] = 0;
            q.push_back(dst_idx);

            while let Some(v) = q.pop_front() {
                let dv = dist[v];
                for &pred in &rev_adj[v] {
                    if dist[pred.0] == u32::MAX {
                        dist[pred.0] = dv + 1;
                        q.push_back(pred.0);
                    }
                }
            }

            for from_idx in 0..n {
                let df = dist[from_idx];
                if from_idx == dst_idx || df == u32::MAX {
                    continue;
                }
                let cands: Vec<NodeId> = adj[from_idx]
                    .iter()
                    .copied()
                    .filter(|nh| dist[nh.0] == df - 1)
                    .collect();
                if !cands.is_empty() {
                    self.next_hops.insert((NodeId(from_idx), NodeId(dst_idx)), cands);
                }
            }
        }

        self.built = true;
    }

    /// 获取 (from, dst) 的等价下一跳候选集合。
    pub fn next_hops(&self, from: NodeId, dst: NodeId) -> Option<&[NodeId]> {
        self.next_hops.get(&(from, dst)).map(|v| v.as_slice())
    }

    /// 选择下一跳；`flow_key` 仅在 `FlowHash` 模式下使用。
    pub fn lookup(&self, from: NodeId, dst: NodeId, flow_key: u64) -> Option<NodeId> {
        let cands = self.next_hops(from, dst)?;
        let idx = match self.mode {
            EcmpMode::First => 0,
            EcmpMode::FlowHash => {
                let h = mix64(
                    flow_key ^ (from.0 as u64).wrapping_mul(0x9E3779B97F4A7C15) ^ (dst.0 as u64),
                );
                (h as usize) % cands.len()
            }
        };
        cands.get(idx).copied()
    }
}

/// splitmix64
fn mix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}
