//! Dumbbell 拓扑构建
//!
//! ```text
//!  left[0] ─┐                  ┌─ right[0]
//!  left[1] ─┼─ router[0] ── router[1] ─┼─ right[1]
//!  left[2] ─┘                  └─ right[2]
//! ```
//!
//! 节点按 左叶子、两个路由器、右叶子 的顺序创建。地址：路由器之间的链路
//! 用 `router_base`，左/右第 i 个叶子链路各占 `left_base` / `right_base`
//! 之后的第 i 个子网，叶子取 `.1`，路由器取 `.2`。

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;
use crate::net::{Ipv4Allocator, Network, NodeId, P2pConfig};

/// Dumbbell 拓扑配置选项
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DumbbellConfig {
    pub left_leaves: usize,
    pub right_leaves: usize,
    /// 叶子 <-> 路由器
    pub leaf_link: P2pConfig,
    /// 路由器 <-> 路由器（瓶颈）
    pub bottleneck: P2pConfig,
    pub left_base: Ipv4Addr,
    pub right_base: Ipv4Addr,
    pub router_base: Ipv4Addr,
    pub mask: Ipv4Addr,
}

impl Default for DumbbellConfig {
    fn default() -> Self {
        Self {
            left_leaves: 3,
            right_leaves: 3,
            leaf_link: P2pConfig::default(),
            bottleneck: P2pConfig::default(),
            left_base: Ipv4Addr::new(10, 1, 1, 0),
            right_base: Ipv4Addr::new(10, 2, 1, 0),
            router_base: Ipv4Addr::new(10, 3, 1, 0),
            mask: Ipv4Addr::new(255, 255, 255, 0),
        }
    }
}

/// 已构建的 dumbbell：节点与各叶子链路两端的地址
#[derive(Debug, Clone)]
pub struct Dumbbell {
    left: Vec<NodeId>,
    right: Vec<NodeId>,
    routers: [NodeId; 2],
    left_addrs: Vec<Ipv4Addr>,
    right_addrs: Vec<Ipv4Addr>,
    router_addrs: [Ipv4Addr; 2],
    left_router_addrs: Vec<Ipv4Addr>,
    right_router_addrs: Vec<Ipv4Addr>,
}

impl Dumbbell {
    pub fn build(net: &mut Network, cfg: &DumbbellConfig) -> Result<Self, ConfigError> {
        if cfg.left_leaves == 0 || cfg.right_leaves == 0 {
            return Err(ConfigError::EmptySide);
        }
        // 地址池先校验，避免建了一半节点才失败
        let mut router_ip = Ipv4Allocator::new(cfg.router_base, cfg.mask)?;
        let mut left_ip = Ipv4Allocator::new(cfg.left_base, cfg.mask)?;
        let mut right_ip = Ipv4Allocator::new(cfg.right_base, cfg.mask)?;

        let left: Vec<NodeId> = (0..cfg.left_leaves)
            .map(|i| net.add_host(format!("left{i}")))
            .collect();
        let routers = [net.add_router("router0"), net.add_router("router1")];
        let right: Vec<NodeId> = (0..cfg.right_leaves)
            .map(|i| net.add_host(format!("right{i}")))
            .collect();

        let (r0_dev, r1_dev) = net.install_p2p(routers[0], routers[1], &cfg.bottleneck);
        let r0_if = router_ip.next_addr()?;
        let r1_if = router_ip.next_addr()?;
        net.assign(r0_dev, r0_if);
        net.assign(r1_dev, r1_if);

        let (left_addrs, left_router_addrs) = Self::wire_side(net, &left, routers[0], &cfg.leaf_link, &mut left_ip)?;
        let (right_addrs, right_router_addrs) = Self::wire_side(net, &right, routers[1], &cfg.leaf_link, &mut right_ip)?;

        info!(
            left = cfg.left_leaves,
            right = cfg.right_leaves,
            bottleneck = %cfg.bottleneck.data_rate,
            "🏋️ dumbbell 拓扑已构建"
        );
        Ok(Self {
            left,
            right,
            routers,
            left_addrs,
            right_addrs,
            router_addrs: [r0_if.addr, r1_if.addr],
            left_router_addrs,
            right_router_addrs,
        })
    }

    /// 每个叶子一条链路、一个子网；返回 (叶子地址, 路由器侧地址)
    fn wire_side(
        net: &mut Network,
        leaves: &[NodeId],
        router: NodeId,
        link: &P2pConfig,
        alloc: &mut Ipv4Allocator,
    ) -> Result<(Vec<Ipv4Addr>, Vec<Ipv4Addr>), ConfigError> {
        let mut leaf_addrs = Vec::with_capacity(leaves.len());
        let mut router_addrs = Vec::with_capacity(leaves.len());
        for (i, &leaf) in leaves.iter().enumerate() {
            if i > 0 {
                alloc.new_network()?;
            }
            let (leaf_dev, router_dev) = net.install_p2p(leaf, router, link);
            let leaf_if = alloc.next_addr()?;
            let router_if = alloc.next_addr()?;
            net.assign(leaf_dev, leaf_if);
            net.assign(router_dev, router_if);
            leaf_addrs.push(leaf_if.addr);
            router_addrs.push(router_if.addr);
        }
        Ok((leaf_addrs, router_addrs))
    }

    fn index(side: &'static str, nodes: &[NodeId], i: usize) -> Result<usize, ConfigError> {
        if i < nodes.len() {
            Ok(i)
        } else {
            Err(ConfigError::LeafIndex {
                side,
                index: i,
                count: nodes.len(),
            })
        }
    }

    pub fn left_count(&self) -> usize {
        self.left.len()
    }

    pub fn right_count(&self) -> usize {
        self.right.len()
    }

    pub fn left(&self, i: usize) -> Result<NodeId, ConfigError> {
        Self::index("left", &self.left, i).map(|i| self.left[i])
    }

    pub fn right(&self, i: usize) -> Result<NodeId, ConfigError> {
        Self::index("right", &self.right, i).map(|i| self.right[i])
    }

    /// 0 = 左路由器，1 = 右路由器
    pub fn router(&self, i: usize) -> Result<NodeId, ConfigError> {
        Self::index("router", &self.routers, i).map(|i| self.routers[i])
    }

    pub fn left_addr(&self, i: usize) -> Result<Ipv4Addr, ConfigError> {
        Self::index("left", &self.left, i).map(|i| self.left_addrs[i])
    }

    pub fn right_addr(&self, i: usize) -> Result<Ipv4Addr, ConfigError> {
        Self::index("right", &self.right, i).map(|i| self.right_addrs[i])
    }

    /// 路由器在瓶颈链路上的地址
    pub fn router_addr(&self, i: usize) -> Result<Ipv4Addr, ConfigError> {
        Self::index("router", &self.routers, i).map(|i| self.router_addrs[i])
    }

    /// 左路由器面向 left[i] 的接口地址
    pub fn left_router_addr(&self, i: usize) -> Result<Ipv4Addr, ConfigError> {
        Self::index("left", &self.left, i).map(|i| self.left_router_addrs[i])
    }

    pub fn right_router_addr(&self, i: usize) -> Result<Ipv4Addr, ConfigError> {
        Self::index("right", &self.right, i).map(|i| self.right_router_addrs[i])
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.left
            .iter()
            .chain(self.routers.iter())
            .chain(self.right.iter())
            .copied()
    }
}
