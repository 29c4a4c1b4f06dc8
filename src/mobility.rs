//! 节点位置（固定位置移动模型）
//!
//! 只用于动画输出；不影响链路时延。

use serde::{Deserialize, Serialize};

use crate::net::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Vector {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// 每个节点一个可选的固定位置；未安装模型的节点没有位置。
#[derive(Debug, Clone, Default)]
pub struct ConstantPositionMobility {
    positions: Vec<Option<Vector>>,
}

impl ConstantPositionMobility {
    /// 给节点安装模型，初始位置为原点
    pub fn install(&mut self, node: NodeId) {
        if self.positions.len() <= node.0 {
            self.positions.resize(node.0 + 1, None);
        }
        self.positions[node.0].get_or_insert_with(Vector::default);
    }

    pub fn install_all(&mut self, nodes: impl IntoIterator<Item = NodeId>) {
        for n in nodes {
            self.install(n);
        }
    }

    /// 设置位置；若尚未安装则顺带安装
    pub fn set_position(&mut self, node: NodeId, pos: Vector) {
        self.install(node);
        self.positions[node.0] = Some(pos);
    }

    pub fn position(&self, node: NodeId) -> Option<Vector> {
        self.positions.get(node.0).copied().flatten()
    }
}
