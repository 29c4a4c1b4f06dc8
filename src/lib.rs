//! 包级离散事件网络仿真：dumbbell 拓扑上的 TCP Vegas 与 UDP On/Off 流。
//!
//! - `sim`：事件驱动仿真核心
//! - `net`：节点、点对点链路、IPv4 地址与路由
//! - `proto`：UDP 与 TCP（NewReno / Vegas）
//! - `app`：On/Off 发送端与接收端
//! - `flowmon` / `anim`：流监控与动画轨迹
//! - `topo` / `scenario`：dumbbell 拓扑与完整场景

pub mod anim;
pub mod app;
pub mod error;
pub mod flowmon;
pub mod mobility;
pub mod net;
pub mod proto;
pub mod queue;
pub mod scenario;
pub mod sim;
pub mod topo;

#[cfg(test)]
mod test;
