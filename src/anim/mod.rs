//! 动画轨迹（用于离线回放）
//!
//! 以结构化 JSON 事件记录拓扑、节点位置、每次链路传输、丢包、
//! IPv4 计数器与 TCP 窗口变化。

mod interface;
mod types;

pub use interface::{AnimCounterPoll, AnimationInterface, CounterWindow};
pub use types::{
    AnimEvent, AnimEventKind, AnimLinkInfo, AnimNodeInfo, AnimPacketKind, Ipv4Counters,
};
