//! 错误类型
//!
//! 解析错误、场景配置错误与顶层仿真错误。

use std::net::Ipv4Addr;
use std::path::PathBuf;

use thiserror::Error;

/// 字符串参数（速率、时间、地址）解析失败。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty value")]
    Empty,
    #[error("invalid number in {0:?}")]
    Number(String),
    #[error("unknown unit {unit:?} in {input:?}")]
    Unit { input: String, unit: String },
    #[error("value out of range: {0:?}")]
    Overflow(String),
    #[error("invalid IPv4 address {0:?}")]
    Address(String),
}

/// 场景或拓扑参数不合法。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("network mask {0} is not contiguous")]
    BadMask(Ipv4Addr),
    #[error("address pool {network}/{mask} has no free host addresses")]
    HostsExhausted { network: Ipv4Addr, mask: Ipv4Addr },
    #[error("cannot advance past network {0}")]
    NetworksExhausted(Ipv4Addr),
    #[error("{side} leaf index {index} out of range (have {count})")]
    LeafIndex {
        side: &'static str,
        index: usize,
        count: usize,
    },
    #[error("dumbbell needs at least one leaf on each side")]
    EmptySide,
    #[error("flow {index}: stop time {stop:?} is before start time {start:?}")]
    FlowWindow {
        index: usize,
        start: String,
        stop: String,
    },
    #[error("flow {index}: packet size must be non-zero")]
    ZeroPacketSize { index: usize },
    #[error("flow {index}: data rate must be non-zero")]
    ZeroRate { index: usize },
    #[error("port {port} already bound on node {node}")]
    PortInUse { node: usize, port: u16 },
    #[error("node {node} has no IPv4 address to send from")]
    NoAddress { node: usize },
    #[error("tcp segment size must be non-zero")]
    ZeroSegmentSize,
}

/// 顶层错误。
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SimError::Io {
            path: path.into(),
            source,
        }
    }
}
