//! 场景配置
//!
//! 全部字段都有默认值，默认值即标准的 dumbbell Vegas 场景。可以从 JSON 文件加载，
//! 只写需要覆盖的字段。

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::app::AppProtocol;
use crate::error::{ConfigError, SimError};
use crate::flowmon::FlowMonitorConfig;
use crate::mobility::Vector;
use crate::net::{DataRate, EcmpMode, NodeId};
use crate::proto::tcp::TcpConfig;
use crate::sim::SimTime;
use crate::topo::{Dumbbell, DumbbellConfig};

/// 按拓扑角色引用节点，例如 `{"left": 1}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRef {
    Left(usize),
    Right(usize),
    Router(usize),
}

impl NodeRef {
    pub fn resolve(self, topo: &Dumbbell) -> Result<NodeId, ConfigError> {
        match self {
            NodeRef::Left(i) => topo.left(i),
            NodeRef::Right(i) => topo.right(i),
            NodeRef::Router(i) => topo.router(i),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodePosition {
    pub node: NodeRef,
    pub x: f64,
    pub y: f64,
}

impl NodePosition {
    fn new(node: NodeRef, x: f64, y: f64) -> Self {
        Self { node, x, y }
    }

    pub fn vector(&self) -> Vector {
        Vector::new(self.x, self.y, 0.0)
    }
}

/// On/Off 发送端的公共参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnOffDefaults {
    pub data_rate: DataRate,
    pub packet_size: u32,
    pub on_time: SimTime,
    pub off_time: SimTime,
}

impl Default for OnOffDefaults {
    fn default() -> Self {
        Self {
            data_rate: DataRate::from_mbps(5),
            packet_size: 512,
            on_time: SimTime::from_secs(1),
            off_time: SimTime::ZERO,
        }
    }
}

/// 一条从 left[src] 到 right[dst]:port 的流（发送端 + 接收端）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowSpec {
    pub protocol: AppProtocol,
    pub src: usize,
    pub dst: usize,
    pub port: u16,
    pub start: SimTime,
    pub stop: SimTime,
    /// 覆盖 `onoff.data_rate`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_rate: Option<DataRate>,
    /// 覆盖 `onoff.packet_size`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packet_size: Option<u32>,
    /// 0 表示不限
    #[serde(default)]
    pub max_bytes: u64,
}

impl FlowSpec {
    pub fn new(protocol: AppProtocol, src: usize, dst: usize, port: u16) -> Self {
        Self {
            protocol,
            src,
            dst,
            port,
            start: SimTime::from_secs(1),
            stop: SimTime::from_secs(10),
            data_rate: None,
            packet_size: None,
            max_bytes: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationSettings {
    pub enabled: bool,
    pub file: PathBuf,
    pub packet_metadata: bool,
    pub ipv4_counters: bool,
    pub counters_start: SimTime,
    pub counters_stop: SimTime,
    pub counters_poll_interval: SimTime,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            file: PathBuf::from("dumbbell_vegas_forward_anim.json"),
            packet_metadata: true,
            ipv4_counters: true,
            counters_start: SimTime::ZERO,
            counters_stop: SimTime::from_secs(10),
            counters_poll_interval: SimTime::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowMonitorSettings {
    pub enabled: bool,
    pub file: PathBuf,
    pub histograms: bool,
    pub probes: bool,
    #[serde(flatten)]
    pub monitor: FlowMonitorConfig,
}

impl Default for FlowMonitorSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            file: PathBuf::from("dumbbell_vegas_forward_flow.json"),
            histograms: true,
            probes: true,
            monitor: FlowMonitorConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub topology: DumbbellConfig,
    pub tcp: TcpConfig,
    pub onoff: OnOffDefaults,
    pub flows: Vec<FlowSpec>,
    pub positions: Vec<NodePosition>,
    pub ecmp: EcmpMode,
    pub animation: AnimationSettings,
    pub flow_monitor: FlowMonitorSettings,
    pub stop: SimTime,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        use NodeRef::{Left, Right, Router};
        Self {
            topology: DumbbellConfig::default(),
            tcp: TcpConfig::default(),
            onoff: OnOffDefaults::default(),
            flows: vec![
                FlowSpec::new(AppProtocol::Tcp, 1, 1, 50000),
                FlowSpec::new(AppProtocol::Udp, 0, 0, 4000),
                FlowSpec::new(AppProtocol::Udp, 2, 2, 40000),
            ],
            positions: vec![
                NodePosition::new(Router(0), 25.0, 44.0),
                NodePosition::new(Router(1), 44.0, 44.0),
                NodePosition::new(Left(1), 0.0, 44.0),
                NodePosition::new(Right(1), 75.0, 44.0),
                NodePosition::new(Left(0), 10.0, 24.0),
                NodePosition::new(Right(0), 65.0, 24.0),
                NodePosition::new(Left(2), 10.0, 64.0),
                NodePosition::new(Right(2), 65.0, 64.0),
            ],
            ecmp: EcmpMode::default(),
            animation: AnimationSettings::default(),
            flow_monitor: FlowMonitorSettings::default(),
            stop: SimTime::from_secs(10),
        }
    }
}

impl ScenarioConfig {
    /// 从 JSON 文件加载；缺省字段取默认值
    pub fn from_file(path: &Path) -> Result<Self, SimError> {
        let text = std::fs::read_to_string(path).map_err(|e| SimError::io(path, e))?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn to_json(&self) -> Result<String, SimError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// 流的实际速率与包长
    pub fn flow_rate(&self, flow: &FlowSpec) -> DataRate {
        flow.data_rate.unwrap_or(self.onoff.data_rate)
    }

    pub fn flow_packet_size(&self, flow: &FlowSpec) -> u32 {
        flow.packet_size.unwrap_or(self.onoff.packet_size)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let topo = &self.topology;
        if topo.left_leaves == 0 || topo.right_leaves == 0 {
            return Err(ConfigError::EmptySide);
        }
        self.tcp.validate()?;

        let mut sinks = HashSet::new();
        for (index, flow) in self.flows.iter().enumerate() {
            if flow.src >= topo.left_leaves {
                return Err(ConfigError::LeafIndex {
                    side: "left",
                    index: flow.src,
                    count: topo.left_leaves,
                });
            }
            if flow.dst >= topo.right_leaves {
                return Err(ConfigError::LeafIndex {
                    side: "right",
                    index: flow.dst,
                    count: topo.right_leaves,
                });
            }
            if flow.stop < flow.start {
                return Err(ConfigError::FlowWindow {
                    index,
                    start: flow.start.to_string(),
                    stop: flow.stop.to_string(),
                });
            }
            if self.flow_packet_size(flow) == 0 {
                return Err(ConfigError::ZeroPacketSize { index });
            }
            if self.flow_rate(flow).bps() == 0 {
                return Err(ConfigError::ZeroRate { index });
            }
            // 同一节点同一协议同一端口只能有一个接收端；right[i] 的节点号在左叶子与路由器之后
            let node = topo.left_leaves + 2 + flow.dst;
            if !sinks.insert((flow.dst, flow.protocol, flow.port)) {
                return Err(ConfigError::PortInUse {
                    node,
                    port: flow.port,
                });
            }
        }
        for pos in &self.positions {
            let (side, index, count) = match pos.node {
                NodeRef::Left(i) => ("left", i, topo.left_leaves),
                NodeRef::Right(i) => ("right", i, topo.right_leaves),
                NodeRef::Router(i) => ("router", i, 2),
            };
            if index >= count {
                return Err(ConfigError::LeafIndex { side, index, count });
            }
        }
        Ok(())
    }
}
