//! 场景运行结果摘要

use std::net::SocketAddrV4;
use std::path::PathBuf;

use serde::Serialize;

use crate::app::{AppId, AppProtocol, AppReport};
use crate::flowmon::FlowId;
use crate::net::{NetWorld, Stats};
use crate::proto::tcp::{TcpConnId, TcpConnStats, TcpState};
use crate::sim::{SimTime, Simulator};

/// 场景中安装的一条流：发送端与接收端应用
#[derive(Debug, Clone, Serialize)]
pub struct InstalledFlow {
    pub index: usize,
    pub protocol: AppProtocol,
    pub source: AppId,
    pub sink: AppId,
    pub remote: SocketAddrV4,
}

/// 流监控中的一条流
#[derive(Debug, Clone, Serialize)]
pub struct FlowSummary {
    pub flow_id: FlowId,
    pub source: String,
    pub destination: String,
    pub protocol: u8,
    pub tx_packets: u64,
    pub rx_packets: u64,
    pub tx_bytes: u64,
    pub rx_bytes: u64,
    pub lost_packets: u64,
    pub dropped_packets: u64,
    pub throughput_bps: f64,
    pub mean_delay: Option<SimTime>,
    pub mean_jitter: Option<SimTime>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TcpConnReport {
    pub conn_id: TcpConnId,
    pub local: SocketAddrV4,
    pub remote: SocketAddrV4,
    pub state: TcpState,
    pub congestion_control: &'static str,
    pub cwnd: u64,
    pub ssthresh: u64,
    pub srtt: Option<SimTime>,
    pub min_rtt: Option<SimTime>,
    pub stats: TcpConnStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub end_time: SimTime,
    pub events: u64,
    pub installed: Vec<InstalledFlow>,
    pub flows: Vec<FlowSummary>,
    pub apps: Vec<AppReport>,
    pub tcp: Vec<TcpConnReport>,
    pub net: Stats,
    pub anim_file: Option<PathBuf>,
    pub flow_file: Option<PathBuf>,
}

impl ScenarioReport {
    pub(crate) fn collect(sim: &Simulator, world: &NetWorld, installed: &[InstalledFlow]) -> Self {
        let net = &world.net;
        let flows = net
            .flowmon
            .as_ref()
            .map(|fm| {
                fm.flow_stats()
                    .iter()
                    .filter_map(|(&flow_id, s)| {
                        let t = fm.classifier().find_flow(flow_id)?;
                        Some(FlowSummary {
                            flow_id,
                            source: format!("{}:{}", t.src, t.src_port),
                            destination: format!("{}:{}", t.dst, t.dst_port),
                            protocol: t.protocol.number(),
                            tx_packets: s.tx_packets,
                            rx_packets: s.rx_packets,
                            tx_bytes: s.tx_bytes,
                            rx_bytes: s.rx_bytes,
                            lost_packets: s.lost_packets,
                            dropped_packets: s.total_dropped(),
                            throughput_bps: s.rx_throughput_bps(),
                            mean_delay: s.mean_delay(),
                            mean_jitter: s.mean_jitter(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut tcp: Vec<TcpConnReport> = net
            .tcp
            .conns()
            .map(|c| TcpConnReport {
                conn_id: c.id,
                local: c.local,
                remote: c.remote,
                state: c.state(),
                congestion_control: c.congestion_control(),
                cwnd: c.cwnd(),
                ssthresh: c.ssthresh(),
                srtt: c.srtt(),
                min_rtt: c.min_rtt(),
                stats: c.stats().clone(),
            })
            .collect();
        tcp.sort_by_key(|c| c.conn_id);

        Self {
            end_time: sim.now(),
            events: sim.events_executed(),
            installed: installed.to_vec(),
            flows,
            apps: world.apps.reports(),
            tcp,
            net: net.stats.clone(),
            anim_file: None,
            flow_file: None,
        }
    }

    /// 某条流接收端收到的字节数
    pub fn sink_rx_bytes(&self, flow: usize) -> Option<u64> {
        let sink = self.installed.get(flow)?.sink;
        match self.apps.get(sink)? {
            AppReport::Sink { rx_bytes, .. } => Some(*rx_bytes),
            AppReport::OnOff { .. } => None,
        }
    }

    /// 某条流发送端写出的字节数
    pub fn source_tx_bytes(&self, flow: usize) -> Option<u64> {
        let source = self.installed.get(flow)?.source;
        match self.apps.get(source)? {
            AppReport::OnOff { bytes_sent, .. } => Some(*bytes_sent),
            AppReport::Sink { .. } => None,
        }
    }
}
