//! 接收端应用：监听端口并统计收到的字节

use std::any::Any;

use tracing::trace;

use super::{AppId, AppProtocol, AppReport, Application};
use crate::error::SimError;
use crate::net::{Delivery, IpProtocol, Network, NodeId};
use crate::proto::tcp::TcpConfig;
use crate::sim::{SimTime, Simulator};

#[derive(Debug)]
pub struct PacketSinkApp {
    node: NodeId,
    port: u16,
    protocol: AppProtocol,
    tcp: TcpConfig,
    rx_packets: u64,
    rx_bytes: u64,
    first_rx: Option<SimTime>,
    last_rx: Option<SimTime>,
}

impl PacketSinkApp {
    pub fn new(node: NodeId, port: u16, protocol: AppProtocol) -> Self {
        Self {
            node,
            port,
            protocol,
            tcp: TcpConfig::default(),
            rx_packets: 0,
            rx_bytes: 0,
            first_rx: None,
            last_rx: None,
        }
    }

    /// 被动打开的连接使用的 TCP 参数
    pub fn with_tcp_config(mut self, cfg: TcpConfig) -> Self {
        self.tcp = cfg;
        self
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn total_rx(&self) -> u64 {
        self.rx_bytes
    }

    pub fn rx_packets(&self) -> u64 {
        self.rx_packets
    }

    pub fn first_rx(&self) -> Option<SimTime> {
        self.first_rx
    }

    pub fn last_rx(&self) -> Option<SimTime> {
        self.last_rx
    }

    fn matches(&self, d: &Delivery) -> bool {
        let proto = match self.protocol {
            AppProtocol::Tcp => IpProtocol::Tcp,
            AppProtocol::Udp => IpProtocol::Udp,
        };
        d.node == self.node && d.protocol == proto && d.local.port() == self.port
    }
}

impl Application for PacketSinkApp {
    fn name(&self) -> &str {
        "PacketSink"
    }

    fn node(&self) -> NodeId {
        self.node
    }

    fn start(&mut self, _id: AppId, _sim: &mut Simulator, net: &mut Network) -> Result<(), SimError> {
        match self.protocol {
            AppProtocol::Udp => net.udp.bind(self.node, self.port)?,
            AppProtocol::Tcp => net.tcp.listen(self.node, self.port, self.tcp.clone())?,
        }
        Ok(())
    }

    fn stop(&mut self, _sim: &mut Simulator, net: &mut Network) {
        match self.protocol {
            AppProtocol::Udp => net.udp.unbind(self.node, self.port),
            AppProtocol::Tcp => net.tcp.stop_listening(self.node, self.port),
        }
    }

    fn on_delivery(&mut self, d: &Delivery) {
        if !self.matches(d) {
            return;
        }
        self.rx_packets += 1;
        self.rx_bytes += d.bytes;
        self.first_rx.get_or_insert(d.at);
        self.last_rx = Some(d.at);
        trace!(node = %self.node, port = self.port, bytes = d.bytes, total = self.rx_bytes, "sink 收到数据");
    }

    fn report(&self) -> AppReport {
        AppReport::Sink {
            node: self.node,
            port: self.port,
            protocol: self.protocol,
            rx_packets: self.rx_packets,
            rx_bytes: self.rx_bytes,
            first_rx: self.first_rx,
            last_rx: self.last_rx,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
