//! On/Off 恒定比特率发送应用
//!
//! "开" 期间按 `rate` 每 `packet_size * 8 / rate` 发一个包；"关" 期间静默。
//! 开关切换时未凑满一个包的比特数（residual）会保留到下一个 "开" 周期。

use std::any::Any;
use std::net::SocketAddrV4;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{AppId, AppReport, AppTimer, Application};
use crate::error::{ConfigError, SimError};
use crate::net::{DataRate, Network, NodeId};
use crate::proto::tcp::{TcpConfig, TcpConnId};
use crate::sim::{SimTime, Simulator};

/// 应用使用的传输协议
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppProtocol {
    Tcp,
    Udp,
}

#[derive(Debug, Clone)]
pub struct OnOffConfig {
    pub remote: SocketAddrV4,
    pub protocol: AppProtocol,
    pub rate: DataRate,
    pub packet_size: u32,
    pub on_time: SimTime,
    pub off_time: SimTime,
    /// 0 表示不限
    pub max_bytes: u64,
    pub tcp: TcpConfig,
}

impl OnOffConfig {
    pub fn new(remote: SocketAddrV4, protocol: AppProtocol) -> Self {
        Self {
            remote,
            protocol,
            rate: DataRate::from_bps(500_000),
            packet_size: 512,
            on_time: SimTime::from_secs(1),
            off_time: SimTime::from_secs(1),
            max_bytes: 0,
            tcp: TcpConfig::default(),
        }
    }
}

#[derive(Debug)]
pub struct OnOffApp {
    node: NodeId,
    cfg: OnOffConfig,
    id: Option<AppId>,
    conn: Option<TcpConnId>,
    local: Option<SocketAddrV4>,
    residual_bits: u64,
    last_start: SimTime,
    next_gen: u64,
    send_gen: Option<u64>,
    switch_gen: Option<u64>,
    packets_sent: u64,
    bytes_sent: u64,
    write_failures: u64,
}

impl OnOffApp {
    pub fn new(node: NodeId, cfg: OnOffConfig) -> Self {
        Self {
            node,
            cfg,
            id: None,
            conn: None,
            local: None,
            residual_bits: 0,
            last_start: SimTime::ZERO,
            next_gen: 0,
            send_gen: None,
            switch_gen: None,
            packets_sent: 0,
            bytes_sent: 0,
            write_failures: 0,
        }
    }

    pub fn config(&self) -> &OnOffConfig {
        &self.cfg
    }

    pub fn packets_sent(&self) -> u64 {
        self.packets_sent
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    pub fn write_failures(&self) -> u64 {
        self.write_failures
    }

    pub fn residual_bits(&self) -> u64 {
        self.residual_bits
    }

    /// TCP 模式下的连接
    pub fn connection(&self) -> Option<TcpConnId> {
        self.conn
    }

    pub fn local_addr(&self) -> Option<SocketAddrV4> {
        self.local
    }

    fn schedule(&mut self, delay: SimTime, sim: &mut Simulator) -> u64 {
        self.next_gen += 1;
        let token = self.next_gen;
        if let Some(app) = self.id {
            sim.schedule_in(delay, AppTimer { app, token });
        }
        token
    }

    fn is_sending(&self) -> bool {
        self.send_gen.is_some()
    }

    /// 进入 "开" 周期
    fn start_sending(&mut self, sim: &mut Simulator) {
        self.last_start = sim.now();
        self.schedule_next_tx(sim);
        self.switch_gen = Some(self.schedule(self.cfg.on_time, sim));
        trace!(node = %self.node, now = %sim.now(), "on");
    }

    /// 进入 "关" 周期
    fn stop_sending(&mut self, sim: &mut Simulator) {
        self.cancel(sim);
        self.switch_gen = Some(self.schedule(self.cfg.off_time, sim));
        trace!(node = %self.node, now = %sim.now(), residual = self.residual_bits, "off");
    }

    /// 撤销所有定时器；正在等待发送时把已累积的比特计入 residual
    fn cancel(&mut self, sim: &Simulator) {
        if self.is_sending() {
            let elapsed = sim.now().saturating_sub(self.last_start);
            self.residual_bits += self.cfg.rate.bits_in(elapsed);
        }
        self.send_gen = None;
        self.switch_gen = None;
    }

    fn schedule_next_tx(&mut self, sim: &mut Simulator) {
        if self.cfg.max_bytes > 0 && self.bytes_sent >= self.cfg.max_bytes {
            debug!(node = %self.node, bytes = self.bytes_sent, "达到 max_bytes，停止发送");
            self.cancel(sim);
            return;
        }
        let bits = (u64::from(self.cfg.packet_size) * 8).saturating_sub(self.residual_bits);
        let next = self.cfg.rate.bits_time(bits);
        self.send_gen = Some(self.schedule(next, sim));
    }

    fn send_packet(&mut self, sim: &mut Simulator, net: &mut Network) {
        let size = self.cfg.packet_size;
        let sent = match self.cfg.protocol {
            AppProtocol::Udp => match self.local {
                Some(local) => {
                    let mut udp = std::mem::take(&mut net.udp);
                    udp.send_to(net, self.node, local, self.cfg.remote, size, sim);
                    net.udp = udp;
                    true
                }
                None => false,
            },
            AppProtocol::Tcp => match self.conn {
                Some(conn) => {
                    let mut tcp = std::mem::take(&mut net.tcp);
                    let r = tcp.send(conn, u64::from(size), sim, net);
                    net.tcp = tcp;
                    if let Err(e) = r {
                        trace!(node = %self.node, error = %e, "写入套接字失败");
                    }
                    r.is_ok()
                }
                None => false,
            },
        };
        if sent {
            self.packets_sent += 1;
            self.bytes_sent += u64::from(size);
        } else {
            self.write_failures += 1;
        }
        self.residual_bits = 0;
        self.last_start = sim.now();
        self.schedule_next_tx(sim);
    }
}

impl Application for OnOffApp {
    fn name(&self) -> &str {
        "OnOff"
    }

    fn node(&self) -> NodeId {
        self.node
    }

    fn start(&mut self, id: AppId, sim: &mut Simulator, net: &mut Network) -> Result<(), SimError> {
        self.id = Some(id);
        if self.local.is_none() {
            let remote = self.cfg.remote;
            let src = net
                .source_addr(self.node, *remote.ip())
                .ok_or(ConfigError::NoAddress { node: self.node.0 })?;
            let port = net.alloc_ephemeral_port(self.node);
            let local = SocketAddrV4::new(src, port);
            self.local = Some(local);

            if self.cfg.protocol == AppProtocol::Tcp {
                self.cfg.tcp.validate()?;
                let mut tcp = std::mem::take(&mut net.tcp);
                let conn = tcp.connect(self.node, local, remote, self.cfg.tcp.clone(), sim, net);
                net.tcp = tcp;
                self.conn = Some(conn);
            }
        }
        // 先 "关" off_time，再进入第一个 "开" 周期
        self.cancel(sim);
        if self.cfg.off_time == SimTime::ZERO {
            self.start_sending(sim);
        } else {
            self.switch_gen = Some(self.schedule(self.cfg.off_time, sim));
        }
        Ok(())
    }

    fn stop(&mut self, sim: &mut Simulator, _net: &mut Network) {
        self.cancel(sim);
    }

    fn on_timer(&mut self, _id: AppId, token: u64, sim: &mut Simulator, net: &mut Network) {
        if self.send_gen == Some(token) {
            self.send_packet(sim, net);
        } else if self.switch_gen == Some(token) {
            if self.is_sending() {
                self.stop_sending(sim);
            } else {
                self.start_sending(sim);
            }
        }
    }

    fn report(&self) -> AppReport {
        AppReport::OnOff {
            node: self.node,
            remote: self.cfg.remote.to_string(),
            protocol: self.cfg.protocol,
            packets_sent: self.packets_sent,
            bytes_sent: self.bytes_sent,
            write_failures: self.write_failures,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
