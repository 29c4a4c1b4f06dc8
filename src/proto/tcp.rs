//! TCP（简化版）协议实现
//!
//! 支持的功能：
//! - 三次握手（SYN / SYN-ACK / ACK），握手期间应用写入的数据先进入发送缓冲
//! - 发送缓冲、按 MSS 分段、窗口 = min(cwnd, 接收缓冲)
//! - 接收端累计 ACK、乱序重组、延迟 ACK
//! - RTT 估计与 RTO（Karn 规则、指数退避）
//! - 3 dupACK 快速重传 + NewReno 快速恢复；RTO 后 go-back-N
//! - 可插拔拥塞控制（NewReno / Vegas）
//!
//! 序号为 64 位流偏移量，不回绕；SYN 占用序号 0，数据从 1 开始。
//! 不实现 FIN/RST、窗口缩放、SACK 与时间戳选项。

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddrV4;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use super::cc::{CaState, CongestionOps, TcpCb, TcpVariant, VegasParams};
use super::rtt::RttEstimator;
use crate::error::ConfigError;
use crate::net::{Delivery, DropReason, IpProtocol, NetApi, NetWorld, NodeId, Packet, TcpSegment, Transport};
use crate::sim::{Event, SimTime, Simulator, World};

/// TCP 连接标识
pub type TcpConnId = u64;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpConfig {
    pub variant: TcpVariant,
    /// MSS（数据段载荷大小，字节）
    pub segment_size: u32,
    /// 初始 cwnd（段数）
    pub initial_cwnd: u32,
    /// 初始 ssthresh（字节）
    pub initial_ssthresh: u64,
    pub snd_buf_bytes: u64,
    pub rcv_buf_bytes: u64,
    /// 每收到多少个按序数据段回一次 ACK
    pub del_ack_count: u32,
    pub del_ack_timeout: SimTime,
    pub initial_rto: SimTime,
    pub min_rto: SimTime,
    pub max_rto: SimTime,
    pub clock_granularity: SimTime,
    /// SYN / SYN-ACK 最多重传次数
    pub syn_retries: u32,
    pub dup_ack_threshold: u32,
    pub vegas: VegasParams,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            variant: TcpVariant::default(),
            segment_size: 536,
            initial_cwnd: 10,
            initial_ssthresh: u64::from(u32::MAX),
            snd_buf_bytes: 131_072,
            rcv_buf_bytes: 131_072,
            del_ack_count: 2,
            del_ack_timeout: SimTime::from_millis(200),
            initial_rto: SimTime::from_secs(1),
            min_rto: SimTime::from_secs(1),
            max_rto: SimTime::from_secs(60),
            clock_granularity: SimTime::from_millis(1),
            syn_retries: 6,
            dup_ack_threshold: 3,
            vegas: VegasParams::default(),
        }
    }
}

impl TcpConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.segment_size == 0 {
            return Err(ConfigError::ZeroSegmentSize);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TcpState {
    SynSent,
    SynRcvd,
    Established,
    /// 握手重试次数耗尽
    Closed,
}

/// 写入发送缓冲失败
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("send buffer full ({free} bytes free)")]
    BufferFull { free: u64 },
    #[error("connection closed")]
    NotConnected,
    #[error("unknown connection")]
    UnknownConnection,
}

/// 连接统计
#[derive(Debug, Clone, Default, Serialize)]
pub struct TcpConnStats {
    pub bytes_written: u64,
    pub bytes_rejected: u64,
    pub bytes_acked: u64,
    pub bytes_received: u64,
    pub segments_sent: u64,
    pub bytes_retransmitted: u64,
    pub fast_retransmits: u64,
    pub rto_expirations: u64,
    pub established_at: Option<SimTime>,
}

#[derive(Debug, Clone, Copy)]
struct SentRecord {
    at: SimTime,
    retransmitted: bool,
}

#[derive(Debug)]
pub struct TcpConn {
    pub id: TcpConnId,
    pub node: NodeId,
    pub local: SocketAddrV4,
    pub remote: SocketAddrV4,
    cfg: TcpConfig,
    state: TcpState,

    // sender
    tcb: TcpCb,
    cc: Box<dyn CongestionOps>,
    snd_max: u64,
    /// 应用写入数据的末尾偏移（不含）
    tx_end: u64,
    dup_acks: u32,
    recover: u64,
    rtt: RttEstimator,
    rto: SimTime,
    rto_gen: u64,
    rto_armed: bool,
    syn_retries: u32,
    /// 段末偏移 -> 发送时刻
    sent: BTreeMap<u64, SentRecord>,

    // receiver
    rcv_nxt: u64,
    ooo: BTreeMap<u64, u32>,
    pending_acks: u32,
    delack_gen: u64,

    stats: TcpConnStats,
}

impl TcpConn {
    fn new(
        id: TcpConnId,
        node: NodeId,
        local: SocketAddrV4,
        remote: SocketAddrV4,
        cfg: TcpConfig,
        state: TcpState,
    ) -> Self {
        let tcb = TcpCb {
            cwnd: u64::from(cfg.initial_cwnd.max(1)) * u64::from(cfg.segment_size),
            ssthresh: cfg.initial_ssthresh,
            segment_size: cfg.segment_size,
            snd_una: 0,
            snd_nxt: 0,
            ca_state: CaState::Open,
        };
        let cc = cfg.variant.build(cfg.vegas);
        let rto = cfg.initial_rto;
        Self {
            id,
            node,
            local,
            remote,
            cfg,
            state,
            tcb,
            cc,
            snd_max: 0,
            tx_end: 1,
            dup_acks: 0,
            recover: 0,
            rtt: RttEstimator::new(),
            rto,
            rto_gen: 0,
            rto_armed: false,
            syn_retries: 0,
            sent: BTreeMap::new(),
            rcv_nxt: 0,
            ooo: BTreeMap::new(),
            pending_acks: 0,
            delack_gen: 0,
            stats: TcpConnStats::default(),
        }
    }

    pub fn state(&self) -> TcpState {
        self.state
    }

    pub fn cwnd(&self) -> u64 {
        self.tcb.cwnd
    }

    pub fn ssthresh(&self) -> u64 {
        self.tcb.ssthresh
    }

    pub fn ca_state(&self) -> CaState {
        self.tcb.ca_state
    }

    pub fn congestion_control(&self) -> &'static str {
        self.cc.name()
    }

    pub fn bytes_in_flight(&self) -> u64 {
        self.tcb.snd_nxt.saturating_sub(self.tcb.snd_una)
    }

    /// 发送缓冲中尚未被确认的字节
    pub fn buffered(&self) -> u64 {
        self.tx_end.saturating_sub(self.tcb.snd_una.max(1))
    }

    pub fn snd_una(&self) -> u64 {
        self.tcb.snd_una
    }

    pub fn rcv_nxt(&self) -> u64 {
        self.rcv_nxt
    }

    pub fn rto(&self) -> SimTime {
        self.rto
    }

    pub fn srtt(&self) -> Option<SimTime> {
        self.rtt.srtt()
    }

    pub fn min_rtt(&self) -> Option<SimTime> {
        self.rtt.min_rtt()
    }

    pub fn stats(&self) -> &TcpConnStats {
        &self.stats
    }

    fn mss(&self) -> u64 {
        u64::from(self.cfg.segment_size)
    }

    fn recompute_rto(&mut self) {
        self.rto = self.rtt.rto(
            self.cfg.initial_rto,
            self.cfg.clock_granularity,
            self.cfg.min_rto,
            self.cfg.max_rto,
        );
    }

    fn set_ca_state(&mut self, state: CaState) {
        if self.tcb.ca_state != state {
            trace!(conn = self.id, from = ?self.tcb.ca_state, to = ?state, "拥塞状态切换");
            self.tcb.ca_state = state;
            self.cc.on_state(&self.tcb, state);
        }
    }
}

#[derive(Debug, Default)]
pub struct TcpStack {
    conns: HashMap<TcpConnId, TcpConn>,
    by_addr: HashMap<(NodeId, SocketAddrV4, SocketAddrV4), TcpConnId>,
    listeners: HashMap<(NodeId, u16), TcpConfig>,
    next_id: TcpConnId,
}

impl TcpStack {
    pub fn get(&self, id: TcpConnId) -> Option<&TcpConn> {
        self.conns.get(&id)
    }

    pub fn conns(&self) -> impl Iterator<Item = &TcpConn> {
        self.conns.values()
    }

    /// 在 (node, port) 上监听
    pub fn listen(&mut self, node: NodeId, port: u16, cfg: TcpConfig) -> Result<(), ConfigError> {
        cfg.validate()?;
        if self.listeners.contains_key(&(node, port)) {
            return Err(ConfigError::PortInUse { node: node.0, port });
        }
        self.listeners.insert((node, port), cfg);
        Ok(())
    }

    pub fn stop_listening(&mut self, node: NodeId, port: u16) {
        self.listeners.remove(&(node, port));
    }

    pub fn is_listening(&self, node: NodeId, port: u16) -> bool {
        self.listeners.contains_key(&(node, port))
    }

    fn alloc_id(&mut self) -> TcpConnId {
        self.next_id += 1;
        self.next_id
    }

    fn insert(&mut self, conn: TcpConn) {
        self.by_addr
            .insert((conn.node, conn.local, conn.remote), conn.id);
        self.conns.insert(conn.id, conn);
    }

    /// 主动打开：发送 SYN
    pub fn connect(
        &mut self,
        node: NodeId,
        local: SocketAddrV4,
        remote: SocketAddrV4,
        cfg: TcpConfig,
        sim: &mut Simulator,
        net: &mut dyn NetApi,
    ) -> TcpConnId {
        let id = self.alloc_id();
        let mut conn = TcpConn::new(id, node, local, remote, cfg, TcpState::SynSent);
        info!(conn = id, %local, %remote, cc = conn.cc.name(), "TCP 连接发起");
        send_control(&mut conn, TcpSegment::syn(0), sim, net);
        conn.tcb.snd_nxt = 1;
        conn.snd_max = 1;
        arm_rto(&mut conn, sim);
        self.insert(conn);
        id
    }

    /// 应用写入；超过发送缓冲剩余空间时整体拒绝
    pub fn send(
        &mut self,
        id: TcpConnId,
        bytes: u64,
        sim: &mut Simulator,
        net: &mut dyn NetApi,
    ) -> Result<(), SendError> {
        let conn = self.conns.get_mut(&id).ok_or(SendError::UnknownConnection)?;
        if conn.state == TcpState::Closed {
            return Err(SendError::NotConnected);
        }
        let free = conn.cfg.snd_buf_bytes.saturating_sub(conn.buffered());
        if bytes > free {
            conn.stats.bytes_rejected += bytes;
            return Err(SendError::BufferFull { free });
        }
        conn.tx_end += bytes;
        conn.stats.bytes_written += bytes;
        if conn.state == TcpState::Established {
            send_pending(conn, sim, net);
        }
        Ok(())
    }

    /// 目的节点收到 TCP 段
    pub fn on_segment(
        &mut self,
        node: NodeId,
        pkt: &Packet,
        seg: TcpSegment,
        sim: &mut Simulator,
        net: &mut dyn NetApi,
    ) -> Result<Option<Delivery>, DropReason> {
        let key = (node, pkt.dst, pkt.src);
        if let Some(&id) = self.by_addr.get(&key) {
            let Some(conn) = self.conns.get_mut(&id) else {
                return Err(DropReason::NoSocket);
            };
            return Ok(handle_segment(conn, seg, sim, net));
        }

        // 新连接：只接受监听端口上的 SYN
        if !(seg.flags.syn && !seg.flags.ack) {
            return Err(DropReason::NoSocket);
        }
        let Some(cfg) = self.listeners.get(&(node, pkt.dst.port())).cloned() else {
            return Err(DropReason::NoSocket);
        };
        let id = self.alloc_id();
        let mut conn = TcpConn::new(id, node, pkt.dst, pkt.src, cfg, TcpState::SynRcvd);
        conn.rcv_nxt = seg.seq + 1;
        debug!(conn = id, local = %conn.local, remote = %conn.remote, "收到 SYN，回复 SYN-ACK");
        let syn_ack = TcpSegment::syn_ack(0, conn.rcv_nxt);
        send_control(&mut conn, syn_ack, sim, net);
        conn.tcb.snd_nxt = 1;
        conn.snd_max = 1;
        arm_rto(&mut conn, sim);
        self.insert(conn);
        Ok(None)
    }

    fn on_rto(&mut self, id: TcpConnId, token: u64, sim: &mut Simulator, net: &mut dyn NetApi) {
        let Some(conn) = self.conns.get_mut(&id) else {
            return;
        };
        if !conn.rto_armed || conn.rto_gen != token {
            return;
        }
        conn.rto_armed = false;
        let now = sim.now();
        net.trace_tcp_rto(now, id, conn.tcb.snd_una);

        match conn.state {
            TcpState::SynSent | TcpState::SynRcvd => {
                if conn.syn_retries >= conn.cfg.syn_retries {
                    info!(conn = id, "握手重试次数耗尽，关闭连接");
                    conn.state = TcpState::Closed;
                    return;
                }
                conn.syn_retries += 1;
                conn.stats.rto_expirations += 1;
                conn.rto = SimTime(conn.rto.0.saturating_mul(2)).min(conn.cfg.max_rto);
                let seg = if conn.state == TcpState::SynSent {
                    TcpSegment::syn(0)
                } else {
                    TcpSegment::syn_ack(0, conn.rcv_nxt)
                };
                send_control(conn, seg, sim, net);
                arm_rto(conn, sim);
            }
            TcpState::Established => {
                if conn.tcb.snd_una >= conn.snd_max {
                    return;
                }
                let inflight = conn.bytes_in_flight();
                conn.tcb.ssthresh = conn.cc.ssthresh(&conn.tcb, inflight);
                conn.tcb.cwnd = conn.mss();
                conn.recover = conn.snd_max;
                conn.dup_acks = 0;
                conn.set_ca_state(CaState::Loss);
                conn.stats.rto_expirations += 1;
                // go-back-N；此前发出的段都不再用于 RTT 采样
                conn.tcb.snd_nxt = conn.tcb.snd_una;
                for rec in conn.sent.values_mut() {
                    rec.retransmitted = true;
                }
                conn.rto = SimTime(conn.rto.0.saturating_mul(2)).min(conn.cfg.max_rto);
                debug!(conn = id, snd_una = conn.tcb.snd_una, rto = %conn.rto, "⏰ RTO 超时");
                trace_cwnd(conn, now, net);
                send_pending(conn, sim, net);
            }
            TcpState::Closed => {}
        }
    }

    fn on_delack(&mut self, id: TcpConnId, token: u64, sim: &mut Simulator, net: &mut dyn NetApi) {
        let Some(conn) = self.conns.get_mut(&id) else {
            return;
        };
        if conn.delack_gen == token && conn.pending_acks > 0 {
            send_ack(conn, sim, net);
        }
    }
}

fn handle_segment(
    conn: &mut TcpConn,
    seg: TcpSegment,
    sim: &mut Simulator,
    net: &mut dyn NetApi,
) -> Option<Delivery> {
    match conn.state {
        TcpState::SynSent => {
            if seg.flags.syn && seg.flags.ack && seg.ack == 1 {
                if conn.syn_retries == 0 {
                    if let Some(rec) = conn.sent.get(&1) {
                        let sample = sim.now().saturating_sub(rec.at);
                        conn.rtt.update(sample);
                        conn.recompute_rto();
                    }
                }
                conn.sent.clear();
                conn.rcv_nxt = seg.seq + 1;
                establish(conn, sim);
                send_ack(conn, sim, net);
                send_pending(conn, sim, net);
            }
            None
        }
        TcpState::SynRcvd => {
            if seg.flags.syn && !seg.flags.ack {
                // 对端没收到 SYN-ACK
                let syn_ack = TcpSegment::syn_ack(0, conn.rcv_nxt);
                send_control(conn, syn_ack, sim, net);
                return None;
            }
            if !seg.flags.ack || seg.ack < 1 {
                return None;
            }
            conn.sent.clear();
            establish(conn, sim);
            let delivered = if seg.len > 0 {
                receive_data(conn, seg, sim, net)
            } else {
                None
            };
            if seg.ack > 1 {
                process_ack(conn, seg, sim, net);
            }
            send_pending(conn, sim, net);
            delivered
        }
        TcpState::Established => {
            if seg.flags.syn {
                // 重复的 SYN-ACK：我们的 ACK 丢了
                send_ack(conn, sim, net);
                return None;
            }
            let delivered = if seg.len > 0 {
                receive_data(conn, seg, sim, net)
            } else {
                None
            };
            if seg.flags.ack {
                process_ack(conn, seg, sim, net);
            }
            delivered
        }
        TcpState::Closed => None,
    }
}

fn establish(conn: &mut TcpConn, sim: &mut Simulator) {
    conn.state = TcpState::Established;
    conn.tcb.snd_una = 1;
    conn.tcb.snd_nxt = conn.tcb.snd_nxt.max(1);
    conn.snd_max = conn.snd_max.max(1);
    conn.syn_retries = 0;
    conn.stats.established_at = Some(sim.now());
    cancel_rto(conn);
    conn.cc.on_state(&conn.tcb, CaState::Open);
    info!(conn = conn.id, now = %sim.now(), "TCP 连接建立");
}

/// 接收端：按序交付、乱序缓存、(延迟) ACK
fn receive_data(
    conn: &mut TcpConn,
    seg: TcpSegment,
    sim: &mut Simulator,
    net: &mut dyn NetApi,
) -> Option<Delivery> {
    let end = seg.seq + u64::from(seg.len);
    if end <= conn.rcv_nxt {
        // 完全重复
        send_ack(conn, sim, net);
        return None;
    }
    if seg.seq > conn.rcv_nxt {
        let e = conn.ooo.entry(seg.seq).or_insert(0);
        *e = (*e).max(seg.len);
        trace!(conn = conn.id, seq = seg.seq, rcv_nxt = conn.rcv_nxt, "乱序段");
        send_ack(conn, sim, net);
        return None;
    }

    let before = conn.rcv_nxt;
    let had_hole = !conn.ooo.is_empty();
    conn.rcv_nxt = end;
    while let Some((&s, &len)) = conn.ooo.first_key_value() {
        if s > conn.rcv_nxt {
            break;
        }
        conn.ooo.remove(&s);
        conn.rcv_nxt = conn.rcv_nxt.max(s + u64::from(len));
    }
    let delivered = conn.rcv_nxt - before;
    conn.stats.bytes_received += delivered;

    if had_hole {
        send_ack(conn, sim, net);
    } else {
        conn.pending_acks += 1;
        if conn.pending_acks >= conn.cfg.del_ack_count {
            send_ack(conn, sim, net);
        } else if conn.pending_acks == 1 {
            conn.delack_gen += 1;
            sim.schedule_in(
                conn.cfg.del_ack_timeout,
                TcpDelAck {
                    conn_id: conn.id,
                    token: conn.delack_gen,
                },
            );
        }
    }

    Some(Delivery {
        node: conn.node,
        protocol: IpProtocol::Tcp,
        local: conn.local,
        remote: conn.remote,
        bytes: delivered,
        at: sim.now(),
    })
}

/// 发送端：处理 ACK
fn process_ack(conn: &mut TcpConn, seg: TcpSegment, sim: &mut Simulator, net: &mut dyn NetApi) {
    let ack = seg.ack;
    let now = sim.now();
    if ack > conn.snd_max {
        return;
    }

    if ack > conn.tcb.snd_una {
        let newly = ack - conn.tcb.snd_una;
        let mss = conn.mss();
        let segments_acked = newly.div_ceil(mss) as u32;

        // Karn：只用从未重传过的段采样
        let mut sample = None;
        let acked_keys: Vec<u64> = conn.sent.range(..=ack).map(|(&k, _)| k).collect();
        if let Some(last) = acked_keys.last() {
            if let Some(rec) = conn.sent.get(last) {
                if !rec.retransmitted {
                    sample = Some(now.saturating_sub(rec.at));
                }
            }
        }
        for k in acked_keys {
            conn.sent.remove(&k);
        }

        conn.tcb.snd_una = ack;
        conn.tcb.snd_nxt = conn.tcb.snd_nxt.max(ack);
        conn.stats.bytes_acked += newly;

        if let Some(r) = sample {
            conn.rtt.update(r);
        }
        conn.recompute_rto();
        conn.cc.pkts_acked(&conn.tcb, segments_acked, sample);

        match conn.tcb.ca_state {
            CaState::Recovery if ack < conn.recover => {
                // 部分确认：立即重传下一个缺口，窗口部分收缩
                retransmit_head(conn, sim, net);
                conn.tcb.cwnd = conn.tcb.cwnd.saturating_sub(newly).saturating_add(mss).max(mss);
            }
            CaState::Recovery => {
                conn.tcb.cwnd = conn.tcb.ssthresh.max(mss);
                conn.dup_acks = 0;
                conn.set_ca_state(CaState::Open);
            }
            CaState::Loss if ack < conn.recover => {
                // Loss 状态下 Vegas 已停用，按慢启动重新爬升
                conn.cc.increase_window(&mut conn.tcb, segments_acked);
            }
            _ => {
                conn.dup_acks = 0;
                conn.set_ca_state(CaState::Open);
                conn.cc.increase_window(&mut conn.tcb, segments_acked);
            }
        }

        if conn.tcb.snd_una >= conn.snd_max {
            cancel_rto(conn);
        } else {
            arm_rto(conn, sim);
        }
        trace_cwnd(conn, now, net);
        send_pending(conn, sim, net);
    } else if ack == conn.tcb.snd_una && seg.len == 0 && conn.snd_max > conn.tcb.snd_una {
        conn.dup_acks += 1;
        match conn.tcb.ca_state {
            CaState::Recovery => {
                conn.tcb.cwnd = conn.tcb.cwnd.saturating_add(conn.mss());
                send_pending(conn, sim, net);
            }
            CaState::Loss => {}
            CaState::Open | CaState::Disorder => {
                if conn.dup_acks >= conn.cfg.dup_ack_threshold {
                    let inflight = conn.bytes_in_flight();
                    conn.tcb.ssthresh = conn.cc.ssthresh(&conn.tcb, inflight);
                    conn.tcb.cwnd = conn.tcb.ssthresh + 3 * conn.mss();
                    conn.recover = conn.snd_max;
                    conn.set_ca_state(CaState::Recovery);
                    conn.stats.fast_retransmits += 1;
                    debug!(conn = conn.id, snd_una = conn.tcb.snd_una, ssthresh = conn.tcb.ssthresh, "3 dupACK，快速重传");
                    retransmit_head(conn, sim, net);
                    arm_rto(conn, sim);
                    trace_cwnd(conn, now, net);
                } else {
                    conn.set_ca_state(CaState::Disorder);
                }
            }
        }
    }
}

/// 在窗口允许时尽量发送新数据（或 go-back-N 重传）
fn send_pending(conn: &mut TcpConn, sim: &mut Simulator, net: &mut dyn NetApi) {
    if conn.state != TcpState::Established {
        return;
    }
    let mss = conn.mss();
    loop {
        let window = conn.tcb.cwnd.min(conn.cfg.rcv_buf_bytes);
        let inflight = conn.bytes_in_flight();
        if inflight >= window {
            break;
        }
        let avail = conn.tx_end.saturating_sub(conn.tcb.snd_nxt);
        if avail == 0 {
            break;
        }
        let room = window - inflight;
        // 窗口剩余不足一个段且还有在途数据时，等 ACK 再发
        if room < mss && avail > room && inflight > 0 {
            break;
        }
        let len = mss.min(avail).min(room) as u32;
        let seq = conn.tcb.snd_nxt;
        let retx = seq < conn.snd_max;
        send_data(conn, seq, len, retx, sim, net);
        conn.tcb.snd_nxt += u64::from(len);
        conn.snd_max = conn.snd_max.max(conn.tcb.snd_nxt);
        if !conn.rto_armed {
            arm_rto(conn, sim);
        }
    }
}

fn retransmit_head(conn: &mut TcpConn, sim: &mut Simulator, net: &mut dyn NetApi) {
    let seq = conn.tcb.snd_una;
    let len = conn.mss().min(conn.snd_max.saturating_sub(seq)) as u32;
    if len > 0 {
        send_data(conn, seq, len, true, sim, net);
    }
}

fn make_packet(conn: &TcpConn, seg: TcpSegment, net: &mut dyn NetApi, now: SimTime) -> Packet {
    let id = net.next_packet_id();
    Packet::new(id, conn.local, conn.remote, Transport::Tcp(seg), seg.len, now)
}

fn send_data(
    conn: &mut TcpConn,
    seq: u64,
    len: u32,
    retx: bool,
    sim: &mut Simulator,
    net: &mut dyn NetApi,
) {
    let now = sim.now();
    let seg = TcpSegment::data(seq, conn.rcv_nxt, len);
    let pkt = make_packet(conn, seg, net, now);
    let end = seq + u64::from(len);
    match conn.sent.get_mut(&end) {
        Some(rec) => {
            rec.at = now;
            rec.retransmitted = true;
        }
        None => {
            conn.sent.insert(
                end,
                SentRecord {
                    at: now,
                    retransmitted: retx,
                },
            );
        }
    }
    conn.stats.segments_sent += 1;
    if retx {
        conn.stats.bytes_retransmitted += u64::from(len);
    }
    // 数据段捎带 ACK
    conn.pending_acks = 0;
    trace!(conn = conn.id, seq, len, retx, "发送数据段");
    net.send_from(conn.node, pkt, sim);
}

fn send_control(conn: &mut TcpConn, seg: TcpSegment, sim: &mut Simulator, net: &mut dyn NetApi) {
    let now = sim.now();
    let pkt = make_packet(conn, seg, net, now);
    if seg.flags.syn {
        // SYN 占用序号 0，段末偏移为 1
        conn.sent.insert(
            1,
            SentRecord {
                at: now,
                retransmitted: conn.syn_retries > 0,
            },
        );
    }
    conn.stats.segments_sent += 1;
    net.send_from(conn.node, pkt, sim);
}

fn send_ack(conn: &mut TcpConn, sim: &mut Simulator, net: &mut dyn NetApi) {
    let seg = TcpSegment::ack(conn.tcb.snd_nxt, conn.rcv_nxt);
    let pkt = make_packet(conn, seg, net, sim.now());
    conn.pending_acks = 0;
    conn.delack_gen += 1;
    net.send_from(conn.node, pkt, sim);
}

fn arm_rto(conn: &mut TcpConn, sim: &mut Simulator) {
    conn.rto_gen += 1;
    conn.rto_armed = true;
    sim.schedule_in(
        conn.rto,
        TcpRto {
            conn_id: conn.id,
            token: conn.rto_gen,
        },
    );
}

fn cancel_rto(conn: &mut TcpConn) {
    conn.rto_gen += 1;
    conn.rto_armed = false;
}

fn trace_cwnd(conn: &TcpConn, now: SimTime, net: &mut dyn NetApi) {
    net.trace_tcp_cwnd(
        now,
        conn.id,
        conn.tcb.cwnd,
        conn.tcb.ssthresh,
        conn.bytes_in_flight(),
    );
}

fn with_tcp_stack<F>(world: &mut dyn World, f: F)
where
    F: FnOnce(&mut TcpStack, &mut dyn NetApi),
{
    let w = world
        .as_any_mut()
        .downcast_mut::<NetWorld>()
        .expect("world must be NetWorld");
    // 规避同时借用 `w.net` 与 `w.net.tcp`
    let mut tcp = std::mem::take(&mut w.net.tcp);
    f(&mut tcp, &mut w.net);
    w.net.tcp = tcp;
}

/// TCP RTO 事件：令牌过期（重新装填或已取消）时忽略
#[derive(Debug)]
pub struct TcpRto {
    pub conn_id: TcpConnId,
    pub token: u64,
}

impl Event for TcpRto {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let TcpRto { conn_id, token } = *self;
        with_tcp_stack(world, |tcp, net| tcp.on_rto(conn_id, token, sim, net));
    }
}

/// 延迟 ACK 定时器
#[derive(Debug)]
pub struct TcpDelAck {
    pub conn_id: TcpConnId,
    pub token: u64,
}

impl Event for TcpDelAck {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let TcpDelAck { conn_id, token } = *self;
        with_tcp_stack(world, |tcp, net| tcp.on_delack(conn_id, token, sim, net));
    }
}
