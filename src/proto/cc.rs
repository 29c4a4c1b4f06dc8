//! 拥塞控制算法
//!
//! `CongestionOps` 由 TCP 发送端在收到 ACK、进入/退出丢包恢复时调用。
//! NewReno：慢启动 + 拥塞避免。Vegas：基于 RTT 差值估计队列积压，
//! 每个 RTT 调整一次窗口；丢包恢复期间退回 NewReno 行为。

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::sim::SimTime;

/// 拥塞状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaState {
    Open,
    Disorder,
    Recovery,
    Loss,
}

/// 发送端控制块中拥塞控制可见的部分
#[derive(Debug, Clone)]
pub struct TcpCb {
    pub cwnd: u64,
    pub ssthresh: u64,
    pub segment_size: u32,
    pub snd_una: u64,
    pub snd_nxt: u64,
    pub ca_state: CaState,
}

impl TcpCb {
    pub fn mss(&self) -> u64 {
        u64::from(self.segment_size)
    }

    pub fn in_slow_start(&self) -> bool {
        self.cwnd < self.ssthresh
    }
}

pub trait CongestionOps: fmt::Debug + Send {
    fn name(&self) -> &'static str;

    /// 收到确认新数据的 ACK；`rtt` 为该 ACK 产生的 RTT 样本（Karn 规则下可能没有）
    fn pkts_acked(&mut self, _tcb: &TcpCb, _segments_acked: u32, _rtt: Option<SimTime>) {}

    /// Open 状态下收到新 ACK 时增长窗口
    fn increase_window(&mut self, tcb: &mut TcpCb, segments_acked: u32);

    /// 检测到丢包时的新 ssthresh
    fn ssthresh(&self, tcb: &TcpCb, bytes_in_flight: u64) -> u64;

    fn on_state(&mut self, _tcb: &TcpCb, _state: CaState) {}
}

/// 拥塞控制算法选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TcpVariant {
    NewReno,
    #[default]
    Vegas,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VegasParams {
    /// 积压下限（段数），低于它增大窗口
    pub alpha: u32,
    /// 积压上限（段数），高于它减小窗口
    pub beta: u32,
    /// 慢启动退出阈值（段数）
    pub gamma: u32,
}

impl Default for VegasParams {
    fn default() -> Self {
        Self {
            alpha: 2,
            beta: 4,
            gamma: 1,
        }
    }
}

impl TcpVariant {
    pub fn build(self, vegas: VegasParams) -> Box<dyn CongestionOps> {
        match self {
            TcpVariant::NewReno => Box::new(NewReno),
            TcpVariant::Vegas => Box::new(Vegas::new(vegas)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NewReno;

impl NewReno {
    /// 每个 ACK 最多增长一个 MSS，返回剩余未用的段数
    pub fn slow_start(tcb: &mut TcpCb, segments_acked: u32) -> u32 {
        if segments_acked >= 1 {
            tcb.cwnd = tcb.cwnd.saturating_add(tcb.mss());
            return segments_acked - 1;
        }
        0
    }

    /// 每个 ACK 增长 mss^2/cwnd（至少 1 字节）
    pub fn congestion_avoidance(tcb: &mut TcpCb, segments_acked: u32) {
        if segments_acked > 0 {
            let mss = tcb.mss();
            let adder = (mss.saturating_mul(mss) / tcb.cwnd.max(1)).max(1);
            tcb.cwnd = tcb.cwnd.saturating_add(adder);
        }
    }
}

impl CongestionOps for NewReno {
    fn name(&self) -> &'static str {
        "NewReno"
    }

    fn increase_window(&mut self, tcb: &mut TcpCb, mut segments_acked: u32) {
        if tcb.in_slow_start() {
            segments_acked = Self::slow_start(tcb, segments_acked);
        }
        if !tcb.in_slow_start() {
            Self::congestion_avoidance(tcb, segments_acked);
        }
    }

    fn ssthresh(&self, tcb: &TcpCb, bytes_in_flight: u64) -> u64 {
        (bytes_in_flight / 2).max(2 * tcb.mss())
    }
}

#[derive(Debug, Clone)]
pub struct Vegas {
    params: VegasParams,
    base_rtt: Option<SimTime>,
    min_rtt: Option<SimTime>,
    cnt_rtt: u32,
    doing_vegas_now: bool,
    beg_snd_nxt: u64,
}

impl Vegas {
    pub fn new(params: VegasParams) -> Self {
        Self {
            params,
            base_rtt: None,
            min_rtt: None,
            cnt_rtt: 0,
            doing_vegas_now: true,
            beg_snd_nxt: 0,
        }
    }

    pub fn base_rtt(&self) -> Option<SimTime> {
        self.base_rtt
    }

    pub fn is_active(&self) -> bool {
        self.doing_vegas_now
    }

    fn enable(&mut self, tcb: &TcpCb) {
        self.doing_vegas_now = true;
        self.beg_snd_nxt = tcb.snd_nxt;
        self.cnt_rtt = 0;
        self.min_rtt = None;
    }

    fn disable(&mut self) {
        self.doing_vegas_now = false;
    }

    fn vegas_ssthresh(tcb: &TcpCb) -> u64 {
        let mss = tcb.mss();
        tcb.ssthresh.min(tcb.cwnd.saturating_sub(mss)).max(2 * mss)
    }
}

impl CongestionOps for Vegas {
    fn name(&self) -> &'static str {
        "Vegas"
    }

    fn pkts_acked(&mut self, _tcb: &TcpCb, _segments_acked: u32, rtt: Option<SimTime>) {
        let Some(rtt) = rtt.filter(|r| r.0 > 0) else {
            return;
        };
        self.min_rtt = Some(self.min_rtt.map_or(rtt, |m| m.min(rtt)));
        self.base_rtt = Some(self.base_rtt.map_or(rtt, |m| m.min(rtt)));
        self.cnt_rtt += 1;
    }

    fn increase_window(&mut self, tcb: &mut TcpCb, segments_acked: u32) {
        if !self.doing_vegas_now {
            NewReno.increase_window(tcb, segments_acked);
            return;
        }

        if tcb.snd_una >= self.beg_snd_nxt {
            // 一个 Vegas 周期（约一个 RTT）结束
            match (self.base_rtt, self.min_rtt) {
                (Some(base), Some(rtt)) if self.cnt_rtt > 2 => {
                    let mss = tcb.mss();
                    let seg_cwnd = (tcb.cwnd / mss).max(1);
                    let target = (seg_cwnd as f64 * base.0 as f64 / rtt.0.max(1) as f64) as u64;
                    let diff = seg_cwnd.saturating_sub(target);
                    let p = self.params;

                    if diff > u64::from(p.gamma) && tcb.in_slow_start() {
                        // 慢启动过快：回到目标窗口附近并退出慢启动
                        let seg = seg_cwnd.min(target + 1).max(2);
                        tcb.cwnd = seg * mss;
                        tcb.ssthresh = Self::vegas_ssthresh(tcb);
                    } else if tcb.in_slow_start() {
                        NewReno::slow_start(tcb, segments_acked);
                    } else if diff > u64::from(p.beta) {
                        let seg = seg_cwnd.saturating_sub(1).max(2);
                        tcb.cwnd = seg * mss;
                        tcb.ssthresh = Self::vegas_ssthresh(tcb);
                    } else if diff < u64::from(p.alpha) {
                        tcb.cwnd = (seg_cwnd + 1) * mss;
                    }
                    tcb.ssthresh = tcb.ssthresh.max(3 * tcb.cwnd / 4);
                    trace!(seg_cwnd, target, diff, cwnd = tcb.cwnd, ssthresh = tcb.ssthresh, "Vegas 调整窗口");
                }
                _ => {
                    // 样本太少，不足以估计积压
                    NewReno.increase_window(tcb, segments_acked);
                }
            }
            self.beg_snd_nxt = tcb.snd_nxt;
            self.cnt_rtt = 0;
            self.min_rtt = None;
        } else if tcb.in_slow_start() {
            NewReno::slow_start(tcb, segments_acked);
        }
    }

    fn ssthresh(&self, tcb: &TcpCb, _bytes_in_flight: u64) -> u64 {
        Self::vegas_ssthresh(tcb)
    }

    fn on_state(&mut self, tcb: &TcpCb, state: CaState) {
        if state == CaState::Open {
            self.enable(tcb);
        } else {
            self.disable();
        }
    }
}
