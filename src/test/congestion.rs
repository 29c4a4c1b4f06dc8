use crate::proto::cc::{CaState, CongestionOps, NewReno, TcpCb, TcpVariant, Vegas, VegasParams};
use crate::proto::rtt::RttEstimator;
use crate::sim::SimTime;

const MSS: u64 = 536;

fn tcb(cwnd_segs: u64, ssthresh: u64) -> TcpCb {
    TcpCb {
        cwnd: cwnd_segs * MSS,
        ssthresh,
        segment_size: MSS as u32,
        snd_una: 0,
        snd_nxt: cwnd_segs * MSS,
        ca_state: CaState::Open,
    }
}

/// 跑完一个 Vegas 周期：若干个 RTT 样本后，snd_una 越过周期起点
fn vegas_round(v: &mut Vegas, cb: &mut TcpCb, rtt: SimTime, samples: u32) {
    for _ in 0..samples {
        v.pkts_acked(cb, 1, Some(rtt));
    }
    cb.snd_una = cb.snd_nxt;
    cb.snd_nxt += cb.cwnd;
    v.increase_window(cb, 1);
}

#[test]
fn newreno_slow_start_grows_one_mss_per_ack() {
    let mut cb = tcb(10, u64::MAX);
    let mut cc = NewReno;
    cc.increase_window(&mut cb, 1);
    assert_eq!(cb.cwnd, 11 * MSS);
    // 一个 ACK 覆盖多个段也只加一个 MSS
    cc.increase_window(&mut cb, 4);
    assert_eq!(cb.cwnd, 12 * MSS);
}

#[test]
fn newreno_congestion_avoidance_grows_by_mss_squared_over_cwnd() {
    let mut cb = tcb(10, 5 * MSS);
    NewReno.increase_window(&mut cb, 1);
    assert_eq!(cb.cwnd, 10 * MSS + MSS * MSS / (10 * MSS));
}

#[test]
fn newreno_leftover_acks_spill_into_congestion_avoidance() {
    let mut cb = tcb(4, 5 * MSS);
    NewReno.increase_window(&mut cb, 3);
    assert_eq!(cb.cwnd, 5 * MSS + MSS * MSS / (5 * MSS));
    assert!(!cb.in_slow_start());
}

#[test]
fn newreno_ssthresh_halves_flight_with_two_segment_floor() {
    let cb = tcb(10, u64::MAX);
    assert_eq!(NewReno.ssthresh(&cb, 10_000), 5_000);
    assert_eq!(NewReno.ssthresh(&cb, 500), 2 * MSS);
}

#[test]
fn vegas_grows_linearly_when_backlog_below_alpha() {
    let mut v = Vegas::new(VegasParams::default());
    let mut cb = tcb(10, 5 * MSS);
    v.on_state(&cb, CaState::Open);

    vegas_round(&mut v, &mut cb, SimTime::from_millis(10), 3);
    assert_eq!(v.base_rtt(), Some(SimTime::from_millis(10)));
    assert_eq!(cb.cwnd, 11 * MSS);
    assert_eq!(cb.ssthresh, 3 * cb.cwnd / 4);
}

#[test]
fn vegas_holds_window_between_alpha_and_beta() {
    let mut v = Vegas::new(VegasParams::default());
    let mut cb = tcb(10, 5 * MSS);
    v.on_state(&cb, CaState::Open);
    vegas_round(&mut v, &mut cb, SimTime::from_millis(10), 3);
    let cwnd = cb.cwnd;

    // 11 * 10/13 = 8.46 -> 目标 8 段，积压 3 段
    vegas_round(&mut v, &mut cb, SimTime::from_millis(13), 3);
    assert_eq!(cb.cwnd, cwnd);
}

#[test]
fn vegas_shrinks_window_when_backlog_above_beta() {
    let mut v = Vegas::new(VegasParams::default());
    let mut cb = tcb(10, 5 * MSS);
    v.on_state(&cb, CaState::Open);
    vegas_round(&mut v, &mut cb, SimTime::from_millis(10), 3);
    assert_eq!(cb.cwnd, 11 * MSS);

    // RTT 翻倍：目标 5 段，积压 6 段 > beta
    vegas_round(&mut v, &mut cb, SimTime::from_millis(20), 3);
    assert_eq!(cb.cwnd, 10 * MSS);
    assert!(!cb.in_slow_start());
}

#[test]
fn vegas_leaves_slow_start_when_backlog_exceeds_gamma() {
    let mut v = Vegas::new(VegasParams::default());
    let mut cb = tcb(10, u64::MAX);
    v.on_state(&cb, CaState::Open);

    vegas_round(&mut v, &mut cb, SimTime::from_millis(10), 3);
    assert_eq!(cb.cwnd, 11 * MSS);
    assert!(cb.in_slow_start());

    vegas_round(&mut v, &mut cb, SimTime::from_millis(20), 3);
    assert_eq!(cb.cwnd, 6 * MSS);
    assert_eq!(cb.ssthresh, 5 * MSS);
    assert!(!cb.in_slow_start());
}

#[test]
fn vegas_falls_back_to_reno_with_too_few_samples() {
    let mut v = Vegas::new(VegasParams::default());
    let mut cb = tcb(10, 5 * MSS);
    v.on_state(&cb, CaState::Open);

    vegas_round(&mut v, &mut cb, SimTime::from_millis(10), 2);
    assert_eq!(cb.cwnd, 10 * MSS + MSS * MSS / (10 * MSS));
}

#[test]
fn vegas_is_disabled_outside_open_state() {
    let mut v = Vegas::new(VegasParams::default());
    let mut cb = tcb(10, u64::MAX);
    v.on_state(&cb, CaState::Recovery);
    assert!(!v.is_active());

    v.increase_window(&mut cb, 1);
    assert_eq!(cb.cwnd, 11 * MSS);

    v.on_state(&cb, CaState::Open);
    assert!(v.is_active());
}

#[test]
fn vegas_ssthresh_is_one_segment_below_cwnd() {
    let v = Vegas::new(VegasParams::default());
    assert_eq!(v.ssthresh(&tcb(10, u64::MAX), 0), 9 * MSS);
    assert_eq!(v.ssthresh(&tcb(2, u64::MAX), 0), 2 * MSS);
}

#[test]
fn vegas_ignores_zero_rtt_samples() {
    let mut v = Vegas::new(VegasParams::default());
    let cb = tcb(10, u64::MAX);
    v.pkts_acked(&cb, 1, Some(SimTime::ZERO));
    v.pkts_acked(&cb, 1, None);
    assert_eq!(v.base_rtt(), None);
}

#[test]
fn variant_builds_named_algorithm() {
    assert_eq!(TcpVariant::default(), TcpVariant::Vegas);
    assert_eq!(TcpVariant::Vegas.build(VegasParams::default()).name(), "Vegas");
    assert_eq!(TcpVariant::NewReno.build(VegasParams::default()).name(), "NewReno");
    let v: TcpVariant = serde_json::from_str("\"new_reno\"").unwrap();
    assert_eq!(v, TcpVariant::NewReno);
}

#[test]
fn rtt_estimator_smooths_samples() {
    let mut est = RttEstimator::new();
    est.update(SimTime::from_millis(100));
    assert_eq!(est.srtt(), Some(SimTime::from_millis(100)));
    assert_eq!(est.rttvar(), SimTime::from_millis(50));

    est.update(SimTime::from_millis(200));
    assert_eq!(est.srtt(), Some(SimTime::from_micros(112_500)));
    assert_eq!(est.rttvar(), SimTime::from_micros(62_500));
    assert_eq!(est.min_rtt(), Some(SimTime::from_millis(100)));
    assert_eq!(est.samples(), 2);
}

#[test]
fn rto_is_clamped_and_defaults_to_initial() {
    let g = SimTime::from_millis(1);
    let min = SimTime::from_secs(1);
    let max = SimTime::from_secs(60);
    let mut est = RttEstimator::new();
    assert_eq!(est.rto(SimTime::from_secs(1), g, min, max), SimTime::from_secs(1));

    est.update(SimTime::from_millis(100));
    // 100ms + 4*50ms = 300ms，低于下限
    assert_eq!(est.rto(SimTime::from_secs(1), g, min, max), min);
    assert_eq!(est.rto(SimTime::from_secs(1), g, SimTime::ZERO, max), SimTime::from_millis(300));
}
