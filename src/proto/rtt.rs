//! RTT 估计与 RTO 计算（均值/偏差法）

use crate::sim::SimTime;

#[derive(Debug, Clone)]
pub struct RttEstimator {
    srtt: Option<SimTime>,
    rttvar: SimTime,
    min_rtt: Option<SimTime>,
    samples: u64,
}

impl Default for RttEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl RttEstimator {
    pub fn new() -> Self {
        Self {
            srtt: None,
            rttvar: SimTime::ZERO,
            min_rtt: None,
            samples: 0,
        }
    }

    /// srtt = 7/8 srtt + 1/8 r；rttvar = 3/4 rttvar + 1/4 |srtt - r|
    pub fn update(&mut self, sample: SimTime) {
        self.samples += 1;
        self.min_rtt = Some(self.min_rtt.map_or(sample, |m| m.min(sample)));
        match self.srtt {
            None => {
                self.srtt = Some(sample);
                self.rttvar = SimTime(sample.0 / 2);
            }
            Some(srtt) => {
                let err = srtt.0.abs_diff(sample.0);
                self.rttvar = SimTime((3 * self.rttvar.0 + err) / 4);
                self.srtt = Some(SimTime((7 * srtt.0 + sample.0) / 8));
            }
        }
    }

    pub fn srtt(&self) -> Option<SimTime> {
        self.srtt
    }

    pub fn rttvar(&self) -> SimTime {
        self.rttvar
    }

    pub fn min_rtt(&self) -> Option<SimTime> {
        self.min_rtt
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// RTO = srtt + max(G, 4*rttvar)，夹在 [min_rto, max_rto]；无样本时返回 `initial`
    pub fn rto(&self, initial: SimTime, granularity: SimTime, min_rto: SimTime, max_rto: SimTime) -> SimTime {
        let Some(srtt) = self.srtt else {
            return initial.clamp(min_rto, max_rto.max(min_rto));
        };
        let var = SimTime(self.rttvar.0.saturating_mul(4)).max(granularity);
        srtt.saturating_add(var).clamp(min_rto, max_rto.max(min_rto))
    }
}
