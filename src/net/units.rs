//! 数据速率
//!
//! `"5Mbps"`、`"5Mb/s"`、`"1MBps"` 等写法的解析，以及串行化时延计算。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::sim::SimTime;

/// 链路或应用的数据速率（bit/s）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DataRate {
    bps: u64,
}

impl DataRate {
    pub const fn from_bps(bps: u64) -> Self {
        Self { bps }
    }

    pub const fn from_mbps(mbps: u64) -> Self {
        Self {
            bps: mbps.saturating_mul(1_000_000),
        }
    }

    pub fn bps(&self) -> u64 {
        self.bps
    }

    /// 发送 `bytes` 字节所需时间：ceil(bytes*8 / bps) 秒 -> 纳秒
    pub fn tx_time(&self, bytes: u32) -> SimTime {
        self.bits_time(u64::from(bytes).saturating_mul(8))
    }

    /// 发送 `bits` 比特所需时间（向上取整到纳秒）
    pub fn bits_time(&self, bits: u64) -> SimTime {
        if self.bps == 0 {
            return SimTime(u64::MAX / 4);
        }
        let bps = self.bps as u128;
        let nanos = ((bits as u128).saturating_mul(1_000_000_000) + (bps - 1)) / bps;
        SimTime(nanos.min(u64::MAX as u128) as u64)
    }

    /// `dt` 时间内以该速率能发送的比特数（向下取整）
    pub fn bits_in(&self, dt: SimTime) -> u64 {
        let bits = (self.bps as u128).saturating_mul(dt.0 as u128) / 1_000_000_000;
        bits.min(u64::MAX as u128) as u64
    }
}

impl fmt::Display for DataRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.bps;
        if b != 0 && b % 1_000_000_000 == 0 {
            write!(f, "{}Gbps", b / 1_000_000_000)
        } else if b != 0 && b % 1_000_000 == 0 {
            write!(f, "{}Mbps", b / 1_000_000)
        } else if b != 0 && b % 1_000 == 0 {
            write!(f, "{}kbps", b / 1_000)
        } else {
            write!(f, "{}bps", b)
        }
    }
}

impl FromStr for DataRate {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseError::Empty);
        }
        let split = s
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(s.len());
        let (num, unit) = s.split_at(split);
        let value: f64 = num
            .parse()
            .map_err(|_| ParseError::Number(s.to_string()))?;

        let unit = unit.trim();
        // 大写 B 表示字节
        let (prefix, per_byte) = if let Some(p) = unit
            .strip_suffix("Bps")
            .or_else(|| unit.strip_suffix("B/s"))
        {
            (p, true)
        } else if let Some(p) = unit
            .strip_suffix("bps")
            .or_else(|| unit.strip_suffix("b/s"))
        {
            (p, false)
        } else if unit.is_empty() {
            ("", false)
        } else {
            return Err(ParseError::Unit {
                input: s.to_string(),
                unit: unit.to_string(),
            });
        };

        let mult = match prefix {
            "" => 1e0,
            "k" | "K" => 1e3,
            "M" => 1e6,
            "G" => 1e9,
            "T" => 1e12,
            "Ki" => 1024.0,
            "Mi" => 1024.0 * 1024.0,
            "Gi" => 1024.0 * 1024.0 * 1024.0,
            other => {
                return Err(ParseError::Unit {
                    input: s.to_string(),
                    unit: other.to_string(),
                })
            }
        };
        let bps = (value * mult * if per_byte { 8.0 } else { 1.0 }).round();
        if bps > u64::MAX as f64 {
            return Err(ParseError::Overflow(s.to_string()));
        }
        Ok(DataRate { bps: bps as u64 })
    }
}

impl TryFrom<String> for DataRate {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DataRate> for String {
    fn from(r: DataRate) -> String {
        r.to_string()
    }
}
