//! 定宽直方图

use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Debug, Clone)]
pub struct Histogram {
    bin_width: f64,
    bins: BTreeMap<u64, u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistogramBin {
    pub index: u64,
    pub start: f64,
    pub width: f64,
    pub count: u64,
}

impl Histogram {
    pub fn new(bin_width: f64) -> Self {
        Self {
            bin_width: if bin_width > 0.0 { bin_width } else { 1.0 },
            bins: BTreeMap::new(),
        }
    }

    pub fn add_value(&mut self, value: f64) {
        let idx = if value > 0.0 {
            (value / self.bin_width).floor() as u64
        } else {
            0
        };
        *self.bins.entry(idx).or_insert(0) += 1;
    }

    pub fn count(&self, index: u64) -> u64 {
        self.bins.get(&index).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.bins.values().sum()
    }

    pub fn bin_width(&self) -> f64 {
        self.bin_width
    }

    pub fn bins(&self) -> Vec<HistogramBin> {
        self.bins
            .iter()
            .map(|(&index, &count)| HistogramBin {
                index,
                start: index as f64 * self.bin_width,
                width: self.bin_width,
                count,
            })
            .collect()
    }
}
