//! IPv4 地址分配
//!
//! 给点对点链路两端的设备分配同一子网内的连续主机地址，
//! 每条链路用完后切换到下一个子网（例如 10.1.1.0/24 -> 10.1.2.0/24）。

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// 绑定在设备上的 IPv4 地址与掩码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ipv4Interface {
    pub addr: Ipv4Addr,
    pub mask: Ipv4Addr,
}

impl Ipv4Interface {
    pub fn new(addr: Ipv4Addr, mask: Ipv4Addr) -> Self {
        Self { addr, mask }
    }

    pub fn network(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.addr) & u32::from(self.mask))
    }

    pub fn prefix_len(&self) -> u32 {
        u32::from(self.mask).count_ones()
    }

    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        let m = u32::from(self.mask);
        (u32::from(ip) & m) == (u32::from(self.addr) & m)
    }
}

/// 顺序地址分配器
#[derive(Debug, Clone)]
pub struct Ipv4Allocator {
    network: u32,
    mask: u32,
    next_host: u32,
}

impl Ipv4Allocator {
    pub fn new(base: Ipv4Addr, mask: Ipv4Addr) -> Result<Self, ConfigError> {
        let m = u32::from(mask);
        // 掩码必须是连续的高位 1
        if m.leading_ones() + m.trailing_zeros() != 32 {
            return Err(ConfigError::BadMask(mask));
        }
        Ok(Self {
            network: u32::from(base) & m,
            mask: m,
            next_host: 1,
        })
    }

    pub fn network(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.network)
    }

    pub fn mask(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.mask)
    }

    /// 当前子网可用的最大主机号（排除广播地址）
    fn max_host(&self) -> u32 {
        let host_bits = !self.mask;
        host_bits.saturating_sub(1)
    }

    /// 分配下一个主机地址
    pub fn next_addr(&mut self) -> Result<Ipv4Interface, ConfigError> {
        if self.next_host > self.max_host() {
            return Err(ConfigError::HostsExhausted {
                network: self.network(),
                mask: self.mask(),
            });
        }
        let addr = Ipv4Addr::from(self.network | self.next_host);
        self.next_host += 1;
        Ok(Ipv4Interface::new(addr, self.mask()))
    }

    /// 连续分配 `n` 个地址
    pub fn assign(&mut self, n: usize) -> Result<Vec<Ipv4Interface>, ConfigError> {
        (0..n).map(|_| self.next_addr()).collect()
    }

    /// 切换到下一个同掩码子网，主机号从 1 重新开始
    pub fn new_network(&mut self) -> Result<Ipv4Addr, ConfigError> {
        let step = (!self.mask).wrapping_add(1);
        let next = self
            .network
            .checked_add(step)
            .filter(|_| step != 0)
            .ok_or(ConfigError::NetworksExhausted(self.network()))?;
        self.network = next;
        self.next_host = 1;
        Ok(self.network())
    }
}
