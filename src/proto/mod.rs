//! 传输层/协议模块
//!
//! UDP 与简化 TCP（NewReno / Vegas 拥塞控制）。

pub mod cc;
pub mod rtt;
pub mod tcp;
pub mod udp;
