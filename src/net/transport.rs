//! Transport-layer headers carried by packets.

/// IP protocol number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpProtocol {
    Tcp,
    Udp,
}

impl IpProtocol {
    pub fn number(self) -> u8 {
        match self {
            IpProtocol::Tcp => 6,
            IpProtocol::Udp => 17,
        }
    }
}

pub const IPV4_HEADER_BYTES: u32 = 20;
pub const UDP_HEADER_BYTES: u32 = 8;
pub const TCP_HEADER_BYTES: u32 = 20;
/// PPP framing added by point-to-point devices.
pub const PPP_HEADER_BYTES: u32 = 2;

/// Transport header of a packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    Udp,
    Tcp(TcpSegment),
}

impl Transport {
    pub fn protocol(&self) -> IpProtocol {
        match self {
            Transport::Udp => IpProtocol::Udp,
            Transport::Tcp(_) => IpProtocol::Tcp,
        }
    }

    pub fn header_bytes(&self) -> u32 {
        match self {
            Transport::Udp => UDP_HEADER_BYTES,
            Transport::Tcp(_) => TCP_HEADER_BYTES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TcpFlags {
    pub syn: bool,
    pub ack: bool,
}

/// Simplified TCP segment. Sequence numbers are 64-bit stream offsets and never wrap.
///
/// `ack` is only meaningful when `flags.ack` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpSegment {
    pub flags: TcpFlags,
    pub seq: u64,
    pub ack: u64,
    pub len: u32,
}

impl TcpSegment {
    pub fn syn(seq: u64) -> Self {
        Self {
            flags: TcpFlags { syn: true, ack: false },
            seq,
            ack: 0,
            len: 0,
        }
    }

    pub fn syn_ack(seq: u64, ack: u64) -> Self {
        Self {
            flags: TcpFlags { syn: true, ack: true },
            seq,
            ack,
            len: 0,
        }
    }

    pub fn ack(seq: u64, ack: u64) -> Self {
        Self {
            flags: TcpFlags { syn: false, ack: true },
            seq,
            ack,
            len: 0,
        }
    }

    pub fn data(seq: u64, ack: u64, len: u32) -> Self {
        Self {
            flags: TcpFlags { syn: false, ack: true },
            seq,
            ack,
            len,
        }
    }

    pub fn is_pure_ack(&self) -> bool {
        !self.flags.syn && self.flags.ack && self.len == 0
    }

    /// Short description used by packet metadata in the animation trace.
    pub fn describe(&self) -> String {
        let mut flags = Vec::new();
        if self.flags.syn {
            flags.push("SYN");
        }
        if self.flags.ack {
            flags.push("ACK");
        }
        format!(
            "[{}] Seq={} Ack={} Len={}",
            flags.join("|"),
            self.seq,
            self.ack,
            self.len
        )
    }
}
