//! 数据包到达事件

use super::id::NodeId;
use super::net_world::NetWorld;
use super::packet::Packet;
use crate::sim::{Event, Simulator, World};
use tracing::trace;

/// 事件：链路把一个 packet 交给下一跳节点。
#[derive(Debug)]
pub struct DeliverPacket {
    pub to: NodeId,
    pub pkt: Packet,
}

impl Event for DeliverPacket {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let DeliverPacket { to, pkt } = *self;
        trace!(pkt_id = pkt.id, to = %to, now = %sim.now(), "📨 数据包到达节点");

        let w = world
            .as_any_mut()
            .downcast_mut::<NetWorld>()
            .expect("world must be NetWorld");
        let NetWorld { net, apps } = w;
        if let Some(delivery) = net.deliver(to, pkt, sim) {
            apps.on_delivery(&delivery);
        }
    }
}
