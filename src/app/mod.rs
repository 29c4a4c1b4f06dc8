//! 应用层
//!
//! 应用挂在节点上，由 `AppStart` / `AppStop` 事件启停，定时器通过 `AppTimer`
//! 回调（带令牌，过期令牌直接忽略）。传输层交付的数据经 `AppRegistry::on_delivery`
//! 分发给对应的接收应用。

mod onoff;
mod sink;

use std::any::Any;
use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::SimError;
use crate::net::{Delivery, NetWorld, Network, NodeId};
use crate::sim::{Event, SimTime, Simulator, World};

pub use onoff::{AppProtocol, OnOffApp, OnOffConfig};
pub use sink::PacketSinkApp;

pub type AppId = usize;

/// 应用生命周期回调
pub trait Application: fmt::Debug + Send {
    fn name(&self) -> &str;

    fn node(&self) -> NodeId;

    fn start(&mut self, id: AppId, sim: &mut Simulator, net: &mut Network) -> Result<(), SimError>;

    fn stop(&mut self, sim: &mut Simulator, net: &mut Network);

    fn on_timer(&mut self, _id: AppId, _token: u64, _sim: &mut Simulator, _net: &mut Network) {}

    /// 传输层向本节点交付了数据；不相关时直接返回
    fn on_delivery(&mut self, _delivery: &Delivery) {}

    fn report(&self) -> AppReport;

    fn as_any(&self) -> &dyn Any;
}

/// 应用运行结果摘要
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "app", rename_all = "snake_case")]
pub enum AppReport {
    OnOff {
        node: NodeId,
        remote: String,
        protocol: AppProtocol,
        packets_sent: u64,
        bytes_sent: u64,
        write_failures: u64,
    },
    Sink {
        node: NodeId,
        port: u16,
        protocol: AppProtocol,
        rx_packets: u64,
        rx_bytes: u64,
        first_rx: Option<SimTime>,
        last_rx: Option<SimTime>,
    },
}

#[derive(Debug)]
struct AppSlot {
    app: Box<dyn Application>,
    start: SimTime,
    stop: SimTime,
    running: bool,
}

#[derive(Debug, Default)]
pub struct AppRegistry {
    slots: Vec<AppSlot>,
}

impl AppRegistry {
    /// 安装应用并调度启停事件
    pub fn install(
        &mut self,
        app: Box<dyn Application>,
        start: SimTime,
        stop: SimTime,
        sim: &mut Simulator,
    ) -> AppId {
        let id = self.slots.len();
        debug!(id, name = app.name(), node = %app.node(), %start, %stop, "安装应用");
        self.slots.push(AppSlot {
            app,
            start,
            stop,
            running: false,
        });
        sim.schedule(start, AppStart { app: id });
        sim.schedule(stop, AppStop { app: id });
        id
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, id: AppId) -> Option<&dyn Application> {
        self.slots.get(id).map(|s| s.app.as_ref())
    }

    /// 取具体类型的应用
    pub fn get_as<T: Application + 'static>(&self, id: AppId) -> Option<&T> {
        self.get(id)?.as_any().downcast_ref::<T>()
    }

    pub fn window(&self, id: AppId) -> Option<(SimTime, SimTime)> {
        self.slots.get(id).map(|s| (s.start, s.stop))
    }

    pub fn is_running(&self, id: AppId) -> bool {
        self.slots.get(id).is_some_and(|s| s.running)
    }

    pub fn on_delivery(&mut self, delivery: &Delivery) {
        for slot in self.slots.iter_mut().filter(|s| s.running) {
            if slot.app.node() == delivery.node {
                slot.app.on_delivery(delivery);
            }
        }
    }

    pub fn reports(&self) -> Vec<AppReport> {
        self.slots.iter().map(|s| s.app.report()).collect()
    }

    fn start(&mut self, id: AppId, sim: &mut Simulator, net: &mut Network) {
        let Some(slot) = self.slots.get_mut(id) else {
            return;
        };
        if slot.running || sim.now() >= slot.stop {
            return;
        }
        match slot.app.start(id, sim, net) {
            Ok(()) => {
                slot.running = true;
                info!(id, name = slot.app.name(), now = %sim.now(), "应用启动");
            }
            Err(e) => warn!(id, name = slot.app.name(), error = %e, "应用启动失败"),
        }
    }

    fn stop(&mut self, id: AppId, sim: &mut Simulator, net: &mut Network) {
        let Some(slot) = self.slots.get_mut(id) else {
            return;
        };
        if !slot.running {
            return;
        }
        slot.running = false;
        slot.app.stop(sim, net);
        info!(id, name = slot.app.name(), now = %sim.now(), "应用停止");
    }

    fn timer(&mut self, id: AppId, token: u64, sim: &mut Simulator, net: &mut Network) {
        if let Some(slot) = self.slots.get_mut(id).filter(|s| s.running) {
            slot.app.on_timer(id, token, sim, net);
        }
    }
}

fn net_world(world: &mut dyn World) -> &mut NetWorld {
    world
        .as_any_mut()
        .downcast_mut::<NetWorld>()
        .expect("world must be NetWorld")
}

#[derive(Debug)]
pub struct AppStart {
    pub app: AppId,
}

impl Event for AppStart {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let NetWorld { net, apps } = net_world(world);
        apps.start(self.app, sim, net);
    }
}

#[derive(Debug)]
pub struct AppStop {
    pub app: AppId,
}

impl Event for AppStop {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let NetWorld { net, apps } = net_world(world);
        apps.stop(self.app, sim, net);
    }
}

/// 应用定时器；`token` 与应用当前令牌不一致时忽略
#[derive(Debug)]
pub struct AppTimer {
    pub app: AppId,
    pub token: u64,
}

impl Event for AppTimer {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let AppTimer { app, token } = *self;
        let NetWorld { net, apps } = net_world(world);
        apps.timer(app, token, sim, net);
    }
}
