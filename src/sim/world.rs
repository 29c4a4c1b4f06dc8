//! 世界 trait

use super::simulator::Simulator;
use std::any::Any;

/// 仿真世界：事件通过 downcast 访问具体的状态（网络、应用、监控器）。
pub trait World: Any {
    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn as_any(&self) -> &dyn Any;

    /// 每个事件执行完后回调一次
    fn on_tick(&mut self, _sim: &mut Simulator) {}
}
