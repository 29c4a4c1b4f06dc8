//! 事件 trait

use super::simulator::Simulator;
use super::world::World;

/// 可调度事件。`self: Box<Self>` 让事件在执行时取回自身携带的数据（packet、定时器令牌等）。
pub trait Event: Send + 'static {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World);

    /// 日志中显示的事件名
    fn label(&self) -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }
}
