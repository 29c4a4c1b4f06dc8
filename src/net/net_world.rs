//! 网络世界实现
//!
//! 持有网络（含协议栈、流监控、动画）与应用表，供事件 downcast 使用。

use super::network::Network;
use crate::app::AppRegistry;
use crate::sim::World;
use std::any::Any;

#[derive(Default)]
pub struct NetWorld {
    pub net: Network,
    pub apps: AppRegistry,
}

impl World for NetWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
