//! 拓扑构建辅助

pub mod dumbbell;

pub use dumbbell::{Dumbbell, DumbbellConfig};
