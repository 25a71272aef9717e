//! 数据模型

mod analysis;

pub use analysis::*;
