//! 通用工具模块

pub mod math;

pub use math::*;
