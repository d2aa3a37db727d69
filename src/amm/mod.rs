//! AMM账本核心
//!
//! 两资产恒定乘积池：储备状态、定价和流动性份额记账

pub mod types;
pub mod pricing;
pub mod state;
pub mod liquidity;

pub use types::*;
pub use pricing::*;
pub use state::*;
pub use liquidity::*;
