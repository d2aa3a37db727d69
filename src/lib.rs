//! 两资产恒定乘积做市商 (x·y=k) 的账本核心
//!
//! 池子持有 base 与 quote 两侧储备，按 0.3% 手续费的恒定乘积公式定价，
//! 并用流动性份额记录每个提供者的所有权。资产的实际转移由外部账本完成。

pub mod amm;
pub mod config;
pub mod engine;
pub mod events;
pub mod ledger;
pub mod utils;

// 重新导出主要的公共接口
pub use amm::{
    AmmError, AmmResult, DepositOutcome, ErrorKind, PoolState, PriceInfo, Reserves, SeedOutcome,
    SwapDirection, SwapOutcome, WithdrawOutcome, FEE_DENOMINATOR, FEE_NUMERATOR,
};
pub use config::{ConfigManager, EngineConfig};
pub use engine::{AmmEngine, CustodyReport, SwapPreview};
pub use events::{EventBus, EventKind, EventStream, PoolEvent};
pub use ledger::{BaseLedger, InMemoryBaseLedger, InMemoryQuoteLedger, QuoteLedger};

/// 初始化日志系统
///
/// `tracing` 事件通过 `log` 转发给 `env_logger`，默认级别 info。重复调用无副作用。
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
