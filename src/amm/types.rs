//! AMM账本相关类型定义

use ethers::types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 手续费分子 (0.3% = 3 / 1000)
pub const FEE_NUMERATOR: u64 = 3;

/// 手续费分母
pub const FEE_DENOMINATOR: u64 = 1000;

/// 池子当前储备量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reserves {
    pub base: U256,
    pub quote: U256,
}

impl Reserves {
    pub fn new(base: U256, quote: U256) -> Self {
        Self { base, quote }
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_zero() && self.quote.is_zero()
    }
}

impl fmt::Display for Reserves {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "base={}, quote={}", self.base, self.quote)
    }
}

/// 交换方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwapDirection {
    /// 输入 base，输出 quote
    BaseToQuote,
    /// 输入 quote，输出 base
    QuoteToBase,
}

impl SwapDirection {
    /// 按方向选出 (输入侧储备, 输出侧储备)
    pub fn split(&self, reserves: &Reserves) -> (U256, U256) {
        match self {
            Self::BaseToQuote => (reserves.base, reserves.quote),
            Self::QuoteToBase => (reserves.quote, reserves.base),
        }
    }
}

impl fmt::Display for SwapDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BaseToQuote => write!(f, "base→quote"),
            Self::QuoteToBase => write!(f, "quote→base"),
        }
    }
}

/// 初始注资结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedOutcome {
    pub base_amount: U256,
    pub quote_amount: U256,
    pub shares_minted: U256,
}

/// 交换结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapOutcome {
    pub direction: SwapDirection,
    pub amount_in: U256,
    pub amount_out: U256,
}

/// 添加流动性结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositOutcome {
    pub base_amount: U256,
    /// 从调用者拉取的 quote 数量
    pub quote_amount: U256,
    pub shares_minted: U256,
}

/// 移除流动性结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawOutcome {
    pub shares_burned: U256,
    pub base_amount: U256,
    pub quote_amount: U256,
}

/// 价格查询结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceInfo {
    pub price: f64,         // 1 base 可换的 quote (不含手续费)
    pub inverse_price: f64, // 反向价格
    pub reserves: Reserves,
    pub total_shares: U256,
}

impl PriceInfo {
    pub fn new(reserves: Reserves, total_shares: U256) -> Self {
        let price = if reserves.base.is_zero() {
            0.0
        } else {
            crate::utils::math::to_f64(reserves.quote) / crate::utils::math::to_f64(reserves.base)
        };

        let inverse_price = if price == 0.0 { 0.0 } else { 1.0 / price };

        Self {
            price,
            inverse_price,
            reserves,
            total_shares,
        }
    }
}

/// 错误类别，便于调用方按类型匹配
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    InvalidInput,
    AlreadySeeded,
    NotSeeded,
    InsufficientAllowance,
    InsufficientShares,
    InsufficientReserves,
    DivisionByZero,
    TransferFailed,
    Overflow,
    InvariantViolation,
}

/// AMM账本错误类型
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmmError {
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("pool is already seeded")]
    AlreadySeeded,

    #[error("pool is not seeded yet")]
    NotSeeded,

    #[error("insufficient allowance: required {required}, approved {available}")]
    InsufficientAllowance { required: U256, available: U256 },

    #[error("insufficient shares: requested {requested}, owned {available}")]
    InsufficientShares { requested: U256, available: U256 },

    #[error("insufficient reserves: required {required}, available {available}")]
    InsufficientReserves { required: U256, available: U256 },

    #[error("division by zero in reserve arithmetic")]
    DivisionByZero,

    #[error("transfer failed: {reason}")]
    TransferFailed { reason: String },

    #[error("arithmetic overflow")]
    Overflow,

    #[error("pool invariant violated: {reason}")]
    InvariantViolation { reason: String },
}

impl AmmError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput { reason: reason.into() }
    }

    pub fn transfer_failed(reason: impl Into<String>) -> Self {
        Self::TransferFailed { reason: reason.into() }
    }

    pub fn invariant(reason: impl Into<String>) -> Self {
        Self::InvariantViolation { reason: reason.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::AlreadySeeded => ErrorKind::AlreadySeeded,
            Self::NotSeeded => ErrorKind::NotSeeded,
            Self::InsufficientAllowance { .. } => ErrorKind::InsufficientAllowance,
            Self::InsufficientShares { .. } => ErrorKind::InsufficientShares,
            Self::InsufficientReserves { .. } => ErrorKind::InsufficientReserves,
            Self::DivisionByZero => ErrorKind::DivisionByZero,
            Self::TransferFailed { .. } => ErrorKind::TransferFailed,
            Self::Overflow => ErrorKind::Overflow,
            Self::InvariantViolation { .. } => ErrorKind::InvariantViolation,
        }
    }
}

pub type AmmResult<T> = Result<T, AmmError>;
