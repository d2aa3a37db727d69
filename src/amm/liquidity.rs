//! 流动性记账
//!
//! 每个 `plan_*` 函数只读取 `PoolState`，计算出结果和 `PoolDelta`，
//! 不做任何修改。调用方在外部转账全部成功后再提交变更。

use super::pricing::{k_non_decreasing, quote_output};
use super::state::PoolState;
use super::types::*;
use crate::utils::math::mul_div_floor;
use ethers::types::{Address, U256};

/// 份额变化
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareChange {
    Mint { holder: Address, amount: U256 },
    Burn { holder: Address, amount: U256 },
}

/// 一次操作对池子的完整变更
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolDelta {
    pub base_in: U256,
    pub quote_in: U256,
    pub base_out: U256,
    pub quote_out: U256,
    pub shares: Option<ShareChange>,
}

impl PoolDelta {
    /// 在副本上应用变更并校验不变量，返回新状态；原状态不受影响
    pub fn apply_to(&self, state: &PoolState) -> AmmResult<PoolState> {
        let mut next = state.clone();
        next.credit_reserves(self.base_in, self.quote_in)?;
        next.debit_reserves(self.base_out, self.quote_out)?;

        match self.shares {
            Some(ShareChange::Mint { holder, amount }) => next.mint(holder, amount)?,
            Some(ShareChange::Burn { holder, amount }) => next.burn(holder, amount)?,
            None => {}
        }

        next.check_invariants()?;
        Ok(next)
    }
}

/// 规划结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan<T> {
    pub outcome: T,
    pub delta: PoolDelta,
}

/// 初始注资：份额数量等于 base 数量
pub fn plan_seed(
    state: &PoolState,
    holder: Address,
    base_amount: U256,
    quote_amount: U256,
) -> AmmResult<Plan<SeedOutcome>> {
    if state.is_seeded() {
        return Err(AmmError::AlreadySeeded);
    }
    if base_amount.is_zero() || quote_amount.is_zero() {
        return Err(AmmError::invalid_input("seed amounts must both be non-zero"));
    }

    Ok(Plan {
        outcome: SeedOutcome {
            base_amount,
            quote_amount,
            shares_minted: base_amount,
        },
        delta: PoolDelta {
            base_in: base_amount,
            quote_in: quote_amount,
            shares: Some(ShareChange::Mint {
                holder,
                amount: base_amount,
            }),
            ..Default::default()
        },
    })
}

/// 交换：用交易前储备量定价，k 不允许减少
pub fn plan_swap(state: &PoolState, direction: SwapDirection, amount_in: U256) -> AmmResult<Plan<SwapOutcome>> {
    if !state.is_seeded() {
        return Err(AmmError::NotSeeded);
    }
    if amount_in.is_zero() {
        return Err(AmmError::invalid_input("swap input must be non-zero"));
    }

    let before = state.current_reserves();
    let (reserve_in, reserve_out) = direction.split(&before);
    let amount_out = quote_output(amount_in, reserve_in, reserve_out)?;

    if amount_out.is_zero() {
        return Err(AmmError::invalid_input("swap output rounds down to zero"));
    }
    if amount_out >= reserve_out {
        return Err(AmmError::InsufficientReserves {
            required: amount_out,
            available: reserve_out,
        });
    }

    let delta = match direction {
        SwapDirection::BaseToQuote => PoolDelta {
            base_in: amount_in,
            quote_out: amount_out,
            ..Default::default()
        },
        SwapDirection::QuoteToBase => PoolDelta {
            quote_in: amount_in,
            base_out: amount_out,
            ..Default::default()
        },
    };

    let after = delta.apply_to(state)?.current_reserves();
    if !k_non_decreasing(&before, &after) {
        // 输入太小，截断后的手续费不足以抵消除法取整
        return Err(AmmError::invariant(format!(
            "swap of {} would shrink k ({} -> {})",
            amount_in, before, after
        )));
    }

    Ok(Plan {
        outcome: SwapOutcome {
            direction,
            amount_in,
            amount_out,
        },
        delta,
    })
}

/// 按当前比例添加流动性
///
/// 需要的 quote 为 `floor(base * quote_reserve / base_reserve) + 1`，
/// 多出的 1 偏向池子；铸造份额为 `floor(base * total_shares / base_reserve)`。
pub fn plan_deposit(state: &PoolState, holder: Address, base_amount: U256) -> AmmResult<Plan<DepositOutcome>> {
    if !state.is_seeded() {
        return Err(AmmError::NotSeeded);
    }
    if base_amount.is_zero() {
        return Err(AmmError::invalid_input("deposit amount must be non-zero"));
    }

    let reserves = state.current_reserves();
    let quote_amount = mul_div_floor(base_amount, reserves.quote, reserves.base)?
        .checked_add(U256::one())
        .ok_or(AmmError::Overflow)?;
    let shares_minted = mul_div_floor(base_amount, state.total_shares(), reserves.base)?;

    if shares_minted.is_zero() {
        return Err(AmmError::invalid_input("deposit too small to mint any shares"));
    }

    Ok(Plan {
        outcome: DepositOutcome {
            base_amount,
            quote_amount,
            shares_minted,
        },
        delta: PoolDelta {
            base_in: base_amount,
            quote_in: quote_amount,
            shares: Some(ShareChange::Mint {
                holder,
                amount: shares_minted,
            }),
            ..Default::default()
        },
    })
}

/// 移除流动性：每侧返还 `shares * reserve / total_shares`
pub fn plan_withdraw(state: &PoolState, holder: Address, shares: U256) -> AmmResult<Plan<WithdrawOutcome>> {
    if shares.is_zero() {
        return Err(AmmError::invalid_input("withdrawn shares must be non-zero"));
    }

    let owned = state.current_shares(&holder);
    if shares > owned {
        return Err(AmmError::InsufficientShares {
            requested: shares,
            available: owned,
        });
    }

    let reserves = state.current_reserves();
    let total = state.total_shares();
    let base_amount = mul_div_floor(shares, reserves.base, total)?;
    let quote_amount = mul_div_floor(shares, reserves.quote, total)?;

    Ok(Plan {
        outcome: WithdrawOutcome {
            shares_burned: shares,
            base_amount,
            quote_amount,
        },
        delta: PoolDelta {
            base_out: base_amount,
            quote_out: quote_amount,
            shares: Some(ShareChange::Burn { holder, amount: shares }),
            ..Default::default()
        },
    })
}
