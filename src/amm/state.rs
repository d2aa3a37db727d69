//! 储备状态
//!
//! 保存两侧储备量、份额总量和每个持有人的份额。只有 `liquidity` 模块
//! 规划出的变更会通过这里的修改器写入。

use super::types::*;
use ethers::types::{Address, U256};
use std::collections::HashMap;

/// 池子状态
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolState {
    base_reserve: U256,
    quote_reserve: U256,
    total_shares: U256,
    /// 余额为零的持有人不保存
    shares_of: HashMap<Address, U256>,
}

impl PoolState {
    /// 创建未初始化的池子 (所有字段为零)
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_reserves(&self) -> Reserves {
        Reserves::new(self.base_reserve, self.quote_reserve)
    }

    pub fn current_shares(&self, holder: &Address) -> U256 {
        self.shares_of.get(holder).copied().unwrap_or_default()
    }

    pub fn total_shares(&self) -> U256 {
        self.total_shares
    }

    pub fn is_seeded(&self) -> bool {
        !self.total_shares.is_zero()
    }

    /// 所有持有份额的地址
    pub fn holders(&self) -> impl Iterator<Item = (&Address, &U256)> + '_ {
        self.shares_of.iter()
    }

    pub(crate) fn credit_reserves(&mut self, base: U256, quote: U256) -> AmmResult<()> {
        self.base_reserve = self.base_reserve.checked_add(base).ok_or(AmmError::Overflow)?;
        self.quote_reserve = self.quote_reserve.checked_add(quote).ok_or(AmmError::Overflow)?;
        Ok(())
    }

    pub(crate) fn debit_reserves(&mut self, base: U256, quote: U256) -> AmmResult<()> {
        let base_reserve = self.base_reserve.checked_sub(base).ok_or(AmmError::InsufficientReserves {
            required: base,
            available: self.base_reserve,
        })?;
        let quote_reserve = self.quote_reserve.checked_sub(quote).ok_or(AmmError::InsufficientReserves {
            required: quote,
            available: self.quote_reserve,
        })?;

        self.base_reserve = base_reserve;
        self.quote_reserve = quote_reserve;
        Ok(())
    }

    pub(crate) fn mint(&mut self, holder: Address, amount: U256) -> AmmResult<()> {
        let total = self.total_shares.checked_add(amount).ok_or(AmmError::Overflow)?;
        let owned = self.current_shares(&holder).checked_add(amount).ok_or(AmmError::Overflow)?;

        self.total_shares = total;
        if !owned.is_zero() {
            self.shares_of.insert(holder, owned);
        }
        Ok(())
    }

    pub(crate) fn burn(&mut self, holder: Address, amount: U256) -> AmmResult<()> {
        let available = self.current_shares(&holder);
        let owned = available.checked_sub(amount).ok_or(AmmError::InsufficientShares {
            requested: amount,
            available,
        })?;
        let total = self
            .total_shares
            .checked_sub(amount)
            .ok_or_else(|| AmmError::invariant("burn exceeds total share supply"))?;

        self.total_shares = total;
        if owned.is_zero() {
            self.shares_of.remove(&holder);
        } else {
            self.shares_of.insert(holder, owned);
        }
        Ok(())
    }

    /// 校验份额守恒以及"未初始化 ⇔ 两侧储备为零"
    pub fn check_invariants(&self) -> AmmResult<()> {
        let mut sum = U256::zero();
        for amount in self.shares_of.values() {
            sum = sum.checked_add(*amount).ok_or(AmmError::Overflow)?;
        }
        if sum != self.total_shares {
            return Err(AmmError::invariant(format!(
                "total shares {} != sum of holder shares {}",
                self.total_shares, sum
            )));
        }

        let reserves = self.current_reserves();
        let both_positive = !reserves.base.is_zero() && !reserves.quote.is_zero();
        if self.total_shares.is_zero() != reserves.is_empty() || (self.is_seeded() && !both_positive) {
            return Err(AmmError::invariant(format!(
                "share supply {} inconsistent with reserves ({})",
                self.total_shares, reserves
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(v: u64) -> U256 {
        U256::from(v)
    }

    #[test]
    fn test_new_pool_is_empty() {
        let state = PoolState::new();
        assert!(!state.is_seeded());
        assert!(state.current_reserves().is_empty());
        assert_eq!(state.current_shares(&Address::random()), U256::zero());
        assert!(state.check_invariants().is_ok());
    }

    #[test]
    fn test_mint_and_burn_track_total() {
        let alice = Address::random();
        let bob = Address::random();
        let mut state = PoolState::new();
        state.credit_reserves(u(100), u(100)).unwrap();
        state.mint(alice, u(60)).unwrap();
        state.mint(bob, u(40)).unwrap();
        assert_eq!(state.total_shares(), u(100));
        assert!(state.check_invariants().is_ok());

        state.burn(bob, u(40)).unwrap();
        assert_eq!(state.current_shares(&bob), U256::zero());
        assert_eq!(state.holders().count(), 1);
        assert_eq!(state.total_shares(), u(60));
    }

    #[test]
    fn test_burn_more_than_owned() {
        let alice = Address::random();
        let mut state = PoolState::new();
        state.mint(alice, u(10)).unwrap();

        let err = state.burn(alice, u(11)).unwrap_err();
        assert_eq!(
            err,
            AmmError::InsufficientShares {
                requested: u(11),
                available: u(10)
            }
        );
        assert_eq!(state.current_shares(&alice), u(10));
    }

    #[test]
    fn test_debit_underflow_is_error() {
        let mut state = PoolState::new();
        state.credit_reserves(u(5), u(50)).unwrap();

        let err = state.debit_reserves(u(1), u(51)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientReserves);
        // 失败时两侧都不变
        assert_eq!(state.current_reserves(), Reserves::new(u(5), u(50)));
    }

    #[test]
    fn test_invariants_detect_one_sided_pool() {
        let mut state = PoolState::new();
        state.credit_reserves(u(100), U256::zero()).unwrap();
        state.mint(Address::random(), u(100)).unwrap();
        assert_eq!(state.check_invariants().unwrap_err().kind(), ErrorKind::InvariantViolation);
    }
}
