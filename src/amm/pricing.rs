//! 恒定乘积定价
//!
//! 手续费先从输入中扣除，再按 x·y=k 计算输出：
//!
//! ```text
//! fee_portion     = amount_in * 3 / 1000
//! effective_input = amount_in - fee_portion
//! amount_out      = reserve_out - (reserve_in * reserve_out) / (reserve_in + effective_input)
//! ```
//!
//! 必须使用交易前的储备量调用。

use super::types::*;
use crate::utils::math::{from_big, mul_div_floor, product, to_big, to_f64};
use ethers::types::U256;
use num_bigint::BigUint;
use num_traits::Zero;
use once_cell::sync::Lazy;

static FEE_NUMERATOR_U256: Lazy<U256> = Lazy::new(|| U256::from(FEE_NUMERATOR));
static FEE_DENOMINATOR_U256: Lazy<U256> = Lazy::new(|| U256::from(FEE_DENOMINATOR));

/// 输入中被收取的手续费部分 (向下取整)
pub fn fee_portion(amount_in: U256) -> AmmResult<U256> {
    mul_div_floor(amount_in, *FEE_NUMERATOR_U256, *FEE_DENOMINATOR_U256)
}

/// 计算给定输入数量的输出数量
pub fn quote_output(amount_in: U256, reserve_in: U256, reserve_out: U256) -> AmmResult<U256> {
    if amount_in.is_zero() {
        return Err(AmmError::invalid_input("swap input must be non-zero"));
    }

    // fee_portion < amount_in，不会下溢
    let effective_input = amount_in - fee_portion(amount_in)?;

    let denominator: BigUint = to_big(reserve_in) + to_big(effective_input);
    if denominator.is_zero() {
        return Err(AmmError::DivisionByZero);
    }

    let k = product(reserve_in, reserve_out);
    let remaining = from_big(&(k / denominator))?;

    if remaining > reserve_out {
        return Err(AmmError::InsufficientReserves {
            required: remaining,
            available: reserve_out,
        });
    }

    Ok(reserve_out - remaining)
}

/// 计算价格影响 (百分比)
///
/// 比较无手续费的即时汇率与实际成交汇率，仅用于展示和监控。
pub fn price_impact(amount_in: U256, reserve_in: U256, reserve_out: U256) -> AmmResult<f64> {
    if reserve_in.is_zero() || reserve_out.is_zero() {
        return Ok(100.0); // 100%价格影响
    }

    let current_rate = to_f64(reserve_out) / to_f64(reserve_in);
    let amount_out = quote_output(amount_in, reserve_in, reserve_out)?;
    let effective_rate = to_f64(amount_out) / to_f64(amount_in);

    Ok(((current_rate - effective_rate) / current_rate * 100.0).abs())
}

/// k 值是否没有减少
pub fn k_non_decreasing(before: &Reserves, after: &Reserves) -> bool {
    product(after.base, after.quote) >= product(before.base, before.quote)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(v: u64) -> U256 {
        U256::from(v)
    }

    #[test]
    fn test_quote_output_pinned() {
        // fee = 3, effective = 997, k = 100_000_000
        // 10000 - 100_000_000 / 10997 = 10000 - 9093 = 907
        let out = quote_output(u(1000), u(10000), u(10000)).unwrap();
        assert_eq!(out, u(907));
    }

    #[test]
    fn test_fee_worsens_naive_price() {
        let (amount_in, reserve_in, reserve_out) = (u(1000), u(10000), u(10000));
        let out = quote_output(amount_in, reserve_in, reserve_out).unwrap();
        let naive = amount_in * reserve_out / reserve_in;
        assert!(out < naive);
    }

    #[test]
    fn test_fee_portion_truncates() {
        assert_eq!(fee_portion(u(1000)).unwrap(), u(3));
        assert_eq!(fee_portion(u(333)).unwrap(), U256::zero());
        assert_eq!(fee_portion(u(334)).unwrap(), u(1));
    }

    #[test]
    fn test_zero_input_rejected() {
        let result = quote_output(U256::zero(), u(10000), u(10000));
        assert!(matches!(result, Err(AmmError::InvalidInput { .. })));
    }

    #[test]
    fn test_huge_reserves_do_not_overflow() {
        // k 超过 256 位，仍能正确计算
        let reserve = U256::MAX / u(4);
        let out = quote_output(u(1_000_000), reserve, reserve).unwrap();
        assert!(out > U256::zero());
        assert!(out < u(1_000_000));
    }

    #[test]
    fn test_swap_increases_k() {
        let before = Reserves::new(u(10000), u(20000));
        let amount_in = u(1000);
        let out = quote_output(amount_in, before.base, before.quote).unwrap();
        let after = Reserves::new(before.base + amount_in, before.quote - out);
        assert!(k_non_decreasing(&before, &after));
        assert!(product(after.base, after.quote) > product(before.base, before.quote));
    }

    #[test]
    fn test_price_impact() {
        let impact = price_impact(u(1000), u(100000), u(100000)).unwrap();
        assert!(impact > 0.0 && impact < 100.0);

        assert_eq!(price_impact(u(1000), U256::zero(), u(10)).unwrap(), 100.0);
    }
}
