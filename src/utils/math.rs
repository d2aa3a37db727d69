//! 数值计算工具
//!
//! 储备量以 `U256` 保存，乘积在 `BigUint` 中计算，避免中间结果溢出。

use crate::amm::types::{AmmError, AmmResult};
use ethers::types::U256;
use num_bigint::BigUint;
use num_traits::{ToPrimitive, Zero};

/// 将 `U256` 转换为任意精度整数
pub fn to_big(value: U256) -> BigUint {
    let mut buf = [0u8; 32];
    value.to_big_endian(&mut buf);
    BigUint::from_bytes_be(&buf)
}

/// 将任意精度整数转换回 `U256`，超过 256 位时返回 `Overflow`
pub fn from_big(value: &BigUint) -> AmmResult<U256> {
    if value.is_zero() {
        return Ok(U256::zero());
    }

    let bytes = value.to_bytes_be();
    if bytes.len() > 32 {
        return Err(AmmError::Overflow);
    }

    Ok(U256::from_big_endian(&bytes))
}

/// 计算 `floor(a * b / denominator)`
///
/// # 参数
/// * `a`, `b` - 乘数，乘积在宽整数中计算
/// * `denominator` - 除数，为零时返回 `DivisionByZero`
pub fn mul_div_floor(a: U256, b: U256, denominator: U256) -> AmmResult<U256> {
    if denominator.is_zero() {
        return Err(AmmError::DivisionByZero);
    }

    let product = to_big(a) * to_big(b);
    from_big(&(product / to_big(denominator)))
}

/// 两个储备量的乘积 (k)
pub fn product(a: U256, b: U256) -> BigUint {
    to_big(a) * to_big(b)
}

/// 转换为 f64，仅用于展示
pub fn to_f64(value: U256) -> f64 {
    to_big(value).to_f64().unwrap_or(f64::INFINITY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_big_conversion_keeps_value() {
        let value = U256::MAX - U256::from(7u64);
        assert_eq!(from_big(&to_big(value)).unwrap(), value);
        assert_eq!(from_big(&BigUint::zero()).unwrap(), U256::zero());
    }

    #[test]
    fn test_from_big_overflow() {
        let too_big = to_big(U256::MAX) + BigUint::from(1u8);
        assert!(matches!(from_big(&too_big), Err(AmmError::Overflow)));
    }

    #[test]
    fn test_mul_div_floor() {
        // 7 * 10 / 4 = 17.5 -> 17
        let result = mul_div_floor(U256::from(7u64), U256::from(10u64), U256::from(4u64)).unwrap();
        assert_eq!(result, U256::from(17u64));

        // 乘积超过 256 位，但结果可以放回 U256
        let result = mul_div_floor(U256::MAX, U256::from(2u64), U256::from(4u64)).unwrap();
        assert_eq!(result, U256::MAX / U256::from(2u64));
    }

    #[test]
    fn test_mul_div_floor_division_by_zero() {
        let result = mul_div_floor(U256::one(), U256::one(), U256::zero());
        assert!(matches!(result, Err(AmmError::DivisionByZero)));
    }

    #[test]
    fn test_to_f64() {
        assert_eq!(to_f64(U256::from(1500u64)), 1500.0);
    }
}
