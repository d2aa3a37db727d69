//! 外部资产协作方
//!
//! 池子自己不移动资产，只通过这两个trait请求转账。转账结果为 `false`
//! 时整个操作失败。

pub mod memory;

pub use memory::*;

use async_trait::async_trait;
use ethers::types::{Address, U256};

/// quote 代币账本 (ERC20 风格)
///
/// `transfer` 以池子账户为付款方。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteLedger: Send + Sync {
    async fn balance_of(&self, holder: Address) -> U256;

    async fn transfer(&self, to: Address, amount: U256) -> bool;

    /// 由 `spender` 代 `owner` 向 `to` 转账，消耗授权额度
    async fn transfer_from(&self, owner: Address, spender: Address, to: Address, amount: U256) -> bool;

    async fn allowance(&self, owner: Address, spender: Address) -> U256;
}

/// base 资产转出
///
/// 流入池子的 base 随调用一起附带，由前置的传输层记入托管；这里只负责转出。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BaseLedger: Send + Sync {
    async fn balance_of(&self, holder: Address) -> U256;

    /// 收款方可能拒收，此时返回 `false`
    async fn send(&self, to: Address, amount: U256) -> bool;
}
