//! 内存账本实现
//!
//! 用于测试以及没有链上账本时的嵌入场景，支持注入失败。

use super::{BaseLedger, QuoteLedger};
use async_trait::async_trait;
use ethers::types::{Address, U256};
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Default)]
struct Book {
    balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
    rejected: HashSet<Address>,
    pending_failures: u32,
}

impl Book {
    fn balance(&self, holder: &Address) -> U256 {
        self.balances.get(holder).copied().unwrap_or_default()
    }

    /// 消耗一次注入的失败
    fn take_failure(&mut self) -> bool {
        if self.pending_failures > 0 {
            self.pending_failures -= 1;
            return true;
        }
        false
    }

    fn move_balance(&mut self, from: Address, to: Address, amount: U256) -> bool {
        if self.rejected.contains(&to) {
            return false;
        }

        let from_balance = self.balance(&from);
        let Some(remaining) = from_balance.checked_sub(amount) else {
            return false;
        };
        self.balances.insert(from, remaining);

        let to_balance = self.balance(&to);
        self.balances.insert(to, to_balance.saturating_add(amount));
        true
    }
}

/// 内存 quote 代币账本，`account` 为池子账户
#[derive(Debug)]
pub struct InMemoryQuoteLedger {
    account: Address,
    book: Mutex<Book>,
}

impl InMemoryQuoteLedger {
    pub fn new(account: Address) -> Self {
        Self {
            account,
            book: Mutex::new(Book::default()),
        }
    }

    /// 直接给地址增发余额
    pub async fn mint(&self, holder: Address, amount: U256) {
        let mut book = self.book.lock().await;
        let balance = book.balance(&holder);
        book.balances.insert(holder, balance.saturating_add(amount));
    }

    pub async fn approve(&self, owner: Address, spender: Address, amount: U256) {
        self.book.lock().await.allowances.insert((owner, spender), amount);
    }

    /// 之后转给该地址的转账都会失败
    pub async fn reject_recipient(&self, holder: Address) {
        self.book.lock().await.rejected.insert(holder);
    }

    /// 接下来 `count` 次转账返回失败
    pub async fn fail_next_transfers(&self, count: u32) {
        self.book.lock().await.pending_failures = count;
    }
}

#[async_trait]
impl QuoteLedger for InMemoryQuoteLedger {
    async fn balance_of(&self, holder: Address) -> U256 {
        self.book.lock().await.balance(&holder)
    }

    async fn transfer(&self, to: Address, amount: U256) -> bool {
        let mut book = self.book.lock().await;
        if book.take_failure() {
            debug!(to = ?to, %amount, "注入的quote转账失败");
            return false;
        }
        book.move_balance(self.account, to, amount)
    }

    async fn transfer_from(&self, owner: Address, spender: Address, to: Address, amount: U256) -> bool {
        let mut book = self.book.lock().await;
        if book.take_failure() {
            debug!(owner = ?owner, %amount, "注入的quote代扣失败");
            return false;
        }

        let approved = book.allowances.get(&(owner, spender)).copied().unwrap_or_default();
        let Some(left) = approved.checked_sub(amount) else {
            return false;
        };
        if !book.move_balance(owner, to, amount) {
            return false;
        }
        book.allowances.insert((owner, spender), left);
        true
    }

    async fn allowance(&self, owner: Address, spender: Address) -> U256 {
        let book = self.book.lock().await;
        book.allowances.get(&(owner, spender)).copied().unwrap_or_default()
    }
}

/// 内存 base 资产账本，`account` 为池子账户
#[derive(Debug)]
pub struct InMemoryBaseLedger {
    account: Address,
    book: Mutex<Book>,
}

impl InMemoryBaseLedger {
    pub fn new(account: Address) -> Self {
        Self {
            account,
            book: Mutex::new(Book::default()),
        }
    }

    pub async fn mint(&self, holder: Address, amount: U256) {
        let mut book = self.book.lock().await;
        let balance = book.balance(&holder);
        book.balances.insert(holder, balance.saturating_add(amount));
    }

    /// 传输层把调用附带的 base 记入池子托管
    pub async fn attach(&self, from: Address, amount: U256) -> bool {
        let account = self.account;
        self.book.lock().await.move_balance(from, account, amount)
    }

    /// 操作失败时传输层退回附带的 base
    pub async fn refund_attached(&self, to: Address, amount: U256) -> bool {
        let account = self.account;
        let mut book = self.book.lock().await;
        // 退款不受拒收影响
        let rejected = book.rejected.remove(&to);
        let moved = book.move_balance(account, to, amount);
        if rejected {
            book.rejected.insert(to);
        }
        moved
    }

    pub async fn reject_recipient(&self, holder: Address) {
        self.book.lock().await.rejected.insert(holder);
    }

    pub async fn fail_next_transfers(&self, count: u32) {
        self.book.lock().await.pending_failures = count;
    }
}

#[async_trait]
impl BaseLedger for InMemoryBaseLedger {
    async fn balance_of(&self, holder: Address) -> U256 {
        self.book.lock().await.balance(&holder)
    }

    async fn send(&self, to: Address, amount: U256) -> bool {
        let mut book = self.book.lock().await;
        if book.take_failure() {
            debug!(to = ?to, %amount, "注入的base转账失败");
            return false;
        }
        book.move_balance(self.account, to, amount)
    }
}
