//! AMM引擎 - 持有池子状态并串行执行所有操作
//!
//! 每个操作在整个过程中持有池子锁：读取储备 → 规划变更 → 外部转账 →
//! 提交。任何一步失败时池子状态保持不变，事件只在提交后发布。

use crate::amm::liquidity::{self, Plan};
use crate::amm::pricing::price_impact;
use crate::amm::state::PoolState;
use crate::amm::types::*;
use crate::config::EngineConfig;
use crate::events::{EventBus, EventKind, EventStream, PoolEvent};
use crate::ledger::{BaseLedger, QuoteLedger};
use ethers::types::{Address, U256};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, error, info, warn};

/// 交换预览
#[derive(Debug, Clone, Serialize)]
pub struct SwapPreview {
    pub direction: SwapDirection,
    pub amount_in: U256,
    pub amount_out: U256,
    pub price_impact: f64, // 百分比
}

/// 托管核对结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CustodyReport {
    /// 池子记录的储备量
    pub reserves: Reserves,
    /// 外部账本报告的托管余额
    pub custody: Reserves,
}

impl CustodyReport {
    pub fn is_consistent(&self) -> bool {
        self.reserves == self.custody
    }
}

/// AMM引擎
pub struct AmmEngine {
    pool: Mutex<PoolState>,
    quote: Arc<dyn QuoteLedger>,
    base: Arc<dyn BaseLedger>,
    pool_account: Address,
    events: EventBus,
}

impl AmmEngine {
    /// 创建未初始化的池子
    pub fn new(config: &EngineConfig, quote: Arc<dyn QuoteLedger>, base: Arc<dyn BaseLedger>) -> Self {
        info!(pool_account = ?config.pool_account, "创建AMM引擎");
        Self {
            pool: Mutex::new(PoolState::new()),
            quote,
            base,
            pool_account: config.pool_account,
            events: EventBus::new(config.event_capacity),
        }
    }

    pub fn pool_account(&self) -> Address {
        self.pool_account
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PoolEvent> {
        self.events.subscribe()
    }

    pub fn event_stream(&self) -> EventStream {
        self.events.event_stream()
    }

    // ── 查询 ─────────────────────────────────────────────

    pub async fn current_reserves(&self) -> Reserves {
        self.pool.lock().await.current_reserves()
    }

    pub async fn current_shares(&self, holder: Address) -> U256 {
        self.pool.lock().await.current_shares(&holder)
    }

    pub async fn total_shares(&self) -> U256 {
        self.pool.lock().await.total_shares()
    }

    /// 当前状态快照
    pub async fn snapshot(&self) -> PoolState {
        self.pool.lock().await.clone()
    }

    pub async fn price_info(&self) -> PriceInfo {
        let pool = self.pool.lock().await;
        PriceInfo::new(pool.current_reserves(), pool.total_shares())
    }

    /// 按当前储备预估交换结果，不修改任何状态
    pub async fn preview_swap(&self, direction: SwapDirection, amount_in: U256) -> AmmResult<SwapPreview> {
        let pool = self.pool.lock().await;
        // 与真实交换走同一套规划和校验
        let plan = liquidity::plan_swap(&pool, direction, amount_in)?;

        let (reserve_in, reserve_out) = direction.split(&pool.current_reserves());
        Ok(SwapPreview {
            direction,
            amount_in,
            amount_out: plan.outcome.amount_out,
            price_impact: price_impact(amount_in, reserve_in, reserve_out)?,
        })
    }

    /// 核对储备量与外部账本的托管余额
    pub async fn verify_custody(&self) -> CustodyReport {
        let pool = self.pool.lock().await;
        let report = CustodyReport {
            reserves: pool.current_reserves(),
            custody: Reserves::new(
                self.base.balance_of(self.pool_account).await,
                self.quote.balance_of(self.pool_account).await,
            ),
        };

        if !report.is_consistent() {
            error!(
                reserves = %report.reserves,
                custody = %report.custody,
                "储备量与托管余额不一致"
            );
        }
        report
    }

    // ── 操作 ─────────────────────────────────────────────

    /// 初始注资，`base_attached` 为调用附带的 base
    pub async fn seed(&self, caller: Address, base_attached: U256, quote_amount: U256) -> AmmResult<SeedOutcome> {
        let mut pool = self.pool.lock().await;

        let plan = liquidity::plan_seed(&pool, caller, base_attached, quote_amount)
            .map_err(|e| rejected("seed", caller, e))?;
        let next = plan
            .delta
            .apply_to(&pool)
            .map_err(|e| rejected("seed", caller, e))?;

        self.pull_quote(caller, quote_amount)
            .await
            .map_err(|e| rejected("seed", caller, e))?;

        *pool = next;
        let outcome = plan.outcome;
        info!(
            holder = ?caller,
            base = %outcome.base_amount,
            quote = %outcome.quote_amount,
            shares = %outcome.shares_minted,
            "✅ 池子初始化完成"
        );
        self.emit(
            caller,
            EventKind::Seeded {
                base_amount: outcome.base_amount,
                quote_amount: outcome.quote_amount,
                shares_minted: outcome.shares_minted,
            },
        );
        Ok(outcome)
    }

    /// 用附带的 base 换 quote
    pub async fn swap_base_for_quote(&self, caller: Address, base_in: U256) -> AmmResult<U256> {
        let mut pool = self.pool.lock().await;

        let plan = liquidity::plan_swap(&pool, SwapDirection::BaseToQuote, base_in)
            .map_err(|e| rejected("swap_base_for_quote", caller, e))?;
        let next = plan
            .delta
            .apply_to(&pool)
            .map_err(|e| rejected("swap_base_for_quote", caller, e))?;
        debug!(plan = ?plan.outcome, "交换规划完成");

        self.push_quote(caller, plan.outcome.amount_out)
            .await
            .map_err(|e| rejected("swap_base_for_quote", caller, e))?;

        *pool = next;
        Ok(self.commit_swap(caller, &plan))
    }

    /// 用 quote 换 base
    pub async fn swap_quote_for_base(&self, caller: Address, quote_in: U256) -> AmmResult<U256> {
        let mut pool = self.pool.lock().await;

        let plan = liquidity::plan_swap(&pool, SwapDirection::QuoteToBase, quote_in)
            .map_err(|e| rejected("swap_quote_for_base", caller, e))?;
        let next = plan
            .delta
            .apply_to(&pool)
            .map_err(|e| rejected("swap_quote_for_base", caller, e))?;
        debug!(plan = ?plan.outcome, "交换规划完成");

        self.pull_quote(caller, quote_in)
            .await
            .map_err(|e| rejected("swap_quote_for_base", caller, e))?;

        if let Err(e) = self.push_base(caller, plan.outcome.amount_out).await {
            // quote 已经入池，尝试退回
            self.refund_quote(caller, quote_in).await;
            return Err(rejected("swap_quote_for_base", caller, e));
        }

        *pool = next;
        Ok(self.commit_swap(caller, &plan))
    }

    /// 按当前比例添加流动性，返回拉取的 quote 数量和铸造的份额
    pub async fn deposit(&self, caller: Address, base_attached: U256) -> AmmResult<DepositOutcome> {
        let mut pool = self.pool.lock().await;

        let plan = liquidity::plan_deposit(&pool, caller, base_attached)
            .map_err(|e| rejected("deposit", caller, e))?;
        let next = plan
            .delta
            .apply_to(&pool)
            .map_err(|e| rejected("deposit", caller, e))?;

        self.pull_quote(caller, plan.outcome.quote_amount)
            .await
            .map_err(|e| rejected("deposit", caller, e))?;

        *pool = next;
        let outcome = plan.outcome;
        info!(
            holder = ?caller,
            base = %outcome.base_amount,
            quote = %outcome.quote_amount,
            shares = %outcome.shares_minted,
            "✅ 添加流动性"
        );
        self.emit(
            caller,
            EventKind::LiquidityAdded {
                base_amount: outcome.base_amount,
                quote_amount: outcome.quote_amount,
                shares_minted: outcome.shares_minted,
            },
        );
        Ok(outcome)
    }

    /// 销毁份额，按比例返还两侧资产
    pub async fn withdraw(&self, caller: Address, shares: U256) -> AmmResult<WithdrawOutcome> {
        let mut pool = self.pool.lock().await;

        let plan = liquidity::plan_withdraw(&pool, caller, shares)
            .map_err(|e| rejected("withdraw", caller, e))?;
        let next = plan
            .delta
            .apply_to(&pool)
            .map_err(|e| rejected("withdraw", caller, e))?;
        let outcome = plan.outcome;

        // base 先转：收款方拒收时还没有任何 quote 离开托管
        self.push_base(caller, outcome.base_amount)
            .await
            .map_err(|e| rejected("withdraw", caller, e))?;

        if let Err(e) = self.push_quote(caller, outcome.quote_amount).await {
            error!(
                holder = ?caller,
                base_sent = %outcome.base_amount,
                "⚠️ base 已转出但 quote 转账失败，需要调用方对账"
            );
            let reason = match e {
                AmmError::TransferFailed { reason } => reason,
                other => other.to_string(),
            };
            return Err(rejected(
                "withdraw",
                caller,
                AmmError::transfer_failed(format!(
                    "{reason}; {} base already delivered, reconciliation required",
                    outcome.base_amount
                )),
            ));
        }

        *pool = next;
        info!(
            holder = ?caller,
            shares = %outcome.shares_burned,
            base = %outcome.base_amount,
            quote = %outcome.quote_amount,
            "✅ 移除流动性"
        );
        self.emit(
            caller,
            EventKind::LiquidityRemoved {
                base_amount: outcome.base_amount,
                quote_amount: outcome.quote_amount,
                shares_burned: outcome.shares_burned,
            },
        );
        Ok(outcome)
    }

    // ── 内部 ─────────────────────────────────────────────

    fn commit_swap(&self, caller: Address, plan: &Plan<SwapOutcome>) -> U256 {
        let outcome = plan.outcome;
        info!(
            holder = ?caller,
            direction = %outcome.direction,
            amount_in = %outcome.amount_in,
            amount_out = %outcome.amount_out,
            "✅ 交换完成"
        );
        self.emit(
            caller,
            EventKind::Swapped {
                direction: outcome.direction,
                amount_in: outcome.amount_in,
                amount_out: outcome.amount_out,
            },
        );
        outcome.amount_out
    }

    fn emit(&self, holder: Address, kind: EventKind) {
        let receivers = self.events.publish(PoolEvent::new(holder, kind));
        debug!(receivers, "事件已发布");
    }

    /// 从调用者拉取 quote 进入托管，先检查授权额度
    async fn pull_quote(&self, owner: Address, amount: U256) -> AmmResult<()> {
        let approved = self.quote.allowance(owner, self.pool_account).await;
        if approved < amount {
            return Err(AmmError::InsufficientAllowance {
                required: amount,
                available: approved,
            });
        }

        if !self
            .quote
            .transfer_from(owner, self.pool_account, self.pool_account, amount)
            .await
        {
            return Err(AmmError::transfer_failed(format!(
                "quote transferFrom of {amount} from {owner:?} was rejected"
            )));
        }
        Ok(())
    }

    async fn push_quote(&self, to: Address, amount: U256) -> AmmResult<()> {
        if !self.quote.transfer(to, amount).await {
            return Err(AmmError::transfer_failed(format!(
                "quote transfer of {amount} to {to:?} was rejected"
            )));
        }
        Ok(())
    }

    async fn push_base(&self, to: Address, amount: U256) -> AmmResult<()> {
        if !self.base.send(to, amount).await {
            return Err(AmmError::transfer_failed(format!(
                "base send of {amount} to {to:?} was rejected"
            )));
        }
        Ok(())
    }

    /// 补偿转账；失败时只能记录，由调用方对账
    async fn refund_quote(&self, to: Address, amount: U256) {
        if self.quote.transfer(to, amount).await {
            warn!(holder = ?to, %amount, "已退回拉取的quote");
        } else {
            error!(holder = ?to, %amount, "⚠️ quote退款失败，需要调用方对账");
        }
    }
}

/// 记录被拒绝的操作
fn rejected(operation: &'static str, caller: Address, error: AmmError) -> AmmError {
    warn!(operation, holder = ?caller, kind = ?error.kind(), "操作被拒绝: {}", error);
    error
}
