//! 池子事件
//!
//! 每次成功提交后发布一条事件，供外部监控消费。核心本身不解读这些事件。

use crate::amm::types::SwapDirection;
use chrono::{DateTime, Utc};
use ethers::types::{Address, U256};
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

/// 事件类型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventKind {
    Seeded {
        base_amount: U256,
        quote_amount: U256,
        shares_minted: U256,
    },
    Swapped {
        direction: SwapDirection,
        amount_in: U256,
        amount_out: U256,
    },
    LiquidityAdded {
        base_amount: U256,
        quote_amount: U256,
        shares_minted: U256,
    },
    LiquidityRemoved {
        base_amount: U256,
        quote_amount: U256,
        shares_burned: U256,
    },
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Seeded { .. } => "seeded",
            Self::Swapped { .. } => "swapped",
            Self::LiquidityAdded { .. } => "liquidity_added",
            Self::LiquidityRemoved { .. } => "liquidity_removed",
        }
    }
}

/// 池子事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// 发起操作的持有人
    pub holder: Address,
    pub kind: EventKind,
}

impl PoolEvent {
    pub fn new(holder: Address, kind: EventKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            holder,
            kind,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// 事件流类型
pub type EventStream = Pin<Box<dyn Stream<Item = PoolEvent> + Send>>;

/// 基于 broadcast 的事件总线
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PoolEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// 发布事件，返回收到事件的订阅者数量
    pub fn publish(&self, event: PoolEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                tracing::trace!("没有事件订阅者");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PoolEvent> {
        self.sender.subscribe()
    }

    /// 以 Stream 形式订阅；落后的订阅者会跳过丢失的事件继续接收
    pub fn event_stream(&self) -> EventStream {
        let mut receiver = self.subscribe();
        Box::pin(async_stream::stream! {
            loop {
                match receiver.recv().await {
                    Ok(event) => yield event,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "事件订阅者落后，已跳过部分事件");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_EVENT_CAPACITY)
    }
}
