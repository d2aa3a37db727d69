//! 引擎配置
//!
//! 加载顺序：`.env` → 可选配置文件 → `AMM_*` 环境变量。
//! 手续费固定为 0.3%，不可配置。

use ethers::types::Address;
use eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use tracing::info;

/// 事件通道默认容量
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// 引擎配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// 池子托管账户，外部账本上的余额即为储备量
    pub pool_account: Address,
    /// 事件广播通道容量
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pool_account: Address::zero(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl EngineConfig {
    pub fn with_pool_account(mut self, pool_account: Address) -> Self {
        self.pool_account = pool_account;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.event_capacity == 0 {
            eyre::bail!("event_capacity must be greater than zero");
        }
        Ok(())
    }
}

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 从 `.env` 和环境变量加载配置
    pub fn load() -> Result<EngineConfig> {
        Self::load_from(None)
    }

    /// 额外读取一个配置文件 (不存在时忽略)
    pub fn load_from(path: Option<&str>) -> Result<EngineConfig> {
        dotenv::dotenv().ok(); // 加载.env文件，如果存在的话

        let mut builder = config::Config::builder()
            .set_default("pool_account", format!("{:?}", Address::zero()))?
            .set_default("event_capacity", DEFAULT_EVENT_CAPACITY as i64)?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix("AMM"))
            .build()
            .wrap_err("failed to read AMM configuration")?;

        let config: EngineConfig = settings
            .try_deserialize()
            .wrap_err("invalid AMM configuration")?;
        config.validate()?;

        Ok(config)
    }

    /// 打印配置摘要
    pub fn print_config_summary(config: &EngineConfig) {
        info!("📋 AMM配置摘要:");
        info!("   池子账户: {:?}", config.pool_account);
        info!("   事件通道容量: {}", config.event_capacity);
        info!("   手续费: {}/{}", crate::amm::FEE_NUMERATOR, crate::amm::FEE_DENOMINATOR);
    }
}
