pub mod memory;
pub mod redb_store;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::shared::error::EngineResult;
use crate::shared::types::{CommunityCurrencyAllowance, Unit};

pub use self::memory::MemoryStore;
pub use self::redb_store::RedbStore;

#[async_trait]
pub trait UnitStore: Send + Sync {
    async fn load_units(&self) -> EngineResult<Vec<Unit>>;

    async fn load_allowances(&self) -> EngineResult<Vec<CommunityCurrencyAllowance>>;

    async fn set_allowance(&self, allowance: &CommunityCurrencyAllowance) -> EngineResult<()>;

    /// Remove one code, or every code when `unit_code` is `None`. Returns rows removed.
    async fn remove_allowance(
        &self,
        community_id: &str,
        symbol: &str,
        unit_code: Option<&str>,
    ) -> EngineResult<usize>;

    /// Currencies a user has associated with themselves.
    async fn user_currencies(&self, user_id: &str) -> EngineResult<Vec<String>>;

    /// Community-wide default currencies.
    async fn community_currencies(&self, community_id: &str) -> EngineResult<Vec<String>>;

    /// Overwrite stored currency rates. Unknown codes are skipped. Returns rows updated.
    async fn update_rates(
        &self,
        rates: &HashMap<String, f64>,
        updated_at: DateTime<Utc>,
    ) -> EngineResult<usize>;
}

/// Finite and strictly positive; the catalog divides by rates.
pub fn is_valid_rate(rate: f64) -> bool {
    rate.is_finite() && rate > 0.0
}
