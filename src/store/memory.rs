use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{is_valid_rate, UnitStore};
use crate::core::registry::builtin_units;
use crate::shared::error::{EngineError, EngineResult};
use crate::shared::types::{CatalogSeed, CommunityCurrencyAllowance, Unit, UnitKind};

pub struct MemoryStore {
    seed: RwLock<CatalogSeed>,
    rate_stamps: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl MemoryStore {
    pub fn from_seed(seed: CatalogSeed) -> Self {
        Self {
            seed: RwLock::new(seed),
            rate_stamps: RwLock::new(HashMap::new()),
        }
    }

    /// Store holding only the built-in registry.
    pub fn builtin() -> Self {
        Self::from_seed(CatalogSeed {
            units: builtin_units(),
            ..CatalogSeed::default()
        })
    }

    pub async fn from_json_file(path: &Path) -> EngineResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let seed: CatalogSeed = serde_json::from_str(&content)?;
        log::info!("[MemoryStore] Seeded {} units from {}", seed.units.len(), path.display());
        Ok(Self::from_seed(seed))
    }

    pub fn set_user_currencies(&self, user_id: &str, codes: Vec<String>) -> EngineResult<()> {
        self.write()?.user_currencies.insert(user_id.to_string(), codes);
        Ok(())
    }

    pub fn set_community_currencies(&self, community_id: &str, codes: Vec<String>) -> EngineResult<()> {
        self.write()?.community_currencies.insert(community_id.to_string(), codes);
        Ok(())
    }

    pub fn rate_updated_at(&self, code: &str) -> Option<DateTime<Utc>> {
        self.rate_stamps.read().ok().and_then(|stamps| stamps.get(code).copied())
    }

    fn read(&self) -> EngineResult<std::sync::RwLockReadGuard<'_, CatalogSeed>> {
        self.seed.read().map_err(|_| EngineError::Storage("memory store poisoned".into()))
    }

    fn write(&self) -> EngineResult<std::sync::RwLockWriteGuard<'_, CatalogSeed>> {
        self.seed.write().map_err(|_| EngineError::Storage("memory store poisoned".into()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::from_seed(CatalogSeed::default())
    }
}

#[async_trait]
impl UnitStore for MemoryStore {
    async fn load_units(&self) -> EngineResult<Vec<Unit>> {
        Ok(self.read()?.units.clone())
    }

    async fn load_allowances(&self) -> EngineResult<Vec<CommunityCurrencyAllowance>> {
        Ok(self.read()?.allowances.clone())
    }

    async fn set_allowance(&self, allowance: &CommunityCurrencyAllowance) -> EngineResult<()> {
        let mut seed = self.write()?;
        if !seed.allowances.contains(allowance) {
            seed.allowances.push(allowance.clone());
        }
        Ok(())
    }

    async fn remove_allowance(
        &self,
        community_id: &str,
        symbol: &str,
        unit_code: Option<&str>,
    ) -> EngineResult<usize> {
        let mut seed = self.write()?;
        let before = seed.allowances.len();
        seed.allowances.retain(|row| {
            !(row.community_id == community_id
                && row.symbol == symbol
                && unit_code.map_or(true, |code| row.unit_code == code))
        });
        Ok(before - seed.allowances.len())
    }

    async fn user_currencies(&self, user_id: &str) -> EngineResult<Vec<String>> {
        Ok(self.read()?.user_currencies.get(user_id).cloned().unwrap_or_default())
    }

    async fn community_currencies(&self, community_id: &str) -> EngineResult<Vec<String>> {
        Ok(self
            .read()?
            .community_currencies
            .get(community_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_rates(
        &self,
        rates: &HashMap<String, f64>,
        updated_at: DateTime<Utc>,
    ) -> EngineResult<usize> {
        let mut updated = Vec::new();
        {
            let mut seed = self.write()?;
            for unit in seed.units.iter_mut().filter(|u| u.kind == UnitKind::Currency) {
                if let Some(&rate) = rates.get(&unit.code) {
                    if is_valid_rate(rate) {
                        unit.rate = rate;
                        updated.push(unit.code.clone());
                    }
                }
            }
        }

        let mut stamps = self
            .rate_stamps
            .write()
            .map_err(|_| EngineError::Storage("memory store poisoned".into()))?;
        for code in &updated {
            stamps.insert(code.clone(), updated_at);
        }
        Ok(updated.len())
    }
}
