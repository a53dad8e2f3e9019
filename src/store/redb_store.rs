use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use redb::{Database, ReadableTable, TableDefinition, TableError};
use serde::{Deserialize, Serialize};

use super::{is_valid_rate, UnitStore};
use crate::shared::error::EngineResult;
use crate::shared::types::{CatalogSeed, CommunityCurrencyAllowance, Unit, UnitKind};

/// String keys, JSON payloads.
type JsonTable = TableDefinition<'static, &'static str, &'static str>;

const UNITS_TABLE: JsonTable = TableDefinition::new("units");
const ALLOWANCES_TABLE: JsonTable = TableDefinition::new("currency_allowances");
const USER_CURRENCIES_TABLE: JsonTable = TableDefinition::new("user_currencies");
const COMMUNITY_CURRENCIES_TABLE: JsonTable = TableDefinition::new("community_currencies");
const RATE_STAMPS_TABLE: JsonTable = TableDefinition::new("rate_stamps");

/// Separates community and symbol in allowance keys.
const KEY_SEPARATOR: char = '\u{1f}';

/// Last rate written for a currency, as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRate {
    pub rate: f64,
    pub updated_at: i64,
}

pub struct RedbStore {
    db: Database,
    path: PathBuf,
}

impl RedbStore {
    pub async fn open(path: &Path) -> EngineResult<Self> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let db = Database::create(path)?;
        log::info!("[RedbStore] Opened catalog database at {}", path.display());
        Ok(Self {
            db,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write every row of a seed document in one transaction.
    pub fn import_seed(&self, seed: &CatalogSeed) -> EngineResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut units = txn.open_table(UNITS_TABLE)?;
            for unit in &seed.units {
                let payload = serde_json::to_string(unit)?;
                units.insert(unit.code.as_str(), payload.as_str())?;
            }

            let mut grouped: HashMap<String, Vec<String>> = HashMap::new();
            for allowance in &seed.allowances {
                let codes = grouped
                    .entry(allowance_key(&allowance.community_id, &allowance.symbol))
                    .or_default();
                if !codes.contains(&allowance.unit_code) {
                    codes.push(allowance.unit_code.clone());
                }
            }
            let mut allowances = txn.open_table(ALLOWANCES_TABLE)?;
            for (key, codes) in &grouped {
                let payload = serde_json::to_string(codes)?;
                allowances.insert(key.as_str(), payload.as_str())?;
            }

            let mut users = txn.open_table(USER_CURRENCIES_TABLE)?;
            for (user, codes) in &seed.user_currencies {
                let payload = serde_json::to_string(codes)?;
                users.insert(user.as_str(), payload.as_str())?;
            }

            let mut communities = txn.open_table(COMMUNITY_CURRENCIES_TABLE)?;
            for (community, codes) in &seed.community_currencies {
                let payload = serde_json::to_string(codes)?;
                communities.insert(community.as_str(), payload.as_str())?;
            }
        }
        txn.commit()?;
        log::info!(
            "[RedbStore] Imported {} units and {} allowances",
            seed.units.len(),
            seed.allowances.len()
        );
        Ok(())
    }

    pub fn set_user_currencies(&self, user_id: &str, codes: &[String]) -> EngineResult<()> {
        self.put(USER_CURRENCIES_TABLE, user_id, &serde_json::to_string(codes)?)
    }

    pub fn set_community_currencies(&self, community_id: &str, codes: &[String]) -> EngineResult<()> {
        self.put(COMMUNITY_CURRENCIES_TABLE, community_id, &serde_json::to_string(codes)?)
    }

    pub fn rate_updated_at(&self, code: &str) -> EngineResult<Option<DateTime<Utc>>> {
        let Some(raw) = self.get(RATE_STAMPS_TABLE, code)? else {
            return Ok(None);
        };
        let stored: StoredRate = serde_json::from_str(&raw)?;
        Ok(Utc.timestamp_opt(stored.updated_at, 0).single())
    }

    fn put(&self, def: JsonTable, key: &str, value: &str) -> EngineResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(def)?;
            table.insert(key, value)?;
        }
        txn.commit()?;
        Ok(())
    }

    fn get(&self, def: JsonTable, key: &str) -> EngineResult<Option<String>> {
        let txn = self.db.begin_read()?;
        let table = match txn.open_table(def) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let value = table.get(key)?.map(|guard| guard.value().to_string());
        Ok(value)
    }

    fn rows(&self, def: JsonTable) -> EngineResult<Vec<(String, String)>> {
        let txn = self.db.begin_read()?;
        let table = match txn.open_table(def) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut rows = Vec::new();
        for entry in table.iter()? {
            let (key, value) = entry?;
            rows.push((key.value().to_string(), value.value().to_string()));
        }
        Ok(rows)
    }

    fn codes(&self, def: JsonTable, key: &str) -> EngineResult<Vec<String>> {
        match self.get(def, key)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }
}

fn allowance_key(community_id: &str, symbol: &str) -> String {
    format!("{}{}{}", community_id, KEY_SEPARATOR, symbol)
}

#[async_trait]
impl UnitStore for RedbStore {
    async fn load_units(&self) -> EngineResult<Vec<Unit>> {
        let mut units = Vec::new();
        for (code, payload) in self.rows(UNITS_TABLE)? {
            match serde_json::from_str::<Unit>(&payload) {
                Ok(unit) => units.push(unit),
                Err(e) => log::warn!("[RedbStore] Skipping unreadable unit '{}': {}", code, e),
            }
        }
        Ok(units)
    }

    async fn load_allowances(&self) -> EngineResult<Vec<CommunityCurrencyAllowance>> {
        let mut allowances = Vec::new();
        for (key, payload) in self.rows(ALLOWANCES_TABLE)? {
            let Some((community_id, symbol)) = key.split_once(KEY_SEPARATOR) else {
                log::warn!("[RedbStore] Skipping malformed allowance key '{}'", key);
                continue;
            };
            let codes: Vec<String> = match serde_json::from_str(&payload) {
                Ok(codes) => codes,
                Err(e) => {
                    log::warn!("[RedbStore] Skipping unreadable allowance '{}': {}", key, e);
                    continue;
                }
            };
            allowances.extend(codes.into_iter().map(|unit_code| CommunityCurrencyAllowance {
                community_id: community_id.to_string(),
                symbol: symbol.to_string(),
                unit_code,
            }));
        }
        Ok(allowances)
    }

    async fn set_allowance(&self, allowance: &CommunityCurrencyAllowance) -> EngineResult<()> {
        let key = allowance_key(&allowance.community_id, &allowance.symbol);
        let mut codes = self.codes(ALLOWANCES_TABLE, &key)?;
        if !codes.contains(&allowance.unit_code) {
            codes.push(allowance.unit_code.clone());
        }
        self.put(ALLOWANCES_TABLE, &key, &serde_json::to_string(&codes)?)
    }

    async fn remove_allowance(
        &self,
        community_id: &str,
        symbol: &str,
        unit_code: Option<&str>,
    ) -> EngineResult<usize> {
        let key = allowance_key(community_id, symbol);
        let mut codes = self.codes(ALLOWANCES_TABLE, &key)?;
        let before = codes.len();
        if let Some(code) = unit_code {
            codes.retain(|existing| existing != code);
        } else {
            codes.clear();
        }
        let removed = before - codes.len();
        if removed == 0 {
            return Ok(0);
        }

        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(ALLOWANCES_TABLE)?;
            if codes.is_empty() {
                table.remove(key.as_str())?;
            } else {
                let payload = serde_json::to_string(&codes)?;
                table.insert(key.as_str(), payload.as_str())?;
            }
        }
        txn.commit()?;
        Ok(removed)
    }

    async fn user_currencies(&self, user_id: &str) -> EngineResult<Vec<String>> {
        self.codes(USER_CURRENCIES_TABLE, user_id)
    }

    async fn community_currencies(&self, community_id: &str) -> EngineResult<Vec<String>> {
        self.codes(COMMUNITY_CURRENCIES_TABLE, community_id)
    }

    async fn update_rates(
        &self,
        rates: &HashMap<String, f64>,
        updated_at: DateTime<Utc>,
    ) -> EngineResult<usize> {
        let mut updated = 0;
        let txn = self.db.begin_write()?;
        {
            let mut units = txn.open_table(UNITS_TABLE)?;
            let mut stamps = txn.open_table(RATE_STAMPS_TABLE)?;

            for (code, &rate) in rates {
                if !is_valid_rate(rate) {
                    log::warn!("[RedbStore] Ignoring invalid rate {} for '{}'", rate, code);
                    continue;
                }
                let existing = units.get(code.as_str())?.map(|guard| guard.value().to_string());
                let Some(payload) = existing else {
                    continue;
                };
                let mut unit: Unit = serde_json::from_str(&payload)?;
                if unit.kind != UnitKind::Currency {
                    continue;
                }
                unit.rate = rate;
                let payload = serde_json::to_string(&unit)?;
                units.insert(code.as_str(), payload.as_str())?;

                let stamp = serde_json::to_string(&StoredRate {
                    rate,
                    updated_at: updated_at.timestamp(),
                })?;
                stamps.insert(code.as_str(), stamp.as_str())?;
                updated += 1;
            }
        }
        txn.commit()?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::builtin_units;

    fn allowance(community: &str, symbol: &str, code: &str) -> CommunityCurrencyAllowance {
        CommunityCurrencyAllowance {
            community_id: community.to_string(),
            symbol: symbol.to_string(),
            unit_code: code.to_string(),
        }
    }

    async fn open_temp() -> (tempfile::TempDir, RedbStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbStore::open(&dir.path().join("data").join("catalog.redb")).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_empty_database_reads_as_empty() {
        let (_dir, store) = open_temp().await;
        assert!(store.load_units().await.unwrap().is_empty());
        assert!(store.load_allowances().await.unwrap().is_empty());
        assert!(store.user_currencies("alice").await.unwrap().is_empty());
        assert!(store.rate_updated_at("usd").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_import_seed_round_trips_units() {
        let (_dir, store) = open_temp().await;
        let seed = CatalogSeed {
            units: builtin_units(),
            allowances: vec![allowance("g1", "$", "cad")],
            user_currencies: HashMap::from([("alice".to_string(), vec!["eur".to_string()])]),
            community_currencies: HashMap::from([("g1".to_string(), vec!["cad".to_string()])]),
        };
        store.import_seed(&seed).unwrap();

        let mut loaded = store.load_units().await.unwrap();
        let mut expected = builtin_units();
        loaded.sort_by(|a, b| a.code.cmp(&b.code));
        expected.sort_by(|a, b| a.code.cmp(&b.code));
        assert_eq!(loaded, expected);

        assert_eq!(store.load_allowances().await.unwrap(), vec![allowance("g1", "$", "cad")]);
        assert_eq!(store.user_currencies("alice").await.unwrap(), vec!["eur".to_string()]);
        assert_eq!(store.community_currencies("g1").await.unwrap(), vec!["cad".to_string()]);
    }

    #[tokio::test]
    async fn test_allowance_lifecycle() {
        let (_dir, store) = open_temp().await;
        store.set_allowance(&allowance("g1", "$", "cad")).await.unwrap();
        store.set_allowance(&allowance("g1", "$", "cad")).await.unwrap();
        store.set_allowance(&allowance("g1", "$", "aud")).await.unwrap();
        store.set_allowance(&allowance("g2", "¥", "jpy")).await.unwrap();
        assert_eq!(store.load_allowances().await.unwrap().len(), 3);

        assert_eq!(store.remove_allowance("g1", "$", Some("cad")).await.unwrap(), 1);
        assert_eq!(store.remove_allowance("g1", "$", Some("cad")).await.unwrap(), 0);
        assert_eq!(store.remove_allowance("g1", "$", None).await.unwrap(), 1);

        let remaining = store.load_allowances().await.unwrap();
        assert_eq!(remaining, vec![allowance("g2", "¥", "jpy")]);
    }

    #[tokio::test]
    async fn test_update_rates_only_touches_known_currencies() {
        let (_dir, store) = open_temp().await;
        store
            .import_seed(&CatalogSeed {
                units: builtin_units(),
                ..CatalogSeed::default()
            })
            .unwrap();

        let at = Utc.timestamp_opt(1_700_000_000, 0).single().unwrap();
        let rates = HashMap::from([
            ("cad".to_string(), 1.41),
            ("kg".to_string(), 3.0),
            ("zzz".to_string(), 2.0),
            ("eur".to_string(), f64::NAN),
        ]);
        assert_eq!(store.update_rates(&rates, at).await.unwrap(), 1);

        let units = store.load_units().await.unwrap();
        assert_eq!(units.iter().find(|u| u.code == "cad").unwrap().rate, 1.41);
        assert_eq!(units.iter().find(|u| u.code == "kg").unwrap().rate, 1.0);
        assert_eq!(store.rate_updated_at("cad").unwrap(), Some(at));
        assert!(store.rate_updated_at("eur").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.redb");
        {
            let store = RedbStore::open(&path).await.unwrap();
            store.set_user_currencies("bob", &["gbp".to_string()]).unwrap();
        }
        let store = RedbStore::open(&path).await.unwrap();
        assert_eq!(store.user_currencies("bob").await.unwrap(), vec!["gbp".to_string()]);
        assert_eq!(store.path(), path.as_path());
    }
}
