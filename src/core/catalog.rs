use std::collections::{BTreeSet, HashMap, HashSet};

use crate::shared::types::{Unit, UnitKind};

/// Prefix for the derived area key of a squareable unit ("sqcm").
pub const SQUARE_PREFIX: &str = "sq";

#[derive(Debug, Clone, Default)]
pub struct UnitCatalog {
    by_code: HashMap<String, Unit>,
    /// Matching index: code, plus symbol unless excluded.
    by_key: HashMap<String, Vec<Unit>>,
    /// Every symbol, excluded or not.
    by_symbol: HashMap<String, Vec<Unit>>,
    /// Derived area key -> base code.
    squared_keys: HashMap<String, String>,
}

impl UnitCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_units<I: IntoIterator<Item = Unit>>(units: I) -> Self {
        let mut catalog = Self::new();
        for unit in units {
            catalog.add(unit);
        }
        catalog
    }

    /// Codes and symbols are stored lowercase; message text is lowercased before scanning.
    pub fn add(&mut self, mut unit: Unit) {
        unit.code = unit.code.to_lowercase();
        unit.symbol = unit.symbol.to_lowercase();

        if self.by_code.contains_key(&unit.code) {
            log::warn!("[Catalog] Replacing duplicate unit code '{}'", unit.code);
            self.remove_code(&unit.code);
        }

        push_unique(&mut self.by_key, &unit.code, &unit);
        if !unit.exclude_symbol_from_matching && unit.symbol != unit.code {
            push_unique(&mut self.by_key, &unit.symbol, &unit);
        }
        push_unique(&mut self.by_symbol, &unit.symbol, &unit);

        if unit.squareable {
            self.squared_keys
                .insert(format!("{}{}", SQUARE_PREFIX, unit.code), unit.code.clone());
        }

        self.by_code.insert(unit.code.clone(), unit);
    }

    pub fn clear(&mut self) {
        self.by_code.clear();
        self.by_key.clear();
        self.by_symbol.clear();
        self.squared_keys.clear();
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }

    pub fn get(&self, code: &str, kind: Option<UnitKind>) -> Option<&Unit> {
        self.by_code
            .get(code)
            .filter(|unit| kind.map_or(true, |k| unit.kind == k))
    }

    /// Every unit registered under `key`, optionally narrowed by kind.
    pub fn get_all(&self, key: &str, kind: Option<UnitKind>) -> Vec<Unit> {
        self.get_all_matching(key, kind, |_| true)
    }

    pub fn get_all_matching<F>(&self, key: &str, kind: Option<UnitKind>, predicate: F) -> Vec<Unit>
    where
        F: Fn(&Unit) -> bool,
    {
        self.by_key
            .get(key)
            .map(|units| {
                units
                    .iter()
                    .filter(|unit| kind.map_or(true, |k| unit.kind == k))
                    .filter(|unit| predicate(unit))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Units carrying `symbol`, including those that opted out of matching.
    pub fn units_with_symbol(&self, symbol: &str, kind: Option<UnitKind>) -> Vec<Unit> {
        self.by_symbol
            .get(symbol)
            .map(|units| {
                units
                    .iter()
                    .filter(|unit| kind.map_or(true, |k| unit.kind == k))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn units(&self, kind: Option<UnitKind>) -> impl Iterator<Item = &Unit> {
        self.by_code
            .values()
            .filter(move |unit| kind.map_or(true, |k| unit.kind == k))
    }

    /// Sorted match keys for one kind, including derived area keys for measurements.
    pub fn keys(&self, kind: UnitKind) -> BTreeSet<String> {
        let mut keys: BTreeSet<String> = self
            .by_key
            .iter()
            .filter(|(_, units)| units.iter().any(|unit| unit.kind == kind))
            .map(|(key, _)| key.clone())
            .collect();
        if kind == UnitKind::Measurement {
            keys.extend(self.squared_keys.keys().cloned());
        }
        keys
    }

    pub fn squared_keys(&self) -> &HashMap<String, String> {
        &self.squared_keys
    }

    /// True when at least one unit carrying `symbol` opted out of matching.
    pub fn is_excluded_symbol(&self, symbol: &str) -> bool {
        self.by_symbol
            .get(symbol)
            .map_or(false, |units| units.iter().any(|unit| unit.exclude_symbol_from_matching))
    }

    /// Symbols shared by two or more currencies.
    pub fn duplicated_symbols(&self) -> HashSet<String> {
        self.by_symbol
            .iter()
            .filter(|(_, units)| units.iter().filter(|unit| unit.is_currency()).count() >= 2)
            .map(|(symbol, _)| symbol.clone())
            .collect()
    }

    /// Overwrite the rate of a known unit. Returns false for unknown codes.
    pub fn set_rate(&mut self, code: &str, rate: f64) -> bool {
        let Some(unit) = self.by_code.get_mut(code) else {
            return false;
        };
        unit.rate = rate;
        let symbol = unit.symbol.clone();

        let mut keys = vec![code.to_string()];
        if symbol != code {
            keys.push(symbol.clone());
        }
        for key in &keys {
            if let Some(bucket) = self.by_key.get_mut(key) {
                set_bucket_rate(bucket, code, rate);
            }
        }
        if let Some(bucket) = self.by_symbol.get_mut(&symbol) {
            set_bucket_rate(bucket, code, rate);
        }
        true
    }

    fn remove_code(&mut self, code: &str) {
        for index in [&mut self.by_key, &mut self.by_symbol] {
            index.retain(|_, units| {
                units.retain(|unit| unit.code != code);
                !units.is_empty()
            });
        }
        self.squared_keys.retain(|_, base| base != code);
        self.by_code.remove(code);
    }
}

fn push_unique(index: &mut HashMap<String, Vec<Unit>>, key: &str, unit: &Unit) {
    let bucket = index.entry(key.to_string()).or_default();
    if !bucket.iter().any(|existing| existing.code == unit.code) {
        bucket.push(unit.clone());
    }
}

fn set_bucket_rate(bucket: &mut [Unit], code: &str, rate: f64) {
    for entry in bucket.iter_mut().filter(|entry| entry.code == code) {
        entry.rate = rate;
    }
}
