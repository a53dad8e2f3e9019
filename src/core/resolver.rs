use std::collections::{HashMap, HashSet};

use crate::core::catalog::UnitCatalog;
use crate::shared::types::{CommunityCurrencyAllowance, Unit, UnitKind};

/// (community, symbol) -> allowed currency codes.
#[derive(Debug, Clone, Default)]
pub struct AllowanceIndex {
    rows: HashMap<(String, String), Vec<String>>,
}

impl AllowanceIndex {
    pub fn new<'a, I>(allowances: I) -> Self
    where
        I: IntoIterator<Item = &'a CommunityCurrencyAllowance>,
    {
        let mut rows: HashMap<(String, String), Vec<String>> = HashMap::new();
        for allowance in allowances {
            let code = allowance.unit_code.to_lowercase();
            let codes = rows
                .entry((allowance.community_id.clone(), allowance.symbol.to_lowercase()))
                .or_default();
            if !codes.contains(&code) {
                codes.push(code);
            }
        }
        Self { rows }
    }

    pub fn codes_for(&self, community: &str, symbol: &str) -> &[String] {
        self.rows
            .get(&(community.to_string(), symbol.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every symbol that has at least one allowance row in any community.
    pub fn symbols(&self) -> HashSet<String> {
        self.rows.keys().map(|(_, symbol)| symbol.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Per-rebuild inputs for resolution, passed explicitly rather than held globally.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    pub catalog: &'a UnitCatalog,
    pub allowances: &'a AllowanceIndex,
    pub duplicated: &'a HashSet<String>,
}

impl<'a> Resolver<'a> {
    pub fn new(
        catalog: &'a UnitCatalog,
        allowances: &'a AllowanceIndex,
        duplicated: &'a HashSet<String>,
    ) -> Self {
        Self { catalog, allowances, duplicated }
    }

    /// Candidate units for `token` within `community`. Empty means "ignore this token".
    pub fn resolve(&self, token: &str, kind: UnitKind, community: &str) -> Vec<Unit> {
        let candidates = self.catalog.get_all(token, Some(kind));

        if !self.is_restricted(token, kind) {
            return candidates;
        }

        let allowed = self.allowances.codes_for(community, token);
        if allowed.is_empty() {
            // A lone matchable unit needs no narrowing; excluded ones stay hidden.
            if candidates.len() == 1 {
                return candidates;
            }
            log::debug!(
                "[Resolver] Dropping ambiguous '{}' in community {}: no allowance",
                token, community
            );
            return Vec::new();
        }

        // Excluded units only surface through the symbol index.
        let mut resolved: Vec<Unit> = Vec::new();
        for unit in candidates
            .into_iter()
            .chain(self.catalog.units_with_symbol(token, Some(kind)))
        {
            if allowed.contains(&unit.code) && !resolved.iter().any(|u| u.code == unit.code) {
                resolved.push(unit);
            }
        }

        if resolved.is_empty() {
            log::warn!(
                "[Resolver] Allowance for '{}' in community {} names unknown currencies: {:?}",
                token, community, allowed
            );
        }
        resolved
    }

    /// Shared by several currencies, or opted out of matching by one of them.
    pub fn is_restricted(&self, token: &str, kind: UnitKind) -> bool {
        kind == UnitKind::Currency
            && (self.duplicated.contains(token) || self.catalog.is_excluded_symbol(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::types::MeasurementSubtype;

    fn catalog() -> UnitCatalog {
        UnitCatalog::from_units(vec![
            Unit::currency("usd", "$", "US Dollar", 1.0),
            Unit::currency("cad", "$", "Canadian Dollar", 1.36),
            Unit::currency("eur", "€", "Euro", 0.92),
            Unit::currency("brl", "r$", "Brazilian Real", 5.0).excluded_symbol(),
            Unit::measurement("kg", "kg", "Kilogram", 1.0, MeasurementSubtype::Mass),
        ])
    }

    fn allowance(community: &str, symbol: &str, code: &str) -> CommunityCurrencyAllowance {
        CommunityCurrencyAllowance {
            community_id: community.to_string(),
            symbol: symbol.to_string(),
            unit_code: code.to_string(),
        }
    }

    fn codes(units: Vec<Unit>) -> Vec<String> {
        units.into_iter().map(|u| u.code).collect()
    }

    #[test]
    fn test_single_candidate_passes_through() {
        let catalog = catalog();
        let duplicated = catalog.duplicated_symbols();
        let allowances = AllowanceIndex::default();
        let resolver = Resolver::new(&catalog, &allowances, &duplicated);

        assert_eq!(codes(resolver.resolve("€", UnitKind::Currency, "g1")), vec!["eur"]);
        assert_eq!(codes(resolver.resolve("usd", UnitKind::Currency, "g1")), vec!["usd"]);
        assert_eq!(codes(resolver.resolve("kg", UnitKind::Measurement, "g1")), vec!["kg"]);
    }

    #[test]
    fn test_duplicated_symbol_without_allowance_is_dropped() {
        let catalog = catalog();
        let duplicated = catalog.duplicated_symbols();
        let allowances = AllowanceIndex::default();
        let resolver = Resolver::new(&catalog, &allowances, &duplicated);

        assert!(resolver.resolve("$", UnitKind::Currency, "g1").is_empty());
    }

    #[test]
    fn test_allowance_narrows_per_community() {
        let catalog = catalog();
        let duplicated = catalog.duplicated_symbols();
        let rows = vec![allowance("g1", "$", "cad")];
        let allowances = AllowanceIndex::new(&rows);
        let resolver = Resolver::new(&catalog, &allowances, &duplicated);

        assert_eq!(codes(resolver.resolve("$", UnitKind::Currency, "g1")), vec!["cad"]);
        assert!(resolver.resolve("$", UnitKind::Currency, "g2").is_empty());
    }

    #[test]
    fn test_excluded_symbol_resolves_only_through_allowance() {
        let catalog = catalog();
        let duplicated = catalog.duplicated_symbols();
        let rows = vec![allowance("g1", "r$", "brl")];
        let allowances = AllowanceIndex::new(&rows);
        let resolver = Resolver::new(&catalog, &allowances, &duplicated);

        assert_eq!(codes(resolver.resolve("r$", UnitKind::Currency, "g1")), vec!["brl"]);
        assert!(resolver.resolve("r$", UnitKind::Currency, "g2").is_empty());
    }

    #[test]
    fn test_single_matchable_candidate_beside_excluded_unit() {
        let catalog = UnitCatalog::from_units(vec![
            Unit::currency("usd", "$", "US Dollar", 1.0),
            Unit::currency("mxn", "$", "Mexican Peso", 17.1).excluded_symbol(),
        ]);
        let duplicated = catalog.duplicated_symbols();
        let none = AllowanceIndex::default();
        let resolver = Resolver::new(&catalog, &none, &duplicated);
        assert_eq!(codes(resolver.resolve("$", UnitKind::Currency, "g1")), vec!["usd"]);

        let rows = vec![allowance("g1", "$", "mxn")];
        let allowances = AllowanceIndex::new(&rows);
        let resolver = Resolver::new(&catalog, &allowances, &duplicated);
        assert_eq!(codes(resolver.resolve("$", UnitKind::Currency, "g1")), vec!["mxn"]);
        assert_eq!(codes(resolver.resolve("$", UnitKind::Currency, "g2")), vec!["usd"]);
    }

    #[test]
    fn test_allowance_for_unknown_code_degrades_to_drop() {
        let catalog = catalog();
        let duplicated = catalog.duplicated_symbols();
        let rows = vec![allowance("g1", "$", "zzz")];
        let allowances = AllowanceIndex::new(&rows);
        let resolver = Resolver::new(&catalog, &allowances, &duplicated);

        assert!(resolver.resolve("$", UnitKind::Currency, "g1").is_empty());
    }

    #[test]
    fn test_allowance_index_dedupes_and_lists_symbols() {
        let rows = vec![
            allowance("g1", "$", "cad"),
            allowance("g1", "$", "cad"),
            allowance("g1", "$", "usd"),
            allowance("g2", "r$", "brl"),
        ];
        let index = AllowanceIndex::new(&rows);
        assert_eq!(index.codes_for("g1", "$"), ["cad".to_string(), "usd".to_string()]);
        assert_eq!(index.len(), 3);
        assert!(index.symbols().contains("r$"));
        assert!(index.codes_for("g3", "$").is_empty());
    }

    #[test]
    fn test_allowance_index_lowercases_symbol_and_code() {
        let rows = vec![allowance("g1", "R$", "BRL"), allowance("g1", "r$", "brl")];
        let index = AllowanceIndex::new(&rows);
        assert_eq!(index.codes_for("g1", "r$"), ["brl".to_string()]);
    }
}
