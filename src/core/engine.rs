use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::core::calculator;
use crate::core::catalog::UnitCatalog;
use crate::core::links::{ConversationContext, LinkSelector, LinkTable};
use crate::core::pattern::{CompiledPattern, PatternBuilder};
use crate::core::resolver::{AllowanceIndex, Resolver};
use crate::core::tokenizer::{self, ScanOptions};
use crate::shared::error::{EngineError, EngineResult};
use crate::shared::settings::{BoundarySet, EngineSettings};
use crate::shared::types::{
    CommunityCurrencyAllowance, ConversionResult, MatchToken, Quantity, ScanOutcome, Unit, UnitKind,
};
use crate::store::{is_valid_rate, UnitStore};

const KINDS: [UnitKind; 2] = [UnitKind::Measurement, UnitKind::Currency];

// Immutable once published; mutations build a new snapshot and swap the Arc.
#[derive(Debug, Clone)]
pub struct EngineSnapshot {
    pub catalog: UnitCatalog,
    pub allowances: AllowanceIndex,
    /// Symbols shared by two or more currencies, computed once per build.
    pub duplicated: HashSet<String>,
    pub links: LinkTable,
    pub measurement: CompiledPattern,
    pub currency: CompiledPattern,
}

impl EngineSnapshot {
    /// Snapshot with no units; both patterns are stale.
    pub fn empty(settings: &EngineSettings) -> Self {
        Self {
            catalog: UnitCatalog::new(),
            allowances: AllowanceIndex::default(),
            duplicated: HashSet::new(),
            links: LinkTable::with_extra(&settings.extra_links),
            measurement: CompiledPattern::stale(UnitKind::Measurement),
            currency: CompiledPattern::stale(UnitKind::Currency),
        }
    }

    pub fn build(
        units: Vec<Unit>,
        allowances: &[CommunityCurrencyAllowance],
        settings: &EngineSettings,
    ) -> EngineResult<Self> {
        Self::compile(
            UnitCatalog::from_units(units),
            AllowanceIndex::new(allowances),
            LinkTable::with_extra(&settings.extra_links),
        )
    }

    fn compile(catalog: UnitCatalog, allowances: AllowanceIndex, links: LinkTable) -> EngineResult<Self> {
        let measurement = PatternBuilder::build(&catalog, UnitKind::Measurement)?;

        // Excluded symbols only become matchable once some community allows them.
        let allowed_symbols: Vec<String> = allowances
            .symbols()
            .into_iter()
            .filter(|symbol| !catalog.units_with_symbol(symbol, Some(UnitKind::Currency)).is_empty())
            .collect();
        let currency = PatternBuilder::build_with(&catalog, UnitKind::Currency, allowed_symbols)?;

        Ok(Self {
            duplicated: catalog.duplicated_symbols(),
            catalog,
            allowances,
            links,
            measurement,
            currency,
        })
    }

    pub fn pattern(&self, kind: UnitKind) -> &CompiledPattern {
        match kind {
            UnitKind::Measurement => &self.measurement,
            UnitKind::Currency => &self.currency,
        }
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.catalog, &self.allowances, &self.duplicated)
    }

    /// One result for `unit`, converting into every linked unit of the same kind.
    fn convert_token(&self, unit: &Unit, token: &MatchToken, currency_codes: &[String]) -> ConversionResult {
        let selector = LinkSelector::new(&self.links);
        let mut targets: Vec<Quantity> = Vec::new();

        for code in selector.targets_for(unit, currency_codes) {
            let Some(target) = self.catalog.get(&code, Some(unit.kind)) else {
                log::debug!("[Engine] Link {} -> {} has no catalog unit", unit.code, code);
                continue;
            };
            if target.code == unit.code || targets.iter().any(|q| q.unit.code == target.code) {
                continue;
            }
            if token.is_squared && !target.squareable {
                continue;
            }
            if target.subtype != unit.subtype {
                log::warn!("[Engine] Ignoring cross-family link {} -> {}", unit.code, target.code);
                continue;
            }

            targets.push(Quantity {
                unit: target.clone(),
                value: calculator::convert(unit, target, token.value, token.is_squared),
            });
        }

        ConversionResult {
            base: Quantity {
                unit: unit.clone(),
                value: token.value,
            },
            targets,
            squared: token.is_squared,
        }
    }
}

pub struct ConversionEngine {
    settings: EngineSettings,
    boundaries: BoundarySet,
    current: RwLock<Arc<EngineSnapshot>>,
}

impl ConversionEngine {
    pub fn new(settings: EngineSettings) -> Self {
        let snapshot = EngineSnapshot::empty(&settings);
        Self {
            boundaries: settings.boundary_set(),
            settings,
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// Engine with the store's catalog already published.
    pub async fn load(settings: EngineSettings, store: &dyn UnitStore) -> EngineResult<Self> {
        let engine = Self::new(settings);
        engine.rebuild(store).await?;
        Ok(engine)
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// The currently published snapshot.
    pub fn snapshot(&self) -> Arc<EngineSnapshot> {
        Arc::clone(&self.read_lock())
    }

    /// Reload units and allowances from `store`. On failure the previous
    /// snapshot stays published.
    pub async fn rebuild(&self, store: &dyn UnitStore) -> EngineResult<()> {
        let loaded = async {
            let units = store.load_units().await?;
            let allowances = store.load_allowances().await?;
            Ok::<_, EngineError>((units, allowances))
        }
        .await;

        match loaded {
            Ok((units, allowances)) => self.rebuild_from(units, &allowances),
            Err(e) => {
                log::warn!("[Engine] Rebuild failed, keeping previous catalog: {}", e);
                Err(e)
            }
        }
    }

    pub fn rebuild_from(
        &self,
        units: Vec<Unit>,
        allowances: &[CommunityCurrencyAllowance],
    ) -> EngineResult<()> {
        let snapshot = EngineSnapshot::build(units, allowances, &self.settings)?;
        log::info!(
            "[Engine] Published catalog: {} units, {} allowances",
            snapshot.catalog.len(),
            snapshot.allowances.len()
        );
        *self.write_lock() = Arc::new(snapshot);
        Ok(())
    }

    /// Register one unit and recompile both patterns.
    pub fn add_unit(&self, unit: Unit) -> EngineResult<()> {
        if unit.code.is_empty() || unit.symbol.is_empty() {
            return Err(EngineError::Validation("Unit code and symbol must not be empty".to_string()));
        }
        if !is_valid_rate(unit.rate) {
            return Err(EngineError::Validation(format!("Invalid rate for {}: {}", unit.code, unit.rate)));
        }

        let mut guard = self.write_lock();
        let mut catalog = guard.catalog.clone();
        let code = unit.code.clone();
        catalog.add(unit);
        let snapshot = EngineSnapshot::compile(catalog, guard.allowances.clone(), guard.links.clone())?;
        *guard = Arc::new(snapshot);

        log::info!("[Engine] Added unit '{}'", code);
        Ok(())
    }

    /// Overwrite currency rates in place. Patterns are reused as is.
    /// Returns the number of rates applied.
    pub fn apply_rates(&self, rates: &HashMap<String, f64>) -> usize {
        let mut guard = self.write_lock();
        let mut next = EngineSnapshot::clone(&guard);
        let mut applied = 0;

        for (code, &rate) in rates {
            let code = code.to_lowercase();
            if !is_valid_rate(rate) {
                log::warn!("[Engine] Rejected rate for {}: {}", code, rate);
                continue;
            }
            if next.catalog.get(&code, Some(UnitKind::Currency)).is_none() {
                log::debug!("[Engine] No currency '{}' for incoming rate", code);
                continue;
            }
            if next.catalog.set_rate(&code, rate) {
                applied += 1;
            }
        }

        if applied > 0 {
            *guard = Arc::new(next);
            log::info!("[Engine] Applied {} currency rates", applied);
        }
        applied
    }

    /// Scan one lowercased message body. Never fails; degraded paths are logged.
    pub async fn scan(
        &self,
        text: &str,
        community: &str,
        context: &dyn ConversationContext,
    ) -> ScanOutcome {
        let snapshot = self.snapshot();
        let resolver = snapshot.resolver();
        let options = ScanOptions {
            boundaries: &self.boundaries,
            abbreviations: self.settings.currency_abbreviations,
        };

        let mut outcome = ScanOutcome::default();
        let mut currency_codes: Option<Vec<String>> = None;

        for kind in KINDS {
            let tokens: Vec<MatchToken> = tokenizer::scan(text, snapshot.pattern(kind), options).collect();

            for token in tokens {
                let mut units = resolver.resolve(&token.raw_text, kind, community);
                if units.is_empty() {
                    if resolver.is_restricted(&token.raw_text, kind) {
                        outcome.ambiguous_dropped += 1;
                    }
                    continue;
                }
                if token.is_squared {
                    units.retain(|unit| unit.squareable);
                }

                for unit in units {
                    if unit.is_currency() && currency_codes.is_none() {
                        currency_codes = Some(fetch_currency_codes(context).await);
                    }
                    let codes = currency_codes.as_deref().unwrap_or(&[]);
                    outcome.results.push(snapshot.convert_token(&unit, &token, codes));
                }
            }
        }

        if outcome.ambiguous_dropped > 0 {
            log::debug!(
                "[Engine] Dropped {} ambiguous tokens in community {}",
                outcome.ambiguous_dropped, community
            );
        }
        outcome
    }

    pub async fn scan_message(
        &self,
        text: &str,
        community: &str,
        context: &dyn ConversationContext,
    ) -> Vec<ConversionResult> {
        self.scan(text, community, context).await.results
    }

    /// Narrow an ambiguous or excluded symbol to one currency within a community.
    pub async fn allow_symbol(
        &self,
        store: &dyn UnitStore,
        allowance: CommunityCurrencyAllowance,
    ) -> EngineResult<()> {
        let allowance = CommunityCurrencyAllowance {
            community_id: allowance.community_id,
            symbol: allowance.symbol.to_lowercase(),
            unit_code: allowance.unit_code.to_lowercase(),
        };

        {
            let snapshot = self.snapshot();
            if allowance.community_id.is_empty() {
                return Err(EngineError::Validation("Community id must not be empty".to_string()));
            }
            let carries_symbol = snapshot
                .catalog
                .units_with_symbol(&allowance.symbol, Some(UnitKind::Currency))
                .iter()
                .any(|unit| unit.code == allowance.unit_code);
            if !carries_symbol {
                return Err(EngineError::Validation(format!(
                    "No currency '{}' with symbol '{}'",
                    allowance.unit_code, allowance.symbol
                )));
            }
            if !snapshot.resolver().is_restricted(&allowance.symbol, UnitKind::Currency) {
                return Err(EngineError::Validation(format!(
                    "Symbol '{}' is not ambiguous",
                    allowance.symbol
                )));
            }
        }

        store.set_allowance(&allowance).await?;
        log::info!(
            "[Engine] Community {} allows '{}' as {}",
            allowance.community_id, allowance.symbol, allowance.unit_code
        );
        self.rebuild(store).await
    }

    /// Remove one allowance, or all of them for `symbol` when `unit_code` is
    /// `None`. Returns rows removed.
    pub async fn disallow_symbol(
        &self,
        store: &dyn UnitStore,
        community_id: &str,
        symbol: &str,
        unit_code: Option<&str>,
    ) -> EngineResult<usize> {
        let symbol = symbol.to_lowercase();
        let unit_code = unit_code.map(str::to_lowercase);
        let removed = store
            .remove_allowance(community_id, &symbol, unit_code.as_deref())
            .await?;

        if removed > 0 {
            log::info!("[Engine] Community {} removed {} allowances for '{}'", community_id, removed, symbol);
            self.rebuild(store).await?;
        }
        Ok(removed)
    }

    fn read_lock(&self) -> RwLockReadGuard<'_, Arc<EngineSnapshot>> {
        match self.current.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("[Engine] Snapshot lock poisoned, recovering...");
                poisoned.into_inner()
            }
        }
    }

    fn write_lock(&self) -> RwLockWriteGuard<'_, Arc<EngineSnapshot>> {
        match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("[Engine] Snapshot lock poisoned, recovering...");
                poisoned.into_inner()
            }
        }
    }
}

async fn fetch_currency_codes(context: &dyn ConversationContext) -> Vec<String> {
    match context.relevant_currency_codes().await {
        Ok(codes) => codes.into_iter().map(|code| code.to_lowercase()).collect(),
        Err(e) => {
            log::warn!("[Engine] Relevant currencies unavailable: {}", e);
            Vec::new()
        }
    }
}
