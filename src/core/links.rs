use std::collections::HashMap;

use async_trait::async_trait;
use once_cell::sync::Lazy;

use crate::shared::error::EngineResult;
use crate::shared::types::{Unit, UnitKind};

/// Built-in measurement links. Each pair is applied in both directions.
const DEFAULT_LINK_PAIRS: &[(&str, &str)] = &[
    // Temperature
    ("c", "f"),
    // Length
    ("km", "mi"),
    ("m", "yd"),
    ("m", "ft"),
    ("cm", "in"),
    ("mm", "in"),
    // Mass
    ("kg", "lb"),
    ("g", "oz"),
    // Volume
    ("l", "gal"),
    ("ml", "floz"),
];

static DEFAULT_LINKS: Lazy<LinkTable> = Lazy::new(|| LinkTable::from_pairs(DEFAULT_LINK_PAIRS.iter().copied()));

#[derive(Debug, Clone, Default)]
pub struct LinkTable {
    links: HashMap<String, Vec<String>>,
}

impl LinkTable {
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut table = Self::default();
        for (a, b) in pairs {
            table.link(a, b);
        }
        table
    }

    /// Built-in table, optionally extended with configured pairs.
    pub fn with_extra(extra: &[(String, String)]) -> Self {
        let mut table = DEFAULT_LINKS.clone();
        for (a, b) in extra {
            table.link(a, b);
        }
        table
    }

    pub fn link(&mut self, a: &str, b: &str) {
        let (a, b) = (a.to_lowercase(), b.to_lowercase());
        if a == b {
            return;
        }
        push_unique(self.links.entry(a.clone()).or_default(), &b);
        push_unique(self.links.entry(b).or_default(), &a);
    }

    pub fn linked(&self, code: &str) -> &[String] {
        self.links.get(code).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn push_unique(codes: &mut Vec<String>, code: &str) {
    if !codes.iter().any(|existing| existing == code) {
        codes.push(code.to_string());
    }
}

/// Conversation-scoped knowledge the engine cannot derive from the text itself.
#[async_trait]
pub trait ConversationContext: Send + Sync {
    /// Currency codes relevant to the author, recent participants and community.
    async fn relevant_currency_codes(&self) -> EngineResult<Vec<String>>;
}

/// Fixed answer; useful for direct messages and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticContext {
    codes: Vec<String>,
}

impl StaticContext {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            codes: codes.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl ConversationContext for StaticContext {
    async fn relevant_currency_codes(&self) -> EngineResult<Vec<String>> {
        Ok(self.codes.clone())
    }
}

pub struct LinkSelector<'a> {
    table: &'a LinkTable,
}

impl<'a> LinkSelector<'a> {
    pub fn new(table: &'a LinkTable) -> Self {
        Self { table }
    }

    /// Target codes for `unit`. `currency_codes` is the conversation's relevant
    /// set, fetched once per scan by the caller.
    pub fn targets_for(&self, unit: &Unit, currency_codes: &[String]) -> Vec<String> {
        match unit.kind {
            UnitKind::Measurement => self.table.linked(&unit.code).to_vec(),
            UnitKind::Currency => {
                let mut targets: Vec<String> = Vec::new();
                for code in currency_codes {
                    if *code != unit.code && !targets.contains(code) {
                        targets.push(code.clone());
                    }
                }
                targets
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::types::MeasurementSubtype;

    #[test]
    fn test_default_table_is_symmetric() {
        let table = LinkTable::with_extra(&[]);
        assert_eq!(table.linked("c"), ["f".to_string()]);
        assert_eq!(table.linked("f"), ["c".to_string()]);
        assert_eq!(table.linked("m"), ["yd".to_string(), "ft".to_string()]);
        assert_eq!(table.linked("ft"), ["m".to_string()]);
        assert_eq!(table.linked("in"), ["cm".to_string(), "mm".to_string()]);
    }

    #[test]
    fn test_unlinked_unit_has_no_targets() {
        let table = LinkTable::with_extra(&[]);
        assert!(table.linked("cup").is_empty());
    }

    #[test]
    fn test_extra_links_extend_defaults() {
        let table = LinkTable::with_extra(&[("cup".to_string(), "ml".to_string())]);
        assert_eq!(table.linked("cup"), ["ml".to_string()]);
        assert_eq!(table.linked("ml"), ["floz".to_string(), "cup".to_string()]);
    }

    #[test]
    fn test_extra_links_are_lowercased() {
        let table = LinkTable::with_extra(&[("CUP".to_string(), "Ml".to_string())]);
        assert_eq!(table.linked("cup"), ["ml".to_string()]);
        assert!(table.linked("CUP").is_empty());
    }

    #[test]
    fn test_measurement_targets_come_from_table() {
        let table = LinkTable::with_extra(&[]);
        let selector = LinkSelector::new(&table);
        let km = Unit::measurement("km", "km", "Kilometre", 0.001, MeasurementSubtype::Length);
        assert_eq!(selector.targets_for(&km, &["eur".to_string()]), vec!["mi".to_string()]);
    }

    #[test]
    fn test_currency_targets_exclude_source_and_duplicates() {
        let table = LinkTable::default();
        let selector = LinkSelector::new(&table);
        let usd = Unit::currency("usd", "$", "US Dollar", 1.0);
        let relevant = vec!["eur".to_string(), "usd".to_string(), "gbp".to_string(), "eur".to_string()];
        assert_eq!(selector.targets_for(&usd, &relevant), vec!["eur".to_string(), "gbp".to_string()]);
    }

    #[tokio::test]
    async fn test_static_context() {
        let ctx = StaticContext::new(["eur", "jpy"]);
        assert_eq!(ctx.relevant_currency_codes().await.unwrap(), vec!["eur".to_string(), "jpy".to_string()]);
    }
}
