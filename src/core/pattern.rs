use std::collections::HashMap;

use enum_dispatch::enum_dispatch;
use regex::Regex;

use crate::core::catalog::UnitCatalog;
use crate::shared::error::EngineResult;
use crate::shared::types::UnitKind;

/// Shape of a quantity expression for one unit kind.
#[enum_dispatch]
pub trait MatchShape {
    fn kind(&self) -> UnitKind;

    /// Wrap a key alternation into the full expression with `value` and `unit` groups.
    fn assemble(&self, alternation: &str) -> String;

    /// Whether a trailing k/m may scale the value.
    fn accepts_magnitude_suffix(&self) -> bool;
}

/// `50kg`, `-3.5c`: signed number, then unit.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeasurementShape;

impl MatchShape for MeasurementShape {
    fn kind(&self) -> UnitKind {
        UnitKind::Measurement
    }

    fn assemble(&self, alternation: &str) -> String {
        format!(r"(?P<value>-?\d+(?:\.\d+)?)(?P<unit>{})", alternation)
    }

    fn accepts_magnitude_suffix(&self) -> bool {
        false
    }
}

/// `$50`, `€12.5`: symbol, then unsigned number.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrencyShape;

impl MatchShape for CurrencyShape {
    fn kind(&self) -> UnitKind {
        UnitKind::Currency
    }

    fn assemble(&self, alternation: &str) -> String {
        format!(r"(?P<unit>{})(?P<value>\d+(?:\.\d+)?)", alternation)
    }

    fn accepts_magnitude_suffix(&self) -> bool {
        true
    }
}

#[enum_dispatch(MatchShape)]
#[derive(Debug, Clone, Copy)]
pub enum PatternShape {
    Measurement(MeasurementShape),
    Currency(CurrencyShape),
}

impl PatternShape {
    pub fn for_kind(kind: UnitKind) -> Self {
        match kind {
            UnitKind::Measurement => MeasurementShape.into(),
            UnitKind::Currency => CurrencyShape.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompiledPattern {
    shape: PatternShape,
    regex: Option<Regex>,
    squared_keys: HashMap<String, String>,
    key_count: usize,
}

impl CompiledPattern {
    /// Placeholder for a kind with no registered keys.
    pub fn stale(kind: UnitKind) -> Self {
        Self {
            shape: PatternShape::for_kind(kind),
            regex: None,
            squared_keys: HashMap::new(),
            key_count: 0,
        }
    }

    pub fn kind(&self) -> UnitKind {
        self.shape.kind()
    }

    pub fn shape(&self) -> &PatternShape {
        &self.shape
    }

    pub fn regex(&self) -> Option<&Regex> {
        self.regex.as_ref()
    }

    /// Built from an empty key set; must be rebuilt once units exist.
    pub fn is_stale(&self) -> bool {
        self.regex.is_none()
    }

    pub fn key_count(&self) -> usize {
        self.key_count
    }

    /// Base key for a derived area key ("sqcm" -> "cm").
    pub fn squared_base(&self, key: &str) -> Option<&str> {
        self.squared_keys.get(key).map(String::as_str)
    }
}

pub struct PatternBuilder;

impl PatternBuilder {
    pub fn build(catalog: &UnitCatalog, kind: UnitKind) -> EngineResult<CompiledPattern> {
        Self::build_with(catalog, kind, std::iter::empty())
    }

    /// Build with additional keys (allowance symbols that opted out of plain matching).
    pub fn build_with<I>(catalog: &UnitCatalog, kind: UnitKind, extra_keys: I) -> EngineResult<CompiledPattern>
    where
        I: IntoIterator<Item = String>,
    {
        let mut keys = catalog.keys(kind);
        keys.extend(extra_keys.into_iter().filter(|key| !key.is_empty()));

        if keys.is_empty() {
            log::debug!("[PatternBuilder] No {:?} keys registered, pattern is stale", kind);
            return Ok(CompiledPattern::stale(kind));
        }

        let shape = PatternShape::for_kind(kind);
        let alternation = alternation(keys.iter().map(String::as_str));
        let regex = Regex::new(&shape.assemble(&alternation))?;

        let squared_keys = if kind == UnitKind::Measurement {
            catalog.squared_keys().clone()
        } else {
            HashMap::new()
        };

        log::debug!("[PatternBuilder] Compiled {:?} pattern over {} keys", kind, keys.len());

        Ok(CompiledPattern {
            shape,
            regex: Some(regex),
            squared_keys,
            key_count: keys.len(),
        })
    }
}

/// Escaped alternation, longest keys first so `sqft` wins over `ft`.
fn alternation<'a, I>(keys: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut keys: Vec<&str> = keys.into_iter().collect();
    keys.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then_with(|| a.cmp(b)));
    keys.dedup();
    keys.iter()
        .map(|key| regex::escape(key))
        .collect::<Vec<_>>()
        .join("|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::types::{MeasurementSubtype, Unit};

    fn catalog() -> UnitCatalog {
        UnitCatalog::from_units(vec![
            Unit::measurement("ft", "ft", "Foot", 3.28084, MeasurementSubtype::Length).squareable(),
            Unit::measurement("m", "m", "Metre", 1.0, MeasurementSubtype::Length).squareable(),
            Unit::measurement("mi", "mi", "Mile", 0.000621371, MeasurementSubtype::Length),
            Unit::currency("usd", "$", "US Dollar", 1.0),
            Unit::currency("gbp", "£", "Pound Sterling", 0.79),
        ])
    }

    #[test]
    fn test_alternation_prefers_longest() {
        assert_eq!(alternation(["ft", "sqft", "m", "mi"]), "sqft|ft|mi|m");
    }

    #[test]
    fn test_alternation_escapes_metacharacters() {
        assert_eq!(alternation(["$", "usd"]), r"usd|\$");
    }

    #[test]
    fn test_measurement_pattern_matches_square_form_first() {
        let pattern = PatternBuilder::build(&catalog(), UnitKind::Measurement).unwrap();
        let regex = pattern.regex().unwrap();

        let caps = regex.captures("room is 12sqft").unwrap();
        assert_eq!(&caps["value"], "12");
        assert_eq!(&caps["unit"], "sqft");
        assert_eq!(pattern.squared_base("sqft"), Some("ft"));

        let caps = regex.captures("-3.5mi").unwrap();
        assert_eq!(&caps["value"], "-3.5");
        assert_eq!(&caps["unit"], "mi");
    }

    #[test]
    fn test_currency_pattern_symbol_before_number() {
        let pattern = PatternBuilder::build(&catalog(), UnitKind::Currency).unwrap();
        let regex = pattern.regex().unwrap();

        let caps = regex.captures("costs $20.50 now").unwrap();
        assert_eq!(&caps["unit"], "$");
        assert_eq!(&caps["value"], "20.50");
        assert!(regex.captures("20$").is_none());
        assert!(regex.captures("$-5").is_none());
    }

    #[test]
    fn test_empty_catalog_pattern_is_stale() {
        let pattern = PatternBuilder::build(&UnitCatalog::new(), UnitKind::Currency).unwrap();
        assert!(pattern.is_stale());
        assert_eq!(pattern.key_count(), 0);

        let rebuilt = PatternBuilder::build(&catalog(), UnitKind::Currency).unwrap();
        assert!(!rebuilt.is_stale());
    }

    #[test]
    fn test_extra_keys_are_included() {
        let pattern = PatternBuilder::build_with(
            &catalog(),
            UnitKind::Currency,
            vec!["r$".to_string()],
        )
        .unwrap();
        let caps = pattern.regex().unwrap().captures("r$30").unwrap();
        assert_eq!(&caps["unit"], "r$");
    }
}
