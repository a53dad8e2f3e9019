use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Measurement,
    Currency,
}

/// Unit families for measurements. Rates are only comparable within one family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementSubtype {
    Length,
    Temperature,
    Mass,
    Volume,
}

/// A convertible unit of measure or currency.
///
/// `rate` is the value of one reference unit of the family expressed in this
/// unit (1 metre = 3.28084 ft, so `ft.rate == 3.28084`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub code: String,
    pub symbol: String,
    pub name: String,
    pub rate: f64,
    pub kind: UnitKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<MeasurementSubtype>,
    #[serde(default)]
    pub squareable: bool,
    #[serde(default)]
    pub exclude_symbol_from_matching: bool,
}

impl Unit {
    pub fn measurement(
        code: &str,
        symbol: &str,
        name: &str,
        rate: f64,
        subtype: MeasurementSubtype,
    ) -> Self {
        Self {
            code: code.to_string(),
            symbol: symbol.to_string(),
            name: name.to_string(),
            rate,
            kind: UnitKind::Measurement,
            subtype: Some(subtype),
            squareable: false,
            exclude_symbol_from_matching: false,
        }
    }

    pub fn currency(code: &str, symbol: &str, name: &str, rate: f64) -> Self {
        Self {
            code: code.to_string(),
            symbol: symbol.to_string(),
            name: name.to_string(),
            rate,
            kind: UnitKind::Currency,
            subtype: None,
            squareable: false,
            exclude_symbol_from_matching: false,
        }
    }

    pub fn squareable(mut self) -> Self {
        self.squareable = true;
        self
    }

    pub fn excluded_symbol(mut self) -> Self {
        self.exclude_symbol_from_matching = true;
        self
    }

    pub fn is_currency(&self) -> bool {
        self.kind == UnitKind::Currency
    }
}

/// Per-community override narrowing an ambiguous symbol to one currency.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommunityCurrencyAllowance {
    pub community_id: String,
    pub symbol: String,
    pub unit_code: String,
}

/// One raw (unit-token, value) pair pulled out of a message.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchToken {
    /// Unit key as matched, with any `sq` prefix already stripped.
    pub raw_text: String,
    pub value: f64,
    pub is_squared: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quantity {
    pub unit: Unit,
    pub value: f64,
}

/// Engine output for one recognised source expression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionResult {
    pub base: Quantity,
    pub targets: Vec<Quantity>,
    pub squared: bool,
}

/// Results plus the number of tokens dropped as unresolved ambiguities.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanOutcome {
    pub results: Vec<ConversionResult>,
    pub ambiguous_dropped: usize,
}

/// JSON document used to seed a store: units, allowances and currency preferences.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSeed {
    pub units: Vec<Unit>,
    pub allowances: Vec<CommunityCurrencyAllowance>,
    pub user_currencies: HashMap<String, Vec<String>>,
    pub community_currencies: HashMap<String, Vec<String>>,
}
