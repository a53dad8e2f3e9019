use crate::shared::types::{ConversionResult, Quantity, UnitKind};

/// One display line per result. Results without targets are omitted.
pub fn render_all(results: &[ConversionResult]) -> Vec<String> {
    results.iter().filter_map(render_result).collect()
}

// "50 kg = 110.23 lbs", "100 sq cm = 15.5 sq in", "50 CAD = 33.82 EUR, 29.04 GBP"
pub fn render_result(result: &ConversionResult) -> Option<String> {
    if result.targets.is_empty() {
        return None;
    }

    let targets: Vec<String> = result
        .targets
        .iter()
        .map(|target| render_quantity(target, result.squared))
        .collect();

    Some(format!(
        "{} = {}",
        render_quantity(&result.base, result.squared),
        targets.join(", ")
    ))
}

pub fn render_quantity(quantity: &Quantity, squared: bool) -> String {
    let value = format_number(quantity.value);
    match quantity.unit.kind {
        UnitKind::Currency => format!("{} {}", value, quantity.unit.code.to_uppercase()),
        UnitKind::Measurement if squared => format!("{} sq {}", value, quantity.unit.symbol),
        UnitKind::Measurement => format!("{} {}", value, quantity.unit.symbol),
    }
}

// Thousands separators, at most 2 decimals, trailing zeros stripped.
// 130000.0 -> "130,000", 12.5 -> "12.5", 12.567 -> "12.57"
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value.is_sign_positive() { "∞".to_string() } else { "-∞".to_string() };
    }

    let fixed = format!("{:.2}", value.abs());
    let (integer, decimals) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let decimals = decimals.trim_end_matches('0');

    let mut formatted = String::with_capacity(fixed.len() + integer.len() / 3 + 1);
    if value < 0.0 && (integer != "0" || !decimals.is_empty()) {
        formatted.push('-');
    }
    // integer is ASCII digits only
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            formatted.push(',');
        }
        formatted.push(digit);
    }
    if !decimals.is_empty() {
        formatted.push('.');
        formatted.push_str(decimals);
    }
    formatted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::types::{MeasurementSubtype, Unit};

    fn quantity(unit: Unit, value: f64) -> Quantity {
        Quantity { unit, value }
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(130000.0), "130,000");
        assert_eq!(format_number(12.5), "12.5");
        assert_eq!(format_number(12.567), "12.57");
        assert_eq!(format_number(110.231), "110.23");
        assert_eq!(format_number(1234567.891), "1,234,567.89");
        assert_eq!(format_number(0.001), "0");
        assert_eq!(format_number(-3.5), "-3.5");
        assert_eq!(format_number(-0.001), "0");
        assert_eq!(format_number(-1500.0), "-1,500");
        assert_eq!(format_number(0.01), "0.01");
    }

    #[test]
    fn test_format_number_grouping_edges() {
        assert_eq!(format_number(999.0), "999");
        assert_eq!(format_number(1000.0), "1,000");
        assert_eq!(format_number(100000.5), "100,000.5");
        assert_eq!(format_number(-999999.999), "-1,000,000");
    }

    #[test]
    fn test_render_measurement() {
        let kg = Unit::measurement("kg", "kg", "Kilogram", 1.0, MeasurementSubtype::Mass);
        let lb = Unit::measurement("lb", "lbs", "Pound", 2.20462, MeasurementSubtype::Mass);
        let result = ConversionResult {
            base: quantity(kg, 50.0),
            targets: vec![quantity(lb, 110.231)],
            squared: false,
        };
        assert_eq!(render_result(&result).unwrap(), "50 kg = 110.23 lbs");
    }

    #[test]
    fn test_render_squared_and_currency() {
        let cm = Unit::measurement("cm", "cm", "Centimetre", 100.0, MeasurementSubtype::Length);
        let m = Unit::measurement("m", "m", "Metre", 1.0, MeasurementSubtype::Length);
        let squared = ConversionResult {
            base: quantity(cm, 100.0),
            targets: vec![quantity(m, 0.01)],
            squared: true,
        };
        assert_eq!(render_result(&squared).unwrap(), "100 sq cm = 0.01 sq m");

        let cad = Unit::currency("cad", "$", "Canadian Dollar", 1.36);
        let eur = Unit::currency("eur", "€", "Euro", 0.92);
        let gbp = Unit::currency("gbp", "£", "British Pound", 0.79);
        let money = ConversionResult {
            base: quantity(cad, 5000.0),
            targets: vec![quantity(eur, 3382.35), quantity(gbp, 2904.4)],
            squared: false,
        };
        assert_eq!(render_result(&money).unwrap(), "5,000 CAD = 3,382.35 EUR, 2,904.4 GBP");
    }

    #[test]
    fn test_results_without_targets_are_omitted() {
        let cup = Unit::measurement("cup", "cups", "Cups", 4.22675, MeasurementSubtype::Volume);
        let result = ConversionResult {
            base: quantity(cup, 2.0),
            targets: Vec::new(),
            squared: false,
        };
        assert!(render_result(&result).is_none());
        assert!(render_all(&[result]).is_empty());
    }
}
