use crate::shared::types::Unit;

pub const CELSIUS: &str = "c";
pub const FAHRENHEIT: &str = "f";

pub fn convert(from: &Unit, to: &Unit, value: f64, squared: bool) -> f64 {
    if from.code == to.code {
        return value;
    }

    // Formula: F = C x 1.8 + 32
    match (from.code.as_str(), to.code.as_str()) {
        (CELSIUS, FAHRENHEIT) => return value * 1.8 + 32.0,
        (FAHRENHEIT, CELSIUS) => return (value - 32.0) / 1.8,
        _ => {}
    }

    if squared {
        // sqrt of a negative area is undefined; carry the sign through
        let linear = (to.rate * value.abs().sqrt()) / from.rate;
        return linear.powi(2).copysign(value);
    }

    (to.rate * value) / from.rate
}
