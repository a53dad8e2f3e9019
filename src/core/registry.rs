// Rates are the value of one family reference unit (metre, kilogram, litre,
// US dollar) in each unit. Temperature rates are unused.

use crate::shared::types::{MeasurementSubtype, Unit};

use MeasurementSubtype::{Length, Mass, Temperature, Volume};

pub fn builtin_units() -> Vec<Unit> {
    let mut units = Vec::new();
    units.extend(measurements());
    units.extend(currencies());
    units
}

fn measurements() -> Vec<Unit> {
    vec![
        // Length (reference: metre)
        Unit::measurement("mm", "mm", "Millimetres", 1000.0, Length).squareable(),
        Unit::measurement("cm", "cm", "Centimetres", 100.0, Length).squareable(),
        Unit::measurement("m", "m", "Metres", 1.0, Length).squareable(),
        Unit::measurement("km", "km", "Kilometres", 0.001, Length).squareable(),
        Unit::measurement("in", "in", "Inches", 39.3701, Length).squareable(),
        Unit::measurement("ft", "ft", "Feet", 3.28084, Length).squareable(),
        Unit::measurement("yd", "yd", "Yards", 1.09361, Length).squareable(),
        Unit::measurement("mi", "mi", "Miles", 0.000621371, Length).squareable(),
        // Mass (reference: kilogram)
        Unit::measurement("g", "g", "Grams", 1000.0, Mass),
        Unit::measurement("kg", "kg", "Kilograms", 1.0, Mass),
        Unit::measurement("oz", "oz", "Ounces", 35.274, Mass),
        Unit::measurement("lb", "lbs", "Pounds", 2.20462, Mass),
        // Volume (reference: litre)
        Unit::measurement("ml", "ml", "Millilitres", 1000.0, Volume),
        Unit::measurement("l", "l", "Litres", 1.0, Volume),
        Unit::measurement("floz", "fl.oz", "Fluid Ounces", 33.814, Volume),
        Unit::measurement("cup", "cups", "Cups", 4.22675, Volume),
        Unit::measurement("gal", "gal", "Gallons", 0.264172, Volume),
        // Temperature
        Unit::measurement("c", "°c", "Celsius", 1.0, Temperature),
        Unit::measurement("f", "°f", "Fahrenheit", 1.0, Temperature),
    ]
}

fn currencies() -> Vec<Unit> {
    vec![
        Unit::currency("usd", "$", "US Dollar", 1.0),
        Unit::currency("cad", "$", "Canadian Dollar", 1.36),
        Unit::currency("aud", "$", "Australian Dollar", 1.52),
        Unit::currency("mxn", "$", "Mexican Peso", 17.1).excluded_symbol(),
        Unit::currency("eur", "€", "Euro", 0.92),
        Unit::currency("gbp", "£", "British Pound", 0.79),
        Unit::currency("jpy", "¥", "Japanese Yen", 149.5),
        Unit::currency("cny", "¥", "Chinese Yuan", 7.24),
        Unit::currency("chf", "chf", "Swiss Franc", 0.88),
        Unit::currency("inr", "₹", "Indian Rupee", 83.2),
    ]
}
