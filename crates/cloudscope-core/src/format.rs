//! Text formatting for measurement labels.

use crate::units::LengthUnit;

/// Inserts `,` between groups of three digits in the integer part of a number.
///
/// The sign and any fractional part are kept as they are.
pub fn add_commas(number: &str) -> String {
    let (integer, fraction) = match number.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (number, None),
    };

    let digits_start = integer
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(integer.len());
    let (sign, digits) = integer.split_at(digits_start);

    let mut grouped = String::with_capacity(number.len() + digits.len() / 3);
    grouped.push_str(sign);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if let Some(fraction) = fraction {
        grouped.push('.');
        grouped.push_str(fraction);
    }
    grouped
}

/// Formats a number with three decimals, rounding exact ties away from zero.
///
/// `format!("{:.3}")` sends ties to the even digit. A binary float sits
/// exactly halfway between two thousandths only when it is an odd multiple
/// of 1/16, so only those values take the explicit path.
pub fn to_fixed_3(value: f64) -> String {
    let sixteenths = value.abs() * 16.0;
    #[allow(clippy::float_cmp)]
    let is_tie = value.is_finite() && sixteenths.fract() == 0.0 && sixteenths % 2.0 == 1.0;
    if !is_tie {
        return format!("{value:.3}");
    }
    let thousandths = (value.abs() * 1000.0).ceil();
    format!("{:.3}", (thousandths / 1000.0).copysign(value))
}

/// Formats a space measured in `internal` units as label text in `display` units.
///
/// The result has three decimals, thousands separators, the display unit code
/// and a superscript three, e.g. `1,234.500 m³`.
pub fn format_space(space: f64, internal: &LengthUnit, display: &LengthUnit) -> String {
    let converted = internal.convert_space(space, display);
    format!(
        "{} {}\u{00B3}",
        add_commas(&to_fixed_3(converted)),
        display.code
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_commas() {
        assert_eq!(add_commas("0.000"), "0.000");
        assert_eq!(add_commas("999.500"), "999.500");
        assert_eq!(add_commas("1000"), "1,000");
        assert_eq!(add_commas("1234567.891"), "1,234,567.891");
        assert_eq!(add_commas("-1234.5"), "-1,234.5");
        assert_eq!(add_commas("123456"), "123,456");
    }

    #[test]
    fn test_format_space_in_meters() {
        let m = LengthUnit::meter();
        assert_eq!(format_space(1234.5, &m, &m), "1,234.500 m\u{00B3}");
    }

    #[test]
    fn test_format_space_converts_units() {
        let m = LengthUnit::meter();
        let ft = LengthUnit::feet();
        assert_eq!(format_space(1.0, &m, &ft), "35.315 ft\u{00B3}");
    }

    #[test]
    fn test_to_fixed_rounds_ties_up() {
        assert_eq!(to_fixed_3(0.3125), "0.313");
        assert_eq!(to_fixed_3(0.0625), "0.063");
        assert_eq!(to_fixed_3(2.4375), "2.438");
        assert_eq!(to_fixed_3(-0.3125), "-0.313");
        // Not exact ties: the nearest double decides
        assert_eq!(to_fixed_3(1.0005), "1.000");
        assert_eq!(to_fixed_3(0.1234), "0.123");
        assert_eq!(to_fixed_3(12.0), "12.000");
    }

    #[test]
    fn test_format_space_on_exact_tie() {
        let m = LengthUnit::meter();
        // 2.5 x 0.5 x 0.25 box
        assert_eq!(format_space(0.3125, &m, &m), "0.313 m\u{00B3}");
        assert_eq!(format_space(1234.0625, &m, &m), "1,234.063 m\u{00B3}");
    }
}
