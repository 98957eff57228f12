//! Kubernetes resource quantity parsing (`"2500m"`, `"4Gi"`, `"110"`).

const BINARY_SUFFIXES: [(&str, f64); 6] = [
    ("Ki", 1024.0),
    ("Mi", 1_048_576.0),
    ("Gi", 1_073_741_824.0),
    ("Ti", 1_099_511_627_776.0),
    ("Pi", 1_125_899_906_842_624.0),
    ("Ei", 1_152_921_504_606_846_976.0),
];

const DECIMAL_SUFFIXES: [(char, i32); 9] = [
    ('n', -9),
    ('u', -6),
    ('m', -3),
    ('k', 3),
    ('M', 6),
    ('G', 9),
    ('T', 12),
    ('P', 15),
    ('E', 18),
];

/// Parse a quantity into its value in base units.
///
/// Returns `None` for empty, negative or malformed input.
#[must_use]
pub fn parse_quantity(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    for (suffix, factor) in BINARY_SUFFIXES {
        if let Some(number) = raw.strip_suffix(suffix) {
            return parse_number(number).map(|value| value * factor);
        }
    }

    let last = raw.chars().last()?;
    if let Some((_, exponent)) = DECIMAL_SUFFIXES.iter().find(|(s, _)| *s == last) {
        let number = &raw[..raw.len() - last.len_utf8()];
        return parse_number(number).map(|value| scale(value, *exponent));
    }

    parse_number(raw)
}

// Dividing for negative exponents keeps "2500m" exact.
fn scale(value: f64, exponent: i32) -> f64 {
    if exponent < 0 {
        value / 10f64.powi(-exponent)
    } else {
        value * 10f64.powi(exponent)
    }
}

fn ceil_units(value: f64) -> f64 {
    let rounded = value.round();
    if (value - rounded).abs() < 1e-9 {
        rounded
    } else {
        value.ceil()
    }
}

fn parse_number(number: &str) -> Option<f64> {
    if number.is_empty() {
        return None;
    }
    let value: f64 = number.parse().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}

/// CPU quantity in millicores, rounded up.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn cpu_millis(raw: &str) -> Option<u64> {
    parse_quantity(raw).map(|cores| ceil_units(cores * 1000.0) as u64)
}

/// Memory (or any countable) quantity in whole units, rounded up.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn whole_units(raw: &str) -> Option<u64> {
    parse_quantity(raw).map(|value| ceil_units(value) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cpu_quantities() {
        assert_eq!(cpu_millis("2500m"), Some(2500));
        assert_eq!(cpu_millis("4"), Some(4000));
        assert_eq!(cpu_millis("0.5"), Some(500));
        assert_eq!(cpu_millis("100u"), Some(1));
    }

    #[test]
    fn parses_memory_quantities() {
        assert_eq!(whole_units("4Gi"), Some(4 * 1024 * 1024 * 1024));
        assert_eq!(whole_units("1024Ki"), Some(1_048_576));
        assert_eq!(whole_units("1G"), Some(1_000_000_000));
        assert_eq!(whole_units("1e3"), Some(1000));
        assert_eq!(whole_units("110"), Some(110));
    }

    #[test]
    fn rejects_malformed_quantities() {
        assert_eq!(parse_quantity(""), None);
        assert_eq!(parse_quantity("Gi"), None);
        assert_eq!(parse_quantity("-1"), None);
        assert_eq!(parse_quantity("four"), None);
        assert_eq!(parse_quantity("12Xi"), None);
    }
}
