//! `Double.toString` / `Float.toString` formatting

/// Format a double the way `java.lang.Double.toString` does
pub fn format_double(d: f64) -> String {
    if let Some(special) = special(d.is_nan(), d.is_infinite(), d.is_sign_negative(), d == 0.0) {
        return special;
    }
    let abs = d.abs();
    if (1e-3..1e7).contains(&abs) {
        format!("{:?}", d)
    } else {
        scientific(format!("{:e}", d))
    }
}

/// Format a float the way `java.lang.Float.toString` does
pub fn format_float(f: f32) -> String {
    if let Some(special) = special(f.is_nan(), f.is_infinite(), f.is_sign_negative(), f == 0.0) {
        return special;
    }
    let abs = f.abs();
    if (1e-3..1e7).contains(&abs) {
        format!("{:?}", f)
    } else {
        scientific(format!("{:e}", f))
    }
}

fn special(nan: bool, infinite: bool, negative: bool, zero: bool) -> Option<String> {
    let text = match (nan, infinite, zero, negative) {
        (true, ..) => "NaN",
        (_, true, _, false) => "Infinity",
        (_, true, _, true) => "-Infinity",
        (_, _, true, false) => "0.0",
        (_, _, true, true) => "-0.0",
        _ => return None,
    };
    Some(text.to_string())
}

/// `1.5e-5` becomes `1.5E-5`, `1e7` becomes `1.0E7`
fn scientific(rust: String) -> String {
    match rust.split_once('e') {
        Some((mantissa, exp)) if mantissa.contains('.') => format!("{}E{}", mantissa, exp),
        Some((mantissa, exp)) => format!("{}.0E{}", mantissa, exp),
        None => rust,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_range() {
        assert_eq!(format_double(60.0), "60.0");
        assert_eq!(format_double(1.5), "1.5");
        assert_eq!(format_double(-0.25), "-0.25");
        assert_eq!(format_double(0.001), "0.001");
        assert_eq!(format_double(1234567.0), "1234567.0");
    }

    #[test]
    fn test_scientific_range() {
        assert_eq!(format_double(1e7), "1.0E7");
        assert_eq!(format_double(1.5e-5), "1.5E-5");
        assert_eq!(format_double(1e-4), "1.0E-4");
        assert_eq!(format_double(-2.5e10), "-2.5E10");
    }

    #[test]
    fn test_special_values() {
        assert_eq!(format_double(f64::NAN), "NaN");
        assert_eq!(format_double(f64::INFINITY), "Infinity");
        assert_eq!(format_double(f64::NEG_INFINITY), "-Infinity");
        assert_eq!(format_double(0.0), "0.0");
        assert_eq!(format_double(-0.0), "-0.0");
    }

    #[test]
    fn test_float() {
        assert_eq!(format_float(2.5), "2.5");
        assert_eq!(format_float(3.0), "3.0");
        assert_eq!(format_float(1e8), "1.0E8");
    }
}
