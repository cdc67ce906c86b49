//! Presentation-boundary formatting. Null metrics become the literal "N/A"
//! here and only here — internal computation keeps them as `None` so the
//! string never enters an arithmetic path.

pub const NOT_AVAILABLE: &str = "N/A";

/// Format a float as a dollar amount with thousands separators: $1,234.56
pub fn money(val: f64) -> String {
    let negative = val < 0.0;
    let abs = val.abs();
    let cents = format!("{:.2}", abs);
    let parts: Vec<&str> = cents.split('.').collect();
    let int_part = parts[0];
    let dec_part = parts[1];

    let mut with_commas = String::new();
    for (i, c) in int_part.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            with_commas.push(',');
        }
        with_commas.push(c);
    }
    let with_commas: String = with_commas.chars().rev().collect();

    if negative {
        format!("-${with_commas}.{dec_part}")
    } else {
        format!("${with_commas}.{dec_part}")
    }
}

pub fn money_opt(val: Option<f64>) -> String {
    match val {
        Some(v) => money(v),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Efficiency ratios render as fixed two-decimal strings.
pub fn ratio(val: Option<f64>) -> String {
    match val {
        Some(v) => format!("{v:.2}"),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Percentages render with one decimal and a `%` suffix.
pub fn percent(val: Option<f64>) -> String {
    match val {
        Some(v) => format!("{v:.1}%"),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn hours(val: f64) -> String {
    format!("{val:.2}")
}
