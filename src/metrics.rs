//! Efficiency Ratio and invoiced-percentage derivation.
//!
//! All functions are pure and total: a zero or missing denominator yields
//! `None`, never a division-by-zero panic or an `inf`/`NaN` in the output.

use crate::models::{ProjectSummary, TOTAL_ROW_ID};

/// Parse a currency-formatted string ("$12,500.00", "(500.00)") into a
/// number. Malformed or empty input yields `None`, not zero — the null
/// propagates through every downstream formula.
pub fn parse_currency(raw: &str) -> Option<f64> {
    let s = raw.replace(',', "").replace('"', "").replace('$', "");
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return inner.trim().parse::<f64>().ok().map(|v| -v);
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Contracted dollars per cost dollar.
pub fn er_contract(contracted: Option<f64>, cost: f64) -> Option<f64> {
    match contracted {
        Some(c) if cost > 0.0 => Some(c / cost),
        _ => None,
    }
}

/// Invoiced dollars per cost dollar.
pub fn er_invoiced(invoiced: f64, cost: f64) -> Option<f64> {
    if cost > 0.0 {
        Some(invoiced / cost)
    } else {
        None
    }
}

/// Fraction of the contracted amount billed to date, capped at 100.
pub fn invoiced_percent(invoiced: f64, contracted: Option<f64>) -> Option<f64> {
    match contracted {
        Some(c) if c > 0.0 => Some((invoiced / c * 100.0).min(100.0)),
        _ => None,
    }
}

/// Primary-entity ER: contract value net of the secondary entity's cost,
/// divided by the primary entity's cost alone.
pub fn er_primary(contracted: Option<f64>, cost_type1: f64, cost_type2: f64) -> Option<f64> {
    match contracted {
        Some(c) if cost_type1 > 0.0 => Some((c - cost_type2) / cost_type1),
        _ => None,
    }
}

/// Fill the derived metric fields on an aggregated row.
pub fn derive(row: &mut ProjectSummary) {
    row.er_contract = er_contract(row.contracted_amount, row.cost);
    row.er_invoiced = er_invoiced(row.invoiced, row.cost);
    row.invoiced_percent = invoiced_percent(row.invoiced, row.contracted_amount);
    row.er_primary = er_primary(row.contracted_amount, row.cost_type1, row.cost_type2);
}

/// Build the summary row appended after the per-project rows: sums for
/// money and hours fields, ratios recomputed from the summed components
/// (weighted, not averaged). Tagged with the sentinel project id so it can
/// never be mistaken for a data row.
pub fn total_row(rows: &[ProjectSummary]) -> ProjectSummary {
    let mut total = ProjectSummary {
        project_no: TOTAL_ROW_ID.to_string(),
        ..Default::default()
    };
    let mut contracted_seen = false;
    for row in rows.iter().filter(|r| !r.is_total_row()) {
        total.hours += row.hours;
        total.hours_type1 += row.hours_type1;
        total.hours_type2 += row.hours_type2;
        total.cost += row.cost;
        total.cost_type1 += row.cost_type1;
        total.cost_type2 += row.cost_type2;
        total.invoiced += row.invoiced;
        if let Some(c) = row.contracted_amount {
            total.contracted_amount = Some(total.contracted_amount.unwrap_or(0.0) + c);
            contracted_seen = true;
        }
    }
    if !contracted_seen {
        total.contracted_amount = None;
    }
    derive(&mut total);
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fmt;

    #[test]
    fn test_parse_currency() {
        assert_eq!(parse_currency("$12,500.00"), Some(12500.0));
        assert_eq!(parse_currency("1884"), Some(1884.0));
        assert_eq!(parse_currency("(500.00)"), Some(-500.0));
        assert_eq!(parse_currency("  $42.10  "), Some(42.1));
    }

    #[test]
    fn test_parse_currency_malformed_is_none_not_zero() {
        assert_eq!(parse_currency(""), None);
        assert_eq!(parse_currency("   "), None);
        assert_eq!(parse_currency("TBD"), None);
        assert_eq!(parse_currency("$-"), None);
        assert_eq!(parse_currency("12.5k"), None);
    }

    #[test]
    fn test_er_null_on_zero_or_missing_denominator() {
        assert_eq!(er_contract(Some(1000.0), 0.0), None);
        assert_eq!(er_contract(None, 500.0), None);
        assert_eq!(er_invoiced(1000.0, 0.0), None);
        assert_eq!(er_primary(Some(1000.0), 0.0, 200.0), None);
        assert_eq!(er_primary(None, 100.0, 200.0), None);
    }

    #[test]
    fn test_er_values_are_finite() {
        let er = er_contract(Some(1000.0), 400.0).unwrap();
        assert!((er - 2.5).abs() < 1e-9);
        let er = er_invoiced(750.0, 500.0).unwrap();
        assert!((er - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_missing_contracted_amount_propagates() {
        // contracted None, cost 500 -> ER Contract None (not zero, no panic)
        assert_eq!(er_contract(None, 500.0), None);
        assert_eq!(fmt::ratio(er_contract(None, 500.0)), "N/A");
    }

    #[test]
    fn test_invoiced_percent_bounds() {
        assert_eq!(invoiced_percent(50.0, Some(200.0)), Some(25.0));
        // Over-invoiced projects cap at 100
        assert_eq!(invoiced_percent(500.0, Some(200.0)), Some(100.0));
        assert_eq!(invoiced_percent(0.0, Some(200.0)), Some(0.0));
        assert_eq!(invoiced_percent(100.0, None), None);
        assert_eq!(invoiced_percent(100.0, Some(0.0)), None);
    }

    #[test]
    fn test_primary_entity_er_scenario() {
        let er = er_primary(Some(1884.00), 1050.00, 520.00).unwrap();
        assert!((er - (1884.00 - 520.00) / 1050.00).abs() < 1e-9);
        assert_eq!(fmt::ratio(Some(er)), "1.30");
    }

    #[test]
    fn test_total_row_sums_and_reweights() {
        let mut a = ProjectSummary {
            project_no: "1001.00".to_string(),
            hours: 10.0,
            cost: 500.0,
            cost_type1: 400.0,
            cost_type2: 100.0,
            invoiced: 600.0,
            contracted_amount: Some(1000.0),
            ..Default::default()
        };
        let mut b = ProjectSummary {
            project_no: "1002.00".to_string(),
            hours: 5.0,
            cost: 250.0,
            cost_type1: 250.0,
            invoiced: 150.0,
            ..Default::default()
        };
        derive(&mut a);
        derive(&mut b);
        let total = total_row(&[a, b]);
        assert_eq!(total.project_no, TOTAL_ROW_ID);
        assert!(total.is_total_row());
        assert!((total.hours - 15.0).abs() < 1e-9);
        assert!((total.cost - 750.0).abs() < 1e-9);
        assert!((total.invoiced - 750.0).abs() < 1e-9);
        assert_eq!(total.contracted_amount, Some(1000.0));
        // ER recomputed from totals: 750 invoiced / 750 cost
        assert!((total.er_invoiced.unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_total_row_all_contracts_missing_stays_none() {
        let rows = vec![ProjectSummary { cost: 100.0, ..Default::default() }];
        let total = total_row(&rows);
        assert_eq!(total.contracted_amount, None);
        assert_eq!(total.er_contract, None);
    }

    #[test]
    fn test_total_row_ignores_existing_total_rows() {
        let a = ProjectSummary { project_no: "1001.00".into(), cost: 100.0, ..Default::default() };
        let stale = ProjectSummary { project_no: TOTAL_ROW_ID.into(), cost: 9999.0, ..Default::default() };
        let total = total_row(&[a, stale]);
        assert!((total.cost - 100.0).abs() < 1e-9);
    }
}
