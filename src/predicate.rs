//! Derives store filters from substring patterns in the query text plus
//! positional parameters.
//!
//! All date comparisons are lexicographic on the raw strings; this only
//! behaves correctly for `YYYY-MM-DD` formatted values, which is exactly how
//! the legacy callers store dates.

use serde_json::Value;

use crate::records::Cell;
use crate::store::Filter;

/// Filter for entries-backed queries: credit flag and date range.
///
/// `DATE >=` binds params[0], `DATE <=` binds params[1]; a pattern without
/// its parameter is ignored.
pub fn entry_filter(text: &str, params: &[Cell]) -> Filter {
    let mut filter = Filter::new();

    if text.contains("IS_CREDIT = 1") {
        filter = filter.eq("is_credit", Value::Bool(true));
    } else if text.contains("IS_CREDIT = 0") {
        filter = filter.eq("is_credit", Value::Bool(false));
    }

    if text.contains("DATE >=") {
        if let Some(from) = param_str(params, 0) {
            filter = filter.gte("date", Value::String(from));
        }
    }
    if text.contains("DATE <=") {
        if let Some(to) = param_str(params, 1) {
            filter = filter.lte("date", Value::String(to));
        }
    }

    filter
}

/// Filter for product expiry queries: `EXPIRY_DATE < ?` takes params[0];
/// `EXPIRY_DATE >= ?` forms an inclusive range over params[0] and params[1].
pub fn expiry_filter(text: &str, params: &[Cell]) -> Filter {
    let mut filter = Filter::new();

    if text.contains("EXPIRY_DATE >=") {
        if let (Some(from), Some(to)) = (param_str(params, 0), param_str(params, 1)) {
            filter = filter
                .gte("expiry_date", Value::String(from))
                .lte("expiry_date", Value::String(to));
        }
    } else if text.contains("EXPIRY_DATE <") {
        if let Some(before) = param_str(params, 0) {
            filter = filter.lt("expiry_date", Value::String(before));
        }
    }

    filter
}

fn param_str(params: &[Cell], index: usize) -> Option<String> {
    params.get(index).and_then(Cell::as_str).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use crate::store::Document;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => Document::new(),
        }
    }

    #[test]
    fn credit_flag_patterns() {
        let credit = entry_filter("WHERE IS_CREDIT = 1", &[]);
        assert!(credit.matches(&doc(json!({"is_credit": true}))));
        assert!(!credit.matches(&doc(json!({"is_credit": false}))));

        let debit = entry_filter("WHERE IS_CREDIT = 0", &[]);
        assert!(debit.matches(&doc(json!({"is_credit": false}))));
    }

    #[test]
    fn date_range_binds_positional_params() {
        let params = vec![
            Cell::Str("2023-01-01".to_string()),
            Cell::Str("2023-06-30".to_string()),
        ];
        let filter = entry_filter("WHERE DATE >= ? AND DATE <= ?", &params);
        assert!(filter.matches(&doc(json!({"date": "2023-03-15"}))));
        assert!(!filter.matches(&doc(json!({"date": "2022-12-31"}))));
        assert!(!filter.matches(&doc(json!({"date": "2023-07-01"}))));
    }

    #[test]
    fn date_pattern_without_param_is_ignored() {
        let filter = entry_filter("WHERE DATE >= ?", &[]);
        assert!(filter.is_empty());
    }

    #[test]
    fn expiry_before_cutoff() {
        let params = vec![Cell::Str("2025-01-01".to_string())];
        let filter = expiry_filter("WHERE P.EXPIRY_DATE < ?", &params);
        assert!(filter.matches(&doc(json!({"expiry_date": "2024-01-01"}))));
        assert!(!filter.matches(&doc(json!({"expiry_date": "2030-01-01"}))));
    }

    #[test]
    fn expiry_range_is_inclusive_on_both_ends() {
        let params = vec![
            Cell::Str("2024-01-01".to_string()),
            Cell::Str("2024-12-31".to_string()),
        ];
        let filter = expiry_filter("WHERE P.EXPIRY_DATE >= ? AND P.EXPIRY_DATE <= ?", &params);
        assert!(filter.matches(&doc(json!({"expiry_date": "2024-01-01"}))));
        assert!(filter.matches(&doc(json!({"expiry_date": "2024-12-31"}))));
        assert!(!filter.matches(&doc(json!({"expiry_date": "2025-01-01"}))));
    }
}
