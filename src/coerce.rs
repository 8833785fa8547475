//! Non-throwing coercion of raw query results into positional rows.
//!
//! Every conversion here degrades to a zero/false/empty default with a
//! warning log instead of returning an error, which is the compatibility
//! contract legacy callers rely on.

use serde_json::Value;
use tracing::warn;

use crate::records::{Cell, Entry, Product, Row};
use crate::store::Document;

pub fn to_f64(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::String(s) => s.trim().parse().unwrap_or_else(|_| {
            warn!(value = %s, "value not coercible to float, defaulting to 0.0");
            0.0
        }),
        _ => {
            warn!(?value, "value not coercible to float, defaulting to 0.0");
            0.0
        }
    }
}

pub fn to_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().unwrap_or(0.0) != 0.0,
        _ => {
            warn!(?value, "value not coercible to bool, defaulting to false");
            false
        }
    }
}

pub fn to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// Scalar aggregate result (SUM/MAX): always exactly one row with one float
/// column, `0.0` when the pipeline produced nothing.
pub fn scalar_row(docs: &[Document], field: &str) -> Vec<Row> {
    let value = docs
        .first()
        .and_then(|d| d.get(field))
        .filter(|v| !v.is_null())
        .map(to_f64)
        .unwrap_or(0.0);
    vec![vec![Cell::Float(value)]]
}

/// COUNT result: always exactly one row with one integer column.
pub fn count_row(count: u64) -> Vec<Row> {
    vec![vec![Cell::Int(count as i64)]]
}

/// Product-alert columns: (name, batch_number, expiry_date, sales_total).
pub fn product_alert_row(product: &Product, sales_total: f64) -> Row {
    vec![
        Cell::Str(product.name.clone()),
        Cell::Str(product.batch_number.clone()),
        Cell::Str(product.expiry_date.clone()),
        Cell::Float(sales_total),
    ]
}

/// Entries columns: (date, customer_id, product_id, is_credit, total, quantity).
pub fn entry_row(entry: &Entry) -> Row {
    vec![
        Cell::Str(entry.date.clone()),
        Cell::Str(entry.customer_id.clone()),
        Cell::Str(entry.product_id.clone()),
        Cell::Bool(entry.is_credit),
        Cell::Float(entry.total()),
        Cell::Float(entry.quantity),
    ]
}

/// Transaction-join columns: (date, customer_name, product_name, is_credit,
/// total, quantity, batch_number, expiry_date). Operates on a projected
/// pipeline document.
pub fn join_row(doc: &Document) -> Row {
    let field = |name: &str| doc.get(name).cloned().unwrap_or(Value::Null);
    vec![
        Cell::Str(to_string(&field("date"))),
        Cell::Str(to_string(&field("customer_name"))),
        Cell::Str(to_string(&field("product_name"))),
        Cell::Bool(to_bool(&field("is_credit"))),
        Cell::Float(to_f64(&field("total"))),
        Cell::Float(to_f64(&field("quantity"))),
        Cell::Str(to_string(&field("batch_number"))),
        Cell::Str(to_string(&field("expiry_date"))),
    ]
}
