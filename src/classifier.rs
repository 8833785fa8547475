//! Classifies SQL-shaped query text into the small set of supported shapes.
//!
//! The precedence chain is strict and order-dependent: a `SELECT`-prefixed
//! string containing `COUNT(` is routed as a SELECT, not a COUNT. Existing
//! callers depend on this ordering, so it must not be rearranged.

use crate::store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Select(SelectShape),
    Count,
    Sum,
    Max,
    Insert,
    Update,
    Delete,
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectShape {
    /// Expiring products with positive credit sales.
    ProductAlert,
    /// Ledger entries with optional credit/date predicates.
    Entries,
    /// Recent transactions joined to customers and products.
    TransactionJoins,
    /// COUNT-shaped SELECT that matches no other shape; handed to the Count
    /// handler so `SELECT COUNT(*) FROM products` still returns a count.
    CountFallback,
    Unknown,
}

/// Classified intent of an incoming query string.
#[derive(Debug, Clone)]
pub struct QuerySpec {
    pub kind: QueryKind,
    /// Uppercased, trimmed query text; all later substring sniffing (shape
    /// dispatch, predicate extraction, target collection) works on this.
    pub text: String,
}

pub fn classify(query: &str) -> QuerySpec {
    let text = query.trim().to_uppercase();

    let kind = if text.starts_with("SELECT") {
        QueryKind::Select(select_shape(&text))
    } else if text.contains("COUNT(") {
        QueryKind::Count
    } else if text.contains("SUM(") {
        QueryKind::Sum
    } else if text.contains("MAX(") {
        QueryKind::Max
    } else if text.starts_with("INSERT") {
        QueryKind::Insert
    } else if text.starts_with("UPDATE") {
        QueryKind::Update
    } else if text.starts_with("DELETE") {
        QueryKind::Delete
    } else {
        QueryKind::Unsupported
    };

    QuerySpec { kind, text }
}

fn select_shape(text: &str) -> SelectShape {
    if text.contains("FROM PRODUCTS P") && text.contains("EXPIRY_DATE") {
        SelectShape::ProductAlert
    } else if text.contains("FROM ENTRIES") {
        SelectShape::Entries
    } else if text.contains("JOIN CUSTOMERS C") && text.contains("JOIN PRODUCTS P") {
        SelectShape::TransactionJoins
    } else if text.contains("COUNT(") {
        SelectShape::CountFallback
    } else {
        SelectShape::Unknown
    }
}

/// Sniffs the target collection for COUNT and INSERT handlers.
pub fn target_collection(text: &str) -> Option<&'static str> {
    if text.contains("PRODUCTS") {
        Some(store::PRODUCTS)
    } else if text.contains("ENTRIES") {
        Some(store::ENTRIES)
    } else if text.contains("CUSTOMERS") {
        Some(store::CUSTOMERS)
    } else if text.contains("TRANSACTIONS") {
        Some(store::TRANSACTIONS)
    } else {
        None
    }
}
