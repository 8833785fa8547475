//! Canonical, type-normalized records over raw documents, plus the positional
//! row values returned across the `execute()` boundary.

use serde_json::Value;
use tracing::warn;

use crate::coerce;
use crate::store::Document;

/// One scalar value inside a result row.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

/// Positional tuple of scalar values, mimicking a relational cursor row.
pub type Row = Vec<Cell>;

impl Cell {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Float(f) => Some(*f),
            Cell::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Cell::Bool(b) => Some(*b),
            Cell::Int(i) => Some(*i != 0),
            _ => None,
        }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Null => write!(f, "null"),
            Cell::Bool(b) => write!(f, "{b}"),
            Cell::Int(i) => write!(f, "{i}"),
            Cell::Float(v) => write!(f, "{v}"),
            Cell::Str(s) => write!(f, "{s}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub contact: String,
    pub address: String,
}

impl Customer {
    pub fn from_document(doc: &Document) -> Self {
        Self {
            id: id_field(doc),
            name: string_field(doc, "name"),
            contact: string_field(doc, "contact"),
            address: string_field(doc, "address"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    pub unit_price: f64,
    pub mrp: f64,
    pub batch_number: String,
    pub expiry_date: String,
}

impl Product {
    pub fn from_document(doc: &Document) -> Self {
        let unit_price = numeric_field(doc, "unit_price");
        Self {
            id: id_field(doc),
            name: string_field(doc, "name"),
            description: string_field(doc, "description"),
            unit_price,
            mrp: derive_mrp(numeric_field(doc, "mrp"), unit_price),
            batch_number: string_field(doc, "batch_number"),
            expiry_date: string_field(doc, "expiry_date"),
        }
    }
}

/// Retail price falls back to wholesale price plus a fixed 20% markup when
/// absent or non-positive.
pub fn derive_mrp(mrp: f64, unit_price: f64) -> f64 {
    if mrp > 0.0 {
        mrp
    } else {
        unit_price * 1.2
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub id: String,
    pub date: String,
    pub customer_id: String,
    pub product_id: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub is_credit: bool,
    pub notes: String,
}

impl Entry {
    pub fn from_document(doc: &Document) -> Self {
        Self {
            id: id_field(doc),
            date: string_field(doc, "date"),
            customer_id: string_field(doc, "customer_id"),
            product_id: string_field(doc, "product_id"),
            quantity: numeric_field(doc, "quantity"),
            unit_price: numeric_field(doc, "unit_price"),
            is_credit: bool_field(doc, "is_credit"),
            notes: string_field(doc, "notes"),
        }
    }

    pub fn total(&self) -> f64 {
        self.quantity * self.unit_price
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerTransaction {
    pub id: String,
    pub entry_id: String,
    pub amount: f64,
    pub balance: f64,
}

impl LedgerTransaction {
    pub fn from_document(doc: &Document) -> Self {
        Self {
            id: id_field(doc),
            entry_id: string_field(doc, "entry_id"),
            amount: numeric_field(doc, "amount"),
            balance: numeric_field(doc, "balance"),
        }
    }
}

/// Store-native identifier rendered as a string.
fn id_field(doc: &Document) -> String {
    match doc.get("_id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn string_field(doc: &Document, name: &str) -> String {
    match doc.get(name) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn numeric_field(doc: &Document, name: &str) -> f64 {
    match doc.get(name) {
        Some(value) => coerce::to_f64(value),
        None => {
            warn!(field = name, "missing numeric field, defaulting to 0.0");
            0.0
        }
    }
}

fn bool_field(doc: &Document, name: &str) -> bool {
    match doc.get(name) {
        Some(value) => coerce::to_bool(value),
        None => false,
    }
}
