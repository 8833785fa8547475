//! Aggregation pipeline stages used to emulate SQL joins and aggregates.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use crate::store::{compare_values, Document, Filter};

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

#[derive(Debug, Clone)]
pub enum Stage {
    Match(Filter),
    /// Groups the whole input into a single `_id: null` document; an empty
    /// input produces no output document at all.
    Group(Vec<(String, Accumulator)>),
    Lookup(LookupSpec),
    Unwind(String),
    SortDesc(String),
    Limit(usize),
    Project(Vec<(String, Expr)>),
}

#[derive(Debug, Clone)]
pub struct LookupSpec {
    pub from: String,
    pub local_field: String,
    pub foreign_field: String,
    pub r#as: String,
}

#[derive(Debug, Clone)]
pub enum Accumulator {
    Sum(Expr),
    Max(Expr),
}

#[derive(Debug, Clone)]
pub enum Expr {
    Field(String),
    Multiply(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn field(path: &str) -> Self {
        Expr::Field(path.to_string())
    }

    pub fn mul(a: Expr, b: Expr) -> Self {
        Expr::Multiply(Box::new(a), Box::new(b))
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn match_(mut self, filter: Filter) -> Self {
        self.stages.push(Stage::Match(filter));
        self
    }

    pub fn group(mut self, accumulators: Vec<(String, Accumulator)>) -> Self {
        self.stages.push(Stage::Group(accumulators));
        self
    }

    pub fn lookup(mut self, from: &str, local_field: &str, foreign_field: &str, r#as: &str) -> Self {
        self.stages.push(Stage::Lookup(LookupSpec {
            from: from.to_string(),
            local_field: local_field.to_string(),
            foreign_field: foreign_field.to_string(),
            r#as: r#as.to_string(),
        }));
        self
    }

    pub fn unwind(mut self, field: &str) -> Self {
        self.stages.push(Stage::Unwind(field.to_string()));
        self
    }

    pub fn sort_desc(mut self, field: &str) -> Self {
        self.stages.push(Stage::SortDesc(field.to_string()));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.stages.push(Stage::Limit(n));
        self
    }

    pub fn project(mut self, fields: Vec<(String, Expr)>) -> Self {
        self.stages.push(Stage::Project(fields));
        self
    }
}

/// Applies a single stage to a batch of documents. `Lookup` is a no-op here;
/// the store resolves it because it needs sibling collections.
pub fn apply(stage: &Stage, docs: Vec<Document>) -> Vec<Document> {
    match stage {
        Stage::Match(filter) => docs.into_iter().filter(|d| filter.matches(d)).collect(),
        Stage::Group(accumulators) => group(accumulators, &docs),
        Stage::Unwind(field) => unwind(docs, field),
        Stage::SortDesc(field) => sort_desc(docs, field),
        Stage::Limit(n) => docs.into_iter().take(*n).collect(),
        Stage::Project(fields) => docs.iter().map(|d| project(d, fields)).collect(),
        Stage::Lookup(_) => docs,
    }
}

pub fn lookup(docs: Vec<Document>, spec: &LookupSpec, foreign: &[Document]) -> Vec<Document> {
    docs.into_iter()
        .map(|mut doc| {
            let local = doc.get(&spec.local_field).cloned().unwrap_or(Value::Null);
            let matched: Vec<Value> = foreign
                .iter()
                .filter(|f| f.get(&spec.foreign_field) == Some(&local))
                .map(|f| Value::Object(f.clone()))
                .collect();
            doc.insert(spec.r#as.clone(), Value::Array(matched));
            doc
        })
        .collect()
}

fn group(accumulators: &[(String, Accumulator)], docs: &[Document]) -> Vec<Document> {
    if docs.is_empty() {
        return Vec::new();
    }

    let mut out = Map::new();
    out.insert("_id".to_string(), Value::Null);

    for (field, acc) in accumulators {
        let value = match acc {
            Accumulator::Sum(expr) => {
                let sum: f64 = docs.iter().map(|d| eval_f64(expr, d)).sum();
                Value::from(sum)
            }
            Accumulator::Max(expr) => {
                let max = docs
                    .iter()
                    .filter_map(|d| eval(expr, d).as_f64())
                    .fold(None, |m: Option<f64>, v| Some(m.map_or(v, |m| m.max(v))));
                match max {
                    Some(m) => Value::from(m),
                    None => Value::Null,
                }
            }
        };
        out.insert(field.clone(), value);
    }

    vec![out]
}

fn unwind(docs: Vec<Document>, field: &str) -> Vec<Document> {
    let mut result = Vec::new();
    for doc in docs {
        match doc.get(field) {
            Some(Value::Array(items)) => {
                for item in items.clone() {
                    let mut flattened = doc.clone();
                    flattened.insert(field.to_string(), item);
                    result.push(flattened);
                }
            }
            // Non-array values pass through; a missing or empty array
            // drops the document, matching the store's default unwind.
            Some(_) => result.push(doc),
            None => {}
        }
    }
    result
}

fn sort_desc(mut docs: Vec<Document>, field: &str) -> Vec<Document> {
    docs.sort_by(|a, b| {
        let ord = match (a.get(field), b.get(field)) {
            (Some(va), Some(vb)) => compare_values(va, vb).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        };
        ord.reverse()
    });
    docs
}

fn project(doc: &Document, fields: &[(String, Expr)]) -> Document {
    let mut out = Map::new();
    for (name, expr) in fields {
        out.insert(name.clone(), eval(expr, doc));
    }
    out
}

fn eval(expr: &Expr, doc: &Document) -> Value {
    match expr {
        Expr::Field(path) => get_path(doc, path).cloned().unwrap_or(Value::Null),
        Expr::Multiply(a, b) => Value::from(eval_f64(a, doc) * eval_f64(b, doc)),
    }
}

fn eval_f64(expr: &Expr, doc: &Document) -> f64 {
    eval(expr, doc).as_f64().unwrap_or(0.0)
}

/// Dot-path field access, used to reach into unwound lookup results
/// (e.g. `customer.name`).
fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = current.as_object()?.get(part)?;
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => Document::new(),
        }
    }

    fn entries() -> Vec<Document> {
        vec![
            doc(json!({"date": "2023-01-01", "quantity": 2.0, "unit_price": 50.0, "is_credit": true})),
            doc(json!({"date": "2023-03-01", "quantity": 1.0, "unit_price": 30.0, "is_credit": false})),
            doc(json!({"date": "2023-02-01", "quantity": 3.0, "unit_price": 10.0, "is_credit": true})),
        ]
    }

    #[test]
    fn match_stage_filters() {
        let filter = Filter::new().eq("is_credit", json!(true));
        let out = apply(&Stage::Match(filter), entries());
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn group_sums_products_of_fields() {
        let acc = vec![(
            "total".to_string(),
            Accumulator::Sum(Expr::mul(Expr::field("quantity"), Expr::field("unit_price"))),
        )];
        let out = apply(&Stage::Group(acc), entries());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].get("total").and_then(Value::as_f64), Some(160.0));
    }

    #[test]
    fn group_of_empty_input_yields_no_documents() {
        let acc = vec![("total".to_string(), Accumulator::Sum(Expr::field("quantity")))];
        let out = apply(&Stage::Group(acc), Vec::new());
        assert!(out.is_empty());
    }

    #[test]
    fn group_max_over_missing_field_is_null() {
        let acc = vec![("max_balance".to_string(), Accumulator::Max(Expr::field("balance")))];
        let out = apply(&Stage::Group(acc), entries());
        assert_eq!(out[0].get("max_balance"), Some(&Value::Null));
    }

    #[test]
    fn sort_desc_then_limit() {
        let sorted = apply(&Stage::SortDesc("date".to_string()), entries());
        let limited = apply(&Stage::Limit(2), sorted);
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].get("date"), Some(&json!("2023-03-01")));
        assert_eq!(limited[1].get("date"), Some(&json!("2023-02-01")));
    }

    #[test]
    fn lookup_then_unwind_flattens_matches() {
        let docs = vec![doc(json!({"customer_id": "c1"}))];
        let foreign = vec![
            doc(json!({"_id": "c1", "name": "Jane"})),
            doc(json!({"_id": "c2", "name": "Bob"})),
        ];
        let spec = LookupSpec {
            from: "customers".to_string(),
            local_field: "customer_id".to_string(),
            foreign_field: "_id".to_string(),
            r#as: "customer".to_string(),
        };

        let joined = lookup(docs, &spec, &foreign);
        let unwound = apply(&Stage::Unwind("customer".to_string()), joined);
        assert_eq!(unwound.len(), 1);
        assert_eq!(
            get_path(&unwound[0], "customer.name"),
            Some(&json!("Jane"))
        );
    }

    #[test]
    fn unwind_drops_documents_without_matches() {
        let docs = vec![doc(json!({"customer_id": "cX", "customer": []}))];
        let out = apply(&Stage::Unwind("customer".to_string()), docs);
        assert!(out.is_empty());
    }

    #[test]
    fn project_computes_expressions() {
        let docs = entries();
        let fields = vec![
            ("date".to_string(), Expr::field("date")),
            (
                "total".to_string(),
                Expr::mul(Expr::field("quantity"), Expr::field("unit_price")),
            ),
        ];
        let out = apply(&Stage::Project(fields), docs);
        assert_eq!(out[0].get("total").and_then(Value::as_f64), Some(100.0));
        assert_eq!(out[0].get("quantity"), None);
    }
}
