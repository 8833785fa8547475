//! Executes classified queries and maps every failure to the empty-row
//! contract at a single boundary.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use crate::adapter::RecordAdapter;
use crate::aggregation;
use crate::classifier::{self, QueryKind, SelectShape};
use crate::coerce;
use crate::predicate;
use crate::records::{Cell, Product, Row};
use crate::store::{DocumentStore, Filter, StoreError, CUSTOMERS, ENTRIES, PRODUCTS, TRANSACTIONS};

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("store unreachable")]
    Disconnected,
    #[error("unsupported query: {0}")]
    Unsupported(String),
    #[error("unsupported clause combination: {0}")]
    Structural(String),
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// Entry point for legacy SQL-shaped callers.
pub struct QueryExecutor {
    adapter: RecordAdapter,
}

impl QueryExecutor {
    pub fn new(adapter: RecordAdapter) -> Self {
        Self { adapter }
    }

    pub fn adapter(&self) -> &RecordAdapter {
        &self.adapter
    }

    /// Runs a query string with positional parameters and returns row tuples.
    /// Never raises: every internal error kind degrades to an empty row list
    /// with a warning, preserving the legacy contract.
    pub fn execute(&self, query: &str, params: &[Cell]) -> Vec<Row> {
        match self.run(query, params) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(query, error = %e, "query degraded to empty result");
                Vec::new()
            }
        }
    }

    fn run(&self, query: &str, params: &[Cell]) -> Result<Vec<Row>, QueryError> {
        let spec = classifier::classify(query);
        match spec.kind {
            QueryKind::Select(shape) => self.run_select(shape, &spec.text, params),
            QueryKind::Count => self.run_count(&spec.text, params),
            QueryKind::Sum => self.run_sum(&spec.text, params),
            QueryKind::Max => self.run_max(),
            QueryKind::Insert => self.run_insert(&spec.text, params),
            QueryKind::Update => {
                warn!(query, "UPDATE queries are not implemented");
                Ok(Vec::new())
            }
            QueryKind::Delete => {
                warn!(query, "DELETE queries are not implemented");
                Ok(Vec::new())
            }
            QueryKind::Unsupported => Err(QueryError::Unsupported(query.to_string())),
        }
    }

    fn store(&self) -> Result<Arc<dyn DocumentStore>, QueryError> {
        self.adapter.store().ok_or(QueryError::Disconnected)
    }

    fn run_select(
        &self,
        shape: SelectShape,
        text: &str,
        params: &[Cell],
    ) -> Result<Vec<Row>, QueryError> {
        match shape {
            SelectShape::ProductAlert => self.run_product_alert(text, params),
            SelectShape::Entries => self.run_entries(text, params),
            SelectShape::TransactionJoins => self.run_transaction_joins(),
            SelectShape::CountFallback => self.run_count(text, params),
            SelectShape::Unknown => Ok(Vec::new()),
        }
    }

    /// Products expiring inside the requested window that have at least one
    /// credit sale. The sales totals are accumulated in memory over all
    /// entries; the expiry window is the only store-level filter.
    fn run_product_alert(&self, text: &str, params: &[Cell]) -> Result<Vec<Row>, QueryError> {
        let store = self.store()?;
        let filter = predicate::expiry_filter(text, params);
        let products: Vec<Product> = store
            .find(PRODUCTS, &filter)?
            .iter()
            .map(Product::from_document)
            .collect();

        let sales = self.credit_sales_by_product();

        Ok(products
            .iter()
            .filter_map(|p| {
                let total = sales.get(&p.id).copied().unwrap_or(0.0);
                if total > 0.0 {
                    Some(coerce::product_alert_row(p, total))
                } else {
                    None
                }
            })
            .collect())
    }

    fn credit_sales_by_product(&self) -> HashMap<String, f64> {
        let mut sales: HashMap<String, f64> = HashMap::new();
        for entry in self.adapter.get_entries(None, None) {
            if entry.is_credit {
                *sales.entry(entry.product_id.clone()).or_insert(0.0) += entry.total();
            }
        }
        sales
    }

    fn run_entries(&self, text: &str, params: &[Cell]) -> Result<Vec<Row>, QueryError> {
        let store = self.store()?;
        let filter = predicate::entry_filter(text, params);
        let rows = store
            .find(ENTRIES, &filter)?
            .iter()
            .map(crate::records::Entry::from_document)
            .map(|e| coerce::entry_row(&e))
            .collect();
        Ok(rows)
    }

    fn run_transaction_joins(&self) -> Result<Vec<Row>, QueryError> {
        let store = self.store()?;
        let docs = store.aggregate(ENTRIES, &aggregation::recent_transactions(5))?;
        Ok(docs.iter().map(coerce::join_row).collect())
    }

    fn run_count(&self, text: &str, params: &[Cell]) -> Result<Vec<Row>, QueryError> {
        let store = self.store()?;
        let target = classifier::target_collection(text)
            .ok_or_else(|| QueryError::Structural(text.to_string()))?;
        let filter = match target {
            ENTRIES => predicate::entry_filter(text, params),
            PRODUCTS => predicate::expiry_filter(text, params),
            _ => Filter::new(),
        };
        let count = store.count(target, &filter)?;
        Ok(coerce::count_row(count))
    }

    fn run_sum(&self, text: &str, params: &[Cell]) -> Result<Vec<Row>, QueryError> {
        let store = self.store()?;
        let filter = predicate::entry_filter(text, params);
        let docs = store.aggregate(ENTRIES, &aggregation::sum_of_sales(filter))?;
        Ok(coerce::scalar_row(&docs, "total"))
    }

    fn run_max(&self) -> Result<Vec<Row>, QueryError> {
        let store = self.store()?;
        let docs = store.aggregate(TRANSACTIONS, &aggregation::max_balance())?;
        Ok(coerce::scalar_row(&docs, "max_balance"))
    }

    /// Routes `INSERT INTO <collection>` to the matching add operation using
    /// positional parameters. Returns no rows; a collection or arity mismatch
    /// degrades to empty with a warning at the boundary.
    fn run_insert(&self, text: &str, params: &[Cell]) -> Result<Vec<Row>, QueryError> {
        let target = classifier::target_collection(text)
            .ok_or_else(|| QueryError::Structural(text.to_string()))?;

        match target {
            CUSTOMERS => {
                let [name, contact, address] = take_strings::<3>(params, text)?;
                self.adapter.add_customer(&name, &contact, &address);
            }
            PRODUCTS => {
                if params.len() < 5 {
                    return Err(QueryError::Structural(text.to_string()));
                }
                let [name, description] = take_strings::<2>(&params[..2], text)?;
                let unit_price = param_f64(params, 2);
                let [batch_number, expiry_date] = take_strings::<2>(&params[3..5], text)?;
                let mrp = params.get(5).and_then(Cell::as_f64);
                self.adapter.add_product(
                    &name,
                    &description,
                    unit_price,
                    &batch_number,
                    &expiry_date,
                    mrp,
                );
            }
            ENTRIES => {
                if params.len() < 7 {
                    return Err(QueryError::Structural(text.to_string()));
                }
                let [date, customer_id, product_id] = take_strings::<3>(&params[..3], text)?;
                let quantity = param_f64(params, 3);
                let unit_price = param_f64(params, 4);
                let is_credit = params.get(5).and_then(Cell::as_bool).unwrap_or(false);
                let notes = params
                    .get(6)
                    .and_then(Cell::as_str)
                    .unwrap_or_default()
                    .to_string();
                self.adapter.add_entry(
                    &date,
                    &customer_id,
                    &product_id,
                    quantity,
                    unit_price,
                    is_credit,
                    &notes,
                );
            }
            _ => return Err(QueryError::Structural(text.to_string())),
        }

        Ok(Vec::new())
    }
}

fn take_strings<const N: usize>(params: &[Cell], text: &str) -> Result<[String; N], QueryError> {
    if params.len() < N {
        return Err(QueryError::Structural(text.to_string()));
    }
    let mut out: [String; N] = std::array::from_fn(|_| String::new());
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = params[i]
            .as_str()
            .ok_or_else(|| QueryError::Structural(text.to_string()))?
            .to_string();
    }
    Ok(out)
}

fn param_f64(params: &[Cell], index: usize) -> f64 {
    params.get(index).and_then(Cell::as_f64).unwrap_or(0.0)
}
