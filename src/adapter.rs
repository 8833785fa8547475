//! Maps raw documents to canonical records and owns all writes.
//!
//! Every operation degrades to an empty/None result on store failure; nothing
//! here raises past its boundary. The paired entry + ledger-transaction write
//! is deliberately not atomic: a failure of the second write logs an error
//! and leaves the entry in place, matching the failure semantics the legacy
//! callers observe.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, error, warn};

use crate::aggregation;
use crate::coerce;
use crate::config::Config;
use crate::connection::Connection;
use crate::records::{Customer, Entry, LedgerTransaction, Product};
use crate::store::{Document, DocumentStore, Filter, CUSTOMERS, ENTRIES, PRODUCTS, TRANSACTIONS};

pub struct RecordAdapter {
    conn: Arc<Connection>,
    min_seed_customers: u64,
    min_seed_products: u64,
}

fn doc(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}

impl RecordAdapter {
    /// Constructs the adapter and runs the seed-data check once.
    pub fn new(conn: Arc<Connection>, config: &Config) -> Self {
        let adapter = Self {
            conn,
            min_seed_customers: config.seed.min_customers,
            min_seed_products: config.seed.min_products,
        };
        adapter.ensure_seed_data();
        adapter
    }

    pub(crate) fn store(&self) -> Option<Arc<dyn DocumentStore>> {
        self.conn.handle()
    }

    /// Counts customers and products once; when either is below the
    /// threshold it only logs. Auto-inserting here could double-seed a store
    /// that is mid-population, so the conservative log-only behavior is kept.
    fn ensure_seed_data(&self) {
        let Some(store) = self.store() else {
            debug!("seed check skipped, store not reachable");
            return;
        };
        let customers = store.count(CUSTOMERS, &Filter::new()).unwrap_or(0);
        let products = store.count(PRODUCTS, &Filter::new()).unwrap_or(0);
        if customers >= self.min_seed_customers && products >= self.min_seed_products {
            return;
        }
        warn!(
            customers,
            products, "seed data below threshold, skipping auto-insert"
        );
    }

    pub fn get_customers(&self) -> Vec<Customer> {
        self.find_all(CUSTOMERS, Filter::new())
            .iter()
            .map(Customer::from_document)
            .collect()
    }

    pub fn get_products(&self) -> Vec<Product> {
        self.find_all(PRODUCTS, Filter::new())
            .iter()
            .map(Product::from_document)
            .collect()
    }

    pub fn get_entries(&self, customer_id: Option<&str>, limit: Option<usize>) -> Vec<Entry> {
        let mut filter = Filter::new();
        if let Some(customer_id) = customer_id {
            filter = filter.eq("customer_id", Value::String(customer_id.to_string()));
        }
        let mut entries: Vec<Entry> = self
            .find_all(ENTRIES, filter)
            .iter()
            .map(Entry::from_document)
            .collect();
        if let Some(limit) = limit {
            entries.truncate(limit);
        }
        entries
    }

    pub fn get_transactions(&self) -> Vec<LedgerTransaction> {
        self.find_all(TRANSACTIONS, Filter::new())
            .iter()
            .map(LedgerTransaction::from_document)
            .collect()
    }

    fn find_all(&self, collection: &str, filter: Filter) -> Vec<Document> {
        let Some(store) = self.store() else {
            return Vec::new();
        };
        match store.find(collection, &filter) {
            Ok(docs) => docs,
            Err(e) => {
                warn!(collection, error = %e, "read failed, returning no records");
                Vec::new()
            }
        }
    }

    pub fn add_customer(&self, name: &str, contact: &str, address: &str) -> Option<String> {
        self.insert(
            CUSTOMERS,
            doc(json!({
                "name": name,
                "contact": contact,
                "address": address,
            })),
        )
    }

    pub fn add_product(
        &self,
        name: &str,
        description: &str,
        unit_price: f64,
        batch_number: &str,
        expiry_date: &str,
        mrp: Option<f64>,
    ) -> Option<String> {
        let mrp = crate::records::derive_mrp(mrp.unwrap_or(0.0), unit_price);
        self.insert(
            PRODUCTS,
            doc(json!({
                "name": name,
                "description": description,
                "unit_price": unit_price,
                "mrp": mrp,
                "batch_number": batch_number,
                "expiry_date": expiry_date,
            })),
        )
    }

    /// Writes the entry, then its ledger transaction. The running balance is
    /// read back from the store each time (MAX over all balances); no counter
    /// state is kept here.
    #[allow(clippy::too_many_arguments)]
    pub fn add_entry(
        &self,
        date: &str,
        customer_id: &str,
        product_id: &str,
        quantity: f64,
        unit_price: f64,
        is_credit: bool,
        notes: &str,
    ) -> Option<String> {
        let store = self.store()?;
        let entry_id = self.insert(
            ENTRIES,
            doc(json!({
                "date": date,
                "customer_id": customer_id,
                "product_id": product_id,
                "quantity": quantity,
                "unit_price": unit_price,
                "is_credit": is_credit,
                "notes": notes,
            })),
        )?;

        let amount = quantity * unit_price;
        let prior = self.max_balance(store.as_ref());
        let balance = if is_credit { prior + amount } else { prior - amount };

        let txn = doc(json!({
            "entry_id": entry_id.as_str(),
            "amount": amount,
            "balance": balance,
        }));
        if let Err(e) = store.insert(TRANSACTIONS, txn) {
            // Orphan entry: the two writes are not atomic.
            error!(entry_id = %entry_id, error = %e, "ledger write failed after entry insert");
        }

        Some(entry_id)
    }

    fn max_balance(&self, store: &dyn DocumentStore) -> f64 {
        match store.aggregate(TRANSACTIONS, &aggregation::max_balance()) {
            Ok(docs) => docs
                .first()
                .and_then(|d| d.get("max_balance"))
                .filter(|v| !v.is_null())
                .map(coerce::to_f64)
                .unwrap_or(0.0),
            Err(e) => {
                warn!(error = %e, "balance read failed, assuming 0.0");
                0.0
            }
        }
    }

    /// Whole-record replacement by explicit id; partial updates are not
    /// supported.
    pub fn update_customer(&self, id: &str, name: &str, contact: &str, address: &str) -> bool {
        let Some(store) = self.store() else {
            return false;
        };
        let updated = doc(json!({
            "name": name,
            "contact": contact,
            "address": address,
        }));
        match store.update(CUSTOMERS, id, updated) {
            Ok(()) => true,
            Err(e) => {
                warn!(id, error = %e, "customer update failed");
                false
            }
        }
    }

    pub fn delete_customer(&self, id: &str) -> bool {
        let Some(store) = self.store() else {
            return false;
        };
        match store.delete(CUSTOMERS, id) {
            Ok(()) => true,
            Err(e) => {
                warn!(id, error = %e, "customer delete failed");
                false
            }
        }
    }

    fn insert(&self, collection: &str, document: Document) -> Option<String> {
        let store = self.store()?;
        match store.insert(collection, document) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(collection, error = %e, "insert failed");
                None
            }
        }
    }
}
