//! Relational-compatibility query shim: lets SQL-shaped legacy callers
//! (string queries, positional parameters, `fetchall()`-style rows) operate
//! unmodified against a schemaless document store.

pub mod adapter;
pub mod aggregation;
pub mod classifier;
pub mod coerce;
pub mod config;
pub mod connection;
pub mod executor;
pub mod pipeline;
pub mod predicate;
pub mod records;
pub mod store;

pub use adapter::RecordAdapter;
pub use config::Config;
pub use connection::Connection;
pub use executor::{QueryError, QueryExecutor};
pub use records::{Cell, Customer, Entry, LedgerTransaction, Product, Row};
pub use store::{DocumentStore, Filter, InMemoryStore, StoreError};
