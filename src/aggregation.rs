//! Builds the aggregation pipelines that stand in for SQL aggregates and
//! joins.

use crate::pipeline::{Accumulator, Expr, Pipeline};
use crate::store::{self, Filter};

/// SUM over `quantity * unit_price` for entries matching the filter.
/// An empty match yields no group document; the coercer substitutes 0.0.
pub fn sum_of_sales(filter: Filter) -> Pipeline {
    Pipeline::new().match_(filter).group(vec![(
        "total".to_string(),
        Accumulator::Sum(Expr::mul(Expr::field("quantity"), Expr::field("unit_price"))),
    )])
}

/// MAX over the running balance of all ledger transactions.
pub fn max_balance() -> Pipeline {
    Pipeline::new().group(vec![(
        "max_balance".to_string(),
        Accumulator::Max(Expr::field("balance")),
    )])
}

/// The five most recent entries joined to their customer and product,
/// projected into the transaction-join row shape.
pub fn recent_transactions(limit: usize) -> Pipeline {
    Pipeline::new()
        .lookup(store::CUSTOMERS, "customer_id", "_id", "customer")
        .lookup(store::PRODUCTS, "product_id", "_id", "product")
        .unwind("customer")
        .unwind("product")
        .sort_desc("date")
        .limit(limit)
        .project(vec![
            ("date".to_string(), Expr::field("date")),
            ("customer_name".to_string(), Expr::field("customer.name")),
            ("product_name".to_string(), Expr::field("product.name")),
            ("is_credit".to_string(), Expr::field("is_credit")),
            ("quantity".to_string(), Expr::field("quantity")),
            ("unit_price".to_string(), Expr::field("unit_price")),
            (
                "total".to_string(),
                Expr::mul(Expr::field("quantity"), Expr::field("unit_price")),
            ),
            ("batch_number".to_string(), Expr::field("product.batch_number")),
            ("expiry_date".to_string(), Expr::field("product.expiry_date")),
        ])
}
