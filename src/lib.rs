//! CLTVForge: customer-level RFM features and CLTV targets from retail transaction logs
//!
//! The pipeline is four stages over polars data frames: load a Latin-1 CSV
//! transaction log, clean it, aggregate it per customer, and derive the spend
//! of each customer over a forward-looking horizon.

pub mod cli;
pub mod clean;
pub mod data;
pub mod error;
pub mod features;
pub mod target;

// Re-export public items for easier access
pub use cli::Args;
pub use clean::{clean_data, clean_data_with, CleanOptions};
pub use data::load_data;
pub use error::DataError;
pub use features::{build_customer_features, default_reference_date, feature_matrix};
pub use target::{
    build_training_table, create_target_cltv, target_column_name, transactions_before,
    DEFAULT_HORIZON_DAYS,
};

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;

/// Invoice identifier column of the raw log
pub const INVOICE: &str = "Invoice";
/// Customer identifier column of the raw log
pub const CUSTOMER_ID: &str = "Customer ID";
pub const QUANTITY: &str = "Quantity";
pub const PRICE: &str = "Price";
pub const INVOICE_DATE: &str = "InvoiceDate";
/// Line total added by the cleaner
pub const TOTAL_PRICE: &str = "TotalPrice";

/// Customer key column of every per-customer output
pub const CUSTOMER_ID_OUT: &str = "CustomerID";
pub const RECENCY: &str = "recency";
pub const FREQUENCY: &str = "frequency";
pub const MONETARY_VALUE: &str = "monetary_value";
pub const AVG_BASKET_VALUE: &str = "avg_basket_value";

const MICROS_PER_DAY: i64 = 86_400_000_000;
