//! Error types for the simulator.

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The catalog has no store with this id
    #[error("unknown store: {0}")]
    UnknownStore(String),

    /// A product is sold in a store but no supplier link carries it
    #[error("store {store_id} has no supplier for product {product_id}")]
    MissingSupplier {
        store_id: String,
        product_id: String,
    },

    /// Parameters rejected by a probability distribution
    #[error("invalid distribution parameters: {0}")]
    Distribution(String),

    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),
}

impl SimError {
    pub fn distribution(msg: impl Into<String>) -> Self {
        SimError::Distribution(msg.into())
    }
}
