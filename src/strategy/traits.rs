// src/strategy/traits.rs

use crate::model::catalog::ProductSupplier;
use chrono::NaiveDate;
use std::fmt::Debug;

/// What a policy sees when deciding whether to reorder a product.
#[derive(Debug, Clone)]
pub struct OrderContext<'a> {
    /// Accumulated unmet demand for the product.
    pub backorders: u32,
    /// Ordering constraints of the product's supplier.
    pub supplier: &'a ProductSupplier,
    /// The simulated day the decision is made on.
    pub day: NaiveDate,
}

/// Decision logic for replenishing a store's products.
///
/// We require `Send` + `Sync` so stores can be simulated on separate workers.
pub trait OrderPolicy: Debug + Send + Sync {
    /// Name written into every order the policy places.
    fn name(&self) -> &str;

    /// Quantity to order today, or `None` to wait.
    fn calculate_order(&mut self, context: &OrderContext<'_>) -> Option<u32>;
}
