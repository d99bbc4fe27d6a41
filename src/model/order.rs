// src/model/order.rs

use crate::io::timestamp;
use crate::model::catalog::{ProductId, StoreId, SupplierId};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

/// A replenishment order placed with a supplier on behalf of a policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(rename = "PolicyName", alias = "PolicyID")]
    pub policy_name: String,
    #[serde(rename = "StoreID")]
    pub store_id: StoreId,
    #[serde(rename = "ProductID")]
    pub product_id: ProductId,
    #[serde(rename = "SupplierID")]
    pub supplier_id: SupplierId,
    #[serde(rename = "Quantity")]
    pub quantity: u32,
    #[serde(rename = "OrderTimestamp", with = "timestamp")]
    pub order_timestamp: NaiveDateTime,
    #[serde(rename = "ETA", with = "timestamp")]
    pub eta: NaiveDateTime,
    #[serde(rename = "ConfidenceInterval")]
    pub confidence_interval: u32,
    #[serde(rename = "Fulfilled", deserialize_with = "flag")]
    pub fulfilled: bool,
}

/// Accepts `true`/`false` in any letter case (`True` is common in older files).
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(serde::de::Error::custom(format!("invalid flag '{other}'"))),
    }
}

impl Order {
    pub fn is_due(&self, day: NaiveDate) -> bool {
        !self.fulfilled && self.eta.date() == day
    }
}

/// Every order of one store over the whole horizon.
///
/// `checkpoint` marks how many rows were already persisted so the append-only
/// partial orders file only receives the rows placed since.
#[derive(Debug, Clone, Default)]
pub struct OrderLedger {
    orders: Vec<Order>,
    checkpoint: usize,
}

impl OrderLedger {
    /// Starts from orders loaded from disk; they count as already persisted.
    pub fn from_persisted(orders: Vec<Order>) -> Self {
        let checkpoint = orders.len();
        Self { orders, checkpoint }
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn place(&mut self, order: Order) {
        self.orders.push(order);
    }

    /// Open orders arriving on `day`.
    pub fn due_mut(&mut self, day: NaiveDate) -> impl Iterator<Item = &mut Order> {
        self.orders.iter_mut().filter(move |o| o.is_due(day))
    }

    pub fn policy_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.orders.iter().map(|o| o.policy_name.clone()).collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn for_policy<'a>(&'a self, policy: &'a str) -> impl Iterator<Item = &'a Order> + 'a {
        self.orders.iter().filter(move |o| o.policy_name == policy)
    }

    pub fn unpersisted(&self) -> &[Order] {
        &self.orders[self.checkpoint..]
    }

    pub fn mark_persisted(&mut self) {
        self.checkpoint = self.orders.len();
    }
}
