// src/evaluation/metrics.rs

use crate::io::timestamp;
use crate::model::catalog::{ProductId, StoreId};
use crate::model::order::Order;
use crate::model::store::SalesRow;
use crate::strategy::implementations::BASELINE_POLICY;
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Daily scores of one policy in one store.
///
/// `Metric` is revenue discounted by how long stock sat on the shelf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyMetric {
    #[serde(rename = "PolicyID")]
    pub policy_name: String,
    #[serde(rename = "MetricDateTime", with = "timestamp")]
    pub metric_date_time: NaiveDateTime,
    #[serde(rename = "Metric")]
    pub metric: f64,
    #[serde(rename = "TotalRevenue")]
    pub total_revenue: f64,
    #[serde(rename = "NumStockout")]
    pub num_stockout: u32,
    #[serde(rename = "TurnoverRatio")]
    pub turnover_ratio: f64,
    #[serde(rename = "StoreID")]
    pub store_id: StoreId,
}

/// Units a policy still holds for a product once the day's sales are matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryPosition {
    #[serde(rename = "PolicyID")]
    pub policy_name: String,
    #[serde(rename = "DateTime", with = "timestamp")]
    pub date_time: NaiveDateTime,
    #[serde(rename = "StoreID")]
    pub store_id: StoreId,
    #[serde(rename = "ProductID")]
    pub product_id: ProductId,
    #[serde(rename = "Inventory")]
    pub inventory: u32,
}

/// A sales row attributed to the order of one policy it drew from.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedSale {
    pub policy_name: String,
    pub product_id: ProductId,
    pub sold_at: NaiveDateTime,
    pub units: u32,
    pub price: f64,
    pub spoilage: bool,
    pub days_to_sale: f64,
}

/// What the evaluation of one store's day needs besides sales and orders.
#[derive(Debug, Clone)]
pub struct StoreDay<'a> {
    pub store_id: &'a str,
    /// Midnight the sales file is keyed by.
    pub date: NaiveDateTime,
    /// Every product the store sells.
    pub products: &'a [ProductId],
    /// Forecast demand of the sold day per product.
    pub demand: &'a HashMap<ProductId, f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreEvaluation {
    pub metrics: Vec<PolicyMetric>,
    pub inventory: Vec<InventoryPosition>,
}

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Attributes each sales row to the earliest open order of every policy.
///
/// `orders` is re-sorted by (policy, ETA) and its quantities are consumed in
/// place: one unit per sale, `Units` per spoilage row (never below zero).
pub fn match_sales(sales: &[SalesRow], orders: &mut [Order]) -> Vec<MatchedSale> {
    orders.sort_by(|a, b| {
        a.policy_name
            .cmp(&b.policy_name)
            .then(a.eta.cmp(&b.eta))
    });
    let mut sales: Vec<&SalesRow> = sales.iter().collect();
    sales.sort_by_key(|s| s.transaction_date_time);

    let mut policies: Vec<String> = orders.iter().map(|o| o.policy_name.clone()).collect();
    policies.dedup();

    let mut matched = Vec::new();
    for sale in sales {
        for policy in &policies {
            let Some(order) = orders.iter_mut().find(|o| {
                &o.policy_name == policy
                    && o.product_id == sale.product_id
                    && o.quantity > 0
                    && sale.transaction_date_time > o.eta
            }) else {
                continue;
            };

            let consumed = if sale.spoilage { sale.units } else { 1 };
            order.quantity = order.quantity.saturating_sub(consumed);

            let eta_midnight = order.eta.date().and_hms_opt(0, 0, 0).unwrap_or(order.eta);
            let elapsed = (sale.transaction_date_time - eta_midnight).num_seconds() as f64;
            let mut days_to_sale = (elapsed / SECONDS_PER_DAY).max(1.0);
            if sale.spoilage {
                days_to_sale *= f64::from(sale.units);
            }

            matched.push(MatchedSale {
                policy_name: policy.clone(),
                product_id: sale.product_id.clone(),
                sold_at: sale.transaction_date_time,
                units: sale.units,
                price: sale.price,
                spoilage: sale.spoilage,
                days_to_sale,
            });
        }
    }
    matched
}

/// Per-policy `Metric` and `TotalRevenue` for one store's day of sales.
///
/// The rows are dated at midnight of the first matched sale. Returns `None`
/// when no sale could be attributed to any order.
pub fn compute_metrics(
    store_id: &str,
    sales: &[SalesRow],
    orders: &mut [Order],
) -> Option<(Vec<PolicyMetric>, Vec<MatchedSale>)> {
    let matched = match_sales(sales, orders);
    let first_matched = matched.iter().map(|m| m.sold_at).min()?;
    let metric_date_time = first_matched.date().and_hms_opt(0, 0, 0)?;

    let mut totals: BTreeMap<&str, (f64, f64)> = BTreeMap::new();
    for order in orders.iter() {
        totals.entry(order.policy_name.as_str()).or_default();
    }
    for sale in &matched {
        let entry = totals.entry(sale.policy_name.as_str()).or_default();
        entry.0 += sale.price / sale.days_to_sale;
        entry.1 += sale.price;
    }

    let metrics = totals
        .into_iter()
        .map(|(policy, (metric, total_revenue))| PolicyMetric {
            policy_name: policy.to_string(),
            metric_date_time,
            metric,
            total_revenue,
            num_stockout: 0,
            turnover_ratio: 0.0,
            store_id: store_id.to_string(),
        })
        .collect();
    Some((metrics, matched))
}

/// Units left per (policy, product) across orders arriving by the end of `date`.
pub fn inventory_positions(day: &StoreDay<'_>, orders: &[Order]) -> Vec<InventoryPosition> {
    let horizon = day.date + Duration::days(1);
    let mut policies: Vec<&str> = orders.iter().map(|o| o.policy_name.as_str()).collect();
    policies.sort_unstable();
    policies.dedup();

    let mut positions = Vec::with_capacity(policies.len() * day.products.len());
    for policy in policies {
        for product_id in day.products {
            let inventory = orders
                .iter()
                .filter(|o| o.policy_name == policy && &o.product_id == product_id)
                .filter(|o| o.eta <= horizon)
                .map(|o| o.quantity)
                .sum();
            positions.push(InventoryPosition {
                policy_name: policy.to_string(),
                date_time: day.date,
                store_id: day.store_id.to_string(),
                product_id: product_id.clone(),
                inventory,
            });
        }
    }
    positions
}

/// Demand a policy could not serve: for every product it holds none of,
/// forecast demand (whole units) minus the units it sold.
pub fn count_stockouts(
    positions: &[InventoryPosition],
    matched: &[MatchedSale],
    demand: &HashMap<ProductId, f64>,
) -> BTreeMap<String, u32> {
    let mut stockouts: BTreeMap<String, u32> = BTreeMap::new();
    for position in positions {
        let count = stockouts.entry(position.policy_name.clone()).or_default();
        if position.inventory > 0 {
            continue;
        }
        let Some(&expected) = demand.get(&position.product_id) else {
            continue;
        };
        let sold: u32 = matched
            .iter()
            .filter(|m| !m.spoilage)
            .filter(|m| m.policy_name == position.policy_name && m.product_id == position.product_id)
            .map(|m| m.units)
            .sum();
        let unmet = (expected.trunc() as i64 - i64::from(sold)).max(0);
        *count += unmet as u32;
    }
    stockouts
}

/// Total revenue over mean inventory held; zero when nothing is held.
pub fn turnover_ratio(total_revenue: f64, positions: &[InventoryPosition], policy: &str) -> f64 {
    let held: Vec<u32> = positions
        .iter()
        .filter(|p| p.policy_name == policy)
        .map(|p| p.inventory)
        .collect();
    if held.is_empty() {
        return 0.0;
    }
    let mean = held.iter().map(|&u| f64::from(u)).sum::<f64>() / held.len() as f64;
    if mean > 0.0 {
        total_revenue / mean
    } else {
        0.0
    }
}

/// Scores one store's day: matches sales to orders, then derives inventory
/// positions, stockouts and turnover per policy.
pub fn evaluate_store(
    day: &StoreDay<'_>,
    sales: &[SalesRow],
    orders: &mut [Order],
) -> Option<StoreEvaluation> {
    let (mut metrics, matched) = compute_metrics(day.store_id, sales, orders)?;
    let inventory = inventory_positions(day, orders);
    let stockouts = count_stockouts(&inventory, &matched, day.demand);

    for metric in &mut metrics {
        metric.num_stockout = stockouts.get(&metric.policy_name).copied().unwrap_or(0);
        metric.turnover_ratio = turnover_ratio(metric.total_revenue, &inventory, &metric.policy_name);
    }
    Some(StoreEvaluation { metrics, inventory })
}

/// Percent change of `value` against `baseline`.
pub fn relative_change(value: f64, baseline: f64) -> f64 {
    if baseline == 0.0 {
        if value == 0.0 {
            0.0
        } else {
            100.0
        }
    } else {
        (value - baseline) / baseline * 100.0
    }
}

/// Relative change of every policy's metric against the baseline policy,
/// matched by store and date.
pub fn compare_to_baseline(metrics: &[PolicyMetric]) -> Vec<(PolicyMetric, f64)> {
    let baseline: BTreeMap<(&str, NaiveDateTime), f64> = metrics
        .iter()
        .filter(|m| m.policy_name == BASELINE_POLICY)
        .map(|m| ((m.store_id.as_str(), m.metric_date_time), m.metric))
        .collect();

    metrics
        .iter()
        .filter(|m| m.policy_name != BASELINE_POLICY)
        .filter_map(|m| {
            let base = baseline.get(&(m.store_id.as_str(), m.metric_date_time))?;
            Some((m.clone(), relative_change(m.metric, *base)))
        })
        .collect()
}
