// src/evaluation/mod.rs

//! Offline comparison of ordering policies against the day's sales.

pub mod metrics;
pub mod summary;

pub use metrics::{
    compare_to_baseline, compute_metrics, evaluate_store, relative_change, InventoryPosition,
    PolicyMetric, StoreDay,
};
pub use summary::{summarize, SummaryMetric};

use crate::error::Result;
use crate::io::lake::DataLake;
use crate::model::catalog::ProductId;
use crate::model::order::Order;
use chrono::{Duration, NaiveDateTime};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// Forecast demand of the sold day, first row of the forecast filed the day before `date`.
fn sold_day_demand(
    lake: &DataLake,
    store_id: &str,
    products: &[ProductId],
    date: NaiveDateTime,
) -> Result<HashMap<ProductId, f64>> {
    let keyed = date - Duration::days(1);
    let mut demand = HashMap::with_capacity(products.len());
    for product_id in products {
        let first = lake
            .load_forecast(store_id, product_id, keyed)?
            .and_then(|rows| rows.into_iter().next());
        if let Some(row) = first {
            demand.insert(product_id.clone(), row.demand);
        }
    }
    Ok(demand)
}

/// Scores every store's sales file keyed by `date`.
///
/// Partial orders are consumed by the matched sales and written back. The
/// metrics and inventory positions are appended to their files, then the
/// rolling summary is recomputed from the whole metric history. Stores
/// without sales or without any matched sale are skipped.
pub fn evaluate_day(lake: &DataLake, date: NaiveDateTime) -> Result<Vec<PolicyMetric>> {
    let Some(catalog) = lake.load_catalog()? else {
        info!("no catalog yet, nothing to evaluate");
        return Ok(Vec::new());
    };
    let registry = lake.load_policies()?;
    let directories = lake.policy_directories()?;

    let mut all = Vec::new();
    for store in &catalog.stores {
        let store_id = store.store_id.as_str();
        let sales = match lake.load_sales_rows(store_id, date)? {
            Some(rows) if !rows.is_empty() => rows,
            _ => {
                debug!(store_id = %store_id, "no sales to evaluate");
                continue;
            }
        };

        let mut orders: Vec<Order> = Vec::new();
        for dir in &directories {
            orders.extend(lake.load_partial_orders(dir, store_id)?);
        }

        let products = store.product_ids();
        let demand = sold_day_demand(lake, store_id, &products, date)?;
        let day = StoreDay {
            store_id,
            date,
            products: &products,
            demand: &demand,
        };
        let Some(evaluation) = evaluate_store(&day, &sales, &mut orders) else {
            debug!(store_id = %store_id, "no sale matched an order");
            continue;
        };

        let mut by_policy: BTreeMap<&str, Vec<Order>> = BTreeMap::new();
        for order in &orders {
            by_policy
                .entry(order.policy_name.as_str())
                .or_default()
                .push(order.clone());
        }
        for (policy, rows) in &by_policy {
            lake.save_partial_orders(registry.directory(policy), store_id, rows)?;
        }

        lake.append_metrics(&evaluation.metrics)?;
        lake.append_inventory_positions(&evaluation.inventory)?;
        for (metric, change) in compare_to_baseline(&evaluation.metrics) {
            info!(
                store_id = %store_id,
                policy = %metric.policy_name,
                metric = metric.metric,
                stockouts = metric.num_stockout,
                change_pct = change,
                "policy against baseline"
            );
        }
        all.extend(evaluation.metrics);
    }

    if !all.is_empty() {
        let summary = summarize(&lake.load_metrics()?, date);
        lake.append_summary_metrics(&summary)?;
        debug!(rows = summary.len(), "summary metrics written");
    }

    info!(date = %date, rows = all.len(), "evaluation finished");
    Ok(all)
}
