// src/simulation/pricing.rs

//! Daily prices per (store, product) and the demand they induce.

use crate::error::{Result, SimError};
use crate::io::timestamp;
use crate::model::catalog::{ProductFeatures, ProductId, StoreId};
use crate::model::inventory::round_cents;
use chrono::{Duration, NaiveDateTime};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Demand never falls below this many units per day.
pub const MIN_DAILY_DEMAND: f64 = 5.0;

const MAX_PRICE_DRAWS: usize = 100_000;

pub type CellKey = (StoreId, ProductId, NaiveDateTime);

#[derive(Debug, Clone, PartialEq)]
pub struct PriceRecord {
    pub store_id: StoreId,
    pub product_id: ProductId,
    pub date_time: NaiveDateTime,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PriceUpdate {
    #[serde(rename = "ProductID")]
    pub product_id: ProductId,
    pub price: f64,
}

/// All prices of one store on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PriceChange {
    #[serde(rename = "StoreID")]
    pub store_id: StoreId,
    #[serde(with = "timestamp")]
    pub price_date: NaiveDateTime,
    pub price_updates: Vec<PriceUpdate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DemandRecord {
    pub store_id: StoreId,
    pub product_id: ProductId,
    pub date_time: NaiveDateTime,
    pub price: f64,
    pub loss_rate: f64,
    /// Expected units per day.
    pub demand: f64,
}

/// One row of a per-(store, product) demand forecast file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRow {
    #[serde(rename = "StoreID")]
    pub store_id: StoreId,
    #[serde(rename = "ProductID")]
    pub product_id: ProductId,
    #[serde(rename = "DateTime", with = "timestamp")]
    pub date_time: NaiveDateTime,
    #[serde(rename = "Demand")]
    pub demand: f64,
    #[serde(rename = "PredictedDemandDistribution")]
    pub distribution: String,
    #[serde(rename = "PredictedDemandVariance")]
    pub variance: f64,
    #[serde(rename = "PredictedDemandProbability")]
    pub probability: f64,
}

/// Dates covered by prices: the simulated window plus the forecast horizon.
pub fn price_dates(
    initial_date: NaiveDateTime,
    last_date: NaiveDateTime,
    weeks_to_forecast: u32,
) -> Vec<NaiveDateTime> {
    let window = (last_date - initial_date).num_days().max(0);
    let count = window + 7 * i64::from(weeks_to_forecast);
    (0..count).map(|i| initial_date + Duration::days(i)).collect()
}

/// Draws a price between cost and MSRP.
///
/// The normal is centred 80% of the way from cost to MSRP with standard
/// deviation `(0.5 * (msrp - cost))^2`; draws outside `[cost, msrp]` are
/// rejected. The squared spread is kept as historically observed, so the
/// rejection bound does most of the shaping.
pub fn draw_price<R: Rng>(rng: &mut R, cost: f64, msrp: f64) -> Result<f64> {
    let mu = cost + 0.8 * (msrp - cost);
    let sd = (0.5 * (msrp - cost)).powi(2);
    let normal = Normal::new(mu, sd)
        .map_err(|e| SimError::distribution(format!("price normal({mu}, {sd}): {e}")))?;

    for _ in 0..MAX_PRICE_DRAWS {
        let price = normal.sample(rng);
        if (cost..=msrp).contains(&price) {
            return Ok(round_cents(price));
        }
    }
    Ok(round_cents(mu))
}

/// Prices for every (feature row, date); `known` prices are reused as is.
pub fn build_prices<R: Rng>(
    features: &[ProductFeatures],
    dates: &[NaiveDateTime],
    known: &HashMap<CellKey, f64>,
    rng: &mut R,
) -> Result<Vec<PriceRecord>> {
    let mut prices = Vec::with_capacity(features.len() * dates.len());
    for row in features {
        for &date_time in dates {
            let key = (row.store_id.clone(), row.product_id.clone(), date_time);
            let price = match known.get(&key) {
                Some(&price) => price,
                None => draw_price(rng, row.supplier.cost, row.msrp)?,
            };
            prices.push(PriceRecord {
                store_id: row.store_id.clone(),
                product_id: row.product_id.clone(),
                date_time,
                price,
            });
        }
    }
    Ok(prices)
}

/// Groups prices dated before `before` into one document per (store, date).
pub fn price_changes(prices: &[PriceRecord], before: NaiveDateTime) -> Vec<PriceChange> {
    let mut grouped: BTreeMap<(StoreId, NaiveDateTime), Vec<PriceUpdate>> = BTreeMap::new();
    for record in prices.iter().filter(|p| p.date_time < before) {
        grouped
            .entry((record.store_id.clone(), record.date_time))
            .or_default()
            .push(PriceUpdate {
                product_id: record.product_id.clone(),
                price: record.price,
            });
    }
    grouped
        .into_iter()
        .map(|((store_id, price_date), price_updates)| PriceChange {
            store_id,
            price_date,
            price_updates,
        })
        .collect()
}

/// Demand from price, traffic, desirability and elasticity.
///
/// `relative_price` is the price over the mean price of the product's
/// department across the whole price table.
pub fn demand_formula(features: &ProductFeatures, price: f64, relative_price: f64) -> f64 {
    let discount = (features.msrp - price) / features.msrp;
    let mut demand = features.avg_traffic * features.desirability / (1.0 - discount);
    demand += (relative_price - 1.0) * price * features.price_elasticity;
    demand /= relative_price * relative_price;
    demand.max(MIN_DAILY_DEMAND)
}

pub fn derive_demand(features: &[ProductFeatures], prices: &[PriceRecord]) -> Vec<DemandRecord> {
    let by_cell: HashMap<(&str, &str), &ProductFeatures> = features
        .iter()
        .map(|f| ((f.store_id.as_str(), f.product_id.as_str()), f))
        .collect();

    let mut department_totals: HashMap<&str, (f64, usize)> = HashMap::new();
    for record in prices {
        if let Some(f) = by_cell.get(&(record.store_id.as_str(), record.product_id.as_str())) {
            let entry = department_totals.entry(f.department_id.as_str()).or_default();
            entry.0 += record.price;
            entry.1 += 1;
        }
    }

    prices
        .iter()
        .filter_map(|record| {
            let f = by_cell.get(&(record.store_id.as_str(), record.product_id.as_str()))?;
            let (total, count) = department_totals.get(f.department_id.as_str())?;
            let mean = total / *count as f64;
            let relative_price = record.price / mean;
            Some(DemandRecord {
                store_id: record.store_id.clone(),
                product_id: record.product_id.clone(),
                date_time: record.date_time,
                price: record.price,
                loss_rate: f.loss_rate,
                demand: demand_formula(f, record.price, relative_price),
            })
        })
        .collect()
}

/// Previously observed demand wins over freshly derived demand.
pub fn merge_previous(demand: &mut [DemandRecord], previous: &HashMap<CellKey, f64>) {
    for record in demand.iter_mut() {
        let key = (
            record.store_id.clone(),
            record.product_id.clone(),
            record.date_time,
        );
        if let Some(&old) = previous.get(&key) {
            record.demand = old;
        }
    }
}

/// Forecast rows from `today` on, grouped per (store, product).
pub fn forecast_rows(
    demand: &[DemandRecord],
    today: NaiveDateTime,
) -> BTreeMap<(StoreId, ProductId), Vec<ForecastRow>> {
    let mut grouped: BTreeMap<(StoreId, ProductId), Vec<ForecastRow>> = BTreeMap::new();
    for record in demand.iter().filter(|d| d.date_time >= today) {
        grouped
            .entry((record.store_id.clone(), record.product_id.clone()))
            .or_default()
            .push(ForecastRow {
                store_id: record.store_id.clone(),
                product_id: record.product_id.clone(),
                date_time: record.date_time,
                demand: record.demand,
                distribution: String::new(),
                variance: -1.0,
                probability: 1.0,
            });
    }
    grouped
}
