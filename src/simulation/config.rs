// src/simulation/config.rs

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Closed interval a generated parameter is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds<T> {
    pub min: T,
    pub max: T,
}

impl<T> Bounds<T> {
    pub const fn new(min: T, max: T) -> Self {
        Self { min, max }
    }
}

/// Parameters for generating the catalog on the first run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogParams {
    pub stores: u32,
    pub brands: u32,
    pub departments: u32,
    pub suppliers: u32,
    pub storage_spaces: u32,
    pub loss_rate: f64,

    // Stores
    pub household_income_mean: f64,
    pub household_income_variance: f64,
    pub traffic_mean: f64,
    pub traffic_variance: f64,
    pub income_traffic_covariance: f64,

    // Departments and storage
    pub price_elasticity: Bounds<f64>,
    pub storage_volume: Bounds<f64>,
    pub storage_budget: Bounds<f64>,
    pub storage_cost: Bounds<f64>,
    pub min_inventory_size: Bounds<u32>,
    pub inventory_size_interval: Bounds<u32>,
    pub missed_sale_cost: Bounds<f64>,

    // Suppliers
    pub shipping_cost: Bounds<f64>,
    pub min_shipping_volume: Bounds<f64>,
    pub shipping_volume_interval: Bounds<f64>,
    pub fixed_order_size: Bounds<u32>,
    pub purchase_cost_budget: Bounds<f64>,

    // Brands and products
    pub brand_desirability: Bounds<f64>,
    pub product_volume: Bounds<f64>,
    pub shelf_life_days: Bounds<u32>,
    pub non_perishable_shelf_life_days: u32,
    pub msrp_multiplier: Bounds<f64>,

    // Product supplier links
    pub lead_time: Bounds<u32>,
    pub lead_time_conf_interval: Bounds<u32>,
    pub min_order_quantity: Bounds<u32>,
    pub order_quantity_interval: Bounds<u32>,
    pub quantity_multiplier: Bounds<u32>,
    pub purchase_cost: Bounds<f64>,
    pub backorder_multiplier: Bounds<f64>,
    pub shipping_multiplier: Bounds<f64>,
    pub purchase_cost_budget_multiplier: Bounds<f64>,
    pub ordering_frequency_days: Bounds<u32>,
    pub service_level: Bounds<f64>,
    pub disposal_multiplier: Bounds<f64>,
}

impl Default for CatalogParams {
    fn default() -> Self {
        Self {
            stores: 6,
            brands: 20,
            departments: 4,
            suppliers: 5,
            storage_spaces: 4,
            loss_rate: 0.0,

            household_income_mean: 5e4,
            household_income_variance: 1e8,
            traffic_mean: 100.0,
            traffic_variance: 100.0,
            income_traffic_covariance: -1e4,

            price_elasticity: Bounds::new(-1.3, -0.7),
            storage_volume: Bounds::new(100.0, 200.0),
            storage_budget: Bounds::new(1000.0, 2000.0),
            storage_cost: Bounds::new(1.0, 5.0),
            min_inventory_size: Bounds::new(0, 100),
            inventory_size_interval: Bounds::new(0, 1000),
            missed_sale_cost: Bounds::new(1.0, 10.0),

            shipping_cost: Bounds::new(1.0, 10.0),
            min_shipping_volume: Bounds::new(0.0, 100.0),
            shipping_volume_interval: Bounds::new(0.0, 1000.0),
            fixed_order_size: Bounds::new(1, 1000),
            purchase_cost_budget: Bounds::new(1000.0, 1_000_000.0),

            brand_desirability: Bounds::new(0.7, 1.3),
            product_volume: Bounds::new(0.1, 2.0),
            shelf_life_days: Bounds::new(1, 7),
            non_perishable_shelf_life_days: 10_000,
            msrp_multiplier: Bounds::new(1.1, 1.5),

            lead_time: Bounds::new(1, 3),
            lead_time_conf_interval: Bounds::new(0, 1),
            min_order_quantity: Bounds::new(0, 10),
            order_quantity_interval: Bounds::new(100, 100_000),
            quantity_multiplier: Bounds::new(1, 20),
            purchase_cost: Bounds::new(2.0, 20.0),
            backorder_multiplier: Bounds::new(1.0, 1.5),
            shipping_multiplier: Bounds::new(0.01, 0.5),
            purchase_cost_budget_multiplier: Bounds::new(100.0, 10_000.0),
            ordering_frequency_days: Bounds::new(1, 10),
            service_level: Bounds::new(0.9, 0.9999),
            disposal_multiplier: Bounds::new(0.1, 0.2),
        }
    }
}

/// Opening hours and receipt parameters of every store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreParams {
    pub opening_hour: u32,
    pub workday_hours: f64,
    /// Mean of the zero-truncated Poisson basket size.
    pub basket_mean: f64,
    pub tax_rate: f64,
}

impl Default for StoreParams {
    fn default() -> Self {
        Self {
            opening_hour: 7,
            workday_hours: 14.0,
            basket_mean: 2.0,
            tax_rate: 0.07,
        }
    }
}

impl StoreParams {
    /// Length of the workday as a fraction of a day.
    pub fn workday_length(&self) -> f64 {
        self.workday_hours / 24.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub seed: u64,
    pub weeks_to_simulate: u32,
    pub weeks_to_forecast: u32,
    pub catalog: CatalogParams,
    pub store: StoreParams,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 1,
            weeks_to_simulate: 1,
            weeks_to_forecast: 6,
            catalog: CatalogParams::default(),
            store: StoreParams::default(),
        }
    }
}

impl SimulationConfig {
    /// Reads a JSON config; missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
