// src/io/lake.rs

use crate::error::Result;
use crate::evaluation::{InventoryPosition, PolicyMetric, SummaryMetric};
use crate::io::reporting::{append_rows, read_json, read_rows, write_json, write_rows};
use crate::model::catalog::{Catalog, Days};
use crate::model::order::Order;
use crate::model::store::{InventorySnapshot, SalesLog, SalesRow};
use crate::simulation::pricing::{ForecastRow, PriceChange};
use crate::strategy::registry::{PolicyConfig, PolicyRegistry};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const RAW_DATA: &str = "rawdata";
const PUBLIC_PARAMETERS: &str = "publicparameters";
const PRIVATE_PARAMETERS: &str = "privateparameters";
const ORDERS: &str = "orders";
const CONFIGURATION: &str = "configuration";
const CATALOG_FILE: &str = "hierarchy_invopt.json";

/// Directory-rooted store for every file the simulator reads or writes.
///
/// Callers address data by store, product, policy and date; the file layout
/// stays private to this type.
#[derive(Debug, Clone)]
pub struct DataLake {
    root: PathBuf,
}

#[derive(Serialize)]
struct StoreAttributes<'a> {
    #[serde(rename = "StoreID")]
    store_id: &'a str,
    #[serde(rename = "StoreName")]
    store_name: &'a str,
    #[serde(rename = "AvgHouseholdIncome")]
    avg_household_income: f64,
    #[serde(rename = "AvgTraffic")]
    avg_traffic: f64,
}

#[derive(Serialize)]
struct BrandProductAttributes<'a> {
    #[serde(rename = "BrandID")]
    brand_id: &'a str,
    #[serde(rename = "ProductID")]
    product_id: &'a str,
    #[serde(rename = "ProductName")]
    product_name: &'a str,
    #[serde(rename = "MSRP")]
    msrp: f64,
    #[serde(rename = "ProductVolume")]
    product_volume: f64,
    #[serde(rename = "ShelfLife")]
    shelf_life: Days,
}

#[derive(Serialize)]
struct StoreProductSupplierAttributes<'a> {
    #[serde(rename = "StoreID")]
    store_id: &'a str,
    #[serde(rename = "SupplierID")]
    supplier_id: u32,
    #[serde(rename = "ProductID")]
    product_id: &'a str,
    #[serde(rename = "LeadTime")]
    lead_time: u32,
    #[serde(rename = "LeadTimeConfidenceInterval")]
    lead_time_confidence_interval: u32,
    #[serde(rename = "MinOrderQuantity")]
    min_order_quantity: u32,
    #[serde(rename = "MaxOrderQuantity")]
    max_order_quantity: u32,
    #[serde(rename = "QuantityMultiplier")]
    quantity_multiplier: u32,
    #[serde(rename = "Cost")]
    cost: f64,
    #[serde(rename = "BackorderCost")]
    backorder_cost: f64,
    #[serde(rename = "ShippingCost")]
    shipping_cost: f64,
    #[serde(rename = "PurchaseCostBudget")]
    purchase_cost_budget: f64,
    #[serde(rename = "ShipmentFreq")]
    shipment_freq: Days,
    #[serde(rename = "ServiceLevel")]
    service_level: f64,
}

fn stamp(ts: NaiveDateTime) -> String {
    ts.format("%Y_%m_%d_%H_%M_%S").to_string()
}

impl DataLake {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn raw(&self, name: String) -> PathBuf {
        self.root.join(RAW_DATA).join(name)
    }

    fn policy_dir(&self, directory: &str) -> PathBuf {
        self.root.join(ORDERS).join(directory)
    }

    // =====================================================================
    // Catalog and configuration
    // =====================================================================

    pub fn load_catalog(&self) -> Result<Option<Catalog>> {
        read_json(&self.root.join(PRIVATE_PARAMETERS).join(CATALOG_FILE))
    }

    /// Writes the private catalog, its public copy and the flat attribute tables.
    pub fn save_catalog(&self, catalog: &Catalog) -> Result<()> {
        write_json(&self.root.join(PRIVATE_PARAMETERS).join(CATALOG_FILE), catalog)?;
        let public = self.root.join(PUBLIC_PARAMETERS);
        write_json(&public.join(CATALOG_FILE), &catalog.to_public())?;

        let stores: Vec<StoreAttributes<'_>> = catalog
            .stores
            .iter()
            .map(|s| StoreAttributes {
                store_id: &s.store_id,
                store_name: &s.store_name,
                avg_household_income: s.avg_household_income,
                avg_traffic: s.avg_traffic,
            })
            .collect();
        write_rows(&public.join("stores.csv"), &stores)?;

        let products: Vec<BrandProductAttributes<'_>> = catalog
            .brands
            .iter()
            .flat_map(|b| {
                b.products.iter().map(move |p| BrandProductAttributes {
                    brand_id: &b.brand_id,
                    product_id: &p.product_id,
                    product_name: &p.product_name,
                    msrp: p.msrp,
                    product_volume: p.product_volume,
                    shelf_life: p.shelf_life,
                })
            })
            .collect();
        write_rows(&public.join("brands_products.csv"), &products)?;

        let links: Vec<StoreProductSupplierAttributes<'_>> = catalog
            .stores
            .iter()
            .flat_map(|s| {
                s.product_supplier.iter().flat_map(move |a| {
                    a.products.iter().map(move |p| StoreProductSupplierAttributes {
                        store_id: &s.store_id,
                        supplier_id: a.supplier_id,
                        product_id: &p.product_id,
                        lead_time: p.lead_time,
                        lead_time_confidence_interval: p.lead_time_confidence_interval,
                        min_order_quantity: p.min_order_quantity,
                        max_order_quantity: p.max_order_quantity,
                        quantity_multiplier: p.quantity_multiplier,
                        cost: p.cost,
                        backorder_cost: p.backorder_cost,
                        shipping_cost: p.shipping_cost,
                        purchase_cost_budget: p.purchase_cost_budget,
                        shipment_freq: p.shipment_freq,
                        service_level: p.service_level,
                    })
                })
            })
            .collect();
        write_rows(&public.join("store_product_supplier.csv"), &links)?;

        info!(root = %self.root.display(), "saved catalog");
        Ok(())
    }

    /// Policy configuration; the baseline policy alone when none is stored.
    pub fn load_policies(&self) -> Result<PolicyRegistry> {
        let path = self.root.join(CONFIGURATION).join("policies.json");
        Ok(read_json::<Vec<PolicyConfig>>(&path)?
            .map(PolicyRegistry::new)
            .unwrap_or_default())
    }

    pub fn save_policies(&self, registry: &PolicyRegistry) -> Result<()> {
        let path = self.root.join(CONFIGURATION).join("policies.json");
        write_json(&path, &registry.policies())
    }

    // =====================================================================
    // Prices and demand
    // =====================================================================

    pub fn load_price_change(
        &self,
        store_id: &str,
        date: NaiveDateTime,
    ) -> Result<Option<PriceChange>> {
        let name = format!("pc_store{}_{}.json", store_id, date.format("%Y_%m_%d_%H"));
        read_json(&self.raw(name))
    }

    pub fn save_price_change(&self, change: &PriceChange) -> Result<()> {
        let name = format!(
            "pc_store{}_{}.json",
            change.store_id,
            change.price_date.format("%Y_%m_%d_%H")
        );
        write_json(&self.raw(name), change)
    }

    fn forecast_path(&self, store_id: &str, product_id: &str, date: NaiveDateTime) -> PathBuf {
        self.root
            .join(RAW_DATA)
            .join("demand_forecasts")
            .join(store_id)
            .join(product_id)
            .join(format!("{}.csv", date.format("%Y-%m-%d_%H_%M_%S")))
    }

    pub fn load_forecast(
        &self,
        store_id: &str,
        product_id: &str,
        date: NaiveDateTime,
    ) -> Result<Option<Vec<ForecastRow>>> {
        read_rows(&self.forecast_path(store_id, product_id, date))
    }

    pub fn save_forecast(
        &self,
        store_id: &str,
        product_id: &str,
        date: NaiveDateTime,
        rows: &[ForecastRow],
    ) -> Result<()> {
        write_rows(&self.forecast_path(store_id, product_id, date), rows)
    }

    // =====================================================================
    // Daily snapshots
    // =====================================================================

    pub fn load_inventory_snapshot(
        &self,
        store_id: &str,
        at: NaiveDateTime,
    ) -> Result<Option<InventorySnapshot>> {
        read_json(&self.raw(format!("inv_store{}_{}.json", store_id, stamp(at))))
    }

    /// Writes the snapshot as a document and as one CSV row per lot.
    pub fn save_inventory_snapshot(&self, snapshot: &InventorySnapshot) -> Result<()> {
        let base = format!(
            "inv_store{}_{}",
            snapshot.store_id,
            stamp(snapshot.inventory_date_time)
        );
        write_json(&self.raw(format!("{base}.json")), snapshot)?;

        #[derive(Serialize)]
        struct LotRow<'a> {
            #[serde(rename = "StoreID")]
            store_id: &'a str,
            #[serde(rename = "ProductID")]
            product_id: &'a str,
            #[serde(rename = "InventoryDateTime")]
            inventory_date_time: String,
            #[serde(rename = "Units")]
            units: u32,
            #[serde(rename = "ExpiryDateTime")]
            expiry_date_time: String,
        }
        let taken_at = crate::io::timestamp::format(&snapshot.inventory_date_time);
        let rows: Vec<LotRow<'_>> = snapshot
            .products
            .iter()
            .flat_map(|p| {
                let taken_at = taken_at.clone();
                p.current_inventory.iter().map(move |lot| LotRow {
                    store_id: &snapshot.store_id,
                    product_id: &p.product_id,
                    inventory_date_time: taken_at.clone(),
                    units: lot.units,
                    expiry_date_time: crate::io::timestamp::format(&lot.expiry_date_time),
                })
            })
            .collect();
        write_rows(&self.raw(format!("{base}.csv")), &rows)
    }

    pub fn save_sales(&self, log: &SalesLog, rows: &[SalesRow]) -> Result<()> {
        let base = format!("sales_store{}_{}", log.store_id, stamp(log.sales_log_date_time));
        write_json(&self.raw(format!("{base}.json")), log)?;
        write_rows(&self.raw(format!("{base}.csv")), rows)
    }

    pub fn load_sales_rows(&self, store_id: &str, at: NaiveDateTime) -> Result<Option<Vec<SalesRow>>> {
        read_rows(&self.raw(format!("sales_store{}_{}.csv", store_id, stamp(at))))
    }

    // =====================================================================
    // Orders
    // =====================================================================

    /// Policy directories that exist under the orders folder.
    pub fn policy_directories(&self) -> Result<Vec<String>> {
        let orders = self.root.join(ORDERS);
        if !orders.exists() {
            return Ok(Vec::new());
        }
        let mut dirs = Vec::new();
        for entry in fs::read_dir(orders)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                dirs.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        dirs.sort();
        Ok(dirs)
    }

    /// Full order history of a store across every policy directory.
    pub fn load_orders(&self, store_id: &str) -> Result<Vec<Order>> {
        let mut orders = Vec::new();
        for dir in self.policy_directories()? {
            let path = self.policy_dir(&dir).join(format!("orders_{store_id}.csv"));
            if let Some(rows) = read_rows::<Order>(&path)? {
                orders.extend(rows);
            }
        }
        Ok(orders)
    }

    pub fn save_orders(&self, directory: &str, store_id: &str, orders: &[Order]) -> Result<()> {
        write_rows(
            &self.policy_dir(directory).join(format!("orders_{store_id}.csv")),
            orders,
        )
    }

    fn partial_orders_path(&self, directory: &str, store_id: &str) -> PathBuf {
        self.policy_dir(directory)
            .join(format!("partial_orders_{store_id}.csv"))
    }

    pub fn has_partial_orders(&self, directory: &str, store_id: &str) -> bool {
        self.partial_orders_path(directory, store_id).exists()
    }

    pub fn append_partial_orders(
        &self,
        directory: &str,
        store_id: &str,
        orders: &[Order],
    ) -> Result<()> {
        append_rows(&self.partial_orders_path(directory, store_id), orders)
    }

    pub fn load_partial_orders(&self, directory: &str, store_id: &str) -> Result<Vec<Order>> {
        Ok(read_rows(&self.partial_orders_path(directory, store_id))?.unwrap_or_default())
    }

    pub fn save_partial_orders(
        &self,
        directory: &str,
        store_id: &str,
        orders: &[Order],
    ) -> Result<()> {
        write_rows(&self.partial_orders_path(directory, store_id), orders)
    }

    pub fn append_metrics(&self, metrics: &[PolicyMetric]) -> Result<()> {
        append_rows(&self.root.join(ORDERS).join("metric.csv"), metrics)
    }

    pub fn load_metrics(&self) -> Result<Vec<PolicyMetric>> {
        Ok(read_rows(&self.root.join(ORDERS).join("metric.csv"))?.unwrap_or_default())
    }

    /// Per-policy inventory positions, one row per (policy, product) and day.
    pub fn append_inventory_positions(&self, positions: &[InventoryPosition]) -> Result<()> {
        append_rows(&self.root.join(ORDERS).join("inventory.csv"), positions)
    }

    pub fn load_inventory_positions(&self) -> Result<Vec<InventoryPosition>> {
        Ok(read_rows(&self.root.join(ORDERS).join("inventory.csv"))?.unwrap_or_default())
    }

    pub fn append_summary_metrics(&self, rows: &[SummaryMetric]) -> Result<()> {
        append_rows(&self.root.join(ORDERS).join("summary_metric.csv"), rows)
    }

    pub fn load_summary_metrics(&self) -> Result<Vec<SummaryMetric>> {
        Ok(read_rows(&self.root.join(ORDERS).join("summary_metric.csv"))?.unwrap_or_default())
    }
}
