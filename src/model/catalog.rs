// src/model/catalog.rs

use crate::error::{Result, SimError};
use crate::io::timestamp;
use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

pub type StoreId = String;
pub type ProductId = String;
pub type SupplierId = String;

/// A whole number of days, persisted as `"<n> days"` (shelf life, shipment frequency).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Days(pub u32);

impl Days {
    pub fn as_duration(self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.0))
    }
}

impl fmt::Display for Days {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} days", self.0)
    }
}

impl Serialize for Days {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Days {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.split_whitespace()
            .next()
            .and_then(|n| n.parse::<u32>().ok())
            .map(Days)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid day count '{s}'")))
    }
}

/// The static description of the simulated retail chain.
///
/// Only the `initial_date`/`last_date` window changes after generation; it
/// advances once per simulator invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Catalog {
    pub initial_weeks_to_simulate: u32,
    pub weeks_to_forecast: u32,
    #[serde(with = "timestamp")]
    pub initial_date: NaiveDateTime,
    #[serde(with = "timestamp")]
    pub last_date: NaiveDateTime,
    pub brands: Vec<Brand>,
    pub suppliers: Vec<Supplier>,
    pub stores: Vec<Store>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Brand {
    #[serde(rename = "BrandID")]
    pub brand_id: String,
    pub brand_name: String,
    /// Private: stripped from the public catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desirability: Option<f64>,
    pub products: Vec<Product>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Product {
    #[serde(rename = "ProductID")]
    pub product_id: ProductId,
    pub product_name: String,
    pub product_volume: f64,
    #[serde(rename = "MSRP")]
    pub msrp: f64,
    pub shelf_life: Days,
    /// Only set on the per-store copies of a product.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disposal_cost: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Supplier {
    #[serde(rename = "SupplierID")]
    pub supplier_id: SupplierId,
    pub supplier_name: String,
    pub shipping_cost: f64,
    pub min_shipping_volume: f64,
    pub max_shipping_volume: f64,
    pub fixed_order_size: u32,
    pub purchase_cost_budget: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StorageSpace {
    #[serde(rename = "StorageID")]
    pub storage_id: String,
    pub storage_name: String,
    pub storage_volume: f64,
    pub storage_cost_budget: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Department {
    #[serde(rename = "DepartmentID")]
    pub department_id: String,
    pub department_name: String,
    /// Private: stripped from the public catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_elasticity: Option<f64>,
    pub brands: Vec<Brand>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProductStorage {
    #[serde(rename = "ProductID")]
    pub product_id: ProductId,
    pub storage_cost: f64,
    pub missed_sale_cost: f64,
    pub min_inventory_size: u32,
    pub max_inventory_size: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StorageAssignment {
    #[serde(rename = "StorageID")]
    pub storage_id: u32,
    pub products: Vec<ProductStorage>,
}

/// Ordering parameters for one product bought from one supplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProductSupplier {
    #[serde(rename = "ProductID")]
    pub product_id: ProductId,
    pub lead_time: u32,
    pub lead_time_confidence_interval: u32,
    pub min_order_quantity: u32,
    pub max_order_quantity: u32,
    pub quantity_multiplier: u32,
    pub cost: f64,
    pub backorder_cost: f64,
    pub purchase_cost_budget: f64,
    pub shipping_cost: f64,
    pub shipment_freq: Days,
    pub service_level: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SupplierAssignment {
    #[serde(rename = "SupplierID")]
    pub supplier_id: u32,
    pub products: Vec<ProductSupplier>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Store {
    #[serde(rename = "StoreID")]
    pub store_id: StoreId,
    pub store_name: String,
    pub avg_household_income: f64,
    pub avg_traffic: f64,
    /// Private: stripped from the public catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loss_rate: Option<f64>,
    pub storage: Vec<StorageSpace>,
    pub departments: Vec<Department>,
    pub product_storage: Vec<StorageAssignment>,
    pub product_supplier: Vec<SupplierAssignment>,
}

/// One (store, product) row joining every attribute the pricing, demand and
/// store simulation need.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductFeatures {
    pub store_id: StoreId,
    pub avg_household_income: f64,
    pub avg_traffic: f64,
    pub department_id: String,
    pub price_elasticity: f64,
    pub brand_id: String,
    pub desirability: f64,
    pub product_id: ProductId,
    pub msrp: f64,
    pub loss_rate: f64,
    pub shelf_life: Days,
    pub supplier_id: SupplierId,
    pub supplier: ProductSupplier,
}

impl Catalog {
    pub fn store(&self, store_id: &str) -> Result<&Store> {
        self.stores
            .iter()
            .find(|s| s.store_id == store_id)
            .ok_or_else(|| SimError::UnknownStore(store_id.to_string()))
    }

    pub fn store_ids(&self) -> Vec<StoreId> {
        self.stores.iter().map(|s| s.store_id.clone()).collect()
    }

    /// The distributable copy: desirability, price elasticity and loss rate removed.
    pub fn to_public(&self) -> Catalog {
        let mut public = self.clone();
        for brand in &mut public.brands {
            brand.desirability = None;
        }
        for store in &mut public.stores {
            store.loss_rate = None;
            for department in &mut store.departments {
                department.price_elasticity = None;
                for brand in &mut department.brands {
                    brand.desirability = None;
                }
            }
        }
        public
    }

    /// Flattens the hierarchy of every store into feature rows.
    pub fn product_features(&self) -> Result<Vec<ProductFeatures>> {
        let mut rows = Vec::new();
        for store in &self.stores {
            rows.extend(store.product_features()?);
        }
        Ok(rows)
    }
}

impl Store {
    /// Finds the supplier link for a product. A product is bought from a single supplier.
    pub fn supplier_for(&self, product_id: &str) -> Option<(SupplierId, &ProductSupplier)> {
        self.product_supplier.iter().find_map(|assignment| {
            assignment
                .products
                .iter()
                .find(|p| p.product_id == product_id)
                .map(|p| (assignment.supplier_id.to_string(), p))
        })
    }

    pub fn product_ids(&self) -> Vec<ProductId> {
        self.departments
            .iter()
            .flat_map(|d| d.brands.iter())
            .flat_map(|b| b.products.iter())
            .map(|p| p.product_id.clone())
            .collect()
    }

    pub fn product_features(&self) -> Result<Vec<ProductFeatures>> {
        let mut rows = Vec::new();
        for department in &self.departments {
            for brand in &department.brands {
                for product in &brand.products {
                    let (supplier_id, supplier) =
                        self.supplier_for(&product.product_id).ok_or_else(|| {
                            SimError::MissingSupplier {
                                store_id: self.store_id.clone(),
                                product_id: product.product_id.clone(),
                            }
                        })?;
                    rows.push(ProductFeatures {
                        store_id: self.store_id.clone(),
                        avg_household_income: self.avg_household_income,
                        avg_traffic: self.avg_traffic,
                        department_id: department.department_id.clone(),
                        price_elasticity: department.price_elasticity.ok_or_else(|| {
                            SimError::InvalidCatalog(format!(
                                "department {} has no price elasticity",
                                department.department_id
                            ))
                        })?,
                        brand_id: brand.brand_id.clone(),
                        desirability: brand.desirability.ok_or_else(|| {
                            SimError::InvalidCatalog(format!(
                                "brand {} has no desirability",
                                brand.brand_id
                            ))
                        })?,
                        product_id: product.product_id.clone(),
                        msrp: product.msrp,
                        loss_rate: self.loss_rate.unwrap_or(0.0),
                        shelf_life: product.shelf_life,
                        supplier_id,
                        supplier: supplier.clone(),
                    });
                }
            }
        }
        Ok(rows)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::NaiveDate;

    pub fn midnight(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    pub fn supplier_link(product_id: &str) -> ProductSupplier {
        ProductSupplier {
            product_id: product_id.to_string(),
            lead_time: 2,
            lead_time_confidence_interval: 1,
            min_order_quantity: 10,
            max_order_quantity: 500,
            quantity_multiplier: 5,
            cost: 4.0,
            backorder_cost: 5.0,
            purchase_cost_budget: 1000.0,
            shipping_cost: 0.5,
            shipment_freq: Days(1),
            service_level: 0.95,
        }
    }

    /// One store selling one perishable product.
    pub fn single_product_catalog() -> Catalog {
        let product = Product {
            product_id: "1_1".to_string(),
            product_name: "Brand 1 Product 1_1".to_string(),
            product_volume: 1.0,
            msrp: 6.0,
            shelf_life: Days(3),
            disposal_cost: Some(0.5),
        };
        let brand = Brand {
            brand_id: "1".to_string(),
            brand_name: "Brand 1".to_string(),
            desirability: Some(1.0),
            products: vec![product],
        };
        Catalog {
            initial_weeks_to_simulate: 1,
            weeks_to_forecast: 1,
            initial_date: midnight(2017, 5, 1),
            last_date: midnight(2017, 5, 2),
            brands: vec![brand.clone()],
            suppliers: vec![Supplier {
                supplier_id: "1".to_string(),
                supplier_name: "Supplier 1".to_string(),
                shipping_cost: 1.0,
                min_shipping_volume: 0.0,
                max_shipping_volume: 100.0,
                fixed_order_size: 10,
                purchase_cost_budget: 1000.0,
            }],
            stores: vec![Store {
                store_id: "1".to_string(),
                store_name: "Store 1".to_string(),
                avg_household_income: 50_000.0,
                avg_traffic: 100.0,
                loss_rate: Some(0.0),
                storage: vec![],
                departments: vec![Department {
                    department_id: "1".to_string(),
                    department_name: "Department 1".to_string(),
                    price_elasticity: Some(-1.0),
                    brands: vec![brand],
                }],
                product_storage: vec![],
                product_supplier: vec![SupplierAssignment {
                    supplier_id: 1,
                    products: vec![supplier_link("1_1")],
                }],
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn days_round_trip_through_text() {
        let json = serde_json::to_string(&Days(7)).unwrap();
        assert_eq!(json, "\"7 days\"");
        let back: Days = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Days(7));
        assert!(serde_json::from_str::<Days>("\"soon\"").is_err());
    }

    #[test]
    fn public_catalog_strips_private_fields() {
        let catalog = single_product_catalog();
        let public = catalog.to_public();
        let json = serde_json::to_string(&public).unwrap();
        assert!(!json.contains("Desirability"));
        assert!(!json.contains("PriceElasticity"));
        assert!(!json.contains("LossRate"));

        let private = serde_json::to_string(&catalog).unwrap();
        assert!(private.contains("Desirability"));
        let reloaded: Catalog = serde_json::from_str(&private).unwrap();
        assert_eq!(reloaded, catalog);
    }

    #[test]
    fn features_join_supplier_link() {
        let catalog = single_product_catalog();
        let features = catalog.product_features().unwrap();
        assert_eq!(features.len(), 1);
        let row = &features[0];
        assert_eq!(row.supplier_id, "1");
        assert_eq!(row.supplier.min_order_quantity, 10);
        assert_eq!(row.shelf_life, Days(3));
        assert_eq!(row.price_elasticity, -1.0);
        assert_eq!(catalog.stores[0].product_ids(), vec!["1_1".to_string()]);
    }

    #[test]
    fn missing_supplier_is_an_error() {
        let mut catalog = single_product_catalog();
        catalog.stores[0].product_supplier.clear();
        let err = catalog.product_features().unwrap_err();
        assert!(matches!(err, SimError::MissingSupplier { .. }));
    }
}
