// src/simulation/generator.rs

//! First-run generation of the store catalog.

use crate::model::catalog::{
    Brand, Catalog, Days, Department, Product, ProductStorage, ProductSupplier, StorageAssignment,
    StorageSpace, Store, Supplier, SupplierAssignment,
};
use crate::simulation::config::{Bounds, CatalogParams, SimulationConfig};
use chrono::NaiveDateTime;
use rand::Rng;
use rand_distr::StandardNormal;
use tracing::info;

fn uniform<R: Rng>(rng: &mut R, b: Bounds<f64>) -> f64 {
    if b.max > b.min {
        rng.gen_range(b.min..b.max)
    } else {
        b.min
    }
}

fn uniform_int<R: Rng>(rng: &mut R, b: Bounds<u32>) -> u32 {
    if b.max > b.min {
        rng.gen_range(b.min..=b.max)
    } else {
        b.min
    }
}

/// Index range `[start, end)` of the `part`-th (1-based) of `parts` even slices of `n`.
fn slice(n: u32, parts: u32, part: u32) -> std::ops::Range<usize> {
    let start = ((part - 1) * n / parts) as usize;
    let end = (part * n / parts) as usize;
    start..end
}

pub struct CatalogGenerator<'a, R: Rng> {
    params: &'a CatalogParams,
    rng: &'a mut R,
}

impl<'a, R: Rng> CatalogGenerator<'a, R> {
    pub fn new(params: &'a CatalogParams, rng: &'a mut R) -> Self {
        Self { params, rng }
    }

    /// Builds a fresh catalog whose simulation window is `(initial_date, last_date)`.
    pub fn generate(
        mut self,
        config: &SimulationConfig,
        initial_date: NaiveDateTime,
        last_date: NaiveDateTime,
    ) -> Catalog {
        let brands = self.brands();
        let suppliers = self.suppliers();
        let stores = (1..=self.params.stores)
            .map(|store_id| self.store(store_id, &brands))
            .collect();

        info!(
            stores = self.params.stores,
            brands = self.params.brands,
            suppliers = self.params.suppliers,
            "generated new catalog"
        );

        Catalog {
            initial_weeks_to_simulate: config.weeks_to_simulate,
            weeks_to_forecast: config.weeks_to_forecast,
            initial_date,
            last_date,
            brands,
            suppliers,
            stores,
        }
    }

    fn brands(&mut self) -> Vec<Brand> {
        let p = self.params;
        (1..=p.brands)
            .map(|brand_id| {
                let brand_name = format!("Brand {brand_id}");
                let product_id = format!("{brand_id}_1");

                // The first half of the brands is perishable, later ones by coin flip
                let perishable = f64::from(brand_id) <= f64::from(p.brands) / 2.0
                    || self.rng.gen_bool(0.5);
                let shelf_life = if perishable {
                    Days(uniform_int(self.rng, p.shelf_life_days))
                } else {
                    Days(p.non_perishable_shelf_life_days)
                };

                let product = Product {
                    product_name: format!("{brand_name} Product {product_id}"),
                    product_id,
                    product_volume: uniform(self.rng, p.product_volume),
                    msrp: 0.0,
                    shelf_life,
                    disposal_cost: None,
                };

                Brand {
                    brand_id: brand_id.to_string(),
                    brand_name,
                    desirability: Some(uniform(self.rng, p.brand_desirability)),
                    products: vec![product],
                }
            })
            .collect()
    }

    fn suppliers(&mut self) -> Vec<Supplier> {
        let p = self.params;
        (1..=p.suppliers)
            .map(|supplier_id| {
                let min_shipping_volume = uniform(self.rng, p.min_shipping_volume);
                Supplier {
                    supplier_id: supplier_id.to_string(),
                    supplier_name: format!("Supplier {supplier_id}"),
                    shipping_cost: uniform(self.rng, p.shipping_cost),
                    min_shipping_volume,
                    max_shipping_volume: min_shipping_volume
                        + uniform(self.rng, p.shipping_volume_interval),
                    fixed_order_size: uniform_int(self.rng, p.fixed_order_size),
                    purchase_cost_budget: uniform(self.rng, p.purchase_cost_budget),
                }
            })
            .collect()
    }

    /// Household income and traffic are drawn jointly from a bivariate normal.
    fn income_and_traffic(&mut self) -> (f64, f64) {
        let p = self.params;
        let sd_income = p.household_income_variance.sqrt();
        let sd_traffic = p.traffic_variance.sqrt();
        let rho = if sd_income > 0.0 && sd_traffic > 0.0 {
            (p.income_traffic_covariance / (sd_income * sd_traffic)).clamp(-1.0, 1.0)
        } else {
            0.0
        };

        let z1: f64 = self.rng.sample(StandardNormal);
        let z2: f64 = self.rng.sample(StandardNormal);
        let income = p.household_income_mean + sd_income * z1;
        let traffic = p.traffic_mean + sd_traffic * (rho * z1 + (1.0 - rho * rho).sqrt() * z2);
        (income, traffic)
    }

    fn store(&mut self, store_id: u32, brands: &[Brand]) -> Store {
        let p = self.params;
        let (avg_household_income, avg_traffic) = self.income_and_traffic();

        let storage = (1..=p.storage_spaces)
            .map(|storage_id| StorageSpace {
                storage_id: storage_id.to_string(),
                storage_name: format!("Storage {storage_id}"),
                storage_volume: uniform(self.rng, p.storage_volume),
                storage_cost_budget: uniform(self.rng, p.storage_budget),
            })
            .collect();

        // Each store gets its own copy of the brands so MSRP can differ per store
        let mut departments: Vec<Department> = (1..=p.departments)
            .map(|department_id| Department {
                department_id: department_id.to_string(),
                department_name: format!("Department {department_id}"),
                price_elasticity: Some(uniform(self.rng, p.price_elasticity)),
                brands: brands[slice(p.brands, p.departments, department_id)].to_vec(),
            })
            .collect();

        let product_storage = self.product_storage(brands);
        let product_supplier = self.product_supplier(brands);

        let mut store = Store {
            store_id: store_id.to_string(),
            store_name: format!("Store {store_id}"),
            avg_household_income,
            avg_traffic,
            loss_rate: Some(p.loss_rate),
            storage,
            departments: Vec::new(),
            product_storage,
            product_supplier,
        };

        for department in &mut departments {
            for brand in &mut department.brands {
                for product in &mut brand.products {
                    let cost = store
                        .supplier_for(&product.product_id)
                        .map(|(_, link)| link.cost)
                        .unwrap_or(0.0);
                    product.msrp = uniform(self.rng, p.msrp_multiplier) * cost;
                    product.disposal_cost =
                        Some(if product.shelf_life.0 == p.non_perishable_shelf_life_days {
                            0.0
                        } else {
                            uniform(self.rng, p.disposal_multiplier) * cost
                        });
                }
            }
        }
        store.departments = departments;
        store
    }

    fn product_storage(&mut self, brands: &[Brand]) -> Vec<StorageAssignment> {
        let p = self.params;
        (1..=p.storage_spaces)
            .map(|storage_id| {
                let products = brands[slice(p.brands, p.storage_spaces, storage_id)]
                    .iter()
                    .flat_map(|b| b.products.iter())
                    .map(|product| {
                        let min_inventory_size = uniform_int(self.rng, p.min_inventory_size);
                        ProductStorage {
                            product_id: product.product_id.clone(),
                            storage_cost: uniform(self.rng, p.storage_cost),
                            missed_sale_cost: uniform(self.rng, p.missed_sale_cost),
                            min_inventory_size,
                            max_inventory_size: min_inventory_size
                                + uniform_int(self.rng, p.inventory_size_interval),
                        }
                    })
                    .collect();
                StorageAssignment {
                    storage_id,
                    products,
                }
            })
            .collect()
    }

    fn product_supplier(&mut self, brands: &[Brand]) -> Vec<SupplierAssignment> {
        let p = self.params;
        (1..=p.suppliers)
            .map(|supplier_id| {
                let products = brands[slice(p.brands, p.suppliers, supplier_id)]
                    .iter()
                    .flat_map(|b| b.products.iter())
                    .map(|product| {
                        let min_order_quantity = uniform_int(self.rng, p.min_order_quantity);
                        let cost = uniform(self.rng, p.purchase_cost);
                        ProductSupplier {
                            product_id: product.product_id.clone(),
                            lead_time: uniform_int(self.rng, p.lead_time),
                            lead_time_confidence_interval: uniform_int(
                                self.rng,
                                p.lead_time_conf_interval,
                            ),
                            min_order_quantity,
                            max_order_quantity: min_order_quantity
                                + uniform_int(self.rng, p.order_quantity_interval),
                            quantity_multiplier: uniform_int(self.rng, p.quantity_multiplier),
                            cost,
                            backorder_cost: cost * uniform(self.rng, p.backorder_multiplier),
                            purchase_cost_budget: cost
                                * uniform(self.rng, p.purchase_cost_budget_multiplier),
                            shipping_cost: cost * uniform(self.rng, p.shipping_multiplier),
                            shipment_freq: Days(uniform_int(self.rng, p.ordering_frequency_days)),
                            service_level: uniform(self.rng, p.service_level),
                        }
                    })
                    .collect();
                SupplierAssignment {
                    supplier_id,
                    products,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::catalog::fixtures::midnight;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn generate(seed: u64) -> Catalog {
        let config = SimulationConfig::default();
        let mut rng = StdRng::seed_from_u64(seed);
        CatalogGenerator::new(&config.catalog, &mut rng).generate(
            &config,
            midnight(2017, 5, 1),
            midnight(2017, 5, 2),
        )
    }

    #[test]
    fn default_shape_matches_parameters() {
        let catalog = generate(1);
        assert_eq!(catalog.stores.len(), 6);
        assert_eq!(catalog.brands.len(), 20);
        assert_eq!(catalog.suppliers.len(), 5);

        let store = &catalog.stores[0];
        assert_eq!(store.departments.len(), 4);
        assert_eq!(store.storage.len(), 4);
        let brands_in_departments: usize = store.departments.iter().map(|d| d.brands.len()).sum();
        assert_eq!(brands_in_departments, 20);
    }

    #[test]
    fn every_product_has_a_supplier_and_sane_prices() {
        let catalog = generate(3);
        let features = catalog.product_features().unwrap();
        assert_eq!(features.len(), 6 * 20);
        for row in &features {
            let link = &row.supplier;
            assert!(link.max_order_quantity >= link.min_order_quantity);
            assert!(row.msrp >= 1.1 * link.cost && row.msrp <= 1.5 * link.cost);
            assert!((1..=10).contains(&link.shipment_freq.0));
        }
    }

    #[test]
    fn first_half_of_brands_is_perishable() {
        let catalog = generate(5);
        for brand in &catalog.brands[..10] {
            assert!(brand.products[0].shelf_life.0 <= 7);
        }
    }

    #[test]
    fn same_seed_same_catalog() {
        assert_eq!(generate(9), generate(9));
    }
}
