// src/model/store.rs

use crate::error::{Result, SimError};
use crate::io::timestamp;
use crate::model::catalog::{Catalog, ProductFeatures, ProductId, StoreId};
use crate::model::inventory::{
    round_cents, Inventory, InventorySummary, OrderLimits, SaleRecord, SpoilageSummary,
    UnitOutcome,
};
use crate::model::order::{Order, OrderLedger};
use crate::simulation::config::StoreParams;
use crate::simulation::pricing::DemandRecord;
use crate::strategy::registry::PolicyRegistry;
use crate::strategy::traits::{OrderContext, OrderPolicy};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::distributions::WeightedIndex;
use rand::Rng;
use rand_distr::{Distribution, Exp, Poisson};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Inventory of every product of a store at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InventorySnapshot {
    #[serde(rename = "StoreID")]
    pub store_id: StoreId,
    #[serde(with = "timestamp")]
    pub inventory_date_time: NaiveDateTime,
    pub products: Vec<InventorySummary>,
}

impl InventorySnapshot {
    pub fn product(&self, product_id: &str) -> Option<&InventorySummary> {
        self.products.iter().find(|p| p.product_id == product_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SpoilageSnapshot {
    #[serde(rename = "StoreID")]
    pub store_id: StoreId,
    #[serde(with = "timestamp")]
    pub spoilage_date_time: NaiveDateTime,
    pub products: Vec<SpoilageSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReceiptLine {
    #[serde(rename = "ProductID")]
    pub product_id: ProductId,
    pub price: f64,
}

/// Several unit sales grouped into one customer transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Receipt {
    #[serde(with = "timestamp")]
    pub transaction_date_time: NaiveDateTime,
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
    pub products: Vec<ReceiptLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SalesLog {
    #[serde(rename = "StoreID")]
    pub store_id: StoreId,
    #[serde(with = "timestamp")]
    pub sales_log_date_time: NaiveDateTime,
    pub transactions: Vec<Receipt>,
}

/// One line of the flat sales file. Spoiled units appear with price zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesRow {
    #[serde(rename = "StoreID")]
    pub store_id: StoreId,
    #[serde(rename = "ProductID")]
    pub product_id: ProductId,
    #[serde(rename = "TransactionDateTime", with = "timestamp")]
    pub transaction_date_time: NaiveDateTime,
    #[serde(rename = "Units")]
    pub units: u32,
    #[serde(rename = "Price")]
    pub price: f64,
    #[serde(rename = "Spoilage", default)]
    pub spoilage: bool,
}

/// Everything one simulated day produced for a store.
#[derive(Debug, Clone)]
pub struct DayReport {
    pub day: NaiveDate,
    /// Timestamp the end-of-day files are keyed by (midnight after the day).
    pub written_at: NaiveDateTime,
    pub inventory: InventorySnapshot,
    pub spoilage: SpoilageSnapshot,
    pub sales_log: SalesLog,
    pub sales_rows: Vec<SalesRow>,
    /// Unmet sale attempts per product today.
    pub stockouts: BTreeMap<ProductId, u32>,
    pub new_orders: Vec<Order>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventKind {
    Sale,
    Loss,
}

/// Simulates one store: stock, customers and replenishment.
///
/// Owns the inventory ledger of every product and the store's order ledger;
/// the catalog is only read.
pub struct RetailStore<'a> {
    store_id: StoreId,
    params: StoreParams,
    features: BTreeMap<ProductId, ProductFeatures>,
    policies: &'a PolicyRegistry,
    policy: Box<dyn OrderPolicy>,

    demand: BTreeMap<NaiveDateTime, Vec<DemandRecord>>,
    inventories: BTreeMap<ProductId, Inventory>,
    backorders: BTreeMap<ProductId, u32>,
    orders: OrderLedger,
}

impl<'a> RetailStore<'a> {
    /// Builds the store from its demand rows.
    ///
    /// Each product's inventory is hydrated from `snapshot` when it lists the
    /// product, otherwise it is cold-started with a random delivery.
    #[allow(clippy::too_many_arguments)]
    pub fn new<R: Rng>(
        catalog: &Catalog,
        store_id: &str,
        params: StoreParams,
        demand: Vec<DemandRecord>,
        orders: OrderLedger,
        snapshot: Option<&InventorySnapshot>,
        policies: &'a PolicyRegistry,
        policy: Box<dyn OrderPolicy>,
        rng: &mut R,
    ) -> Result<Self> {
        let store = catalog.store(store_id)?;
        let features: BTreeMap<ProductId, ProductFeatures> = store
            .product_features()?
            .into_iter()
            .map(|f| (f.product_id.clone(), f))
            .collect();

        let mut by_date: BTreeMap<NaiveDateTime, Vec<DemandRecord>> = BTreeMap::new();
        for record in demand.into_iter().filter(|d| d.store_id == store_id) {
            by_date.entry(record.date_time).or_default().push(record);
        }

        let mut inventories = BTreeMap::new();
        if let Some((&first_date, first_rows)) = by_date.iter().next() {
            for row in first_rows {
                let f = features.get(&row.product_id).ok_or_else(|| {
                    SimError::MissingSupplier {
                        store_id: store_id.to_string(),
                        product_id: row.product_id.clone(),
                    }
                })?;
                let inventory = match snapshot.and_then(|s| s.product(&row.product_id)) {
                    Some(saved) => Inventory::hydrate(
                        row.product_id.clone(),
                        row.price,
                        first_date,
                        &saved.current_inventory,
                    ),
                    None => Inventory::cold_start(
                        row.product_id.clone(),
                        row.price,
                        first_date,
                        f.shelf_life.as_duration(),
                        OrderLimits {
                            min_order_quantity: f.supplier.min_order_quantity,
                            max_order_quantity: f.supplier.max_order_quantity,
                            quantity_multiplier: f.supplier.quantity_multiplier,
                        },
                        rng,
                    ),
                };
                inventories.insert(row.product_id.clone(), inventory);
            }
        }

        Ok(Self {
            store_id: store_id.to_string(),
            params,
            features,
            policies,
            policy,
            demand: by_date,
            inventories,
            backorders: BTreeMap::new(),
            orders,
        })
    }

    pub fn store_id(&self) -> &str {
        &self.store_id
    }

    pub fn orders(&self) -> &OrderLedger {
        &self.orders
    }

    pub fn orders_mut(&mut self) -> &mut OrderLedger {
        &mut self.orders
    }

    pub fn inventory(&self, product_id: &str) -> Option<&Inventory> {
        self.inventories.get(product_id)
    }

    pub fn backorders(&self, product_id: &str) -> u32 {
        self.backorders.get(product_id).copied().unwrap_or(0)
    }

    /// Dates with demand strictly before `today`, in order.
    pub fn pending_days(&self, today: NaiveDateTime) -> Vec<NaiveDateTime> {
        self.demand.range(..today).map(|(d, _)| *d).collect()
    }

    /// Simulates every remaining day before `today`, calling `on_day` after each.
    pub fn run<R, F>(&mut self, today: NaiveDateTime, rng: &mut R, mut on_day: F) -> Result<()>
    where
        R: Rng,
        F: FnMut(&mut Self, DayReport) -> Result<()>,
    {
        for day in self.pending_days(today) {
            let report = self.simulate_day(day, rng)?;
            on_day(self, report)?;
        }
        Ok(())
    }

    /// Runs one day: deliveries, customer events, end of day and ordering.
    pub fn simulate_day<R: Rng>(&mut self, date: NaiveDateTime, rng: &mut R) -> Result<DayReport> {
        let opening = date + Duration::hours(i64::from(self.params.opening_hour));
        debug!(store_id = %self.store_id, day = %date.date(), "simulating day");

        self.receive_deliveries(opening);

        let rows = self.demand.get(&date).cloned().unwrap_or_default();
        let mut rates = Vec::with_capacity(rows.len() * 2);
        let mut events = Vec::with_capacity(rows.len() * 2);
        for row in &rows {
            if let Some(inventory) = self.inventories.get_mut(&row.product_id) {
                inventory.update_price(row.price);
                rates.push(row.demand.max(0.0));
                events.push((row.product_id.clone(), EventKind::Sale));
                rates.push(row.loss_rate.max(0.0));
                events.push((row.product_id.clone(), EventKind::Loss));
            }
        }

        let (sales, stockouts) = self.run_events(opening, &rates, &events, rng)?;
        self.close_day(date, opening, sales, stockouts, rng)
    }

    /// Open orders due today arrive at opening time for active policies.
    fn receive_deliveries(&mut self, opening: NaiveDateTime) {
        let policies = self.policies;
        for order in self.orders.due_mut(opening.date()) {
            if !policies.is_active(&order.policy_name) {
                continue;
            }
            let Some(inventory) = self.inventories.get_mut(&order.product_id) else {
                warn!(store_id = %self.store_id, product_id = %order.product_id, "delivery for unknown product");
                continue;
            };
            let Some(features) = self.features.get(&order.product_id) else {
                continue;
            };
            order.fulfilled = true;
            inventory.add_inventory(opening + features.shelf_life.as_duration(), order.quantity);
        }
    }

    /// Competing Poisson processes over the workday: exponential gaps at the
    /// total rate, each event picked proportionally to its rate.
    fn run_events<R: Rng>(
        &mut self,
        opening: NaiveDateTime,
        rates: &[f64],
        events: &[(ProductId, EventKind)],
        rng: &mut R,
    ) -> Result<(Vec<SaleRecord>, BTreeMap<ProductId, u32>)> {
        let mut sales = Vec::new();
        let mut stockouts: BTreeMap<ProductId, u32> = BTreeMap::new();

        let total: f64 = rates.iter().sum();
        if total <= 0.0 {
            return Ok((sales, stockouts));
        }

        let workday = self.params.workday_length();
        let beta = workday / total;
        let gaps = Exp::new(1.0 / beta)
            .map_err(|e| SimError::distribution(format!("event gaps exp(1/{beta}): {e}")))?;
        let picker = WeightedIndex::new(rates)
            .map_err(|e| SimError::distribution(format!("event weights: {e}")))?;

        let mut elapsed = 0.0;
        loop {
            elapsed += gaps.sample(rng);
            if elapsed > workday {
                break;
            }

            let (product_id, kind) = &events[picker.sample(rng)];
            let at = opening + Duration::seconds((elapsed * 86_400.0).round() as i64);
            let Some(inventory) = self.inventories.get_mut(product_id) else {
                continue;
            };

            match (inventory.remove_unit(at, *kind == EventKind::Sale), kind) {
                (UnitOutcome::Sold(sale), _) => sales.push(sale),
                (UnitOutcome::NoStock, EventKind::Sale) => {
                    *stockouts.entry(product_id.clone()).or_default() += 1;
                }
                _ => {}
            }
        }

        Ok((sales, stockouts))
    }

    fn close_day<R: Rng>(
        &mut self,
        date: NaiveDateTime,
        opening: NaiveDateTime,
        sales: Vec<SaleRecord>,
        stockouts: BTreeMap<ProductId, u32>,
        rng: &mut R,
    ) -> Result<DayReport> {
        let mut inventory_summaries = Vec::with_capacity(self.inventories.len());
        let mut spoilage_summaries = Vec::new();
        for inventory in self.inventories.values_mut() {
            let (summary, spoiled) = inventory.end_of_day();
            inventory_summaries.push(summary);
            if !spoiled.current_spoilages.is_empty() {
                spoilage_summaries.push(spoiled);
            }
        }
        let written_at = date + Duration::days(1);

        let transactions = self.group_into_receipts(&sales, rng)?;

        let mut sales_rows: Vec<SalesRow> = sales
            .iter()
            .map(|s| SalesRow {
                store_id: self.store_id.clone(),
                product_id: s.product_id.clone(),
                transaction_date_time: s.transaction_date_time,
                units: s.units,
                price: s.price,
                spoilage: false,
            })
            .collect();
        for spoiled in &spoilage_summaries {
            for lot in &spoiled.current_spoilages {
                sales_rows.push(SalesRow {
                    store_id: self.store_id.clone(),
                    product_id: spoiled.product_id.clone(),
                    transaction_date_time: written_at,
                    units: lot.units,
                    price: 0.0,
                    spoilage: true,
                });
            }
        }

        let new_orders = self.place_orders(opening, &stockouts);

        Ok(DayReport {
            day: date.date(),
            written_at,
            inventory: InventorySnapshot {
                store_id: self.store_id.clone(),
                inventory_date_time: written_at,
                products: inventory_summaries,
            },
            spoilage: SpoilageSnapshot {
                store_id: self.store_id.clone(),
                spoilage_date_time: written_at,
                products: spoilage_summaries,
            },
            sales_log: SalesLog {
                store_id: self.store_id.clone(),
                sales_log_date_time: written_at,
                transactions,
            },
            sales_rows,
            stockouts,
            new_orders,
        })
    }

    /// Consecutive unit sales form a receipt whose size follows a Poisson
    /// distribution truncated at zero.
    fn group_into_receipts<R: Rng>(
        &self,
        sales: &[SaleRecord],
        rng: &mut R,
    ) -> Result<Vec<Receipt>> {
        let mut receipts = Vec::new();
        if sales.is_empty() {
            return Ok(receipts);
        }

        let basket = Poisson::new(self.params.basket_mean)
            .map_err(|e| SimError::distribution(format!("basket poisson: {e}")))?;
        let mut idx = 0;
        while idx < sales.len() {
            let size = zero_truncated(&basket, rng);
            let end = (idx + size).min(sales.len());
            receipts.extend(self.receipt(&sales[idx..end]));
            idx = end;
        }
        Ok(receipts)
    }

    fn receipt(&self, items: &[SaleRecord]) -> Option<Receipt> {
        let last = items.last()?;
        let subtotal: f64 = items.iter().map(|s| f64::from(s.units) * s.price).sum();
        let subtotal = round_cents(subtotal);
        let tax = round_cents(subtotal * self.params.tax_rate);
        Some(Receipt {
            transaction_date_time: last.transaction_date_time,
            subtotal,
            tax,
            total: round_cents(subtotal + tax),
            products: items
                .iter()
                .map(|s| ReceiptLine {
                    product_id: s.product_id.clone(),
                    price: s.price,
                })
                .collect(),
        })
    }

    /// Adds today's stockouts to the backorder tally and lets the policy
    /// convert them into supplier orders.
    fn place_orders(
        &mut self,
        opening: NaiveDateTime,
        stockouts: &BTreeMap<ProductId, u32>,
    ) -> Vec<Order> {
        for (product_id, count) in stockouts {
            *self.backorders.entry(product_id.clone()).or_default() += count;
        }

        let mut placed = Vec::new();
        for (product_id, backorders) in self.backorders.iter_mut() {
            let Some(features) = self.features.get(product_id) else {
                continue;
            };
            let context = OrderContext {
                backorders: *backorders,
                supplier: &features.supplier,
                day: opening.date(),
            };
            let Some(quantity) = self.policy.calculate_order(&context) else {
                continue;
            };
            let quantity = quantity.min(*backorders);
            *backorders -= quantity;

            let order = Order {
                policy_name: self.policy.name().to_string(),
                store_id: self.store_id.clone(),
                product_id: product_id.clone(),
                supplier_id: features.supplier_id.clone(),
                quantity,
                order_timestamp: opening,
                eta: opening + Duration::days(i64::from(features.supplier.lead_time)),
                confidence_interval: features.supplier.lead_time_confidence_interval,
                fulfilled: false,
            };
            debug!(
                store_id = %self.store_id,
                product_id = %product_id,
                quantity,
                eta = %order.eta,
                "placed order"
            );
            self.orders.place(order.clone());
            placed.push(order);
        }
        self.backorders.retain(|_, v| *v > 0);

        placed
    }
}

/// Rejection-samples a Poisson draw until it is at least one.
fn zero_truncated<R: Rng>(basket: &Poisson<f64>, rng: &mut R) -> usize {
    loop {
        let draw = basket.sample(rng);
        if draw >= 1.0 {
            return draw as usize;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::catalog::fixtures::{midnight, single_product_catalog};
    use crate::model::inventory::LotRecord;
    use crate::strategy::implementations::BackorderPolicy;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn demand_rows(days: &[u32], demand: f64, loss_rate: f64) -> Vec<DemandRecord> {
        days.iter()
            .map(|&d| DemandRecord {
                store_id: "1".to_string(),
                product_id: "1_1".to_string(),
                date_time: midnight(2017, 5, d),
                price: 5.0,
                loss_rate,
                demand,
            })
            .collect()
    }

    fn snapshot(units: u32, expiry_day: u32) -> InventorySnapshot {
        InventorySnapshot {
            store_id: "1".to_string(),
            inventory_date_time: midnight(2017, 5, 1),
            products: vec![InventorySummary {
                product_id: "1_1".to_string(),
                arrivals: 0,
                sales: 0,
                losses: 0,
                spoilages: 0,
                current_inventory: vec![LotRecord {
                    expiry_date_time: midnight(2017, 5, expiry_day),
                    units,
                }],
            }],
        }
    }

    fn open_store<'a>(
        catalog: &Catalog,
        policies: &'a PolicyRegistry,
        demand: Vec<DemandRecord>,
        saved: Option<&InventorySnapshot>,
        rng: &mut StdRng,
    ) -> RetailStore<'a> {
        RetailStore::new(
            catalog,
            "1",
            StoreParams::default(),
            demand,
            OrderLedger::default(),
            saved,
            policies,
            Box::new(BackorderPolicy::new()),
            rng,
        )
        .unwrap()
    }

    #[test]
    fn stock_runs_out_then_backorders_accumulate() {
        let mut catalog = single_product_catalog();
        // Minimum order above any demand the test can produce
        catalog.stores[0].product_supplier[0].products[0].min_order_quantity = 10_000;
        let policies = PolicyRegistry::default();
        let mut rng = StdRng::seed_from_u64(11);
        let saved = snapshot(20, 30);
        let mut store = open_store(
            &catalog,
            &policies,
            demand_rows(&[1, 2], 10.0, 0.0),
            Some(&saved),
            &mut rng,
        );

        let mut sold = 0;
        let mut unmet = 0;
        for day in store.pending_days(midnight(2017, 5, 3)) {
            let report = store.simulate_day(day, &mut rng).unwrap();
            sold += report.sales_rows.iter().filter(|r| !r.spoilage).count() as u32;
            unmet += report.stockouts.values().sum::<u32>();
            assert!(report.new_orders.is_empty());
        }

        assert!(sold <= 20);
        assert_eq!(store.backorders("1_1"), unmet);
        if unmet > 0 {
            assert_eq!(sold, 20);
        }
        let left = store.inventory("1_1").unwrap().units_on_hand();
        assert_eq!(left, 20 - sold);
        if left == 0 {
            let mut empty = store.inventory("1_1").unwrap().clone();
            assert_eq!(empty.remove_unit(midnight(2017, 5, 3), true), UnitOutcome::NoStock);
        }
    }

    #[test]
    fn units_are_conserved() {
        let catalog = single_product_catalog();
        let policies = PolicyRegistry::default();
        let mut rng = StdRng::seed_from_u64(5);
        let days: Vec<u32> = (1..=8).collect();
        let saved = snapshot(40, 4);
        let mut store = open_store(
            &catalog,
            &policies,
            demand_rows(&days, 30.0, 2.0),
            Some(&saved),
            &mut rng,
        );
        let initial = store.inventory("1_1").unwrap().units_on_hand();
        assert_eq!(initial, 40);

        let mut arrivals = 0;
        let mut outflow = 0;
        for day in store.pending_days(midnight(2017, 5, 9)) {
            let report = store.simulate_day(day, &mut rng).unwrap();
            let summary = &report.inventory.products[0];
            arrivals += summary.arrivals;
            outflow += summary.sales + summary.losses + summary.spoilages;
        }
        let remaining = store.inventory("1_1").unwrap().units_on_hand();
        assert_eq!(initial + arrivals, remaining + outflow);
    }

    #[test]
    fn backorders_turn_into_orders_that_get_delivered() {
        let catalog = single_product_catalog(); // min 10, multiplier 5, lead time 2, daily shipments
        let policies = PolicyRegistry::default();
        let mut rng = StdRng::seed_from_u64(8);
        let days: Vec<u32> = (1..=6).collect();
        let mut store = open_store(
            &catalog,
            &policies,
            demand_rows(&days, 60.0, 0.0),
            Some(&snapshot(0, 30)),
            &mut rng,
        );

        let first = store.simulate_day(midnight(2017, 5, 1), &mut rng).unwrap();
        let unmet: u32 = first.stockouts.values().sum();
        assert!(unmet >= 10, "expected plenty of stockouts, got {unmet}");
        assert_eq!(first.new_orders.len(), 1);
        let order = &first.new_orders[0];
        assert_eq!(order.quantity % 5, 0);
        assert_eq!(store.backorders("1_1"), unmet - order.quantity);
        assert_eq!(order.eta, midnight(2017, 5, 3) + Duration::hours(7));
        assert_eq!(order.policy_name, "Sim");

        store.simulate_day(midnight(2017, 5, 2), &mut rng).unwrap();
        let third = store.simulate_day(midnight(2017, 5, 3), &mut rng).unwrap();
        let summary = &third.inventory.products[0];
        assert!(summary.arrivals >= order.quantity);
        assert!(store.orders().orders()[0].fulfilled);
    }

    #[test]
    fn residual_backorders_carry_over_with_the_order() {
        let catalog = single_product_catalog();
        let policies = PolicyRegistry::default();
        let mut rng = StdRng::seed_from_u64(5);
        let mut store = open_store(
            &catalog,
            &policies,
            demand_rows(&[1, 2], 0.0, 0.0),
            Some(&snapshot(500, 30)),
            &mut rng,
        );

        let opening = midnight(2017, 5, 1) + Duration::hours(7);
        let placed = store.place_orders(opening, &BTreeMap::from([("1_1".to_string(), 13)]));
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].quantity, 10);
        assert_eq!(store.backorders("1_1"), 3);

        // Three units stay below the minimum order, so the next day orders nothing
        let next = store.simulate_day(midnight(2017, 5, 2), &mut rng).unwrap();
        assert!(next.new_orders.is_empty());
        assert_eq!(store.backorders("1_1"), 3);
        let ledger = store.orders().orders();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].quantity, 10);
        assert!(!ledger[0].fulfilled);
    }

    #[test]
    fn inactive_policy_orders_are_not_delivered() {
        let catalog = single_product_catalog();
        let policies = PolicyRegistry::new(vec![]);
        let mut rng = StdRng::seed_from_u64(8);
        let mut ledger = OrderLedger::default();
        ledger.place(Order {
            policy_name: "Sim".to_string(),
            store_id: "1".to_string(),
            product_id: "1_1".to_string(),
            supplier_id: "1".to_string(),
            quantity: 50,
            order_timestamp: midnight(2017, 4, 29),
            eta: midnight(2017, 5, 1) + Duration::hours(7),
            confidence_interval: 0,
            fulfilled: false,
        });
        let mut store = RetailStore::new(
            &catalog,
            "1",
            StoreParams::default(),
            demand_rows(&[1], 10.0, 0.0),
            ledger,
            Some(&snapshot(0, 30)),
            &policies,
            Box::new(BackorderPolicy::new()),
            &mut rng,
        )
        .unwrap();

        let report = store.simulate_day(midnight(2017, 5, 1), &mut rng).unwrap();
        assert_eq!(report.inventory.products[0].arrivals, 0);
        assert!(!store.orders().orders()[0].fulfilled);
    }

    #[test]
    fn spoiled_lots_become_zero_price_rows() {
        let catalog = single_product_catalog();
        let policies = PolicyRegistry::default();
        let mut rng = StdRng::seed_from_u64(2);
        let mut store = open_store(
            &catalog,
            &policies,
            demand_rows(&[1], 0.0, 0.0),
            Some(&snapshot(7, 2)),
            &mut rng,
        );

        let report = store.simulate_day(midnight(2017, 5, 1), &mut rng).unwrap();
        assert!(report.sales_log.transactions.is_empty());
        assert_eq!(report.sales_rows.len(), 1);
        let row = &report.sales_rows[0];
        assert!(row.spoilage);
        assert_eq!((row.units, row.price), (7, 0.0));
        assert_eq!(report.spoilage.products[0].total_units(), 7);
        assert_eq!(report.written_at, midnight(2017, 5, 2));
    }

    #[test]
    fn receipts_cover_every_sale() {
        let catalog = single_product_catalog();
        let policies = PolicyRegistry::default();
        let mut rng = StdRng::seed_from_u64(21);
        let mut store = open_store(
            &catalog,
            &policies,
            demand_rows(&[1], 40.0, 0.0),
            Some(&snapshot(500, 30)),
            &mut rng,
        );

        let report = store.simulate_day(midnight(2017, 5, 1), &mut rng).unwrap();
        let sold = report.sales_rows.len();
        let lines: usize = report
            .sales_log
            .transactions
            .iter()
            .map(|r| r.products.len())
            .sum();
        assert!(sold > 0);
        assert_eq!(lines, sold);
        for receipt in &report.sales_log.transactions {
            assert!(!receipt.products.is_empty());
            assert!((receipt.total - (receipt.subtotal + receipt.tax)).abs() < 0.011);
            let opening = midnight(2017, 5, 1) + Duration::hours(7);
            assert!(receipt.transaction_date_time >= opening);
            assert!(receipt.transaction_date_time <= opening + Duration::hours(14));
        }
    }
}
