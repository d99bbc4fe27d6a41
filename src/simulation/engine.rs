// src/simulation/engine.rs

use crate::error::Result;
use crate::io::lake::DataLake;
use crate::model::catalog::{Catalog, ProductFeatures};
use crate::model::order::OrderLedger;
use crate::model::store::{DayReport, RetailStore};
use crate::simulation::config::SimulationConfig;
use crate::simulation::generator::CatalogGenerator;
use crate::simulation::pricing::{self, CellKey, DemandRecord};
use crate::strategy::implementations::BackorderPolicy;
use crate::strategy::registry::PolicyRegistry;
use chrono::{Duration, NaiveDateTime};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Totals of one `run`, mostly for logging.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub stores: usize,
    pub days: usize,
    pub units_sold: u32,
    pub stockouts: u32,
    pub orders_placed: usize,
}

/// Drives a whole simulation cycle against a data lake.
///
/// One call to [`Simulator::run`] rolls the catalog window forward to
/// `today`, refreshes prices and demand, then simulates every store for the
/// days not yet simulated.
pub struct Simulator {
    config: SimulationConfig,
    lake: DataLake,
    rng: StdRng,
}

impl Simulator {
    pub fn new(config: SimulationConfig, lake: DataLake) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self { config, lake, rng }
    }

    pub fn lake(&self) -> &DataLake {
        &self.lake
    }

    pub fn run(&mut self, today: NaiveDateTime) -> Result<RunSummary> {
        let catalog = self.prepare_catalog(today)?;
        let policies = self.lake.load_policies()?;
        let features = catalog.product_features()?;

        let demand = self.prepare_demand(&catalog, &features, today)?;

        let mut summary = RunSummary::default();
        for store_id in catalog.store_ids() {
            let rows: Vec<DemandRecord> = demand
                .iter()
                .filter(|d| d.store_id == store_id)
                .cloned()
                .collect();
            if rows.is_empty() {
                warn!(store_id = %store_id, "no demand for store, skipping");
                continue;
            }
            self.run_store(&catalog, &store_id, rows, &policies, today, &mut summary)?;
            summary.stores += 1;
        }

        info!(
            today = %today,
            stores = summary.stores,
            days = summary.days,
            units_sold = summary.units_sold,
            stockouts = summary.stockouts,
            orders = summary.orders_placed,
            "simulation cycle finished"
        );
        Ok(summary)
    }

    /// Loads the catalog and moves its window to end at `today`, or
    /// generates a new one covering the day before `today`.
    fn prepare_catalog(&mut self, today: NaiveDateTime) -> Result<Catalog> {
        let catalog = match self.lake.load_catalog()? {
            Some(mut catalog) => {
                catalog.initial_date = catalog.last_date;
                catalog.last_date = today;
                debug!(initial = %catalog.initial_date, last = %catalog.last_date, "rolled catalog window");
                catalog
            }
            None => {
                // Seed the policy file so the configured policies are on disk with the catalog
                self.lake.save_policies(&self.lake.load_policies()?)?;
                CatalogGenerator::new(&self.config.catalog, &mut self.rng).generate(
                    &self.config,
                    today - Duration::days(1),
                    today,
                )
            }
        };
        self.lake.save_catalog(&catalog)?;
        Ok(catalog)
    }

    /// Prices over the window plus the forecast horizon, the demand they
    /// induce, and the forecast files keyed by `today`.
    fn prepare_demand(
        &mut self,
        catalog: &Catalog,
        features: &[ProductFeatures],
        today: NaiveDateTime,
    ) -> Result<Vec<DemandRecord>> {
        let dates = pricing::price_dates(
            catalog.initial_date,
            catalog.last_date,
            catalog.weeks_to_forecast,
        );

        let mut known: HashMap<CellKey, f64> = HashMap::new();
        for store_id in catalog.store_ids() {
            for &date in &dates {
                let Some(change) = self.lake.load_price_change(&store_id, date)? else {
                    continue;
                };
                for update in change.price_updates {
                    known.insert((store_id.clone(), update.product_id, date), update.price);
                }
            }
        }

        let prices = pricing::build_prices(features, &dates, &known, &mut self.rng)?;
        for change in pricing::price_changes(&prices, catalog.last_date) {
            self.lake.save_price_change(&change)?;
        }

        let mut demand = pricing::derive_demand(features, &prices);

        let yesterday = today - Duration::days(1);
        let mut previous: HashMap<CellKey, f64> = HashMap::new();
        for f in features {
            let Some(rows) = self.lake.load_forecast(&f.store_id, &f.product_id, yesterday)? else {
                continue;
            };
            for row in rows {
                previous.insert((row.store_id, row.product_id, row.date_time), row.demand);
            }
        }
        pricing::merge_previous(&mut demand, &previous);

        for ((store_id, product_id), rows) in pricing::forecast_rows(&demand, today) {
            self.lake.save_forecast(&store_id, &product_id, today, &rows)?;
        }

        debug!(
            dates = dates.len(),
            cells = demand.len(),
            carried_over = previous.len(),
            "prepared demand"
        );
        Ok(demand)
    }

    fn run_store(
        &mut self,
        catalog: &Catalog,
        store_id: &str,
        demand: Vec<DemandRecord>,
        policies: &PolicyRegistry,
        today: NaiveDateTime,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let orders = OrderLedger::from_persisted(self.lake.load_orders(store_id)?);
        if orders.is_empty() {
            debug!(store_id = %store_id, "no order history");
        } else {
            debug!(store_id = %store_id, orders = orders.len(), "loaded order history");
        }
        let first_day = demand.iter().map(|d| d.date_time).min();
        let snapshot = match first_day {
            Some(day) => self.lake.load_inventory_snapshot(store_id, day)?,
            None => None,
        };
        if snapshot.is_none() {
            debug!(store_id = %store_id, "no saved inventory, cold start");
        }

        let mut store = RetailStore::new(
            catalog,
            store_id,
            self.config.store.clone(),
            demand,
            orders,
            snapshot.as_ref(),
            policies,
            Box::new(BackorderPolicy::new()),
            &mut self.rng,
        )?;

        let lake = &self.lake;
        store.run(today, &mut self.rng, |store, report| {
            summary.days += 1;
            summary.units_sold += report
                .sales_rows
                .iter()
                .filter(|r| !r.spoilage)
                .map(|r| r.units)
                .sum::<u32>();
            summary.stockouts += report.stockouts.values().sum::<u32>();
            summary.orders_placed += report.new_orders.len();
            persist_day(lake, policies, store, &report)
        })
    }
}

/// Writes a simulated day's snapshots and the store's order files.
fn persist_day(
    lake: &DataLake,
    policies: &PolicyRegistry,
    store: &mut RetailStore<'_>,
    report: &DayReport,
) -> Result<()> {
    lake.save_inventory_snapshot(&report.inventory)?;
    lake.save_sales(&report.sales_log, &report.sales_rows)?;

    let store_id = store.store_id().to_string();
    let ledger = store.orders_mut();
    for policy in ledger.policy_names() {
        let directory = policies.directory(&policy);
        let history: Vec<_> = ledger.for_policy(&policy).cloned().collect();
        lake.save_orders(directory, &store_id, &history)?;

        if lake.has_partial_orders(directory, &store_id) {
            let fresh: Vec<_> = ledger
                .unpersisted()
                .iter()
                .filter(|o| o.policy_name == policy)
                .cloned()
                .collect();
            lake.append_partial_orders(directory, &store_id, &fresh)?;
        } else {
            lake.save_partial_orders(directory, &store_id, &history)?;
        }
    }
    ledger.mark_persisted();

    debug!(
        store_id = %store_id,
        day = %report.day,
        new_orders = report.new_orders.len(),
        "persisted day"
    );
    Ok(())
}
