use chrono::{Duration, NaiveDate, NaiveDateTime};
use retail_inventory_sim::evaluation;
use retail_inventory_sim::io::lake::DataLake;
use retail_inventory_sim::model::order::Order;
use retail_inventory_sim::simulation::config::SimulationConfig;
use retail_inventory_sim::simulation::engine::Simulator;
use std::path::Path;

fn midnight(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn small_config(seed: u64) -> SimulationConfig {
    let mut config = SimulationConfig {
        seed,
        ..SimulationConfig::default()
    };
    config.catalog.stores = 2;
    config.catalog.brands = 4;
    config.catalog.departments = 2;
    config.catalog.suppliers = 2;
    config.catalog.storage_spaces = 2;
    config
}

fn simulate(root: &Path, seed: u64, today: NaiveDateTime) {
    let mut sim = Simulator::new(small_config(seed), DataLake::new(root));
    sim.run(today).unwrap();
}

#[test]
fn first_run_generates_catalog_and_simulates_one_day() {
    let dir = tempfile::tempdir().unwrap();
    let lake = DataLake::new(dir.path());
    let mut sim = Simulator::new(small_config(1), lake.clone());

    let summary = sim.run(midnight(2017, 5, 2)).unwrap();
    assert_eq!(summary.stores, 2);
    assert_eq!(summary.days, 2);

    let catalog = lake.load_catalog().unwrap().unwrap();
    assert_eq!(catalog.initial_date, midnight(2017, 5, 1));
    assert_eq!(catalog.last_date, midnight(2017, 5, 2));
    assert_eq!(catalog.stores.len(), 2);

    for store in &catalog.stores {
        let snapshot = lake
            .load_inventory_snapshot(&store.store_id, midnight(2017, 5, 2))
            .unwrap()
            .unwrap();
        assert_eq!(snapshot.products.len(), 4);
    }
    assert!(dir.path().join("publicparameters/stores.csv").exists());
    // Policy configuration is seeded next to the generated catalog
    assert!(dir.path().join("configuration/policies.json").exists());
    assert!(lake.load_policies().unwrap().is_active("Sim"));
}

#[test]
fn window_rolls_and_carried_demand_does_not_drift() {
    let dir = tempfile::tempdir().unwrap();
    let lake = DataLake::new(dir.path());
    simulate(dir.path(), 3, midnight(2017, 5, 2));
    // A different seed on the second run must not change known demand
    simulate(dir.path(), 4, midnight(2017, 5, 3));

    let catalog = lake.load_catalog().unwrap().unwrap();
    assert_eq!(catalog.initial_date, midnight(2017, 5, 2));
    assert_eq!(catalog.last_date, midnight(2017, 5, 3));

    let store = &catalog.stores[0];
    let product_id = &store.departments[0].brands[0].products[0].product_id;
    let first = lake
        .load_forecast(&store.store_id, product_id, midnight(2017, 5, 2))
        .unwrap()
        .unwrap();
    let second = lake
        .load_forecast(&store.store_id, product_id, midnight(2017, 5, 3))
        .unwrap()
        .unwrap();

    assert_eq!(first[0].date_time, midnight(2017, 5, 2));
    assert_eq!(second[0].date_time, midnight(2017, 5, 3));
    for row in &second {
        if let Some(old) = first.iter().find(|r| r.date_time == row.date_time) {
            assert_eq!(old.demand, row.demand, "demand drifted on {}", row.date_time);
        }
    }
    assert!(second.iter().all(|r| r.variance == -1.0 && r.probability == 1.0));

    // Prices of the first simulated day are reused, not redrawn
    let price = lake
        .load_price_change(&store.store_id, midnight(2017, 5, 1))
        .unwrap()
        .unwrap();
    assert!(!price.price_updates.is_empty());
}

#[test]
fn partial_orders_mirror_placed_orders() {
    let dir = tempfile::tempdir().unwrap();
    let lake = DataLake::new(dir.path());
    for day in 2..=8 {
        simulate(dir.path(), 7, midnight(2017, 5, day));
    }

    let catalog = lake.load_catalog().unwrap().unwrap();
    for store in &catalog.stores {
        let orders = lake.load_orders(&store.store_id).unwrap();
        let partial = lake.load_partial_orders("Sim", &store.store_id).unwrap();
        assert_eq!(orders.len(), partial.len());
        for order in &orders {
            assert_eq!(order.policy_name, "Sim");
            assert!(order.quantity > 0);
            assert!(order.eta > order.order_timestamp);
        }
    }
}

#[test]
fn evaluation_scores_sales_against_partial_orders() {
    let dir = tempfile::tempdir().unwrap();
    let lake = DataLake::new(dir.path());
    simulate(dir.path(), 11, midnight(2017, 5, 2));

    let catalog = lake.load_catalog().unwrap().unwrap();
    let eta = midnight(2017, 4, 28) + Duration::hours(7);
    for store in &catalog.stores {
        let orders: Vec<Order> = store
            .departments
            .iter()
            .flat_map(|d| d.brands.iter())
            .flat_map(|b| b.products.iter())
            .map(|p| Order {
                policy_name: "Sim".to_string(),
                store_id: store.store_id.clone(),
                product_id: p.product_id.clone(),
                supplier_id: "1".to_string(),
                quantity: 1_000_000,
                order_timestamp: eta - Duration::days(1),
                eta,
                confidence_interval: 0,
                fulfilled: true,
            })
            .collect();
        lake.save_partial_orders("Sim", &store.store_id, &orders).unwrap();
    }

    // Sales of 05-01 are filed under the following midnight
    let metrics = evaluation::evaluate_day(&lake, midnight(2017, 5, 2)).unwrap();
    assert!(!metrics.is_empty());
    for m in &metrics {
        assert_eq!(m.policy_name, "Sim");
        assert_eq!(m.metric_date_time, midnight(2017, 5, 1));
        assert!(m.metric > 0.0);
        assert!(m.total_revenue >= m.metric);
    }
    assert_eq!(lake.load_metrics().unwrap().len(), metrics.len());

    // Every product still holds most of its million units, so nothing is short
    let positions = lake.load_inventory_positions().unwrap();
    assert_eq!(positions.len(), metrics.len() * 4);
    assert!(positions
        .iter()
        .all(|p| p.inventory > 0 && p.date_time == midnight(2017, 5, 2)));
    for m in &metrics {
        assert_eq!(m.num_stockout, 0);
        assert!(m.turnover_ratio > 0.0);
    }

    let summary = lake.load_summary_metrics().unwrap();
    assert_eq!(summary.len(), 3 * metrics.len());
    for period in ["(I) LastWeek", "(II) LastMonth", "(III) LastQuarter"] {
        let rows: Vec<_> = summary.iter().filter(|r| r.eval_period == period).collect();
        assert_eq!(rows.len(), metrics.len());
        assert!(rows.iter().all(|r| r.metric_increase == 0.0));
    }

    let consumed = lake
        .load_partial_orders("Sim", &metrics[0].store_id)
        .unwrap()
        .iter()
        .any(|o| o.quantity < 1_000_000);
    assert!(consumed);
}

#[test]
fn evaluation_without_sales_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let lake = DataLake::new(dir.path());
    assert!(evaluation::evaluate_day(&lake, midnight(2017, 5, 2))
        .unwrap()
        .is_empty());
    assert!(!dir.path().join("orders/metric.csv").exists());
    assert!(!dir.path().join("orders/summary_metric.csv").exists());
}
