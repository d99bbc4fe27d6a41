// src/model/inventory.rs

use crate::io::timestamp;
use crate::model::catalog::ProductId;
use chrono::{Duration, NaiveDateTime};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Units sharing one expiry date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lot {
    pub expiry: NaiveDateTime,
    pub units: u32,
}

/// A lot as it appears in snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LotRecord {
    #[serde(with = "timestamp")]
    pub expiry_date_time: NaiveDateTime,
    pub units: u32,
}

impl From<Lot> for LotRecord {
    fn from(lot: Lot) -> Self {
        Self {
            expiry_date_time: lot.expiry,
            units: lot.units,
        }
    }
}

/// One sold unit, before it is grouped into a receipt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SaleRecord {
    #[serde(rename = "ProductID")]
    pub product_id: ProductId,
    #[serde(with = "timestamp")]
    pub transaction_date_time: NaiveDateTime,
    pub units: u32,
    pub price: f64,
}

/// Result of trying to take one unit off the shelf.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitOutcome {
    Sold(SaleRecord),
    Lost,
    /// Nothing on hand. For a sale this is unmet demand.
    NoStock,
}

/// Per-product state written at the end of every day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InventorySummary {
    #[serde(rename = "ProductID")]
    pub product_id: ProductId,
    pub arrivals: u32,
    pub sales: u32,
    pub losses: u32,
    pub spoilages: u32,
    pub current_inventory: Vec<LotRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SpoilageSummary {
    #[serde(rename = "ProductID")]
    pub product_id: ProductId,
    pub current_spoilages: Vec<LotRecord>,
}

impl SpoilageSummary {
    pub fn total_units(&self) -> u32 {
        self.current_spoilages.iter().map(|l| l.units).sum()
    }
}

/// Ordering limits used to size a cold-start delivery.
#[derive(Debug, Clone, Copy)]
pub struct OrderLimits {
    pub min_order_quantity: u32,
    pub max_order_quantity: u32,
    pub quantity_multiplier: u32,
}

const COLD_START_CAP: u32 = 10_000;

impl OrderLimits {
    /// Draws a delivery between the order limits, rounded down to the multiplier
    /// but never below the minimum.
    pub fn draw_initial_units<R: Rng>(&self, rng: &mut R) -> u32 {
        let min_order = self.min_order_quantity.max(1);
        let max_order = self.max_order_quantity.min(COLD_START_CAP).max(min_order);
        let units = rng.gen_range(min_order..=max_order);
        if self.quantity_multiplier > 0 {
            min_order.max(units - units % self.quantity_multiplier)
        } else {
            units
        }
    }
}

/// Lot-tracked stock of one product in one store.
///
/// Lots are kept ordered by expiry and consumed earliest-expiry first. The
/// ledger clock only moves in [`Inventory::end_of_day`].
#[derive(Debug, Clone)]
pub struct Inventory {
    product_id: ProductId,
    price: f64,
    lots: VecDeque<Lot>,
    clock: NaiveDateTime,

    // Daily tallies, reset at end of day
    arrivals: u32,
    sales: u32,
    losses: u32,
}

impl Inventory {
    pub fn new(product_id: impl Into<ProductId>, price: f64, clock: NaiveDateTime) -> Self {
        Self {
            product_id: product_id.into(),
            price,
            lots: VecDeque::new(),
            clock,
            arrivals: 0,
            sales: 0,
            losses: 0,
        }
    }

    /// Rebuilds the ledger from the lots of a persisted snapshot.
    pub fn hydrate(
        product_id: impl Into<ProductId>,
        price: f64,
        clock: NaiveDateTime,
        lots: &[LotRecord],
    ) -> Self {
        let mut inventory = Self::new(product_id, price, clock);
        for lot in lots {
            inventory.insert_lot(Lot {
                expiry: lot.expiry_date_time,
                units: lot.units,
            });
        }
        inventory
    }

    /// Starts a ledger with one randomly sized delivery that expires after `shelf_life`.
    pub fn cold_start<R: Rng>(
        product_id: impl Into<ProductId>,
        price: f64,
        clock: NaiveDateTime,
        shelf_life: Duration,
        limits: OrderLimits,
        rng: &mut R,
    ) -> Self {
        let mut inventory = Self::new(product_id, price, clock);
        let units = limits.draw_initial_units(rng);
        inventory.add_inventory(clock + shelf_life, units);
        inventory
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn clock(&self) -> NaiveDateTime {
        self.clock
    }

    pub fn update_price(&mut self, price: f64) {
        self.price = price;
    }

    pub fn lots(&self) -> impl Iterator<Item = &Lot> {
        self.lots.iter()
    }

    pub fn units_on_hand(&self) -> u32 {
        self.lots.iter().map(|l| l.units).sum()
    }

    /// Takes one unit from the earliest-expiring lot.
    pub fn remove_unit(&mut self, time: NaiveDateTime, is_sale: bool) -> UnitOutcome {
        let Some(front) = self.lots.front_mut() else {
            return UnitOutcome::NoStock;
        };

        front.units -= 1;
        if front.units == 0 {
            self.lots.pop_front();
        }

        if is_sale {
            self.sales += 1;
            UnitOutcome::Sold(SaleRecord {
                product_id: self.product_id.clone(),
                transaction_date_time: time,
                units: 1,
                price: round_cents(self.price),
            })
        } else {
            self.losses += 1;
            UnitOutcome::Lost
        }
    }

    /// Records a delivery as a new lot. Lots with the same expiry are kept apart.
    pub fn add_inventory(&mut self, expiry: NaiveDateTime, units: u32) {
        if units == 0 {
            return;
        }
        self.arrivals += units;
        self.insert_lot(Lot { expiry, units });
    }

    fn insert_lot(&mut self, lot: Lot) {
        if lot.units == 0 {
            return;
        }
        let at = self.lots.partition_point(|l| l.expiry <= lot.expiry);
        self.lots.insert(at, lot);
    }

    /// Advances the clock one day, sweeps expired lots and resets the daily tallies.
    pub fn end_of_day(&mut self) -> (InventorySummary, SpoilageSummary) {
        self.clock += Duration::days(1);

        let expired = self.lots.partition_point(|l| l.expiry <= self.clock);
        let spoiled: Vec<LotRecord> = self.lots.drain(..expired).map(LotRecord::from).collect();
        let spoilages = spoiled.iter().map(|l| l.units).sum();

        let inventory = InventorySummary {
            product_id: self.product_id.clone(),
            arrivals: self.arrivals,
            sales: self.sales,
            losses: self.losses,
            spoilages,
            current_inventory: self.lots.iter().copied().map(LotRecord::from).collect(),
        };
        let spoilage = SpoilageSummary {
            product_id: self.product_id.clone(),
            current_spoilages: spoiled,
        };

        self.arrivals = 0;
        self.sales = 0;
        self.losses = 0;

        (inventory, spoilage)
    }
}

pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
