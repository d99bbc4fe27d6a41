// src/strategy/implementations.rs

use crate::strategy::traits::{OrderContext, OrderPolicy};
use chrono::Datelike;

pub const BASELINE_POLICY: &str = "Sim";

// =========================================================================
// Backorder Policy (baseline simulation policy)
// =========================================================================

/// Reorders exactly what customers failed to buy.
///
/// An order goes out once the backorders reach both the supplier's minimum
/// order quantity and its quantity multiplier, and only on days the supplier
/// ships (`day ordinal % frequency == 0`). The size is capped at the maximum
/// order quantity and rounded down to the multiplier.
#[derive(Debug, Clone, Default)]
pub struct BackorderPolicy;

impl BackorderPolicy {
    pub fn new() -> Self {
        Self
    }
}

/// Proleptic Gregorian ordinal where 0001-01-01 is day 1.
fn day_ordinal(day: chrono::NaiveDate) -> i64 {
    i64::from(day.num_days_from_ce())
}

impl OrderPolicy for BackorderPolicy {
    fn name(&self) -> &str {
        BASELINE_POLICY
    }

    fn calculate_order(&mut self, context: &OrderContext<'_>) -> Option<u32> {
        let supplier = context.supplier;
        let backorders = context.backorders;

        // Wait until enough demand accumulated
        if supplier.min_order_quantity > backorders || supplier.quantity_multiplier > backorders {
            return None;
        }

        // Wait until the supplier accepts orders
        let frequency = i64::from(supplier.shipment_freq.0);
        if frequency > 0 && day_ordinal(context.day) % frequency != 0 {
            return None;
        }

        let mut size = backorders;
        if supplier.max_order_quantity > 0 {
            size = size.min(supplier.max_order_quantity);
        }
        if supplier.quantity_multiplier > 0 {
            size -= size % supplier.quantity_multiplier;
        }

        if size == 0 {
            None
        } else {
            Some(size)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::catalog::fixtures::supplier_link;
    use crate::model::catalog::Days;
    use chrono::NaiveDate;

    fn ship_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2017, 5, 1).unwrap()
    }

    #[test]
    fn rounds_down_to_multiplier() {
        let supplier = supplier_link("1_1"); // min 10, multiplier 5
        let mut policy = BackorderPolicy::new();
        let ctx = OrderContext {
            backorders: 13,
            supplier: &supplier,
            day: ship_day(),
        };
        assert_eq!(policy.calculate_order(&ctx), Some(10));
    }

    #[test]
    fn waits_below_minimum() {
        let supplier = supplier_link("1_1");
        let mut policy = BackorderPolicy::new();
        let ctx = OrderContext {
            backorders: 9,
            supplier: &supplier,
            day: ship_day(),
        };
        assert_eq!(policy.calculate_order(&ctx), None);
    }

    #[test]
    fn caps_at_maximum() {
        let mut supplier = supplier_link("1_1");
        supplier.max_order_quantity = 22;
        let mut policy = BackorderPolicy::new();
        let ctx = OrderContext {
            backorders: 100,
            supplier: &supplier,
            day: ship_day(),
        };
        assert_eq!(policy.calculate_order(&ctx), Some(20));
    }

    #[test]
    fn honours_shipment_frequency() {
        let mut supplier = supplier_link("1_1");
        supplier.shipment_freq = Days(3);
        let mut policy = BackorderPolicy::new();

        let mut accepted = 0;
        let start = ship_day();
        for offset in 0..9 {
            let day = start + chrono::Duration::days(offset);
            let ctx = OrderContext {
                backorders: 20,
                supplier: &supplier,
                day,
            };
            if let Some(size) = policy.calculate_order(&ctx) {
                assert_eq!(day_ordinal(day) % 3, 0);
                assert_eq!(size, 20);
                accepted += 1;
            }
        }
        assert_eq!(accepted, 3);
    }

    #[test]
    fn ordinal_matches_gregorian_day_one() {
        assert_eq!(day_ordinal(NaiveDate::from_ymd_opt(1, 1, 1).unwrap()), 1);
        assert_eq!(day_ordinal(NaiveDate::from_ymd_opt(1, 1, 2).unwrap()), 2);
    }
}
