// src/evaluation/summary.rs

//! Rolling-window roll-ups of the daily policy metrics.

use crate::evaluation::metrics::{relative_change, PolicyMetric};
use crate::io::timestamp;
use crate::model::catalog::StoreId;
use crate::strategy::implementations::BASELINE_POLICY;
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Look-back windows of the summary, in days, with their labels.
pub const EVAL_PERIODS: [(i64, &str); 3] = [
    (7, "(I) LastWeek"),
    (30, "(II) LastMonth"),
    (91, "(III) LastQuarter"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetric {
    #[serde(rename = "MetricDateTime", with = "timestamp")]
    pub metric_date_time: NaiveDateTime,
    #[serde(rename = "EvalPeriod")]
    pub eval_period: String,
    #[serde(rename = "PolicyID")]
    pub policy_name: String,
    #[serde(rename = "StoreID")]
    pub store_id: StoreId,
    #[serde(rename = "Metric")]
    pub metric: f64,
    #[serde(rename = "TotalRevenue")]
    pub total_revenue: f64,
    #[serde(rename = "NumStockout")]
    pub num_stockout: u32,
    #[serde(rename = "TurnoverRatio")]
    pub turnover_ratio: f64,
    #[serde(rename = "MetricIncrease")]
    pub metric_increase: f64,
    #[serde(rename = "TotalRevenueIncrease")]
    pub total_revenue_increase: f64,
    #[serde(rename = "NumStockoutDecrease")]
    pub num_stockout_decrease: f64,
    #[serde(rename = "TurnoverRatioIncrease")]
    pub turnover_ratio_increase: f64,
}

#[derive(Default)]
struct Accumulator {
    metric: f64,
    turnover_ratio: f64,
    total_revenue: f64,
    num_stockout: u32,
    days: usize,
}

/// One window: Metric and TurnoverRatio averaged, TotalRevenue and
/// NumStockout summed, per (policy, store).
fn summarize_window(
    metrics: &[PolicyMetric],
    today: NaiveDateTime,
    days: i64,
    label: &str,
) -> Vec<SummaryMetric> {
    let from = today - Duration::days(days);
    let mut groups: BTreeMap<(&str, &str), Accumulator> = BTreeMap::new();
    for m in metrics
        .iter()
        .filter(|m| m.metric_date_time >= from && m.metric_date_time <= today)
    {
        let acc = groups
            .entry((m.policy_name.as_str(), m.store_id.as_str()))
            .or_default();
        acc.metric += m.metric;
        acc.turnover_ratio += m.turnover_ratio;
        acc.total_revenue += m.total_revenue;
        acc.num_stockout += m.num_stockout;
        acc.days += 1;
    }

    let mut rows: Vec<SummaryMetric> = groups
        .into_iter()
        .map(|((policy, store), acc)| SummaryMetric {
            metric_date_time: today,
            eval_period: label.to_string(),
            policy_name: policy.to_string(),
            store_id: store.to_string(),
            metric: acc.metric / acc.days as f64,
            total_revenue: acc.total_revenue,
            num_stockout: acc.num_stockout,
            turnover_ratio: acc.turnover_ratio / acc.days as f64,
            metric_increase: 0.0,
            total_revenue_increase: 0.0,
            num_stockout_decrease: 0.0,
            turnover_ratio_increase: 0.0,
        })
        .collect();

    // Changes against the baseline of the same store; zero without one
    let baseline: BTreeMap<StoreId, SummaryMetric> = rows
        .iter()
        .filter(|r| r.policy_name == BASELINE_POLICY)
        .map(|r| (r.store_id.clone(), r.clone()))
        .collect();
    for row in &mut rows {
        let Some(base) = baseline.get(&row.store_id) else {
            continue;
        };
        row.metric_increase = relative_change(row.metric, base.metric);
        row.total_revenue_increase = relative_change(row.total_revenue, base.total_revenue);
        row.num_stockout_decrease = stockout_decrease(row.num_stockout, base.num_stockout);
        row.turnover_ratio_increase = relative_change(row.turnover_ratio, base.turnover_ratio);
    }
    rows
}

/// Percent fewer stockouts than the baseline. A zero baseline reads like
/// [`relative_change`] does.
fn stockout_decrease(value: u32, baseline: u32) -> f64 {
    let change = relative_change(f64::from(value), f64::from(baseline));
    if baseline == 0 {
        change
    } else {
        -change
    }
}

/// Summary rows for every window ending at `today`.
pub fn summarize(metrics: &[PolicyMetric], today: NaiveDateTime) -> Vec<SummaryMetric> {
    EVAL_PERIODS
        .iter()
        .flat_map(|&(days, label)| summarize_window(metrics, today, days, label))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::catalog::fixtures::midnight;

    fn metric(policy: &str, day: u32, value: f64, stockouts: u32) -> PolicyMetric {
        PolicyMetric {
            policy_name: policy.to_string(),
            metric_date_time: midnight(2017, 5, day),
            metric: value,
            total_revenue: value * 10.0,
            num_stockout: stockouts,
            turnover_ratio: value / 2.0,
            store_id: "1".to_string(),
        }
    }

    #[test]
    fn windows_average_ratios_and_sum_totals() {
        let today = midnight(2017, 5, 20);
        let rows = vec![
            metric("Sim", 1, 2.0, 1),
            metric("Sim", 18, 4.0, 2),
            metric("Sim", 19, 6.0, 3),
        ];
        let summary = summarize(&rows, today);
        assert_eq!(summary.len(), 3);

        let week = &summary[0];
        assert_eq!(week.eval_period, "(I) LastWeek");
        assert_eq!(week.metric_date_time, today);
        assert!((week.metric - 5.0).abs() < 1e-9);
        assert!((week.turnover_ratio - 2.5).abs() < 1e-9);
        assert!((week.total_revenue - 100.0).abs() < 1e-9);
        assert_eq!(week.num_stockout, 5);

        let month = &summary[1];
        assert!((month.metric - 4.0).abs() < 1e-9);
        assert_eq!(month.num_stockout, 6);
    }

    #[test]
    fn changes_are_relative_to_baseline_of_the_store() {
        let today = midnight(2017, 5, 10);
        let rows = vec![
            metric("Sim", 9, 10.0, 4),
            metric("s_Q", 9, 15.0, 1),
        ];
        let week: Vec<SummaryMetric> = summarize(&rows, today)
            .into_iter()
            .filter(|r| r.eval_period == "(I) LastWeek")
            .collect();
        assert_eq!(week.len(), 2);

        let sim = week.iter().find(|r| r.policy_name == "Sim").unwrap();
        assert_eq!(sim.metric_increase, 0.0);

        let policy = week.iter().find(|r| r.policy_name == "s_Q").unwrap();
        assert!((policy.metric_increase - 50.0).abs() < 1e-9);
        assert!((policy.total_revenue_increase - 50.0).abs() < 1e-9);
        // Fewer stockouts count as a positive decrease
        assert!((policy.num_stockout_decrease - 75.0).abs() < 1e-9);
        assert!((policy.turnover_ratio_increase - 50.0).abs() < 1e-9);
    }

    #[test]
    fn stockouts_against_a_clean_baseline() {
        assert_eq!(stockout_decrease(3, 0), 100.0);
        assert_eq!(stockout_decrease(0, 0), 0.0);
        assert!((stockout_decrease(6, 4) + 50.0).abs() < 1e-9);
    }

    #[test]
    fn future_and_stale_rows_are_ignored() {
        let today = midnight(2017, 5, 10);
        let rows = vec![metric("Sim", 11, 1.0, 0), metric("Sim", 2, 1.0, 0)];
        let summary = summarize(&rows, today);
        // Only the month and quarter windows reach back to the 2nd
        assert_eq!(summary.len(), 2);
        assert!(summary.iter().all(|r| r.eval_period != "(I) LastWeek"));
    }
}
