//! Pure, side-effect-free numeric calculators (C2).
//!
//! None of these return `Result`: degenerate inputs (empty/singleton series,
//! zero means) produce zero-valued results rather than errors.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Positive,
    Negative,
    Stable,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DeltaResult {
    pub absolute: Decimal,
    pub percentage: f64,
    pub direction: Direction,
    pub magnitude: Decimal,
}

/// Signed change from `previous` to `current`, with a zero-previous-safe
/// percentage (100% when moving away from zero, 0% when both are zero).
pub fn delta(current: Decimal, previous: Decimal) -> DeltaResult {
    let absolute = current - previous;
    let percentage = if previous == Decimal::ZERO {
        if current != Decimal::ZERO {
            100.0
        } else {
            0.0
        }
    } else {
        (absolute / previous * Decimal::from(100))
            .to_f64()
            .unwrap_or(0.0)
    };
    let direction = if absolute > Decimal::ZERO {
        Direction::Positive
    } else if absolute < Decimal::ZERO {
        Direction::Negative
    } else {
        Direction::Stable
    };
    DeltaResult {
        absolute,
        percentage,
        direction,
        magnitude: absolute.abs(),
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn stdev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Coefficient of variation (stdev/mean); 0 for `mean=0` or `n<2`.
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    if m == 0.0 {
        0.0
    } else {
        stdev(values) / m.abs()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct LinearRegression {
    pub slope: f64,
    pub intercept: f64,
    /// R² clipped to [0, 100], used as a confidence score.
    pub confidence: f64,
}

/// Least-squares fit over integer x = 0..n-1. Returns a zero-valued result for
/// fewer than 2 points.
pub fn linear_regression(values: &[f64]) -> LinearRegression {
    let n = values.len();
    if n < 2 {
        return LinearRegression::default();
    }
    let xs: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let x_mean = mean(&xs);
    let y_mean = mean(values);
    let mut num = 0.0;
    let mut den = 0.0;
    for (x, y) in xs.iter().zip(values.iter()) {
        num += (x - x_mean) * (y - y_mean);
        den += (x - x_mean).powi(2);
    }
    let slope = if den == 0.0 { 0.0 } else { num / den };
    let intercept = y_mean - slope * x_mean;

    let ss_tot: f64 = values.iter().map(|y| (y - y_mean).powi(2)).sum();
    let ss_res: f64 = xs
        .iter()
        .zip(values.iter())
        .map(|(x, y)| {
            let predicted = slope * x + intercept;
            (y - predicted).powi(2)
        })
        .sum();
    let r_squared = if ss_tot == 0.0 {
        1.0
    } else {
        (1.0 - ss_res / ss_tot).max(0.0)
    };

    LinearRegression {
        slope,
        intercept,
        confidence: (r_squared * 100.0).clamp(0.0, 100.0),
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct GrowthResult {
    pub average_rate: f64,
    pub annualized_rate: f64,
    pub volatility: f64,
    pub regression: LinearRegression,
}

/// Period-over-period growth rate over a monthly value series. Compound rate
/// is used when `compound` is true, else a simple arithmetic rate per period.
pub fn growth(monthly_values: &[f64], compound: bool) -> GrowthResult {
    if monthly_values.len() < 2 {
        return GrowthResult::default();
    }
    let mut rates = Vec::with_capacity(monthly_values.len() - 1);
    for window in monthly_values.windows(2) {
        let (prev, curr) = (window[0], window[1]);
        if prev == 0.0 {
            continue;
        }
        let rate = if compound {
            (curr / prev).ln()
        } else {
            (curr - prev) / prev
        };
        rates.push(rate);
    }
    let average_rate = mean(&rates);
    let annualized_rate = (1.0 + average_rate).powi(12) - 1.0;
    GrowthResult {
        average_rate,
        annualized_rate,
        volatility: stdev(&rates),
        regression: linear_regression(monthly_values),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterPattern {
    Single,
    FixedAmount,
    IncreasingTrend,
    DecreasingTrend,
    Periodic,
    Variable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    pub size: usize,
    pub total: Decimal,
    pub mean: f64,
    pub stdev: f64,
    pub coefficient_of_variation: f64,
    pub pattern: ClusterPattern,
    pub first_date: DateTime<Utc>,
    pub last_date: DateTime<Utc>,
    pub is_outlier: bool,
}

/// A dated amount, the minimal shape clustering needs from a transaction.
#[derive(Debug, Clone, Copy)]
pub struct DatedAmount {
    pub date: DateTime<Utc>,
    pub amount: Decimal,
}

const PERIODICITY_THRESHOLD: f64 = 0.2;

/// Greedy time-window grouping of dated amounts (assumed sorted by date
/// ascending) into clusters of at least `min_size` within `window_days` of
/// each other, then flags 2σ outlier clusters by total amount.
pub fn cluster(items: &[DatedAmount], window_days: i64, min_size: usize) -> Vec<Cluster> {
    if items.is_empty() {
        return Vec::new();
    }

    let mut groups: Vec<Vec<DatedAmount>> = Vec::new();
    let mut current: Vec<DatedAmount> = vec![items[0]];
    for item in &items[1..] {
        let last = current.last().expect("current group is never empty");
        if (item.date - last.date).num_days() <= window_days {
            current.push(*item);
        } else {
            groups.push(std::mem::take(&mut current));
            current.push(*item);
        }
    }
    groups.push(current);

    let mut clusters: Vec<Cluster> = groups
        .into_iter()
        .filter(|g| g.len() >= min_size)
        .map(|g| build_cluster(&g))
        .collect();

    let totals: Vec<f64> = clusters
        .iter()
        .filter_map(|c| c.total.to_f64())
        .collect();
    let totals_mean = mean(&totals);
    let totals_stdev = stdev(&totals);
    for c in &mut clusters {
        if totals_stdev > 0.0 {
            let z = (c.total.to_f64().unwrap_or(0.0) - totals_mean) / totals_stdev;
            c.is_outlier = z.abs() > 2.0;
        }
    }
    clusters
}

fn build_cluster(items: &[DatedAmount]) -> Cluster {
    let amounts: Vec<f64> = items.iter().filter_map(|i| i.amount.to_f64()).collect();
    let total: Decimal = items.iter().map(|i| i.amount).sum();
    let m = mean(&amounts);
    let sd = stdev(&amounts);
    let cv = if m == 0.0 { 0.0 } else { sd / m.abs() };

    let pattern = if items.len() < 2 {
        ClusterPattern::Single
    } else if cv < 0.05 {
        ClusterPattern::FixedAmount
    } else if is_periodic(items) {
        ClusterPattern::Periodic
    } else {
        let regression = linear_regression(&amounts);
        if regression.slope > 0.0 && regression.confidence > 50.0 {
            ClusterPattern::IncreasingTrend
        } else if regression.slope < 0.0 && regression.confidence > 50.0 {
            ClusterPattern::DecreasingTrend
        } else {
            ClusterPattern::Variable
        }
    };

    Cluster {
        size: items.len(),
        total,
        mean: m,
        stdev: sd,
        coefficient_of_variation: cv,
        pattern,
        first_date: items.first().expect("non-empty cluster").date,
        last_date: items.last().expect("non-empty cluster").date,
        is_outlier: false,
    }
}

fn is_periodic(items: &[DatedAmount]) -> bool {
    if items.len() < 3 {
        return false;
    }
    let intervals: Vec<f64> = items
        .windows(2)
        .map(|w| (w[1].date - w[0].date).num_days() as f64)
        .collect();
    let m = mean(&intervals);
    if m == 0.0 {
        return false;
    }
    (stdev(&intervals) / m) < PERIODICITY_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn delta_zero_previous_reports_full_percentage_when_current_nonzero() {
        let result = delta(dec!(50), dec!(0));
        assert_eq!(result.percentage, 100.0);
        assert_eq!(result.direction, Direction::Positive);
    }

    #[test]
    fn delta_zero_previous_and_current_is_stable() {
        let result = delta(dec!(0), dec!(0));
        assert_eq!(result.percentage, 0.0);
        assert_eq!(result.direction, Direction::Stable);
    }

    #[test]
    fn coefficient_of_variation_zero_for_degenerate_input() {
        assert_eq!(coefficient_of_variation(&[]), 0.0);
        assert_eq!(coefficient_of_variation(&[5.0]), 0.0);
        assert_eq!(coefficient_of_variation(&[0.0, 0.0, 0.0]), 0.0);
    }

    #[test]
    fn linear_regression_detects_upward_trend() {
        let result = linear_regression(&[100.0, 110.0, 120.0, 130.0]);
        assert!(result.slope > 0.0);
        assert!(result.confidence > 90.0);
    }

    #[test]
    fn growth_reports_zero_for_short_series() {
        let result = growth(&[100.0], false);
        assert_eq!(result.average_rate, 0.0);
    }

    #[test]
    fn clustering_groups_by_time_window_and_flags_outliers() {
        let base = Utc::now();
        let items: Vec<DatedAmount> = (0..3)
            .map(|i| DatedAmount {
                date: base + chrono::Duration::days(i),
                amount: dec!(50),
            })
            .chain((0..3).map(|i| DatedAmount {
                date: base + chrono::Duration::days(60 + i),
                amount: dec!(5000),
            }))
            .collect();
        let clusters = cluster(&items, 7, 3);
        assert_eq!(clusters.len(), 2);
        assert!(clusters.iter().any(|c| c.is_outlier));
    }

    #[test]
    fn fixed_amount_cluster_detected_for_low_variance() {
        let base = Utc::now();
        let items: Vec<DatedAmount> = (0..4)
            .map(|i| DatedAmount {
                date: base + chrono::Duration::days(i * 2),
                amount: dec!(15.99),
            })
            .collect();
        let clusters = cluster(&items, 7, 3);
        assert_eq!(clusters[0].pattern, ClusterPattern::FixedAmount);
    }
}
