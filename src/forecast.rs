// 📈 Sales Forecasting - Moving averages with a linear trend
//
// Daily forecast:
//   avg7  = mean of the last 7 daily revenue points
//   avg30 = mean of the last 30 daily revenue points
//   trend = (avg7 - avg30) / avg30
//   next day = avg7 * (1 + trend), with the same-weekday history attached
//
// Monthly projection: least-squares line through monthly revenue.

use crate::config::ForecastConfig;
use crate::period::days_before;
use crate::records::TransactionRecord;
use crate::stats::{finite_or_zero, linear_regression, mean};
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// FORECAST TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    fn from_points(points: usize, high: usize, medium: usize) -> Self {
        if points >= high {
            Confidence::High
        } else if points >= medium {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Upward,
    Downward,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRevenue {
    pub date: NaiveDate,
    pub revenue: f64,
    pub transactions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub weekday: Weekday,
    pub predicted_revenue: f64,
    /// Historical average revenue on this weekday
    pub weekday_average: f64,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekdayPattern {
    pub weekday: Weekday,
    pub average_revenue: f64,
    pub data_points: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastStatistics {
    pub short_average: f64,
    pub long_average: f64,
    /// (short - long) / long, as a fraction
    pub trend: f64,
    pub trend_percentage: f64,
    pub direction: TrendDirection,
    pub data_points: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesForecast {
    pub forecast: Vec<ForecastDay>,
    pub total_forecast: f64,
    pub statistics: ForecastStatistics,
    /// Weekdays ranked by historical average revenue, best first
    pub best_days: Vec<WeekdayPattern>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRevenue {
    /// First day of the month
    pub month: NaiveDate,
    pub revenue: f64,
    pub services: f64,
    pub products: f64,
    pub transactions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthForecast {
    pub month: NaiveDate,
    pub predicted_revenue: f64,
    pub confidence: Confidence,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyProjection {
    pub history: Vec<MonthlyRevenue>,
    pub forecast: Vec<MonthForecast>,
    pub slope: f64,
    pub intercept: f64,
    pub direction: TrendDirection,
    /// Change from the first to the last month in percent (0 with a zero first month)
    pub trend_percentage: f64,
}

// ============================================================================
// FORECASTER
// ============================================================================

pub struct Forecaster {
    config: ForecastConfig,
}

impl Forecaster {
    pub fn new(config: ForecastConfig) -> Self {
        Forecaster { config }
    }

    /// Forecast the next `horizon_days` after `as_of`
    pub fn forecast(&self, transactions: &[TransactionRecord], as_of: DateTime<Utc>) -> SalesForecast {
        let series = daily_revenue(
            transactions,
            days_before(as_of, self.config.lookback_days),
            as_of,
        );
        let revenues: Vec<f64> = series.iter().map(|d| d.revenue).collect();

        let short_average = moving_average(&revenues, self.config.short_window);
        let long_average = moving_average(&revenues, self.config.long_window);
        let trend = if long_average > 0.0 {
            finite_or_zero((short_average - long_average) / long_average)
        } else {
            0.0
        };
        let direction = if trend > self.config.stable_band {
            TrendDirection::Upward
        } else if trend < -self.config.stable_band {
            TrendDirection::Downward
        } else {
            TrendDirection::Stable
        };

        let patterns = weekday_patterns(&series, short_average);
        let confidence = Confidence::from_points(series.len(), 30, 14);
        let predicted = short_average * (1.0 + trend);

        let today = as_of.date_naive();
        let forecast: Vec<ForecastDay> = (1..=i64::from(self.config.horizon_days))
            .map_while(|offset| today.checked_add_signed(Duration::days(offset)))
            .map(|date| {
                let weekday = date.weekday();
                ForecastDay {
                    date,
                    weekday,
                    predicted_revenue: predicted,
                    weekday_average: patterns[weekday.num_days_from_monday() as usize].average_revenue,
                    confidence,
                }
            })
            .collect();
        let total_forecast = forecast.iter().map(|d| d.predicted_revenue).sum();

        let mut best_days = patterns;
        best_days.sort_by(|a, b| b.average_revenue.total_cmp(&a.average_revenue));

        tracing::debug!(
            short_average,
            long_average,
            trend,
            data_points = series.len(),
            "Computed sales forecast"
        );

        SalesForecast {
            forecast,
            total_forecast,
            statistics: ForecastStatistics {
                short_average,
                long_average,
                trend,
                trend_percentage: trend * 100.0,
                direction,
                data_points: series.len(),
            },
            best_days,
        }
    }

    /// Project monthly revenue `horizon_months` ahead with a least-squares line
    pub fn monthly_projection(
        &self,
        transactions: &[TransactionRecord],
        as_of: DateTime<Utc>,
    ) -> MonthlyProjection {
        let history = monthly_revenue(
            transactions,
            days_before(as_of, self.config.monthly_lookback_days),
            as_of,
        );
        let revenues: Vec<f64> = history.iter().map(|m| m.revenue).collect();
        let (slope, intercept) = linear_regression(&revenues);
        let n = revenues.len();
        let confidence = Confidence::from_points(n, 4, 2);

        let this_month = first_of_month(as_of.date_naive());
        let forecast = (1..=self.config.horizon_months)
            .map(|i| MonthForecast {
                month: this_month
                    .checked_add_months(Months::new(i))
                    .unwrap_or(this_month),
                predicted_revenue: (intercept + slope * (n as f64 + i as f64 - 1.0)).max(0.0),
                confidence,
            })
            .collect();

        let direction = if slope > 0.0 {
            TrendDirection::Upward
        } else if slope < 0.0 {
            TrendDirection::Downward
        } else {
            TrendDirection::Stable
        };
        let trend_percentage = match (revenues.first(), revenues.last()) {
            (Some(&first), Some(&last)) if n > 1 && first > 0.0 => (last - first) / first * 100.0,
            _ => 0.0,
        };

        MonthlyProjection {
            history,
            forecast,
            slope,
            intercept,
            direction,
            trend_percentage,
        }
    }
}

impl Default for Forecaster {
    fn default() -> Self {
        Self::new(ForecastConfig::default())
    }
}

// ============================================================================
// SERIES HELPERS
// ============================================================================

/// Revenue per UTC day with completed transactions in [from, to], ascending
pub fn daily_revenue(
    transactions: &[TransactionRecord],
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Vec<DailyRevenue> {
    let mut days: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for tx in transactions
        .iter()
        .filter(|tx| tx.is_completed() && tx.created_at >= from && tx.created_at <= to)
    {
        let entry = days.entry(tx.day()).or_insert((0.0, 0));
        entry.0 += tx.total();
        entry.1 += 1;
    }

    days.into_iter()
        .map(|(date, (revenue, transactions))| DailyRevenue {
            date,
            revenue,
            transactions,
        })
        .collect()
}

/// Revenue per calendar month in [from, to], ascending
pub fn monthly_revenue(
    transactions: &[TransactionRecord],
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Vec<MonthlyRevenue> {
    let mut months: BTreeMap<NaiveDate, MonthlyRevenue> = BTreeMap::new();
    for tx in transactions
        .iter()
        .filter(|tx| tx.is_completed() && tx.created_at >= from && tx.created_at <= to)
    {
        let month = first_of_month(tx.day());
        let entry = months.entry(month).or_insert_with(|| MonthlyRevenue {
            month,
            revenue: 0.0,
            services: 0.0,
            products: 0.0,
            transactions: 0,
        });
        entry.services += tx.service_revenue();
        entry.products += tx.product_revenue();
        entry.revenue += tx.total();
        entry.transactions += 1;
    }
    months.into_values().collect()
}

/// Mean of the last `window` points, or of all points when there are fewer
pub fn moving_average(values: &[f64], window: usize) -> f64 {
    if window == 0 || values.len() <= window {
        return mean(values);
    }
    mean(&values[values.len() - window..])
}

/// Average revenue per weekday, Monday first; weekdays without history use `fallback`
fn weekday_patterns(series: &[DailyRevenue], fallback: f64) -> Vec<WeekdayPattern> {
    let mut buckets: [Vec<f64>; 7] = Default::default();
    for day in series {
        buckets[day.date.weekday().num_days_from_monday() as usize].push(day.revenue);
    }

    buckets
        .iter()
        .enumerate()
        .map(|(i, values)| WeekdayPattern {
            weekday: weekday_from_index(i),
            average_revenue: if values.is_empty() { fallback } else { mean(values) },
            data_points: values.len(),
        })
        .collect()
}

fn weekday_from_index(index: usize) -> Weekday {
    match index {
        0 => Weekday::Mon,
        1 => Weekday::Tue,
        2 => Weekday::Wed,
        3 => Weekday::Thu,
        4 => Weekday::Fri,
        5 => Weekday::Sat,
        _ => Weekday::Sun,
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

// ============================================================================
// TESTS
// ============================================================================
