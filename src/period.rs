// 📊 Period Comparison - Current period vs the equal-length period before it
//
// Current period:  [start, end]
// Previous period: [start - (end - start), start)
//
// Percentage changes are None ("N/A") whenever the previous base is zero.

use crate::aggregate::{GroupKey, LeaderboardEntry, ReportAggregator};
use crate::error::{InsightsError, Result};
use crate::records::TransactionRecord;
use crate::stats::{format_percent, percent_change};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Revenue changes within ±5% read as "stable"
const STABLE_BAND_PCT: f64 = 5.0;

// ============================================================================
// REVENUE BREAKDOWN
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RevenueBreakdown {
    pub services: f64,
    pub products: f64,
    pub total: f64,
    pub transaction_count: usize,
}

impl RevenueBreakdown {
    /// Sum completed transactions
    pub fn from_transactions<'a, I>(transactions: I) -> Self
    where
        I: IntoIterator<Item = &'a TransactionRecord>,
    {
        let mut breakdown = RevenueBreakdown::default();
        for tx in transactions.into_iter().filter(|tx| tx.is_completed()) {
            breakdown.services += tx.service_revenue();
            breakdown.products += tx.product_revenue();
            breakdown.transaction_count += 1;
        }
        breakdown.total = breakdown.services + breakdown.products;
        breakdown
    }

    /// Service share of total revenue in percent (0 with no revenue)
    pub fn service_share(&self) -> f64 {
        if self.total > 0.0 {
            self.services / self.total * 100.0
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl PeriodWindow {
    /// Current window and the equal-length window immediately before it
    pub fn with_previous(start: DateTime<Utc>, end: DateTime<Utc>) -> (PeriodWindow, PeriodWindow) {
        let (start, end) = if end < start { (end, start) } else { (start, end) };
        let length = end - start;
        (
            PeriodWindow { start, end },
            PeriodWindow {
                start: start
                    .checked_sub_signed(length)
                    .unwrap_or(DateTime::<Utc>::MIN_UTC),
                end: start,
            },
        )
    }

    /// Inclusive at both ends (current period)
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at <= self.end
    }

    /// End-exclusive (previous period)
    pub fn contains_before_end(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }
}

/// `days` before `at`, saturating at the earliest representable instant
pub fn days_before(at: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    at.checked_sub_signed(Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// RFC 3339, or a bare date taken as the start (or end) of that UTC day
pub fn parse_instant(raw: &str, end_of_day: bool) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| InsightsError::InvalidDate(raw.to_string()))?;
    let naive = if end_of_day {
        date.and_hms_milli_opt(23, 59, 59, 999)
    } else {
        date.and_hms_opt(0, 0, 0)
    };
    naive
        .map(|n| n.and_utc())
        .ok_or_else(|| InsightsError::InvalidDate(raw.to_string()))
}

/// Explicit bounds where given; otherwise `default_days` ending at `as_of`
pub fn resolve_bounds(
    start: Option<&str>,
    end: Option<&str>,
    as_of: DateTime<Utc>,
    default_days: u32,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let end = match end {
        Some(raw) => parse_instant(raw, true)?,
        None => as_of,
    };
    let start = match start {
        Some(raw) => parse_instant(raw, false)?,
        None => days_before(end, default_days),
    };
    Ok((start, end))
}

// ============================================================================
// PERIOD SUMMARY
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub current: RevenueBreakdown,
    pub previous: RevenueBreakdown,
    pub revenue_change: Option<f64>,
    pub service_change: Option<f64>,
    pub product_change: Option<f64>,
    pub transaction_change: Option<f64>,
    pub service_share: f64,
    pub top_service: Option<LeaderboardEntry>,
    pub top_product: Option<LeaderboardEntry>,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
    pub current_period: PeriodWindow,
    pub previous_period: PeriodWindow,
}

impl PeriodSummary {
    pub fn summary(&self) -> String {
        format!(
            "Revenue ₱{:.2} ({}), services ₱{:.2} ({}), products ₱{:.2} ({}), {} transactions ({})",
            self.current.total,
            format_percent(self.revenue_change),
            self.current.services,
            format_percent(self.service_change),
            self.current.products,
            format_percent(self.product_change),
            self.current.transaction_count,
            format_percent(self.transaction_change),
        )
    }
}

/// Compare [start, end] against the preceding period of equal length
pub fn compare_periods(
    transactions: &[TransactionRecord],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> PeriodSummary {
    let (current_period, previous_period) = PeriodWindow::with_previous(start, end);

    let current_txns: Vec<TransactionRecord> = transactions
        .iter()
        .filter(|tx| tx.is_completed() && current_period.contains(tx.created_at))
        .cloned()
        .collect();

    let current = RevenueBreakdown::from_transactions(&current_txns);
    let previous = RevenueBreakdown::from_transactions(
        transactions
            .iter()
            .filter(|tx| previous_period.contains_before_end(tx.created_at)),
    );

    let revenue_change = percent_change(current.total, previous.total);
    let service_change = percent_change(current.services, previous.services);
    let product_change = percent_change(current.products, previous.products);
    let transaction_change = percent_change(
        current.transaction_count as f64,
        previous.transaction_count as f64,
    );

    let top_service = ReportAggregator::from_transactions(&current_txns, GroupKey::Service)
        .ranked(1)
        .into_iter()
        .next();
    let top_product = ReportAggregator::from_transactions(&current_txns, GroupKey::Product)
        .ranked(1)
        .into_iter()
        .next();

    let mut summary = PeriodSummary {
        service_share: current.service_share(),
        current,
        previous,
        revenue_change,
        service_change,
        product_change,
        transaction_change,
        top_service,
        top_product,
        insights: Vec::new(),
        recommendations: Vec::new(),
        current_period,
        previous_period,
    };
    summary.insights = build_insights(&summary);
    summary.recommendations = build_recommendations(&summary);

    tracing::debug!(
        current_total = summary.current.total,
        previous_total = summary.previous.total,
        revenue_change = ?summary.revenue_change,
        "Compared periods"
    );
    summary
}

fn build_insights(summary: &PeriodSummary) -> Vec<String> {
    let mut insights = Vec::new();

    match summary.revenue_change {
        Some(change) if change.abs() >= STABLE_BAND_PCT => {
            if change > 0.0 {
                insights.push(format!("Revenue increased {:.1}% compared to last period", change));
            } else {
                insights.push(format!("Revenue decreased {:.1}% compared to last period", change.abs()));
            }
        }
        Some(change) => {
            insights.push(format!("Revenue remained stable ({})", format_percent(Some(change))));
        }
        None => insights.push("Revenue change N/A: no revenue in the previous period".to_string()),
    }

    insights.push(format!(
        "Services: ₱{:.2} ({:.0}%) | Products: ₱{:.2} ({:.0}%)",
        summary.current.services,
        summary.service_share,
        summary.current.products,
        if summary.current.total > 0.0 { 100.0 - summary.service_share } else { 0.0 },
    ));

    if let Some(service) = &summary.top_service {
        insights.push(format!(
            "Top Service: {} ({} bookings, ₱{:.2})",
            service.name, service.units, service.revenue
        ));
    }
    if let Some(product) = &summary.top_product {
        insights.push(format!(
            "Top Product: {} ({} sold, ₱{:.2})",
            product.name, product.units, product.revenue
        ));
    }

    insights.push(format!(
        "{} transactions ({} vs last period)",
        summary.current.transaction_count,
        format_percent(summary.transaction_change)
    ));

    insights
}

fn build_recommendations(summary: &PeriodSummary) -> Vec<String> {
    let mut recommendations = Vec::new();

    if summary.revenue_change.is_some_and(|c| c < -10.0) {
        recommendations.push("Consider running a promotion to boost sales".to_string());
    }
    if summary.current.products < summary.current.services * 0.1 {
        recommendations
            .push("Product sales are low - consider upselling during services".to_string());
    }
    if summary.transaction_change.is_some_and(|c| c < -15.0) {
        recommendations
            .push("Transaction volume dropped - review booking availability".to_string());
    }
    if let Some(service) = &summary.top_service {
        if service.units as f64 > summary.current.transaction_count as f64 * 0.5 {
            recommendations.push(format!(
                "{} is very popular - ensure adequate staff availability",
                service.name
            ));
        }
    }

    recommendations
}

// ============================================================================
// BRANCH COMPARISON
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchComparison {
    pub branch_id: String,
    pub current_revenue: f64,
    pub previous_revenue: f64,
    pub change: Option<f64>,
}

/// Per-branch revenue for both periods, by current revenue descending
pub fn compare_branches(
    transactions: &[TransactionRecord],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<BranchComparison> {
    let (current_period, previous_period) = PeriodWindow::with_previous(start, end);

    let mut order: Vec<String> = Vec::new();
    let mut totals: HashMap<String, (f64, f64)> = HashMap::new();

    for tx in transactions.iter().filter(|tx| tx.is_completed()) {
        let in_current = current_period.contains(tx.created_at);
        let in_previous = previous_period.contains_before_end(tx.created_at);
        if !in_current && !in_previous {
            continue;
        }

        let entry = totals.entry(tx.branch_id.clone()).or_insert_with(|| {
            order.push(tx.branch_id.clone());
            (0.0, 0.0)
        });
        if in_current {
            entry.0 += tx.total();
        } else {
            entry.1 += tx.total();
        }
    }

    let mut comparisons: Vec<BranchComparison> = order
        .into_iter()
        .map(|branch_id| {
            let (current_revenue, previous_revenue) = totals[&branch_id];
            BranchComparison {
                change: percent_change(current_revenue, previous_revenue),
                branch_id,
                current_revenue,
                previous_revenue,
            }
        })
        .collect();

    comparisons.sort_by(|a, b| b.current_revenue.total_cmp(&a.current_revenue));
    comparisons
}

/// Branches whose revenue fell below `threshold_pct`, worst first
pub fn declining_branches(
    transactions: &[TransactionRecord],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    threshold_pct: f64,
) -> Vec<BranchComparison> {
    let mut declining: Vec<BranchComparison> = compare_branches(transactions, start, end)
        .into_iter()
        .filter(|b| b.change.is_some_and(|c| c < threshold_pct))
        .collect();

    declining.sort_by(|a, b| {
        a.change
            .unwrap_or(0.0)
            .total_cmp(&b.change.unwrap_or(0.0))
    });
    declining
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{LineItem, PaymentStatus};
    use chrono::{Duration, TimeZone};

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, 12, 0, 0).unwrap()
    }

    fn tx(branch: &str, when: DateTime<Utc>, service: f64, product: f64) -> TransactionRecord {
        let mut products = vec![];
        if product != 0.0 {
            products.push(LineItem::new("p1", "Pomade", product, 1));
        }
        TransactionRecord {
            id: format!("{}-{}", branch, when.timestamp()),
            branch_id: branch.to_string(),
            customer_id: None,
            barber_id: None,
            created_at: when,
            payment_status: PaymentStatus::Completed,
            services: vec![LineItem::new("s1", "Haircut", service, 1)],
            products,
        }
    }

    #[test]
    fn test_period_windows_are_adjacent() {
        let (current, previous) = PeriodWindow::with_previous(at(11), at(21));
        assert_eq!(previous.end, current.start);
        assert_eq!(previous.start, at(1));
        assert!(current.contains(at(21)));
        assert!(!previous.contains_before_end(at(11)));
    }

    #[test]
    fn test_change_per_category() {
        let transactions = vec![
            tx("b1", at(5), 1000.0, 200.0),
            tx("b1", at(15), 1500.0, 100.0),
        ];

        let summary = compare_periods(&transactions, at(11), at(21));
        assert_eq!(summary.current.total, 1600.0);
        assert_eq!(summary.previous.total, 1200.0);
        assert!((summary.revenue_change.unwrap() - 33.333).abs() < 0.01);
        assert_eq!(summary.service_change, Some(50.0));
        assert_eq!(summary.product_change, Some(-50.0));
        assert_eq!(summary.transaction_change, Some(0.0));
        assert_eq!(summary.top_service.as_ref().unwrap().name, "Haircut");
        assert!(summary.insights[0].starts_with("Revenue increased"));
    }

    #[test]
    fn test_zero_prior_period_reports_not_available() {
        let transactions = vec![tx("b1", at(15), 1500.0, 0.0)];

        let summary = compare_periods(&transactions, at(11), at(21));
        assert_eq!(summary.revenue_change, None);
        assert_eq!(summary.service_change, None);
        assert_eq!(summary.product_change, None);
        assert_eq!(summary.transaction_change, None);
        assert!(summary.summary().contains("N/A"));
    }

    #[test]
    fn test_empty_input_is_all_zero() {
        let summary = compare_periods(&[], at(11), at(21));
        assert_eq!(summary.current, RevenueBreakdown::default());
        assert_eq!(summary.service_share, 0.0);
        assert!(summary.revenue_change.is_none());
        assert!(summary.top_service.is_none());
        assert!(summary.recommendations.is_empty());
    }

    #[test]
    fn test_recommendations_fire_on_decline() {
        let transactions = vec![
            tx("b1", at(3), 5000.0, 0.0),
            tx("b1", at(4), 5000.0, 0.0),
            tx("b1", at(15), 3000.0, 0.0),
        ];

        let summary = compare_periods(&transactions, at(11), at(21));
        assert!(summary.recommendations.iter().any(|r| r.contains("promotion")));
        assert!(summary.recommendations.iter().any(|r| r.contains("upselling")));
        assert!(summary.recommendations.iter().any(|r| r.contains("booking availability")));
    }

    #[test]
    fn test_refunded_transactions_are_ignored() {
        let mut refunded = tx("b1", at(15), 900.0, 0.0);
        refunded.payment_status = PaymentStatus::Refunded;

        let summary = compare_periods(&[refunded], at(11), at(21));
        assert_eq!(summary.current.transaction_count, 0);
    }

    #[test]
    fn test_declining_branches_worst_first() {
        let transactions = vec![
            tx("north", at(5), 1000.0, 0.0),
            tx("north", at(15), 950.0, 0.0),
            tx("south", at(5), 1000.0, 0.0),
            tx("south", at(15), 500.0, 0.0),
            tx("east", at(5), 1000.0, 0.0),
            tx("east", at(15), 800.0, 0.0),
            tx("west", at(15) + Duration::hours(1), 700.0, 0.0),
        ];

        let all = compare_branches(&transactions, at(11), at(21));
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].branch_id, "north");
        assert_eq!(all.iter().find(|b| b.branch_id == "west").unwrap().change, None);

        let declining = declining_branches(&transactions, at(11), at(21), -10.0);
        let ids: Vec<_> = declining.iter().map(|b| b.branch_id.as_str()).collect();
        assert_eq!(ids, vec!["south", "east"]);
    }

    #[test]
    fn test_parse_instant_accepts_dates_and_rfc3339() {
        let start = parse_instant("2025-06-01", false).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap());

        let end = parse_instant("2025-06-01", true).unwrap();
        assert_eq!(end.date_naive(), start.date_naive());
        assert!(end > start);

        let exact = parse_instant("2025-06-01T08:30:00+08:00", false).unwrap();
        assert_eq!(exact, Utc.with_ymd_and_hms(2025, 6, 1, 0, 30, 0).unwrap());

        assert!(matches!(
            parse_instant("June 1st", false),
            Err(InsightsError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_bounds_default_to_window_before_as_of() {
        let as_of = Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap();
        let (start, end) = resolve_bounds(None, None, as_of, 30).unwrap();
        assert_eq!(end, as_of);
        assert_eq!(end - start, Duration::days(30));

        let (start, _) = resolve_bounds(Some("2025-06-01"), None, as_of, 30).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_days_before_saturates_at_earliest_instant() {
        let as_of = Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap();
        assert_eq!(days_before(as_of, 30), as_of - Duration::days(30));
        assert_eq!(days_before(as_of, u32::MAX), DateTime::<Utc>::MIN_UTC);
    }
}
