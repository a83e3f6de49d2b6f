// 🩺 Branch Health Score - Weighted 0-100 performance score
//
// Five sub-scores, each clamped to [0, 100], combined with weights that sum
// to 100:
//   revenue trend, booking completion, cancellation, transaction volume,
//   inventory.

use crate::config::HealthConfig;
use crate::period::days_before;
use crate::records::{BookingRecord, BookingStatus, ProductStock, TransactionRecord};
use crate::stats::{clamp_score, finite_or_zero};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// HEALTH STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Excellent,
    Good,
    Fair,
    NeedsAttention,
}

impl HealthStatus {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            HealthStatus::Excellent
        } else if score >= 60.0 {
            HealthStatus::Good
        } else if score >= 40.0 {
            HealthStatus::Fair
        } else {
            HealthStatus::NeedsAttention
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HealthStatus::Excellent => "Excellent",
            HealthStatus::Good => "Good",
            HealthStatus::Fair => "Fair",
            HealthStatus::NeedsAttention => "Needs Attention",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            HealthStatus::Excellent => "green",
            HealthStatus::Good => "blue",
            HealthStatus::Fair => "yellow",
            HealthStatus::NeedsAttention => "red",
        }
    }
}

// ============================================================================
// HEALTH REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubScore {
    pub name: String,
    pub score: f64,
    pub weight: f64,
    pub details: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthMetrics {
    pub current_revenue: f64,
    pub previous_revenue: f64,
    pub current_transactions: usize,
    pub previous_transactions: usize,
    pub total_bookings: usize,
    pub completed_bookings: usize,
    pub cancelled_bookings: usize,
    pub active_products: usize,
    pub low_stock_products: usize,
    pub out_of_stock: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    /// Weighted score, unrounded, always within [0, 100]
    pub score: f64,
    pub status: HealthStatus,
    pub breakdown: Vec<SubScore>,
    pub alerts: Vec<String>,
    pub metrics: HealthMetrics,
}

impl HealthReport {
    pub fn rounded_score(&self) -> u8 {
        self.score.round() as u8
    }

    pub fn summary(&self) -> String {
        format!(
            "Health {} ({}), {} alert(s)",
            self.rounded_score(),
            self.status.label(),
            self.alerts.len()
        )
    }
}

// ============================================================================
// HEALTH ENGINE
// ============================================================================

pub struct HealthEngine {
    config: HealthConfig,
}

impl HealthEngine {
    pub fn new(config: HealthConfig) -> Self {
        HealthEngine { config }
    }

    /// Score the window ending at `as_of` against the window before it
    pub fn score(
        &self,
        transactions: &[TransactionRecord],
        bookings: &[BookingRecord],
        products: &[ProductStock],
        as_of: DateTime<Utc>,
    ) -> HealthReport {
        let current_start = days_before(as_of, self.config.window_days);
        let previous_start = days_before(current_start, self.config.window_days);

        let mut metrics = HealthMetrics::default();

        for tx in transactions.iter().filter(|tx| tx.is_completed() && tx.created_at <= as_of) {
            if tx.created_at >= current_start {
                metrics.current_revenue += tx.total();
                metrics.current_transactions += 1;
            } else if tx.created_at >= previous_start {
                metrics.previous_revenue += tx.total();
                metrics.previous_transactions += 1;
            }
        }

        for booking in bookings
            .iter()
            .filter(|b| b.created_at >= current_start && b.created_at <= as_of)
        {
            metrics.total_bookings += 1;
            match booking.status {
                BookingStatus::Completed => metrics.completed_bookings += 1,
                BookingStatus::Cancelled => metrics.cancelled_bookings += 1,
                _ => {}
            }
        }

        for product in products.iter().filter(|p| p.active) {
            metrics.active_products += 1;
            if product.is_low_stock() {
                metrics.low_stock_products += 1;
            }
            if product.stock == 0 {
                metrics.out_of_stock += 1;
            }
        }

        self.report_from_metrics(metrics)
    }

    /// Combine raw metrics into sub-scores, a weighted score and alerts
    pub fn report_from_metrics(&self, metrics: HealthMetrics) -> HealthReport {
        // +20% growth = 100, 0% = 50, -20% = 0
        let revenue_growth = growth_pct(metrics.current_revenue, metrics.previous_revenue);
        let revenue_score = clamp_score(50.0 + revenue_growth * 2.5);

        let completion_rate = if metrics.total_bookings > 0 {
            metrics.completed_bookings as f64 / metrics.total_bookings as f64 * 100.0
        } else {
            100.0
        };

        let cancellation_rate = if metrics.total_bookings > 0 {
            metrics.cancelled_bookings as f64 / metrics.total_bookings as f64 * 100.0
        } else {
            0.0
        };
        // Each 1% of cancellations costs 5 points
        let cancellation_score = clamp_score(100.0 - cancellation_rate * 5.0);

        let transaction_growth = growth_pct(
            metrics.current_transactions as f64,
            metrics.previous_transactions as f64,
        );
        let transaction_score = clamp_score(50.0 + transaction_growth * 2.0);

        let stock_health_rate = if metrics.active_products > 0 {
            metrics.active_products.saturating_sub(metrics.low_stock_products) as f64
                / metrics.active_products as f64
                * 100.0
        } else {
            100.0
        };

        let breakdown = vec![
            SubScore {
                name: "revenue".to_string(),
                score: revenue_score,
                weight: self.config.revenue_weight,
                details: format!(
                    "{}{:.1}% growth",
                    if revenue_growth >= 0.0 { "+" } else { "" },
                    revenue_growth
                ),
            },
            SubScore {
                name: "bookings".to_string(),
                score: clamp_score(completion_rate),
                weight: self.config.booking_weight,
                details: format!("{:.0}% completion rate", completion_rate),
            },
            SubScore {
                name: "cancellations".to_string(),
                score: cancellation_score,
                weight: self.config.cancellation_weight,
                details: format!("{:.1}% cancellation rate", cancellation_rate),
            },
            SubScore {
                name: "transactions".to_string(),
                score: transaction_score,
                weight: self.config.transaction_weight,
                details: format!(
                    "{} transactions ({}{:.0}%)",
                    metrics.current_transactions,
                    if transaction_growth >= 0.0 { "+" } else { "" },
                    transaction_growth
                ),
            },
            SubScore {
                name: "inventory".to_string(),
                score: clamp_score(stock_health_rate),
                weight: self.config.inventory_weight,
                details: format!(
                    "{} low stock, {} out of stock",
                    metrics.low_stock_products, metrics.out_of_stock
                ),
            },
        ];

        let total_weight: f64 = breakdown.iter().map(|s| s.weight).sum();
        let weighted: f64 = breakdown.iter().map(|s| s.score * s.weight).sum();
        let score = if total_weight > 0.0 {
            clamp_score(weighted / total_weight)
        } else {
            0.0
        };

        let mut alerts = Vec::new();
        if revenue_score < 40.0 {
            alerts.push("Revenue declining - review pricing and promotions".to_string());
        }
        if completion_rate < 70.0 {
            alerts.push("Low booking completion rate - check service availability".to_string());
        }
        if cancellation_rate > 20.0 {
            alerts.push("High cancellation rate - review booking policies".to_string());
        }
        if metrics.out_of_stock > 0 {
            alerts.push(format!("{} products out of stock", metrics.out_of_stock));
        }
        if metrics.low_stock_products > 3 {
            alerts.push(format!("{} products need reorder", metrics.low_stock_products));
        }

        let status = HealthStatus::from_score(score);
        tracing::debug!(score, status = status.label(), alerts = alerts.len(), "Computed health score");

        HealthReport {
            score,
            status,
            breakdown,
            alerts,
            metrics,
        }
    }
}

impl Default for HealthEngine {
    fn default() -> Self {
        Self::new(HealthConfig::default())
    }
}

/// Growth in percent; a zero base counts as +100% when there is any activity
fn growth_pct(current: f64, previous: f64) -> f64 {
    let current = finite_or_zero(current);
    let previous = finite_or_zero(previous);
    if previous > 0.0 {
        (current - previous) / previous * 100.0
    } else if current > 0.0 {
        100.0
    } else {
        0.0
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{LineItem, PaymentStatus};
    use chrono::{Duration, TimeZone};

    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap()
    }

    fn tx(days_ago: i64, amount: f64) -> TransactionRecord {
        TransactionRecord {
            id: format!("tx-{}-{}", days_ago, amount),
            branch_id: "b1".to_string(),
            customer_id: None,
            barber_id: None,
            created_at: as_of() - Duration::days(days_ago),
            payment_status: PaymentStatus::Completed,
            services: vec![LineItem::new("s1", "Haircut", amount, 1)],
            products: vec![],
        }
    }

    fn booking(days_ago: i64, status: BookingStatus) -> BookingRecord {
        BookingRecord {
            id: format!("bk-{}-{:?}", days_ago, status),
            branch_id: "b1".to_string(),
            customer_id: None,
            barber_id: None,
            service_id: "s1".to_string(),
            created_at: as_of() - Duration::days(days_ago),
            status,
            price: 250.0,
        }
    }

    fn product(stock: u32) -> ProductStock {
        ProductStock {
            id: format!("p{}", stock),
            name: "Pomade".to_string(),
            stock,
            min_stock: Some(5),
            active: true,
        }
    }

    #[test]
    fn test_empty_input_scores_within_bounds() {
        let report = HealthEngine::default().score(&[], &[], &[], as_of());

        // revenue 50, bookings 100, cancellations 100, transactions 50, inventory 100
        let expected = (50.0 * 25.0 + 100.0 * 20.0 + 100.0 * 15.0 + 50.0 * 20.0 + 100.0 * 20.0) / 100.0;
        assert!((report.score - expected).abs() < 1e-9);
        assert_eq!(report.status, HealthStatus::Good);
        assert!(report.alerts.is_empty());
    }

    #[test]
    fn test_thriving_branch_is_excellent() {
        let transactions = vec![tx(40, 1000.0), tx(5, 1500.0), tx(3, 1500.0)];
        let bookings = vec![booking(2, BookingStatus::Completed), booking(4, BookingStatus::Completed)];
        let products = vec![product(20), product(30)];

        let report = HealthEngine::default().score(&transactions, &bookings, &products, as_of());
        assert_eq!(report.metrics.current_revenue, 3000.0);
        assert_eq!(report.metrics.previous_revenue, 1000.0);
        assert_eq!(report.rounded_score(), 100);
        assert_eq!(report.status, HealthStatus::Excellent);
    }

    #[test]
    fn test_struggling_branch_needs_attention() {
        let transactions = vec![tx(40, 5000.0), tx(45, 5000.0), tx(10, 1000.0)];
        let bookings = vec![
            booking(1, BookingStatus::Cancelled),
            booking(2, BookingStatus::Cancelled),
            booking(3, BookingStatus::Pending),
            booking(4, BookingStatus::Completed),
        ];
        let products = vec![product(0), product(1), product(2), product(3), product(4)];

        let report = HealthEngine::default().score(&transactions, &bookings, &products, as_of());
        assert_eq!(report.status, HealthStatus::NeedsAttention);
        assert!(report.score >= 0.0 && report.score < 40.0);
        assert_eq!(report.metrics.out_of_stock, 1);
        assert_eq!(report.alerts.len(), 5);
    }

    #[test]
    fn test_score_always_within_bounds() {
        let engine = HealthEngine::default();
        let extremes = [
            (0.0, 1.0, 0, 100),
            (1e12, 1.0, 1000, 1),
            (-500.0, 100.0, 0, 0),
            (f64::NAN, f64::INFINITY, 3, 0),
        ];

        for (current_revenue, previous_revenue, current_transactions, previous_transactions) in extremes {
            let report = engine.report_from_metrics(HealthMetrics {
                current_revenue,
                previous_revenue,
                current_transactions,
                previous_transactions,
                total_bookings: 10,
                cancelled_bookings: 10,
                ..HealthMetrics::default()
            });
            assert!(report.score >= 0.0 && report.score <= 100.0, "score {}", report.score);
            for sub in &report.breakdown {
                assert!(sub.score >= 0.0 && sub.score <= 100.0);
            }
        }
    }

    #[test]
    fn test_status_bands() {
        assert_eq!(HealthStatus::from_score(80.0), HealthStatus::Excellent);
        assert_eq!(HealthStatus::from_score(79.9), HealthStatus::Good);
        assert_eq!(HealthStatus::from_score(60.0), HealthStatus::Good);
        assert_eq!(HealthStatus::from_score(40.0), HealthStatus::Fair);
        assert_eq!(HealthStatus::from_score(39.9), HealthStatus::NeedsAttention);
        assert_eq!(HealthStatus::NeedsAttention.label(), "Needs Attention");
    }

    #[test]
    fn test_oversized_window_saturates_instead_of_overflowing() {
        let engine = HealthEngine::new(HealthConfig {
            window_days: u32::MAX,
            ..HealthConfig::default()
        });

        let report = engine.score(&[tx(400, 1000.0)], &[], &[], as_of());
        assert_eq!(report.metrics.current_revenue, 1000.0);
        assert_eq!(report.metrics.previous_revenue, 0.0);
        assert!(report.score >= 0.0 && report.score <= 100.0);
    }
}
