// 🚨 Anomaly Detection - z-score flags on amounts and daily volume
//
// Over a trailing window of completed transactions:
//   1. Per-transaction totals: flag |z| > amount threshold
//   2. Per-day transaction counts: flag |z| > volume threshold
//
// Zero standard deviation (empty, single record, constant series) flags
// nothing.

use crate::config::AnomalyConfig;
use crate::period::days_before;
use crate::records::TransactionRecord;
use crate::stats::{mean, sample_std_dev, z_score};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// ANOMALY TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountAnomalyKind {
    UnusuallyHigh,
    UnusuallyLow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeAnomalyKind {
    HighVolume,
    LowVolume,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionAnomaly {
    pub transaction_id: String,
    pub amount: f64,
    pub z_score: f64,
    pub kind: AmountAnomalyKind,
    pub date: DateTime<Utc>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeAnomaly {
    pub date: NaiveDate,
    pub count: usize,
    pub z_score: f64,
    pub kind: VolumeAnomalyKind,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalyStatistics {
    pub mean_transaction: f64,
    pub std_deviation: f64,
    pub total_analyzed: usize,
    /// All flagged transactions, before truncation to the report size
    pub anomaly_count: usize,
    pub daily_mean: f64,
    pub daily_std_deviation: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnomalyReport {
    pub transaction_anomalies: Vec<TransactionAnomaly>,
    pub volume_anomalies: Vec<VolumeAnomaly>,
    pub statistics: AnomalyStatistics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AnomalyReport {
    pub fn has_anomalies(&self) -> bool {
        !self.transaction_anomalies.is_empty() || !self.volume_anomalies.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "Analyzed {} transactions (mean ₱{:.2}, σ ₱{:.2}): {} amount anomalies, {} volume anomalies",
            self.statistics.total_analyzed,
            self.statistics.mean_transaction,
            self.statistics.std_deviation,
            self.statistics.anomaly_count,
            self.volume_anomalies.len()
        )
    }
}

// ============================================================================
// ANOMALY DETECTOR
// ============================================================================

pub struct AnomalyDetector {
    config: AnomalyConfig,
}

impl AnomalyDetector {
    pub fn new(config: AnomalyConfig) -> Self {
        AnomalyDetector { config }
    }

    /// Detect anomalies among completed transactions in the window ending at `as_of`
    pub fn detect(&self, transactions: &[TransactionRecord], as_of: DateTime<Utc>) -> AnomalyReport {
        let window_start = days_before(as_of, self.config.window_days);
        let recent: Vec<&TransactionRecord> = transactions
            .iter()
            .filter(|tx| tx.is_completed() && tx.created_at >= window_start && tx.created_at <= as_of)
            .collect();

        if recent.len() < self.config.min_transactions {
            tracing::debug!(
                analyzed = recent.len(),
                required = self.config.min_transactions,
                "Not enough transactions for anomaly detection"
            );
            return AnomalyReport {
                statistics: AnomalyStatistics {
                    total_analyzed: recent.len(),
                    ..AnomalyStatistics::default()
                },
                message: Some(format!(
                    "Not enough data for anomaly detection (min {} transactions)",
                    self.config.min_transactions
                )),
                ..AnomalyReport::default()
            };
        }

        let (mut transaction_anomalies, amount_mean, amount_std) = self.amount_anomalies(&recent);
        let (volume_anomalies, daily_mean, daily_std) = self.volume_anomalies(&recent);

        let statistics = AnomalyStatistics {
            mean_transaction: amount_mean,
            std_deviation: amount_std,
            total_analyzed: recent.len(),
            anomaly_count: transaction_anomalies.len(),
            daily_mean,
            daily_std_deviation: daily_std,
        };
        transaction_anomalies.truncate(self.config.max_reported);

        tracing::debug!(
            analyzed = statistics.total_analyzed,
            amount_anomalies = statistics.anomaly_count,
            volume_anomalies = volume_anomalies.len(),
            "Anomaly detection finished"
        );

        AnomalyReport {
            transaction_anomalies,
            volume_anomalies,
            statistics,
            message: None,
        }
    }

    /// Flags sorted by |z| descending, with the mean and standard deviation used
    fn amount_anomalies(&self, recent: &[&TransactionRecord]) -> (Vec<TransactionAnomaly>, f64, f64) {
        let totals: Vec<f64> = recent.iter().map(|tx| tx.total()).collect();
        let avg = mean(&totals);
        let std_dev = sample_std_dev(&totals);

        let mut anomalies: Vec<TransactionAnomaly> = recent
            .iter()
            .zip(&totals)
            .filter_map(|(tx, &amount)| {
                let z = z_score(amount, avg, std_dev);
                if z.abs() <= self.config.amount_z_threshold {
                    return None;
                }

                let (kind, direction) = if z > 0.0 {
                    (AmountAnomalyKind::UnusuallyHigh, "above")
                } else {
                    (AmountAnomalyKind::UnusuallyLow, "below")
                };
                Some(TransactionAnomaly {
                    transaction_id: tx.id.clone(),
                    amount,
                    z_score: z,
                    kind,
                    date: tx.created_at,
                    reason: format!(
                        "Amount ₱{:.2} is {:.1} std devs {} average (₱{:.0})",
                        amount,
                        z.abs(),
                        direction,
                        avg
                    ),
                })
            })
            .collect();

        anomalies.sort_by(|a, b| b.z_score.abs().total_cmp(&a.z_score.abs()));
        (anomalies, avg, std_dev)
    }

    /// Flags for days whose transaction count deviates, in date order
    fn volume_anomalies(&self, recent: &[&TransactionRecord]) -> (Vec<VolumeAnomaly>, f64, f64) {
        let mut daily: BTreeMap<NaiveDate, usize> = BTreeMap::new();
        for tx in recent {
            *daily.entry(tx.day()).or_insert(0) += 1;
        }

        let counts: Vec<f64> = daily.values().map(|&c| c as f64).collect();
        let avg = mean(&counts);
        let std_dev = sample_std_dev(&counts);

        let anomalies = daily
            .into_iter()
            .filter_map(|(date, count)| {
                let z = z_score(count as f64, avg, std_dev);
                if z.abs() <= self.config.volume_z_threshold {
                    return None;
                }

                let (kind, level) = if z > 0.0 {
                    (VolumeAnomalyKind::HighVolume, "high")
                } else {
                    (VolumeAnomalyKind::LowVolume, "low")
                };
                Some(VolumeAnomaly {
                    date,
                    count,
                    z_score: z,
                    kind,
                    reason: format!(
                        "{} transactions on {} is unusually {} (avg: {:.0}/day)",
                        count, date, level, avg
                    ),
                })
            })
            .collect();

        (anomalies, avg, std_dev)
    }
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new(AnomalyConfig::default())
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
        Utc.with_ymd_and_hms(2025, 6, 30, 18, 0, 0).unwrap()
    }

    fn tx(id: &str, when: DateTime<Utc>, amount: f64) -> TransactionRecord {
        TransactionRecord {
            id: id.to_string(),
            branch_id: "b1".to_string(),
            customer_id: None,
            barber_id: None,
            created_at: when,
            payment_status: PaymentStatus::Completed,
            services: vec![LineItem::new("s1", "Haircut", amount, 1)],
            products: vec![],
        }
    }

    fn permissive() -> AnomalyDetector {
        AnomalyDetector::new(AnomalyConfig {
            min_transactions: 0,
            ..AnomalyConfig::default()
        })
    }

    #[test]
    fn test_planted_outlier_is_the_only_flag() {
        // 99 x ₱500 spread over 20 days, 5 per day, plus one ₱50,000
        let mut transactions: Vec<TransactionRecord> = (0..99)
            .map(|i| {
                let when = as_of() - Duration::days(i / 5) - Duration::hours(1 + i % 5);
                tx(&format!("tx{}", i), when, 500.0)
            })
            .collect();
        transactions.push(tx("outlier", as_of() - Duration::days(19) - Duration::hours(5), 50_000.0));

        let report = AnomalyDetector::default().detect(&transactions, as_of());

        assert_eq!(report.statistics.total_analyzed, 100);
        assert_eq!(report.statistics.anomaly_count, 1);
        assert_eq!(report.transaction_anomalies.len(), 1);
        let flagged = &report.transaction_anomalies[0];
        assert_eq!(flagged.transaction_id, "outlier");
        assert_eq!(flagged.kind, AmountAnomalyKind::UnusuallyHigh);
        assert!(flagged.z_score > 2.5);
        assert!(report.volume_anomalies.is_empty());
    }

    #[test]
    fn test_empty_and_single_inputs_flag_nothing() {
        let detector = permissive();

        let empty = detector.detect(&[], as_of());
        assert!(!empty.has_anomalies());
        assert_eq!(empty.statistics.std_deviation, 0.0);

        let single = detector.detect(&[tx("only", as_of(), 99_999.0)], as_of());
        assert!(!single.has_anomalies());
        assert_eq!(single.statistics.std_deviation, 0.0);
        assert_eq!(single.statistics.mean_transaction, 99_999.0);
    }

    #[test]
    fn test_below_minimum_sample_reports_message() {
        let transactions: Vec<_> = (0..5)
            .map(|i| tx(&format!("tx{}", i), as_of() - Duration::days(i), 500.0))
            .collect();

        let report = AnomalyDetector::default().detect(&transactions, as_of());
        assert!(!report.has_anomalies());
        assert_eq!(report.statistics.total_analyzed, 5);
        assert!(report.message.unwrap().contains("min 10"));
    }

    #[test]
    fn test_unusually_low_amount() {
        let mut transactions: Vec<_> = (0..30)
            .map(|i| tx(&format!("tx{}", i), as_of() - Duration::hours(i), 1000.0 + (i % 3) as f64))
            .collect();
        transactions.push(tx("tiny", as_of() - Duration::hours(40), 1.0));

        let report = AnomalyDetector::default().detect(&transactions, as_of());
        assert_eq!(report.transaction_anomalies.len(), 1);
        assert_eq!(report.transaction_anomalies[0].transaction_id, "tiny");
        assert_eq!(report.transaction_anomalies[0].kind, AmountAnomalyKind::UnusuallyLow);
    }

    #[test]
    fn test_volume_spike_day() {
        let mut transactions = Vec::new();
        // Ten quiet days with two transactions each
        for day in 1..=10 {
            for n in 0..2 {
                let when = as_of() - Duration::days(day) - Duration::hours(n);
                transactions.push(tx(&format!("q{}-{}", day, n), when, 500.0));
            }
        }
        // One busy day
        for n in 0..12 {
            let when = as_of() - Duration::minutes(30 * (n + 1));
            transactions.push(tx(&format!("busy{}", n), when, 500.0));
        }

        let report = AnomalyDetector::default().detect(&transactions, as_of());
        assert_eq!(report.volume_anomalies.len(), 1);
        assert_eq!(report.volume_anomalies[0].kind, VolumeAnomalyKind::HighVolume);
        assert_eq!(report.volume_anomalies[0].count, 12);
        assert_eq!(report.volume_anomalies[0].date, as_of().date_naive());
    }

    #[test]
    fn test_window_excludes_old_and_incomplete() {
        let old = tx("old", as_of() - Duration::days(45), 50_000.0);
        let mut pending = tx("pending", as_of(), 50_000.0);
        pending.payment_status = PaymentStatus::Pending;

        let report = permissive().detect(&[old, pending], as_of());
        assert_eq!(report.statistics.total_analyzed, 0);
    }

    #[test]
    fn test_report_keeps_ten_largest_and_full_count() {
        // 600 x ₱500 over 20 days plus 12 outliers between ₱40,000 and ₱51,000
        let mut transactions: Vec<TransactionRecord> = (0..600)
            .map(|i| {
                let when = as_of() - Duration::days(i / 30) - Duration::minutes(1 + i % 30);
                tx(&format!("tx{}", i), when, 500.0)
            })
            .collect();
        for i in 0..12 {
            let when = as_of() - Duration::days(i) - Duration::hours(3);
            transactions.push(tx(&format!("big{}", i), when, 40_000.0 + i as f64 * 1_000.0));
        }

        let report = AnomalyDetector::default().detect(&transactions, as_of());
        assert_eq!(report.statistics.anomaly_count, 12);
        assert_eq!(report.transaction_anomalies.len(), 10);
        assert!(report
            .transaction_anomalies
            .windows(2)
            .all(|w| w[0].z_score.abs() >= w[1].z_score.abs()));
        assert_eq!(report.transaction_anomalies[0].transaction_id, "big11");
        assert!(report
            .transaction_anomalies
            .iter()
            .all(|a| a.kind == AmountAnomalyKind::UnusuallyHigh && a.transaction_id.starts_with("big")));
    }
}
