// 👥 Customer Segmentation - Recency / Frequency / Monetary rules
//
// Rules are evaluated in order; the first match wins:
//   new      first visit is recent and visits <= new_max_visits
//   vip      visits >= vip_min_visits, spend >= vip_min_spend, last visit recent
//   loyal    visits >= loyal_min_visits, last visit recent
//   regular  last visit recent
//   at_risk  last visit older than at_risk_after_days
//   regular  otherwise

use crate::config::SegmentationConfig;
use crate::period::days_before;
use crate::records::TransactionRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// SEGMENTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    Vip,
    Loyal,
    Regular,
    AtRisk,
    New,
}

impl Segment {
    /// Report order
    pub const ALL: [Segment; 5] = [
        Segment::Vip,
        Segment::Loyal,
        Segment::Regular,
        Segment::AtRisk,
        Segment::New,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Segment::Vip => "vip",
            Segment::Loyal => "loyal",
            Segment::Regular => "regular",
            Segment::AtRisk => "at_risk",
            Segment::New => "new",
        }
    }
}

/// Visit history of one customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub customer_id: String,
    pub visit_count: u32,
    pub total_spent: f64,
    pub first_visit: DateTime<Utc>,
    pub last_visit: DateTime<Utc>,
}

impl CustomerProfile {
    pub fn days_since_last_visit(&self, as_of: DateTime<Utc>) -> i64 {
        (as_of - self.last_visit).num_days()
    }

    pub fn average_spend(&self) -> f64 {
        if self.visit_count > 0 {
            self.total_spent / self.visit_count as f64
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentStats {
    pub segment: Segment,
    pub count: usize,
    pub total_revenue: f64,
    pub avg_visits: f64,
    pub avg_spend: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationReport {
    pub total_customers: usize,
    pub segments: Vec<SegmentStats>,
    pub assignments: Vec<(String, Segment)>,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
}

impl SegmentationReport {
    pub fn stats(&self, segment: Segment) -> Option<&SegmentStats> {
        self.segments.iter().find(|s| s.segment == segment)
    }

    pub fn segment_of(&self, customer_id: &str) -> Option<Segment> {
        self.assignments
            .iter()
            .find(|(id, _)| id == customer_id)
            .map(|(_, segment)| *segment)
    }
}

// ============================================================================
// SEGMENTER
// ============================================================================

pub struct CustomerSegmenter {
    config: SegmentationConfig,
}

impl CustomerSegmenter {
    pub fn new(config: SegmentationConfig) -> Self {
        CustomerSegmenter { config }
    }

    /// One profile per customer from completed transactions up to `as_of`, in first-seen order
    pub fn profiles(&self, transactions: &[TransactionRecord], as_of: DateTime<Utc>) -> Vec<CustomerProfile> {
        let mut profiles: Vec<CustomerProfile> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();

        for tx in transactions.iter().filter(|tx| tx.is_completed() && tx.created_at <= as_of) {
            let Some(customer_id) = tx.customer_id.as_deref() else {
                continue;
            };

            match index.get(customer_id).copied() {
                Some(position) => {
                    let profile = &mut profiles[position];
                    profile.visit_count += 1;
                    profile.total_spent += tx.total();
                    profile.first_visit = profile.first_visit.min(tx.created_at);
                    profile.last_visit = profile.last_visit.max(tx.created_at);
                }
                None => {
                    index.insert(customer_id, profiles.len());
                    profiles.push(CustomerProfile {
                        customer_id: customer_id.to_string(),
                        visit_count: 1,
                        total_spent: tx.total(),
                        first_visit: tx.created_at,
                        last_visit: tx.created_at,
                    });
                }
            }
        }

        profiles
    }

    pub fn classify(&self, profile: &CustomerProfile, as_of: DateTime<Utc>) -> Segment {
        let recent_cutoff = days_before(as_of, self.config.recent_days);
        let is_recent = profile.last_visit >= recent_cutoff;
        let is_new = profile.first_visit >= recent_cutoff
            && profile.visit_count <= self.config.new_max_visits;

        if is_new {
            Segment::New
        } else if profile.visit_count >= self.config.vip_min_visits
            && profile.total_spent >= self.config.vip_min_spend
            && is_recent
        {
            Segment::Vip
        } else if profile.visit_count >= self.config.loyal_min_visits && is_recent {
            Segment::Loyal
        } else if is_recent {
            Segment::Regular
        } else if profile.days_since_last_visit(as_of) > self.config.at_risk_after_days as i64 {
            Segment::AtRisk
        } else {
            Segment::Regular
        }
    }

    pub fn segment(&self, transactions: &[TransactionRecord], as_of: DateTime<Utc>) -> SegmentationReport {
        let profiles = self.profiles(transactions, as_of);

        let mut members: HashMap<Segment, Vec<&CustomerProfile>> = HashMap::new();
        let mut assignments = Vec::with_capacity(profiles.len());
        for profile in &profiles {
            let segment = self.classify(profile, as_of);
            members.entry(segment).or_default().push(profile);
            assignments.push((profile.customer_id.clone(), segment));
        }

        let segments: Vec<SegmentStats> = Segment::ALL
            .iter()
            .map(|&segment| {
                let customers = members.get(&segment).map(Vec::as_slice).unwrap_or(&[]);
                let count = customers.len();
                let total_revenue: f64 = customers.iter().map(|c| c.total_spent).sum();
                let total_visits: u32 = customers.iter().map(|c| c.visit_count).sum();
                SegmentStats {
                    segment,
                    count,
                    total_revenue,
                    avg_visits: if count > 0 { total_visits as f64 / count as f64 } else { 0.0 },
                    avg_spend: if count > 0 { total_revenue / count as f64 } else { 0.0 },
                }
            })
            .collect();

        let mut report = SegmentationReport {
            total_customers: profiles.len(),
            segments,
            assignments,
            insights: Vec::new(),
            recommendations: Vec::new(),
        };
        report.insights = self.insights(&report, &profiles);
        report.recommendations = recommendations(&report);

        tracing::debug!(customers = report.total_customers, "Segmented customers");
        report
    }

    fn insights(&self, report: &SegmentationReport, profiles: &[CustomerProfile]) -> Vec<String> {
        let mut insights = Vec::new();
        let count = |segment| report.stats(segment).map_or(0, |s| s.count);

        if let Some(vip) = report.stats(Segment::Vip).filter(|s| s.count > 0) {
            let total: f64 = profiles.iter().map(|p| p.total_spent).sum();
            let share = if total > 0.0 { vip.total_revenue / total * 100.0 } else { 0.0 };
            insights.push(format!(
                "{} VIP customers generate {:.0}% of revenue",
                vip.count, share
            ));
        }
        if count(Segment::AtRisk) > 0 {
            insights.push(format!(
                "{} customers haven't visited in {}+ days - consider re-engagement",
                count(Segment::AtRisk),
                self.config.at_risk_after_days
            ));
        }
        if count(Segment::New) > 0 {
            insights.push(format!(
                "{} new customers in the last {} days",
                count(Segment::New),
                self.config.recent_days
            ));
        }

        insights
    }
}

impl Default for CustomerSegmenter {
    fn default() -> Self {
        Self::new(SegmentationConfig::default())
    }
}

fn recommendations(report: &SegmentationReport) -> Vec<String> {
    let count = |segment| report.stats(segment).map_or(0, |s| s.count);
    let mut recommendations = Vec::new();

    if count(Segment::AtRisk) > 5 {
        recommendations.push("Send promotional offers to at-risk customers".to_string());
    }
    if count(Segment::Vip) > 0 {
        recommendations.push("Consider VIP loyalty rewards program".to_string());
    }
    if count(Segment::New) > count(Segment::Loyal) {
        recommendations.push("Focus on retention - many new customers not returning".to_string());
    }

    recommendations
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

    fn visit(customer: &str, days_ago: i64, amount: f64) -> TransactionRecord {
        TransactionRecord {
            id: format!("{}-{}", customer, days_ago),
            branch_id: "b1".to_string(),
            customer_id: Some(customer.to_string()),
            barber_id: None,
            created_at: as_of() - Duration::days(days_ago),
            payment_status: PaymentStatus::Completed,
            services: vec![LineItem::new("s1", "Haircut", amount, 1)],
            products: vec![],
        }
    }

    #[test]
    fn test_frequent_big_spender_is_vip() {
        // 10 visits in the last 14 days, ₱20,000 total
        let transactions: Vec<_> = (0..10).map(|i| visit("ana", i + 1, 2000.0)).collect();

        let report = CustomerSegmenter::default().segment(&transactions, as_of());
        assert_eq!(report.segment_of("ana"), Some(Segment::Vip));
        let vip = report.stats(Segment::Vip).unwrap();
        assert_eq!(vip.count, 1);
        assert_eq!(vip.total_revenue, 20_000.0);
        assert_eq!(vip.avg_visits, 10.0);
    }

    #[test]
    fn test_long_absent_customer_is_at_risk() {
        let transactions = vec![visit("ben", 120, 500.0), visit("ben", 95, 500.0)];

        let report = CustomerSegmenter::default().segment(&transactions, as_of());
        assert_eq!(report.segment_of("ben"), Some(Segment::AtRisk));
        assert!(report.insights.iter().any(|i| i.contains("re-engagement")));
    }

    #[test]
    fn test_rule_order() {
        let transactions = vec![
            // first visit recent, two visits: new even with big spend
            visit("new", 3, 9000.0),
            visit("new", 1, 9000.0),
            // three recent visits, small spend: loyal
            visit("loyal", 50, 100.0),
            visit("loyal", 10, 100.0),
            visit("loyal", 5, 100.0),
            visit("loyal", 2, 100.0),
            // one old visit and one recent: regular
            visit("regular", 60, 300.0),
            visit("regular", 20, 300.0),
        ];

        let segmenter = CustomerSegmenter::default();
        let report = segmenter.segment(&transactions, as_of());
        assert_eq!(report.segment_of("new"), Some(Segment::New));
        assert_eq!(report.segment_of("loyal"), Some(Segment::Loyal));
        assert_eq!(report.segment_of("regular"), Some(Segment::Regular));
        assert_eq!(report.total_customers, 3);
    }

    #[test]
    fn test_walk_ins_and_refunds_are_skipped() {
        let mut walk_in = visit("x", 1, 500.0);
        walk_in.customer_id = None;
        let mut refunded = visit("y", 1, 500.0);
        refunded.payment_status = PaymentStatus::Refunded;

        let report = CustomerSegmenter::default().segment(&[walk_in, refunded], as_of());
        assert_eq!(report.total_customers, 0);
    }

    #[test]
    fn test_empty_input_lists_every_segment_with_zeros() {
        let report = CustomerSegmenter::default().segment(&[], as_of());
        assert_eq!(report.segments.len(), 5);
        assert!(report.segments.iter().all(|s| s.count == 0 && s.avg_spend == 0.0));
        assert!(report.insights.is_empty());
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn test_segment_stats_in_report_order() {
        let report = CustomerSegmenter::default().segment(&[], as_of());
        let order: Vec<_> = report.segments.iter().map(|s| s.segment.as_str()).collect();
        assert_eq!(order, vec!["vip", "loyal", "regular", "at_risk", "new"]);
    }

    #[test]
    fn test_visits_after_as_of_are_ignored() {
        let transactions = vec![visit("cara", 100, 500.0), visit("cara", -10, 500.0)];

        let report = CustomerSegmenter::default().segment(&transactions, as_of());
        assert_eq!(report.segment_of("cara"), Some(Segment::AtRisk));
        let at_risk = report.stats(Segment::AtRisk).unwrap();
        assert_eq!(at_risk.total_revenue, 500.0);
        assert_eq!(at_risk.avg_visits, 1.0);
    }
}
