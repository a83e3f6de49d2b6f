// 📣 Marketing Plan - Campaigns, targeting, pricing, timing, cross-sell
//
// Everything is derived from the recent window (window_days before as_of)
// and the window of equal length before it:
//   promotions   triggered by revenue trend and service/product rankings
//   targeting    customer profiles bucketed by last visit and spend
//   pricing      average ticket change, product share, top-service demand
//   timing       busiest and slowest weekday from recent bookings
//   cross-sell   product most often bought with each service

use crate::aggregate::{GroupKey, LeaderboardEntry, ReportAggregator};
use crate::config::{MarketingConfig, SegmentationConfig};
use crate::period::days_before;
use crate::records::{BookingRecord, TransactionRecord};
use crate::segmentation::CustomerSegmenter;
use crate::stats::percent_change;
use chrono::{DateTime, Datelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

// ============================================================================
// PROMOTIONS
// ============================================================================

/// Ordered most important first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionKind {
    FlashSale,
    Bundle,
    Loyalty,
    SlowDay,
    Upsell,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Promotion {
    #[serde(rename = "type")]
    pub kind: PromotionKind,
    pub priority: Priority,
    pub title: String,
    pub description: String,
    pub target_audience: String,
    pub suggested_discount: String,
    pub best_timing: String,
    pub expected_impact: String,
}

impl Promotion {
    fn new(kind: PromotionKind, priority: Priority, title: impl Into<String>, description: impl Into<String>) -> Self {
        Promotion {
            kind,
            priority,
            title: title.into(),
            description: description.into(),
            target_audience: String::new(),
            suggested_discount: String::new(),
            best_timing: String::new(),
            expected_impact: String::new(),
        }
    }

    fn offer(mut self, audience: &str, discount: &str, timing: &str, impact: &str) -> Self {
        self.target_audience = audience.to_string();
        self.suggested_discount = discount.to_string();
        self.best_timing = timing.to_string();
        self.expected_impact = impact.to_string();
        self
    }
}

// ============================================================================
// TARGETING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    AtRisk,
    Lost,
    Vip,
    New,
}

impl Audience {
    pub fn label(&self) -> &'static str {
        match self {
            Audience::AtRisk => "At-Risk Customers",
            Audience::Lost => "Lost Customers",
            Audience::Vip => "VIP Customers",
            Audience::New => "New Customers",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignUrgency {
    Immediate,
    ThisWeek,
    ThisMonth,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetingStrategy {
    pub audience: Audience,
    pub customers: usize,
    pub strategy: String,
    pub action: String,
    pub message_template: String,
    pub channel: String,
    pub urgency: CampaignUrgency,
}

// ============================================================================
// PRICING, TIMING, CROSS-SELL
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingKind {
    UpsellTraining,
    ProductPromotion,
    PremiumPricing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingInsight {
    #[serde(rename = "type")]
    pub kind: PricingKind,
    pub suggestion: String,
    pub rationale: String,
    pub potential_impact: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingRecommendation {
    pub insight: String,
    pub recommendation: String,
    pub action: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossSellSuggestion {
    pub if_customer_buys: String,
    pub recommend: String,
    /// Recent transactions containing both; 0 for the top-seller fallback
    pub pairings: u32,
    pub reason: String,
    /// Estimated acceptance in percent; None for the top-seller fallback
    pub success_rate_pct: Option<u32>,
}

// ============================================================================
// REPORT
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketingSummary {
    pub total_campaigns: usize,
    pub high_priority: usize,
    pub customers_to_target: usize,
    /// Revenue change against the previous window in percent; 0 without a base
    pub revenue_trend: f64,
    pub avg_ticket: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketingReport {
    pub promotions: Vec<Promotion>,
    pub targeting: Vec<TargetingStrategy>,
    pub pricing: Vec<PricingInsight>,
    pub timing: Vec<TimingRecommendation>,
    pub cross_sell: Vec<CrossSellSuggestion>,
    pub summary: MarketingSummary,
}

// ============================================================================
// MARKETING PLANNER
// ============================================================================

/// Revenue figures for one window
struct WindowTotals {
    revenue: f64,
    count: usize,
}

impl WindowTotals {
    fn of<'a>(transactions: impl Iterator<Item = &'a TransactionRecord>) -> Self {
        transactions.fold(WindowTotals { revenue: 0.0, count: 0 }, |acc, tx| WindowTotals {
            revenue: acc.revenue + tx.total(),
            count: acc.count + 1,
        })
    }

    fn avg_ticket(&self) -> f64 {
        if self.count > 0 {
            self.revenue / self.count as f64
        } else {
            0.0
        }
    }
}

pub struct MarketingPlanner {
    config: MarketingConfig,
    segmentation: SegmentationConfig,
}

impl MarketingPlanner {
    pub fn new(config: MarketingConfig, segmentation: SegmentationConfig) -> Self {
        MarketingPlanner { config, segmentation }
    }

    pub fn plan(
        &self,
        transactions: &[TransactionRecord],
        bookings: &[BookingRecord],
        as_of: DateTime<Utc>,
    ) -> MarketingReport {
        let recent_start = days_before(as_of, self.config.window_days);
        let previous_start = days_before(recent_start, self.config.window_days);

        let recent: Vec<TransactionRecord> = transactions
            .iter()
            .filter(|tx| tx.is_completed() && tx.created_at >= recent_start && tx.created_at <= as_of)
            .cloned()
            .collect();
        let current = WindowTotals::of(recent.iter());
        let previous = WindowTotals::of(
            transactions
                .iter()
                .filter(|tx| tx.is_completed() && tx.created_at >= previous_start && tx.created_at < recent_start),
        );

        let services = ReportAggregator::from_transactions(&recent, GroupKey::Service).ranked(usize::MAX);
        let products = ReportAggregator::from_transactions(&recent, GroupKey::Product).ranked(usize::MAX);

        let revenue_trend = percent_change(current.revenue, previous.revenue).unwrap_or(0.0);
        let ticket_change = percent_change(current.avg_ticket(), previous.avg_ticket()).unwrap_or(0.0);

        let promotions = self.promotions(&services, &products, revenue_trend, as_of);
        let (targeting, customers_to_target) = self.targeting(transactions, as_of);
        let pricing = self.pricing(&services, &products, current.revenue, ticket_change);
        let timing = timing(bookings, recent_start, as_of);
        let cross_sell = self.cross_sell(&recent, &services, &products);

        let summary = MarketingSummary {
            total_campaigns: promotions.len(),
            high_priority: promotions.iter().filter(|p| p.priority == Priority::High).count(),
            customers_to_target,
            revenue_trend,
            avg_ticket: current.avg_ticket(),
        };

        tracing::debug!(
            recent_transactions = recent.len(),
            campaigns = summary.total_campaigns,
            customers_to_target,
            "Built marketing plan"
        );

        MarketingReport {
            promotions,
            targeting,
            pricing,
            timing,
            cross_sell,
            summary,
        }
    }

    fn promotions(
        &self,
        services: &[LeaderboardEntry],
        products: &[LeaderboardEntry],
        revenue_trend: f64,
        as_of: DateTime<Utc>,
    ) -> Vec<Promotion> {
        let mut promotions = Vec::new();

        if revenue_trend < self.config.flash_sale_below_pct {
            promotions.push(
                Promotion::new(
                    PromotionKind::FlashSale,
                    Priority::High,
                    "Revenue Recovery Flash Sale",
                    format!(
                        "Revenue is down {:.1}% on the previous period. Run a limited-time discount with a visible deadline.",
                        revenue_trend.abs()
                    ),
                )
                .offer("All customers", "20-30% off selected services", "This weekend", "15-25% revenue increase"),
            );
        }

        // `services` is ranked by revenue, so equal unit counts favour the bigger earner
        let slowest = services
            .iter()
            .filter(|s| s.units < self.config.low_service_max_units)
            .min_by_key(|s| s.units);
        if let Some(service) = slowest {
            promotions.push(
                Promotion::new(
                    PromotionKind::Bundle,
                    Priority::Medium,
                    format!("Bundle Promotion: {}", service.name),
                    format!(
                        "\"{}\" sold only {} time(s). Pair it with a popular service to increase exposure.",
                        service.name, service.units
                    ),
                )
                .offer(
                    "Existing customers",
                    "15% off when bundled with top service",
                    "Mid-week (Tue-Thu)",
                    "Increase service bookings by 30%",
                ),
            );
        }

        if let Some(top) = services.first() {
            promotions.push(
                Promotion::new(
                    PromotionKind::Loyalty,
                    Priority::High,
                    format!("VIP Reward: {} Loyalty", top.name),
                    "Reward frequent customers of your top service with a free upgrade or discount after 5 visits.",
                )
                .offer("Repeat customers", "6th service 50% off", "Ongoing program", "Increase retention by 40%"),
            );
        }

        if matches!(as_of.weekday(), Weekday::Mon | Weekday::Tue | Weekday::Wed) {
            promotions.push(
                Promotion::new(
                    PromotionKind::SlowDay,
                    Priority::Medium,
                    "Midweek Special",
                    "Boost slow midweek traffic with offers valid only Tuesday-Wednesday.",
                )
                .offer(
                    "Price-conscious customers",
                    "15% off all services",
                    "Tuesday-Wednesday only",
                    "Fill 20% more slots",
                ),
            );
        }

        if let Some(top) = products.first() {
            promotions.push(
                Promotion::new(
                    PromotionKind::Upsell,
                    Priority::Medium,
                    "Service + Product Bundle",
                    format!(
                        "Recommend {} during service checkout. Train staff to mention product benefits.",
                        top.name
                    ),
                )
                .offer(
                    "Service customers",
                    "10% off product with any service",
                    "At checkout",
                    "Increase product revenue by 25%",
                ),
            );
        }

        // Stable: equal priority keeps trigger order
        promotions.sort_by_key(|p| p.priority);
        promotions
    }

    /// Strategies per customer bucket, plus how many customers they reach
    ///
    /// Profiles cover every completed transaction up to `as_of`, not only the
    /// recent window, so lapsed customers are still found.
    fn targeting(&self, transactions: &[TransactionRecord], as_of: DateTime<Utc>) -> (Vec<TargetingStrategy>, usize) {
        let profiles = CustomerSegmenter::new(self.segmentation.clone()).profiles(transactions, as_of);
        let recent_start = days_before(as_of, self.config.window_days);
        let lost_start = days_before(as_of, self.config.lost_after_days);

        let at_risk = profiles
            .iter()
            .filter(|p| p.last_visit < recent_start && p.last_visit >= lost_start)
            .count();
        let lost = profiles.iter().filter(|p| p.last_visit < lost_start).count();
        let vip = profiles
            .iter()
            .filter(|p| {
                p.visit_count >= self.segmentation.vip_min_visits && p.total_spent >= self.segmentation.vip_min_spend
            })
            .count();
        let new = profiles
            .iter()
            .filter(|p| p.visit_count == 1 && p.last_visit >= recent_start)
            .count();

        let buckets = [
            (
                Audience::AtRisk,
                at_risk,
                "Win-Back Campaign",
                "Send a personalised re-engagement offer",
                "We miss you! It's been a while since your last visit. Here's 20% off your next service, valid this week only.",
                "SMS + Email",
                CampaignUrgency::Immediate,
            ),
            (
                Audience::Lost,
                lost,
                "Reactivation Campaign",
                "Win back with a high-value offer",
                "We want you back! Enjoy 30% off plus a free product sample on your return visit. Limited slots available.",
                "SMS + Email + Call",
                CampaignUrgency::ThisWeek,
            ),
            (
                Audience::Vip,
                vip,
                "VIP Appreciation",
                "Exclusive perks and early access",
                "You're a VIP! Enjoy priority booking and 15% off our new services.",
                "Personalised SMS",
                CampaignUrgency::ThisMonth,
            ),
            (
                Audience::New,
                new,
                "Second Visit Incentive",
                "Convert one-time visitors to regulars",
                "Thanks for visiting! Book your second appointment this month and get 15% off.",
                "SMS + App Push",
                CampaignUrgency::Immediate,
            ),
        ];

        let strategies = buckets
            .into_iter()
            .filter(|bucket| bucket.1 > 0)
            .map(
                |(audience, customers, strategy, action, message, channel, urgency)| TargetingStrategy {
                    audience,
                    customers,
                    strategy: strategy.to_string(),
                    action: action.to_string(),
                    message_template: message.to_string(),
                    channel: channel.to_string(),
                    urgency,
                },
            )
            .collect();

        (strategies, at_risk + lost + new)
    }

    fn pricing(
        &self,
        services: &[LeaderboardEntry],
        products: &[LeaderboardEntry],
        current_revenue: f64,
        ticket_change: f64,
    ) -> Vec<PricingInsight> {
        let mut insights = Vec::new();

        if ticket_change < -self.config.ticket_drop_pct {
            insights.push(PricingInsight {
                kind: PricingKind::UpsellTraining,
                suggestion: "Train staff on upselling techniques".to_string(),
                rationale: format!(
                    "Average ticket dropped {:.1}%. Staff should recommend add-ons and premium options.",
                    ticket_change.abs()
                ),
                potential_impact: "+₱50-100 per transaction".to_string(),
            });
        }

        if current_revenue > 0.0 {
            let product_revenue: f64 = products.iter().map(|p| p.revenue).sum();
            let share = product_revenue / current_revenue;
            if share < self.config.product_share_target {
                insights.push(PricingInsight {
                    kind: PricingKind::ProductPromotion,
                    suggestion: "Increase product visibility and staff incentives".to_string(),
                    rationale: format!(
                        "Products contribute only {:.1}% of revenue, below the {:.0}% target.",
                        share * 100.0,
                        self.config.product_share_target * 100.0
                    ),
                    potential_impact: "+15-20% product sales".to_string(),
                });
            }
        }

        if let Some(top) = services.first().filter(|s| s.units > self.config.premium_min_units) {
            let avg_price = top.revenue / top.units as f64;
            let impact = (avg_price * self.config.premium_uplift * top.units as f64).round();
            insights.push(PricingInsight {
                kind: PricingKind::PremiumPricing,
                suggestion: format!("Consider premium pricing for \"{}\"", top.name),
                rationale: format!(
                    "High demand ({} sold) suggests room for a 5-10% price increase without losing customers.",
                    top.units
                ),
                potential_impact: format!("+₱{:.0} monthly", impact),
            });
        }

        insights
    }

    fn cross_sell(
        &self,
        recent: &[TransactionRecord],
        services: &[LeaderboardEntry],
        products: &[LeaderboardEntry],
    ) -> Vec<CrossSellSuggestion> {
        // Service name -> product name -> co-occurrences, in first-seen order
        let mut pairings: Vec<(&str, Vec<(&str, u32)>)> = Vec::new();
        for tx in recent {
            for service in &tx.services {
                let position = match pairings.iter().position(|(name, _)| *name == service.name) {
                    Some(position) => position,
                    None => {
                        pairings.push((service.name.as_str(), Vec::new()));
                        pairings.len() - 1
                    }
                };
                let counts = &mut pairings[position].1;
                for product in &tx.products {
                    match counts.iter_mut().find(|(name, _)| *name == product.name) {
                        Some((_, count)) => *count += 1,
                        None => counts.push((product.name.as_str(), 1)),
                    }
                }
            }
        }

        let mut suggestions: Vec<CrossSellSuggestion> = Vec::new();
        for (service, counts) in &pairings {
            let mut best: Option<(&str, u32)> = None;
            for &(product, count) in counts {
                if best.map_or(true, |(_, top)| count > top) {
                    best = Some((product, count));
                }
            }
            if let Some((product, count)) = best.filter(|&(_, count)| count >= self.config.min_pairings) {
                suggestions.push(CrossSellSuggestion {
                    if_customer_buys: service.to_string(),
                    recommend: product.to_string(),
                    pairings: count,
                    reason: format!("{} customers bought this combo in the recent period", count),
                    success_rate_pct: Some(count.saturating_mul(5).saturating_add(50).min(95)),
                });
            }
        }

        if suggestions.is_empty() {
            if let (Some(service), Some(product)) = (services.first(), products.first()) {
                suggestions.push(CrossSellSuggestion {
                    if_customer_buys: service.name.clone(),
                    recommend: product.name.clone(),
                    pairings: 0,
                    reason: "Top service + top product pairing".to_string(),
                    success_rate_pct: None,
                });
            }
        }

        suggestions
    }
}

impl Default for MarketingPlanner {
    fn default() -> Self {
        Self::new(MarketingConfig::default(), SegmentationConfig::default())
    }
}

/// Busiest and slowest weekday by bookings created in the window
///
/// Ties go to the earlier day (Sunday first) for the busiest day and to the
/// later day for the slowest. No bookings gives no recommendations.
fn timing(bookings: &[BookingRecord], start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<TimingRecommendation> {
    let mut per_day = [0usize; 7];
    let mut total = 0;
    for booking in bookings.iter().filter(|b| b.created_at >= start && b.created_at <= end) {
        per_day[booking.created_at.weekday().num_days_from_sunday() as usize] += 1;
        total += 1;
    }
    if total == 0 {
        return Vec::new();
    }

    let mut busiest = 0;
    let mut slowest = 0;
    for day in 1..7 {
        if per_day[day] > per_day[busiest] {
            busiest = day;
        }
        if per_day[day] <= per_day[slowest] {
            slowest = day;
        }
    }
    let (busiest, slowest) = (DAY_NAMES[busiest], DAY_NAMES[slowest]);

    vec![
        TimingRecommendation {
            insight: format!("{} is your busiest day", busiest),
            recommendation: "Maximize revenue on peak days".to_string(),
            action: format!(
                "Schedule your best staff on {}. Consider premium pricing or no discounts on this day.",
                busiest
            ),
        },
        TimingRecommendation {
            insight: format!("{} has lowest traffic", slowest),
            recommendation: "Run promotions on slow days".to_string(),
            action: format!(
                "Offer \"{} Special\" discounts to fill empty slots. Target price-conscious customers.",
                slowest
            ),
        },
    ]
}

const DAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{BookingStatus, LineItem, PaymentStatus};
    use chrono::{Duration, TimeZone};

    /// A Thursday, so no midweek promotion unless a test moves the date
    fn as_of() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 3, 12, 0, 0).unwrap()
    }

    fn sale(id: &str, customer: Option<&str>, days_ago: i64, services: Vec<LineItem>, products: Vec<LineItem>) -> TransactionRecord {
        TransactionRecord {
            id: id.to_string(),
            branch_id: "b1".to_string(),
            customer_id: customer.map(str::to_string),
            barber_id: None,
            created_at: as_of() - Duration::days(days_ago),
            payment_status: PaymentStatus::Completed,
            services,
            products,
        }
    }

    fn haircut(price: f64) -> LineItem {
        LineItem::new("cut", "Haircut", price, 1)
    }

    fn booking(id: &str, at: DateTime<Utc>) -> BookingRecord {
        BookingRecord {
            id: id.to_string(),
            branch_id: "b1".to_string(),
            customer_id: None,
            barber_id: None,
            service_id: "cut".to_string(),
            created_at: at,
            status: BookingStatus::Booked,
            price: 300.0,
        }
    }

    #[test]
    fn test_revenue_drop_triggers_flash_sale_first() {
        // Previous window ₱10,000; recent window ₱3,000
        let mut transactions: Vec<_> = (0..10)
            .map(|i| sale(&format!("old{}", i), None, 40 + i, vec![haircut(1000.0)], vec![]))
            .collect();
        transactions.extend((0..3).map(|i| {
            sale(&format!("new{}", i), None, 1 + i, vec![haircut(500.0)], vec![LineItem::new("wax", "Wax", 500.0, 1)])
        }));

        let report = MarketingPlanner::default().plan(&transactions, &[], as_of());
        assert!((report.summary.revenue_trend + 70.0).abs() < 1e-9);
        assert_eq!(report.promotions[0].kind, PromotionKind::FlashSale);
        assert!(report.promotions.windows(2).all(|w| w[0].priority <= w[1].priority));
        assert_eq!(report.summary.high_priority, 2);

        let kinds: Vec<_> = report.promotions.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![PromotionKind::FlashSale, PromotionKind::Loyalty, PromotionKind::Bundle, PromotionKind::Upsell]
        );
        assert_eq!(report.summary.avg_ticket, 1000.0);
    }

    #[test]
    fn test_midweek_special_only_early_in_the_week() {
        let transactions = vec![sale("t1", None, 1, vec![haircut(300.0)], vec![])];
        let monday = Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap();

        let planner = MarketingPlanner::default();
        let early = planner.plan(&transactions, &[], monday);
        assert!(early.promotions.iter().any(|p| p.kind == PromotionKind::SlowDay));

        let late = planner.plan(&transactions, &[], as_of());
        assert!(late.promotions.iter().all(|p| p.kind != PromotionKind::SlowDay));
    }

    #[test]
    fn test_customers_bucketed_by_last_visit_and_spend() {
        let transactions = vec![
            // at risk: last seen 45 days ago
            sale("a1", Some("ana"), 45, vec![haircut(300.0)], vec![]),
            // lost: last seen 120 days ago
            sale("b1", Some("ben"), 120, vec![haircut(300.0)], vec![]),
            // new: one visit last week
            sale("c1", Some("cy"), 7, vec![haircut(300.0)], vec![]),
            // vip: four visits, ₱6,000
            sale("d1", Some("dee"), 50, vec![haircut(1500.0)], vec![]),
            sale("d2", Some("dee"), 30, vec![haircut(1500.0)], vec![]),
            sale("d3", Some("dee"), 10, vec![haircut(1500.0)], vec![]),
            sale("d4", Some("dee"), 2, vec![haircut(1500.0)], vec![]),
            // walk-in
            sale("w1", None, 3, vec![haircut(300.0)], vec![]),
            // after as_of, ignored
            sale("f1", Some("fay"), -5, vec![haircut(300.0)], vec![]),
        ];

        let report = MarketingPlanner::default().plan(&transactions, &[], as_of());
        let audiences: Vec<_> = report.targeting.iter().map(|t| (t.audience, t.customers)).collect();
        assert_eq!(
            audiences,
            vec![(Audience::AtRisk, 1), (Audience::Lost, 1), (Audience::Vip, 1), (Audience::New, 1)]
        );
        assert_eq!(report.targeting[0].urgency, CampaignUrgency::Immediate);
        assert_eq!(report.targeting[1].urgency, CampaignUrgency::ThisWeek);
        assert_eq!(report.summary.customers_to_target, 3);
    }

    #[test]
    fn test_pricing_flags_ticket_drop_low_product_share_and_demand() {
        // Previous: 10 x ₱1,000. Recent: 25 haircuts at ₱400, one ₱100 product
        let mut transactions: Vec<_> = (0..10)
            .map(|i| sale(&format!("old{}", i), None, 35 + i, vec![haircut(1000.0)], vec![]))
            .collect();
        transactions.extend((0..25).map(|i| sale(&format!("new{}", i), None, i % 20, vec![haircut(400.0)], vec![])));
        transactions.push(sale("gel", None, 1, vec![], vec![LineItem::new("gel", "Gel", 100.0, 1)]));

        let report = MarketingPlanner::default().plan(&transactions, &[], as_of());
        let kinds: Vec<_> = report.pricing.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![PricingKind::UpsellTraining, PricingKind::ProductPromotion, PricingKind::PremiumPricing]
        );
        // 400 * 0.07 * 25
        assert_eq!(report.pricing[2].potential_impact, "+₱700 monthly");
    }

    #[test]
    fn test_cross_sell_uses_frequent_pairs_or_falls_back_to_top_sellers() {
        let pomade = || LineItem::new("pom", "Pomade", 250.0, 1);
        let mut transactions: Vec<_> = (0..4)
            .map(|i| sale(&format!("p{}", i), None, i, vec![haircut(300.0)], vec![pomade()]))
            .collect();

        let report = MarketingPlanner::default().plan(&transactions, &[], as_of());
        assert_eq!(report.cross_sell.len(), 1);
        assert_eq!(report.cross_sell[0].recommend, "Pomade");
        assert_eq!(report.cross_sell[0].pairings, 4);
        assert_eq!(report.cross_sell[0].success_rate_pct, Some(70));

        transactions.truncate(2);
        let report = MarketingPlanner::default().plan(&transactions, &[], as_of());
        assert_eq!(report.cross_sell[0].if_customer_buys, "Haircut");
        assert_eq!(report.cross_sell[0].success_rate_pct, None);
    }

    #[test]
    fn test_timing_names_busiest_and_slowest_weekday() {
        // 2025-07-03 is a Thursday
        let thursday = as_of() - Duration::hours(1);
        let bookings = vec![
            booking("b1", thursday),
            booking("b2", thursday),
            booking("b3", thursday - Duration::days(1)),
        ];

        let report = MarketingPlanner::default().plan(&[], &bookings, as_of());
        assert_eq!(report.timing.len(), 2);
        assert_eq!(report.timing[0].insight, "Thursday is your busiest day");
        assert_eq!(report.timing[1].insight, "Saturday has lowest traffic");

        let empty = MarketingPlanner::default().plan(&[], &[], as_of());
        assert!(empty.timing.is_empty());
        assert!(empty.promotions.is_empty());
        assert_eq!(empty.summary, MarketingSummary::default());
    }
}
