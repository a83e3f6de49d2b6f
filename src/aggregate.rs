// 🏆 Report Aggregator - Leaderboards by barber, service, product, branch
//
// Groups a flat record list by an entity key, sums revenue and counts
// occurrences per key, then ranks by revenue descending. Ties keep the order
// in which keys were first seen.

use crate::records::TransactionRecord;
use crate::stats::finite_or_zero;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// GROUP KEY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKey {
    Barber,
    Service,
    Product,
    Branch,
    Customer,
}

impl std::str::FromStr for GroupKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "barber" => Ok(GroupKey::Barber),
            "service" => Ok(GroupKey::Service),
            "product" => Ok(GroupKey::Product),
            "branch" => Ok(GroupKey::Branch),
            "customer" => Ok(GroupKey::Customer),
            other => Err(format!(
                "unknown group key '{}' (expected barber, service, product, branch or customer)",
                other
            )),
        }
    }
}

// ============================================================================
// LEADERBOARD ENTRY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub key: String,
    pub name: String,
    pub revenue: f64,
    /// Number of records (or line items) tagged with this key
    pub count: usize,
    /// Summed quantity; equals `count` for whole-transaction keys
    pub units: u64,
}

// ============================================================================
// REPORT AGGREGATOR
// ============================================================================

/// Accumulates revenue per key while remembering first-seen order
#[derive(Debug, Default)]
pub struct ReportAggregator {
    entries: Vec<LeaderboardEntry>,
    index: HashMap<String, usize>,
}

impl ReportAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one occurrence of `key`
    pub fn add(&mut self, key: &str, name: &str, revenue: f64, units: u64) {
        let revenue = finite_or_zero(revenue);
        match self.index.get(key).copied() {
            Some(position) => {
                let entry = &mut self.entries[position];
                entry.revenue += revenue;
                entry.count += 1;
                entry.units += units;
            }
            None => {
                self.index.insert(key.to_string(), self.entries.len());
                self.entries.push(LeaderboardEntry {
                    key: key.to_string(),
                    name: name.to_string(),
                    revenue,
                    count: 1,
                    units,
                });
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries by revenue descending, truncated to `top_n`
    ///
    /// `sort_by` is stable, so equal revenue keeps first-seen order.
    pub fn ranked(mut self, top_n: usize) -> Vec<LeaderboardEntry> {
        self.entries.sort_by(|a, b| b.revenue.total_cmp(&a.revenue));
        self.entries.truncate(top_n);
        self.entries
    }

    /// Group completed transactions by `key`
    ///
    /// Service and product keys aggregate line items; the other keys use
    /// whole-transaction totals and skip records that lack the key.
    pub fn from_transactions(transactions: &[TransactionRecord], key: GroupKey) -> Self {
        let mut aggregator = ReportAggregator::new();

        for tx in transactions.iter().filter(|tx| tx.is_completed()) {
            match key {
                GroupKey::Service => {
                    for item in &tx.services {
                        aggregator.add(&item.item_id, &item.name, item.revenue(), item.quantity as u64);
                    }
                }
                GroupKey::Product => {
                    for item in &tx.products {
                        aggregator.add(&item.item_id, &item.name, item.revenue(), item.quantity as u64);
                    }
                }
                GroupKey::Barber => {
                    if let Some(barber) = &tx.barber_id {
                        aggregator.add(barber, barber, tx.total(), 1);
                    }
                }
                GroupKey::Branch => {
                    aggregator.add(&tx.branch_id, &tx.branch_id, tx.total(), 1);
                }
                GroupKey::Customer => {
                    if let Some(customer) = &tx.customer_id {
                        aggregator.add(customer, customer, tx.total(), 1);
                    }
                }
            }
        }

        tracing::debug!(?key, keys = aggregator.len(), "Aggregated transactions");
        aggregator
    }
}

/// Leaderboard of completed transactions grouped by `key`
pub fn leaderboard(
    transactions: &[TransactionRecord],
    key: GroupKey,
    top_n: usize,
) -> Vec<LeaderboardEntry> {
    ReportAggregator::from_transactions(transactions, key).ranked(top_n)
}

// ============================================================================
// TESTS
// ============================================================================
