// 📦 Reorder Alerts - Stock level + sales velocity thresholds
//
// Sales velocity comes from completed transactions in the velocity window.
// Classification, first match wins:
//   out_of_stock  stock == 0
//   critical      stock <= reorder / 2, or <= critical days of stock left
//   low           stock <= reorder, or <= low days of stock left
//   adequate      otherwise

use crate::config::InventoryConfig;
use crate::period::days_before;
use crate::records::{ProductStock, TransactionRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Days of stock reported for products that are not selling
pub const NO_SALES_DAYS_OF_STOCK: f64 = 999.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockLevel {
    OutOfStock,
    Critical,
    Low,
    Adequate,
}

/// Ordered most urgent first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Critical,
    High,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReorderSuggestion {
    pub product_id: String,
    pub product_name: String,
    pub current_stock: u32,
    pub reorder_level: u32,
    pub suggested_order: u32,
    pub urgency: Urgency,
    pub level: StockLevel,
    pub units_sold: u64,
    pub daily_velocity: f64,
    pub days_of_stock: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventorySummary {
    pub total_products: usize,
    pub out_of_stock: usize,
    pub critical: usize,
    pub low_stock: usize,
    pub adequate: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorderReport {
    pub summary: InventorySummary,
    pub alerts: Vec<ReorderSuggestion>,
    /// Adequate share of active products in percent; None when there are none
    pub inventory_health: Option<f64>,
}

impl ReorderReport {
    pub fn health_label(&self) -> String {
        match self.inventory_health {
            Some(pct) => format!("{:.0}%", pct),
            None => "N/A".to_string(),
        }
    }
}

pub struct ReorderPlanner {
    config: InventoryConfig,
}

impl ReorderPlanner {
    pub fn new(config: InventoryConfig) -> Self {
        ReorderPlanner { config }
    }

    pub fn plan(
        &self,
        products: &[ProductStock],
        transactions: &[TransactionRecord],
        as_of: DateTime<Utc>,
    ) -> ReorderReport {
        let window_days = self.config.velocity_window_days as f64;
        let window_start = days_before(as_of, self.config.velocity_window_days);

        let mut units_sold: HashMap<&str, u64> = HashMap::new();
        for tx in transactions
            .iter()
            .filter(|tx| tx.is_completed() && tx.created_at >= window_start && tx.created_at <= as_of)
        {
            for item in &tx.products {
                *units_sold.entry(item.item_id.as_str()).or_insert(0) += item.quantity as u64;
            }
        }

        let mut summary = InventorySummary::default();
        let mut alerts = Vec::new();

        for product in products.iter().filter(|p| p.active) {
            summary.total_products += 1;

            let sold = units_sold.get(product.id.as_str()).copied().unwrap_or(0);
            let daily_velocity = sold as f64 / window_days;
            let days_of_stock = if daily_velocity > 0.0 {
                product.stock as f64 / daily_velocity
            } else {
                NO_SALES_DAYS_OF_STOCK
            };

            let reorder_level = product.reorder_level();
            let level = self.classify(product.stock, reorder_level, days_of_stock);
            match level {
                StockLevel::OutOfStock => summary.out_of_stock += 1,
                StockLevel::Critical => summary.critical += 1,
                StockLevel::Low => summary.low_stock += 1,
                StockLevel::Adequate => {
                    summary.adequate += 1;
                    continue;
                }
            }

            let target = (daily_velocity * self.config.target_days_of_stock).ceil() as u32;
            let urgency = if product.stock == 0 {
                Urgency::Critical
            } else if (product.stock as f64) <= reorder_level as f64 / 2.0 {
                Urgency::High
            } else {
                Urgency::Medium
            };
            let reason = if product.stock == 0 {
                "Out of stock".to_string()
            } else if days_of_stock <= self.config.critical_days_of_stock {
                format!("Only {:.0} days of stock left", days_of_stock)
            } else {
                format!("Stock below reorder level ({})", reorder_level)
            };

            alerts.push(ReorderSuggestion {
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                current_stock: product.stock,
                reorder_level,
                suggested_order: reorder_level.saturating_mul(2).max(target),
                urgency,
                level,
                units_sold: sold,
                daily_velocity,
                days_of_stock,
                reason,
            });
        }

        // Stable: equal urgency keeps product order
        alerts.sort_by_key(|a| a.urgency);

        let inventory_health = if summary.total_products > 0 {
            Some(summary.adequate as f64 / summary.total_products as f64 * 100.0)
        } else {
            None
        };

        tracing::debug!(
            products = summary.total_products,
            alerts = alerts.len(),
            "Planned reorders"
        );

        ReorderReport {
            summary,
            alerts,
            inventory_health,
        }
    }

    fn classify(&self, stock: u32, reorder_level: u32, days_of_stock: f64) -> StockLevel {
        let stock_f = stock as f64;
        if stock == 0 {
            StockLevel::OutOfStock
        } else if stock_f <= reorder_level as f64 / 2.0
            || days_of_stock <= self.config.critical_days_of_stock
        {
            StockLevel::Critical
        } else if stock <= reorder_level || days_of_stock <= self.config.low_days_of_stock {
            StockLevel::Low
        } else {
            StockLevel::Adequate
        }
    }
}

impl Default for ReorderPlanner {
    fn default() -> Self {
        Self::new(InventoryConfig::default())
    }
}
