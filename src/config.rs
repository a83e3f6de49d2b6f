// Analytics configuration.
//
// Every threshold the engines use is a business rule that product owners may
// tune, so all of them live here. Defaults reproduce the production values;
// an empty TOML file is a valid configuration.

use crate::error::{InsightsError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub health: HealthConfig,
    pub anomaly: AnomalyConfig,
    pub forecast: ForecastConfig,
    pub segmentation: SegmentationConfig,
    pub inventory: InventoryConfig,
    pub marketing: MarketingConfig,
    pub report: ReportConfig,
}

// ============================================================================
// SECTIONS
// ============================================================================

/// Sub-score weights for the branch health score (must sum to 100)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub window_days: u32,
    pub revenue_weight: f64,
    pub booking_weight: f64,
    pub cancellation_weight: f64,
    pub transaction_weight: f64,
    pub inventory_weight: f64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        HealthConfig {
            window_days: 30,
            revenue_weight: 25.0,
            booking_weight: 20.0,
            cancellation_weight: 15.0,
            transaction_weight: 20.0,
            inventory_weight: 20.0,
        }
    }
}

impl HealthConfig {
    pub fn total_weight(&self) -> f64 {
        self.revenue_weight
            + self.booking_weight
            + self.cancellation_weight
            + self.transaction_weight
            + self.inventory_weight
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    pub window_days: u32,
    /// |z| above which a single transaction amount is flagged
    pub amount_z_threshold: f64,
    /// |z| above which a day's transaction count is flagged
    pub volume_z_threshold: f64,
    pub min_transactions: usize,
    pub max_reported: usize,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        AnomalyConfig {
            window_days: 30,
            amount_z_threshold: 2.5,
            volume_z_threshold: 2.0,
            min_transactions: 10,
            max_reported: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub lookback_days: u32,
    pub short_window: usize,
    pub long_window: usize,
    pub horizon_days: u32,
    /// Relative trend beyond which the label is upward/downward
    pub stable_band: f64,
    pub monthly_lookback_days: u32,
    pub horizon_months: u32,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        ForecastConfig {
            lookback_days: 90,
            short_window: 7,
            long_window: 30,
            horizon_days: 7,
            stable_band: 0.10,
            monthly_lookback_days: 180,
            horizon_months: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    pub recent_days: u32,
    pub new_max_visits: u32,
    pub vip_min_visits: u32,
    pub vip_min_spend: f64,
    pub loyal_min_visits: u32,
    pub at_risk_after_days: u32,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        SegmentationConfig {
            recent_days: 30,
            new_max_visits: 2,
            vip_min_visits: 4,
            vip_min_spend: 5000.0,
            loyal_min_visits: 3,
            at_risk_after_days: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    pub velocity_window_days: u32,
    pub critical_days_of_stock: f64,
    pub low_days_of_stock: f64,
    pub target_days_of_stock: f64,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        InventoryConfig {
            velocity_window_days: 30,
            critical_days_of_stock: 7.0,
            low_days_of_stock: 14.0,
            target_days_of_stock: 30.0,
        }
    }
}

/// Campaign triggers for the marketing plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketingConfig {
    pub window_days: u32,
    /// Customers unseen for longer than this are lost rather than at risk
    pub lost_after_days: u32,
    /// Revenue change (percent) below which a flash sale is proposed
    pub flash_sale_below_pct: f64,
    /// Services sold fewer times than this get a bundle promotion
    pub low_service_max_units: u64,
    /// Average ticket drop (percent) that triggers upsell training
    pub ticket_drop_pct: f64,
    /// Product share of revenue below which products need promoting
    pub product_share_target: f64,
    pub premium_min_units: u64,
    /// Price increase assumed when estimating premium pricing impact
    pub premium_uplift: f64,
    pub min_pairings: u32,
}

impl Default for MarketingConfig {
    fn default() -> Self {
        MarketingConfig {
            window_days: 30,
            lost_after_days: 90,
            flash_sale_below_pct: -10.0,
            low_service_max_units: 5,
            ticket_drop_pct: 5.0,
            product_share_target: 0.15,
            premium_min_units: 20,
            premium_uplift: 0.07,
            min_pairings: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub top_n: usize,
    /// Percentage drop that marks a branch as declining
    pub decline_threshold_pct: f64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            top_n: 10,
            decline_threshold_pct: -10.0,
        }
    }
}

// ============================================================================
// LOADING & VALIDATION
// ============================================================================

impl AnalyticsConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!(path = %path.as_ref().display(), "Loaded analytics configuration");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AnalyticsConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let weights = [
            ("health.revenue_weight", self.health.revenue_weight),
            ("health.booking_weight", self.health.booking_weight),
            ("health.cancellation_weight", self.health.cancellation_weight),
            ("health.transaction_weight", self.health.transaction_weight),
            ("health.inventory_weight", self.health.inventory_weight),
        ];
        for (field, weight) in weights {
            non_negative(field, weight)?;
        }
        let total = self.health.total_weight();
        if (total - 100.0).abs() > 1e-6 {
            return Err(InsightsError::invalid_config(
                "health",
                format!("weights must sum to 100, got {}", total),
            ));
        }

        non_negative("anomaly.amount_z_threshold", self.anomaly.amount_z_threshold)?;
        non_negative("anomaly.volume_z_threshold", self.anomaly.volume_z_threshold)?;
        non_negative("forecast.stable_band", self.forecast.stable_band)?;
        non_negative("segmentation.vip_min_spend", self.segmentation.vip_min_spend)?;
        non_negative("inventory.critical_days_of_stock", self.inventory.critical_days_of_stock)?;
        non_negative("inventory.low_days_of_stock", self.inventory.low_days_of_stock)?;
        non_negative("inventory.target_days_of_stock", self.inventory.target_days_of_stock)?;
        non_negative("marketing.ticket_drop_pct", self.marketing.ticket_drop_pct)?;
        non_negative("marketing.product_share_target", self.marketing.product_share_target)?;
        non_negative("marketing.premium_uplift", self.marketing.premium_uplift)?;
        if !self.marketing.flash_sale_below_pct.is_finite() {
            return Err(InsightsError::invalid_config(
                "marketing.flash_sale_below_pct",
                "must be a finite number",
            ));
        }

        day_window("health.window_days", self.health.window_days)?;
        day_window("anomaly.window_days", self.anomaly.window_days)?;
        day_window("forecast.lookback_days", self.forecast.lookback_days)?;
        day_window("forecast.monthly_lookback_days", self.forecast.monthly_lookback_days)?;
        day_window("forecast.horizon_days", self.forecast.horizon_days)?;
        day_window("segmentation.recent_days", self.segmentation.recent_days)?;
        day_window("inventory.velocity_window_days", self.inventory.velocity_window_days)?;
        day_window("marketing.window_days", self.marketing.window_days)?;
        day_window("marketing.lost_after_days", self.marketing.lost_after_days)?;
        if self.marketing.lost_after_days < self.marketing.window_days {
            return Err(InsightsError::invalid_config(
                "marketing.lost_after_days",
                format!("must be at least marketing.window_days ({})", self.marketing.window_days),
            ));
        }
        positive("forecast.short_window", self.forecast.short_window)?;
        positive("forecast.long_window", self.forecast.long_window)?;
        positive("report.top_n", self.report.top_n)?;
        if self.forecast.horizon_months > MAX_HORIZON_MONTHS {
            return Err(InsightsError::invalid_config(
                "forecast.horizon_months",
                format!("must be at most {}", MAX_HORIZON_MONTHS),
            ));
        }

        Ok(())
    }
}

fn non_negative(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(InsightsError::invalid_config(
            field,
            format!("must be a non-negative number, got {}", value),
        ));
    }
    Ok(())
}

/// Longest day window accepted (about a century)
pub const MAX_WINDOW_DAYS: u32 = 36_500;
pub const MAX_HORIZON_MONTHS: u32 = 1_200;

fn day_window(field: &str, days: u32) -> Result<()> {
    if days == 0 || days > MAX_WINDOW_DAYS {
        return Err(InsightsError::invalid_config(
            field,
            format!("must be between 1 and {} days, got {}", MAX_WINDOW_DAYS, days),
        ));
    }
    Ok(())
}

fn positive(field: &str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(InsightsError::invalid_config(field, "must be at least 1"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_yields_defaults() {
        let config = AnalyticsConfig::from_toml_str("").unwrap();
        assert_eq!(config, AnalyticsConfig::default());
        assert_eq!(config.health.total_weight(), 100.0);
        assert_eq!(config.anomaly.amount_z_threshold, 2.5);
        assert_eq!(config.segmentation.vip_min_spend, 5000.0);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = AnalyticsConfig::from_toml_str(
            r#"
            [anomaly]
            amount_z_threshold = 2.0

            [segmentation]
            vip_min_spend = 8000.0
            "#,
        )
        .unwrap();

        assert_eq!(config.anomaly.amount_z_threshold, 2.0);
        assert_eq!(config.anomaly.volume_z_threshold, 2.0);
        assert_eq!(config.anomaly.window_days, 30);
        assert_eq!(config.segmentation.vip_min_spend, 8000.0);
        assert_eq!(config.segmentation.vip_min_visits, 4);
    }

    #[test]
    fn test_weights_must_sum_to_hundred() {
        let err = AnalyticsConfig::from_toml_str(
            r#"
            [health]
            revenue_weight = 50.0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, InsightsError::InvalidConfig { ref field, .. } if field == "health"));
    }

    #[test]
    fn test_rejects_negative_threshold_and_zero_window() {
        let mut config = AnalyticsConfig::default();
        config.anomaly.amount_z_threshold = -1.0;
        assert!(config.validate().is_err());

        let mut config = AnalyticsConfig::default();
        config.forecast.short_window = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_windows_beyond_a_century() {
        let err = AnalyticsConfig::from_toml_str("[health]\nwindow_days = 200000000\n").unwrap_err();
        assert!(
            matches!(err, InsightsError::InvalidConfig { ref field, .. } if field == "health.window_days")
        );

        let mut config = AnalyticsConfig::default();
        config.inventory.velocity_window_days = MAX_WINDOW_DAYS;
        assert!(config.validate().is_ok());
        config.inventory.velocity_window_days = MAX_WINDOW_DAYS + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_marketing_lost_window_cannot_precede_recent_window() {
        let config = AnalyticsConfig::from_toml_str("[marketing]\nwindow_days = 45\n").unwrap();
        assert_eq!(config.marketing.window_days, 45);
        assert_eq!(config.marketing.lost_after_days, 90);

        let err = AnalyticsConfig::from_toml_str("[marketing]\nlost_after_days = 14\n").unwrap_err();
        assert!(
            matches!(err, InsightsError::InvalidConfig { ref field, .. } if field == "marketing.lost_after_days")
        );
    }

    #[test]
    fn test_malformed_toml_is_reported() {
        let err = AnalyticsConfig::from_toml_str("[health\nrevenue_weight = ").unwrap_err();
        assert!(matches!(err, InsightsError::Toml(_)));
    }
}
