use anyhow::{bail, Context, Result};
use branch_insights::logging;
use branch_insights::{
    AnalyticsConfig, AnomalyDetector, CustomerSegmenter, Dataset, Forecaster, GroupKey,
    HealthEngine, MarketingPlanner, ReorderPlanner,
    compare_periods, declining_branches, leaderboard, parse_instant, resolve_bounds,
    load_bookings_csv, load_products_csv, load_transactions_csv,
};
use branch_insights::stats::format_percent;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "branch-insights", version, about = "Barbershop branch analytics")]
struct Cli {
    /// JSON export with transactions, bookings and products (or a transactions CSV)
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Transactions CSV, one row per line item
    #[arg(long, global = true)]
    transactions: Option<PathBuf>,

    /// Bookings CSV
    #[arg(long, global = true)]
    bookings: Option<PathBuf>,

    /// Product stock CSV
    #[arg(long, global = true)]
    products: Option<PathBuf>,

    /// TOML file overriding the default thresholds
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Reference instant (RFC 3339 or YYYY-MM-DD), defaults to now
    #[arg(long, global = true)]
    as_of: Option<String>,

    /// Restrict the analysis to one branch
    #[arg(long, global = true)]
    branch: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare a period against the preceding period of equal length
    Summary {
        /// Period start, defaults to 30 days before --as-of
        #[arg(long)]
        start: Option<String>,
        /// Period end, defaults to --as-of
        #[arg(long)]
        end: Option<String>,
    },
    /// Flag unusual transaction amounts and daily volumes
    Anomalies,
    /// Weighted business health score
    Health,
    /// Daily revenue forecast from moving averages
    Forecast,
    /// Monthly revenue trend and projection
    Monthly,
    /// RFM customer segments
    Segments,
    /// Rank barbers, services, products, branches or customers by revenue
    Leaderboard {
        #[arg(long, default_value = "barber")]
        by: GroupKey,
        #[arg(long)]
        top: Option<usize>,
    },
    /// Products that need reordering
    Reorder,
    /// Branches whose revenue fell against the previous period
    Declines {
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        /// Percent change below which a branch is listed
        #[arg(long, allow_hyphen_values = true)]
        threshold: Option<f64>,
    },
    /// Campaign, targeting, pricing and cross-sell suggestions
    Marketing,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_cli_logger(cli.verbose);

    let config = match &cli.config {
        Some(path) => AnalyticsConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AnalyticsConfig::default(),
    };

    let mut dataset = load_dataset(&cli)?;
    if let Some(branch) = &cli.branch {
        dataset = dataset.for_branch(branch);
        tracing::info!(branch = %branch, transactions = dataset.transactions.len(), "Filtered to branch");
    }

    let as_of = match &cli.as_of {
        Some(raw) => parse_instant(raw, true).context("Invalid --as-of")?,
        None => Utc::now(),
    };

    run(&cli, &dataset, &config, as_of)
}

fn load_dataset(cli: &Cli) -> Result<Dataset> {
    let mut dataset = match &cli.data {
        Some(path) => Dataset::load(path)
            .with_context(|| format!("Failed to load data from {}", path.display()))?,
        None => Dataset::default(),
    };

    if let Some(path) = &cli.transactions {
        dataset.transactions = load_transactions_csv(path)
            .with_context(|| format!("Failed to load transactions from {}", path.display()))?;
    }
    if let Some(path) = &cli.bookings {
        dataset.bookings = load_bookings_csv(path)
            .with_context(|| format!("Failed to load bookings from {}", path.display()))?;
    }
    if let Some(path) = &cli.products {
        dataset.products = load_products_csv(path)
            .with_context(|| format!("Failed to load products from {}", path.display()))?;
    }

    if cli.data.is_none() && cli.transactions.is_none() && cli.bookings.is_none() && cli.products.is_none() {
        bail!("No input given: pass --data or one of --transactions/--bookings/--products");
    }

    dataset.sanitize();
    Ok(dataset)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_lines(title: &str, lines: &[String]) {
    if lines.is_empty() {
        return;
    }
    println!("\n{}", title);
    for line in lines {
        println!("  • {}", line);
    }
}

fn run(cli: &Cli, dataset: &Dataset, config: &AnalyticsConfig, as_of: DateTime<Utc>) -> Result<()> {
    let json = cli.format == OutputFormat::Json;

    match &cli.command {
        Command::Summary { start, end } => {
            let (start, end) = resolve_bounds(start.as_deref(), end.as_deref(), as_of, 30)
                .context("Invalid period bounds")?;
            let summary = compare_periods(&dataset.transactions, start, end);
            if json {
                return print_json(&summary);
            }
            println!("📊 {} → {}", start.date_naive(), end.date_naive());
            println!("{}", summary.summary());
            if let Some(top) = &summary.top_service {
                println!("🏆 Top service: {} (₱{:.2})", top.name, top.revenue);
            }
            if let Some(top) = &summary.top_product {
                println!("🏆 Top product: {} (₱{:.2})", top.name, top.revenue);
            }
            print_lines("💡 Insights", &summary.insights);
            print_lines("✅ Recommendations", &summary.recommendations);
        }

        Command::Anomalies => {
            let report = AnomalyDetector::new(config.anomaly.clone()).detect(&dataset.transactions, as_of);
            if json {
                return print_json(&report);
            }
            if let Some(message) = &report.message {
                println!("ℹ️  {}", message);
                return Ok(());
            }
            println!("🔍 {}", report.summary());
            for anomaly in &report.transaction_anomalies {
                println!("  ⚠️  {} ₱{:.2} (z {:.2}) {}", anomaly.transaction_id, anomaly.amount, anomaly.z_score, anomaly.reason);
            }
            for anomaly in &report.volume_anomalies {
                println!("  📅 {} {} transactions (z {:.2}) {}", anomaly.date, anomaly.count, anomaly.z_score, anomaly.reason);
            }
        }

        Command::Health => {
            let report = HealthEngine::new(config.health.clone()).score(
                &dataset.transactions,
                &dataset.bookings,
                &dataset.products,
                as_of,
            );
            if json {
                return print_json(&report);
            }
            println!("❤️  {}", report.summary());
            for sub in &report.breakdown {
                println!("  {:<14} {:>5.1} (weight {:>4.1})  {}", sub.name, sub.score, sub.weight, sub.details);
            }
            print_lines("🚨 Alerts", &report.alerts);
        }

        Command::Forecast => {
            let forecast = Forecaster::new(config.forecast.clone()).forecast(&dataset.transactions, as_of);
            if json {
                return print_json(&forecast);
            }
            let stats = &forecast.statistics;
            println!(
                "📈 Trend {:+.1}% ({:?}), 7-day avg ₱{:.2}, 30-day avg ₱{:.2}",
                stats.trend_percentage, stats.direction, stats.short_average, stats.long_average
            );
            for day in &forecast.forecast {
                println!("  {} {:?}  ₱{:.2}  ({:?})", day.date, day.weekday, day.predicted_revenue, day.confidence);
            }
            println!("  Total ₱{:.2}", forecast.total_forecast);
        }

        Command::Monthly => {
            let projection = Forecaster::new(config.forecast.clone()).monthly_projection(&dataset.transactions, as_of);
            if json {
                return print_json(&projection);
            }
            println!("📅 Monthly trend {:+.1}% ({:?})", projection.trend_percentage, projection.direction);
            for month in &projection.history {
                println!("  {}  ₱{:.2}  ({} transactions)", month.month.format("%Y-%m"), month.revenue, month.transactions);
            }
            for month in &projection.forecast {
                println!("  {}  ₱{:.2}  projected ({:?})", month.month.format("%Y-%m"), month.predicted_revenue, month.confidence);
            }
        }

        Command::Segments => {
            let report = CustomerSegmenter::new(config.segmentation.clone()).segment(&dataset.transactions, as_of);
            if json {
                return print_json(&report);
            }
            println!("👥 {} customers", report.total_customers);
            for stats in &report.segments {
                println!(
                    "  {:<9} {:>4}  ₱{:>10.2}  avg visits {:.1}  avg spend ₱{:.2}",
                    stats.segment.as_str(), stats.count, stats.total_revenue, stats.avg_visits, stats.avg_spend
                );
            }
            print_lines("💡 Insights", &report.insights);
            print_lines("✅ Recommendations", &report.recommendations);
        }

        Command::Leaderboard { by, top } => {
            let entries = leaderboard(&dataset.transactions, *by, top.unwrap_or(config.report.top_n));
            if json {
                return print_json(&entries);
            }
            println!("🏆 Top {:?}", by);
            for (rank, entry) in entries.iter().enumerate() {
                println!("  {:>2}. {:<24} ₱{:>10.2}  {} sales", rank + 1, entry.name, entry.revenue, entry.count);
            }
        }

        Command::Reorder => {
            let report = ReorderPlanner::new(config.inventory.clone()).plan(&dataset.products, &dataset.transactions, as_of);
            if json {
                return print_json(&report);
            }
            println!(
                "📦 {} products, {} out of stock, {} critical, {} low (health {})",
                report.summary.total_products,
                report.summary.out_of_stock,
                report.summary.critical,
                report.summary.low_stock,
                report.health_label()
            );
            for alert in &report.alerts {
                println!(
                    "  [{:?}] {} stock {} → order {}  {}",
                    alert.urgency, alert.product_name, alert.current_stock, alert.suggested_order, alert.reason
                );
            }
        }

        Command::Declines { start, end, threshold } => {
            let (start, end) = resolve_bounds(start.as_deref(), end.as_deref(), as_of, 30)
                .context("Invalid period bounds")?;
            let threshold = threshold.unwrap_or(config.report.decline_threshold_pct);
            let declining = declining_branches(&dataset.transactions, start, end, threshold);
            if json {
                return print_json(&declining);
            }
            if declining.is_empty() {
                println!("✅ No branch declined more than {:.0}%", threshold.abs());
            }
            for branch in &declining {
                println!(
                    "  📉 {}  ₱{:.2} vs ₱{:.2} ({})",
                    branch.branch_id, branch.current_revenue, branch.previous_revenue, format_percent(branch.change)
                );
            }
        }

        Command::Marketing => {
            let planner = MarketingPlanner::new(config.marketing.clone(), config.segmentation.clone());
            let report = planner.plan(&dataset.transactions, &dataset.bookings, as_of);
            if json {
                return print_json(&report);
            }
            println!(
                "📣 {} campaign(s), {} high priority, {} customers to target (revenue {}, avg ticket ₱{:.2})",
                report.summary.total_campaigns,
                report.summary.high_priority,
                report.summary.customers_to_target,
                format_percent(Some(report.summary.revenue_trend)),
                report.summary.avg_ticket
            );
            for promotion in &report.promotions {
                println!("  [{:?}] {}: {}", promotion.priority, promotion.title, promotion.suggested_discount);
            }
            let targeting: Vec<String> = report
                .targeting
                .iter()
                .map(|t| format!("{} ({}): {} via {}", t.audience.label(), t.customers, t.strategy, t.channel))
                .collect();
            print_lines("🎯 Targeting", &targeting);
            let pricing: Vec<String> = report
                .pricing
                .iter()
                .map(|p| format!("{} ({})", p.suggestion, p.potential_impact))
                .collect();
            print_lines("💰 Pricing", &pricing);
            let timing: Vec<String> = report.timing.iter().map(|t| format!("{}: {}", t.insight, t.action)).collect();
            print_lines("🕒 Timing", &timing);
            let cross_sell: Vec<String> = report
                .cross_sell
                .iter()
                .map(|c| format!("{} → {} ({})", c.if_customer_buys, c.recommend, c.reason))
                .collect();
            print_lines("🔗 Cross-sell", &cross_sell);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_leaderboard_flags() {
        let cli = Cli::try_parse_from([
            "branch-insights", "--data", "export.json", "leaderboard", "--by", "service", "--top", "3",
        ])
        .unwrap();
        match cli.command {
            Command::Leaderboard { by, top } => {
                assert_eq!(by, GroupKey::Service);
                assert_eq!(top, Some(3));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cli_accepts_negative_threshold_and_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "branch-insights", "declines", "--threshold", "-20", "--transactions", "tx.csv", "--format", "json",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(cli.transactions.is_some());
        match cli.command {
            Command::Declines { threshold, .. } => assert_eq!(threshold, Some(-20.0)),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cli_parses_marketing_with_branch_scope() {
        let cli = Cli::try_parse_from([
            "branch-insights", "marketing", "--data", "export.json", "--branch", "b1", "--as-of", "2025-07-03",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Marketing));
        assert_eq!(cli.branch.as_deref(), Some("b1"));
    }
}
