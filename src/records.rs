// Record types for exported branch data, plus the loaders that build them.
//
// The backend hands us loosely typed JSON. Everything is coerced here, at
// the boundary, so the engines only ever see explicit value types.

use crate::error::{InsightsError, Result};
use crate::stats::finite_or_zero;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::path::Path;

// ============================================================================
// TRANSACTIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

/// One priced line on a transaction (a service rendered or a product sold)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(alias = "service_id", alias = "product_id")]
    pub item_id: String,

    #[serde(alias = "service_name", alias = "product_name")]
    pub name: String,

    pub price: f64,

    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

impl LineItem {
    pub fn new(item_id: &str, name: &str, price: f64, quantity: u32) -> Self {
        LineItem {
            item_id: item_id.to_string(),
            name: name.to_string(),
            price,
            quantity,
        }
    }

    pub fn revenue(&self) -> f64 {
        finite_or_zero(self.price) * self.quantity as f64
    }
}

fn default_quantity() -> u32 {
    1
}

/// A point-of-sale transaction at one branch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    #[serde(alias = "_id", alias = "transaction_id")]
    pub id: String,

    pub branch_id: String,

    #[serde(default, alias = "customer")]
    pub customer_id: Option<String>,

    #[serde(default, alias = "barber")]
    pub barber_id: Option<String>,

    #[serde(alias = "createdAt", deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,

    pub payment_status: PaymentStatus,

    #[serde(default, deserialize_with = "deserialize_nullable_vec")]
    pub services: Vec<LineItem>,

    #[serde(default, deserialize_with = "deserialize_nullable_vec")]
    pub products: Vec<LineItem>,
}

impl TransactionRecord {
    /// Only completed payments count toward revenue
    pub fn is_completed(&self) -> bool {
        self.payment_status == PaymentStatus::Completed
    }

    pub fn service_revenue(&self) -> f64 {
        self.services.iter().map(LineItem::revenue).sum()
    }

    pub fn product_revenue(&self) -> f64 {
        self.products.iter().map(LineItem::revenue).sum()
    }

    pub fn total(&self) -> f64 {
        self.service_revenue() + self.product_revenue()
    }

    /// UTC calendar day of the transaction
    pub fn day(&self) -> NaiveDate {
        self.created_at.date_naive()
    }
}

// ============================================================================
// BOOKINGS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Booked,
    Confirmed,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingRecord {
    #[serde(alias = "_id")]
    pub id: String,

    pub branch_id: String,

    #[serde(default, alias = "customer")]
    pub customer_id: Option<String>,

    #[serde(default, alias = "barber")]
    pub barber_id: Option<String>,

    #[serde(alias = "service")]
    pub service_id: String,

    #[serde(alias = "createdAt", deserialize_with = "deserialize_timestamp")]
    pub created_at: DateTime<Utc>,

    pub status: BookingStatus,

    #[serde(default)]
    pub price: f64,
}

// ============================================================================
// PRODUCT STOCK
// ============================================================================

/// Reorder level used when a product has none configured
pub const DEFAULT_REORDER_LEVEL: u32 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductStock {
    #[serde(alias = "_id")]
    pub id: String,

    pub name: String,

    pub stock: u32,

    #[serde(default, alias = "minStock")]
    pub min_stock: Option<u32>,

    #[serde(default = "default_active")]
    pub active: bool,
}

impl ProductStock {
    /// Configured minimum stock, falling back to the default level.
    /// A configured zero also falls back.
    pub fn reorder_level(&self) -> u32 {
        match self.min_stock {
            Some(level) if level > 0 => level,
            _ => DEFAULT_REORDER_LEVEL,
        }
    }

    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.reorder_level()
    }
}

fn default_active() -> bool {
    true
}

// ============================================================================
// DATASET
// ============================================================================

/// Everything one export contains
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub transactions: Vec<TransactionRecord>,

    #[serde(default)]
    pub bookings: Vec<BookingRecord>,

    #[serde(default)]
    pub products: Vec<ProductStock>,
}

impl Dataset {
    /// Load an export, choosing the reader by file extension
    pub fn load(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "json" => Self::from_json_file(path),
            "csv" => Ok(Dataset {
                transactions: load_transactions_csv(path)?,
                ..Dataset::default()
            }),
            other => Err(InsightsError::UnsupportedFormat(format!(
                "{} (expected .json or .csv)",
                if other.is_empty() { "<none>" } else { other }
            ))),
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let dataset = Self::from_json_str(&content)?;
        tracing::info!(
            path = %path.display(),
            transactions = dataset.transactions.len(),
            bookings = dataset.bookings.len(),
            products = dataset.products.len(),
            "Loaded dataset"
        );
        Ok(dataset)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let mut dataset: Dataset = serde_json::from_str(content)?;
        dataset.sanitize();
        Ok(dataset)
    }

    /// Replace non-finite amounts with zero, returning how many were fixed
    pub fn sanitize(&mut self) -> usize {
        let mut coerced = 0;

        let mut fix = |value: &mut f64| {
            if !value.is_finite() {
                *value = 0.0;
                coerced += 1;
            }
        };

        for tx in &mut self.transactions {
            for item in tx.services.iter_mut().chain(tx.products.iter_mut()) {
                fix(&mut item.price);
            }
        }
        for booking in &mut self.bookings {
            fix(&mut booking.price);
        }

        if coerced > 0 {
            tracing::warn!(coerced, "Replaced non-finite amounts with zero");
        }
        coerced
    }

    /// Keep only the records belonging to one branch
    pub fn for_branch(&self, branch_id: &str) -> Dataset {
        Dataset {
            transactions: self
                .transactions
                .iter()
                .filter(|tx| tx.branch_id == branch_id)
                .cloned()
                .collect(),
            bookings: self
                .bookings
                .iter()
                .filter(|b| b.branch_id == branch_id)
                .cloned()
                .collect(),
            // Stock lists are exported per branch already
            products: self.products.clone(),
        }
    }
}

// ============================================================================
// CSV LOADERS
// ============================================================================

/// One CSV row per line item; rows sharing a transaction id fold together
#[derive(Debug, Deserialize)]
struct TransactionLineRow {
    transaction_id: String,
    branch_id: String,
    #[serde(default)]
    customer_id: Option<String>,
    #[serde(default)]
    barber_id: Option<String>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    created_at: DateTime<Utc>,
    payment_status: PaymentStatus,
    kind: String,
    item_id: String,
    item_name: String,
    price: f64,
    #[serde(default = "default_quantity")]
    quantity: u32,
}

pub fn load_transactions_csv(csv_path: &Path) -> Result<Vec<TransactionRecord>> {
    let rdr = csv::Reader::from_path(csv_path)?;
    let transactions = read_transactions_csv(rdr)?;
    tracing::info!(
        path = %csv_path.display(),
        transactions = transactions.len(),
        "Loaded transactions from CSV"
    );
    Ok(transactions)
}

pub fn read_transactions_csv<R: std::io::Read>(
    mut rdr: csv::Reader<R>,
) -> Result<Vec<TransactionRecord>> {
    let mut transactions: Vec<TransactionRecord> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for result in rdr.deserialize() {
        let row: TransactionLineRow = result?;

        let item = LineItem {
            item_id: row.item_id,
            name: row.item_name,
            price: finite_or_zero(row.price),
            quantity: row.quantity,
        };

        let position = match index.get(&row.transaction_id).copied() {
            Some(position) => position,
            None => {
                transactions.push(TransactionRecord {
                    id: row.transaction_id.clone(),
                    branch_id: row.branch_id,
                    customer_id: row.customer_id.filter(|id| !id.is_empty()),
                    barber_id: row.barber_id.filter(|id| !id.is_empty()),
                    created_at: row.created_at,
                    payment_status: row.payment_status,
                    services: Vec::new(),
                    products: Vec::new(),
                });
                index.insert(row.transaction_id.clone(), transactions.len() - 1);
                transactions.len() - 1
            }
        };

        match row.kind.trim().to_ascii_lowercase().as_str() {
            "service" => transactions[position].services.push(item),
            "product" => transactions[position].products.push(item),
            other => {
                return Err(InsightsError::invalid_record(
                    row.transaction_id,
                    format!("unknown line kind '{}' (expected service or product)", other),
                ))
            }
        }
    }

    Ok(transactions)
}

pub fn load_bookings_csv(csv_path: &Path) -> Result<Vec<BookingRecord>> {
    let mut rdr = csv::Reader::from_path(csv_path)?;
    let mut bookings = Vec::new();

    for result in rdr.deserialize() {
        let mut booking: BookingRecord = result?;
        booking.price = finite_or_zero(booking.price);
        booking.customer_id = booking.customer_id.filter(|id| !id.is_empty());
        booking.barber_id = booking.barber_id.filter(|id| !id.is_empty());
        bookings.push(booking);
    }

    tracing::info!(path = %csv_path.display(), bookings = bookings.len(), "Loaded bookings from CSV");
    Ok(bookings)
}

pub fn load_products_csv(csv_path: &Path) -> Result<Vec<ProductStock>> {
    let mut rdr = csv::Reader::from_path(csv_path)?;
    let mut products = Vec::new();

    for result in rdr.deserialize() {
        let product: ProductStock = result?;
        products.push(product);
    }

    tracing::info!(path = %csv_path.display(), products = products.len(), "Loaded products from CSV");
    Ok(products)
}

// ============================================================================
// SERDE HELPERS
// ============================================================================

/// Timestamps arrive as epoch milliseconds or RFC 3339 text
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Millis(i64),
    FractionalMillis(f64),
    Text(String),
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let raw = RawTimestamp::deserialize(deserializer)?;
    let millis = match raw {
        RawTimestamp::Millis(ms) => ms,
        RawTimestamp::FractionalMillis(ms) if ms.is_finite() => ms.floor() as i64,
        RawTimestamp::FractionalMillis(ms) => {
            return Err(D::Error::custom(format!("non-finite timestamp {}", ms)))
        }
        RawTimestamp::Text(text) => {
            let text = text.trim();
            if let Ok(ms) = text.parse::<i64>() {
                ms
            } else {
                return DateTime::parse_from_rfc3339(text)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| D::Error::custom(format!("invalid timestamp '{}': {}", text, e)));
            }
        }
    };

    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {}", millis)))
}

/// `null` and a missing array both mean "no items"
fn deserialize_nullable_vec<'de, D>(deserializer: D) -> std::result::Result<Vec<LineItem>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<LineItem>>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// TESTS
// ============================================================================
