//! Feature extraction from raw sale records.
//!
//! Both models train on the same five columns: product id, sale price, and
//! three calendar features derived from the sale date (month, ISO-8601 week
//! number, day of year).

use chrono::{DateTime, Datelike, NaiveDate};

use crate::domain::{SaleRecord, StockQuery};
use crate::forecast::error::{ForecastError, Result};

/// Feature columns in model input order.
pub const FEATURE_NAMES: [&str; 5] = [
    "product_id",
    "sale_price",
    "month",
    "iso_week",
    "day_of_year",
];

/// Numeric features derived from one sale record. Identical sale dates
/// always yield identical calendar features.
#[derive(Debug, Clone, PartialEq)]
pub struct SaleFeatures {
    pub product_id: f64,
    pub sale_price: f64,
    /// Calendar month, 1-12.
    pub month: f64,
    /// ISO-8601 week number, 1-53.
    pub iso_week: f64,
    /// 1-based ordinal day within the year, 1-366.
    pub day_of_year: f64,
}

impl SaleFeatures {
    pub fn to_row(&self) -> Vec<f64> {
        vec![
            self.product_id,
            self.sale_price,
            self.month,
            self.iso_week,
            self.day_of_year,
        ]
    }
}

/// Parse a sale date. Accepts RFC 3339 timestamps (what the upstream backend
/// emits via `toISOString()`) and bare `YYYY-MM-DD` dates.
pub fn parse_sale_date(raw: &str) -> Result<NaiveDate> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .map_err(|_| ForecastError::Validation(format!("unparseable saleDate '{raw}'")))
}

/// Turns sale records into feature vectors.
pub struct FeatureExtractor;

impl FeatureExtractor {
    /// Features for a training record; the observed quantity must be a
    /// usable label.
    pub fn extract(&self, record: &SaleRecord) -> Result<SaleFeatures> {
        if !record.quantity_sold.is_finite() {
            return Err(ForecastError::Validation(format!(
                "non-numeric quantitySold for product {}",
                record.product_id
            )));
        }
        self.extract_parts(record.product_id, record.sale_price, &record.sale_date)
    }

    /// Features for a prediction-time query. The date may lie in the future;
    /// it only drives the calendar features.
    pub fn extract_query(&self, query: &StockQuery) -> Result<SaleFeatures> {
        self.extract_parts(query.product_id, query.sale_price, &query.sale_date)
    }

    /// One feature vector per record; any invalid record fails the whole
    /// batch.
    pub fn extract_batch(&self, records: &[SaleRecord]) -> Result<Vec<SaleFeatures>> {
        records.iter().map(|r| self.extract(r)).collect()
    }

    fn extract_parts(&self, product_id: i64, sale_price: f64, sale_date: &str) -> Result<SaleFeatures> {
        if !sale_price.is_finite() {
            return Err(ForecastError::Validation(format!(
                "non-numeric salePrice for product {product_id}"
            )));
        }
        let date = parse_sale_date(sale_date)?;
        Ok(SaleFeatures {
            product_id: product_id as f64,
            sale_price,
            month: f64::from(date.month()),
            iso_week: f64::from(date.iso_week().week()),
            day_of_year: f64::from(date.ordinal()),
        })
    }
}
