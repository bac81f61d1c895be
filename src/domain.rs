//! Input types shared by both forecasting pipelines.

use serde::{Deserialize, Serialize};

/// One historical sale transaction.
///
/// `sale_date` stays a raw string until feature extraction: the upstream
/// backend sends RFC 3339 timestamps while ad-hoc callers send bare
/// `YYYY-MM-DD` dates, and both must parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleRecord {
    pub product_id: i64,
    pub sale_date: String,
    pub sale_price: f64,
    pub quantity_sold: f64,
}

/// Prediction-time view of a sale: product and price context for a possibly
/// future date, with no observed quantity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockQuery {
    pub product_id: i64,
    pub sale_date: String,
    pub sale_price: f64,
}
