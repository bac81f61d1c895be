use thiserror::Error;

use crate::store::StoreError;

/// Failure kinds for the forecasting pipelines. Callers branch on the kind,
/// never on message text.
#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("validation error: {0}")]
    Validation(String),

    /// No artifact has been trained yet for the requested pipeline.
    #[error("no trained {0} model found")]
    ModelNotFound(&'static str),

    /// The seasonal artifact exists but carries no entry for this product.
    #[error("no seasonal model found for product {0}")]
    ProductModelNotFound(i64),

    #[error("training error: {0}")]
    Training(String),

    #[error("prediction error: {0}")]
    Prediction(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, ForecastError>;
