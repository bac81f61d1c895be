//! The forecasting engine.
//!
//! Two independent pipelines share a feature extractor and the artifact
//! store: a pooled regression over calendar and price features, and one
//! weekly-seasonal time-series model per product.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod engine;
pub mod error;
pub mod features;
pub mod regression;
pub mod scaler;
pub mod seasonal;

pub use engine::ForecastEngine;
pub use error::{ForecastError, Result};

/// Provenance carried inside every persisted artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_id: String,
    pub trained_at: DateTime<Utc>,
    pub training_samples: usize,
}

impl ModelMetadata {
    pub fn new(kind: &str, training_samples: usize) -> Self {
        Self {
            model_id: format!("{kind}_{}", uuid::Uuid::new_v4()),
            trained_at: Utc::now(),
            training_samples,
        }
    }
}
