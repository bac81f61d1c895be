//! Wires feature extraction, the two pipelines and the artifact store.

use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::domain::{SaleRecord, StockQuery};
use crate::forecast::error::{ForecastError, Result};
use crate::forecast::regression::{RegressionArtifact, RegressionForecaster};
use crate::forecast::seasonal::{SeasonalArtifact, SeasonalForecaster, SeasonalTrainingReport};
use crate::store::{ModelStore, StoreError};

/// Artifact name for the pooled regression model (forest plus scaler).
pub const REGRESSION_ARTIFACT: &str = "stock_regression";
/// Artifact name for the per-product seasonal model mapping.
pub const SEASONAL_ARTIFACT: &str = "stock_seasonal";

pub struct ForecastEngine {
    store: ModelStore,
    regression: RegressionForecaster,
    seasonal: SeasonalForecaster,
}

impl ForecastEngine {
    pub fn new(cfg: &Config) -> Result<Self> {
        Ok(Self {
            store: ModelStore::open(&cfg.store.dir)?,
            regression: RegressionForecaster::new(cfg.regression.clone()),
            seasonal: SeasonalForecaster::new(cfg.seasonal.clone()),
        })
    }

    /// Train the pooled regression model and replace its persisted artifact.
    pub fn train_regression(&self, records: &[SaleRecord]) -> Result<()> {
        let artifact = self.regression.train(records)?;
        self.store.save(REGRESSION_ARTIFACT, &artifact)?;
        Ok(())
    }

    /// Total stock needed over `forecast_duration` periods, one value per
    /// query.
    pub fn predict_regression(
        &self,
        queries: &[StockQuery],
        forecast_duration: u32,
    ) -> Result<Vec<f64>> {
        let artifact: RegressionArtifact = self.load_artifact(REGRESSION_ARTIFACT, "regression")?;
        self.regression.predict(&artifact, queries, forecast_duration)
    }

    /// Train the per-product seasonal models and replace the whole mapping.
    pub fn train_seasonal(&self, records: &[SaleRecord]) -> Result<SeasonalTrainingReport> {
        let (artifact, report) = self.seasonal.train(records)?;
        self.store.save(SEASONAL_ARTIFACT, &artifact)?;
        Ok(report)
    }

    /// Total stock needed for `product_id` over the next
    /// `prediction_length_days` days.
    pub fn predict_seasonal(&self, product_id: i64, prediction_length_days: u32) -> Result<f64> {
        let artifact: SeasonalArtifact = self.load_artifact(SEASONAL_ARTIFACT, "seasonal")?;
        self.seasonal.predict(&artifact, product_id, prediction_length_days)
    }

    fn load_artifact<T: DeserializeOwned>(&self, name: &str, kind: &'static str) -> Result<T> {
        match self.store.load(name) {
            Ok(artifact) => Ok(artifact),
            Err(StoreError::NotFound(_)) => Err(ForecastError::ModelNotFound(kind)),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RegressionConfig, SeasonalConfig, ServerConfig, StoreConfig};

    fn test_config(dir: &std::path::Path) -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                enable_cors: false,
                request_timeout_secs: 30,
            },
            store: StoreConfig {
                dir: dir.display().to_string(),
            },
            regression: RegressionConfig::default(),
            seasonal: SeasonalConfig::default(),
        }
    }

    fn engine(dir: &std::path::Path) -> ForecastEngine {
        ForecastEngine::new(&test_config(dir)).unwrap()
    }

    fn sales(product_id: i64, days: u32, quantity: f64) -> Vec<SaleRecord> {
        (1..=days)
            .map(|d| SaleRecord {
                product_id,
                sale_date: format!("2024-01-{d:02}"),
                sale_price: 25.0,
                quantity_sold: quantity,
            })
            .collect()
    }

    fn query(product_id: i64) -> StockQuery {
        StockQuery {
            product_id,
            sale_date: "2024-02-05".to_string(),
            sale_price: 25.0,
        }
    }

    #[test]
    fn predict_before_train_is_model_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());

        let err = engine.predict_regression(&[query(1)], 6).unwrap_err();
        assert!(matches!(err, ForecastError::ModelNotFound("regression")));

        let err = engine.predict_seasonal(1, 7).unwrap_err();
        assert!(matches!(err, ForecastError::ModelNotFound("seasonal")));
    }

    #[test]
    fn train_then_predict_round_trips_through_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());

        engine.train_regression(&sales(1, 30, 10.0)).unwrap();
        let predicted = engine.predict_regression(&[query(1)], 1).unwrap();
        assert!((predicted[0] - 10.0).abs() < 3.0);

        let report = engine.train_seasonal(&sales(1, 30, 10.0)).unwrap();
        assert_eq!(report.trained_products, 1);
        let total = engine.predict_seasonal(1, 7).unwrap();
        assert!((total - 70.0).abs() < 0.5);
    }

    #[test]
    fn training_twice_with_identical_input_predicts_identically() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());
        let records = sales(1, 30, 10.0);

        engine.train_regression(&records).unwrap();
        let first = engine.predict_regression(&[query(1)], 6).unwrap();

        engine.train_regression(&records).unwrap();
        let second = engine.predict_regression(&[query(1)], 6).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn retraining_replaces_the_whole_seasonal_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());

        engine.train_seasonal(&sales(1, 30, 10.0)).unwrap();
        assert!(engine.predict_seasonal(1, 7).is_ok());

        // Product 1 is absent from the new batch, so its model is gone.
        engine.train_seasonal(&sales(2, 30, 4.0)).unwrap();
        let err = engine.predict_seasonal(1, 7).unwrap_err();
        assert!(matches!(err, ForecastError::ProductModelNotFound(1)));
    }
}
