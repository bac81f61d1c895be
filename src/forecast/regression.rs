//! Pooled cross-product regression pipeline.
//!
//! One bagged-forest model trains over all products' records at once; a
//! prediction is a one-period quantity estimate scaled linearly by the
//! requested number of periods. The scale applied at prediction time is the
//! training-time scaler, loaded from the artifact and never refit.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use tracing::info;

use crate::config::RegressionConfig;
use crate::domain::{SaleRecord, StockQuery};
use crate::forecast::error::{ForecastError, Result};
use crate::forecast::features::{FeatureExtractor, SaleFeatures, FEATURE_NAMES};
use crate::forecast::scaler::StandardScaler;
use crate::forecast::ModelMetadata;

type Forest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// The persisted unit for the regression pipeline: the fitted forest and the
/// scaler it was trained through, replaced together on every retrain.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegressionArtifact {
    pub metadata: ModelMetadata,
    pub scaler: StandardScaler,
    model: Forest,
}

pub struct RegressionForecaster {
    extractor: FeatureExtractor,
    cfg: RegressionConfig,
}

impl RegressionForecaster {
    pub fn new(cfg: RegressionConfig) -> Self {
        Self {
            extractor: FeatureExtractor,
            cfg,
        }
    }

    /// Fit scaler and forest over the pooled records.
    pub fn train(&self, records: &[SaleRecord]) -> Result<RegressionArtifact> {
        if records.len() < 2 {
            return Err(ForecastError::Training(format!(
                "need at least 2 sales records to split train/holdout, got {}",
                records.len()
            )));
        }
        if !(self.cfg.train_ratio > 0.0 && self.cfg.train_ratio < 1.0) {
            return Err(ForecastError::Training(format!(
                "train_ratio must be between 0 and 1, got {}",
                self.cfg.train_ratio
            )));
        }

        let features = self.extractor.extract_batch(records)?;
        let rows: Vec<Vec<f64>> = features.iter().map(SaleFeatures::to_row).collect();
        let targets: Vec<f64> = records.iter().map(|r| r.quantity_sold).collect();

        let scaler = StandardScaler::fit(&rows)?;
        let scaled = scaler.transform(&rows)?;

        // Seeded shuffle: identical input ordering reproduces the same split.
        let mut indices: Vec<usize> = (0..scaled.len()).collect();
        indices.shuffle(&mut StdRng::seed_from_u64(self.cfg.seed));
        let train_len = ((scaled.len() as f64) * self.cfg.train_ratio)
            .floor()
            .max(1.0) as usize;
        // The holdout partition is produced but not scored; accuracy
        // reporting is out of scope.
        let (train_idx, _holdout_idx) = indices.split_at(train_len);

        let n_features = FEATURE_NAMES.len();
        let mut flat = Vec::with_capacity(train_idx.len() * n_features);
        let mut train_y = Vec::with_capacity(train_idx.len());
        for &i in train_idx {
            flat.extend_from_slice(&scaled[i]);
            train_y.push(targets[i]);
        }
        let x = DenseMatrix::new(train_idx.len(), n_features, flat, false);

        let params = RandomForestRegressorParameters {
            max_depth: self.cfg.max_depth,
            min_samples_leaf: 1,
            min_samples_split: 2,
            n_trees: self.cfg.n_trees,
            m: None,
            keep_samples: false,
            seed: self.cfg.seed,
        };
        let model = Forest::fit(&x, &train_y, params)
            .map_err(|e| ForecastError::Training(format!("random forest fit failed: {e}")))?;

        info!(
            samples = records.len(),
            trees = self.cfg.n_trees,
            "regression model trained"
        );

        Ok(RegressionArtifact {
            metadata: ModelMetadata::new("stock_regression", records.len()),
            scaler,
            model,
        })
    }

    /// Predict the total quantity over `forecast_duration` periods for each
    /// query. Linear extrapolation over the horizon, not a per-horizon refit.
    pub fn predict(
        &self,
        artifact: &RegressionArtifact,
        queries: &[StockQuery],
        forecast_duration: u32,
    ) -> Result<Vec<f64>> {
        if forecast_duration == 0 {
            return Err(ForecastError::Validation(
                "forecast_duration must be at least 1 period".into(),
            ));
        }
        if queries.is_empty() {
            return Err(ForecastError::Validation(
                "no records supplied to predict for".into(),
            ));
        }

        let n_features = FEATURE_NAMES.len();
        let mut flat = Vec::with_capacity(queries.len() * n_features);
        for query in queries {
            let features = self.extractor.extract_query(query)?;
            flat.extend_from_slice(&artifact.scaler.transform_row(&features.to_row())?);
        }
        let x = DenseMatrix::new(queries.len(), n_features, flat, false);

        let per_period = artifact
            .model
            .predict(&x)
            .map_err(|e| ForecastError::Prediction(format!("random forest predict failed: {e}")))?;

        Ok(per_period
            .into_iter()
            .map(|quantity| quantity * f64::from(forecast_duration))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sale(product_id: i64, day: u32, quantity: f64) -> SaleRecord {
        SaleRecord {
            product_id,
            sale_date: format!("2024-01-{day:02}"),
            sale_price: 25.0,
            quantity_sold: quantity,
        }
    }

    fn query(product_id: i64) -> StockQuery {
        StockQuery {
            product_id,
            sale_date: "2024-02-05".to_string(),
            sale_price: 25.0,
        }
    }

    fn forecaster() -> RegressionForecaster {
        RegressionForecaster::new(RegressionConfig::default())
    }

    #[test]
    fn too_few_records_is_a_training_error() {
        let err = forecaster().train(&[sale(1, 1, 10.0)]).unwrap_err();
        assert!(matches!(err, ForecastError::Training(_)));
    }

    #[test]
    fn constant_demand_predicts_near_the_constant() {
        let records: Vec<_> = (1..=30).map(|d| sale(1, d, 10.0)).collect();
        let artifact = forecaster().train(&records).unwrap();

        let predicted = forecaster().predict(&artifact, &[query(1)], 1).unwrap();
        assert_eq!(predicted.len(), 1);
        assert!(predicted[0].is_finite());
        assert!(
            (predicted[0] - 10.0).abs() < 3.0,
            "one-period estimate {} too far from 10",
            predicted[0]
        );
    }

    #[test]
    fn horizon_scales_the_estimate_linearly() {
        let records: Vec<_> = (1..=30).map(|d| sale(1, d, 10.0)).collect();
        let artifact = forecaster().train(&records).unwrap();

        let one = forecaster().predict(&artifact, &[query(1)], 1).unwrap()[0];
        let three = forecaster().predict(&artifact, &[query(1)], 3).unwrap()[0];
        assert!((three - 3.0 * one).abs() < 1e-9);
    }

    #[test]
    fn training_is_deterministic_for_identical_input() {
        let records: Vec<_> = (1..=20)
            .map(|d| sale(i64::from(d % 3), d, f64::from(d) * 1.5))
            .collect();

        let a = forecaster().train(&records).unwrap();
        let b = forecaster().train(&records).unwrap();

        let pa = forecaster().predict(&a, &[query(1)], 2).unwrap();
        let pb = forecaster().predict(&b, &[query(1)], 2).unwrap();
        assert_eq!(pa, pb);
    }

    #[test]
    fn bad_record_fails_training() {
        let mut records: Vec<_> = (1..=10).map(|d| sale(1, d, 10.0)).collect();
        records[4].sale_date = "garbage".to_string();

        let err = forecaster().train(&records).unwrap_err();
        assert!(matches!(err, ForecastError::Validation(_)));
    }

    #[test]
    fn zero_duration_is_rejected() {
        let records: Vec<_> = (1..=10).map(|d| sale(1, d, 10.0)).collect();
        let artifact = forecaster().train(&records).unwrap();

        let err = forecaster().predict(&artifact, &[query(1)], 0).unwrap_err();
        assert!(matches!(err, ForecastError::Validation(_)));
    }

    #[test]
    fn batch_queries_return_one_value_each() {
        let records: Vec<_> = (1..=30).map(|d| sale(i64::from(d % 2), d, 5.0)).collect();
        let artifact = forecaster().train(&records).unwrap();

        let predicted = forecaster()
            .predict(&artifact, &[query(0), query(1)], 6)
            .unwrap();
        assert_eq!(predicted.len(), 2);
    }
}
