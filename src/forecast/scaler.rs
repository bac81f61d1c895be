//! Z-score feature scaling.

use serde::{Deserialize, Serialize};

use crate::forecast::error::{ForecastError, Result};

/// Per-feature mean/standard-deviation transform, fit once at training time
/// and reused unchanged at prediction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl StandardScaler {
    /// Fit means and population standard deviations over `rows`. Constant
    /// columns get unit scale so they center without dividing by zero.
    pub fn fit(rows: &[Vec<f64>]) -> Result<Self> {
        let n = rows.len();
        if n == 0 {
            return Err(ForecastError::Training(
                "cannot fit scaler on an empty feature table".into(),
            ));
        }
        let width = rows[0].len();
        if rows.iter().any(|r| r.len() != width) {
            return Err(ForecastError::Training("ragged feature table".into()));
        }

        let mut means = vec![0.0; width];
        for row in rows {
            for (mean, value) in means.iter_mut().zip(row) {
                *mean += value;
            }
        }
        for mean in &mut means {
            *mean /= n as f64;
        }

        let mut stds = vec![0.0; width];
        for row in rows {
            for ((sum, mean), value) in stds.iter_mut().zip(&means).zip(row) {
                *sum += (value - mean).powi(2);
            }
        }
        for std in &mut stds {
            *std = (*std / n as f64).sqrt();
            if *std < 1e-12 {
                *std = 1.0;
            }
        }

        Ok(Self { means, stds })
    }

    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        self.check_width(row)?;
        Ok(row
            .iter()
            .zip(self.means.iter().zip(&self.stds))
            .map(|(value, (mean, std))| (value - mean) / std)
            .collect())
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        rows.iter().map(|row| self.transform_row(row)).collect()
    }

    /// Undo `transform_row`.
    pub fn inverse_transform_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        self.check_width(row)?;
        Ok(row
            .iter()
            .zip(self.means.iter().zip(&self.stds))
            .map(|(value, (mean, std))| value * std + mean)
            .collect())
    }

    fn check_width(&self, row: &[f64]) -> Result<()> {
        if row.len() != self.means.len() {
            return Err(ForecastError::Validation(format!(
                "expected {} features, got {}",
                self.means.len(),
                row.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn fit_computes_column_statistics() {
        let rows = vec![vec![10.0, 1.0], vec![20.0, 1.0], vec![30.0, 1.0]];
        let scaler = StandardScaler::fit(&rows).unwrap();

        let transformed = scaler.transform(&rows).unwrap();
        // First column: mean 20, population std sqrt(200/3).
        assert!((transformed[0][0] + 20.0 / (200.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert!(transformed[1][0].abs() < 1e-12);
        // Constant column centers to zero under unit scale.
        assert_eq!(transformed[0][1], 0.0);
        assert_eq!(transformed[2][1], 0.0);
    }

    #[test]
    fn empty_table_is_a_training_error() {
        let err = StandardScaler::fit(&[]).unwrap_err();
        assert!(matches!(err, ForecastError::Training(_)));
    }

    #[test]
    fn width_mismatch_is_a_validation_error() {
        let scaler = StandardScaler::fit(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let err = scaler.transform_row(&[1.0]).unwrap_err();
        assert!(matches!(err, ForecastError::Validation(_)));
    }

    proptest! {
        #[test]
        fn transform_inverse_round_trips(
            rows in proptest::collection::vec(
                proptest::collection::vec(-1e6f64..1e6, 5),
                2..20,
            )
        ) {
            let scaler = StandardScaler::fit(&rows).unwrap();
            for row in &rows {
                let transformed = scaler.transform_row(row).unwrap();
                let restored = scaler.inverse_transform_row(&transformed).unwrap();
                for (original, back) in row.iter().zip(&restored) {
                    prop_assert!((original - back).abs() <= 1e-6 * original.abs().max(1.0));
                }
            }
        }
    }
}
