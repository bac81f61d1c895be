//! Per-product seasonal time-series pipeline.
//!
//! Each product's sales collapse into a daily quantity series, and each
//! series gets its own seasonal autoregressive model with non-seasonal
//! order (1,1,1) and seasonal order (1,1,1) at a weekly period: first plus
//! seasonal differencing, autoregressive coefficients by conditional least
//! squares on the differenced series, moving-average coefficients from
//! residual autocorrelation. Forecasts are produced recursively on the
//! differenced scale and re-integrated.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::SeasonalConfig;
use crate::domain::SaleRecord;
use crate::forecast::error::{ForecastError, Result};
use crate::forecast::features::parse_sale_date;
use crate::forecast::ModelMetadata;

/// Stationarity bounds for the fitted coefficients.
const AR_BOUND: f64 = 0.98;
const MA_BOUND: f64 = 0.9;

/// Daily sales for one product: strictly increasing dates with duplicate
/// days merged by summation and interior gaps held at zero demand.
#[derive(Debug, Clone)]
pub struct DailySeries {
    pub product_id: i64,
    pub start: NaiveDate,
    pub quantities: Vec<f64>,
}

/// Fitted state for one product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSeasonalModel {
    period: usize,
    ar: f64,
    seasonal_ar: f64,
    ma: f64,
    seasonal_ma: f64,
    pub residual_variance: f64,
    /// Length of the daily series the model was fit on.
    pub train_len: usize,
    /// Trailing observations on the original scale, oldest first.
    history: Vec<f64>,
    /// Trailing doubly-differenced values and model residuals.
    diff_tail: Vec<f64>,
    residual_tail: Vec<f64>,
}

/// The persisted unit for the seasonal pipeline: every product's fitted
/// model, replaced wholesale on retrain.
#[derive(Debug, Serialize, Deserialize)]
pub struct SeasonalArtifact {
    pub metadata: ModelMetadata,
    pub models: BTreeMap<i64, ProductSeasonalModel>,
}

/// Outcome of a seasonal training run.
#[derive(Debug)]
pub struct SeasonalTrainingReport {
    pub trained_products: usize,
    pub skipped_products: Vec<i64>,
}

/// Group records into per-product daily series. Quantities on the same
/// calendar day sum; days between the first and last observed sale with no
/// sales count as zero demand.
pub fn build_daily_series(records: &[SaleRecord]) -> Result<Vec<DailySeries>> {
    let mut by_product: BTreeMap<i64, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
    for record in records {
        if !record.quantity_sold.is_finite() {
            return Err(ForecastError::Validation(format!(
                "non-numeric quantitySold for product {}",
                record.product_id
            )));
        }
        let day = parse_sale_date(&record.sale_date)?;
        *by_product
            .entry(record.product_id)
            .or_default()
            .entry(day)
            .or_insert(0.0) += record.quantity_sold;
    }

    let mut series = Vec::with_capacity(by_product.len());
    for (product_id, days) in by_product {
        let (Some((&start, _)), Some((&end, _))) = (days.first_key_value(), days.last_key_value())
        else {
            continue;
        };
        let len = (end - start).num_days() as usize + 1;
        let mut quantities = vec![0.0; len];
        for (day, quantity) in &days {
            quantities[(*day - start).num_days() as usize] = *quantity;
        }
        series.push(DailySeries {
            product_id,
            start,
            quantities,
        });
    }
    Ok(series)
}

pub struct SeasonalForecaster {
    period: usize,
}

impl SeasonalForecaster {
    pub fn new(cfg: SeasonalConfig) -> Self {
        Self { period: cfg.period }
    }

    /// Minimum daily observations to support first plus seasonal
    /// differencing and the lagged regressors, roughly twice the period.
    pub fn min_observations(&self) -> usize {
        2 * self.period + 2
    }

    /// Fit one model per product. Products with too little history are
    /// skipped; training fails only when nothing can be fitted.
    pub fn train(&self, records: &[SaleRecord]) -> Result<(SeasonalArtifact, SeasonalTrainingReport)> {
        if records.is_empty() {
            return Err(ForecastError::Training("no sales records supplied".into()));
        }
        let series = build_daily_series(records)?;

        let mut models = BTreeMap::new();
        let mut skipped = Vec::new();
        for s in &series {
            if s.quantities.len() < self.min_observations() {
                warn!(
                    product_id = s.product_id,
                    observations = s.quantities.len(),
                    required = self.min_observations(),
                    "skipping product with too few daily observations"
                );
                skipped.push(s.product_id);
                continue;
            }
            models.insert(
                s.product_id,
                ProductSeasonalModel::fit(&s.quantities, self.period),
            );
        }

        if models.is_empty() {
            return Err(ForecastError::Training(format!(
                "no product had the {} daily observations required for a seasonal fit",
                self.min_observations()
            )));
        }

        info!(
            trained = models.len(),
            skipped = skipped.len(),
            "seasonal models trained"
        );

        let report = SeasonalTrainingReport {
            trained_products: models.len(),
            skipped_products: skipped,
        };
        let artifact = SeasonalArtifact {
            metadata: ModelMetadata::new("stock_seasonal", records.len()),
            models,
        };
        Ok((artifact, report))
    }

    /// Total predicted quantity over the next `prediction_length_days` days.
    pub fn predict(
        &self,
        artifact: &SeasonalArtifact,
        product_id: i64,
        prediction_length_days: u32,
    ) -> Result<f64> {
        if prediction_length_days == 0 {
            return Err(ForecastError::Validation(
                "predictionLength must be at least 1 day".into(),
            ));
        }
        let model = artifact
            .models
            .get(&product_id)
            .ok_or(ForecastError::ProductModelNotFound(product_id))?;
        Ok(model.forecast(prediction_length_days as usize).iter().sum())
    }
}

impl ProductSeasonalModel {
    /// Conditional least-squares fit on the doubly-differenced series.
    fn fit(values: &[f64], period: usize) -> Self {
        let diff = double_difference(values, period);

        let (ar, seasonal_ar) = fit_ar_pair(&diff, period);

        // Moment estimates for the MA terms from the autocorrelation of the
        // AR residuals at lags 1 and `period`.
        let ar_residuals = arma_residuals(&diff, ar, seasonal_ar, 0.0, 0.0, period);
        let ma = clamp_coeff(autocorrelation(&ar_residuals, 1), MA_BOUND);
        let seasonal_ma = clamp_coeff(autocorrelation(&ar_residuals, period), MA_BOUND);

        let residuals = arma_residuals(&diff, ar, seasonal_ar, ma, seasonal_ma, period);
        let residual_variance = variance(&residuals);

        // Longest lag either recursion reaches back is period + 1.
        let tail = period + 2;
        Self {
            period,
            ar,
            seasonal_ar,
            ma,
            seasonal_ma,
            residual_variance,
            train_len: values.len(),
            history: values[values.len().saturating_sub(tail)..].to_vec(),
            diff_tail: diff[diff.len().saturating_sub(tail)..].to_vec(),
            residual_tail: residuals[residuals.len().saturating_sub(tail)..].to_vec(),
        }
    }

    /// Mean forecast for `horizon` days past the end of the training series.
    fn forecast(&self, horizon: usize) -> Vec<f64> {
        let s = self.period;
        let mut y = self.history.clone();
        let mut w = self.diff_tail.clone();
        let mut e = self.residual_tail.clone();

        let mut out = Vec::with_capacity(horizon);
        for _ in 0..horizon {
            let w_next = self.ar * lag(&w, 1)
                + self.seasonal_ar * lag(&w, s)
                - self.ar * self.seasonal_ar * lag(&w, s + 1)
                + self.ma * lag(&e, 1)
                + self.seasonal_ma * lag(&e, s)
                + self.ma * self.seasonal_ma * lag(&e, s + 1);

            // Undo (1 - B)(1 - B^s): y[t] = w[t] + y[t-1] + y[t-s] - y[t-s-1].
            let y_next = w_next + lag(&y, 1) + lag(&y, s) - lag(&y, s + 1);

            w.push(w_next);
            e.push(0.0); // future shocks have zero mean
            y.push(y_next);
            out.push(y_next);
        }
        out
    }
}

/// Apply first then seasonal differencing: w[t] = (1 - B)(1 - B^s) y[t].
fn double_difference(values: &[f64], s: usize) -> Vec<f64> {
    let first: Vec<f64> = values.windows(2).map(|pair| pair[1] - pair[0]).collect();
    first
        .iter()
        .skip(s)
        .zip(first.iter())
        .map(|(later, earlier)| later - earlier)
        .collect()
}

/// Least-squares fit of w[t] on w[t-1] and w[t-s] (normal equations of the
/// two-regressor problem).
fn fit_ar_pair(w: &[f64], s: usize) -> (f64, f64) {
    if w.len() <= s + 1 {
        return (0.0, 0.0);
    }
    let (mut s11, mut s12, mut s22, mut b1, mut b2) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for t in (s + 1)..w.len() {
        let x1 = w[t - 1];
        let x2 = w[t - s];
        s11 += x1 * x1;
        s12 += x1 * x2;
        s22 += x2 * x2;
        b1 += x1 * w[t];
        b2 += x2 * w[t];
    }
    let det = s11 * s22 - s12 * s12;
    if det.abs() < 1e-9 {
        // Degenerate design, e.g. a constant differenced series.
        return (0.0, 0.0);
    }
    let ar = (s22 * b1 - s12 * b2) / det;
    let seasonal_ar = (s11 * b2 - s12 * b1) / det;
    (clamp_coeff(ar, AR_BOUND), clamp_coeff(seasonal_ar, AR_BOUND))
}

/// One-pass residuals of the multiplicative ARMA recursion over `w`.
fn arma_residuals(w: &[f64], ar: f64, seasonal_ar: f64, ma: f64, seasonal_ma: f64, s: usize) -> Vec<f64> {
    let mut e = vec![0.0; w.len()];
    for t in 0..w.len() {
        let predicted = ar * back(w, t, 1)
            + seasonal_ar * back(w, t, s)
            - ar * seasonal_ar * back(w, t, s + 1)
            + ma * back(&e, t, 1)
            + seasonal_ma * back(&e, t, s)
            + ma * seasonal_ma * back(&e, t, s + 1);
        e[t] = w[t] - predicted;
    }
    e
}

fn back(values: &[f64], t: usize, k: usize) -> f64 {
    if t >= k {
        values[t - k]
    } else {
        0.0
    }
}

fn lag(values: &[f64], k: usize) -> f64 {
    if k == 0 || k > values.len() {
        0.0
    } else {
        values[values.len() - k]
    }
}

fn autocorrelation(values: &[f64], k: usize) -> f64 {
    if values.len() <= k {
        return 0.0;
    }
    let denom: f64 = values.iter().map(|v| v * v).sum();
    if denom < 1e-12 {
        return 0.0;
    }
    let num: f64 = values[k..]
        .iter()
        .zip(values.iter())
        .map(|(later, earlier)| later * earlier)
        .sum();
    num / denom
}

fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

fn clamp_coeff(value: f64, bound: f64) -> f64 {
    if value.is_finite() {
        value.clamp(-bound, bound)
    } else {
        0.0
    }
}
