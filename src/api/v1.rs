use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    api::{error::ApiError, AppState},
    domain::{SaleRecord, StockQuery},
};

/// Periods assumed when a prediction request carries no horizon.
const DEFAULT_FORECAST_DURATION: u32 = 6;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/train-stock-model", post(train_stock_model))
        .route("/predict-stock", post(predict_stock))
        .route("/train-stock-model-v2", post(train_stock_model_v2))
        .route("/predict-stock-v2", post(predict_stock_v2))
        .route("/healthz", get(healthz))
        .with_state(state)
}

pub async fn healthz() -> impl IntoResponse {
    StatusCode::OK
}

#[derive(Debug, Deserialize)]
pub struct TrainRequest {
    #[serde(rename = "salesData")]
    pub sales_data: Vec<SaleRecord>,
}

#[derive(Debug, Serialize)]
pub struct TrainResponse {
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictStockRequest {
    pub product_id: i64,
    pub sale_price: f64,
    pub sale_date: String,
    #[serde(rename = "forecast_duration")]
    pub forecast_duration: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct PredictStockResponse {
    pub predicted_stock_quantity_for_period: Vec<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictStockV2Request {
    pub product_id: i64,
    pub prediction_length: u32,
}

#[derive(Debug, Serialize)]
pub struct PredictStockV2Response {
    pub predicted_stock_quantity: f64,
}

/// POST /train-stock-model - fit the pooled regression model
pub async fn train_stock_model(
    State(st): State<AppState>,
    Json(req): Json<TrainRequest>,
) -> Result<Json<TrainResponse>, ApiError> {
    let engine = st.engine.clone();
    run_blocking(move || engine.train_regression(&req.sales_data)).await?;
    Ok(Json(TrainResponse {
        message: "Stock model trained successfully".to_string(),
    }))
}

/// POST /predict-stock - total quantity over the requested number of periods
pub async fn predict_stock(
    State(st): State<AppState>,
    Json(req): Json<PredictStockRequest>,
) -> Result<Json<PredictStockResponse>, ApiError> {
    let duration = req.forecast_duration.unwrap_or(DEFAULT_FORECAST_DURATION);
    let query = StockQuery {
        product_id: req.product_id,
        sale_date: req.sale_date,
        sale_price: req.sale_price,
    };

    let engine = st.engine.clone();
    let predicted = run_blocking(move || engine.predict_regression(&[query], duration)).await?;
    Ok(Json(PredictStockResponse {
        predicted_stock_quantity_for_period: predicted,
    }))
}

/// POST /train-stock-model-v2 - fit one seasonal model per product
pub async fn train_stock_model_v2(
    State(st): State<AppState>,
    Json(req): Json<TrainRequest>,
) -> Result<Json<TrainResponse>, ApiError> {
    let engine = st.engine.clone();
    run_blocking(move || engine.train_seasonal(&req.sales_data)).await?;
    Ok(Json(TrainResponse {
        message: "Stock model v2 trained successfully".to_string(),
    }))
}

/// POST /predict-stock-v2 - total quantity over the requested number of days
pub async fn predict_stock_v2(
    State(st): State<AppState>,
    Json(req): Json<PredictStockV2Request>,
) -> Result<Json<PredictStockV2Response>, ApiError> {
    let engine = st.engine.clone();
    let predicted =
        run_blocking(move || engine.predict_seasonal(req.product_id, req.prediction_length)).await?;
    Ok(Json(PredictStockV2Response {
        predicted_stock_quantity: predicted,
    }))
}

/// Model fitting and inference are CPU-bound; run them on the blocking pool
/// while the handler awaits, so the call stays synchronous to the caller.
async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> crate::forecast::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::InternalError(format!("blocking task failed: {e}")))?
        .map_err(ApiError::from)
}
