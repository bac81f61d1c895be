pub mod error;
pub mod v1;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::{config::Config, forecast::ForecastEngine};

/// Training payloads ship a full sales history in one request.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ForecastEngine>,
}

impl AppState {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            engine: Arc::new(ForecastEngine::new(cfg)?),
        })
    }
}

pub fn router(state: AppState, cfg: &Config) -> Router {
    let mut router = v1::router(state);

    if cfg.server.enable_cors {
        router = router.layer(CorsLayer::permissive());
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_BYTES))
                .layer(TimeoutLayer::new(Duration::from_secs(
                    cfg.server.request_timeout_secs,
                ))),
        )
        .layer(TraceLayer::new_for_http())
}
