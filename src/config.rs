use anyhow::Result;
use figment::{providers::{Env, Format, Toml}, Figment};
use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub regression: RegressionConfig,
    pub seasonal: SeasonalConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the persisted model artifacts.
    pub dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegressionConfig {
    pub n_trees: usize,
    pub max_depth: Option<u16>,
    pub seed: u64,
    pub train_ratio: f64,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            seed: 42,
            train_ratio: 0.8,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeasonalConfig {
    /// Length of the demand cycle in days.
    pub period: usize,
}

impl Default for SeasonalConfig {
    fn default() -> Self {
        Self { period: 7 }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("STOCKCAST__").split("__"));
        Ok(figment.extract()?)
    }
}
