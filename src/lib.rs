//! Retail stock requirement forecasting service.
//!
//! Historical sale records train two independent models: a pooled
//! random-forest regression over calendar and price features, and one
//! weekly-seasonal time-series model per product. Trained artifacts persist
//! in a file-backed store and answer later "how much stock for the next N
//! periods" queries.

pub mod api;
pub mod config;
pub mod domain;
pub mod forecast;
pub mod store;
pub mod telemetry;
