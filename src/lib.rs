//! Cloudify datasource: InfluxDB-compatible query adapter for dashboards.
//!
//! Turns panel targets and a time range into backend queries, runs them
//! against a rotating set of endpoints, and normalizes the row-set
//! responses into time series and annotation events. Dashboards are kept
//! in a key-value store.

pub mod client;
pub mod config;
pub mod dashboard;
pub mod datasource;
pub mod interpolate;
pub mod query;
pub mod series;
pub mod time_filter;

pub use config::DatasourceConfig;
pub use datasource::{CloudifyDatasource, DatasourceError, QueryOptions, QueryResponse};
