//! Cloudify datasource query runner.
//!
//! Reads a query request (`{"range": ..., "targets": [...], "variables": {...}}`)
//! from stdin and prints the normalized series as JSON.

use std::collections::HashMap;
use std::sync::Arc;

use cloudify_datasource::dashboard::SqliteStore;
use cloudify_datasource::interpolate::TemplateVariables;
use cloudify_datasource::query::TargetSpec;
use cloudify_datasource::time_filter::TimeRange;
use cloudify_datasource::{CloudifyDatasource, DatasourceConfig, QueryOptions};

use serde::Deserialize;
use tokio::io::AsyncReadExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Deserialize)]
struct QueryRequest {
    range: TimeRange,
    #[serde(default)]
    interval: Option<String>,
    #[serde(default)]
    targets: Vec<TargetSpec>,
    #[serde(default)]
    variables: HashMap<String, String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Logs go to stderr, stdout carries the result
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("cloudify_datasource=info".parse()?))
        .init();

    let cfg = DatasourceConfig::load();
    tracing::info!("Datasource {} using {} endpoint(s)", cfg.name, cfg.urls.len());
    tracing::info!("Using dashboard store at {}", cfg.db_path);

    let store = Arc::new(SqliteStore::new(&cfg.db_path)?);

    let mut input = String::new();
    tokio::io::stdin().read_to_string(&mut input).await?;
    let request: QueryRequest = serde_json::from_str(&input)?;

    let mut variables = TemplateVariables::new();
    for (name, value) in &request.variables {
        variables.set(name, value);
    }

    let datasource = CloudifyDatasource::from_config(&cfg, store, Arc::new(variables))?;
    let options = QueryOptions {
        range: request.range,
        interval: request.interval,
        targets: request.targets,
    };

    match datasource.query(&options).await {
        Ok(response) => {
            tracing::info!("Query returned {} series", response.data.len());
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Query failed: {}", e);
            Err(e.into())
        }
    }
}
