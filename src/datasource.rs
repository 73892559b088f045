//! The datasource facade called by the dashboard front-end.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::client::{EndpointPool, HttpTransport, Method, RequestError, RequestExecutor};
use crate::config::DatasourceConfig;
use crate::dashboard::{
    DashboardError, DashboardRecord, Dashboards, KeyValueStore, RouteParams, SaveResult, SearchHits,
};
use crate::interpolate::{TemplateError, VariableInterpolator};
use crate::query::{build_query, fill_placeholders, BuiltQuery, TargetSpec, DEFAULT_INTERVAL};
use crate::series::{to_annotations, to_time_series, value_text, AnnotationEvent, AnnotationSpec, RowSet, TimeSeries};
use crate::time_filter::{time_filter, TimeRange};

/// Datasource error types.
#[derive(Error, Debug)]
pub enum DatasourceError {
    #[error("InfluxDB error: {0}")]
    Request(#[from] RequestError),
    #[error("template error: {0}")]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Dashboard(#[from] DashboardError),
    #[error("{0}")]
    NotFound(String),
    #[error("invalid dashboard JSON: {0}")]
    InvalidDashboard(#[from] serde_json::Error),
}

/// A panel query request.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryOptions {
    pub range: TimeRange,
    #[serde(default)]
    pub interval: Option<String>,
    #[serde(default)]
    pub targets: Vec<TargetSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResponse {
    pub data: Vec<TimeSeries>,
}

/// One value of a template variable query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricFindValue {
    pub text: String,
    pub expandable: bool,
}

/// Cloudify time-series datasource.
pub struct CloudifyDatasource {
    name: String,
    executor: RequestExecutor,
    interpolator: Arc<dyn VariableInterpolator>,
    dashboards: Dashboards,
}

impl CloudifyDatasource {
    pub fn new(
        name: &str,
        executor: RequestExecutor,
        interpolator: Arc<dyn VariableInterpolator>,
        dashboards: Dashboards,
    ) -> Self {
        Self {
            name: name.to_string(),
            executor,
            interpolator,
            dashboards,
        }
    }

    /// Build a datasource talking HTTP to the configured endpoints.
    pub fn from_config(
        cfg: &DatasourceConfig,
        store: Arc<dyn KeyValueStore>,
        interpolator: Arc<dyn VariableInterpolator>,
    ) -> Result<Self, DatasourceError> {
        let route = match &cfg.dashboard_id {
            Some(id) => RouteParams::new().with("dashboardId", id),
            None => RouteParams::new(),
        };

        let pool = EndpointPool::new(cfg.urls.iter().cloned())?;
        for url in pool.urls() {
            tracing::debug!("Datasource {} endpoint {}", cfg.name, url);
        }

        let transport = Arc::new(HttpTransport::new(cfg.request_timeout())?);
        let executor = RequestExecutor::new(pool, transport, cfg.retry_policy())
            .with_authorization(cfg.basic_auth.clone())
            .with_route_params(route.as_map().clone());

        Ok(Self::new(&cfg.name, executor, interpolator, Dashboards::new(store, route)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dashboard_url(&self) -> String {
        self.dashboards.route().dashboard_url()
    }

    /// Run every visible target concurrently and merge their series.
    ///
    /// Fails as soon as any target fails.
    pub async fn query(&self, options: &QueryOptions) -> Result<QueryResponse, DatasourceError> {
        let filter = time_filter(&options.range);

        let built = options
            .targets
            .iter()
            .cloned()
            .filter_map(TargetSpec::into_target)
            .map(|t| build_query(&t, &filter, options.interval.as_deref(), self.interpolator.as_ref()))
            .collect::<Result<Vec<BuiltQuery>, _>>()?;

        tracing::debug!("Running {} queries for {}", built.len(), self.name);

        let results = try_join_all(built.iter().map(|b| self.run_query(b))).await?;
        Ok(QueryResponse {
            data: results.into_iter().flatten().collect(),
        })
    }

    async fn run_query(&self, built: &BuiltQuery) -> Result<Vec<TimeSeries>, DatasourceError> {
        let row_sets = self.series_query(&built.query).await?;
        Ok(to_time_series(
            &row_sets,
            built.alias.as_deref(),
            built.group_by_field.as_deref(),
        ))
    }

    pub async fn annotation_query(
        &self,
        annotation: &AnnotationSpec,
        range: &TimeRange,
    ) -> Result<Vec<AnnotationEvent>, DatasourceError> {
        let query = fill_placeholders(&annotation.query, &time_filter(range), DEFAULT_INTERVAL);
        let query = self.interpolator.replace(&query)?;
        let row_sets = self.series_query(&query).await?;
        Ok(to_annotations(&row_sets, annotation))
    }

    /// Series names known to the backend.
    pub async fn list_series(&self) -> Result<Vec<String>, DatasourceError> {
        let row_sets = self.rest_query("/series/list").await?;
        let Some(first) = row_sets.first() else {
            return Ok(Vec::new());
        };

        // Newer backends list names as points of one row-set
        if !first.points.is_empty() {
            return Ok(first
                .points
                .iter()
                .filter_map(|p| p.get(1))
                .map(value_text)
                .collect());
        }

        Ok(row_sets.into_iter().map(|rs| rs.name).collect())
    }

    pub async fn list_columns(&self, series: &str) -> Result<Vec<String>, DatasourceError> {
        let row_sets = self
            .series_query(&format!("select * from /{}/ limit 1", series))
            .await?;
        Ok(row_sets.into_iter().next().map(|rs| rs.columns).unwrap_or_default())
    }

    /// Values for a template variable query.
    pub async fn metric_find_query(&self, query: &str) -> Result<Vec<MetricFindValue>, DatasourceError> {
        let query = self.interpolator.replace(query)?;
        let row_sets = self.series_query(&query).await?;

        Ok(row_sets
            .first()
            .map(|rs| {
                rs.points
                    .iter()
                    .filter_map(|p| p.get(1))
                    .map(|v| MetricFindValue {
                        text: value_text(v),
                        expandable: false,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Fetch a dashboard stored in the backend itself.
    pub async fn get_dashboard(&self, id: &str, is_temp: bool) -> Result<Value, DatasourceError> {
        let prefix = if is_temp { "grafana.temp_dashboard_" } else { "grafana.dashboard_" };
        let query = format!("select dashboard from \"{}{}\"", prefix, STANDARD.encode(id));

        let row_sets = self.series_query(&query).await?;
        let not_found = || DatasourceError::NotFound("Dashboard not found".to_string());

        let first = row_sets.first().ok_or_else(not_found)?;
        let col = first.column_index("dashboard").ok_or_else(not_found)?;
        let cell = first.points.first().and_then(|p| p.get(col)).ok_or_else(not_found)?;

        match cell {
            Value::String(json) => Ok(serde_json::from_str(json)?),
            other => Ok(other.clone()),
        }
    }

    pub fn save_dashboard(&self, dashboard: DashboardRecord) -> Result<SaveResult, DatasourceError> {
        Ok(self.dashboards.save(dashboard)?)
    }

    pub fn delete_dashboard(&self, id: &str) -> Result<String, DatasourceError> {
        Ok(self.dashboards.delete(id)?)
    }

    pub fn search_dashboards(&self, query: &str) -> Result<SearchHits, DatasourceError> {
        Ok(self.dashboards.search(query)?)
    }

    pub fn load_dashboard(&self, sub_id: Option<&str>) -> Result<DashboardRecord, DatasourceError> {
        Ok(self.dashboards.load(sub_id)?)
    }

    async fn series_query(&self, query: &str) -> Result<Vec<RowSet>, RequestError> {
        let value = self
            .executor
            .execute(Method::Get, "/series", &[("q", query), ("time_precision", "s")])
            .await?;
        row_sets(value)
    }

    async fn rest_query(&self, path: &str) -> Result<Vec<RowSet>, RequestError> {
        let value = self
            .executor
            .execute(Method::Get, path, &[("time_precision", "s")])
            .await?;
        row_sets(value)
    }
}

fn row_sets(value: Value) -> Result<Vec<RowSet>, RequestError> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_value(value)?)
}
