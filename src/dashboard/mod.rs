//! Dashboard metadata persisted in a key-value store.
//!
//! All dashboards for one route dashboard id live in a single JSON array
//! under `grafana-<id>`; every write re-serializes the whole array.

mod models;
mod search;
mod store;

pub use models::*;
pub use search::*;
pub use store::*;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Dashboard operation errors.
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Failed to save dashboard: {0}")]
    Save(#[source] StoreError),
    #[error("Could not delete dashboard, {0}")]
    Delete(#[source] StoreError),
    #[error("Could not load dashboards: {0}")]
    Load(#[source] StoreError),
    #[error("Dashboard not found")]
    NotFound,
}

/// Parameters of the active route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteParams(BTreeMap<String, String>);

impl RouteParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.0.insert(key.to_string(), value.to_string());
        self
    }

    pub fn dashboard_id(&self) -> Option<&str> {
        self.0.get("dashboardId").map(String::as_str)
    }

    /// Key of this route's dashboard bucket.
    pub fn storage_key(&self) -> String {
        format!("grafana-{}", self.dashboard_id().unwrap_or("default"))
    }

    pub fn dashboard_url(&self) -> String {
        format!("dashboard/cloudify/{}", self.dashboard_id().unwrap_or("default"))
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.0
    }
}

/// Save, delete, search and load dashboards of one route.
#[derive(Clone)]
pub struct Dashboards {
    store: Arc<dyn KeyValueStore>,
    route: RouteParams,
}

impl Dashboards {
    pub fn new(store: Arc<dyn KeyValueStore>, route: RouteParams) -> Self {
        Self { store, route }
    }

    pub fn route(&self) -> &RouteParams {
        &self.route
    }

    fn load_all(&self) -> Result<Vec<DashboardRecord>, StoreError> {
        match self.store.get(&self.route.storage_key())? {
            Some(json) if !json.trim().is_empty() => {
                Ok(serde_json::from_str::<Option<Vec<DashboardRecord>>>(&json)?.unwrap_or_default())
            }
            _ => Ok(Vec::new()),
        }
    }

    fn store_all(&self, dashboards: &[DashboardRecord]) -> Result<(), StoreError> {
        let json = serde_json::to_string(dashboards)?;
        self.store.set(&self.route.storage_key(), &json)
    }

    /// Store a dashboard under a fresh id. A `temp` marker is dropped first.
    pub fn save(&self, mut dashboard: DashboardRecord) -> Result<SaveResult, DashboardError> {
        dashboard.payload.remove("temp");
        dashboard.id = generate_id();

        let id = dashboard.id.clone();
        let title = dashboard.title.clone();

        let mut all = self.load_all().map_err(DashboardError::Save)?;
        all.push(dashboard);
        self.store_all(&all).map_err(DashboardError::Save)?;

        tracing::info!("Saved dashboard {} ({}) under {}", title, id, self.route.storage_key());

        Ok(SaveResult {
            url: format!("/{}/{}", self.route.dashboard_url(), id),
            id,
            title,
        })
    }

    /// Remove the first dashboard with this id.
    ///
    /// Returns the removed dashboard's title, or the id when none matched.
    pub fn delete(&self, id: &str) -> Result<String, DashboardError> {
        let mut all = self.load_all().map_err(DashboardError::Delete)?;

        let title = match all.iter().position(|d| d.id == id) {
            Some(i) => all.remove(i).title,
            None => {
                tracing::debug!("No dashboard {} in {}", id, self.route.storage_key());
                id.to_string()
            }
        };

        self.store_all(&all).map_err(DashboardError::Delete)?;
        Ok(title)
    }

    pub fn search(&self, query: &str) -> Result<SearchHits, DashboardError> {
        let all = self.load_all().map_err(DashboardError::Load)?;
        Ok(search(all, &SearchQuery::parse(query)))
    }

    /// The dashboard with `sub_id`, else the first stored one.
    pub fn load(&self, sub_id: Option<&str>) -> Result<DashboardRecord, DashboardError> {
        let mut all = self.load_all().map_err(DashboardError::Load)?;
        if all.is_empty() {
            return Err(DashboardError::NotFound);
        }

        let index = sub_id
            .and_then(|id| all.iter().position(|d| d.id == id))
            .unwrap_or(0);
        Ok(all.swap_remove(index))
    }
}
