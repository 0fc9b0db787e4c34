//! Mock route engine
//!
//! Routes are edited locally and pushed to the client, which answers
//! matching calls with the canned response instead of hitting the network.

mod route_manager;

pub use route_manager::RouteManager;

use anyhow::Context;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::models::{MockRoute, Route};

/// Default file name offered when exporting routes
pub const DEFAULT_EXPORT_FILE_NAME: &str = "NetworkPluginRoutesExport.json";

fn route_key(route: &Route) -> (&str, &str) {
    (&route.request_url, &route.request_method)
}

/// Keep only the first route for each `(url, method)` pair.
///
/// Later duplicates are dropped even when the first one is disabled.
pub fn compute_mock_routes(routes: &IndexMap<String, Route>) -> IndexMap<String, Route> {
    let mut seen: HashSet<(&str, &str)> = HashSet::new();
    routes
        .iter()
        .filter(|&(_, route)| seen.insert(route_key(route)))
        .map(|(id, route)| (id.clone(), route.clone()))
        .collect()
}

/// Payload for the client's `mockResponses` call
pub fn enabled_mock_routes(routes: &IndexMap<String, Route>) -> Vec<MockRoute> {
    compute_mock_routes(routes)
        .values()
        .filter(|route| route.enabled)
        .map(Route::to_mock_route)
        .collect()
}

/// Ids of routes that share their `(url, method)` with another route
pub fn duplicate_route_ids(routes: &IndexMap<String, Route>) -> Vec<String> {
    let mut counts: HashMap<(&str, &str), usize> = HashMap::new();
    for route in routes.values() {
        *counts.entry(route_key(route)).or_default() += 1;
    }
    routes
        .iter()
        .filter(|&(_, route)| counts[&route_key(route)] > 1)
        .map(|(id, _)| id.clone())
        .collect()
}

/// Read a route file and append its routes to `manager`
pub async fn import_routes_from_path(
    manager: &mut RouteManager,
    path: impl AsRef<Path>,
) -> anyhow::Result<Vec<String>> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading route file {:?}", path))?;
    let ids = manager.import_routes(&contents)?;
    tracing::info!("Imported {} mock routes from {:?}", ids.len(), path);
    Ok(ids)
}

pub async fn export_routes_to_path(
    manager: &RouteManager,
    path: impl AsRef<Path>,
) -> anyhow::Result<()> {
    let path = path.as_ref();
    let json = manager.export_routes()?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("writing route file {:?}", path))?;
    tracing::info!("Exported {} mock routes to {:?}", manager.len(), path);
    Ok(())
}
