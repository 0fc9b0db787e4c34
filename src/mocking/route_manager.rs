use anyhow::Context;
use indexmap::IndexMap;
use serde_json::Value;

use crate::models::{DecodedBody, Request, Route, RouteChange};

/// Id-keyed collection of mock routes.
///
/// Ids are numeric strings handed out from a counter that only grows, so a
/// removed id is never reused. Iteration follows insertion order.
#[derive(Debug, Clone, Default)]
pub struct RouteManager {
    routes: IndexMap<String, Route>,
    next_route_id: u64,
}

impl RouteManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a cached route list, keying the routes `0..n`
    pub fn from_routes(routes: Vec<Route>) -> Self {
        let mut manager = Self::new();
        manager.replace_all(routes);
        manager
    }

    pub fn routes(&self) -> &IndexMap<String, Route> {
        &self.routes
    }

    pub fn get(&self, id: &str) -> Option<&Route> {
        self.routes.get(id)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn next_route_id(&self) -> u64 {
        self.next_route_id
    }

    fn insert(&mut self, route: Route) -> String {
        let id = self.next_route_id.to_string();
        self.next_route_id += 1;
        self.routes.insert(id.clone(), route);
        id
    }

    /// Insert an empty route and return its id
    pub fn add_route(&mut self) -> String {
        self.insert(Route::default())
    }

    /// Returns false when the id is unknown
    pub fn modify_route(&mut self, id: &str, change: RouteChange) -> bool {
        match self.routes.get_mut(id) {
            Some(route) => {
                route.apply(change);
                true
            }
            None => false,
        }
    }

    pub fn remove_route(&mut self, id: &str) -> Option<Route> {
        self.routes.shift_remove(id)
    }

    /// Flip the enabled flag, returning the new value
    pub fn enable_route(&mut self, id: &str) -> Option<bool> {
        let route = self.routes.get_mut(id)?;
        route.enabled = !route.enabled;
        Some(route.enabled)
    }

    /// Turn each request into a route answering with its recorded response
    pub fn copy_selected_calls<'a>(
        &mut self,
        requests: impl IntoIterator<Item = &'a Request>,
    ) -> Vec<String> {
        requests
            .into_iter()
            .map(|request| self.insert(route_from_request(request)))
            .collect()
    }

    /// Append routes from a JSON array. Returns the new ids.
    ///
    /// Entries that are null or not route-shaped are skipped; imported routes
    /// are always enabled.
    pub fn import_routes(&mut self, json: &str) -> anyhow::Result<Vec<String>> {
        let entries: Vec<Value> =
            serde_json::from_str(json).context("route file is not a JSON array")?;
        let mut ids = Vec::new();
        for (position, entry) in entries.into_iter().enumerate() {
            if entry.is_null() {
                continue;
            }
            match serde_json::from_value::<Route>(entry) {
                Ok(mut route) => {
                    route.enabled = true;
                    ids.push(self.insert(route));
                }
                Err(err) => {
                    tracing::warn!("Skipping route #{} in import: {}", position, err);
                }
            }
        }
        Ok(ids)
    }

    /// All routes as a 2-space indented JSON array
    pub fn export_routes(&self) -> anyhow::Result<String> {
        let routes: Vec<&Route> = self.routes.values().collect();
        serde_json::to_string_pretty(&routes).context("serializing routes")
    }

    pub fn clear_routes(&mut self) {
        self.routes.clear();
    }

    /// Replace every route, re-keying them `0..n`
    pub fn replace_all(&mut self, routes: Vec<Route>) {
        self.routes = routes
            .into_iter()
            .enumerate()
            .map(|(id, route)| (id.to_string(), route))
            .collect();
        self.next_route_id = self.routes.len() as u64;
    }
}

fn route_from_request(request: &Request) -> Route {
    let mut response_headers = IndexMap::new();
    for header in request.response_headers.iter().flatten() {
        response_headers.insert(header.key.clone(), header.clone());
    }
    // TODO: binary responses could be kept once MockRoute carries raw bytes
    let response_data = match &request.response_data {
        Some(DecodedBody::Text(text)) => text.clone(),
        Some(DecodedBody::Binary(_)) | None => String::new(),
    };
    Route {
        request_url: request.url.clone(),
        request_method: request.method.clone(),
        response_data,
        response_headers,
        response_status: request.status.map(|s| s.to_string()).unwrap_or_default(),
        enabled: true,
    }
}
