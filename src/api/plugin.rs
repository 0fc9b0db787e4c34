//! Network plugin facade
//!
//! Owns one session's request state, the mock routes and the preferences,
//! and keeps the connected client informed about mock route changes.

use serde_json::json;
use std::path::Path;
use std::sync::Arc;

use crate::api::{MessageEnvelope, NetworkConfig, PluginClient};
use crate::mocking::{self, compute_mock_routes, enabled_mock_routes, RouteManager};
use crate::models::{BodyFormat, CustomColumn, Request, Route, RouteChange};
use crate::protobuf::ProtobufDefinitionsRegistry;
use crate::state::{NetworkEvent, NetworkState};
use crate::storage::{
    mock_route_list_key, LocalStore, PersistedState, RequestTable, RESPONSE_BODY_FORMAT_KEY,
};

const MOCK_RESPONSES_METHOD: &str = "mockResponses";

pub struct NetworkPlugin {
    config: NetworkConfig,
    client: Arc<dyn PluginClient>,
    store: LocalStore,
    state: NetworkState,
    routes: RouteManager,
    selected_id: Option<String>,
    body_format: BodyFormat,
    is_mock_response_supported: bool,
}

impl NetworkPlugin {
    /// Create a plugin whose preferences live under `config.storage_path`
    pub fn new(config: NetworkConfig, client: Arc<dyn PluginClient>) -> anyhow::Result<Self> {
        let store = LocalStore::open(&config.storage_path)?;
        Ok(Self::with_store(config, client, store))
    }

    pub fn with_store(
        config: NetworkConfig,
        client: Arc<dyn PluginClient>,
        store: LocalStore,
    ) -> Self {
        let body_format = load_body_format(&store);
        Self {
            config,
            client,
            store,
            state: NetworkState::new(),
            routes: RouteManager::new(),
            selected_id: None,
            body_format,
            is_mock_response_supported: false,
        }
    }

    /// Restore a saved session
    pub fn from_persisted(
        config: NetworkConfig,
        client: Arc<dyn PluginClient>,
        store: LocalStore,
        persisted: PersistedState,
    ) -> Self {
        let mut plugin = Self::with_store(config, client, store);
        plugin.selected_id = persisted.selected_id.clone();
        plugin.is_mock_response_supported = persisted.is_mock_response_supported;
        plugin.state = NetworkState::from_persisted(persisted);
        plugin
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn state(&self) -> &NetworkState {
        &self.state
    }

    pub fn requests(&self) -> &RequestTable {
        &self.state.requests
    }

    pub fn request(&self, id: &str) -> Option<&Request> {
        self.state.requests.get_by_id(id)
    }

    pub fn protobuf_definitions(&self) -> &ProtobufDefinitionsRegistry {
        &self.state.protobuf_definitions
    }

    pub fn routes(&self) -> &RouteManager {
        &self.routes
    }

    pub fn is_mock_response_supported(&self) -> bool {
        self.is_mock_response_supported
    }

    // ---- Inbound messages ----

    /// Apply one client message. Unknown methods and bad payloads are logged
    /// and skipped.
    pub fn handle_message(&mut self, envelope: MessageEnvelope) {
        match NetworkEvent::from_message(&envelope.method, envelope.params) {
            Ok(Some(event)) => self.handle_event(event),
            Ok(None) => {
                tracing::debug!("Ignoring unknown network message {}", envelope.method);
            }
            Err(err) => {
                tracing::warn!("Dropping malformed {} message: {:#}", envelope.method, err);
            }
        }
    }

    pub fn handle_event(&mut self, event: NetworkEvent) {
        let is_partial = matches!(event, NetworkEvent::PartialResponse(_));
        self.apply(event);
        if is_partial {
            self.prune_stale_partials(chrono::Utc::now().timestamp_millis());
        }
    }

    fn apply(&mut self, event: NetworkEvent) {
        let state = std::mem::take(&mut self.state);
        self.state = state.reduce(event);
    }

    /// Drop incomplete multi-part responses older than the configured TTL
    pub fn prune_stale_partials(&mut self, now_ms: i64) {
        if let Some(ttl_ms) = self.config.partial_response_ttl_ms {
            self.apply(NetworkEvent::PrunePartials { now_ms, ttl_ms });
        }
    }

    // ---- Table and view ----

    /// Remove every request row; pending chunks are kept
    pub fn clear_logs(&mut self) {
        self.apply(NetworkEvent::Clear);
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected_id.as_deref()
    }

    pub fn select(&mut self, id: Option<String>) {
        self.selected_id = id;
    }

    pub fn selected_request(&self) -> Option<&Request> {
        self.selected_id.as_deref().and_then(|id| self.request(id))
    }

    pub fn body_format(&self) -> BodyFormat {
        self.body_format
    }

    pub fn set_body_format(&mut self, format: BodyFormat) {
        self.body_format = format;
        if let Err(err) = self.store.set_item(RESPONSE_BODY_FORMAT_KEY, format.as_str()) {
            tracing::error!("Failed to persist body format: {:#}", err);
        }
    }

    pub fn custom_columns(&self) -> &[CustomColumn] {
        &self.state.custom_columns
    }

    pub fn add_custom_column(&mut self, column: CustomColumn) {
        self.apply(NetworkEvent::AddCustomColumn(column));
    }

    pub fn remove_custom_column(&mut self, column: CustomColumn) {
        self.apply(NetworkEvent::RemoveCustomColumn(column));
    }

    // ---- Mock routes ----

    /// Connection setup: negotiate mock support, restore cached routes and
    /// push them to the client.
    pub async fn on_connect(&mut self) {
        self.is_mock_response_supported = if self.config.device_archived {
            true
        } else {
            self.client.supports_method(MOCK_RESPONSES_METHOD).await
        };

        let cached = self.load_cached_routes();
        tracing::info!(
            "Restored {} mock routes for '{}' (mocks supported: {})",
            cached.len(),
            self.config.app_id,
            self.is_mock_response_supported
        );
        self.routes.replace_all(cached);
        self.inform_client_mock_change().await;
    }

    fn load_cached_routes(&self) -> Vec<Route> {
        let key = mock_route_list_key(&self.config.app_id);
        let raw = match self.store.get_item(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                tracing::error!("Failed to read cached mock routes: {:#}", err);
                return Vec::new();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|err| {
            tracing::warn!("Ignoring unreadable cached mock routes: {}", err);
            Vec::new()
        })
    }

    /// Persist the de-duplicated routes and send the enabled ones to the
    /// client. Failures are logged; local routes stay as they are.
    pub async fn inform_client_mock_change(&self) {
        if !self.is_mock_response_supported {
            return;
        }

        let filtered: Vec<Route> = compute_mock_routes(self.routes.routes())
            .into_values()
            .collect();
        let key = mock_route_list_key(&self.config.app_id);
        let saved = serde_json::to_string(&filtered)
            .map_err(anyhow::Error::from)
            .and_then(|json| self.store.set_item(&key, &json));
        if let Err(err) = saved {
            tracing::error!("Failed to cache mock routes: {:#}", err);
        }

        if self.config.device_archived {
            return;
        }
        let routes = enabled_mock_routes(self.routes.routes());
        tracing::debug!("Pushing {} mock routes", routes.len());
        if let Err(err) = self
            .client
            .send(MOCK_RESPONSES_METHOD, json!({ "routes": routes }))
            .await
        {
            tracing::error!("Failed to mock responses: {:#}", err);
        }
    }

    /// Add an empty route. Not pushed until it is edited.
    pub fn add_route(&mut self) -> String {
        self.routes.add_route()
    }

    pub async fn modify_route(&mut self, id: &str, change: RouteChange) {
        if self.routes.modify_route(id, change) {
            self.inform_client_mock_change().await;
        }
    }

    pub async fn remove_route(&mut self, id: &str) {
        self.routes.remove_route(id);
        self.inform_client_mock_change().await;
    }

    pub async fn enable_route(&mut self, id: &str) {
        self.routes.enable_route(id);
        self.inform_client_mock_change().await;
    }

    /// Create routes from the given request ids; unknown ids are skipped
    pub async fn copy_selected_calls(&mut self, ids: &[String]) -> Vec<String> {
        let requests: Vec<&Request> = ids
            .iter()
            .filter_map(|id| self.state.requests.get_by_id(id))
            .collect();
        let new_ids = self.routes.copy_selected_calls(requests);
        self.inform_client_mock_change().await;
        new_ids
    }

    pub async fn import_routes(&mut self, json: &str) -> anyhow::Result<Vec<String>> {
        let ids = self.routes.import_routes(json)?;
        self.inform_client_mock_change().await;
        Ok(ids)
    }

    pub async fn import_routes_from_path(
        &mut self,
        path: impl AsRef<Path>,
    ) -> anyhow::Result<Vec<String>> {
        let ids = mocking::import_routes_from_path(&mut self.routes, path).await?;
        self.inform_client_mock_change().await;
        Ok(ids)
    }

    pub fn export_routes(&self) -> anyhow::Result<String> {
        self.routes.export_routes()
    }

    pub async fn export_routes_to_path(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        mocking::export_routes_to_path(&self.routes, path).await
    }

    pub async fn clear_routes(&mut self) {
        self.routes.clear_routes();
        self.inform_client_mock_change().await;
    }

    pub fn duplicate_route_ids(&self) -> Vec<String> {
        mocking::duplicate_route_ids(self.routes.routes())
    }

    // ---- Sessions ----

    pub fn export_state(&self) -> PersistedState {
        PersistedState {
            selected_id: self.selected_id.clone(),
            is_mock_response_supported: self.is_mock_response_supported,
            ..self.state.to_persisted()
        }
    }

    pub async fn save_state_to_path(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        self.export_state().save_to_path(path).await
    }

    /// Load a saved session as an archived (offline) device
    pub async fn load_state_from_path(
        config: NetworkConfig,
        client: Arc<dyn PluginClient>,
        store: LocalStore,
        path: impl AsRef<Path>,
    ) -> anyhow::Result<Self> {
        let persisted = PersistedState::load_from_path(path).await?;
        let config = NetworkConfig {
            device_archived: true,
            ..config
        };
        Ok(Self::from_persisted(config, client, store, persisted))
    }
}

fn load_body_format(store: &LocalStore) -> BodyFormat {
    match store.get_item(RESPONSE_BODY_FORMAT_KEY) {
        Ok(Some(value)) => value.parse().unwrap_or_else(|err| {
            tracing::warn!("{}", err);
            BodyFormat::default()
        }),
        Ok(None) => BodyFormat::default(),
        Err(err) => {
            tracing::error!("Failed to read body format: {:#}", err);
            BodyFormat::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingClient {
        supports_mocks: bool,
        fail_sends: bool,
        sent: Mutex<Vec<(String, Value)>>,
    }

    impl RecordingClient {
        fn supporting() -> Arc<Self> {
            Arc::new(Self {
                supports_mocks: true,
                ..Default::default()
            })
        }

        fn pushes(&self) -> Vec<Value> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .map(|(_, params)| params["routes"].clone())
                .collect()
        }
    }

    #[async_trait]
    impl PluginClient for RecordingClient {
        async fn supports_method(&self, method: &str) -> bool {
            self.supports_mocks && method == MOCK_RESPONSES_METHOD
        }

        async fn send(&self, method: &str, params: Value) -> anyhow::Result<()> {
            self.sent
                .lock()
                .unwrap()
                .push((method.to_string(), params));
            if self.fail_sends {
                anyhow::bail!("client went away");
            }
            Ok(())
        }
    }

    fn config(app_id: &str) -> NetworkConfig {
        NetworkConfig {
            app_id: app_id.to_string(),
            ..NetworkConfig::default()
        }
    }

    fn plugin(client: Arc<RecordingClient>, store: LocalStore) -> NetworkPlugin {
        NetworkPlugin::with_store(config("app"), client, store)
    }

    fn url_change(url: &str) -> RouteChange {
        RouteChange {
            request_url: Some(url.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn connect_pushes_cached_routes() {
        let store = LocalStore::in_memory().unwrap();
        store
            .set_item(
                &mock_route_list_key("app"),
                r#"[{"requestUrl": "https://a.com", "requestMethod": "GET", "responseData": "",
                     "responseHeaders": {}, "responseStatus": "200", "enabled": true}]"#,
            )
            .unwrap();
        let client = RecordingClient::supporting();
        let mut plugin = plugin(client.clone(), store);
        plugin.on_connect().await;

        assert!(plugin.is_mock_response_supported());
        assert_eq!(plugin.routes().next_route_id(), 1);
        let pushes = client.pushes();
        assert_eq!(pushes.len(), 1);
        assert_eq!(pushes[0][0]["requestUrl"], "https://a.com");
        assert_eq!(pushes[0][0]["method"], "GET");
    }

    #[tokio::test]
    async fn unsupported_client_gets_nothing() {
        let client = Arc::new(RecordingClient::default());
        let store = LocalStore::in_memory().unwrap();
        let mut plugin = plugin(client.clone(), store.clone());
        plugin.on_connect().await;
        let id = plugin.add_route();
        plugin.modify_route(&id, url_change("https://a.com")).await;

        assert!(!plugin.is_mock_response_supported());
        assert!(client.pushes().is_empty());
        assert_eq!(store.get_item(&mock_route_list_key("app")).unwrap(), None);
    }

    #[tokio::test]
    async fn push_semantics_follow_mutation() {
        let client = RecordingClient::supporting();
        let mut plugin = plugin(client.clone(), LocalStore::in_memory().unwrap());
        plugin.on_connect().await;

        let id = plugin.add_route();
        assert_eq!(client.pushes().len(), 1);

        plugin.modify_route("missing", url_change("x")).await;
        assert_eq!(client.pushes().len(), 1);

        plugin.modify_route(&id, url_change("https://a.com")).await;
        plugin.enable_route(&id).await;
        assert_eq!(client.pushes().len(), 3);
        assert_eq!(client.pushes()[2], serde_json::json!([]));

        plugin.remove_route("missing").await;
        plugin.clear_routes().await;
        assert_eq!(client.pushes().len(), 5);
        assert!(plugin.routes().is_empty());
    }

    #[tokio::test]
    async fn duplicates_are_pushed_once_and_cached_filtered() {
        let client = RecordingClient::supporting();
        let store = LocalStore::in_memory().unwrap();
        let mut plugin = plugin(client.clone(), store.clone());
        plugin.on_connect().await;

        let first = plugin.add_route();
        let second = plugin.add_route();
        plugin.modify_route(&first, url_change("https://a.com")).await;
        plugin.modify_route(&second, url_change("https://a.com")).await;

        assert_eq!(plugin.duplicate_route_ids(), vec![first, second]);
        let last = client.pushes().pop().unwrap();
        assert_eq!(last.as_array().unwrap().len(), 1);

        let cached: Vec<Route> = serde_json::from_str(
            &store.get_item(&mock_route_list_key("app")).unwrap().unwrap(),
        )
        .unwrap();
        assert_eq!(cached.len(), 1);
        assert_eq!(plugin.routes().len(), 2);
    }

    #[tokio::test]
    async fn failed_push_keeps_local_routes() {
        let client = Arc::new(RecordingClient {
            supports_mocks: true,
            fail_sends: true,
            ..Default::default()
        });
        let mut plugin = plugin(client.clone(), LocalStore::in_memory().unwrap());
        plugin.on_connect().await;
        let id = plugin.add_route();
        plugin.modify_route(&id, url_change("https://a.com")).await;
        assert_eq!(plugin.routes().get(&id).unwrap().request_url, "https://a.com");
    }

    #[tokio::test]
    async fn archived_device_caches_without_sending() {
        let client = Arc::new(RecordingClient::default());
        let store = LocalStore::in_memory().unwrap();
        let config = NetworkConfig {
            device_archived: true,
            ..config("app")
        };
        let mut plugin = NetworkPlugin::with_store(config, client.clone(), store.clone());
        plugin.on_connect().await;
        plugin.add_route();
        plugin.enable_route("0").await;

        assert!(plugin.is_mock_response_supported());
        assert!(client.pushes().is_empty());
        assert!(store.get_item(&mock_route_list_key("app")).unwrap().is_some());
    }

    #[tokio::test]
    async fn body_format_is_remembered() {
        let store = LocalStore::in_memory().unwrap();
        let mut first = plugin(RecordingClient::supporting(), store.clone());
        assert_eq!(first.body_format(), BodyFormat::Parsed);
        first.set_body_format(BodyFormat::Formatted);

        let second = plugin(RecordingClient::supporting(), store);
        assert_eq!(second.body_format(), BodyFormat::Formatted);
    }

    #[test]
    fn bad_messages_do_not_stop_processing() {
        let mut plugin = plugin(RecordingClient::supporting(), LocalStore::in_memory().unwrap());
        plugin.handle_message(MessageEnvelope::new("newRequest", json!({"id": 5})));
        plugin.handle_message(MessageEnvelope::new("whatever", json!({})));
        plugin.handle_message(MessageEnvelope::new(
            "newRequest",
            json!({"id": "1", "timestamp": 1, "method": "GET", "url": "http://a.com", "headers": []}),
        ));
        assert_eq!(plugin.requests().len(), 1);

        plugin.select(Some("1".into()));
        assert_eq!(plugin.selected_request().unwrap().domain, "a.com/");
        plugin.clear_logs();
        assert!(plugin.selected_request().is_none());
    }

    #[test]
    fn stale_partials_are_pruned_with_ttl() {
        let config = NetworkConfig {
            partial_response_ttl_ms: Some(1_000),
            ..config("app")
        };
        let mut plugin = NetworkPlugin::with_store(
            config,
            RecordingClient::supporting(),
            LocalStore::in_memory().unwrap(),
        );
        plugin.handle_message(MessageEnvelope::new(
            "partialResponse",
            json!({"id": "1", "totalChunks": 3, "index": 2, "data": "bG8="}),
        ));
        assert!(plugin.state().partial_responses.contains("1"));

        let now = chrono::Utc::now().timestamp_millis();
        plugin.prune_stale_partials(now + 500);
        assert!(plugin.state().partial_responses.contains("1"));
        plugin.prune_stale_partials(now + 60_000);
        assert!(plugin.state().partial_responses.is_empty());
    }
}
