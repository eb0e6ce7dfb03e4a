use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::api::SentinelApi;
use super::auth::TokenProvider;
use super::error::SentinelApiError;
use super::kql::{validate_query_text, validate_timespan, DEFAULT_TIMESPAN};
use super::models::{
    Hunt, HuntRelation, HuntRequest, HuntSpec, QuerySpec, RelationRequest, ResourceList,
    SavedSearch, SavedSearchRequest,
};
use crate::config::SentinelConfig;

/// Talks to the Sentinel management plane. One bearer token is requested
/// from the provider per call; nothing is cached here.
#[derive(Clone)]
pub struct SentinelClient {
    http: Client,
    config: SentinelConfig,
    tokens: Arc<dyn TokenProvider>,
}

impl SentinelClient {
    pub fn new(
        config: SentinelConfig,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, SentinelApiError> {
        debug!(
            workspace = %config.workspace_name,
            verify_ssl = %config.verify_ssl,
            "Creating new SentinelClient"
        );

        let http = Client::builder()
            .danger_accept_invalid_certs(!config.verify_ssl)
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("mcp-server-sentinel/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(SentinelApiError::HttpClientCreationError)?;

        Ok(Self {
            http,
            config,
            tokens,
        })
    }

    pub fn config(&self) -> &SentinelConfig {
        &self.config
    }

    fn saved_searches_url(&self) -> String {
        format!("{}/savedSearches", self.config.workspace_url())
    }

    fn hunts_url(&self) -> String {
        format!("{}/hunts", self.config.security_insights_url())
    }

    fn relations_url(&self, hunt_id: &str) -> String {
        format!("{}/{}/relations", self.hunts_url(), hunt_id)
    }

    async fn request(
        &self,
        method: Method,
        url: &str,
        api_version: Option<&str>,
    ) -> Result<RequestBuilder, SentinelApiError> {
        let token = self.tokens.bearer_token().await?;
        let mut builder = self.http.request(method, url).bearer_auth(token);
        if let Some(version) = api_version {
            builder = builder.query(&[("api-version", version)]);
        }
        Ok(builder)
    }

    async fn execute(builder: RequestBuilder) -> Result<Response, SentinelApiError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(SentinelApiError::from_response(status.as_u16(), &body))
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, SentinelApiError> {
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        api_version: Option<&str>,
    ) -> Result<T, SentinelApiError> {
        let builder = self.request(Method::GET, url, api_version).await?;
        Self::read_json(Self::execute(builder).await?).await
    }

    async fn send_json<B, T>(
        &self,
        method: Method,
        url: &str,
        api_version: &str,
        body: &B,
    ) -> Result<T, SentinelApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self
            .request(method, url, Some(api_version))
            .await?
            .json(body);
        Self::read_json(Self::execute(builder).await?).await
    }

    async fn delete_resource(&self, url: &str, api_version: &str) -> Result<(), SentinelApiError> {
        let builder = self.request(Method::DELETE, url, Some(api_version)).await?;
        Self::execute(builder).await?;
        Ok(())
    }

    /// Collects every page of a list endpoint. `nextLink` already carries
    /// the api-version, so follow-up pages are requested verbatim.
    ///
    /// Paging stops at the first link already visited. A link pointing
    /// outside the management endpoint is rejected before the bearer token
    /// is attached.
    async fn list_all<T: DeserializeOwned>(
        &self,
        url: &str,
        api_version: &str,
    ) -> Result<Vec<T>, SentinelApiError> {
        let first: ResourceList<T> = self.get_json(url, Some(api_version)).await?;
        let mut items = first.value;
        let mut next = first.next_link;
        let mut visited = HashSet::new();

        while let Some(link) = next.take() {
            if !visited.insert(link.clone()) {
                warn!(%link, "nextLink cycle detected, stopping pagination");
                break;
            }
            self.check_next_link(&link)?;

            debug!(%link, "Following nextLink");
            let page: ResourceList<T> = self.get_json(&link, None).await?;
            items.extend(page.value);
            next = page.next_link;
        }

        Ok(items)
    }

    fn check_next_link(&self, link: &str) -> Result<(), SentinelApiError> {
        let base = Url::parse(&self.config.management_url).map_err(|e| {
            SentinelApiError::ConfigurationError(format!(
                "invalid management URL '{}': {}",
                self.config.management_url, e
            ))
        })?;
        let next = Url::parse(link).map_err(|e| {
            SentinelApiError::PaginationError(format!("invalid nextLink '{}': {}", link, e))
        })?;

        if next.origin() != base.origin() {
            error!(%link, "nextLink points outside the management endpoint");
            return Err(SentinelApiError::PaginationError(format!(
                "nextLink '{}' is not served by {}",
                link, self.config.management_url
            )));
        }
        Ok(())
    }

    /// Runs ad-hoc KQL against the workspace through the Log Analytics
    /// query endpoint and returns the raw tables.
    pub async fn run_query(
        &self,
        query: &str,
        timespan: Option<&str>,
    ) -> Result<Value, SentinelApiError> {
        validate_query_text(query)?;
        let timespan = timespan.unwrap_or(DEFAULT_TIMESPAN);
        validate_timespan(timespan)?;

        info!(%timespan, "Running hunting query against workspace");
        let url = format!("{}/query", self.config.workspace_url());
        let body = json!({ "query": query, "timespan": timespan });

        match self
            .send_json(
                Method::POST,
                &url,
                &self.config.log_analytics_api_version,
                &body,
            )
            .await
        {
            Ok(result) => Ok(result),
            Err(e) => {
                error!("Failed to run hunting query: {}", e);
                Err(e)
            }
        }
    }
}

#[async_trait]
impl SentinelApi for SentinelClient {
    async fn list_queries(&self) -> Result<Vec<SavedSearch>, SentinelApiError> {
        debug!("Retrieving hunting queries from Sentinel");
        match self
            .list_all(&self.saved_searches_url(), &self.config.api_version)
            .await
        {
            Ok(queries) => {
                debug!("Successfully retrieved {} hunting queries", queries.len());
                Ok(queries)
            }
            Err(e) => {
                error!("Failed to retrieve hunting queries: {}", e);
                Err(e)
            }
        }
    }

    async fn get_query(&self, query_id: &str) -> Result<SavedSearch, SentinelApiError> {
        info!("Fetching hunting query with ID: {}", query_id);
        let url = format!("{}/{}", self.saved_searches_url(), query_id);
        self.get_json(&url, Some(&self.config.api_version))
            .await
            .map_err(|e| match e.status() {
                Some(404) => SentinelApiError::QueryNotFound(query_id.to_string()),
                _ => {
                    error!("Failed to retrieve hunting query {}: {}", query_id, e);
                    e
                }
            })
    }

    async fn create_query(&self, spec: &QuerySpec) -> Result<SavedSearch, SentinelApiError> {
        if spec.query.trim().is_empty() {
            return Err(SentinelApiError::ValidationError(
                "query text is required".to_string(),
            ));
        }
        if spec.display_name.trim().is_empty() {
            return Err(SentinelApiError::ValidationError(
                "query display name is required".to_string(),
            ));
        }

        let query_id = Uuid::new_v4();
        let url = format!("{}/{}", self.saved_searches_url(), query_id);
        info!(%query_id, "Creating hunting query titled: {}", spec.display_name);

        let body = SavedSearchRequest::from(spec);
        match self
            .send_json(Method::PUT, &url, &self.config.api_version, &body)
            .await
        {
            Ok(query) => {
                let query: SavedSearch = query;
                debug!("Successfully created hunting query {}", query.id);
                Ok(query)
            }
            Err(e) => {
                error!("Failed to create hunting query: {}", e);
                Err(e)
            }
        }
    }

    async fn delete_query(&self, query_id: &str) -> Result<(), SentinelApiError> {
        let url = format!("{}/{}", self.saved_searches_url(), query_id);
        match self.delete_resource(&url, &self.config.api_version).await {
            Ok(()) => {
                info!("Deleted hunting query: {}", query_id);
                Ok(())
            }
            Err(e) => {
                error!("Error deleting hunting query {}: {}", query_id, e);
                Err(e)
            }
        }
    }

    async fn list_hunts(&self) -> Result<Vec<Hunt>, SentinelApiError> {
        debug!("Retrieving hunts from Sentinel");
        match self
            .list_all(&self.hunts_url(), &self.config.hunts_api_version)
            .await
        {
            Ok(hunts) => {
                debug!("Successfully retrieved {} hunts", hunts.len());
                Ok(hunts)
            }
            Err(e) => {
                error!("Failed to retrieve hunts: {}", e);
                Err(e)
            }
        }
    }

    async fn get_hunt(&self, hunt_id: &str) -> Result<Hunt, SentinelApiError> {
        info!("Fetching hunt with ID: {}", hunt_id);
        let url = format!("{}/{}", self.hunts_url(), hunt_id);
        self.get_json(&url, Some(&self.config.hunts_api_version))
            .await
            .map_err(|e| match e.status() {
                Some(404) => SentinelApiError::HuntNotFound(hunt_id.to_string()),
                _ => {
                    error!("Failed to retrieve hunt {}: {}", hunt_id, e);
                    e
                }
            })
    }

    async fn create_hunt(&self, spec: &HuntSpec) -> Result<Hunt, SentinelApiError> {
        if spec.display_name.trim().is_empty() {
            return Err(SentinelApiError::ValidationError(
                "hunt name is required".to_string(),
            ));
        }

        let hunt_id = Uuid::new_v4();
        let url = format!("{}/{}", self.hunts_url(), hunt_id);
        info!(%hunt_id, "Creating hunt titled: {}", spec.display_name);

        let body = HuntRequest::from(spec);
        match self
            .send_json(Method::PUT, &url, &self.config.hunts_api_version, &body)
            .await
        {
            Ok(hunt) => {
                let hunt: Hunt = hunt;
                debug!("Successfully created hunt {}", hunt.name);
                Ok(hunt)
            }
            Err(e) => {
                error!("Failed to create hunt: {}", e);
                Err(e)
            }
        }
    }

    async fn delete_hunt(&self, hunt_id: &str) -> Result<(), SentinelApiError> {
        let url = format!("{}/{}", self.hunts_url(), hunt_id);
        match self
            .delete_resource(&url, &self.config.hunts_api_version)
            .await
        {
            Ok(()) => {
                info!("Deleted hunt: {}", hunt_id);
                Ok(())
            }
            Err(e) => {
                error!("Error deleting hunt {}: {}", hunt_id, e);
                Err(e)
            }
        }
    }

    async fn list_relations(&self, hunt_id: &str) -> Result<Vec<HuntRelation>, SentinelApiError> {
        debug!(hunt_id, "Retrieving hunt relations");
        match self
            .list_all(&self.relations_url(hunt_id), &self.config.hunts_api_version)
            .await
        {
            Ok(relations) => {
                debug!(
                    "Successfully retrieved {} relations for hunt {}",
                    relations.len(),
                    hunt_id
                );
                Ok(relations)
            }
            Err(e) => {
                error!("Failed to retrieve relations for hunt {}: {}", hunt_id, e);
                Err(e)
            }
        }
    }

    async fn create_relation(
        &self,
        hunt_id: &str,
        query_resource_id: &str,
    ) -> Result<HuntRelation, SentinelApiError> {
        if query_resource_id.trim().is_empty() {
            return Err(SentinelApiError::ValidationError(
                "query resource ID is required".to_string(),
            ));
        }

        let relation_id = Uuid::new_v4();
        let url = format!("{}/{}", self.relations_url(hunt_id), relation_id);
        info!(%relation_id, hunt_id, "Linking query {} to hunt", query_resource_id);

        let body = RelationRequest::to_saved_search(query_resource_id);
        match self
            .send_json(Method::PUT, &url, &self.config.hunts_api_version, &body)
            .await
        {
            Ok(relation) => Ok(relation),
            Err(e) => {
                error!("Failed to link query to hunt {}: {}", hunt_id, e);
                Err(e)
            }
        }
    }

    async fn delete_relation(
        &self,
        hunt_id: &str,
        relation_id: &str,
    ) -> Result<(), SentinelApiError> {
        let url = format!("{}/{}", self.relations_url(hunt_id), relation_id);
        match self
            .delete_resource(&url, &self.config.hunts_api_version)
            .await
        {
            Ok(()) => {
                info!("Deleted relation: {}", relation_id);
                Ok(())
            }
            Err(e) => {
                error!("Error deleting relation {}: {}", relation_id, e);
                Err(e)
            }
        }
    }
}
