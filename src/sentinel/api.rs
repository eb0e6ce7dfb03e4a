use async_trait::async_trait;

use super::error::SentinelApiError;
use super::models::{Hunt, HuntRelation, HuntSpec, QuerySpec, SavedSearch};

/// The three remote collections this integration works against.
///
/// `SentinelClient` is the production implementation; the purge and
/// provisioning flows only depend on this trait.
#[async_trait]
pub trait SentinelApi: Send + Sync {
    async fn list_queries(&self) -> Result<Vec<SavedSearch>, SentinelApiError>;

    async fn get_query(&self, query_id: &str) -> Result<SavedSearch, SentinelApiError>;

    async fn create_query(&self, spec: &QuerySpec) -> Result<SavedSearch, SentinelApiError>;

    async fn delete_query(&self, query_id: &str) -> Result<(), SentinelApiError>;

    async fn list_hunts(&self) -> Result<Vec<Hunt>, SentinelApiError>;

    async fn get_hunt(&self, hunt_id: &str) -> Result<Hunt, SentinelApiError>;

    async fn create_hunt(&self, spec: &HuntSpec) -> Result<Hunt, SentinelApiError>;

    async fn delete_hunt(&self, hunt_id: &str) -> Result<(), SentinelApiError>;

    async fn list_relations(&self, hunt_id: &str) -> Result<Vec<HuntRelation>, SentinelApiError>;

    /// Links the saved search identified by its full resource ID to a hunt.
    async fn create_relation(
        &self,
        hunt_id: &str,
        query_resource_id: &str,
    ) -> Result<HuntRelation, SentinelApiError>;

    async fn delete_relation(
        &self,
        hunt_id: &str,
        relation_id: &str,
    ) -> Result<(), SentinelApiError>;
}
