use std::path::Path;

use serde::Serialize;
use tracing::info;

use super::api::SentinelApi;
use super::error::SentinelApiError;
use super::kql::parse_kql_file;
use super::models::{Hunt, HuntRelation, HuntSpec, QuerySpec, SavedSearch};

#[derive(Debug, Clone, Default)]
pub struct HuntWithQuerySpec {
    pub query: QuerySpec,
    pub hunt: HuntSpec,
}

#[derive(Debug, Clone, Serialize)]
pub struct HuntWithQuery {
    pub query: SavedSearch,
    pub hunt: Hunt,
    pub relation: HuntRelation,
}

/// Creates a query and a hunt, then links them.
///
/// All inputs are checked before the first remote call. Nothing is rolled
/// back if a later step fails; whatever was created carries the origin marker
/// and is reclaimed by the next purge.
pub async fn create_hunt_with_query<A>(
    api: &A,
    spec: &HuntWithQuerySpec,
) -> Result<HuntWithQuery, SentinelApiError>
where
    A: SentinelApi + ?Sized,
{
    let mut missing = Vec::new();
    if spec.query.query.trim().is_empty() {
        missing.push("query");
    }
    if spec.query.display_name.trim().is_empty() {
        missing.push("displayName");
    }
    if spec.hunt.display_name.trim().is_empty() {
        missing.push("huntName");
    }
    if !missing.is_empty() {
        return Err(SentinelApiError::ValidationError(format!(
            "Missing required fields for bulk create: {}",
            missing.join(", ")
        )));
    }

    info!("Creating query: {}", spec.query.display_name);
    let query = api.create_query(&spec.query).await?;

    info!("Creating hunt: {}", spec.hunt.display_name);
    let hunt = api.create_hunt(&spec.hunt).await?;

    info!("Linking query {} to hunt {}", query.id, hunt.name);
    let relation = api.create_relation(&hunt.name, &query.id).await?;

    Ok(HuntWithQuery {
        query,
        hunt,
        relation,
    })
}

pub async fn create_query_from_file<A>(
    api: &A,
    path: impl AsRef<Path>,
) -> Result<SavedSearch, SentinelApiError>
where
    A: SentinelApi + ?Sized,
{
    let path = path.as_ref();
    let spec: QuerySpec = parse_kql_file(path)?.into();
    info!(path = %path.display(), "Creating query from KQL file");
    api.create_query(&spec).await
}
