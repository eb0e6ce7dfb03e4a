//! Tag-scoped cleanup of everything this integration created.
//!
//! Hunts are reconciled one at a time: owned relations first, then the hunt.
//! Individual delete failures are recorded as outcomes and never stop the
//! batch; a failed list aborts only the sub-operation it belongs to.

use std::future::Future;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::api::SentinelApi;
use super::error::SentinelApiError;
use super::models::Hunt;
use super::ownership::Owned;

#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    Deleted { id: String },
    Failed { id: String, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteFailure {
    pub id: String,
    pub reason: String,
}

/// Running count of delete attempts, threaded by value through each loop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteTally {
    pub attempted: usize,
    pub deleted: usize,
    pub failures: Vec<DeleteFailure>,
}

impl DeleteTally {
    pub fn record(mut self, outcome: DeleteOutcome) -> Self {
        self.attempted += 1;
        match outcome {
            DeleteOutcome::Deleted { .. } => self.deleted += 1,
            DeleteOutcome::Failed { id, reason } => {
                self.failures.push(DeleteFailure { id, reason })
            }
        }
        self
    }

    fn merge(mut self, other: DeleteTally) -> Self {
        self.attempted += other.attempted;
        self.deleted += other.deleted;
        self.failures.extend(other.failures);
        self
    }
}

async fn attempt<F>(id: &str, delete: F) -> DeleteOutcome
where
    F: Future<Output = Result<(), SentinelApiError>>,
{
    match delete.await {
        Ok(()) => DeleteOutcome::Deleted { id: id.to_string() },
        Err(e) => {
            warn!(id, error = %e, "Delete failed, continuing");
            DeleteOutcome::Failed {
                id: id.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPurge {
    pub matched: usize,
    pub deletes: DeleteTally,
}

impl QueryPurge {
    pub fn message(&self) -> String {
        if self.matched == 0 {
            "no matching queries".to_string()
        } else {
            format!("deleted {}/{} queries", self.deletes.deleted, self.matched)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HuntPurge {
    pub matched: usize,
    pub hunts: DeleteTally,
    pub relations: DeleteTally,
}

impl HuntPurge {
    fn record(self, relations: DeleteTally, hunt: DeleteOutcome) -> Self {
        Self {
            matched: self.matched,
            hunts: self.hunts.record(hunt),
            relations: self.relations.merge(relations),
        }
    }

    pub fn message(&self) -> String {
        if self.matched == 0 {
            "no matching hunts".to_string()
        } else {
            format!(
                "deleted {}/{} hunts and {} relations",
                self.hunts.deleted, self.matched, self.relations.deleted
            )
        }
    }
}

/// Result of removing a single hunt together with its owned relations.
#[derive(Debug, Clone, PartialEq)]
pub struct HuntRemoval {
    pub hunt: Hunt,
    pub relations: DeleteTally,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CleanupResult {
    Completed { message: String },
    Failed { error: String },
}

impl CleanupResult {
    pub fn is_error(&self) -> bool {
        matches!(self, CleanupResult::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeReport {
    pub query_cleanup: CleanupResult,
    pub hunt_cleanup: CleanupResult,
}

impl PurgeReport {
    /// Some cleanup ran, some errored. A valid terminal state, not a crash.
    pub fn is_partial(&self) -> bool {
        self.query_cleanup.is_error() || self.hunt_cleanup.is_error()
    }
}

pub struct Reconciler<'a, A: SentinelApi + ?Sized> {
    api: &'a A,
}

impl<'a, A: SentinelApi + ?Sized> Reconciler<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    pub async fn purge_queries(&self) -> Result<QueryPurge, SentinelApiError> {
        let owned: Vec<_> = self
            .api
            .list_queries()
            .await?
            .into_iter()
            .filter(|resource| resource.is_owned())
            .collect();

        if owned.is_empty() {
            info!("No integration-owned hunting queries found");
            return Ok(QueryPurge::default());
        }

        info!("Found {} hunting queries to delete", owned.len());
        let mut deletes = DeleteTally::default();
        for query in &owned {
            let outcome = attempt(&query.name, self.api.delete_query(&query.name)).await;
            deletes = deletes.record(outcome);
            debug!(
                "Processed query {}/{}: {}",
                deletes.attempted,
                owned.len(),
                query.name
            );
        }

        Ok(QueryPurge {
            matched: owned.len(),
            deletes,
        })
    }

    /// Deletes the owned relations of one hunt. Listing failures propagate.
    pub async fn purge_relations(&self, hunt_id: &str) -> Result<DeleteTally, SentinelApiError> {
        let owned: Vec<_> = self
            .api
            .list_relations(hunt_id)
            .await?
            .into_iter()
            .filter(|resource| resource.is_owned())
            .collect();

        let mut tally = DeleteTally::default();
        for relation in &owned {
            let outcome = attempt(
                &relation.name,
                self.api.delete_relation(hunt_id, &relation.name),
            )
            .await;
            tally = tally.record(outcome);
        }

        debug!(
            hunt_id,
            "Deleted {}/{} relations",
            tally.deleted,
            owned.len()
        );
        Ok(tally)
    }

    pub async fn purge_hunts(&self) -> Result<HuntPurge, SentinelApiError> {
        let owned: Vec<_> = self
            .api
            .list_hunts()
            .await?
            .into_iter()
            .filter(|resource| resource.is_owned())
            .collect();

        if owned.is_empty() {
            info!("No integration-owned hunts found");
            return Ok(HuntPurge::default());
        }

        info!("Found {} hunts to delete", owned.len());
        let mut summary = HuntPurge {
            matched: owned.len(),
            ..Default::default()
        };
        for hunt in &owned {
            let relations = self.purge_relations(&hunt.name).await?;
            let outcome = attempt(&hunt.name, self.api.delete_hunt(&hunt.name)).await;
            info!(
                hunt_id = %hunt.name,
                relations_deleted = relations.deleted,
                "Processed hunt {}",
                hunt.display_name()
            );
            summary = summary.record(relations, outcome);
        }

        Ok(summary)
    }

    /// Runs both cleanups; neither failure prevents the other from running.
    pub async fn purge(&self) -> PurgeReport {
        info!("Attempting to clean up hunting queries...");
        let query_cleanup = match self.purge_queries().await {
            Ok(result) => CleanupResult::Completed {
                message: result.message(),
            },
            Err(e) => {
                warn!("Error during query cleanup: {}", e);
                CleanupResult::Failed {
                    error: e.to_string(),
                }
            }
        };

        info!("Attempting to clean up hunts and relations...");
        let hunt_cleanup = match self.purge_hunts().await {
            Ok(result) => CleanupResult::Completed {
                message: result.message(),
            },
            Err(e) => {
                warn!("Error during hunt cleanup: {}", e);
                CleanupResult::Failed {
                    error: e.to_string(),
                }
            }
        };

        PurgeReport {
            query_cleanup,
            hunt_cleanup,
        }
    }

    /// Deletes one hunt after its owned relations. Refuses hunts that do not
    /// carry the origin label.
    pub async fn remove_hunt(&self, hunt_id: &str) -> Result<HuntRemoval, SentinelApiError> {
        let hunt = self.api.get_hunt(hunt_id).await?;
        if !hunt.is_owned() {
            return Err(SentinelApiError::NotOwned(hunt_id.to_string()));
        }

        let relations = self.purge_relations(hunt_id).await?;
        self.api.delete_hunt(hunt_id).await?;

        Ok(HuntRemoval { hunt, relations })
    }
}
