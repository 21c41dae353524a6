//! Document persistence for canonical fund records
//!
//! Records are stored as JSON documents addressed by a natural key. The
//! pipeline only writes through [`RecordWriter`]; reads exist for tests and
//! tooling.

pub mod disk;
pub mod memory;

use crate::config::CollectionsConfig;
use crate::core::{FundDistribution, FundHolding, FundOverview, FundSummary};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

pub use disk::FjallDocumentStore;
pub use memory::MemoryDocumentStore;

pub type Document = Map<String, Value>;

/// Equality match on a single natural-key field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub field: String,
    pub value: String,
}

impl Filter {
    pub fn new(field: &str, value: &str) -> Self {
        Self {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    pub(crate) fn storage_key(&self) -> String {
        format!("{}={}", self.field, self.value)
    }
}

/// Fields to overwrite on every write, and fields written only when the
/// document is first created.
#[derive(Debug, Clone, Default)]
pub struct Update {
    pub set: Document,
    pub set_on_insert: Document,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub inserted: bool,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Updates the document matching `filter`, creating it when absent.
    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: Update,
    ) -> Result<UpsertOutcome>;

    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>>;
}

pub(crate) const MODIFIED_AT: &str = "modifiedAt";

/// Applies `update` to `existing`. Fields not named in `set` are kept.
///
/// A `modifiedAt` stamp that does not move past the stored one is bumped to
/// the stored value plus one, so every rewrite is observable.
pub(crate) fn apply_update(
    existing: Option<Document>,
    filter: &Filter,
    mut update: Update,
) -> (Document, UpsertOutcome) {
    let inserted = existing.is_none();
    if let Some(previous) = existing
        .as_ref()
        .and_then(|doc| doc.get(MODIFIED_AT))
        .and_then(Value::as_i64)
    {
        if let Some(stamp) = update.set.get_mut(MODIFIED_AT) {
            if stamp.as_i64().is_some_and(|next| next <= previous) {
                *stamp = Value::from(previous.saturating_add(1));
            }
        }
    }
    let mut doc = existing.unwrap_or_else(|| {
        let mut doc = update.set_on_insert;
        doc.insert(filter.field.clone(), Value::String(filter.value.clone()));
        doc
    });
    doc.extend(update.set);
    (doc, UpsertOutcome { inserted })
}

/// Write side of the pipeline, one operation per record kind.
#[async_trait]
pub trait RecordWriter: Send + Sync {
    async fn upsert_fund(&self, fund: &FundSummary) -> Result<UpsertOutcome>;
    async fn upsert_overview(&self, overview: &FundOverview) -> Result<UpsertOutcome>;
    async fn upsert_holding(&self, holding: &FundHolding) -> Result<UpsertOutcome>;
    async fn upsert_distribution(&self, distribution: &FundDistribution)
    -> Result<UpsertOutcome>;
}

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Maps canonical records onto documents with lifecycle metadata.
pub struct FundRepository {
    store: Arc<dyn DocumentStore>,
    collections: CollectionsConfig,
    schema_version: String,
    clock: Clock,
}

impl FundRepository {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        collections: CollectionsConfig,
        schema_version: &str,
    ) -> Self {
        Self {
            store,
            collections,
            schema_version: schema_version.to_string(),
            clock: Arc::new(Utc::now),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    async fn upsert<T: Serialize + Sync>(
        &self,
        collection: &str,
        filter: Filter,
        record: &T,
    ) -> Result<UpsertOutcome> {
        let now = (self.clock)().timestamp_millis();

        let mut set = match serde_json::to_value(record)
            .with_context(|| format!("Failed to serialize record for {collection}"))?
        {
            Value::Object(map) => map,
            other => anyhow::bail!("Record for {collection} is not a document: {other}"),
        };
        set.insert("schema".into(), Value::String(self.schema_version.clone()));
        set.insert("isActive".into(), Value::Bool(true));
        set.insert("enabled".into(), Value::Bool(true));
        set.insert("deleted".into(), Value::Bool(false));
        set.insert(MODIFIED_AT.into(), Value::from(now));

        let mut set_on_insert = Document::new();
        set_on_insert.insert("createdAt".into(), Value::from(now));

        let outcome = self
            .store
            .update_one(collection, &filter, Update { set, set_on_insert })
            .await
            .with_context(|| {
                format!(
                    "Failed to upsert {}={} into {collection}",
                    filter.field, filter.value
                )
            })?;
        debug!(
            collection,
            key = %filter.value,
            inserted = outcome.inserted,
            "Upserted record"
        );
        Ok(outcome)
    }
}

#[async_trait]
impl RecordWriter for FundRepository {
    async fn upsert_fund(&self, fund: &FundSummary) -> Result<UpsertOutcome> {
        self.upsert(
            &self.collections.fund,
            Filter::new("ticker", &fund.ticker),
            fund,
        )
        .await
    }

    async fn upsert_overview(&self, overview: &FundOverview) -> Result<UpsertOutcome> {
        let filter = if overview.ticker.is_empty() {
            Filter::new("portId", &overview.port_id)
        } else {
            Filter::new("ticker", &overview.ticker)
        };
        self.upsert(&self.collections.overview, filter, overview)
            .await
    }

    async fn upsert_holding(&self, holding: &FundHolding) -> Result<UpsertOutcome> {
        self.upsert(
            &self.collections.holding,
            Filter::new("ticker", &holding.ticker),
            holding,
        )
        .await
    }

    async fn upsert_distribution(
        &self,
        distribution: &FundDistribution,
    ) -> Result<UpsertOutcome> {
        self.upsert(
            &self.collections.distribution,
            Filter::new("portId", &distribution.port_id),
            distribution,
        )
        .await
    }
}
