//! Event store backends for usage events.

use crate::error::UsageError;
use crate::models::{EventQuery, UsageEvent};
use crate::services::database::MongoDb;
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::{self, doc, Document};
use mongodb::options::FindOneOptions;
use mongodb::Collection;
use tokio::sync::RwLock;

/// Contract the ledger expects from its event store: atomic single-event
/// inserts, filtered reads, a newest-first single-event lookup, and bulk
/// delete-by-filter. No update primitive exists; events are immutable once
/// stored.
#[async_trait]
pub trait UsageStore: Send + Sync {
    async fn insert(&self, event: &UsageEvent) -> Result<(), UsageError>;

    async fn find(&self, query: &EventQuery) -> Result<Vec<UsageEvent>, UsageError>;

    /// The matching event with the greatest `begin_time`, if any.
    async fn find_latest_by_begin_time(
        &self,
        query: &EventQuery,
    ) -> Result<Option<UsageEvent>, UsageError>;

    /// Delete every matching event, returning the count removed.
    async fn delete(&self, query: &EventQuery) -> Result<u64, UsageError>;
}

/// MongoDB-backed store over the `usage` collection.
pub struct MongoUsageStore {
    events: Collection<UsageEvent>,
}

impl MongoUsageStore {
    pub fn new(db: &MongoDb) -> Self {
        Self { events: db.usage() }
    }
}

/// Translate a query into the BSON filter the driver executes.
///
/// The overlap constraint becomes a `$nor` of the two exclusion cases; a
/// document with no `end_time` cannot match the end-side exclusion, so open
/// intervals stay in range results.
fn query_document(query: &EventQuery) -> Document {
    let mut filter = doc! {};
    if let Some(login) = &query.login {
        filter.insert("login", login.as_str());
    }
    if let Some(resource_id) = &query.resource_id {
        filter.insert("resource_id", resource_id.as_str());
    }
    if let Some(kind) = query.usage_type {
        filter.insert("usage_type", kind.as_str());
    }
    let mut begin = Document::new();
    if let Some(begin_time) = query.begin_time {
        begin.insert("$eq", bson::DateTime::from_chrono(begin_time));
    }
    if let Some(since) = query.begin_since {
        begin.insert("$gte", bson::DateTime::from_chrono(since));
    }
    if !begin.is_empty() {
        filter.insert("begin_time", begin);
    }
    if let Some((start, end)) = query.overlaps {
        filter.insert(
            "$nor",
            vec![
                doc! { "end_time": { "$lt": bson::DateTime::from_chrono(start) } },
                doc! { "begin_time": { "$gt": bson::DateTime::from_chrono(end) } },
            ],
        );
    }
    filter
}

#[async_trait]
impl UsageStore for MongoUsageStore {
    async fn insert(&self, event: &UsageEvent) -> Result<(), UsageError> {
        self.events.insert_one(event, None).await?;
        Ok(())
    }

    async fn find(&self, query: &EventQuery) -> Result<Vec<UsageEvent>, UsageError> {
        let mut cursor = self.events.find(query_document(query), None).await?;
        let mut events = Vec::new();
        while let Some(event) = cursor.try_next().await? {
            events.push(event);
        }
        Ok(events)
    }

    async fn find_latest_by_begin_time(
        &self,
        query: &EventQuery,
    ) -> Result<Option<UsageEvent>, UsageError> {
        let options = FindOneOptions::builder()
            .sort(doc! { "begin_time": -1 })
            .build();
        let event = self.events.find_one(query_document(query), options).await?;
        Ok(event)
    }

    async fn delete(&self, query: &EventQuery) -> Result<u64, UsageError> {
        let result = self.events.delete_many(query_document(query), None).await?;
        Ok(result.deleted_count)
    }
}

/// In-process store holding events in insertion order. Query semantics
/// match the MongoDB backend via [`EventQuery::matches`].
#[derive(Default)]
pub struct MemoryUsageStore {
    events: RwLock<Vec<UsageEvent>>,
}

impl MemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UsageStore for MemoryUsageStore {
    async fn insert(&self, event: &UsageEvent) -> Result<(), UsageError> {
        self.events.write().await.push(event.clone());
        Ok(())
    }

    async fn find(&self, query: &EventQuery) -> Result<Vec<UsageEvent>, UsageError> {
        let events = self.events.read().await;
        Ok(events.iter().filter(|e| query.matches(e)).cloned().collect())
    }

    async fn find_latest_by_begin_time(
        &self,
        query: &EventQuery,
    ) -> Result<Option<UsageEvent>, UsageError> {
        let events = self.events.read().await;
        Ok(events
            .iter()
            .filter(|e| query.matches(e))
            .max_by_key(|e| e.begin_time)
            .cloned())
    }

    async fn delete(&self, query: &EventQuery) -> Result<u64, UsageError> {
        let mut events = self.events.write().await;
        let before = events.len();
        events.retain(|e| !query.matches(e));
        Ok((before - events.len()) as u64)
    }
}
