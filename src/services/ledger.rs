//! Usage ledger: validated writes, queries, and consumption summaries.

use crate::error::UsageError;
use crate::models::{
    EventQuery, RecordUsage, UsageDetail, UsageEvent, UsageKind, UsageSummary, UsageTypeRegistry,
};
use crate::services::metrics::{self, DB_QUERY_DURATION};
use crate::services::store::UsageStore;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};

/// Persistence-backed ledger of usage events.
///
/// Stateless aside from the store handle; every operation is an
/// independent bounded call.
pub struct UsageLedger {
    store: Arc<dyn UsageStore>,
    registry: UsageTypeRegistry,
}

impl UsageLedger {
    pub fn new(store: Arc<dyn UsageStore>, registry: UsageTypeRegistry) -> Self {
        Self { store, registry }
    }

    /// Validate and store a usage event.
    ///
    /// All invariants are checked before any write is attempted, so a
    /// rejected event leaves the store untouched.
    #[instrument(skip(self, input), fields(login = %input.login))]
    pub async fn record_event(&self, input: RecordUsage) -> Result<UsageEvent, UsageError> {
        let kind = self.registry.parse(&input.usage_type)?;
        let detail = match kind {
            UsageKind::ResourceUsage => {
                let resource_size =
                    input
                        .resource_size
                        .ok_or_else(|| UsageError::MissingRequiredField {
                            field: "resource_size",
                            usage_type: kind,
                        })?;
                UsageDetail::ResourceUsage { resource_size }
            }
            UsageKind::AdditionalStorage => {
                let additional_storage_gb =
                    input
                        .additional_storage_gb
                        .ok_or_else(|| UsageError::MissingRequiredField {
                            field: "additional_storage_gb",
                            usage_type: kind,
                        })?;
                UsageDetail::AdditionalStorage {
                    additional_storage_gb,
                }
            }
        };
        if let Some(end_time) = input.end_time {
            if end_time < input.begin_time {
                return Err(UsageError::InvalidInterval {
                    begin_time: input.begin_time,
                    end_time,
                });
            }
        }

        let event = match input.end_time {
            Some(end_time) => UsageEvent::closed(
                input.login,
                input.resource_id,
                detail,
                input.begin_time,
                end_time,
            ),
            None => UsageEvent::open(input.login, input.resource_id, detail, input.begin_time),
        };

        let timer = DB_QUERY_DURATION
            .with_label_values(&["record_event"])
            .start_timer();
        self.store.insert(&event).await?;
        timer.observe_duration();

        metrics::record_event_recorded(event.usage_type.as_str());
        info!(event_id = %event.id, usage_type = %event.usage_type, "Usage event recorded");

        Ok(event)
    }

    /// Every stored event, in storage order.
    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<UsageEvent>, UsageError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_all"])
            .start_timer();
        let events = self.store.find(&EventQuery::all()).await?;
        timer.observe_duration();
        Ok(events)
    }

    #[instrument(skip(self), fields(login = %login))]
    pub async fn list_by_user(&self, login: &str) -> Result<Vec<UsageEvent>, UsageError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_by_user"])
            .start_timer();
        let events = self.store.find(&EventQuery::by_user(login)).await?;
        timer.observe_duration();
        Ok(events)
    }

    /// Events for `login` beginning at or after `since`.
    #[instrument(skip(self), fields(login = %login))]
    pub async fn list_by_user_since(
        &self,
        login: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<UsageEvent>, UsageError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_by_user_since"])
            .start_timer();
        let events = self
            .store
            .find(&EventQuery::by_user(login).with_begin_since(since))
            .await?;
        timer.observe_duration();
        Ok(events)
    }

    /// Events for `login` overlapping `[range_start, range_end]`.
    ///
    /// An event is excluded only if it ends strictly before the range or
    /// begins strictly after it; open events stay in unless the begin-side
    /// test fails.
    #[instrument(skip(self), fields(login = %login))]
    pub async fn list_by_user_in_range(
        &self,
        login: &str,
        range_start: DateTime<Utc>,
        range_end: DateTime<Utc>,
    ) -> Result<Vec<UsageEvent>, UsageError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_by_user_in_range"])
            .start_timer();
        let events = self
            .store
            .find(&EventQuery::by_user(login).with_overlap(range_start, range_end))
            .await?;
        timer.observe_duration();
        Ok(events)
    }

    /// Events for a (user, resource) pair; with `begin_time`, only events
    /// beginning at exactly that instant.
    #[instrument(skip(self), fields(login = %login, resource_id = %resource_id))]
    pub async fn list_by_user_and_resource(
        &self,
        login: &str,
        resource_id: &str,
        begin_time: Option<DateTime<Utc>>,
    ) -> Result<Vec<UsageEvent>, UsageError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_by_user_and_resource"])
            .start_timer();
        let mut query = EventQuery::by_user(login).with_resource(resource_id);
        if let Some(begin_time) = begin_time {
            query = query.with_begin_time(begin_time);
        }
        let events = self.store.find(&query).await?;
        timer.observe_duration();
        Ok(events)
    }

    /// The newest event for a (user, resource, kind) triple, by `begin_time`.
    #[instrument(skip(self), fields(login = %login, resource_id = %resource_id))]
    pub async fn latest_by_user_resource_and_kind(
        &self,
        login: &str,
        resource_id: &str,
        kind: UsageKind,
    ) -> Result<Option<UsageEvent>, UsageError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["latest_by_user_resource_and_kind"])
            .start_timer();
        let event = self
            .store
            .find_latest_by_begin_time(
                &EventQuery::by_user(login)
                    .with_resource(resource_id)
                    .with_kind(kind),
            )
            .await?;
        timer.observe_duration();
        Ok(event)
    }

    /// Per-size-class consumption for `login`.
    ///
    /// Groups events by `resource_size` label; events carrying no label
    /// (additional storage) aggregate under `None`, and `num_resources`
    /// counts events rather than distinct resources. Open intervals are
    /// measured against `as_of`, so repeated calls see them grow.
    #[instrument(skip(self), fields(login = %login))]
    pub async fn summarize_by_user(
        &self,
        login: &str,
        as_of: DateTime<Utc>,
    ) -> Result<HashMap<Option<String>, UsageSummary>, UsageError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["summarize_by_user"])
            .start_timer();
        let events = self.store.find(&EventQuery::by_user(login)).await?;
        timer.observe_duration();

        let mut summary: HashMap<Option<String>, UsageSummary> = HashMap::new();
        for event in &events {
            let entry = summary
                .entry(event.resource_size.clone())
                .or_insert_with(UsageSummary::zero);
            entry.num_resources += 1;
            entry.consumed_duration = entry.consumed_duration + event.consumed_duration(as_of);
        }
        Ok(summary)
    }

    /// Remove every event for `login`. Irreversible; used for account teardown.
    #[instrument(skip(self), fields(login = %login))]
    pub async fn delete_by_user(&self, login: &str) -> Result<u64, UsageError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_by_user"])
            .start_timer();
        let deleted = self.store.delete(&EventQuery::by_user(login)).await?;
        timer.observe_duration();

        metrics::record_events_deleted("user", deleted);
        info!(login = %login, deleted = deleted, "Deleted usage events for user");
        Ok(deleted)
    }

    /// Remove every event for `resource_id`. Irreversible; used for resource teardown.
    #[instrument(skip(self), fields(resource_id = %resource_id))]
    pub async fn delete_by_resource(&self, resource_id: &str) -> Result<u64, UsageError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_by_resource"])
            .start_timer();
        let deleted = self
            .store
            .delete(&EventQuery::by_resource(resource_id))
            .await?;
        timer.observe_duration();

        metrics::record_events_deleted("resource", deleted);
        info!(resource_id = %resource_id, deleted = deleted, "Deleted usage events for resource");
        Ok(deleted)
    }
}
