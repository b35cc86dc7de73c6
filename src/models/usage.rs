//! Usage event model.

use crate::error::UsageError;
use chrono::{DateTime, Duration, Utc};
use mongodb::bson;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Kind of consumption a usage event bills for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageKind {
    ResourceUsage,
    AdditionalStorage,
}

impl UsageKind {
    /// String form stored in the `usage_type` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResourceUsage => "resource_usage",
            Self::AdditionalStorage => "additional_storage",
        }
    }
}

impl std::fmt::Display for UsageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for UsageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "resource_usage" => Ok(Self::ResourceUsage),
            "additional_storage" => Ok(Self::AdditionalStorage),
            _ => Err(format!("Invalid usage type: {}", s)),
        }
    }
}

/// Set of usage kinds the ledger accepts at write time.
///
/// Injected at ledger construction; deployments and tests can narrow the
/// accepted set.
#[derive(Debug, Clone)]
pub struct UsageTypeRegistry {
    kinds: HashSet<UsageKind>,
}

impl UsageTypeRegistry {
    pub fn new(kinds: impl IntoIterator<Item = UsageKind>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
        }
    }

    /// Registry accepting both built-in kinds.
    pub fn standard() -> Self {
        Self::new([UsageKind::ResourceUsage, UsageKind::AdditionalStorage])
    }

    pub fn contains(&self, kind: UsageKind) -> bool {
        self.kinds.contains(&kind)
    }

    /// Parse a raw `usage_type` value and check it against the registry.
    pub fn parse(&self, value: &str) -> Result<UsageKind, UsageError> {
        let kind = value
            .parse::<UsageKind>()
            .map_err(|_| UsageError::InvalidUsageType(value.to_string()))?;
        if !self.kinds.contains(&kind) {
            return Err(UsageError::InvalidUsageType(value.to_string()));
        }
        Ok(kind)
    }
}

/// Kind-specific payload of a usage event.
///
/// Each variant carries exactly the field its kind requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsageDetail {
    ResourceUsage { resource_size: String },
    AdditionalStorage { additional_storage_gb: i64 },
}

impl UsageDetail {
    pub fn kind(&self) -> UsageKind {
        match self {
            Self::ResourceUsage { .. } => UsageKind::ResourceUsage,
            Self::AdditionalStorage { .. } => UsageKind::AdditionalStorage,
        }
    }
}

/// One billing interval stored in the `usage` collection.
///
/// The document is flat: `resource_size` and `additional_storage_gb` are
/// optional fields whose presence is tied to `usage_type`. Use
/// [`UsageEvent::detail`] for the typed view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageEvent {
    #[serde(rename = "_id")]
    pub id: String,
    pub login: String,
    pub resource_id: Option<String>,
    pub usage_type: UsageKind,
    pub resource_size: Option<String>,
    pub additional_storage_gb: Option<i64>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub begin_time: DateTime<Utc>,
    /// Absent while consumption is still ongoing.
    pub end_time: Option<bson::DateTime>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl UsageEvent {
    /// Create an open interval beginning at `begin_time`.
    pub fn open(
        login: String,
        resource_id: Option<String>,
        detail: UsageDetail,
        begin_time: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        let usage_type = detail.kind();
        let (resource_size, additional_storage_gb) = match detail {
            UsageDetail::ResourceUsage { resource_size } => (Some(resource_size), None),
            UsageDetail::AdditionalStorage {
                additional_storage_gb,
            } => (None, Some(additional_storage_gb)),
        };
        Self {
            id: Uuid::new_v4().to_string(),
            login,
            resource_id,
            usage_type,
            resource_size,
            additional_storage_gb,
            begin_time,
            end_time: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create an interval that already ended at `end_time`.
    pub fn closed(
        login: String,
        resource_id: Option<String>,
        detail: UsageDetail,
        begin_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        let mut event = Self::open(login, resource_id, detail, begin_time);
        event.end_time = Some(bson::DateTime::from_chrono(end_time));
        event
    }

    /// End of the interval, if it has been closed.
    pub fn end_time_utc(&self) -> Option<DateTime<Utc>> {
        self.end_time.map(|t| t.to_chrono())
    }

    /// Whether consumption is still ongoing.
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// Typed view over the kind-specific fields.
    ///
    /// `None` for a stored document whose fields do not match its
    /// `usage_type`; only documents written outside the validated path can
    /// be in that state.
    pub fn detail(&self) -> Option<UsageDetail> {
        match self.usage_type {
            UsageKind::ResourceUsage => {
                self.resource_size
                    .clone()
                    .map(|resource_size| UsageDetail::ResourceUsage { resource_size })
            }
            UsageKind::AdditionalStorage => {
                self.additional_storage_gb
                    .map(|additional_storage_gb| UsageDetail::AdditionalStorage {
                        additional_storage_gb,
                    })
            }
        }
    }

    /// Time consumed by this interval as of `as_of`; open intervals are
    /// measured against `as_of` itself.
    pub fn consumed_duration(&self, as_of: DateTime<Utc>) -> Duration {
        self.end_time_utc().unwrap_or(as_of) - self.begin_time
    }
}

/// Input for recording a usage event.
///
/// `usage_type` arrives as the raw string so unknown kinds are rejected by
/// validation rather than failing upstream deserialization.
#[derive(Debug, Clone)]
pub struct RecordUsage {
    pub login: String,
    pub resource_id: Option<String>,
    pub usage_type: String,
    pub begin_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub resource_size: Option<String>,
    pub additional_storage_gb: Option<i64>,
}

/// Per-size-class aggregate of a user's events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageSummary {
    /// Number of usage events (not distinct resources) in the class.
    pub num_resources: u64,
    /// Total consumed time across the class's events.
    pub consumed_duration: Duration,
}

impl UsageSummary {
    pub fn zero() -> Self {
        Self {
            num_resources: 0,
            consumed_duration: Duration::zero(),
        }
    }
}

/// Declarative filter over stored usage events.
///
/// Mirrors the store primitives one to one: equality on identity fields,
/// exact or lower-bounded `begin_time`, and the not-overlapping compound
/// used by range queries.
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    pub login: Option<String>,
    pub resource_id: Option<String>,
    pub usage_type: Option<UsageKind>,
    /// Exact-match constraint on `begin_time`.
    pub begin_time: Option<DateTime<Utc>>,
    /// `begin_time >= since` constraint.
    pub begin_since: Option<DateTime<Utc>>,
    /// Keep only events overlapping the closed range `(start, end)`.
    pub overlaps: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl EventQuery {
    /// Match every stored event.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_user(login: &str) -> Self {
        Self {
            login: Some(login.to_string()),
            ..Self::default()
        }
    }

    pub fn by_resource(resource_id: &str) -> Self {
        Self {
            resource_id: Some(resource_id.to_string()),
            ..Self::default()
        }
    }

    pub fn with_resource(mut self, resource_id: &str) -> Self {
        self.resource_id = Some(resource_id.to_string());
        self
    }

    pub fn with_kind(mut self, kind: UsageKind) -> Self {
        self.usage_type = Some(kind);
        self
    }

    pub fn with_begin_time(mut self, begin_time: DateTime<Utc>) -> Self {
        self.begin_time = Some(begin_time);
        self
    }

    pub fn with_begin_since(mut self, since: DateTime<Utc>) -> Self {
        self.begin_since = Some(since);
        self
    }

    pub fn with_overlap(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.overlaps = Some((start, end));
        self
    }

    /// Whether `event` satisfies every constraint in this query.
    ///
    /// An event fails the overlap constraint only if it ends strictly
    /// before the range or begins strictly after it; an open event has no
    /// end to fail on.
    pub fn matches(&self, event: &UsageEvent) -> bool {
        if let Some(login) = &self.login {
            if event.login != *login {
                return false;
            }
        }
        if let Some(resource_id) = &self.resource_id {
            if event.resource_id.as_deref() != Some(resource_id.as_str()) {
                return false;
            }
        }
        if let Some(kind) = self.usage_type {
            if event.usage_type != kind {
                return false;
            }
        }
        if let Some(begin_time) = self.begin_time {
            if event.begin_time != begin_time {
                return false;
            }
        }
        if let Some(since) = self.begin_since {
            if event.begin_time < since {
                return false;
            }
        }
        if let Some((start, end)) = self.overlaps {
            if let Some(event_end) = event.end_time_utc() {
                if event_end < start {
                    return false;
                }
            }
            if event.begin_time > end {
                return false;
            }
        }
        true
    }
}
