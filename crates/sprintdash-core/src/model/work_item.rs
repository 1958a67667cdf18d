use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A mirrored work item (task, bug, story) and its lifecycle timestamps.
///
/// The lifecycle is nominally `created -> activated -> closed`, but the
/// upstream data does not enforce the ordering. Nothing here rejects an item
/// whose `closed_date` precedes its `activated_date`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: i64,
    pub sprint_id: String,
    pub created_date: DateTime<Utc>,
    #[serde(default)]
    pub activated_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closed_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_removed: bool,
}

impl WorkItem {
    /// A freshly created, unstarted item.
    #[must_use]
    pub fn new(id: i64, sprint_id: impl Into<String>, created_date: DateTime<Utc>) -> Self {
        Self {
            id,
            sprint_id: sprint_id.into(),
            created_date,
            activated_date: None,
            closed_date: None,
            is_removed: false,
        }
    }

    #[must_use]
    pub fn activated_at(mut self, ts: DateTime<Utc>) -> Self {
        self.activated_date = Some(ts);
        self
    }

    #[must_use]
    pub fn closed_at(mut self, ts: DateTime<Utc>) -> Self {
        self.closed_date = Some(ts);
        self
    }

    #[must_use]
    pub fn removed(mut self) -> Self {
        self.is_removed = true;
        self
    }

    /// Returns `true` when the present timestamps respect
    /// `created <= activated <= closed`.
    #[must_use]
    pub fn lifecycle_is_ordered(&self) -> bool {
        let activated_ok = self
            .activated_date
            .is_none_or(|activated| activated >= self.created_date);
        let closed_ok = match (self.activated_date, self.closed_date) {
            (_, None) => true,
            (Some(activated), Some(closed)) => closed >= activated,
            (None, Some(closed)) => closed >= self.created_date,
        };
        activated_ok && closed_ok
    }
}
