//! Core Types
//!
//! Small types shared by several engine components: severity buckets, the
//! bounded activity log, and id generation from the injected random source.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

/// Severity bucket shown on discovery cards
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Bucket a score: `low <= low_max < medium <= medium_max < high`
    pub fn from_score(score: f64, low_max: f64, medium_max: f64) -> Self {
        if score <= low_max {
            Severity::Low
        } else if score <= medium_max {
            Severity::Medium
        } else {
            Severity::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

/// Random v4 uuid drawn from `rng`, so seeded runs produce stable ids
pub fn random_uuid<R: Rng>(rng: &mut R) -> Uuid {
    uuid::Builder::from_random_bytes(rng.random()).into_uuid()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivityKind {
    Discovery,
    FailedHunt,
    ScanComplete,
    Evolution,
    Allocation,
    Autonomy,
    Resolved,
    System,
}

/// One line of the activity feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub timestamp: DateTime<Utc>,
    pub kind: ActivityKind,
    pub message: String,
}

/// Activity feed bounded to `capacity` entries, oldest dropped first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLog {
    entries: VecDeque<ActivityEntry>,
    capacity: usize,
}

impl ActivityLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(
        &mut self,
        timestamp: DateTime<Utc>,
        kind: ActivityKind,
        message: impl Into<String>,
    ) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(ActivityEntry {
            timestamp,
            kind,
            message: message.into(),
        });
    }

    pub fn latest(&self) -> Option<&ActivityEntry> {
        self.entries.back()
    }

    /// Most recent `n` entries, newest first
    pub fn recent(&self, n: usize) -> Vec<ActivityEntry> {
        self.entries.iter().rev().take(n).cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActivityEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
