//! Incident reports submitted alongside a conversation.
//!
//! Kept in memory per session. Priority is derived from the request type and
//! the wording of the details unless the submitter sets one explicitly.

pub mod pruner;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::AppError;

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportKind {
    Rescue,
    Medical,
    Food,
    Shelter,
    Other,
}

impl ReportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportKind::Rescue => "Rescue",
            ReportKind::Medical => "Medical",
            ReportKind::Food => "Food",
            ReportKind::Shelter => "Shelter",
            ReportKind::Other => "Other",
        }
    }
}

impl FromStr for ReportKind {
    type Err = AppError;

    /// Case-insensitive; blank parses as `Other`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rescue" => Ok(ReportKind::Rescue),
            "medical" => Ok(ReportKind::Medical),
            "food" | "water" => Ok(ReportKind::Food),
            "shelter" => Ok(ReportKind::Shelter),
            "" | "other" => Ok(ReportKind::Other),
            other => Err(AppError::Report(format!("unknown report type: '{other}'"))),
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Ordered lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl FromStr for Priority {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            "critical" => Ok(Priority::Critical),
            other => Err(AppError::Report(format!("unknown priority: '{other}'"))),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        };
        f.pad(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Open,
    InProgress,
    Resolved,
}

impl FromStr for Status {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "open" => Ok(Status::Open),
            "in_progress" => Ok(Status::InProgress),
            "resolved" => Ok(Status::Resolved),
            other => Err(AppError::Report(format!("unknown status: '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentReport {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: ReportKind,
    pub location: String,
    pub details: String,
    pub contact: String,
    pub priority: Priority,
    pub status: Status,
    pub timestamp: DateTime<Utc>,
}

/// Unvalidated input as it arrives from a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ReportSubmission {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub priority: Option<Priority>,
}

impl ReportSubmission {
    pub fn new(
        kind: impl Into<String>,
        location: impl Into<String>,
        details: impl Into<String>,
        contact: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            location: location.into(),
            details: details.into(),
            contact: contact.into(),
            priority: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFilter {
    pub kind: Option<ReportKind>,
    pub status: Option<Status>,
    pub min_priority: Option<Priority>,
}

impl ReportFilter {
    fn accepts(&self, r: &IncidentReport) -> bool {
        self.kind.is_none_or(|k| r.kind == k)
            && self.status.is_none_or(|s| r.status == s)
            && self.min_priority.is_none_or(|p| r.priority >= p)
    }
}

// ── Priority derivation ───────────────────────────────────────────────────────

/// Phrases that mark a life-threatening situation regardless of type.
const CRITICAL_TERMS: &[&str] = &[
    "trapped",
    "unconscious",
    "bleeding",
    "not breathing",
    "drowning",
    "collapsed",
];

pub fn derive_priority(kind: ReportKind, details: &str) -> Priority {
    let lowered = details.to_lowercase();
    if CRITICAL_TERMS.iter().any(|t| lowered.contains(t)) {
        return Priority::Critical;
    }
    match kind {
        ReportKind::Rescue | ReportKind::Medical => Priority::High,
        ReportKind::Food | ReportKind::Shelter => Priority::Medium,
        ReportKind::Other => Priority::Low,
    }
}

// ── Store ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone)]
pub struct ReportStore {
    reports: Vec<IncidentReport>,
}

impl ReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store a submission, returning the stored report.
    pub fn submit(&mut self, submission: ReportSubmission) -> Result<IncidentReport, AppError> {
        let location = submission.location.trim();
        if location.is_empty() {
            return Err(AppError::Report("location must not be empty".into()));
        }
        let details = submission.details.trim();
        if details.is_empty() {
            return Err(AppError::Report("details must not be empty".into()));
        }
        let kind: ReportKind = submission.kind.parse()?;

        let report = IncidentReport {
            id: Uuid::new_v4(),
            kind,
            location: location.to_string(),
            details: details.to_string(),
            contact: submission.contact.trim().to_string(),
            priority: submission.priority.unwrap_or_else(|| derive_priority(kind, details)),
            status: Status::Open,
            timestamp: Utc::now(),
        };
        info!(id = %report.id, kind = %report.kind, priority = %report.priority, "incident report submitted");
        self.reports.push(report.clone());
        Ok(report)
    }

    pub fn get(&self, id: Uuid) -> Option<&IncidentReport> {
        self.reports.iter().find(|r| r.id == id)
    }

    /// Matching reports, highest priority first, newest first within a priority.
    pub fn list(&self, filter: &ReportFilter) -> Vec<IncidentReport> {
        let mut out: Vec<IncidentReport> =
            self.reports.iter().filter(|r| filter.accepts(r)).cloned().collect();
        out.sort_by(|a, b| b.priority.cmp(&a.priority).then(b.timestamp.cmp(&a.timestamp)));
        out
    }

    /// Drop reports older than `max_age`. Returns how many were removed.
    pub fn prune_older_than(&mut self, max_age: Duration) -> usize {
        self.prune_before(Utc::now() - max_age)
    }

    pub fn prune_before(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.reports.len();
        self.reports.retain(|r| r.timestamp >= cutoff);
        let removed = before - self.reports.len();
        if removed > 0 {
            debug!(removed, remaining = self.reports.len(), "pruned incident reports");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}
