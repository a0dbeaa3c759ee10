//! Operator notifications.
//!
//! A [`NotificationSink`] receives fire-and-forget messages for the person
//! who triggered an action. The archive coordinator never notifies; its
//! caller turns the outcome into a [`Notification`] with
//! [`archive_notification`].

use serde::{Deserialize, Serialize};

use crate::archive::{ArchiveError, ArchiveReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// A user-facing message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Notification {
    pub fn new(title: impl Into<String>, description: impl Into<String>, severity: Severity) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity,
        }
    }
}

/// Destination for operator notifications. Delivery is best effort.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Build the operator message for an archive outcome.
pub fn archive_notification(outcome: &Result<ArchiveReport, ArchiveError>) -> Notification {
    match outcome {
        Ok(_) => Notification::new("Success", "Item successfully archived.", Severity::Success),
        Err(err @ ArchiveError::NotFound { .. }) => {
            Notification::new("Not found", err.to_string(), Severity::Warning)
        }
        Err(err @ ArchiveError::PurgeFailed { .. }) => Notification::new(
            "Error",
            format!("{err}. Archived copies were written; manual reconciliation is required."),
            Severity::Error,
        ),
        Err(err) => Notification::new("Error", err.to_string(), Severity::Error),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::archive::ArchiveStep;
    use crate::store::StoreError;
    use crate::types::RecordId;

    #[test]
    fn success_message() {
        let report = ArchiveReport {
            job: "seminar".into(),
            primary_id: RecordId::from("sem-1"),
            primary_collection: "seminars".into(),
            archive_collection: "archived_seminars".into(),
            archived_at: Utc::now(),
            dependents: vec![],
        };
        let n = archive_notification(&Ok(report));
        assert_eq!(n.title, "Success");
        assert_eq!(n.description, "Item successfully archived.");
        assert_eq!(n.severity, Severity::Success);
    }

    #[test]
    fn purge_failure_asks_for_reconciliation() {
        let err = ArchiveError::PurgeFailed {
            step: ArchiveStep::PurgeDependents,
            collection: "seminar_signup".into(),
            source: StoreError::Connection("timeout".into()),
        };
        let n = archive_notification(&Err(err));
        assert_eq!(n.severity, Severity::Error);
        assert!(n.description.contains("seminar_signup"));
        assert!(n.description.contains("reconciliation"));
    }

    #[test]
    fn not_found_is_a_warning() {
        let err = ArchiveError::NotFound {
            collection: "seminars".into(),
            id: RecordId::from("x"),
        };
        assert_eq!(archive_notification(&Err(err)).severity, Severity::Warning);
    }
}
