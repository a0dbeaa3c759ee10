//! Named archive jobs.
//!
//! The registry ships with the `seminar` job and can be extended from a JSON
//! file holding an array of [`ArchiveJobDescriptor`]s.

use std::collections::BTreeMap;
use std::path::Path;

use super::{ArchiveJobDescriptor, DependentCascade};
use crate::error::CoreError;

/// Name of the built-in seminar job.
pub const SEMINAR_JOB: &str = "seminar";

/// Seminars cascade to signups (`seminar_id`) and registrations (`saminarId`).
pub fn seminar_job() -> ArchiveJobDescriptor {
    ArchiveJobDescriptor::new(SEMINAR_JOB, "seminars", "archived_seminars")
        .with_dependent(DependentCascade::new(
            "seminar_signup",
            "seminar_id",
            "archived_seminar_signup",
        ))
        .with_dependent(DependentCascade::new(
            "seminar_registration",
            "saminarId",
            "archived_seminar_registration",
        ))
}

/// Job name → descriptor. Every stored descriptor has passed
/// [`ArchiveJobDescriptor::check`].
#[derive(Debug, Clone, Default)]
pub struct ArchiveRegistry {
    jobs: BTreeMap<String, ArchiveJobDescriptor>,
}

impl ArchiveRegistry {
    /// Registry containing the built-in jobs.
    pub fn builtin() -> Self {
        let mut jobs = BTreeMap::new();
        let seminar = seminar_job();
        jobs.insert(seminar.name.clone(), seminar);
        Self { jobs }
    }

    /// Add a job. Fails on an invalid descriptor or a name already taken.
    pub fn register(&mut self, job: ArchiveJobDescriptor) -> Result<(), CoreError> {
        job.check()
            .map_err(|e| CoreError::Validation(e.to_string()))?;
        if self.jobs.contains_key(&job.name) {
            return Err(CoreError::Conflict(format!(
                "Archive job '{}' already registered",
                job.name
            )));
        }
        self.jobs.insert(job.name.clone(), job);
        Ok(())
    }

    /// Register every descriptor in a JSON array file.
    pub fn load_file(&mut self, path: &Path) -> Result<usize, CoreError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Validation(format!("Cannot read {}: {e}", path.display()))
        })?;
        let jobs: Vec<ArchiveJobDescriptor> = serde_json::from_str(&raw).map_err(|e| {
            CoreError::Validation(format!("Invalid archive jobs in {}: {e}", path.display()))
        })?;

        let count = jobs.len();
        for job in jobs {
            self.register(job)?;
        }
        tracing::info!(path = %path.display(), count, "Loaded archive jobs");
        Ok(count)
    }

    pub fn get(&self, name: &str) -> Option<&ArchiveJobDescriptor> {
        self.jobs.get(name)
    }

    pub fn jobs(&self) -> impl Iterator<Item = &ArchiveJobDescriptor> {
        self.jobs.values()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
