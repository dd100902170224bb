use serde::Serialize;

use crate::jobs::ReminderJob;

/// Outcome of a job run, returned by both binaries as JSON.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub job: ReminderJob,
    pub message: String,
    /// Users visited.
    pub count: usize,
    pub notified: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl JobReport {
    pub fn new(job: ReminderJob, count: usize) -> Self {
        Self {
            job,
            message: job.summary().to_string(),
            count,
            notified: 0,
            skipped: 0,
            failed: 0,
        }
    }
}

/// What happened for one user during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserOutcome {
    Notified,
    Skipped,
}
