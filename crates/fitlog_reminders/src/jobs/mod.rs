//! Scheduled reminder jobs.
//!
//! Each submodule holds the pure part of a job: given the rows fetched for a
//! user it decides whether to notify and builds the message.
//! [`ReminderService`](crate::ReminderService) does the fetching and delivery.

use std::fmt;
use std::str::FromStr;

use fitlog_client::ReminderKind;
use serde::Serialize;

use crate::error::ReminderError;

pub mod evening;
pub mod monthly;
pub mod morning;
pub mod weekly;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderJob {
    Morning,
    Evening,
    Weekly,
    Monthly,
}

impl ReminderJob {
    pub const ALL: [ReminderJob; 4] = [Self::Morning, Self::Evening, Self::Weekly, Self::Monthly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Evening => "evening",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    /// Reminder log category recorded after a user is handled.
    pub fn kind(&self) -> ReminderKind {
        match self {
            Self::Morning | Self::Evening => ReminderKind::Daily,
            Self::Weekly => ReminderKind::Weekly,
            Self::Monthly => ReminderKind::Monthly,
        }
    }

    pub fn summary(&self) -> &'static str {
        match self {
            Self::Morning => "Morning reminders processed",
            Self::Evening => "Daily checks processed",
            Self::Weekly => "Weekly reminders processed",
            Self::Monthly => "Monthly reports processed",
        }
    }
}

impl fmt::Display for ReminderJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReminderJob {
    type Err = ReminderError;

    /// Accepts the short names and the scheduled function names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "morning" | "morning-reminder" => Ok(Self::Morning),
            "evening" | "daily-checker" => Ok(Self::Evening),
            "weekly" | "weekly-reminder" => Ok(Self::Weekly),
            "monthly" | "monthly-report" => Ok(Self::Monthly),
            other => Err(ReminderError::UnknownJob(other.to_string())),
        }
    }
}
