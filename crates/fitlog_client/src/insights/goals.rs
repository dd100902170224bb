use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dates::date_key;
use crate::insights::sleep::sleep_hours;
use crate::{DailyLog, FitLogError, UserGoals};

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GoalType {
    Workout,
    Steps,
    Water,
    Sleep,
}

impl GoalType {
    pub const ALL: [GoalType; 4] = [Self::Workout, Self::Steps, Self::Water, Self::Sleep];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Workout => "workout",
            Self::Steps => "steps",
            Self::Water => "water",
            Self::Sleep => "sleep",
        }
    }
}

impl fmt::Display for GoalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GoalType {
    type Err = FitLogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "workout" => Ok(Self::Workout),
            "steps" => Ok(Self::Steps),
            "water" => Ok(Self::Water),
            "sleep" => Ok(Self::Sleep),
            other => Err(FitLogError::InvalidInput(format!("unknown goal type: {other}"))),
        }
    }
}

/// Whether `log` meets the user's goal of the given type.
///
/// No log or no goals record means not met. A steps or water goal that is
/// unset or zero counts as met, so users who never configured one do not see
/// failures; workout and sleep always need recorded data.
pub fn goal_met(log: Option<&DailyLog>, goals: Option<&UserGoals>, goal: GoalType) -> bool {
    let (Some(log), Some(goals)) = (log, goals) else {
        return false;
    };
    match goal {
        GoalType::Workout => log.workout_done == Some(true),
        GoalType::Steps => match goals.steps_goal {
            None | Some(0) => true,
            Some(target) => log.steps.unwrap_or(0) >= target,
        },
        GoalType::Water => match goals.water_goal_liters {
            Some(target) if target != 0.0 => log.water_liters.unwrap_or(0.0) >= target,
            _ => true,
        },
        GoalType::Sleep => {
            let Some(target) = goals.sleep_goal_hours.filter(|t| *t != 0.0) else {
                return false;
            };
            let (Some(wake), Some(sleep)) = (log.wake_time.as_deref(), log.sleep_time.as_deref())
            else {
                return false;
            };
            sleep_hours(wake, sleep).is_some_and(|hours| hours >= target)
        }
    }
}

/// State of one calendar cell.
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DayStatus {
    Empty,
    Met,
    NotMet,
}

pub fn day_status(log: Option<&DailyLog>, goals: Option<&UserGoals>, goal: GoalType) -> DayStatus {
    match log {
        None => DayStatus::Empty,
        Some(_) if goal_met(log, goals, goal) => DayStatus::Met,
        Some(_) => DayStatus::NotMet,
    }
}

/// A calendar day paired with whether its goal was met.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct DayOutcome {
    pub date: String,
    pub met: bool,
}

impl DayOutcome {
    pub fn new(date: impl Into<String>, met: bool) -> Self {
        Self {
            date: date.into(),
            met,
        }
    }
}

/// Evaluate `goal` for every log, keeping the input order.
///
/// Dates are normalised to date keys; rows whose date cannot be parsed keep
/// the raw value.
pub fn annotate_days(
    logs: &[DailyLog],
    goals: Option<&UserGoals>,
    goal: GoalType,
) -> Vec<DayOutcome> {
    logs.iter()
        .map(|log| DayOutcome {
            date: date_key(&log.date).unwrap_or_else(|| log.date.clone()),
            met: goal_met(Some(log), goals, goal),
        })
        .collect()
}

/// Find the log recorded for `date_key` in a fetched range.
pub fn log_for_date<'a>(logs: &'a [DailyLog], key: &str) -> Option<&'a DailyLog> {
    logs.iter()
        .find(|log| date_key(&log.date).as_deref() == Some(key))
}
