//! Input checks applied before a log is saved.

use chrono::NaiveTime;
use regex::Regex;
use std::sync::LazyLock;

use crate::{DailyLogUpdate, FitLogError};

static TIME_OF_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([01]\d|2[0-3]):([0-5]\d)(?::([0-5]\d))?$").expect("static regex")
});

/// Parse `HH:MM` or `HH:MM:SS` (the database returns `time` columns with seconds).
pub fn parse_time_of_day(s: &str) -> Option<NaiveTime> {
    let caps = TIME_OF_DAY.captures(s.trim())?;
    let hour = caps.get(1)?.as_str().parse().ok()?;
    let minute = caps.get(2)?.as_str().parse().ok()?;
    let second = match caps.get(3) {
        Some(m) => m.as_str().parse().ok()?,
        None => 0,
    };
    NaiveTime::from_hms_opt(hour, minute, second)
}

pub fn validate_time_of_day(s: &str) -> Result<NaiveTime, FitLogError> {
    parse_time_of_day(s)
        .ok_or_else(|| FitLogError::InvalidInput(format!("invalid time of day: {s:?} (expected HH:MM)")))
}

fn blank_to_clear(field: &mut Option<Option<String>>) {
    if let Some(Some(v)) = field {
        if v.trim().is_empty() {
            *field = Some(None);
        }
    }
}

impl DailyLogUpdate {
    /// Blank time or text fields become explicit clears.
    pub fn normalized(mut self) -> Self {
        blank_to_clear(&mut self.wake_time);
        blank_to_clear(&mut self.sleep_time);
        blank_to_clear(&mut self.workout_type);
        blank_to_clear(&mut self.notes);
        self
    }

    pub fn validate(&self) -> Result<(), FitLogError> {
        for (name, field) in [("wake_time", &self.wake_time), ("sleep_time", &self.sleep_time)] {
            if let Some(Some(t)) = field {
                validate_time_of_day(t).map_err(|_| {
                    FitLogError::InvalidInput(format!("{name} must be HH:MM, got {t:?}"))
                })?;
            }
        }
        if matches!(self.steps, Some(s) if s < 0) {
            return Err(FitLogError::InvalidInput("steps cannot be negative".into()));
        }
        if matches!(self.calories, Some(c) if c < 0) {
            return Err(FitLogError::InvalidInput("calories cannot be negative".into()));
        }
        if matches!(self.water_liters, Some(w) if w < 0.0 || !w.is_finite()) {
            return Err(FitLogError::InvalidInput(
                "water_liters must be a non-negative number".into(),
            ));
        }
        if matches!(self.weight, Some(w) if w <= 0.0 || !w.is_finite()) {
            return Err(FitLogError::InvalidInput("weight must be positive".into()));
        }
        if matches!(self.workout_type, Some(Some(_))) && self.workout_done == Some(false) {
            return Err(FitLogError::InvalidInput(
                "workout_type requires workout_done".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_of_day_accepts_minutes_and_seconds() {
        assert_eq!(
            parse_time_of_day("06:30"),
            NaiveTime::from_hms_opt(6, 30, 0)
        );
        assert_eq!(
            parse_time_of_day("22:15:45"),
            NaiveTime::from_hms_opt(22, 15, 45)
        );
    }

    #[test]
    fn time_of_day_rejects_out_of_range() {
        for bad in ["24:00", "7:30", "12:60", "noon", ""] {
            assert!(validate_time_of_day(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn normalized_turns_blank_times_into_clears() {
        let update = DailyLogUpdate {
            wake_time: Some(Some("".into())),
            sleep_time: Some(Some("23:00".into())),
            notes: Some(Some("   ".into())),
            ..Default::default()
        }
        .normalized();
        assert_eq!(update.wake_time, Some(None));
        assert_eq!(update.sleep_time, Some(Some("23:00".into())));
        assert_eq!(update.notes, Some(None));
        assert!(update.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let bad_time = DailyLogUpdate {
            sleep_time: Some(Some("25:00".into())),
            ..Default::default()
        };
        assert!(bad_time.validate().is_err());

        let negative = DailyLogUpdate {
            steps: Some(-1),
            ..Default::default()
        };
        assert!(negative.validate().is_err());

        let orphan_type = DailyLogUpdate {
            workout_done: Some(false),
            workout_type: Some(Some("Run".into())),
            ..Default::default()
        };
        assert!(orphan_type.validate().is_err());
    }
}
