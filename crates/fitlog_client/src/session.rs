//! Per-session and per-device state, passed explicitly to whoever needs it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::WeeklyPhoto;
use crate::dates::week_start_key;

/// Once-per-session "upload this week's photo" nudge.
#[derive(Clone, Debug, Default)]
pub struct PhotoReminderGate {
    shown: bool,
}

impl PhotoReminderGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn already_shown(&self) -> bool {
        self.shown
    }

    /// `true` when no photo exists for the week containing `today` and the
    /// reminder has not been shown yet. A `true` answer marks it shown.
    pub fn check(&mut self, photos: &[WeeklyPhoto], today: NaiveDate) -> bool {
        if self.shown {
            return false;
        }
        let current_week = week_start_key(today);
        if photos.iter().any(|p| p.week_start == current_week) {
            return false;
        }
        self.shown = true;
        true
    }
}

/// Device display preferences; callers decide where the serialised form lives.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Preferences {
    #[serde(default)]
    pub dark_mode: bool,
}

impl Preferences {
    pub fn toggle_dark_mode(&mut self) -> bool {
        self.dark_mode = !self.dark_mode;
        self.dark_mode
    }
}
