//! Derived metrics computed from already-fetched records.
//!
//! Everything here is synchronous and side-effect free. Missing data always
//! produces a conservative default (`false`, `0`, `None`) rather than an error.
//!
//! - [`goals`]: per-day goal evaluation and calendar day status
//! - [`sleep`]: sleep duration from wall-clock times
//! - [`streak`]: current streak, consistency and completeness scores
//! - [`report`]: range summaries, period totals and CSV export

pub mod goals;
pub mod report;
pub mod sleep;
pub mod streak;

pub use goals::{DayOutcome, DayStatus, GoalType, annotate_days, day_status, goal_met};
pub use report::{PeriodTotals, ReportSummary, report_file_name, summarize, to_csv};
pub use sleep::sleep_hours;
pub use streak::{consistency_score, current_streak};
