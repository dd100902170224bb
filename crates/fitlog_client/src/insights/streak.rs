use crate::DailyLog;
use crate::dates::date_key;
use crate::insights::goals::DayOutcome;

/// Consecutive met days counted from the front of `days`.
///
/// `days` must already be sorted by date, newest first; this function does
/// not sort and gives a meaningless answer on unsorted input. Use
/// [`sort_desc`] when the order is not guaranteed.
pub fn current_streak(days: &[DayOutcome]) -> u32 {
    days.iter().take_while(|d| d.met).count() as u32
}

/// Sort newest first by date key.
pub fn sort_desc(days: &mut [DayOutcome]) {
    days.sort_by(|a, b| b.date.cmp(&a.date));
}

/// Percentage of met days, rounded; `0` for no days.
pub fn consistency_score(days: &[DayOutcome]) -> u8 {
    if days.is_empty() {
        return 0;
    }
    let met = days.iter().filter(|d| d.met).count();
    (100.0 * met as f64 / days.len() as f64).round() as u8
}

/// How much of a day was filled in: 25 points each for steps, water, an
/// explicit workout answer and a full sleep window.
pub fn completeness_score(log: &DailyLog) -> u8 {
    let mut score = 0;
    if log.steps.is_some_and(|s| s != 0) {
        score += 25;
    }
    if log.water_liters.is_some_and(|w| w != 0.0) {
        score += 25;
    }
    if log.workout_done.is_some() {
        score += 25;
    }
    if log.wake_time.is_some() && log.sleep_time.is_some() {
        score += 25;
    }
    score
}

/// Some steps and some water recorded; the analytics view scores consistency on this.
pub fn logged_basics(log: &DailyLog) -> bool {
    log.steps.unwrap_or(0) > 0 && log.water_liters.unwrap_or(0.0) > 0.0
}

/// Steps, water and a workout all recorded; used by the monthly report streak.
pub fn full_day(log: &DailyLog) -> bool {
    log.steps.unwrap_or(0) != 0 && log.water_liters.unwrap_or(0.0) != 0.0 && log.workout_done == Some(true)
}

/// Outcomes for `logs` under an arbitrary predicate, keeping input order.
///
/// Dates are normalised to `YYYY-MM-DD` keys so [`sort_desc`] orders them correctly.
pub fn outcomes_by<F>(logs: &[DailyLog], predicate: F) -> Vec<DayOutcome>
where
    F: Fn(&DailyLog) -> bool,
{
    logs.iter()
        .map(|log| {
            let date = date_key(&log.date).unwrap_or_else(|| log.date.clone());
            DayOutcome::new(date, predicate(log))
        })
        .collect()
}
