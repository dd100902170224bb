use crate::validation::parse_time_of_day;

/// Hours between falling asleep and waking, rounded to one decimal.
///
/// Both values are times of day on a shared reference date; a negative
/// difference means the night crossed midnight and gets 24h added. Equal
/// times yield `0.0`, not `24.0`. Returns `None` when either time fails to
/// parse.
pub fn sleep_hours(wake: &str, sleep: &str) -> Option<f64> {
    let wake = parse_time_of_day(wake)?;
    let sleep = parse_time_of_day(sleep)?;
    let mut hours = wake.signed_duration_since(sleep).num_seconds() as f64 / 3600.0;
    if hours < 0.0 {
        hours += 24.0;
    }
    Some((hours * 10.0).round() / 10.0)
}
