use serde::Serialize;

use crate::DailyLog;
use crate::insights::sleep::sleep_hours;

pub const CSV_HEADER: [&str; 10] = [
    "Date",
    "Weight (kg)",
    "Steps",
    "Calories",
    "Water (L)",
    "Workout",
    "Workout Type",
    "Wake Time",
    "Sleep Time",
    "Notes",
];

/// Headline numbers for a range of logs.
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
pub struct ReportSummary {
    pub count: usize,
    pub weight_entries: usize,
    pub workout_days: usize,
    pub avg_steps: i64,
}

pub fn summarize(logs: &[DailyLog]) -> ReportSummary {
    if logs.is_empty() {
        return ReportSummary::default();
    }
    let total_steps: i64 = logs.iter().map(|l| l.steps.unwrap_or(0)).sum();
    ReportSummary {
        count: logs.len(),
        weight_entries: logs.iter().filter(|l| l.weight.is_some_and(|w| w != 0.0)).count(),
        workout_days: logs.iter().filter(|l| l.workout_done == Some(true)).count(),
        avg_steps: (total_steps as f64 / logs.len() as f64).round() as i64,
    }
}

fn cell<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Render logs as CSV, one row per log in the given order.
///
/// Every field is wrapped in double quotes and missing values become `""`.
/// Quotes inside values are not escaped, so notes containing `"` will not
/// read back cleanly.
pub fn to_csv(logs: &[DailyLog]) -> String {
    let mut lines = Vec::with_capacity(logs.len() + 1);
    lines.push(CSV_HEADER.join(","));
    for log in logs {
        let fields = [
            log.date.clone(),
            cell(log.weight),
            cell(log.steps),
            cell(log.calories),
            cell(log.water_liters),
            if log.workout_done == Some(true) { "Yes" } else { "No" }.to_string(),
            cell(log.workout_type.as_deref()),
            cell(log.wake_time.as_deref()),
            cell(log.sleep_time.as_deref()),
            cell(log.notes.as_deref()),
        ];
        let row: Vec<String> = fields.iter().map(|f| format!("\"{f}\"")).collect();
        lines.push(row.join(","));
    }
    lines.join("\n")
}

pub fn report_file_name(start: &str, end: &str) -> String {
    format!("fitness-report-{start}-to-{end}.csv")
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct SleepEntry {
    pub date: String,
    pub hours: f64,
}

/// Sleep duration per log that has both times recorded.
pub fn sleep_series(logs: &[DailyLog]) -> Vec<SleepEntry> {
    logs.iter()
        .filter_map(|log| {
            let hours = sleep_hours(log.wake_time.as_deref()?, log.sleep_time.as_deref()?)?;
            Some(SleepEntry {
                date: log.date.clone(),
                hours,
            })
        })
        .collect()
}

/// Totals used by the weekly and monthly summaries.
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct PeriodTotals {
    pub days: usize,
    pub workouts: usize,
    pub total_steps: i64,
    pub avg_steps: i64,
    pub total_calories: i64,
    pub avg_calories: i64,
}

impl PeriodTotals {
    pub fn from_logs(logs: &[DailyLog]) -> Self {
        let days = logs.len();
        let total_steps: i64 = logs.iter().map(|l| l.steps.unwrap_or(0)).sum();
        let total_calories: i64 = logs.iter().map(|l| l.calories.unwrap_or(0)).sum();
        let avg = |total: i64| {
            if days == 0 {
                0
            } else {
                (total as f64 / days as f64).round() as i64
            }
        };
        Self {
            days,
            workouts: logs.iter().filter(|l| l.workout_done == Some(true)).count(),
            total_steps,
            avg_steps: avg(total_steps),
            total_calories,
            avg_calories: avg(total_calories),
        }
    }
}

/// `1234567` -> `1,234,567`.
pub fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if n < 0 {
        out.insert(0, '-');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DailyLog {
        DailyLog {
            date: "2026-03-02".into(),
            weight: Some(72.5),
            steps: Some(9000),
            calories: Some(2100),
            water_liters: Some(2.0),
            workout_done: Some(true),
            workout_type: Some("Run".into()),
            wake_time: Some("06:30".into()),
            sleep_time: Some("22:30".into()),
            notes: None,
            ..Default::default()
        }
    }

    #[test]
    fn summarize_empty_is_all_zero() {
        assert_eq!(
            summarize(&[]),
            ReportSummary {
                count: 0,
                weight_entries: 0,
                workout_days: 0,
                avg_steps: 0
            }
        );
    }

    #[test]
    fn summarize_treats_missing_steps_as_zero() {
        let logs = vec![
            sample(),
            DailyLog {
                date: "2026-03-01".into(),
                steps: None,
                ..Default::default()
            },
        ];
        let s = summarize(&logs);
        assert_eq!(s.count, 2);
        assert_eq!(s.weight_entries, 1);
        assert_eq!(s.workout_days, 1);
        assert_eq!(s.avg_steps, 4500);
    }

    #[test]
    fn csv_has_header_and_quoted_rows() {
        let csv = to_csv(&[sample()]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            "Date,Weight (kg),Steps,Calories,Water (L),Workout,Workout Type,Wake Time,Sleep Time,Notes"
        );
        assert_eq!(
            lines[1],
            r#""2026-03-02","72.5","9000","2100","2","Yes","Run","06:30","22:30","""#
        );
    }

    #[test]
    fn csv_missing_values_are_empty_quotes() {
        let log = DailyLog {
            date: "2026-03-03".into(),
            ..Default::default()
        };
        let csv = to_csv(&[log.clone(), log]);
        assert_eq!(csv.lines().count(), 3);
        let row = csv.lines().nth(1).unwrap();
        assert_eq!(row, r#""2026-03-03","","","","","No","","","","""#);
    }

    fn read_csv(text: &str) -> Vec<csv::StringRecord> {
        csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(text.as_bytes())
            .records()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn csv_reader_gets_back_every_field() {
        let mut first = sample();
        first.notes = Some("legs, then core".into());
        let second = DailyLog {
            date: "2026-03-03".into(),
            steps: Some(400),
            notes: Some("rest day\nfelt tired".into()),
            ..Default::default()
        };
        let logs = vec![first, second];

        let records = read_csv(&to_csv(&logs));
        assert_eq!(records.len(), logs.len());
        assert_eq!(
            records[0].iter().collect::<Vec<_>>(),
            vec![
                "2026-03-02",
                "72.5",
                "9000",
                "2100",
                "2",
                "Yes",
                "Run",
                "06:30",
                "22:30",
                "legs, then core"
            ]
        );
        assert_eq!(
            records[1].iter().collect::<Vec<_>>(),
            vec!["2026-03-03", "", "400", "", "", "No", "", "", "", "rest day\nfelt tired"]
        );
    }

    #[test]
    fn csv_embedded_quotes_do_not_read_back() {
        let mut log = sample();
        log.notes = Some(r#"coach said "go""#.into());
        let text = to_csv(&[log]);
        let notes: Vec<String> = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(text.as_bytes())
            .records()
            .filter_map(Result::ok)
            .filter_map(|r| r.get(9).map(str::to_string))
            .collect();
        assert!(!notes.iter().any(|n| n == r#"coach said "go""#));
    }

    #[test]
    fn file_name_pattern() {
        assert_eq!(
            report_file_name("2026-02-01", "2026-03-01"),
            "fitness-report-2026-02-01-to-2026-03-01.csv"
        );
    }

    #[test]
    fn sleep_series_skips_partial_nights() {
        let partial = DailyLog {
            date: "2026-03-01".into(),
            wake_time: Some("07:00".into()),
            ..Default::default()
        };
        let series = sleep_series(&[sample(), partial]);
        assert_eq!(
            series,
            vec![SleepEntry {
                date: "2026-03-02".into(),
                hours: 8.0
            }]
        );
    }

    #[test]
    fn period_totals_average_over_logged_days() {
        let logs = vec![
            sample(),
            DailyLog {
                date: "2026-03-03".into(),
                steps: Some(3000),
                calories: Some(1800),
                ..Default::default()
            },
        ];
        let totals = PeriodTotals::from_logs(&logs);
        assert_eq!(totals.workouts, 1);
        assert_eq!(totals.total_steps, 12000);
        assert_eq!(totals.avg_steps, 6000);
        assert_eq!(totals.avg_calories, 1950);
        assert_eq!(PeriodTotals::from_logs(&[]).avg_steps, 0);
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
        assert_eq!(group_thousands(-45000), "-45,000");
    }
}
