use chrono::NaiveDate;
use fitlog_client::insights::PeriodTotals;
use fitlog_client::insights::report::group_thousands;
use fitlog_client::insights::streak::{full_day, outcomes_by, sort_desc};
use fitlog_client::insights::current_streak;
use fitlog_client::{DailyLog, UserProfile};
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MonthlyReport {
    pub month: String,
    pub totals: PeriodTotals,
    /// Consecutive days, newest first, with steps, water and a workout recorded.
    pub streak: u32,
}

impl MonthlyReport {
    pub fn from_logs(today: NaiveDate, logs: &[DailyLog]) -> Self {
        let mut days = outcomes_by(logs, full_day);
        sort_desc(&mut days);
        Self {
            month: today.format("%B %Y").to_string(),
            totals: PeriodTotals::from_logs(logs),
            streak: current_streak(&days),
        }
    }

    pub fn render(&self, user: &UserProfile) -> String {
        let t = &self.totals;
        format!(
            "Hi {name},\n\n\
             Your monthly fitness report for {month}:\n\n\
             📊 Summary:\n\
             - Workouts completed: {workouts} days\n\
             - Average daily steps: {avg_steps}\n\
             - Average daily calories: {avg_calories}\n\
             - Current streak: {streak} days\n\n\
             📈 Trends:\n\
             - Total steps: {total_steps}\n\
             - Total calories logged: {total_calories}\n\n\
             Keep up the amazing work! Your consistency is building strong habits.",
            name = user.display_name(),
            month = self.month,
            workouts = t.workouts,
            avg_steps = t.avg_steps,
            avg_calories = t.avg_calories,
            streak = self.streak,
            total_steps = group_thousands(t.total_steps),
            total_calories = group_thousands(t.total_calories),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log(date: &str, steps: i64, water: f64, workout: bool) -> DailyLog {
        DailyLog {
            date: date.into(),
            steps: Some(steps),
            calories: Some(2000),
            water_liters: Some(water),
            workout_done: Some(workout),
            ..Default::default()
        }
    }

    #[test]
    fn streak_uses_newest_days_regardless_of_input_order() {
        let logs = vec![
            log("2026-03-01", 5000, 2.0, false),
            log("2026-03-03", 12000, 2.0, true),
            log("2026-03-02", 8000, 1.5, true),
        ];
        let today = NaiveDate::from_ymd_opt(2026, 3, 20).unwrap();
        let report = MonthlyReport::from_logs(today, &logs);
        assert_eq!(report.streak, 2);
        assert_eq!(report.month, "March 2026");
        assert_eq!(report.totals.workouts, 2);
        assert_eq!(report.totals.total_steps, 25000);
    }

    #[test]
    fn rendered_text_groups_totals() {
        let logs = vec![log("2026-03-03", 12000, 2.0, true)];
        let today = NaiveDate::from_ymd_opt(2026, 3, 20).unwrap();
        let user = UserProfile {
            id: "u1".into(),
            name: Some("Sam".into()),
            ..Default::default()
        };
        let text = MonthlyReport::from_logs(today, &logs).render(&user);
        assert!(text.starts_with("Hi Sam,"));
        assert!(text.contains("- Total steps: 12,000"));
        assert!(text.contains("- Current streak: 1 days"));
    }

    #[test]
    fn empty_month_reports_zeros() {
        let today = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let report = MonthlyReport::from_logs(today, &[]);
        assert_eq!(report.streak, 0);
        assert_eq!(report.totals.avg_steps, 0);
    }
}
