use fitlog_client::push::NotificationPayload;
use fitlog_client::{DailyLog, UserProfile};

pub const TITLE: &str = "Morning Reminder 🌅";

/// Nudge users who have not logged anything for today yet.
pub fn notification(user: &UserProfile, today_log: Option<&DailyLog>) -> Option<NotificationPayload> {
    if today_log.is_some() {
        return None;
    }
    let body = format!(
        "Good morning {}! 🌅 Don't forget to log your fitness data today. Track your weight, steps, and workouts to stay on track!",
        user.display_name()
    );
    Some(NotificationPayload::new(TITLE, body, "/dashboard"))
}
