use fitlog_client::push::NotificationPayload;
use fitlog_client::{DailyLog, UserProfile};

pub const TITLE: &str = "Evening Reminder 🌙";

/// Unfinished items for today. A missing log counts as nothing done.
pub fn missing_items(user: &UserProfile, log: Option<&DailyLog>) -> Vec<String> {
    let mut items = Vec::new();
    let steps = log.and_then(|l| l.steps).unwrap_or(0);
    if steps == 0 {
        items.push("No steps logged today".to_string());
    }
    if !log.is_some_and(|l| l.workout_done == Some(true)) {
        items.push("No workout logged today".to_string());
    }
    let water = log.and_then(|l| l.water_liters).unwrap_or(0.0);
    let goal = user.goals.water_goal_liters.unwrap_or(0.0);
    if log.is_none() || water < goal {
        items.push(format!("Water intake below goal ({water}L / {goal}L)"));
    }
    items
}

pub fn notification(user: &UserProfile, log: Option<&DailyLog>) -> Option<NotificationPayload> {
    let items = missing_items(user, log);
    if items.is_empty() {
        return None;
    }
    let body = format!(
        "Evening reminder for {}: {}. Don't forget to log your data before the day ends!",
        user.display_name(),
        items.join(", ")
    );
    Some(NotificationPayload::new(TITLE, body, "/dashboard"))
}
