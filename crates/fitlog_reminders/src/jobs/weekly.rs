use fitlog_client::push::NotificationPayload;

/// Check-in when this week's photo exists, otherwise a photo reminder.
pub fn notification(photos_this_week: usize) -> NotificationPayload {
    if photos_this_week > 0 {
        NotificationPayload::new(
            "Weekly Check-in ✅",
            format!(
                "Great job! You've uploaded {photos_this_week} photo(s) this week. Keep tracking your progress! 📸"
            ),
            "/photos",
        )
    } else {
        NotificationPayload::new(
            "Weekly Photo Reminder 📸",
            "📸 Weekly Photo Reminder: Don't forget to upload your progress photo this week! Track your transformation over time.",
            "/photos",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_depends_on_photos() {
        let uploaded = notification(2);
        assert_eq!(uploaded.title, "Weekly Check-in ✅");
        assert!(uploaded.body.contains("uploaded 2 photo(s)"));

        let missing = notification(0);
        assert_eq!(missing.title, "Weekly Photo Reminder 📸");
        assert_eq!(missing.url, "/photos");
    }
}
