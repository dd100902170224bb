//! In-memory `FitnessBackend` and a recording push transport for unit tests.
#![cfg(test)]

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use fitlog_client::push::{NotificationPayload, PushDelivery, PushTransport};
use fitlog_client::{
    DailyLog, DailyLogUpdate, FitLogError, FitnessBackend, Food, PushSubscription, ReminderKind,
    UserProfile, UserUpdate, WeeklyPhoto,
};

#[derive(Default)]
pub struct Tables {
    pub users: Vec<UserProfile>,
    pub logs: Vec<DailyLog>,
    pub photos: Vec<WeeklyPhoto>,
    pub subscriptions: Vec<PushSubscription>,
    /// (user, kind, date key of sending)
    pub reminders: Vec<(String, ReminderKind, String)>,
}

/// Backend over plain vectors. Reminders are stamped with `today`.
pub struct InMemoryBackend {
    pub tables: Mutex<Tables>,
    pub today: String,
    /// Users whose daily log lookups fail.
    pub failing_users: HashSet<String>,
}

impl InMemoryBackend {
    pub fn new(today: &str) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            today: today.to_string(),
            failing_users: HashSet::new(),
        }
    }

    pub fn with_user(self, id: &str, name: &str) -> Self {
        self.tables.lock().unwrap().users.push(UserProfile {
            id: id.into(),
            email: format!("{id}@example.com"),
            name: Some(name.into()),
            ..Default::default()
        });
        self
    }

    pub fn with_log(self, log: DailyLog) -> Self {
        self.tables.lock().unwrap().logs.push(log);
        self
    }

    pub fn with_subscription(self, id: &str, user_id: &str, endpoint: &str) -> Self {
        self.tables.lock().unwrap().subscriptions.push(PushSubscription {
            id: Some(id.into()),
            user_id: user_id.into(),
            endpoint: endpoint.into(),
            p256dh: "key".into(),
            auth: "auth".into(),
        });
        self
    }

    pub fn with_photo(self, user_id: &str, week_start: &str) -> Self {
        let mut tables = self.tables.lock().unwrap();
        let id = (tables.photos.len() + 1).to_string();
        tables.photos.push(WeeklyPhoto {
            id,
            user_id: user_id.into(),
            week_start: week_start.into(),
            image_url: format!("{user_id}/{week_start}-1.jpg"),
            created_at: None,
        });
        drop(tables);
        self
    }

    pub fn with_reminder(self, user_id: &str, kind: ReminderKind, sent_on: &str) -> Self {
        self.tables
            .lock()
            .unwrap()
            .reminders
            .push((user_id.into(), kind, sent_on.into()));
        self
    }

    pub fn failing_for(mut self, user_id: &str) -> Self {
        self.failing_users.insert(user_id.into());
        self
    }

    pub fn reminders_for(&self, user_id: &str) -> Vec<ReminderKind> {
        self.tables
            .lock()
            .unwrap()
            .reminders
            .iter()
            .filter(|(u, _, _)| u == user_id)
            .map(|(_, k, _)| *k)
            .collect()
    }

    pub fn subscription_ids(&self) -> Vec<String> {
        self.tables
            .lock()
            .unwrap()
            .subscriptions
            .iter()
            .filter_map(|s| s.id.clone())
            .collect()
    }
}

fn unsupported<T>(what: &str) -> Result<T, FitLogError> {
    Err(FitLogError::Api {
        status: 501,
        message: format!("{what} not supported by the in-memory backend"),
    })
}

#[async_trait]
impl FitnessBackend for InMemoryBackend {
    async fn get_daily_log(
        &self,
        user_id: &str,
        date: &str,
    ) -> Result<Option<DailyLog>, FitLogError> {
        if self.failing_users.contains(user_id) {
            return Err(FitLogError::Api {
                status: 500,
                message: "boom".into(),
            });
        }
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .logs
            .iter()
            .find(|l| l.user_id == user_id && l.date == date)
            .cloned())
    }

    async fn get_daily_logs(
        &self,
        user_id: &str,
        start: &str,
        end: &str,
    ) -> Result<Vec<DailyLog>, FitLogError> {
        let tables = self.tables.lock().unwrap();
        let mut logs: Vec<DailyLog> = tables
            .logs
            .iter()
            .filter(|l| l.user_id == user_id && l.date.as_str() >= start && l.date.as_str() <= end)
            .cloned()
            .collect();
        logs.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(logs)
    }

    async fn upsert_daily_log(
        &self,
        _user_id: &str,
        _date: &str,
        _update: &DailyLogUpdate,
    ) -> Result<DailyLog, FitLogError> {
        unsupported("upsert_daily_log")
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>, FitLogError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.users.iter().find(|u| u.id == user_id).cloned())
    }

    async fn create_user(&self, _user_id: &str, _email: &str) -> Result<UserProfile, FitLogError> {
        unsupported("create_user")
    }

    async fn update_user(
        &self,
        _user_id: &str,
        _update: &UserUpdate,
    ) -> Result<UserProfile, FitLogError> {
        unsupported("update_user")
    }

    async fn list_users(&self) -> Result<Vec<UserProfile>, FitLogError> {
        Ok(self.tables.lock().unwrap().users.clone())
    }

    async fn list_weekly_photos(&self, user_id: &str) -> Result<Vec<WeeklyPhoto>, FitLogError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .photos
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn photos_for_week(
        &self,
        user_id: &str,
        week_start: &str,
    ) -> Result<Vec<WeeklyPhoto>, FitLogError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .photos
            .iter()
            .filter(|p| p.user_id == user_id && p.week_start == week_start)
            .cloned()
            .collect())
    }

    async fn insert_weekly_photo(
        &self,
        _user_id: &str,
        _week_start: &str,
        _image_path: &str,
    ) -> Result<WeeklyPhoto, FitLogError> {
        unsupported("insert_weekly_photo")
    }

    async fn delete_weekly_photo(
        &self,
        _user_id: &str,
        _photo_id: &str,
    ) -> Result<(), FitLogError> {
        unsupported("delete_weekly_photo")
    }

    async fn upload_object(
        &self,
        _path: &str,
        _bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, FitLogError> {
        unsupported("upload_object")
    }

    async fn create_signed_url(&self, _path: &str, _ttl_secs: u64) -> Result<String, FitLogError> {
        unsupported("create_signed_url")
    }

    async fn remove_objects(&self, _paths: &[String]) -> Result<(), FitLogError> {
        unsupported("remove_objects")
    }

    async fn list_push_subscriptions(
        &self,
        user_id: &str,
    ) -> Result<Vec<PushSubscription>, FitLogError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .subscriptions
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn save_push_subscription(
        &self,
        subscription: &PushSubscription,
    ) -> Result<(), FitLogError> {
        let mut tables = self.tables.lock().unwrap();
        tables
            .subscriptions
            .retain(|s| s.endpoint != subscription.endpoint);
        tables.subscriptions.push(subscription.clone());
        Ok(())
    }

    async fn delete_push_subscription(&self, subscription_id: &str) -> Result<(), FitLogError> {
        let mut tables = self.tables.lock().unwrap();
        tables
            .subscriptions
            .retain(|s| s.id.as_deref() != Some(subscription_id));
        Ok(())
    }

    async fn reminder_sent_since(
        &self,
        user_id: &str,
        kind: ReminderKind,
        since: &str,
    ) -> Result<bool, FitLogError> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .reminders
            .iter()
            .any(|(u, k, sent)| u == user_id && *k == kind && sent.as_str() >= since))
    }

    async fn log_reminder(&self, user_id: &str, kind: ReminderKind) -> Result<(), FitLogError> {
        self.tables
            .lock()
            .unwrap()
            .reminders
            .push((user_id.into(), kind, self.today.clone()));
        Ok(())
    }

    async fn search_foods(
        &self,
        _term: Option<&str>,
        _limit: Option<u32>,
    ) -> Result<Vec<Food>, FitLogError> {
        Ok(vec![])
    }

    async fn add_food(&self, _food: &Food) -> Result<Food, FitLogError> {
        unsupported("add_food")
    }
}

/// Push transport that records every send. Endpoints listed in `gone` answer
/// as expired, endpoints in `failing` return an error.
#[derive(Default)]
pub struct RecordingPush {
    pub sent: Mutex<Vec<(String, NotificationPayload)>>,
    pub gone: HashSet<String>,
    pub failing: HashSet<String>,
}

impl RecordingPush {
    pub fn with_gone(mut self, endpoint: &str) -> Self {
        self.gone.insert(endpoint.into());
        self
    }

    pub fn with_failing(mut self, endpoint: &str) -> Self {
        self.failing.insert(endpoint.into());
        self
    }

    pub fn titles(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, p)| p.title.clone())
            .collect()
    }
}

#[async_trait]
impl PushTransport for RecordingPush {
    async fn send(
        &self,
        subscription: &PushSubscription,
        payload: &NotificationPayload,
    ) -> Result<PushDelivery, FitLogError> {
        if self.failing.contains(&subscription.endpoint) {
            return Err(FitLogError::Api {
                status: 500,
                message: "push service down".into(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((subscription.endpoint.clone(), payload.clone()));
        if self.gone.contains(&subscription.endpoint) {
            return Ok(PushDelivery::Gone);
        }
        Ok(PushDelivery::Delivered)
    }
}
