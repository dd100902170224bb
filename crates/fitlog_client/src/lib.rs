//! `FitnessBackend` trait, fitness records and a reqwest-based implementation.
//!
//! The pure derived-metrics layer lives in [`dates`] and [`insights`]; everything
//! else talks to the hosted row store, object storage or a Web Push service.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub mod config;
pub mod dates;
pub mod http_client;
pub mod insights;
pub mod photos;
pub mod push;
pub mod retry;
pub mod session;
pub mod validation;

#[derive(Debug, Error)]
pub enum FitLogError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("push error: {0}")]
    Push(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FitLogError {
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            404 => Self::NotFound(message),
            401 | 403 => Self::Auth(message),
            400 | 409 | 422 => Self::InvalidInput(message),
            _ => Self::Api { status, message },
        }
    }

    /// Transport failures, throttling and server-side errors are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// One row per (user, calendar date).
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct DailyLog {
    #[serde(default, deserialize_with = "deserialize_opt_string")]
    pub id: Option<String>,
    #[serde(default)]
    pub user_id: String,
    pub date: String, // YYYY-MM-DD
    pub weight: Option<f64>,
    pub steps: Option<i64>,
    pub calories: Option<i64>,
    #[serde(default)]
    pub protein: Option<f64>,
    #[serde(default)]
    pub carbs: Option<f64>,
    pub water_liters: Option<f64>,
    pub workout_done: Option<bool>,
    pub workout_type: Option<String>,
    pub wake_time: Option<String>,
    pub sleep_time: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Partial update for a daily log.
///
/// `None` leaves a column untouched. For the nullable text columns
/// `Some(None)` clears the stored value.
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct DailyLogUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calories: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protein: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carbs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub water_liters: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workout_done: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workout_type: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wake_time: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep_time: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
}

/// Goal thresholds configured on the user profile.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct UserGoals {
    #[serde(default)]
    pub steps_goal: Option<i64>,
    #[serde(default)]
    pub water_goal_liters: Option<f64>,
    #[serde(default)]
    pub workout_days_goal: Option<i64>,
    #[serde(default)]
    pub sleep_goal_hours: Option<f64>,
    #[serde(default)]
    pub weight_goal: Option<f64>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub height_cm: Option<f64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub goals: UserGoals,
}

impl UserProfile {
    /// Name used in greetings ("there" when the user never set one).
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(n) if !n.trim().is_empty() => n,
            _ => "there",
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height_cm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps_goal: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub water_goal_liters: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workout_days_goal: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep_goal_hours: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_goal: Option<Option<f64>>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct WeeklyPhoto {
    #[serde(deserialize_with = "deserialize_string_or_number")]
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    pub week_start: String,
    /// Storage path of the object. Older rows may hold a full URL instead.
    pub image_url: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// A photo paired with a time-limited URL suitable for display.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct SignedPhoto {
    #[serde(flatten)]
    pub photo: WeeklyPhoto,
    pub signed_url: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct PushSubscription {
    #[serde(default, deserialize_with = "deserialize_opt_string")]
    pub id: Option<String>,
    #[serde(default)]
    pub user_id: String,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ReminderKind {
    Daily,
    Weekly,
    Monthly,
}

impl ReminderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ReminderLogEntry {
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: ReminderKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Food {
    #[serde(default, deserialize_with = "deserialize_opt_string")]
    pub id: Option<String>,
    pub name: String,
    pub calories_per_unit: f64,
    #[serde(default)]
    pub protein_per_unit: f64,
    #[serde(default)]
    pub carbs_per_unit: f64,
    pub unit: String,
}

fn deserialize_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(n.to_string().into()),
        Some(other) => Err(D::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

fn deserialize_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    deserialize_opt_string(deserializer)?.ok_or_else(|| D::Error::custom("missing id"))
}

/// Row store, object storage and reminder bookkeeping used by the app and the jobs.
#[async_trait]
pub trait FitnessBackend: Send + Sync + 'static {
    // === Daily logs ===

    /// Fetch the log for one date, `None` when nothing was recorded.
    async fn get_daily_log(
        &self,
        user_id: &str,
        date: &str,
    ) -> Result<Option<DailyLog>, FitLogError>;

    /// Logs with `start <= date <= end`, newest first.
    async fn get_daily_logs(
        &self,
        user_id: &str,
        start: &str,
        end: &str,
    ) -> Result<Vec<DailyLog>, FitLogError>;

    /// Create the log for `date` or merge `update` into the existing one.
    async fn upsert_daily_log(
        &self,
        user_id: &str,
        date: &str,
        update: &DailyLogUpdate,
    ) -> Result<DailyLog, FitLogError>;

    // === Users ===

    async fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>, FitLogError>;
    async fn create_user(&self, user_id: &str, email: &str) -> Result<UserProfile, FitLogError>;
    async fn update_user(
        &self,
        user_id: &str,
        update: &UserUpdate,
    ) -> Result<UserProfile, FitLogError>;
    async fn list_users(&self) -> Result<Vec<UserProfile>, FitLogError>;

    /// Fetch the profile, creating an empty one on first access.
    async fn ensure_user(&self, user_id: &str, email: &str) -> Result<UserProfile, FitLogError> {
        match self.get_user(user_id).await? {
            Some(user) => Ok(user),
            None => self.create_user(user_id, email).await,
        }
    }

    // === Weekly photos ===

    /// All photos of a user, newest week first.
    async fn list_weekly_photos(&self, user_id: &str) -> Result<Vec<WeeklyPhoto>, FitLogError>;
    async fn photos_for_week(
        &self,
        user_id: &str,
        week_start: &str,
    ) -> Result<Vec<WeeklyPhoto>, FitLogError>;
    async fn insert_weekly_photo(
        &self,
        user_id: &str,
        week_start: &str,
        image_path: &str,
    ) -> Result<WeeklyPhoto, FitLogError>;
    async fn delete_weekly_photo(&self, user_id: &str, photo_id: &str)
    -> Result<(), FitLogError>;

    // === Object storage ===

    /// Store `bytes` under `path` in the photo bucket and return the stored path.
    async fn upload_object(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, FitLogError>;
    async fn create_signed_url(&self, path: &str, ttl_secs: u64) -> Result<String, FitLogError>;
    async fn remove_objects(&self, paths: &[String]) -> Result<(), FitLogError>;

    // === Push subscriptions ===

    async fn list_push_subscriptions(
        &self,
        user_id: &str,
    ) -> Result<Vec<PushSubscription>, FitLogError>;
    async fn save_push_subscription(
        &self,
        subscription: &PushSubscription,
    ) -> Result<(), FitLogError>;
    async fn delete_push_subscription(&self, subscription_id: &str) -> Result<(), FitLogError>;

    // === Reminder log ===

    /// Whether a reminder of `kind` was recorded for the user at or after `since` (a date key).
    async fn reminder_sent_since(
        &self,
        user_id: &str,
        kind: ReminderKind,
        since: &str,
    ) -> Result<bool, FitLogError>;
    async fn log_reminder(&self, user_id: &str, kind: ReminderKind) -> Result<(), FitLogError>;

    // === Foods ===

    /// Case-insensitive substring search ordered by name.
    async fn search_foods(
        &self,
        term: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<Food>, FitLogError>;
    async fn add_food(&self, food: &Food) -> Result<Food, FitLogError>;
}
