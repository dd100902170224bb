//! reqwest implementation of [`FitnessBackend`](crate::FitnessBackend) against a
//! PostgREST row store and its companion object storage API.

use async_trait::async_trait;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::config::Config;
use crate::retry::RetryPolicy;
use crate::{
    DailyLog, DailyLogUpdate, FitLogError, FitnessBackend, Food, PushSubscription, ReminderKind,
    ReminderLogEntry, UserProfile, UserUpdate, WeeklyPhoto,
};

const RETURN_REPRESENTATION: &str = "return=representation";
const MERGE_REPRESENTATION: &str = "resolution=merge-duplicates,return=representation";
const MERGE_MINIMAL: &str = "resolution=merge-duplicates,return=minimal";
const DEFAULT_FOOD_LIMIT: u32 = 50;

type Query<'a> = [(&'a str, String)];

#[derive(Clone, Debug)]
pub struct ReqwestBackend {
    base_url: String,
    api_key: SecretString,
    access_token: Option<SecretString>,
    bucket: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl ReqwestBackend {
    /// `base_url` is the project URL, e.g. `https://abc.supabase.co`.
    pub fn new(
        base_url: &str,
        api_key: SecretString,
        access_token: Option<SecretString>,
        bucket: impl Into<String>,
    ) -> Result<Self, FitLogError> {
        let client = reqwest::Client::builder().gzip(true).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            access_token,
            bucket: bucket.into(),
            client,
            retry: RetryPolicy::default(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, FitLogError> {
        Self::new(
            &config.base_url,
            config.api_key.clone(),
            config.access_token.clone(),
            config.photo_bucket.clone(),
        )
    }

    /// Policy applied to reads; writes are attempted once.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn storage_url(&self, suffix: &str) -> String {
        format!("{}/storage/v1/{}", self.base_url, suffix.trim_start_matches('/'))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let bearer = self
            .access_token
            .as_ref()
            .unwrap_or(&self.api_key)
            .expose_secret();
        request
            .header("apikey", self.api_key.expose_secret())
            .bearer_auth(bearer)
    }

    fn get_request(&self, url: &str) -> reqwest::RequestBuilder {
        self.authorize(self.client.get(url))
    }

    fn post_request(&self, url: &str) -> reqwest::RequestBuilder {
        self.authorize(self.client.post(url))
    }

    fn patch_request(&self, url: &str) -> reqwest::RequestBuilder {
        self.authorize(self.client.patch(url))
    }

    fn delete_request(&self, url: &str) -> reqwest::RequestBuilder {
        self.authorize(self.client.delete(url))
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, FitLogError> {
        let resp = Self::send(request).await?;
        self.handle_response(resp).await
    }

    async fn execute_empty(&self, request: reqwest::RequestBuilder) -> Result<(), FitLogError> {
        let resp = Self::send(request).await?;
        if !resp.status().is_success() {
            return Err(self.error_from_response(resp).await);
        }
        Ok(())
    }

    async fn send(request: reqwest::RequestBuilder) -> Result<reqwest::Response, FitLogError> {
        let (client, request) = request.build_split();
        let request = request?;
        metrics::counter!("fitlog_backend_requests_total", "method" => request.method().to_string())
            .increment(1);
        Ok(client.execute(request).await?)
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, FitLogError> {
        if !resp.status().is_success() {
            return Err(self.error_from_response(resp).await);
        }
        Ok(resp.json::<T>().await?)
    }

    async fn error_from_response(&self, resp: reqwest::Response) -> FitLogError {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        let body_snippet: String = body.chars().take(256).collect();
        metrics::counter!("fitlog_backend_errors_total", "status" => status.to_string())
            .increment(1);
        tracing::debug!(status, body = %body_snippet, "backend request failed");
        FitLogError::from_status(status, body_snippet)
    }

    /// `GET` rows from a table, retrying transient failures.
    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &Query<'_>,
    ) -> Result<Vec<T>, FitLogError> {
        let url = self.rest_url(table);
        self.retry
            .retry_async_when(
                || {
                    let request = self.get_request(&url).query(&[("select", "*")]).query(query);
                    self.execute_json::<Vec<T>>(request)
                },
                |e: &FitLogError| e.is_retryable(),
            )
            .await
    }

    async fn select_one<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &Query<'_>,
    ) -> Result<Option<T>, FitLogError> {
        let mut params = query.to_vec();
        params.push(("limit", "1".into()));
        Ok(self.select::<T>(table, &params).await?.into_iter().next())
    }

    /// Writes answering with `return=representation` yield an array of affected rows.
    fn first_row<T>(rows: Vec<T>, what: &str) -> Result<T, FitLogError> {
        rows.into_iter()
            .next()
            .ok_or_else(|| FitLogError::NotFound(format!("{what} returned no rows")))
    }
}

fn eq(v: &str) -> String {
    format!("eq.{v}")
}

#[async_trait]
impl FitnessBackend for ReqwestBackend {
    async fn get_daily_log(
        &self,
        user_id: &str,
        date: &str,
    ) -> Result<Option<DailyLog>, FitLogError> {
        self.select_one("daily_logs", &[("user_id", eq(user_id)), ("date", eq(date))])
            .await
    }

    async fn get_daily_logs(
        &self,
        user_id: &str,
        start: &str,
        end: &str,
    ) -> Result<Vec<DailyLog>, FitLogError> {
        self.select(
            "daily_logs",
            &[
                ("user_id", eq(user_id)),
                ("date", format!("gte.{start}")),
                ("date", format!("lte.{end}")),
                ("order", "date.desc".into()),
            ],
        )
        .await
    }

    async fn upsert_daily_log(
        &self,
        user_id: &str,
        date: &str,
        update: &DailyLogUpdate,
    ) -> Result<DailyLog, FitLogError> {
        let update = update.clone().normalized();
        update.validate()?;
        let mut body = serde_json::to_value(&update)?;
        let Value::Object(fields) = &mut body else {
            return Err(FitLogError::InvalidInput("daily log update must be an object".into()));
        };
        fields.insert("user_id".into(), json!(user_id));
        fields.insert("date".into(), json!(date));
        fields.insert("updated_at".into(), json!(Utc::now().to_rfc3339()));

        let request = self
            .post_request(&self.rest_url("daily_logs"))
            .query(&[("on_conflict", "user_id,date")])
            .header("Prefer", MERGE_REPRESENTATION)
            .json(&body);
        let rows: Vec<DailyLog> = self.execute_json(request).await?;
        tracing::debug!(user_id, date, "saved daily log");
        Self::first_row(rows, "daily log upsert")
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<UserProfile>, FitLogError> {
        self.select_one("users", &[("id", eq(user_id))]).await
    }

    async fn create_user(&self, user_id: &str, email: &str) -> Result<UserProfile, FitLogError> {
        let request = self
            .post_request(&self.rest_url("users"))
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&json!({ "id": user_id, "email": email }));
        let rows: Vec<UserProfile> = self.execute_json(request).await?;
        tracing::info!(user_id, "created user profile");
        Self::first_row(rows, "user insert")
    }

    async fn update_user(
        &self,
        user_id: &str,
        update: &UserUpdate,
    ) -> Result<UserProfile, FitLogError> {
        let request = self
            .patch_request(&self.rest_url("users"))
            .query(&[("id", eq(user_id))])
            .header("Prefer", RETURN_REPRESENTATION)
            .json(update);
        let rows: Vec<UserProfile> = self.execute_json(request).await?;
        Self::first_row(rows, "user update")
    }

    async fn list_users(&self) -> Result<Vec<UserProfile>, FitLogError> {
        self.select("users", &[]).await
    }

    async fn list_weekly_photos(&self, user_id: &str) -> Result<Vec<WeeklyPhoto>, FitLogError> {
        self.select(
            "weekly_photos",
            &[
                ("user_id", eq(user_id)),
                ("order", "week_start.desc,created_at.desc".into()),
            ],
        )
        .await
    }

    async fn photos_for_week(
        &self,
        user_id: &str,
        week_start: &str,
    ) -> Result<Vec<WeeklyPhoto>, FitLogError> {
        self.select(
            "weekly_photos",
            &[("user_id", eq(user_id)), ("week_start", eq(week_start))],
        )
        .await
    }

    async fn insert_weekly_photo(
        &self,
        user_id: &str,
        week_start: &str,
        image_path: &str,
    ) -> Result<WeeklyPhoto, FitLogError> {
        let request = self
            .post_request(&self.rest_url("weekly_photos"))
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&json!({
                "user_id": user_id,
                "week_start": week_start,
                "image_url": image_path,
            }));
        let rows: Vec<WeeklyPhoto> = self.execute_json(request).await?;
        Self::first_row(rows, "photo insert")
    }

    async fn delete_weekly_photo(
        &self,
        user_id: &str,
        photo_id: &str,
    ) -> Result<(), FitLogError> {
        let request = self
            .delete_request(&self.rest_url("weekly_photos"))
            .query(&[("id", eq(photo_id)), ("user_id", eq(user_id))]);
        self.execute_empty(request).await
    }

    async fn upload_object(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, FitLogError> {
        let url = self.storage_url(&format!("object/{}/{}", self.bucket, path));
        let request = self
            .post_request(&url)
            .header("Content-Type", content_type)
            .body(bytes);
        self.execute_empty(request).await?;
        metrics::counter!("fitlog_objects_uploaded_total").increment(1);
        Ok(path.to_string())
    }

    async fn create_signed_url(&self, path: &str, ttl_secs: u64) -> Result<String, FitLogError> {
        #[derive(serde::Deserialize)]
        struct SignedUrl {
            #[serde(rename = "signedURL")]
            signed_url: String,
        }

        let url = self.storage_url(&format!("object/sign/{}/{}", self.bucket, path));
        let request = self
            .post_request(&url)
            .json(&json!({ "expiresIn": ttl_secs }));
        let signed: SignedUrl = self.execute_json(request).await?;
        if signed.signed_url.starts_with("http://") || signed.signed_url.starts_with("https://") {
            return Ok(signed.signed_url);
        }
        Ok(self.storage_url(&signed.signed_url))
    }

    async fn remove_objects(&self, paths: &[String]) -> Result<(), FitLogError> {
        if paths.is_empty() {
            return Ok(());
        }
        let url = self.storage_url(&format!("object/{}", self.bucket));
        let request = self
            .delete_request(&url)
            .json(&json!({ "prefixes": paths }));
        self.execute_empty(request).await
    }

    async fn list_push_subscriptions(
        &self,
        user_id: &str,
    ) -> Result<Vec<PushSubscription>, FitLogError> {
        self.select("push_subscriptions", &[("user_id", eq(user_id))])
            .await
    }

    async fn save_push_subscription(
        &self,
        subscription: &PushSubscription,
    ) -> Result<(), FitLogError> {
        let request = self
            .post_request(&self.rest_url("push_subscriptions"))
            .query(&[("on_conflict", "endpoint")])
            .header("Prefer", MERGE_MINIMAL)
            .json(&json!({
                "user_id": subscription.user_id,
                "endpoint": subscription.endpoint,
                "p256dh": subscription.p256dh,
                "auth": subscription.auth,
            }));
        self.execute_empty(request).await
    }

    async fn delete_push_subscription(&self, subscription_id: &str) -> Result<(), FitLogError> {
        let request = self
            .delete_request(&self.rest_url("push_subscriptions"))
            .query(&[("id", eq(subscription_id))]);
        self.execute_empty(request).await
    }

    async fn reminder_sent_since(
        &self,
        user_id: &str,
        kind: ReminderKind,
        since: &str,
    ) -> Result<bool, FitLogError> {
        let found: Option<ReminderLogEntry> = self
            .select_one(
                "reminders_log",
                &[
                    ("user_id", eq(user_id)),
                    ("type", eq(kind.as_str())),
                    ("sent_at", format!("gte.{since}")),
                ],
            )
            .await?;
        Ok(found.is_some())
    }

    async fn log_reminder(&self, user_id: &str, kind: ReminderKind) -> Result<(), FitLogError> {
        let entry = ReminderLogEntry {
            user_id: user_id.to_string(),
            kind,
            sent_at: Some(Utc::now().to_rfc3339()),
        };
        let request = self
            .post_request(&self.rest_url("reminders_log"))
            .json(&entry);
        self.execute_empty(request).await
    }

    async fn search_foods(
        &self,
        term: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<Food>, FitLogError> {
        let mut query = vec![
            ("order", "name.asc".to_string()),
            ("limit", limit.unwrap_or(DEFAULT_FOOD_LIMIT).to_string()),
        ];
        if let Some(term) = term.map(str::trim).filter(|t| !t.is_empty()) {
            query.push(("name", format!("ilike.*{term}*")));
        }
        self.select("foods", &query).await
    }

    async fn add_food(&self, food: &Food) -> Result<Food, FitLogError> {
        if food.name.trim().is_empty() {
            return Err(FitLogError::InvalidInput("food name is required".into()));
        }
        let request = self
            .post_request(&self.rest_url("foods"))
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&json!({
                "name": food.name.trim(),
                "calories_per_unit": food.calories_per_unit,
                "protein_per_unit": food.protein_per_unit,
                "carbs_per_unit": food.carbs_per_unit,
                "unit": food.unit,
            }));
        let rows: Vec<Food> = self.execute_json(request).await?;
        Self::first_row(rows, "food insert")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> ReqwestBackend {
        ReqwestBackend::new(
            "https://abc.supabase.co/",
            SecretString::new("anon".into()),
            None,
            "progress-photos",
        )
        .expect("client")
    }

    #[test]
    fn urls_are_built_from_trimmed_base() {
        let b = backend();
        assert_eq!(b.rest_url("daily_logs"), "https://abc.supabase.co/rest/v1/daily_logs");
        assert_eq!(
            b.storage_url("/object/sign/progress-photos/u1/a.png?token=t"),
            "https://abc.supabase.co/storage/v1/object/sign/progress-photos/u1/a.png?token=t"
        );
    }

    #[test]
    fn first_row_reports_empty_writes() {
        let err = ReqwestBackend::first_row(Vec::<Food>::new(), "food insert").unwrap_err();
        assert!(matches!(err, FitLogError::NotFound(_)));
    }
}
