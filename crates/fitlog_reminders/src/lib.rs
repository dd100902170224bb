//! Scheduled reminder jobs for FitLog users.
//!
//! [`ReminderService`] visits every user, decides what to send with the pure
//! builders in [`jobs`], delivers Web Push notifications and records each
//! reminder so reruns within the same period are skipped.

use std::sync::Arc;

use chrono::NaiveDate;
use fitlog_client::config::{Config, VapidConfig};
use fitlog_client::dates::{month_bounds, previous_week, to_date_key, week_start_key};
use fitlog_client::http_client::ReqwestBackend;
use fitlog_client::insights::PeriodTotals;
use fitlog_client::push::{NotificationPayload, PushDelivery, PushTransport, WebPushSender};
use fitlog_client::{FitnessBackend, UserProfile};
use tracing::{debug, info, warn};

pub mod error;
pub mod http;
pub mod jobs;
pub mod state;
mod test_utils;

pub use error::{ReminderError, ReminderResult};
pub use jobs::ReminderJob;
pub use state::JobReport;
use jobs::monthly::MonthlyReport;
use state::UserOutcome;

#[derive(Clone)]
pub struct ReminderService {
    backend: Arc<dyn FitnessBackend>,
    push: Option<Arc<dyn PushTransport>>,
}

impl ReminderService {
    /// `push = None` disables delivery; reminders are still recorded.
    pub fn new(backend: Arc<dyn FitnessBackend>, push: Option<Arc<dyn PushTransport>>) -> Self {
        Self { backend, push }
    }

    /// Wire the REST backend and, when VAPID keys are configured, Web Push from the environment.
    pub fn from_env() -> ReminderResult<Self> {
        let config = Config::from_env()?;
        let backend = ReqwestBackend::from_config(&config)?;
        let push: Option<Arc<dyn PushTransport>> = match VapidConfig::from_env()? {
            Some(vapid) => Some(Arc::new(WebPushSender::new(&vapid)?)),
            None => {
                warn!("VAPID keys not configured; push notifications disabled");
                None
            }
        };
        Ok(Self::new(Arc::new(backend), push))
    }

    /// Run `job` for every user as of `today`.
    ///
    /// Failing to list users aborts the run. A failure for one user is logged,
    /// counted in the report and does not stop the others.
    pub async fn run(&self, job: ReminderJob, today: NaiveDate) -> ReminderResult<JobReport> {
        let users = self.backend.list_users().await?;
        let mut report = JobReport::new(job, users.len());
        info!(%job, users = users.len(), %today, "starting reminder job");

        for user in &users {
            match self.process_user(job, user, today).await {
                Ok(UserOutcome::Notified) => report.notified += 1,
                Ok(UserOutcome::Skipped) => report.skipped += 1,
                Err(e) => {
                    warn!(%job, user_id = %user.id, error = %e, "reminder failed for user");
                    report.failed += 1;
                }
            }
        }

        metrics::counter!("fitlog_job_runs_total", "job" => job.as_str()).increment(1);
        metrics::counter!("fitlog_job_user_failures_total", "job" => job.as_str())
            .increment(report.failed as u64);
        info!(
            %job,
            notified = report.notified,
            skipped = report.skipped,
            failed = report.failed,
            "reminder job finished"
        );
        Ok(report)
    }

    async fn process_user(
        &self,
        job: ReminderJob,
        user: &UserProfile,
        today: NaiveDate,
    ) -> ReminderResult<UserOutcome> {
        let payload = match job {
            ReminderJob::Morning => {
                let log = self.backend.get_daily_log(&user.id, &to_date_key(today)).await?;
                jobs::morning::notification(user, log.as_ref())
            }
            ReminderJob::Evening => {
                let log = self.backend.get_daily_log(&user.id, &to_date_key(today)).await?;
                jobs::evening::notification(user, log.as_ref())
            }
            ReminderJob::Weekly => {
                let current_week = week_start_key(today);
                if self
                    .backend
                    .reminder_sent_since(&user.id, job.kind(), &current_week)
                    .await?
                {
                    return Ok(UserOutcome::Skipped);
                }
                let (start, end) = previous_week(today);
                let logs = self
                    .backend
                    .get_daily_logs(&user.id, &to_date_key(start), &to_date_key(end))
                    .await?;
                let totals = PeriodTotals::from_logs(&logs);
                debug!(user_id = %user.id, workouts = totals.workouts, avg_steps = totals.avg_steps, "last week");
                let photos = self.backend.photos_for_week(&user.id, &current_week).await?;
                Some(jobs::weekly::notification(photos.len()))
            }
            ReminderJob::Monthly => {
                let (first, last) = month_bounds(today);
                if self
                    .backend
                    .reminder_sent_since(&user.id, job.kind(), &to_date_key(first))
                    .await?
                {
                    return Ok(UserOutcome::Skipped);
                }
                let logs = self
                    .backend
                    .get_daily_logs(&user.id, &to_date_key(first), &to_date_key(last))
                    .await?;
                let report = MonthlyReport::from_logs(today, &logs);
                // no email transport; the report goes to the log
                info!(user_id = %user.id, report = %report.render(user), "monthly report");
                self.backend.log_reminder(&user.id, job.kind()).await?;
                return Ok(UserOutcome::Notified);
            }
        };

        let Some(payload) = payload else {
            return Ok(UserOutcome::Skipped);
        };
        let delivered = self.notify_user(user, &payload).await?;
        debug!(user_id = %user.id, delivered, "notified user");
        self.backend.log_reminder(&user.id, job.kind()).await?;
        Ok(UserOutcome::Notified)
    }

    /// Push `payload` to every subscription of the user and return how many accepted it.
    ///
    /// Subscriptions the push service reports as gone are deleted.
    pub async fn notify_user(
        &self,
        user: &UserProfile,
        payload: &NotificationPayload,
    ) -> ReminderResult<usize> {
        let Some(push) = &self.push else {
            debug!(user_id = %user.id, "push disabled; skipping delivery");
            return Ok(0);
        };
        let subscriptions = self.backend.list_push_subscriptions(&user.id).await?;
        let mut delivered = 0;
        for sub in &subscriptions {
            match push.send(sub, payload).await {
                Ok(PushDelivery::Delivered) => delivered += 1,
                Ok(PushDelivery::Gone) => {
                    let Some(id) = sub.id.as_deref() else {
                        continue;
                    };
                    match self.backend.delete_push_subscription(id).await {
                        Ok(()) => info!(user_id = %user.id, subscription_id = id, "removed expired subscription"),
                        Err(e) => warn!(subscription_id = id, error = %e, "failed to remove expired subscription"),
                    }
                }
                Err(e) => warn!(user_id = %user.id, error = %e, "push delivery failed"),
            }
        }
        Ok(delivered)
    }
}

/// Log filter from `FITLOG_LOG_LEVEL`, then `RUST_LOG`, defaulting to `info`.
pub fn log_filter() -> String {
    std::env::var("FITLOG_LOG_LEVEL")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{InMemoryBackend, RecordingPush};
    use fitlog_client::{DailyLog, ReminderKind};

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn service(backend: Arc<InMemoryBackend>, push: Arc<RecordingPush>) -> ReminderService {
        ReminderService::new(backend, Some(push))
    }

    #[tokio::test]
    async fn morning_reminds_only_users_without_a_log() {
        let backend = Arc::new(
            InMemoryBackend::new("2026-03-04")
                .with_user("u1", "Ana")
                .with_user("u2", "Ben")
                .with_log(DailyLog {
                    user_id: "u2".into(),
                    date: "2026-03-04".into(),
                    ..Default::default()
                })
                .with_subscription("s1", "u1", "https://push.example/a"),
        );
        let push = Arc::new(RecordingPush::default());
        let report = service(backend.clone(), push.clone())
            .run(ReminderJob::Morning, day("2026-03-04"))
            .await
            .unwrap();

        assert_eq!(report.count, 2);
        assert_eq!(report.notified, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(push.titles(), vec![jobs::morning::TITLE.to_string()]);
        assert_eq!(backend.reminders_for("u1"), vec![ReminderKind::Daily]);
        assert!(backend.reminders_for("u2").is_empty());
    }

    #[tokio::test]
    async fn gone_subscriptions_are_deleted() {
        let backend = Arc::new(
            InMemoryBackend::new("2026-03-04")
                .with_user("u1", "Ana")
                .with_subscription("s1", "u1", "https://push.example/old")
                .with_subscription("s2", "u1", "https://push.example/new"),
        );
        let push = Arc::new(RecordingPush::default().with_gone("https://push.example/old"));
        service(backend.clone(), push.clone())
            .run(ReminderJob::Evening, day("2026-03-04"))
            .await
            .unwrap();

        assert_eq!(backend.subscription_ids(), vec!["s2".to_string()]);
        assert_eq!(push.titles().len(), 2);
    }

    #[tokio::test]
    async fn delivery_errors_do_not_fail_the_user() {
        let backend = Arc::new(
            InMemoryBackend::new("2026-03-04")
                .with_user("u1", "Ana")
                .with_subscription("s1", "u1", "https://push.example/down"),
        );
        let push = Arc::new(RecordingPush::default().with_failing("https://push.example/down"));
        let report = service(backend.clone(), push)
            .run(ReminderJob::Evening, day("2026-03-04"))
            .await
            .unwrap();
        assert_eq!(report.notified, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(backend.subscription_ids(), vec!["s1".to_string()]);
    }

    #[tokio::test]
    async fn backend_failure_for_one_user_does_not_stop_the_run() {
        let backend = Arc::new(
            InMemoryBackend::new("2026-03-04")
                .with_user("u1", "Ana")
                .with_user("u2", "Ben")
                .failing_for("u1"),
        );
        let report = service(backend.clone(), Arc::new(RecordingPush::default()))
            .run(ReminderJob::Morning, day("2026-03-04"))
            .await
            .unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.notified, 1);
        assert_eq!(backend.reminders_for("u2"), vec![ReminderKind::Daily]);
    }

    #[tokio::test]
    async fn weekly_skips_users_already_reminded_this_week() {
        // Thursday; the week began on Monday 2026-03-02.
        let backend = Arc::new(
            InMemoryBackend::new("2026-03-05")
                .with_user("u1", "Ana")
                .with_user("u2", "Ben")
                .with_reminder("u1", ReminderKind::Weekly, "2026-03-02")
                .with_reminder("u2", ReminderKind::Weekly, "2026-02-27")
                .with_photo("u2", "2026-03-02")
                .with_subscription("s2", "u2", "https://push.example/b"),
        );
        let push = Arc::new(RecordingPush::default());
        let report = service(backend.clone(), push.clone())
            .run(ReminderJob::Weekly, day("2026-03-05"))
            .await
            .unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.notified, 1);
        assert_eq!(push.titles(), vec!["Weekly Check-in ✅".to_string()]);
    }

    #[tokio::test]
    async fn monthly_records_report_without_push_and_runs_once() {
        let backend = Arc::new(
            InMemoryBackend::new("2026-03-31")
                .with_user("u1", "Ana")
                .with_subscription("s1", "u1", "https://push.example/a"),
        );
        let push = Arc::new(RecordingPush::default());
        let svc = service(backend.clone(), push.clone());

        let first = svc.run(ReminderJob::Monthly, day("2026-03-31")).await.unwrap();
        assert_eq!(first.notified, 1);
        let second = svc.run(ReminderJob::Monthly, day("2026-03-31")).await.unwrap();
        assert_eq!(second.skipped, 1);
        assert!(push.titles().is_empty());
        assert_eq!(backend.reminders_for("u1"), vec![ReminderKind::Monthly]);
    }

    #[tokio::test]
    async fn disabled_push_still_records_reminders() {
        let backend = Arc::new(
            InMemoryBackend::new("2026-03-04")
                .with_user("u1", "Ana")
                .with_subscription("s1", "u1", "https://push.example/a"),
        );
        let report = ReminderService::new(backend.clone(), None)
            .run(ReminderJob::Morning, day("2026-03-04"))
            .await
            .unwrap();
        assert_eq!(report.notified, 1);
        assert_eq!(backend.reminders_for("u1"), vec![ReminderKind::Daily]);
    }
}
