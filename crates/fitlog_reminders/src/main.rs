use fitlog_client::dates::today_local;
use fitlog_reminders::{ReminderJob, ReminderService, log_filter};

/// Run one reminder job and print its report as JSON, e.g. from cron.
#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let log_env = log_filter();
    let env_filter = tracing_subscriber::EnvFilter::try_new(&log_env)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(env_filter)
        .init();
    tracing::debug!(%log_env, "fitlog-reminders: log filter");

    let Some(arg) = std::env::args().nth(1) else {
        anyhow::bail!("usage: fitlog-reminders <morning|evening|weekly|monthly>");
    };
    let job: ReminderJob = arg.parse()?;

    let service = ReminderService::from_env()?;
    let report = service.run(job, today_local()).await?;
    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}
