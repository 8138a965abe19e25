//! Рассылает результаты тестов из CI по всем каналам, заданным в окружении.
//!
//! Usage: `ci-notify [results.json]` (без аргумента читает stdin).

use anyhow::{bail, Context};
use std::io::Read;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ticket_booking::{
    config::NotificationConfig,
    services::{NotificationService, TestResults},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "ci_notify=info,ticket_booking=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let raw = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(&path).with_context(|| format!("failed to read {path}"))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read results from stdin")?;
            buf
        }
    };

    let mut results: TestResults = serde_json::from_str(&raw).context("results are not valid JSON")?;
    results.fill_from_ci(&|name: &str| std::env::var(name).ok());

    let config = NotificationConfig::from_env();
    let service = NotificationService::new()?;

    let report = service.dispatch(&config, &results).await;
    for delivered in &report.delivered {
        info!("{}", delivered.message);
    }
    for e in &report.failed {
        error!("Notification failed: {}", e);
    }

    if report.attempted() == 0 {
        bail!("no notification channel configured (SLACK_WEBHOOK_URL, EMAIL_WEBHOOK_URL + NOTIFY_EMAIL, WEBHOOK_URL)");
    }
    if !report.is_success() {
        bail!("{} notification(s) failed", report.failed.len());
    }
    Ok(())
}
