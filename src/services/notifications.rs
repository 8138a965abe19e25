//! notifications.rs
//!
//! Отправка результатов прогона тестов из CI во внешние системы.
//!
//! Три канала, у каждого свой формат тела:
//! 1.  **Slack**: incoming webhook с attachment-ом и короткими полями.
//! 2.  **Email**: JSON для почтового шлюза (`to`, `subject`, `body`).
//! 3.  **Webhook**: универсальное событие `test_completed` с результатами как есть.
//!
//! Каждый вызов делает ровно один POST. Повторов и backoff нет.

use chrono::{SecondsFormat, Utc};
use futures::future::{join_all, BoxFuture, FutureExt};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::NotificationConfig;

const SLACK_TITLE_LINK: &str = "https://github.com";
const COLOR_SUCCESS: &str = "36a64f";
const COLOR_FAILURE: &str = "ff0000";

/// Итоги прогона тестов в том виде, в каком их отдаёт CI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResults {
    pub passed: u64,
    pub failed: u64,
    pub total: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_hash: Option<String>,
}

impl TestResults {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Недостающие ветку и коммит берём из окружения GitHub Actions.
    pub fn fill_from_ci(&mut self, lookup: &dyn Fn(&str) -> Option<String>) {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());
        if self.branch.is_none() {
            self.branch = var("GITHUB_REF_NAME");
        }
        if self.commit_hash.is_none() {
            self.commit_hash = var("GITHUB_SHA");
        }
    }

    // Нулевое покрытие показываем как N/A
    fn coverage_label(&self) -> Option<String> {
        self.coverage.filter(|c| *c != 0.0).map(|c| c.to_string())
    }

    fn branch_label(&self) -> &str {
        self.branch.as_deref().filter(|b| !b.is_empty()).unwrap_or("unknown")
    }

    fn short_commit(&self) -> String {
        match self.commit_hash.as_deref().filter(|c| !c.is_empty()) {
            Some(hash) => hash.chars().take(7).collect(),
            None => "unknown".to_string(),
        }
    }
}

/// Канал доставки, нужен для логов и текстов ошибок.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Slack,
    Email,
    Webhook,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Slack => write!(f, "Slack"),
            Channel::Email => write!(f, "Email"),
            Channel::Webhook => write!(f, "Webhook"),
        }
    }
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Slack webhook URL not provided")]
    MissingSlackUrl,
    #[error("Email webhook URL not provided")]
    MissingEmailUrl,
    #[error("Webhook URL not provided")]
    MissingWebhookUrl,
    #[error("Invalid {channel} URL {url:?}: {reason}")]
    InvalidUrl {
        channel: Channel,
        url: String,
        reason: String,
    },
    #[error("{channel} request failed: {source}")]
    Transport {
        channel: Channel,
        #[source]
        source: reqwest::Error,
    },
    #[error("Slack API returned {0}")]
    SlackStatus(u16),
    #[error("Webhook returned {0}")]
    WebhookStatus(u16),
}

/// Положительный исход отправки.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivered {
    pub channel: Channel,
    pub message: &'static str,
}

/// Итог рассылки по всем каналам.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub delivered: Vec<Delivered>,
    pub failed: Vec<NotificationError>,
    pub skipped: Vec<Channel>,
}

impl DispatchReport {
    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.failed.len()
    }

    /// Хотя бы один канал отработал и ни один не упал.
    pub fn is_success(&self) -> bool {
        self.attempted() > 0 && self.failed.is_empty()
    }
}

/// HTTP-клиент для отправки уведомлений о тестах.
#[derive(Clone)]
pub struct NotificationService {
    http_client: reqwest::Client,
}

impl NotificationService {
    pub fn new() -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { http_client })
    }

    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    /// Шлёт результаты во все настроенные каналы одновременно.
    ///
    /// Email без `email_recipient` пропускается и попадает в `skipped`.
    pub async fn dispatch(&self, config: &NotificationConfig, results: &TestResults) -> DispatchReport {
        let mut report = DispatchReport::default();
        let mut sends: Vec<BoxFuture<'_, Result<Delivered, NotificationError>>> = Vec::new();

        if let Some(url) = config.slack_webhook_url.as_deref() {
            sends.push(self.send_slack(url, results).boxed());
        }
        if let Some(url) = config.email_webhook_url.as_deref() {
            match config.email_recipient.as_deref() {
                Some(recipient) => sends.push(self.send_email(url, results, recipient).boxed()),
                None => {
                    warn!("EMAIL_WEBHOOK_URL is set but NOTIFY_EMAIL is not, skipping email");
                    report.skipped.push(Channel::Email);
                }
            }
        }
        if let Some(url) = config.webhook_url.as_deref() {
            sends.push(self.send_webhook(url, results).boxed());
        }

        for outcome in join_all(sends).await {
            match outcome {
                Ok(delivered) => report.delivered.push(delivered),
                Err(e) => report.failed.push(e),
            }
        }
        report
    }

    /// Slack принимает только 200.
    pub async fn send_slack(
        &self,
        webhook_url: &str,
        results: &TestResults,
    ) -> Result<Delivered, NotificationError> {
        if webhook_url.trim().is_empty() {
            return Err(NotificationError::MissingSlackUrl);
        }

        let payload = slack_payload(results, Utc::now().timestamp());
        let status = self.post(Channel::Slack, webhook_url, &payload).await?;
        if status != StatusCode::OK {
            return Err(NotificationError::SlackStatus(status.as_u16()));
        }

        Ok(Delivered { channel: Channel::Slack, message: "Slack notification sent" })
    }

    pub async fn send_email(
        &self,
        webhook_url: &str,
        results: &TestResults,
        recipient: &str,
    ) -> Result<Delivered, NotificationError> {
        if webhook_url.trim().is_empty() {
            return Err(NotificationError::MissingEmailUrl);
        }

        let payload = email_payload(results, recipient);
        let status = self.post(Channel::Email, webhook_url, &payload).await?;
        if !status.is_success() {
            return Err(NotificationError::WebhookStatus(status.as_u16()));
        }

        Ok(Delivered { channel: Channel::Email, message: "Email notification sent" })
    }

    pub async fn send_webhook(
        &self,
        webhook_url: &str,
        results: &TestResults,
    ) -> Result<Delivered, NotificationError> {
        if webhook_url.trim().is_empty() {
            return Err(NotificationError::MissingWebhookUrl);
        }

        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let payload = webhook_payload(results, &timestamp);
        let status = self.post(Channel::Webhook, webhook_url, &payload).await?;
        if !status.is_success() {
            return Err(NotificationError::WebhookStatus(status.as_u16()));
        }

        Ok(Delivered { channel: Channel::Webhook, message: "Webhook notification sent" })
    }

    async fn post(
        &self,
        channel: Channel,
        webhook_url: &str,
        payload: &Value,
    ) -> Result<StatusCode, NotificationError> {
        let url = Url::parse(webhook_url).map_err(|e| NotificationError::InvalidUrl {
            channel,
            url: webhook_url.to_string(),
            reason: e.to_string(),
        })?;

        info!("Sending {} notification to {}", channel, url.host_str().unwrap_or_default());

        let response = self
            .http_client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|source| NotificationError::Transport { channel, source })?;

        let status = response.status();
        if !status.is_success() {
            warn!("{} endpoint answered {}", channel, status);
        }
        Ok(status)
    }
}

pub fn slack_payload(results: &TestResults, ts: i64) -> Value {
    let (status, color) = if results.is_success() {
        ("SUCCESS", COLOR_SUCCESS)
    } else {
        ("FAILURE", COLOR_FAILURE)
    };
    let coverage = results
        .coverage_label()
        .map(|c| format!("{c}%"))
        .unwrap_or_else(|| "N/A".to_string());

    let field = |title: &str, value: String| json!({ "title": title, "value": value, "short": true });

    json!({
        "attachments": [{
            "fallback": format!("Test Results: {status}"),
            "color": color,
            "title": format!("Test Results - {status}"),
            "title_link": SLACK_TITLE_LINK,
            "fields": [
                field("Total Tests", results.total.to_string()),
                field("Passed", results.passed.to_string()),
                field("Failed", results.failed.to_string()),
                field("Coverage", coverage),
                field("Branch", results.branch_label().to_string()),
                field("Commit", results.short_commit()),
            ],
            "ts": ts,
        }]
    })
}

pub fn email_payload(results: &TestResults, recipient: &str) -> Value {
    let status = if results.is_success() { "PASSED" } else { "FAILED" };
    let coverage = results
        .coverage_label()
        .map(|c| format!("{c}%"))
        .unwrap_or_else(|| "N/A".to_string());
    let verdict = if results.failed > 0 {
        "Please check the CI logs for details."
    } else {
        "All tests passed!"
    };

    let body = format!(
        "Test Execution Summary\n\
         ======================\n\
         \n\
         Status: {status}\n\
         Total Tests: {total}\n\
         Passed: {passed}\n\
         Failed: {failed}\n\
         Code Coverage: {coverage}\n\
         Branch: {branch}\n\
         \n\
         {verdict}\n\
         \n\
         --\n\
         Automated CI Notification",
        total = results.total,
        passed = results.passed,
        failed = results.failed,
        branch = results.branch_label(),
    );

    json!({
        "to": recipient,
        "subject": format!("[CI] Test Results - {status}"),
        "body": body,
    })
}

pub fn webhook_payload(results: &TestResults, timestamp: &str) -> Value {
    json!({
        "event": "test_completed",
        "timestamp": timestamp,
        "results": results,
    })
}
