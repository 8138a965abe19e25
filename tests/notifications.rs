//! Webhook senders against a local mock HTTP server.

use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use std::time::Duration;

use ticket_booking::config::NotificationConfig;
use ticket_booking::services::notifications::Channel;
use ticket_booking::services::{NotificationError, NotificationService, TestResults};

fn passing_run() -> TestResults {
    TestResults {
        passed: 42,
        failed: 0,
        total: 42,
        coverage: Some(91.2),
        branch: Some("main".into()),
        commit_hash: Some("0123456789abcdef".into()),
    }
}

fn failing_run() -> TestResults {
    TestResults { passed: 40, failed: 2, ..passing_run() }
}

#[tokio::test]
async fn slack_notification_is_posted_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/services/T000/B000/XXX"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let service = NotificationService::new().unwrap();
    let url = format!("{}/services/T000/B000/XXX", server.uri());
    let delivered = service.send_slack(&url, &passing_run()).await.unwrap();

    assert_eq!(delivered.channel, Channel::Slack);
    assert_eq!(delivered.message, "Slack notification sent");

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let attachment = &body["attachments"][0];
    assert_eq!(attachment["color"], "36a64f");
    assert_eq!(attachment["title"], "Test Results - SUCCESS");
    assert_eq!(attachment["fields"][5]["value"], "0123456");
}

#[tokio::test]
async fn slack_rejects_non_200_success_codes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;

    let service = NotificationService::new().unwrap();
    let err = service.send_slack(&server.uri(), &passing_run()).await.unwrap_err();

    assert!(matches!(err, NotificationError::SlackStatus(201)));
    assert_eq!(err.to_string(), "Slack API returned 201");
}

#[tokio::test]
async fn email_notification_accepts_any_2xx() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/send"))
        .and(body_partial_json(json!({
            "to": "qa@example.com",
            "subject": "[CI] Test Results - FAILED"
        })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let service = NotificationService::new().unwrap();
    let url = format!("{}/send?token=abc", server.uri());
    let delivered = service
        .send_email(&url, &failing_run(), "qa@example.com")
        .await
        .unwrap();

    assert_eq!(delivered.message, "Email notification sent");
}

#[tokio::test]
async fn generic_webhook_carries_results() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hooks/ci"))
        .and(body_partial_json(json!({
            "event": "test_completed",
            "results": { "passed": 40, "failed": 2, "total": 42, "commitHash": "0123456789abcdef" }
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let service = NotificationService::new().unwrap();
    let url = format!("{}/hooks/ci", server.uri());
    let delivered = service.send_webhook(&url, &failing_run()).await.unwrap();

    assert_eq!(delivered.message, "Webhook notification sent");
}

#[tokio::test]
async fn webhook_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let service = NotificationService::new().unwrap();
    let err = service.send_webhook(&server.uri(), &passing_run()).await.unwrap_err();
    assert_eq!(err.to_string(), "Webhook returned 500");
}

#[tokio::test]
async fn missing_urls_fail_without_a_request() {
    let service = NotificationService::new().unwrap();
    let results = passing_run();

    let err = service.send_slack("", &results).await.unwrap_err();
    assert_eq!(err.to_string(), "Slack webhook URL not provided");

    let err = service.send_email("", &results, "qa@example.com").await.unwrap_err();
    assert_eq!(err.to_string(), "Email webhook URL not provided");

    let err = service.send_webhook("  ", &results).await.unwrap_err();
    assert_eq!(err.to_string(), "Webhook URL not provided");
}

#[tokio::test]
async fn unparsable_url_is_rejected() {
    let service = NotificationService::new().unwrap();
    let err = service.send_webhook("not a url", &passing_run()).await.unwrap_err();
    assert!(matches!(err, NotificationError::InvalidUrl { channel: Channel::Webhook, .. }));
}

fn short_timeout_service() -> NotificationService {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();
    NotificationService::with_client(client)
}

async fn accepting_server(status: u16) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(status))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn dispatch_reaches_every_configured_channel() {
    let slack = accepting_server(200).await;
    let email = accepting_server(202).await;
    let hook = accepting_server(204).await;

    let config = NotificationConfig {
        slack_webhook_url: Some(slack.uri()),
        email_webhook_url: Some(email.uri()),
        email_recipient: Some("qa@example.com".into()),
        webhook_url: Some(hook.uri()),
    };
    let report = short_timeout_service().dispatch(&config, &passing_run()).await;

    assert_eq!(report.attempted(), 3);
    assert!(report.is_success());
    assert!(report.skipped.is_empty());
    let mut channels: Vec<String> = report.delivered.iter().map(|d| d.channel.to_string()).collect();
    channels.sort();
    assert_eq!(channels, ["Email", "Slack", "Webhook"]);

    for server in [&slack, &email, &hook] {
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }
}

#[tokio::test]
async fn dispatch_reports_a_failing_channel() {
    let slack = accepting_server(200).await;
    let hook = accepting_server(503).await;

    let config = NotificationConfig {
        slack_webhook_url: Some(slack.uri()),
        webhook_url: Some(hook.uri()),
        ..NotificationConfig::default()
    };
    let report = short_timeout_service().dispatch(&config, &failing_run()).await;

    assert_eq!(report.attempted(), 2);
    assert!(!report.is_success());
    assert_eq!(report.delivered.len(), 1);
    assert_eq!(report.delivered[0].channel, Channel::Slack);
    assert!(matches!(report.failed[0], NotificationError::WebhookStatus(503)));
}

#[tokio::test]
async fn dispatch_without_channels_attempts_nothing() {
    let report = short_timeout_service()
        .dispatch(&NotificationConfig::default(), &passing_run())
        .await;

    assert_eq!(report.attempted(), 0);
    assert!(!report.is_success());
}

#[tokio::test]
async fn dispatch_skips_email_without_recipient() {
    let email = accepting_server(200).await;

    let config = NotificationConfig {
        email_webhook_url: Some(email.uri()),
        ..NotificationConfig::default()
    };
    let report = short_timeout_service().dispatch(&config, &passing_run()).await;

    assert_eq!(report.attempted(), 0);
    assert_eq!(report.skipped, vec![Channel::Email]);
    assert!(email.received_requests().await.unwrap().is_empty());
}
