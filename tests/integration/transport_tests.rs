// Real HTTP page fetching and real notifier clients, both pointed at a mock server.

use super::*;
use job_scout::config::{ScraperConfig, ScraperEngine, DEFAULT_USER_AGENT};
use job_scout::plugins::{DiscordNotifier, TelegramNotifier};
use job_scout::scraper::HttpPageSource;
use job_scout::{RunOptions, RunOutcome};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_board(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/remote-jobs"))
        .respond_with(ResponseTemplate::new(200).set_body_string(board_html(&[
            "Senior Senior Engineer",
            "Featured Backend Engineer",
            "Designer",
        ])))
        .mount(server)
        .await;
}

fn board_source(server: &MockServer) -> SourceConfig {
    let mut source = SourceConfig::new("Mock Board", format!("{}/remote-jobs", server.uri()), "li.job");
    source.title_remove_patterns = vec![r"\bFeatured\b".to_string(), "(".to_string()];
    source
}

fn http_page_source() -> anyhow::Result<HttpPageSource> {
    Ok(HttpPageSource::new(&ScraperConfig {
        engine: ScraperEngine::Http,
        user_agent: DEFAULT_USER_AGENT.to_string(),
        chrome_path: None,
    })?)
}

async fn pipeline_with(
    server: &MockServer,
    notifier: Box<dyn NotifierPlugin>,
    channel: &str,
) -> anyhow::Result<(TempDir, Pipeline)> {
    let dir = tempfile::tempdir()?;
    let plugins = PluginManager::new();
    plugins.register_notifier(notifier).await?;

    let pipeline = Pipeline::new(
        Aggregator::new(Arc::new(http_page_source()?), FailurePolicy::Abort),
        &[board_source(server)],
        SeenStore::new(dir.path().join("seen.json")),
        plugins,
        channel,
    )?;
    Ok((dir, pipeline))
}

#[tokio::test]
async fn test_http_board_to_telegram() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_board(&server).await;
    Mock::given(method("POST"))
        .and(path("/bot123:ABC/sendMessage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": {"message_id": 555}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let telegram = TelegramNotifier::new("123:ABC", "-1001", server.uri())?;
    let (_dir, pipeline) = pipeline_with(&server, Box::new(telegram), "telegram").await?;

    let outcome = pipeline
        .run(RunOptions {
            include: "engineer".into(),
            ..RunOptions::default()
        })
        .await?;

    let RunOutcome::Delivered(_, records, receipt) = outcome else {
        panic!("expected a delivery");
    };
    let titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Senior Engineer", "Backend Engineer"]);
    assert_eq!(records[0].link, format!("{}/jobs/1", server.uri()));
    assert_eq!(receipt.message_id.as_deref(), Some("555"));

    let requests = server.received_requests().await.unwrap_or_default();
    let send = requests
        .iter()
        .find(|r| r.url.path().ends_with("/sendMessage"))
        .expect("sendMessage request");
    let body: Value = serde_json::from_slice(&send.body)?;
    assert_eq!(body["chat_id"], "-1001");
    assert_eq!(body["disable_web_page_preview"], true);
    assert!(body["text"].as_str().unwrap_or_default().contains("💼 Senior Engineer at Co 1"));
    Ok(())
}

#[tokio::test]
async fn test_discord_rejection_surfaces_as_delivery_error() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_board(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/webhooks/1/token"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "Unknown Webhook",
            "code": 10015
        })))
        .expect(1)
        .mount(&server)
        .await;

    let discord = DiscordNotifier::new(format!("{}/api/webhooks/1/token", server.uri()), "Job Scout");
    let (_dir, pipeline) = pipeline_with(&server, Box::new(discord), "discord").await?;

    let err = pipeline.run(RunOptions::default()).await.unwrap_err();

    assert!(matches!(err, AppError::Delivery { ref channel, .. } if channel == "discord"));
    // Links are folded into the seen state before delivery is attempted.
    assert_eq!(pipeline.seen_store().load().len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_http_board_down_is_source_unavailable() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let (_dir, pipeline) =
        pipeline_with(&server, Box::new(RecordingNotifier::default()), "telegram").await?;

    let err = pipeline.run(RunOptions::default()).await.unwrap_err();
    assert!(matches!(err, AppError::SourceUnavailable { .. }));
    assert!(err.to_string().contains("503"));
    Ok(())
}
