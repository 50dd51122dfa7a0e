use super::*;
use axum::http::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn test_health_check() -> anyhow::Result<()> {
    let test = create_test_pipeline(FixturePageSource::boards(), FailurePolicy::Abort).await?;
    let app = create_test_router(&test);

    let (status, body) = get(&app, "/health").await?;
    let json: Value = serde_json::from_str(&body)?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["sources"], 3);
    assert_eq!(json["channel"], "telegram");
    Ok(())
}

#[tokio::test]
async fn test_run_sends_then_reports_nothing_new() -> anyhow::Result<()> {
    let test = create_test_pipeline(FixturePageSource::boards(), FailurePolicy::Abort).await?;
    let app = create_test_router(&test);

    let (status, body) = get(&app, "/api/run?include=Engineer").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Message sent via telegram.");
    assert_eq!(test.notifier.sent().len(), 1);

    let (status, body) = get(&app, "/api/run?include=Engineer").await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "No new items found.");

    let (_, body) = get(&app, "/api/run?include=Engineer&reset=1").await?;
    assert_eq!(body, "Message sent via telegram.");
    assert_eq!(test.notifier.sent().len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_test_mode_returns_json_sample() -> anyhow::Result<()> {
    let test = create_test_pipeline(FixturePageSource::boards(), FailurePolicy::Abort).await?;
    let app = create_test_router(&test);

    let (status, body) = get(&app, "/api/run?include=engineer&test=1").await?;
    let json: Value = serde_json::from_str(&body)?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["totalScraped"], 12);
    assert_eq!(json["totalFiltered"], 6);
    assert_eq!(json["totalAfterDedupe"], 6);
    assert_eq!(json["countsBySource"]["Alpha"], 4);
    assert_eq!(json["sample"].as_array().map(Vec::len), Some(6));
    assert_eq!(json["sample"][0]["title"], "Rust Engineer");
    assert!(test.notifier.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_debug_no_items_returns_diagnostics() -> anyhow::Result<()> {
    let test = create_test_pipeline(FixturePageSource::boards(), FailurePolicy::Abort).await?;
    let app = create_test_router(&test);

    let (status, body) = get(&app, "/api/run?include=astronaut&debug=true").await?;
    let json: Value = serde_json::from_str(&body)?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["message"], "No new items found.");
    assert_eq!(json["totalFiltered"], 0);
    assert_eq!(json["sampleLinks"].as_array().map(Vec::len), Some(5));
    Ok(())
}

#[tokio::test]
async fn test_dedupe_disabled_by_query() -> anyhow::Result<()> {
    let test = create_test_pipeline(FixturePageSource::boards(), FailurePolicy::Abort).await?;
    let app = create_test_router(&test);

    get(&app, "/api/run?include=engineer&dedupe=0").await?;
    let (_, body) = get(&app, "/api/run?include=engineer&dedupe=0").await?;

    assert_eq!(body, "Message sent via telegram.");
    assert!(test.seen_links().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_invalid_parameters_are_rejected() -> anyhow::Result<()> {
    let test = create_test_pipeline(FixturePageSource::boards(), FailurePolicy::Abort).await?;
    let app = create_test_router(&test);

    let (status, body) = get(&app, "/api/run?max=ten").await?;
    let json: Value = serde_json::from_str(&body)?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"]["code"], "BAD_REQUEST");

    let (status, _) = get(&app, "/api/run?debug=sometimes").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(test.notifier.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_unavailable_source_is_bad_gateway() -> anyhow::Result<()> {
    let test = create_test_pipeline(
        FixturePageSource::boards().without("Gamma"),
        FailurePolicy::Abort,
    )
    .await?;
    let app = create_test_router(&test);

    let (status, body) = get(&app, "/api/run").await?;
    let json: Value = serde_json::from_str(&body)?;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["error"]["code"], "SOURCE_UNAVAILABLE");
    assert!(json["error"]["message"].as_str().unwrap_or_default().contains("Gamma"));
    Ok(())
}
