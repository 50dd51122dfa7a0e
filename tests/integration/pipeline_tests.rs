use super::*;
use job_scout::{RunOptions, RunOutcome};

fn engineers() -> RunOptions {
    RunOptions {
        include: "engineer".to_string(),
        max: Some(10),
        ..RunOptions::default()
    }
}

#[tokio::test]
async fn test_filtered_run_delivers_and_persists_matches() -> anyhow::Result<()> {
    let test = create_test_pipeline(FixturePageSource::boards(), FailurePolicy::Abort).await?;

    let outcome = test.pipeline.run(engineers()).await?;
    let RunOutcome::Delivered(report, records, receipt) = outcome else {
        panic!("expected a delivery");
    };

    assert_eq!(report.total_scraped, 12);
    assert_eq!(report.total_filtered, 6);
    assert_eq!(report.total_after_dedupe, 6);
    assert_eq!(report.counts_by_source.get("Beta"), Some(&4));
    assert_eq!(records.len(), 6);
    assert!(records.iter().all(|r| r.title.contains("Engineer")));
    assert_eq!(receipt.channel, "telegram");

    // Output keeps source order; titles are cut at the bullet.
    assert_eq!(records[0].title, "Rust Engineer");
    assert_eq!(records[0].link, "https://alpha.example.com/jobs/1");
    assert_eq!(records[0].company.as_deref(), Some("Co 1"));
    assert_eq!(records[5].source, "Gamma");

    let mut persisted = test.seen_links();
    persisted.sort();
    let mut delivered: Vec<String> = records.iter().map(|r| r.link.clone()).collect();
    delivered.sort();
    assert_eq!(persisted, delivered);

    let sent = test.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].matches("💼").count(), 6);
    assert!(sent[0].starts_with("💼 Rust Engineer at Co 1\n🔗 https://alpha.example.com/jobs/1\n\n"));
    Ok(())
}

#[tokio::test]
async fn test_second_run_finds_nothing_new() -> anyhow::Result<()> {
    let test = create_test_pipeline(FixturePageSource::boards(), FailurePolicy::Abort).await?;

    test.pipeline.run(engineers()).await?;
    let outcome = test.pipeline.run(engineers()).await?;

    assert!(matches!(outcome, RunOutcome::NoNewItems(_)));
    assert_eq!(outcome.report().total_filtered, 6);
    assert_eq!(outcome.report().total_after_dedupe, 0);
    assert_eq!(test.notifier.sent().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_reset_makes_seen_links_new_again() -> anyhow::Result<()> {
    let test = create_test_pipeline(FixturePageSource::boards(), FailurePolicy::Abort).await?;

    test.pipeline.run(engineers()).await?;
    let outcome = test
        .pipeline
        .run(RunOptions {
            reset: true,
            ..engineers()
        })
        .await?;

    let RunOutcome::Delivered(_, records, _) = outcome else {
        panic!("expected a delivery after reset");
    };
    assert_eq!(records.len(), 6);
    assert_eq!(test.notifier.sent().len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_max_caps_delivery_but_all_new_links_are_marked_seen() -> anyhow::Result<()> {
    let test = create_test_pipeline(FixturePageSource::boards(), FailurePolicy::Abort).await?;

    let outcome = test
        .pipeline
        .run(RunOptions {
            max: Some(2),
            ..engineers()
        })
        .await?;

    let RunOutcome::Delivered(_, records, _) = outcome else {
        panic!("expected a delivery");
    };
    assert_eq!(records.len(), 2);
    assert_eq!(test.seen_links().len(), 6);
    Ok(())
}

#[tokio::test]
async fn test_test_mode_leaves_state_and_sink_alone() -> anyhow::Result<()> {
    let test = create_test_pipeline(FixturePageSource::boards(), FailurePolicy::Abort).await?;

    let outcome = test
        .pipeline
        .run(RunOptions {
            test: true,
            max: Some(50),
            ..RunOptions::default()
        })
        .await?;

    let RunOutcome::TestSample(report, sample) = outcome else {
        panic!("expected a test sample");
    };
    assert_eq!(report.total_after_dedupe, 12);
    assert_eq!(sample.len(), 10);
    assert!(test.notifier.sent().is_empty());
    assert!(test.seen_links().is_empty());
    assert!(!test.dir.path().join("data").join("seen.json").exists());
    Ok(())
}

#[tokio::test]
async fn test_dedupe_off_delivers_every_time() -> anyhow::Result<()> {
    let test = create_test_pipeline(FixturePageSource::boards(), FailurePolicy::Abort).await?;
    let options = RunOptions {
        dedupe: false,
        ..engineers()
    };

    test.pipeline.run(options.clone()).await?;
    let outcome = test.pipeline.run(options).await?;

    assert!(matches!(outcome, RunOutcome::Delivered(..)));
    assert_eq!(test.notifier.sent().len(), 2);
    assert!(test.seen_links().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_exclude_and_no_matches() -> anyhow::Result<()> {
    let test = create_test_pipeline(FixturePageSource::boards(), FailurePolicy::Abort).await?;

    let outcome = test
        .pipeline
        .run(RunOptions {
            include: "engineer".into(),
            exclude: "engineer".into(),
            ..RunOptions::default()
        })
        .await?;

    let RunOutcome::NoNewItems(report) = outcome else {
        panic!("expected no items");
    };
    assert_eq!(report.total_filtered, 0);
    assert_eq!(report.sample_links.len(), 5);
    assert_eq!(report.sample_links[0], "https://alpha.example.com/jobs/1");
    Ok(())
}

#[tokio::test]
async fn test_unavailable_source_aborts_by_default() -> anyhow::Result<()> {
    let pages = FixturePageSource::boards().without("Beta");
    let test = create_test_pipeline(pages, FailurePolicy::Abort).await?;

    let err = test.pipeline.run(engineers()).await.unwrap_err();

    assert!(matches!(err, AppError::SourceUnavailable { ref source_name, .. } if source_name == "Beta"));
    assert!(test.notifier.sent().is_empty());
    assert!(test.seen_links().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_unavailable_source_skipped_when_configured() -> anyhow::Result<()> {
    let pages = FixturePageSource::boards().without("Beta");
    let test = create_test_pipeline(pages, FailurePolicy::Skip).await?;

    let outcome = test.pipeline.run(engineers()).await?;

    let report = outcome.report();
    assert_eq!(report.total_scraped, 8);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].source, "Beta");
    assert!(matches!(outcome, RunOutcome::Delivered(_, ref records, _) if records.len() == 4));
    Ok(())
}
