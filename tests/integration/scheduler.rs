use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use postbot::constants::SCRIPT_PARSE_ERROR_MESSAGE;
use postbot::scheduler::{RunOutcome, Scheduler};
use postbot::test_utils::{MockBackend, MockFetcher, MockUploader, bot_record};
use std::sync::Arc;
use std::time::Duration;

use crate::common::TestEnv;

fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

fn scheduler(env: &TestEnv, backend: Arc<MockBackend>) -> Scheduler {
    Scheduler::new(Arc::new(env.store()), backend, Duration::from_secs(60))
}

#[tokio::test]
async fn test_tick_persists_bookkeeping_to_store_file() {
    let env = TestEnv::new().unwrap();
    let mut later = bot_record("later", r#"{"origin": ["not yet"]}"#);
    later.next_run = Some(noon() + ChronoDuration::hours(2));
    let mut broken = bot_record("broken", "{oops");
    broken.next_run = Some(noon() - ChronoDuration::minutes(1));
    env.write_bots(&[
        bot_record("owl", r#"{"origin": ["hoot {img http://a/owl.png}"]}"#),
        later.clone(),
        broken,
    ])
    .await
    .unwrap();

    let backend = Arc::new(MockBackend::new());
    let report = scheduler(&env, backend.clone()).tick_at(noon()).await.unwrap();

    assert_eq!(report.posted(), 1);
    assert_eq!(report.skipped, vec!["later".to_string()]);

    let bots = env.read_bots().await.unwrap();
    assert_eq!(bots.len(), 3);

    let owl = &bots[0];
    assert_eq!(owl.last_run, Some(noon()));
    assert_eq!(owl.next_run, Some(noon() + ChronoDuration::hours(1)));
    assert_eq!(owl.last_error, None);

    assert_eq!(bots[1], later);

    let broken = &bots[2];
    assert_eq!(broken.last_error.as_deref(), Some(SCRIPT_PARSE_ERROR_MESSAGE));
    assert_eq!(broken.next_run, Some(noon() - ChronoDuration::minutes(1)));

    let posts = backend.publisher().posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].0, "hoot ");
    assert_eq!(posts[0].1[0].as_str(), "http://a/owl.png");
}

#[tokio::test]
async fn test_second_tick_skips_rescheduled_bot() {
    let env = TestEnv::new().unwrap();
    env.write_bots(&[bot_record("owl", r#"{"origin": ["hoot"]}"#)]).await.unwrap();
    let backend = Arc::new(MockBackend::new());
    let scheduler = scheduler(&env, backend.clone());

    scheduler.tick_at(noon()).await.unwrap();
    let second = scheduler.tick_at(noon() + ChronoDuration::minutes(30)).await.unwrap();
    let third = scheduler.tick_at(noon() + ChronoDuration::hours(1)).await.unwrap();

    assert!(second.ran.is_empty());
    assert_eq!(third.posted(), 1);
    assert_eq!(backend.publisher().posts().len(), 2);
}

#[tokio::test]
async fn test_failed_media_still_posts_text() {
    let env = TestEnv::new().unwrap();
    env.write_bots(&[bot_record(
        "owl",
        r#"{"origin": ["hoot {img http://a/gone.png}{vid http://a/clip.mp4}"]}"#,
    )])
    .await
    .unwrap();
    let backend = Arc::new(MockBackend::new().with_media(
        MockFetcher::new().failing("http://a/gone.png"),
        MockUploader::new().with_handle("http://a/clip.mp4", "clip-1"),
    ));

    let report = scheduler(&env, backend.clone()).tick_at(noon()).await.unwrap();

    assert!(matches!(report.ran[0].1, RunOutcome::Posted(_)));
    let posts = backend.publisher().posts();
    assert_eq!(posts[0].0, "hoot ");
    assert_eq!(posts[0].1.len(), 1);
    assert_eq!(posts[0].1[0].as_str(), "clip-1");
    assert_eq!(env.read_bots().await.unwrap()[0].last_error, None);
}

#[tokio::test]
async fn test_run_now_records_run_in_store() {
    let env = TestEnv::new().unwrap();
    let mut owl = bot_record("owl", r#"{"origin": ["hoot"]}"#);
    owl.name = "Night Owl".to_string();
    owl.disabled = true;
    env.write_bots(&[owl]).await.unwrap();
    let backend = Arc::new(MockBackend::new());

    let outcome = scheduler(&env, backend.clone()).run_now("night owl").await.unwrap();

    assert!(matches!(outcome, RunOutcome::Posted(_)));
    let stored = &env.read_bots().await.unwrap()[0];
    assert!(stored.last_run.is_some());
    assert!(stored.next_run.is_some());
    assert!(stored.disabled);
}

#[tokio::test]
async fn test_tick_on_missing_store_is_empty() {
    let env = TestEnv::new().unwrap();
    let report = scheduler(&env, Arc::new(MockBackend::new())).tick_at(noon()).await.unwrap();

    assert!(report.ran.is_empty());
    assert!(report.skipped.is_empty());
}
