use predicates::prelude::*;
use postbot::constants::SCRIPT_PARSE_ERROR_MESSAGE;
use postbot::test_utils::bot_record;

use crate::common::TestEnv;

#[test]
fn test_help_lists_commands() {
    let env = TestEnv::new().unwrap();
    env.postbot()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("post"))
        .stdout(predicate::str::contains("render"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("list"));
}

#[test]
fn test_list_empty_store() {
    let env = TestEnv::new().unwrap();
    env.postbot()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No bots configured."));
}

#[tokio::test]
async fn test_list_json_hides_credentials() {
    let env = TestEnv::new().unwrap();
    env.write_bots(&[bot_record("owl", r#"{"origin": ["hoot"]}"#)]).await.unwrap();

    let output = env.postbot().args(["list", "--format", "json"]).output().unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json[0]["id"], "owl");
    assert_eq!(json[0]["schedule"], 3600);
    assert!(json[0].get("credentials").is_none());
    assert!(!String::from_utf8_lossy(&output.stdout).contains("test-token"));
}

#[tokio::test]
async fn test_validate_clean_store() {
    let env = TestEnv::new().unwrap();
    env.write_bots(&[bot_record("owl", r#"{"origin": ["hoot {img http://a/b.png}"]}"#)])
        .await
        .unwrap();

    env.postbot()
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ owl"));
}

#[tokio::test]
async fn test_validate_reports_broken_script() {
    let env = TestEnv::new().unwrap();
    env.write_bots(&[
        bot_record("owl", r#"{"origin": ["hoot"]}"#),
        bot_record("broken", r##"{"origin": ["#missing#"]}"##),
    ])
    .await
    .unwrap();

    env.postbot()
        .arg("validate")
        .assert()
        .failure()
        .stdout(predicate::str::contains("✓ owl"))
        .stdout(predicate::str::contains("✗ broken"))
        .stdout(predicate::str::contains("missing"))
        .stderr(predicate::str::contains("Validation failed"));
}

#[tokio::test]
async fn test_validate_json_warns_about_unknown_prefix() {
    let env = TestEnv::new().unwrap();
    env.write_bots(&[bot_record("owl", r#"{"origin": ["hoot {gif http://a/c.gif}"]}"#)])
        .await
        .unwrap();

    let output = env.postbot().args(["validate", "--format", "json"]).output().unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json[0]["errors"].as_array().unwrap().len(), 0);
    assert_eq!(json[0]["warnings"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_render_dry_run_lists_directives() {
    let env = TestEnv::new().unwrap();
    env.write_bots(&[bot_record(
        "owl",
        r#"{"origin": ["hoot \\{owl\\} {img http://a/b.png}{gif http://a/c}"]}"#,
    )])
    .await
    .unwrap();

    env.postbot()
        .args(["render", "owl", "--dry-run", "--seed", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hoot {owl} "))
        .stdout(predicate::str::contains("2 media directive(s):"))
        .stdout(predicate::str::contains("img http://a/b.png"))
        .stdout(predicate::str::contains("ignored"));
}

#[test]
fn test_render_grammar_file() {
    let env = TestEnv::new().unwrap();
    let grammar = env.path().join("grammar.json");
    std::fs::write(&grammar, r##"{"origin": ["#greeting#, world"], "greeting": ["hello"]}"##).unwrap();

    env.postbot()
        .args(["render", "--file"])
        .arg(&grammar)
        .assert()
        .success()
        .stdout(predicate::str::contains("hello, world"));
}

#[test]
fn test_render_requires_bot_or_file() {
    let env = TestEnv::new().unwrap();
    env.postbot().arg("render").assert().failure();
}

#[tokio::test]
async fn test_unknown_bot_suggests_similar_name() {
    let env = TestEnv::new().unwrap();
    env.write_bots(&[bot_record("owl", r#"{"origin": ["hoot"]}"#)]).await.unwrap();

    env.postbot()
        .args(["post", "owk"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Bot 'owk' not found"))
        .stderr(predicate::str::contains("Did you mean: owl?"));
}

#[tokio::test]
async fn test_post_invalid_script_fails_and_records_error() {
    let env = TestEnv::new().unwrap();
    env.write_bots(&[bot_record("broken", "{oops")]).await.unwrap();

    env.postbot()
        .args(["post", "broken"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid script for bot 'broken'"));

    let bots = env.read_bots().await.unwrap();
    assert_eq!(bots[0].last_error.as_deref(), Some(SCRIPT_PARSE_ERROR_MESSAGE));
}

#[test]
fn test_invalid_config_is_reported() {
    let env = TestEnv::new().unwrap();
    std::fs::write(env.config_path(), "poll_interval_secs = 0\n").unwrap();

    env.postbot()
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("poll_interval_secs"));
}
