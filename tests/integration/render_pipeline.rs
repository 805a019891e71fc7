use postbot::grammar::{GrammarError, TemplateSource, TraceryEngine};
use postbot::media::{MediaHandle, MediaResolver, scan_directives, strip_directives, unescape_braces};
use postbot::render::ContentRenderer;
use postbot::test_utils::{MockFetcher, MockPublisher, MockUploader, init_test_logging};
use std::sync::Arc;
use std::time::Duration;

fn renderer(fetcher: MockFetcher, uploader: MockUploader) -> ContentRenderer {
    ContentRenderer::new(
        Arc::new(TraceryEngine::seeded(42)),
        MediaResolver::new(Arc::new(fetcher), Arc::new(uploader)),
    )
}

fn ids(media: &[MediaHandle]) -> Vec<&str> {
    media.iter().map(MediaHandle::as_str).collect()
}

#[tokio::test]
async fn test_grammar_builds_directives_from_symbols() {
    init_test_logging(None);
    let source = TemplateSource::from_json(
        r##"{
            "origin": ["#[pet:#animal#]post#"],
            "post": ["Meet #pet.a#! {img https://img.example/#pet#.png}"],
            "animal": ["owl"]
        }"##,
    )
    .unwrap();

    let fetcher = MockFetcher::new();
    let uploader = MockUploader::new().with_handle("https://img.example/owl.png", "m-owl");
    let result = renderer(fetcher, uploader).render(&source).await.unwrap();

    assert_eq!(result.text, "Meet an owl! ");
    assert_eq!(ids(&result.media), vec!["m-owl"]);
}

#[tokio::test]
async fn test_json_escaped_braces_survive_expansion() {
    // In JSON a literal `\{` is written `\\{`.
    let source =
        TemplateSource::from_json(r#"{"origin": ["set = \\{1, 2\\} {vid https://v.example/a.mp4}"]}"#)
            .unwrap();

    let result =
        renderer(MockFetcher::new(), MockUploader::new()).render(&source).await.unwrap();

    assert_eq!(result.text, "set = {1, 2} ");
    assert_eq!(ids(&result.media), vec!["https://v.example/a.mp4"]);
}

#[tokio::test]
async fn test_mixed_failures_keep_surviving_order() {
    let source = TemplateSource::from_rules([(
        "origin",
        vec![
            "{img http://a/1.png}{img http://a/404.png}{img http://a/page}{foo http://a/x}{img http://a/5.png}",
        ],
    )]);
    let fetcher =
        Arc::new(MockFetcher::new().failing("http://a/404.png").with_body("http://a/page", "<html>"));

    let result = ContentRenderer::new(
        Arc::new(TraceryEngine::seeded(1)),
        MediaResolver::new(fetcher.clone(), Arc::new(MockUploader::new())),
    )
    .render(&source)
    .await
    .unwrap();

    assert_eq!(result.text, "");
    assert_eq!(ids(&result.media), vec!["http://a/5.png", "http://a/1.png"]);
    // The unknown prefix is never fetched.
    assert_eq!(fetcher.calls().len(), 4);
    assert!(!fetcher.calls().contains(&"http://a/x".to_string()));
}

#[tokio::test]
async fn test_cap_on_six_directives() {
    let rule: String = (1..=6).map(|i| format!("{{img http://a/h{i}.png}} ")).collect();
    let source = TemplateSource::from_rules([("origin", vec![rule])]);

    let result =
        renderer(MockFetcher::new(), MockUploader::new()).render(&source).await.unwrap();

    assert_eq!(
        ids(&result.media),
        vec!["http://a/h6.png", "http://a/h5.png", "http://a/h4.png", "http://a/h3.png"]
    );
    assert_eq!(result.text, "      ");
}

#[tokio::test]
async fn test_timeout_affects_only_its_directive() {
    let source = TemplateSource::from_rules([(
        "origin",
        vec!["a{img http://slow/1.png}b{img http://fast/2.png}c"],
    )]);
    let fetcher = MockFetcher::new().with_delay("http://slow/1.png", Duration::from_secs(60));

    let started = std::time::Instant::now();
    let result = ContentRenderer::new(
        Arc::new(TraceryEngine::seeded(1)),
        MediaResolver::new(Arc::new(fetcher), Arc::new(MockUploader::new()))
            .with_fetch_timeout(Duration::from_millis(200)),
    )
    .render(&source)
    .await
    .unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(result.text, "abc");
    assert_eq!(ids(&result.media), vec!["http://fast/2.png"]);
}

#[tokio::test]
async fn test_post_sends_text_only_without_media() {
    let source = TemplateSource::from_rules([("origin", vec![r"just text \{ok\}"])]);
    let publisher = MockPublisher::new();

    let receipt = renderer(MockFetcher::new(), MockUploader::new())
        .post(&source, &publisher)
        .await
        .unwrap();

    assert_eq!(receipt.text, "just text {ok}");
    assert_eq!(publisher.posts(), vec![("just text {ok}".to_string(), Vec::new())]);
}

#[tokio::test]
async fn test_missing_origin_fails_before_any_fetch() {
    let source = TemplateSource::from_rules([("start", vec!["{img http://a/b.png}"])]);
    let fetcher = Arc::new(MockFetcher::new());

    let err = ContentRenderer::new(
        Arc::new(TraceryEngine::seeded(1)),
        MediaResolver::new(fetcher.clone(), Arc::new(MockUploader::new())),
    )
    .render(&source)
    .await
    .unwrap_err();

    assert!(matches!(err, GrammarError::UnknownSymbol { ref symbol, .. } if symbol == "origin"));
    assert!(fetcher.calls().is_empty());
}

#[test]
fn test_only_escaped_braces_means_no_directives() {
    let text = r"\{a\} and \{b c\}";
    assert!(scan_directives(text).is_empty());
    assert_eq!(unescape_braces(&strip_directives(text)), "{a} and {b c}");
}
