//! End-to-end binding passes against a mocked API

use std::sync::Arc;

use galleon::credential::StaticEnvironment;
use galleon::{
    BindingEngine, Document, EventKind, EventLog, FetchFailure, GalleonConfig, HttpFetcher,
    MemoryDocument, Orchestrator, TemplateDisposal,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn orchestrator(server: &MockServer, environment: StaticEnvironment) -> Orchestrator<HttpFetcher> {
    let config = GalleonConfig {
        base_url: Some(format!("{}/", server.uri())),
        ..Default::default()
    };
    let fetcher = HttpFetcher::from_config(&config, Arc::new(environment)).unwrap();
    Orchestrator::new(fetcher, BindingEngine::from_config(&config, EventLog::new()))
}

#[tokio::test]
async fn test_blog_post_with_tags() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"title": "First", "url": "/p/1", "tags": ["rust"]},
            {"title": "Second", "url": "/p/2", "tags": ["dom", "json"]}
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut doc = MemoryDocument::from_yaml_str(
        r#"
- tag: article
  attrs: { data-gl-get: posts }
  children:
    - tag: a
      attrs: { data-gl-bind: title, data-gl-bind-href: url }
    - tag: span
      attrs: { data-gl-iterate: tags, data-gl-bind: "" }
"#,
    )
    .unwrap();

    let log = orchestrator(&mock_server, StaticEnvironment::new())
        .run(&mut doc)
        .await;

    let articles = doc.children(doc.root());
    assert_eq!(articles.len(), 3, "two clones plus the hidden entry");
    assert_eq!(doc.text_content(articles[0]), "Firstrust");
    assert_eq!(doc.text_content(articles[1]), "Seconddomjson");
    assert!(doc.has_attribute(articles[2], "hidden"));

    let link = doc.children(articles[1])[0];
    assert_eq!(doc.attribute(link, "href").as_deref(), Some("/p/2"));

    let tags = doc.children(articles[1]);
    assert_eq!(
        doc.attribute(tags[2], "data-gl-source").as_deref(),
        Some("posts[1].tags")
    );
    assert_eq!(doc.attribute(tags[2], "data-gl-index").as_deref(), Some("1"));
    assert!(log.problems().is_empty());
}

#[tokio::test]
async fn test_http_error_leaves_entry_untouched() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let mut doc = MemoryDocument::from_yaml_str(
        r#"
- tag: div
  attrs: { data-gl-get: nothing-here }
  children:
    - tag: p
      attrs: { data-gl-bind: name }
      text: Loading...
"#,
    )
    .unwrap();
    let before = doc.to_html();

    let log = orchestrator(&mock_server, StaticEnvironment::new())
        .run(&mut doc)
        .await;

    assert_eq!(doc.to_html(), before);
    let failed: Vec<_> = log
        .problems()
        .into_iter()
        .map(|e| e.kind)
        .collect();
    assert_eq!(
        failed,
        vec![EventKind::EntryFailed {
            endpoint: "nothing-here".into(),
            failure: FetchFailure::Http { status: 404 },
        }]
    );
}

#[tokio::test]
async fn test_failing_entry_does_not_block_others() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/private"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"n": "private"})))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/public"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"n": "public"})))
        .mount(&mock_server)
        .await;

    // No token in the environment: /private is never requested
    let mut doc = MemoryDocument::from_yaml_str(
        r#"
- tag: b
  attrs: { data-gl-get: private, data-gl-auth: "local:token", data-gl-bind: n }
- tag: i
  attrs: { data-gl-get: public, data-gl-bind: n }
"#,
    )
    .unwrap();

    let log = orchestrator(&mock_server, StaticEnvironment::new())
        .run(&mut doc)
        .await;

    assert_eq!(
        doc.to_html(),
        concat!(
            r#"<b data-gl-get="private" data-gl-auth="local:token" data-gl-bind="n"></b>"#,
            r#"<i data-gl-bind="n" data-gl-source="public" data-gl-index="0">public</i>"#,
            r#"<i data-gl-get="public" data-gl-bind="n" hidden data-gl-template></i>"#
        )
    );
    assert!(log.filter_endpoint("private").iter().any(|e| matches!(
        e.kind,
        EventKind::EntryFailed {
            failure: FetchFailure::AuthRequiredMissing,
            ..
        }
    )));
}

#[tokio::test]
async fn test_authorized_entry_and_remove_disposal() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/private"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"n": "private"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = GalleonConfig {
        base_url: Some(format!("{}/", mock_server.uri())),
        template_disposal: TemplateDisposal::Remove,
        ..Default::default()
    };
    let environment = StaticEnvironment::new().with_local("token", "secret");
    let orchestrator = Orchestrator::new(
        HttpFetcher::from_config(&config, Arc::new(environment)).unwrap(),
        BindingEngine::from_config(&config, EventLog::new()),
    );

    let mut doc = MemoryDocument::from_yaml_str(
        r#"
- tag: b
  attrs: { data-gl-get: private, data-gl-auth: "local:token", data-gl-bind: n }
"#,
    )
    .unwrap();
    orchestrator.run(&mut doc).await;

    assert_eq!(
        doc.to_html(),
        r#"<b data-gl-bind="n" data-gl-source="private" data-gl-index="0">private</b>"#
    );
}
