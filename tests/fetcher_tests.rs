use std::time::Duration;

use ark::feeds::{FeedSource, FetchError, HttpFeedFetcher};
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Example News</title>
    <link>https://news.example.test</link>
    <description>All the news</description>
    <item>
      <title>First</title>
      <link>https://news.example.test/first</link>
      <guid>first-guid</guid>
      <pubDate>Tue, 10 Jun 2025 04:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Second</title>
      <link>https://news.example.test/second</link>
    </item>
  </channel>
</rss>"#;

const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example Blog</title>
  <link href="https://blog.example.test/"/>
  <id>urn:uuid:blog</id>
  <updated>2025-06-10T04:00:00Z</updated>
  <entry>
    <title>Hello Atom</title>
    <link href="https://blog.example.test/hello"/>
    <id>urn:uuid:hello</id>
    <updated>2025-06-10T04:00:00Z</updated>
    <summary>Short summary</summary>
  </entry>
</feed>"#;

fn fetcher() -> HttpFeedFetcher {
    HttpFeedFetcher::new(Duration::from_secs(2), "ark-tests").unwrap()
}

#[tokio::test]
async fn fetches_and_parses_rss() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rss"))
        .and(header_exists("accept"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/rss+xml")
                .set_body_string(RSS),
        )
        .mount(&server)
        .await;

    let feed = fetcher()
        .fetch(&format!("{}/rss", server.uri()))
        .await
        .unwrap();

    assert_eq!(feed.title, "Example News");
    assert_eq!(feed.articles.len(), 2);
    assert_eq!(feed.articles[0].dedup_key(), Some("first-guid"));
    assert!(feed.articles[0].published_at.is_some());
    assert_eq!(
        feed.articles[1].dedup_key(),
        Some("https://news.example.test/second")
    );
}

#[tokio::test]
async fn fetches_and_parses_atom() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/atom"))
        .respond_with(ResponseTemplate::new(200).set_body_string(ATOM))
        .mount(&server)
        .await;

    let feed = fetcher()
        .fetch(&format!("{}/atom", server.uri()))
        .await
        .unwrap();

    assert_eq!(feed.title, "Example Blog");
    assert_eq!(feed.articles.len(), 1);
    assert_eq!(feed.articles[0].link, "https://blog.example.test/hello");
    assert_eq!(feed.articles[0].dedup_key(), Some("urn:uuid:hello"));
}

#[tokio::test]
async fn non_ok_status_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = fetcher().fetch(&server.uri()).await.unwrap_err();

    assert!(matches!(err, FetchError::Status { status: 404 }));
}

#[tokio::test]
async fn html_page_is_a_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html><body>not a feed</body></html>"),
        )
        .mount(&server)
        .await;

    let err = fetcher().fetch(&server.uri()).await.unwrap_err();

    assert!(matches!(err, FetchError::Parse(_)));
}
