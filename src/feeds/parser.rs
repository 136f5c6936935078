//! Feed document parsing.
//!
//! Attempts, in order, first match wins:
//! 1. RSS 2.0, requiring `<rss version="2...">` at the root
//! 2. Atom, requiring a `<feed>` root
//! 3. RSS of any version (0.9x, 1.0/RDF, or a missing version attribute)
//!
//! If none succeeds the document is rejected as unparseable.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::dates::parse_date;
use super::{ParseError, ParsedArticle, ParsedFeed};

pub fn parse_feed(content: &[u8]) -> Result<ParsedFeed, ParseError> {
    let root = sniff_root(content);

    if let Some(root) = &root
        && root.name == "rss"
        && root.version.as_deref().is_some_and(|v| v.starts_with('2'))
        && let Ok(channel) = rss::Channel::read_from(content)
    {
        return Ok(from_rss(&channel));
    }

    if root.as_ref().is_some_and(|r| r.name == "feed") {
        match parse_atom(content) {
            Ok(feed) => return Ok(feed),
            Err(err) => {
                tracing::debug!(error = %err, "document has a feed root but is not valid atom")
            }
        }
    }

    match rss::Channel::read_from(content) {
        Ok(channel) => Ok(from_rss(&channel)),
        Err(err) => Err(ParseError::Unparseable {
            reason: match root {
                Some(root) => format!("<{}> document: {}", root.name, err),
                None => "no root element".to_string(),
            },
        }),
    }
}

struct RootElement {
    name: String,
    version: Option<String>,
}

/// Reads up to the first element and reports its local name and `version` attribute.
fn sniff_root(content: &[u8]) -> Option<RootElement> {
    let mut reader = Reader::from_reader(content);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let version = attribute(&e, b"version");
                return Some(RootElement {
                    name: local_name(&e),
                    version,
                });
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
        buf.clear();
    }
}

fn from_rss(channel: &rss::Channel) -> ParsedFeed {
    let articles = channel
        .items()
        .iter()
        .map(|item| {
            let dublin_core = item.dublin_core_ext();
            let author = item
                .author()
                .map(str::to_string)
                .or_else(|| dublin_core.and_then(|dc| dc.creators().first().cloned()))
                .unwrap_or_default();
            let published_at = item
                .pub_date()
                .and_then(parse_date)
                .or_else(|| {
                    dublin_core
                        .and_then(|dc| dc.dates().first())
                        .and_then(|raw| parse_date(raw))
                });

            ParsedArticle {
                title: item.title().unwrap_or_default().to_string(),
                link: item.link().unwrap_or_default().to_string(),
                description: item.description().unwrap_or_default().to_string(),
                content: item.content().unwrap_or_default().to_string(),
                author,
                guid: item
                    .guid()
                    .map(|guid| guid.value().to_string())
                    .unwrap_or_default(),
                published_at,
            }
        })
        .collect();

    ParsedFeed {
        title: channel.title().to_string(),
        link: channel.link().to_string(),
        description: channel.description().to_string(),
        language: channel.language().map(str::to_string),
        articles,
    }
}

#[derive(Debug, Default)]
struct AtomEntry {
    article: ParsedArticle,
    published: String,
    updated: String,
}

impl AtomEntry {
    fn finish(mut self) -> ParsedArticle {
        // Prefer the original publication time, fall back to the last update.
        self.article.published_at =
            parse_date(&self.published).or_else(|| parse_date(&self.updated));
        self.article
    }
}

/// Event-driven Atom reader. `path` holds the local names of the open elements.
fn parse_atom(content: &[u8]) -> Result<ParsedFeed, quick_xml::Error> {
    let mut reader = Reader::from_reader(content);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut path: Vec<String> = Vec::new();
    let mut feed = ParsedFeed::default();
    let mut entry: Option<AtomEntry> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = local_name(&e);
                if name == "link" {
                    take_link(&e, &path, &mut feed, entry.as_mut());
                }
                if name == "entry" && path.len() == 1 {
                    entry = Some(AtomEntry::default());
                }
                path.push(name);
            }
            Event::Empty(e) => {
                if local_name(&e) == "link" {
                    take_link(&e, &path, &mut feed, entry.as_mut());
                }
            }
            Event::Text(text) => {
                let text = text.unescape()?;
                append_text(&path, &text, &mut feed, entry.as_mut());
            }
            Event::CData(data) => {
                let bytes = data.into_inner();
                let text = String::from_utf8_lossy(&bytes);
                append_text(&path, &text, &mut feed, entry.as_mut());
            }
            Event::End(_) => {
                let closed = path.pop();
                if closed.as_deref() == Some("entry")
                    && path.len() == 1
                    && let Some(done) = entry.take()
                {
                    feed.articles.push(done.finish());
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(feed)
}

/// Keeps the first link whose `rel` is absent, empty or `alternate`.
fn take_link(
    e: &BytesStart<'_>,
    path: &[String],
    feed: &mut ParsedFeed,
    entry: Option<&mut AtomEntry>,
) {
    let rel = attribute(e, b"rel").unwrap_or_default();
    if !(rel.is_empty() || rel == "alternate") {
        return;
    }
    let Some(href) = attribute(e, b"href") else {
        return;
    };

    match (path.len(), entry) {
        (1, _) if feed.link.is_empty() => feed.link = href,
        (2, Some(entry)) if entry.article.link.is_empty() => entry.article.link = href,
        _ => {}
    }
}

fn append_text(
    path: &[String],
    text: &str,
    feed: &mut ParsedFeed,
    entry: Option<&mut AtomEntry>,
) {
    let segments: Vec<&str> = path.iter().map(String::as_str).collect();
    match (segments.as_slice(), entry) {
        ([_, "title"], _) => feed.title.push_str(text),
        ([_, "subtitle"], _) => feed.description.push_str(text),
        ([_, "entry", field, rest @ ..], Some(entry)) => {
            let article = &mut entry.article;
            match (*field, rest) {
                ("title", []) => article.title.push_str(text),
                ("summary", _) => article.description.push_str(text),
                ("content", _) => article.content.push_str(text),
                ("id", []) => article.guid.push_str(text),
                ("published", []) => entry.published.push_str(text),
                ("updated", []) => entry.updated.push_str(text),
                ("author", ["name"]) => article.author.push_str(text),
                _ => {}
            }
        }
        _ => {}
    }
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok().map(|value| value.into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    const RSS2: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <title>Liftoff News</title>
    <link>http://liftoff.msfc.nasa.gov/</link>
    <description>Liftoff to Space Exploration.</description>
    <language>en-us</language>
    <item>
      <title>Star City</title>
      <link>http://liftoff.msfc.nasa.gov/news/2003/news-starcity.asp</link>
      <description>How do Americans get ready to work with Russians aboard the ISS?</description>
      <content:encoded><![CDATA[<p>Full story</p>]]></content:encoded>
      <author>editor@example.com</author>
      <pubDate>Tue, 03 Jun 2003 09:39:21 GMT</pubDate>
      <guid>http://liftoff.msfc.nasa.gov/2003/06/03.html#item573</guid>
    </item>
    <item>
      <title>Undated</title>
      <link>http://liftoff.msfc.nasa.gov/news/undated</link>
      <pubDate>sometime last week</pubDate>
      <guid>item-574</guid>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example Feed</title>
  <subtitle>A subtitle.</subtitle>
  <link href="http://example.org/feed/" rel="self" />
  <link href="http://example.org/" />
  <id>urn:uuid:60a76c80-d399-11d9-b91C-0003939e0af6</id>
  <updated>2003-12-13T18:30:02Z</updated>
  <entry>
    <title>Atom-Powered Robots Run Amok</title>
    <link rel="edit" href="http://example.org/2003/12/13/atom03/edit"/>
    <link rel="alternate" type="text/html" href="http://example.org/2003/12/13/atom03"/>
    <id>urn:uuid:1225c695-cfb8-4ebb-aaaa-80da344efa6a</id>
    <updated>2003-12-13T18:30:02Z</updated>
    <summary>Some text.</summary>
    <content type="html">&lt;p&gt;Body&lt;/p&gt;</content>
    <author><name>John Doe</name></author>
  </entry>
  <entry>
    <title>Second</title>
    <id>urn:uuid:second</id>
    <published>2003-12-14T08:00:00+01:00</published>
    <updated>2003-12-20T10:00:00Z</updated>
  </entry>
</feed>"#;

    #[test]
    fn parses_rss2_channel_and_items() {
        let feed = parse_feed(RSS2.as_bytes()).unwrap();

        assert_eq!(feed.title, "Liftoff News");
        assert_eq!(feed.link, "http://liftoff.msfc.nasa.gov/");
        assert_eq!(feed.language.as_deref(), Some("en-us"));
        assert_eq!(feed.articles.len(), 2);

        let first = &feed.articles[0];
        assert_eq!(first.title, "Star City");
        assert_eq!(
            first.guid,
            "http://liftoff.msfc.nasa.gov/2003/06/03.html#item573"
        );
        assert_eq!(first.content, "<p>Full story</p>");
        assert_eq!(first.author, "editor@example.com");
        assert_eq!(
            first.published_at,
            Some(Utc.with_ymd_and_hms(2003, 6, 3, 9, 39, 21).unwrap())
        );
    }

    #[test]
    fn unparseable_item_date_is_left_empty() {
        let feed = parse_feed(RSS2.as_bytes()).unwrap();
        let undated = &feed.articles[1];
        assert_eq!(undated.guid, "item-574");
        assert_eq!(undated.published_at, None);
    }

    #[test]
    fn parses_atom_with_alternate_links() {
        let feed = parse_feed(ATOM.as_bytes()).unwrap();

        assert_eq!(feed.title, "Example Feed");
        assert_eq!(feed.description, "A subtitle.");
        assert_eq!(feed.link, "http://example.org/");
        assert_eq!(feed.articles.len(), 2);

        let first = &feed.articles[0];
        assert_eq!(first.title, "Atom-Powered Robots Run Amok");
        assert_eq!(first.link, "http://example.org/2003/12/13/atom03");
        assert_eq!(first.guid, "urn:uuid:1225c695-cfb8-4ebb-aaaa-80da344efa6a");
        assert_eq!(first.description, "Some text.");
        assert_eq!(first.content, "<p>Body</p>");
        assert_eq!(first.author, "John Doe");
        assert_eq!(
            first.published_at,
            Some(Utc.with_ymd_and_hms(2003, 12, 13, 18, 30, 2).unwrap())
        );
    }

    #[test]
    fn atom_published_wins_over_updated() {
        let feed = parse_feed(ATOM.as_bytes()).unwrap();
        let second = &feed.articles[1];
        assert_eq!(second.link, "");
        assert_eq!(
            second.published_at,
            Some(Utc.with_ymd_and_hms(2003, 12, 14, 7, 0, 0).unwrap())
        );
    }

    #[test]
    fn rss_without_version_falls_through_to_lenient_parse() {
        let doc = r#"<rss><channel><title>Legacy</title><link>http://legacy.test/</link>
            <description>old</description>
            <item><title>One</title><link>http://legacy.test/1</link></item>
            </channel></rss>"#;

        let feed = parse_feed(doc.as_bytes()).unwrap();
        assert_eq!(feed.title, "Legacy");
        assert_eq!(feed.articles.len(), 1);
        assert_eq!(feed.articles[0].guid, "");
        assert_eq!(feed.articles[0].dedup_key(), Some("http://legacy.test/1"));
    }

    #[test]
    fn rejects_documents_that_are_not_feeds() {
        let err = parse_feed(b"<html><body>nope</body></html>").unwrap_err();
        assert!(err.to_string().starts_with("unparseable feed"));

        let err = parse_feed(b"definitely not xml").unwrap_err();
        assert!(matches!(err, ParseError::Unparseable { .. }));
    }
}
