// ABOUTME: Integration tests for RSS/Atom parsing through the public API.
// ABOUTME: Covers format detection, channel and item mapping, title fallback, recovery and enclosure choice.

use std::time::Duration;

use chrono::{TimeZone, Utc};
use feedcast_feed::{
    parse_feed, AtomParser, Feed, FeedEnclosure, FeedError, FeedFormat, FeedParser, FormatParser,
    RssParser, UNKNOWN_FEED_TITLE, UNSET_TIMESTAMP,
};
use pretty_assertions::assert_eq;

const FEED_URL: &str = "https://example.com/podcast.xml";

const PODCAST_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"
     xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd"
     xmlns:creativeCommons="http://backend.userland.com/creativeCommonsRssModule"
     xmlns:dcterms="http://purl.org/dc/terms/">
  <channel>
    <title>The
Rust Hour</title>
    <link>https://example.com/show</link>
    <description>Weekly
talk about systems programming</description>
    <copyright>2024 Example Media</copyright>
    <language>en-us</language>
    <pubDate>Mon, 01 Jan 2024 12:00:00 GMT</pubDate>
    <lastBuildDate>Tue, 02 Jan 2024 08:30:00 +0100</lastBuildDate>
    <itunes:image href="https://example.com/art.jpg"/>
    <image><url>https://example.com/fallback.jpg</url></image>
    <itunes:keywords>rust, systems</itunes:keywords>
    <itunes:category text="Technology"/>
    <item>
      <title>Episode 1: Ownership</title>
      <description><![CDATA[<p>We talk about <b>ownership</b> &amp; borrowing.</p>]]></description>
      <author>host@example.com (Host)</author>
      <comments>https://example.com/ep1#comments</comments>
      <link>https://example.com/ep1</link>
      <pubDate>Wed, 03 Jan 2024 09:00:00 PST</pubDate>
      <dcterms:modified>2024-01-04T10:00:00Z</dcterms:modified>
      <creativeCommons:license>http://creativecommons.org/licenses/by/4.0/</creativeCommons:license>
      <enclosure url="https://cdn.example.com/ep1.mp3" length="48213000" type="audio/mpeg"/>
      <itunes:duration>1:02:03</itunes:duration>
      <itunes:keywords>ownership</itunes:keywords>
    </item>
    <item>
      <title></title>
      <description></description>
      <enclosure url="https://cdn.example.com/ghost.mp3" length="1"/>
    </item>
    <item>
      <title>Episode 2: Lifetimes</title>
      <pubDate>not a date at all</pubDate>
      <enclosure url="https://cdn.example.com/ep2.mp3" length="-20" type="audio/mpeg"/>
      <itunes:duration>02:03</itunes:duration>
    </item>
  </channel>
</rss>"#;

const YOUTUBE_ATOM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015"
      xmlns:media="http://search.yahoo.com/mrss/"
      xmlns="http://www.w3.org/2005/Atom">
  <id>yt:channel:UC123</id>
  <title>Crab Videos</title>
  <author>
    <name>Crab Channel</name>
    <uri>https://www.youtube.com/channel/UC123</uri>
  </author>
  <published>2019-05-01T10:00:00+00:00</published>
  <entry>
    <id>yt:video:abc</id>
    <yt:videoId>abc</yt:videoId>
    <title>Async in 10 minutes</title>
    <link rel="alternate" href="https://www.youtube.com/watch?v=abc"/>
    <author><name>Crab Channel</name></author>
    <published>2024-02-01T15:00:00+00:00</published>
    <updated>2024-02-02T16:30:00+00:00</updated>
    <media:group>
      <media:title>Async in 10 minutes</media:title>
      <media:description>A whirlwind
tour of futures.</media:description>
      <media:content url="https://cdn.example.com/abc-64.mp4" type="video/mp4" bitrate="64" expression="full"/>
      <media:content url="https://cdn.example.com/abc-256.mp4" type="video/mp4" bitrate="256" expression="full" fileSize="7340032" duration="600"/>
      <media:content url="https://cdn.example.com/abc-128.mp4" type="video/mp4" bitrate="128" expression="full"/>
      <media:content url="https://cdn.example.com/abc-trailer.mp4" type="video/mp4" bitrate="512" expression="sample"/>
    </media:group>
  </entry>
  <entry>
    <id>yt:video:empty</id>
    <title>Has no media group</title>
  </entry>
</feed>"#;

#[test]
fn rss_channel_fields() {
    let parser = RssParser::new(FEED_URL, PODCAST_RSS).unwrap();
    let feed = parser.create_feed().unwrap();

    assert_eq!(feed.url, FEED_URL);
    assert_eq!(feed.title, "TheRust Hour");
    assert_eq!(feed.description.as_deref(), Some("Weeklytalk about systems programming"));
    assert_eq!(feed.copyright.as_deref(), Some("2024 Example Media"));
    assert_eq!(feed.image_url.as_deref(), Some("https://example.com/art.jpg"));
    assert_eq!(feed.language.as_deref(), Some("en-us"));
    assert_eq!(feed.link.as_deref(), Some("https://example.com/show"));
    assert_eq!(feed.keywords.as_deref(), Some("rust, systems"));
    assert_eq!(feed.category.as_deref(), Some("Technology"));
    assert_eq!(feed.pub_date, Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap());
    assert_eq!(feed.last_build_date, Utc.with_ymd_and_hms(2024, 1, 2, 7, 30, 0).unwrap());
}

#[test]
fn rss_image_falls_back_to_channel_image() {
    let xml = r#"<rss><channel><title>T</title><image><url>https://example.com/fallback.jpg</url></image></channel></rss>"#;
    let feed = RssParser::new(FEED_URL, xml).unwrap().create_feed().unwrap();
    assert_eq!(feed.image_url.as_deref(), Some("https://example.com/fallback.jpg"));
}

#[test]
fn rss_items_skip_invalid_and_keep_siblings() {
    let parser = RssParser::new(FEED_URL, PODCAST_RSS).unwrap();
    let feed = parser.create_feed().unwrap();
    let items: Vec<_> = parser.feed_items(&feed).collect();

    let titles: Vec<_> = items.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, vec!["Episode 1: Ownership", "Episode 2: Lifetimes"]);

    let first = &items[0];
    assert_eq!(first.description, "<p>We talk about <b>ownership</b> &amp; borrowing.</p>");
    assert_eq!(first.stripped_description, "We talk about ownership & borrowing.");
    assert_eq!(first.author.as_deref(), Some("host@example.com (Host)"));
    assert_eq!(first.comments.as_deref(), Some("https://example.com/ep1#comments"));
    assert_eq!(first.link.as_deref(), Some("https://example.com/ep1"));
    assert_eq!(first.pub_date, Utc.with_ymd_and_hms(2024, 1, 3, 17, 0, 0).unwrap());
    assert_eq!(first.modified, Utc.with_ymd_and_hms(2024, 1, 4, 10, 0, 0).unwrap());
    assert_eq!(
        first.license_uri.as_deref(),
        Some("http://creativecommons.org/licenses/by/4.0/")
    );
    assert_eq!(first.feed_url.as_deref(), Some(FEED_URL));
    assert_eq!(
        first.enclosure,
        Some(FeedEnclosure {
            url: "https://cdn.example.com/ep1.mp3".to_string(),
            mime_type: Some("audio/mpeg".to_string()),
            file_size: 48_213_000,
            duration: Duration::from_secs(3723),
            keywords: Some("ownership".to_string()),
        })
    );

    let second = &items[1];
    assert_eq!(second.pub_date, UNSET_TIMESTAMP);
    assert_eq!(second.modified, UNSET_TIMESTAMP);
    let enclosure = second.enclosure.as_ref().unwrap();
    assert_eq!(enclosure.file_size, 0);
    assert_eq!(enclosure.duration, Duration::from_secs(123));
}

#[test]
fn enumerating_twice_is_identical() {
    let parser = RssParser::new(FEED_URL, PODCAST_RSS).unwrap();
    let feed = parser.create_feed().unwrap();
    let first: Vec<_> = parser.feed_items(&feed).collect();
    let second: Vec<_> = parser.feed_items(&feed).collect();
    assert_eq!(first, second);
}

#[test]
fn can_parse_is_exclusive_between_formats() {
    let rss = RssParser::new(FEED_URL, PODCAST_RSS).unwrap();
    let atom_on_rss = AtomParser::new(FEED_URL, PODCAST_RSS).unwrap();
    assert!(rss.can_parse());
    assert!(!atom_on_rss.can_parse());

    let atom = AtomParser::new(FEED_URL, YOUTUBE_ATOM).unwrap();
    let rss_on_atom = RssParser::new(FEED_URL, YOUTUBE_ATOM).unwrap();
    assert!(atom.can_parse());
    assert!(!rss_on_atom.can_parse());
}

#[test]
fn dispatcher_picks_matching_format() {
    let rss = FeedParser::select(FEED_URL, PODCAST_RSS).unwrap();
    assert_eq!(rss.format(), FeedFormat::Rss);
    assert!(matches!(rss, FeedParser::Rss(_)));

    let atom = FeedParser::select(FEED_URL, YOUTUBE_ATOM).unwrap();
    assert_eq!(atom.format(), FeedFormat::Atom);
    assert_eq!(atom.url(), FEED_URL);
}

#[test]
fn dispatcher_returns_none_for_unknown_documents() {
    assert!(FeedParser::select(FEED_URL, "<rss><channel></channel></rss>").is_none());
    assert!(FeedParser::select(FEED_URL, "<html><body>hi</body></html>").is_none());
    assert!(FeedParser::select(FEED_URL, "<rss><channel><title>x</title>").is_none());
}

#[test]
fn atom_youtube_feed() {
    let parser = AtomParser::new(FEED_URL, YOUTUBE_ATOM).unwrap();
    let feed = parser.create_feed().unwrap();

    let published = Utc.with_ymd_and_hms(2019, 5, 1, 10, 0, 0).unwrap();
    assert_eq!(feed.title, "Crab Videos");
    assert_eq!(feed.description.as_deref(), Some("Crab Videos"));
    assert_eq!(feed.keywords.as_deref(), Some("Crab Videos"));
    assert_eq!(feed.link.as_deref(), Some("https://www.youtube.com/channel/UC123"));
    assert_eq!(feed.copyright, None);
    assert_eq!(feed.pub_date, published);
    assert_eq!(feed.last_build_date, published);

    let items: Vec<_> = parser.feed_items(&feed).collect();
    assert_eq!(items.len(), 1);

    let item = &items[0];
    assert_eq!(item.title, "Async in 10 minutes");
    assert_eq!(item.description, "A whirlwindtour of futures.");
    assert_eq!(item.author.as_deref(), Some("Crab Channel"));
    assert_eq!(item.link.as_deref(), Some("https://www.youtube.com/watch?v=abc"));
    assert_eq!(item.pub_date, Utc.with_ymd_and_hms(2024, 2, 1, 15, 0, 0).unwrap());
    assert_eq!(item.modified, Utc.with_ymd_and_hms(2024, 2, 2, 16, 30, 0).unwrap());
    assert_eq!(item.comments, None);
    assert_eq!(item.license_uri, None);
    assert_eq!(
        item.enclosure,
        Some(FeedEnclosure {
            url: "https://cdn.example.com/abc-256.mp4".to_string(),
            mime_type: Some("video/mp4".to_string()),
            file_size: 7_340_032,
            duration: Duration::from_secs(600),
            keywords: None,
        })
    );
}

#[test]
fn title_fallback_to_sentinel() {
    let xml = r#"<rss><channel><title>   </title></channel></rss>"#;
    let parser = RssParser::new(FEED_URL, xml).unwrap();
    assert!(parser.can_parse());
    let feed = parser.create_feed().unwrap();
    assert_eq!(feed.title, UNKNOWN_FEED_TITLE);
}

#[test]
fn update_replaces_sentinel_but_keeps_real_titles() {
    let parser = RssParser::new(FEED_URL, PODCAST_RSS).unwrap();

    let mut unknown = Feed::new(FEED_URL);
    unknown.title = UNKNOWN_FEED_TITLE.to_string();
    parser.update_feed(&mut unknown).unwrap();
    assert_eq!(unknown.title, "TheRust Hour");

    let mut renamed = Feed::new(FEED_URL);
    renamed.title = "My Custom Name".to_string();
    parser.update_feed(&mut renamed).unwrap();
    assert_eq!(renamed.title, "My Custom Name");
    assert_eq!(renamed.language.as_deref(), Some("en-us"));
}

#[test]
fn update_does_not_clobber_unknown_title_with_empty_one() {
    let empty = RssParser::new(FEED_URL, "<rss><channel><title/></channel></rss>").unwrap();
    let mut feed = Feed::new(FEED_URL);
    feed.title = UNKNOWN_FEED_TITLE.to_string();
    empty.update_feed(&mut feed).unwrap();
    assert_eq!(feed.title, UNKNOWN_FEED_TITLE);
}

#[test]
fn control_characters_are_recovered() {
    let dirty = PODCAST_RSS.replace("Episode 1: Ownership", "Episode 1:\u{0B} Ownership\u{1B}");
    let parser = FeedParser::select(FEED_URL, &dirty).expect("recovered document should parse");
    assert_eq!(parser.format(), FeedFormat::Rss);

    let feed = parser.create_feed().unwrap();
    let first = parser.feed_items(&feed).next().unwrap();
    assert_eq!(first.title, "Episode 1: Ownership");
}

#[test]
fn deeply_nested_description_is_parsed() {
    let depth = 20_000;
    let xml = format!(
        "<rss><channel><title>Deep</title><item><title>Nested</title><description>{}x{}</description></item></channel></rss>",
        "<span>".repeat(depth),
        "</span>".repeat(depth)
    );
    let parsed = parse_feed(FEED_URL, &xml).unwrap();
    assert_eq!(parsed.items.len(), 1);
    assert_eq!(parsed.items[0].description, "x");
}

#[test]
fn leading_whitespace_before_declaration_is_ignored() {
    let padded = format!("\u{feff}\n\n   {PODCAST_RSS}");
    assert!(FeedParser::select(FEED_URL, &padded).is_some());
}

#[test]
fn external_entities_are_never_resolved() {
    let xml = r#"<?xml version="1.0"?>
<!DOCTYPE rss [<!ENTITY secret SYSTEM "file:///etc/hostname">]>
<rss><channel><title>&secret;</title></channel></rss>"#;
    assert!(FeedParser::select(FEED_URL, xml).is_none());
    assert!(matches!(
        RssParser::new(FEED_URL, xml),
        Err(FeedError::MalformedDocument(_))
    ));
}

#[test]
fn parse_feed_collects_everything() {
    let parsed = parse_feed(FEED_URL, YOUTUBE_ATOM).unwrap();
    assert_eq!(parsed.format, FeedFormat::Atom);
    assert_eq!(parsed.feed.title, "Crab Videos");
    assert_eq!(parsed.items.len(), 1);
}

#[test]
fn from_document_skips_construction() {
    let doc = feedcast_feed::XmlDocument::parse(PODCAST_RSS).unwrap();
    let parser = FeedParser::select_document(FEED_URL, doc).unwrap();
    assert_eq!(parser.format(), FeedFormat::Rss);
}
