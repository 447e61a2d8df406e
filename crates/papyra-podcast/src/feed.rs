//! RSS 2.0 feed generation with iTunes podcast tags.

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::{Deserialize, Serialize};

use crate::{PodcastError, Result};

/// Channel-level feed settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub title: String,
    pub link: String,
    pub description: String,
    pub author: String,
    /// Public base URL under which episode audio files are served.
    pub audio_base_url: String,
}

/// One published episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub title: String,
    pub description: String,
    /// Audio file name under the feed's audio base URL.
    pub audio_file: String,
    pub audio_bytes: u64,
    /// Stable identifier, reused across feed regenerations.
    pub guid: String,
    pub published_at: DateTime<Utc>,
}

/// Render the feed document. Episodes are emitted in the given order;
/// callers sort newest-first before rendering.
pub fn write_rss(config: &FeedConfig, episodes: &[Episode]) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    rss.push_attribute((
        "xmlns:itunes",
        "http://www.itunes.com/dtds/podcast-1.0.dtd",
    ));
    writer.write_event(Event::Start(rss))?;
    writer.write_event(Event::Start(BytesStart::new("channel")))?;

    text_element(&mut writer, "title", &config.title)?;
    text_element(&mut writer, "link", &config.link)?;
    text_element(&mut writer, "description", &config.description)?;
    text_element(&mut writer, "language", "en-us")?;
    text_element(&mut writer, "itunes:author", &config.author)?;
    text_element(&mut writer, "itunes:explicit", "false")?;
    text_element(&mut writer, "lastBuildDate", &Utc::now().to_rfc2822())?;

    for episode in episodes {
        writer.write_event(Event::Start(BytesStart::new("item")))?;

        text_element(&mut writer, "title", &episode.title)?;
        text_element(&mut writer, "description", &episode.description)?;
        text_element(&mut writer, "pubDate", &episode.published_at.to_rfc2822())?;

        let mut guid = BytesStart::new("guid");
        guid.push_attribute(("isPermaLink", "false"));
        writer.write_event(Event::Start(guid))?;
        writer.write_event(Event::Text(BytesText::new(&episode.guid)))?;
        writer.write_event(Event::End(BytesEnd::new("guid")))?;

        let audio_url = format!(
            "{}/{}",
            config.audio_base_url.trim_end_matches('/'),
            episode.audio_file
        );
        let length = episode.audio_bytes.to_string();
        let mut enclosure = BytesStart::new("enclosure");
        enclosure.push_attribute(("url", audio_url.as_str()));
        enclosure.push_attribute(("length", length.as_str()));
        enclosure.push_attribute(("type", "audio/mpeg"));
        writer.write_event(Event::Empty(enclosure))?;

        writer.write_event(Event::End(BytesEnd::new("item")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("channel")))?;
    writer.write_event(Event::End(BytesEnd::new("rss")))?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| PodcastError::Feed(format!("feed is not valid UTF-8: {e}")))
}

fn text_element(writer: &mut Writer<Vec<u8>>, name: &str, value: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}
