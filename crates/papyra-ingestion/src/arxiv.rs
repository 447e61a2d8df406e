//! arXiv Atom API client.
//!
//! Endpoint used:
//!   query: https://export.arxiv.org/api/query
//!
//! Results arrive as an Atom feed; entries carry the abstract in
//! `<summary>`, one `<author><name>` per author, and the PDF location as a
//! `<link title="pdf">` element.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, instrument};

use papyra_common::SandboxClient;

use crate::models::{PaperMetadata, PaperSource};

const QUERY_URL: &str = "https://export.arxiv.org/api/query";

pub struct ArxivClient {
    client: SandboxClient,
}

impl ArxivClient {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            client: SandboxClient::new()?,
        })
    }

    async fn query(&self, params: &[(&str, String)]) -> anyhow::Result<Vec<PaperMetadata>> {
        let xml = self
            .client
            .get(QUERY_URL)?
            .query(params)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_arxiv_atom(&xml)
    }
}

#[async_trait]
impl PaperSource for ArxivClient {
    #[instrument(skip(self))]
    async fn search(&self, query: &str, max_results: usize) -> anyhow::Result<Vec<PaperMetadata>> {
        let params = [
            ("search_query", format!("all:{query}")),
            ("start", "0".to_string()),
            ("max_results", max_results.to_string()),
            ("sortBy", "submittedDate".to_string()),
            ("sortOrder", "descending".to_string()),
        ];
        let papers = self.query(&params).await?;
        debug!(n = papers.len(), "arXiv search returned entries");
        Ok(papers)
    }

    #[instrument(skip(self))]
    async fn fetch_by_ids(&self, ids: &[String]) -> anyhow::Result<Vec<PaperMetadata>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let params = [
            ("id_list", ids.join(",")),
            ("max_results", ids.len().to_string()),
        ];
        self.query(&params).await
    }
}

/// Extract the bare identifier from an entry `<id>` URL, dropping the
/// version suffix: "http://arxiv.org/abs/2401.00001v2" -> "2401.00001".
fn arxiv_id_from_url(url: &str) -> String {
    let id = url.rsplit("/abs/").next().unwrap_or(url);
    strip_version(id).to_string()
}

fn strip_version(id: &str) -> &str {
    match id.rfind('v') {
        Some(pos) if id[pos + 1..].chars().all(|c| c.is_ascii_digit()) && pos + 1 < id.len() => {
            &id[..pos]
        }
        _ => id,
    }
}

/// Collapse the feed's hard-wrapped whitespace into single spaces.
fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse an arXiv Atom feed into a metadata list.
pub fn parse_arxiv_atom(xml: &str) -> anyhow::Result<Vec<PaperMetadata>> {
    let mut papers = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut current: Option<PaperMetadata> = None;
    let mut in_id = false;
    let mut in_title = false;
    let mut in_summary = false;
    let mut in_author = false;
    let mut in_name = false;
    let mut in_published = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.name().as_ref() {
                b"entry" => {
                    current = Some(PaperMetadata {
                        arxiv_id: String::new(),
                        title: String::new(),
                        abstract_text: String::new(),
                        authors: vec![],
                        published_at: None,
                        pdf_url: None,
                        categories: vec![],
                    });
                }
                b"id" => in_id = current.is_some(),
                b"title" => in_title = current.is_some(),
                b"summary" => in_summary = current.is_some(),
                b"author" => in_author = current.is_some(),
                b"name" => in_name = in_author,
                b"published" => in_published = current.is_some(),
                _ => {}
            },
            Ok(Event::Empty(ref e)) => {
                let Some(ref mut paper) = current else {
                    buf.clear();
                    continue;
                };
                match e.name().as_ref() {
                    b"link" => {
                        let mut href = None;
                        let mut is_pdf = false;
                        for attr in e.attributes().flatten() {
                            let value = attr.unescape_value()?.into_owned();
                            match attr.key.as_ref() {
                                b"href" => href = Some(value),
                                b"title" if value == "pdf" => is_pdf = true,
                                b"type" if value == "application/pdf" => is_pdf = true,
                                _ => {}
                            }
                        }
                        if is_pdf {
                            paper.pdf_url = href;
                        }
                    }
                    b"category" => {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"term" {
                                paper.categories.push(attr.unescape_value()?.into_owned());
                            }
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(ref t)) => {
                let Some(ref mut paper) = current else {
                    buf.clear();
                    continue;
                };
                let text = t.unescape()?.into_owned();
                if in_id {
                    paper.arxiv_id = arxiv_id_from_url(&text);
                } else if in_title {
                    paper.title = normalize_ws(&text);
                } else if in_summary {
                    paper.abstract_text = normalize_ws(&text);
                } else if in_name {
                    paper.authors.push(text.trim().to_string());
                } else if in_published {
                    paper.published_at = DateTime::parse_from_rfc3339(text.trim())
                        .ok()
                        .map(|dt| dt.with_timezone(&Utc));
                }
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"entry" => {
                    if let Some(paper) = current.take() {
                        if !paper.arxiv_id.is_empty() {
                            papers.push(paper);
                        }
                    }
                }
                b"id" => in_id = false,
                b"title" => in_title = false,
                b"summary" => in_summary = false,
                b"author" => in_author = false,
                b"name" => in_name = false,
                b"published" => in_published = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow::anyhow!("Atom parse error: {e}")),
            _ => {}
        }
        buf.clear();
    }

    Ok(papers)
}
