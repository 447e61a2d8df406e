//! Zotero item JSON construction.
//!
//! The write API takes an array of item objects; field names follow the
//! Zotero schema for `journalArticle` and `attachment` types.

use serde_json::{json, Value};

use papyra_kb::PaperRecord;

/// Split one "First Middle Last" author name into Zotero creator parts.
/// A single token becomes a bare last name.
pub(crate) fn creator(name: &str) -> Value {
    let name = name.trim();
    match name.rsplit_once(' ') {
        Some((first, last)) => json!({
            "creatorType": "author",
            "firstName": first.trim(),
            "lastName": last,
        }),
        None => json!({
            "creatorType": "author",
            "name": name,
        }),
    }
}

/// Build the `journalArticle` item for a summarized paper. The summary goes
/// into the abstract field so it is readable inside Zotero itself.
pub(crate) fn journal_article(paper: &PaperRecord) -> Value {
    let creators: Vec<Value> = paper
        .authors
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(creator)
        .collect();

    json!({
        "itemType": "journalArticle",
        "title": paper.title,
        "creators": creators,
        "abstractNote": paper.summary,
        "date": paper.published_at.map(|dt| dt.format("%Y-%m-%d").to_string()).unwrap_or_default(),
        "url": format!("https://arxiv.org/abs/{}", paper.arxiv_id),
        "archive": "arXiv",
        "archiveLocation": paper.arxiv_id,
        "extra": format!("arXiv:{}\nSummary method: {}", paper.arxiv_id, paper.summary_method),
        "tags": [{"tag": "papyra"}],
    })
}

/// Build a linked-URL attachment pointing at the paper's PDF. Linking keeps
/// the library lightweight; Zotero fetches the file on demand.
pub(crate) fn pdf_attachment(parent_key: &str, pdf_url: &str) -> Value {
    json!({
        "itemType": "attachment",
        "linkMode": "linked_url",
        "parentItem": parent_key,
        "title": "arXiv PDF",
        "url": pdf_url,
        "contentType": "application/pdf",
    })
}
