//! Zotero Web API v3 client.
//!
//! Endpoints used:
//!   search: GET  https://api.zotero.org/users/{id}/items?q=...
//!   write:  POST https://api.zotero.org/users/{id}/items

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use papyra_common::SandboxClient;
use papyra_kb::PaperRecord;

use crate::item::{journal_article, pdf_attachment};
use crate::{ZoteroError, Result};

const API_BASE: &str = "https://api.zotero.org";
const API_VERSION: &str = "3";

pub struct ZoteroClient {
    client: SandboxClient,
    api_key: String,
    user_id: String,
}

impl ZoteroClient {
    pub fn new(api_key: impl Into<String>, user_id: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: SandboxClient::new()?,
            api_key: api_key.into(),
            user_id: user_id.into(),
        })
    }

    fn items_url(&self) -> String {
        format!("{API_BASE}/users/{}/items", self.user_id)
    }

    /// Look up an existing library item for this arXiv id. Returns the item
    /// key when the paper was mirrored before.
    #[instrument(skip(self))]
    pub async fn find_existing(&self, arxiv_id: &str) -> Result<Option<String>> {
        let resp = self
            .client
            .get(&self.items_url())?
            .header("Zotero-API-Version", API_VERSION)
            .header("Zotero-API-Key", &self.api_key)
            .query(&[
                ("q", arxiv_id),
                ("qmode", "everything"),
                ("itemType", "journalArticle"),
            ])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ZoteroError::Api {
                status: status.as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }

        let items: Vec<Value> = resp.json().await?;
        let key = items
            .first()
            .and_then(|item| item["key"].as_str())
            .map(String::from);

        debug!(arxiv_id, found = key.is_some(), "searched library");
        Ok(key)
    }

    /// Mirror one summarized paper into the library: a `journalArticle` item
    /// plus a linked-URL attachment for the PDF when one is known. Returns
    /// the new item key. Skips papers that are already present.
    #[instrument(skip(self, paper), fields(arxiv_id = %paper.arxiv_id))]
    pub async fn add_paper(&self, paper: &PaperRecord) -> Result<String> {
        if let Some(key) = self.find_existing(&paper.arxiv_id).await? {
            info!(key, "paper already in library, skipping");
            return Ok(key);
        }

        let key = self.write_items(&[journal_article(paper)]).await?;
        info!(key, "created library item");

        // Attachment failure is not worth losing the item over
        if let Some(ref pdf_url) = paper.pdf_url {
            if let Err(e) = self.write_items(&[pdf_attachment(&key, pdf_url)]).await {
                warn!(error = %e, "failed to attach PDF link");
            }
        }

        Ok(key)
    }

    /// POST an item batch and return the key of the first created item.
    async fn write_items(&self, items: &[Value]) -> Result<String> {
        let resp = self
            .client
            .post(&self.items_url())?
            .header("Zotero-API-Version", API_VERSION)
            .header("Zotero-API-Key", &self.api_key)
            .json(&items)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(ZoteroError::Api {
                status: status.as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }

        let body: Value = resp.json().await?;
        parse_write_response(&body)
    }
}

/// Pull the first created item key out of a write response. Per-item
/// failures arrive with a 200 status and a populated `failed` map.
pub(crate) fn parse_write_response(body: &Value) -> Result<String> {
    if let Some(failed) = body["failed"].as_object() {
        if let Some((_, failure)) = failed.iter().next() {
            return Err(ZoteroError::ItemRejected(
                failure["message"]
                    .as_str()
                    .unwrap_or("unknown rejection")
                    .to_string(),
            ));
        }
    }

    body["successful"]["0"]["key"]
        .as_str()
        .map(String::from)
        .ok_or_else(|| ZoteroError::ItemRejected("write response carried no item key".to_string()))
}
