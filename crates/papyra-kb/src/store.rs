//! Paper repository over the embedded store.

use std::sync::Arc;

use arrow_array::RecordBatchIterator;
use futures::StreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use tracing::debug;

use crate::database::Database;
use crate::error::Result;
use crate::schema::PaperRecord;
use crate::schema_arrow::{paper_to_record, record_to_paper};

#[derive(Clone)]
pub struct PaperStore {
    db: Arc<Database>,
}

impl PaperStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Whether a record with this id already exists. Used to skip papers
    /// that were already ingested.
    pub async fn is_processed(&self, id: &str) -> Result<bool> {
        let table = self.db.papers_table().await?;
        let escaped = id.replace('\'', "''");
        let count = table
            .count_rows(Some(format!("id = '{escaped}'")))
            .await?;
        Ok(count > 0)
    }

    /// Insert or update by id. Re-ingesting a paper replaces its row.
    pub async fn upsert(&self, paper: &PaperRecord) -> Result<()> {
        let table = self.db.papers_table().await?;

        let record = paper_to_record(paper)?;
        let schema = record.schema();
        let iter = RecordBatchIterator::new(vec![Ok(record)], schema);

        let mut builder = table.merge_insert(&["id"]);
        builder.when_matched_update_all(None);
        builder.when_not_matched_insert_all();
        builder.execute(Box::new(iter)).await?;

        debug!(id = %paper.id, arxiv_id = %paper.arxiv_id, "upserted paper");
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Option<PaperRecord>> {
        let table = self.db.papers_table().await?;
        let escaped = id.replace('\'', "''");

        let mut stream = table
            .query()
            .only_if(&format!("id = '{escaped}'"))
            .execute()
            .await?;

        if let Some(batch) = stream.next().await {
            let batch = batch?;
            if batch.num_rows() > 0 {
                return Ok(Some(record_to_paper(&batch, 0)?));
            }
        }

        Ok(None)
    }

    pub async fn get_by_arxiv_id(&self, arxiv_id: &str) -> Result<Option<PaperRecord>> {
        let table = self.db.papers_table().await?;
        let escaped = arxiv_id.replace('\'', "''");

        let mut stream = table
            .query()
            .only_if(&format!("arxiv_id = '{escaped}'"))
            .execute()
            .await?;

        if let Some(batch) = stream.next().await {
            let batch = batch?;
            if batch.num_rows() > 0 {
                return Ok(Some(record_to_paper(&batch, 0)?));
            }
        }

        Ok(None)
    }

    /// Top-k nearest papers to the query vector. Rows without an embedding
    /// never match a vector search.
    pub async fn search_similar(&self, query_vector: &[f32], k: usize) -> Result<Vec<PaperRecord>> {
        let table = self.db.papers_table().await?;

        let mut stream = table
            .vector_search(query_vector.to_vec())?
            .limit(k)
            .execute()
            .await?;

        let mut papers = Vec::new();
        while let Some(batch) = stream.next().await {
            let batch = batch?;
            for i in 0..batch.num_rows() {
                papers.push(record_to_paper(&batch, i)?);
            }
        }

        Ok(papers)
    }

    pub async fn list(&self, offset: usize, limit: usize) -> Result<Vec<PaperRecord>> {
        let table = self.db.papers_table().await?;

        let mut stream = table
            .query()
            .offset(offset)
            .limit(limit)
            .execute()
            .await?;

        let mut papers = Vec::new();
        while let Some(batch) = stream.next().await {
            let batch = batch?;
            for i in 0..batch.num_rows() {
                papers.push(record_to_paper(&batch, i)?);
            }
        }

        Ok(papers)
    }

    pub async fn count(&self) -> Result<u64> {
        let table = self.db.papers_table().await?;
        Ok(table.count_rows(None).await? as u64)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let table = self.db.papers_table().await?;
        let escaped = id.replace('\'', "''");
        table.delete(&format!("id = '{escaped}'")).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{doc_id, EMBEDDING_DIM};
    use chrono::Utc;

    async fn open_store(dir: &std::path::Path) -> PaperStore {
        let db = Database::open(dir.join("kb")).await.unwrap();
        db.initialize().await.unwrap();
        PaperStore::new(Arc::new(db))
    }

    fn paper(arxiv_id: &str, summary: &str, first: f32) -> PaperRecord {
        let mut embedding = vec![0.0_f32; EMBEDDING_DIM];
        embedding[0] = first;
        PaperRecord {
            id: doc_id(arxiv_id),
            arxiv_id: arxiv_id.to_string(),
            title: format!("Paper {arxiv_id}"),
            authors: "A. Author".to_string(),
            abstract_text: "An abstract.".to_string(),
            summary: summary.to_string(),
            summary_method: "full_text_single_pass".to_string(),
            sections: None,
            published_at: Some(Utc::now()),
            pdf_url: None,
            ingested_at: Utc::now(),
            embedding: Some(embedding),
        }
    }

    #[tokio::test]
    async fn test_upsert_and_get_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path()).await;

        let p = paper("2401.00001", "first summary", 1.0);
        store.upsert(&p).await.unwrap();

        let fetched = store.get(&p.id).await.unwrap().unwrap();
        assert_eq!(fetched.arxiv_id, "2401.00001");
        assert_eq!(fetched.summary, "first summary");

        let by_arxiv = store.get_by_arxiv_id("2401.00001").await.unwrap().unwrap();
        assert_eq!(by_arxiv.id, p.id);
    }

    #[tokio::test]
    async fn test_is_processed_flips_after_upsert() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path()).await;

        let p = paper("2402.11111", "s", 1.0);
        assert!(!store.is_processed(&p.id).await.unwrap());
        store.upsert(&p).await.unwrap();
        assert!(store.is_processed(&p.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_upsert_same_id_replaces_row() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path()).await;

        let mut p = paper("2403.22222", "old", 1.0);
        store.upsert(&p).await.unwrap();

        p.summary = "new".to_string();
        store.upsert(&p).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.get(&p.id).await.unwrap().unwrap().summary, "new");
    }

    #[tokio::test]
    async fn test_search_similar_orders_by_distance() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path()).await;

        store.upsert(&paper("1", "near", 1.0)).await.unwrap();
        store.upsert(&paper("2", "far", 100.0)).await.unwrap();

        let mut query = vec![0.0_f32; EMBEDDING_DIM];
        query[0] = 1.0;

        let results = store.search_similar(&query, 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].summary, "near");
    }

    #[tokio::test]
    async fn test_missing_paper_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path()).await;
        assert!(store.get(&doc_id("nope")).await.unwrap().is_none());
    }
}
