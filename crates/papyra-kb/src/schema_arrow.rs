//! Arrow record batch conversion for LanceDB storage.

use std::sync::Arc;

use arrow_array::{Array, FixedSizeListArray, Float32Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};

use crate::error::{KbError, Result};
use crate::schema::{PaperRecord, EMBEDDING_DIM};

pub fn paper_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("arxiv_id", DataType::Utf8, false),
        Field::new("title", DataType::Utf8, false),
        Field::new("authors", DataType::Utf8, false),
        Field::new("abstract_text", DataType::Utf8, false),
        Field::new("summary", DataType::Utf8, false),
        Field::new("summary_method", DataType::Utf8, false),
        Field::new("sections", DataType::Utf8, true),
        Field::new("published_at", DataType::Utf8, true),
        Field::new("pdf_url", DataType::Utf8, true),
        Field::new("ingested_at", DataType::Utf8, false),
        Field::new(
            "embedding",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, false)),
                EMBEDDING_DIM as i32,
            ),
            true,
        ),
    ]))
}

pub fn paper_to_record(paper: &PaperRecord) -> Result<RecordBatch> {
    if let Some(ref emb) = paper.embedding {
        if emb.len() != EMBEDDING_DIM {
            return Err(KbError::InvalidEmbeddingDimension {
                expected: EMBEDDING_DIM,
                actual: emb.len(),
            });
        }
    }

    let schema = paper_schema();

    let id = StringArray::from(vec![paper.id.as_str()]);
    let arxiv_id = StringArray::from(vec![paper.arxiv_id.as_str()]);
    let title = StringArray::from(vec![paper.title.as_str()]);
    let authors = StringArray::from(vec![paper.authors.as_str()]);
    let abstract_text = StringArray::from(vec![paper.abstract_text.as_str()]);
    let summary = StringArray::from(vec![paper.summary.as_str()]);
    let summary_method = StringArray::from(vec![paper.summary_method.as_str()]);
    let sections = StringArray::from(vec![paper.sections.as_deref()]);
    let published_at = StringArray::from(vec![paper.published_at.map(|dt| dt.to_rfc3339())]);
    let pdf_url = StringArray::from(vec![paper.pdf_url.as_deref()]);
    let ingested_at = StringArray::from(vec![paper.ingested_at.to_rfc3339()]);

    let embedding: Arc<dyn Array> = if let Some(ref emb) = paper.embedding {
        let values = Float32Array::from(emb.clone());
        let field = Arc::new(Field::new("item", DataType::Float32, false));
        Arc::new(
            FixedSizeListArray::try_new(field, EMBEDDING_DIM as i32, Arc::new(values), None)
                .map_err(|e| KbError::Arrow(e.to_string()))?,
        )
    } else {
        Arc::new(FixedSizeListArray::new_null(
            Arc::new(Field::new("item", DataType::Float32, false)),
            EMBEDDING_DIM as i32,
            1,
        ))
    };

    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(id) as Arc<dyn Array>,
            Arc::new(arxiv_id),
            Arc::new(title),
            Arc::new(authors),
            Arc::new(abstract_text),
            Arc::new(summary),
            Arc::new(summary_method),
            Arc::new(sections),
            Arc::new(published_at),
            Arc::new(pdf_url),
            Arc::new(ingested_at),
            embedding,
        ],
    )
    .map_err(|e| KbError::Arrow(e.to_string()))
}

pub fn record_to_paper(batch: &RecordBatch, row: usize) -> Result<PaperRecord> {
    let get_string = |col: usize| -> Result<String> {
        let arr = batch
            .column(col)
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| KbError::Arrow(format!("column {col} is not a string column")))?;
        Ok(arr.value(row).to_string())
    };

    let get_opt_string = |col: usize| -> Result<Option<String>> {
        let arr = batch
            .column(col)
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| KbError::Arrow(format!("column {col} is not a string column")))?;
        if arr.is_null(row) {
            Ok(None)
        } else {
            Ok(Some(arr.value(row).to_string()))
        }
    };

    let embedding = {
        let arr = batch.column(11);
        if arr.is_null(row) {
            None
        } else {
            let list_arr = arr
                .as_any()
                .downcast_ref::<FixedSizeListArray>()
                .ok_or_else(|| KbError::Arrow("embedding column is not a list".to_string()))?;
            if list_arr.is_null(row) {
                None
            } else {
                let values = list_arr.value(row);
                let float_arr = values
                    .as_any()
                    .downcast_ref::<Float32Array>()
                    .ok_or_else(|| KbError::Arrow("embedding items are not f32".to_string()))?;
                Some(float_arr.values().to_vec())
            }
        }
    };

    Ok(PaperRecord {
        id: get_string(0)?,
        arxiv_id: get_string(1)?,
        title: get_string(2)?,
        authors: get_string(3)?,
        abstract_text: get_string(4)?,
        summary: get_string(5)?,
        summary_method: get_string(6)?,
        sections: get_opt_string(7)?,
        published_at: get_opt_string(8)?
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&chrono::Utc)),
        pdf_url: get_opt_string(9)?,
        ingested_at: chrono::DateTime::parse_from_rfc3339(&get_string(10)?)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .unwrap_or_else(|_| chrono::Utc::now()),
        embedding,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(embedding: Option<Vec<f32>>) -> PaperRecord {
        PaperRecord {
            id: crate::schema::doc_id("2401.00001"),
            arxiv_id: "2401.00001".to_string(),
            title: "A Paper".to_string(),
            authors: "A. Author; B. Author".to_string(),
            abstract_text: "About things.".to_string(),
            summary: "It summarizes.".to_string(),
            summary_method: "full_text_single_pass".to_string(),
            sections: Some("[\"introduction\"]".to_string()),
            published_at: Some(Utc::now()),
            pdf_url: Some("https://arxiv.org/pdf/2401.00001".to_string()),
            ingested_at: Utc::now(),
            embedding,
        }
    }

    #[test]
    fn test_roundtrip_with_embedding() {
        let paper = record(Some(vec![0.5; EMBEDDING_DIM]));
        let batch = paper_to_record(&paper).unwrap();
        let back = record_to_paper(&batch, 0).unwrap();
        assert_eq!(back.id, paper.id);
        assert_eq!(back.summary_method, "full_text_single_pass");
        assert_eq!(back.embedding.unwrap().len(), EMBEDDING_DIM);
    }

    #[test]
    fn test_roundtrip_without_embedding() {
        let paper = record(None);
        let batch = paper_to_record(&paper).unwrap();
        let back = record_to_paper(&batch, 0).unwrap();
        assert!(back.embedding.is_none());
        assert_eq!(back.title, "A Paper");
    }

    #[test]
    fn test_wrong_embedding_dim_is_rejected() {
        let paper = record(Some(vec![0.5; 3]));
        let err = paper_to_record(&paper).unwrap_err();
        assert!(matches!(err, KbError::InvalidEmbeddingDimension { expected, actual: 3 } if expected == EMBEDDING_DIM));
    }
}
