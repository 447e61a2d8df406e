//! Embedded knowledge base for summarized papers.
//!
//! LanceDB-backed storage: one `papers` table keyed by a content-derived id,
//! with a fixed-size embedding column for semantic search. No external
//! database server is required.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use papyra_kb::{Database, PaperStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::open("./data/papyra.db").await?;
//!     db.initialize().await?;
//!     let papers = PaperStore::new(Arc::new(db));
//!     println!("{} papers stored", papers.count().await?);
//!     Ok(())
//! }
//! ```

pub mod database;
pub mod error;
pub mod schema;
pub mod schema_arrow;
pub mod store;

pub use database::Database;
pub use error::{KbError, Result};
pub use schema::{doc_id, sections_json, PaperRecord, EMBEDDING_DIM, TABLE_PAPERS};
pub use store::PaperStore;
