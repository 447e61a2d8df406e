//! Database connection and table management.

use std::path::Path;

use arrow_array::RecordBatchIterator;
use lancedb::connection::Connection;
use tracing::debug;

use crate::error::Result;
use crate::schema::TABLE_PAPERS;
use crate::schema_arrow::paper_schema;

/// Embedded LanceDB handle. Cloning shares the underlying connection.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
    path: String,
}

impl Database {
    /// Open or create a database at the specified path.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        if !path.as_ref().exists() {
            std::fs::create_dir_all(path.as_ref())?;
        }

        let conn = lancedb::connect(&path_str).execute().await?;
        debug!(path = %path_str, "opened knowledge base");

        Ok(Self { conn, path: path_str })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Create the papers table if it does not exist. LanceDB needs a
    /// schema-bearing (possibly empty) batch iterator to create a table.
    pub async fn initialize(&self) -> Result<()> {
        if !self.table_exists(TABLE_PAPERS).await? {
            let schema = paper_schema();
            let empty_iter = RecordBatchIterator::new(vec![], schema);
            self.conn
                .create_table(TABLE_PAPERS, empty_iter)
                .execute()
                .await?;
            debug!(table = TABLE_PAPERS, "created table");
        }
        Ok(())
    }

    pub async fn table_exists(&self, name: &str) -> Result<bool> {
        let tables = self.conn.table_names().execute().await?;
        Ok(tables.contains(&name.to_string()))
    }

    /// Create a vector index over the embedding column. Only worthwhile once
    /// the table holds enough rows for ANN to beat a flat scan.
    pub async fn create_vector_index(&self) -> Result<()> {
        let table = self.conn.open_table(TABLE_PAPERS).execute().await?;
        table
            .create_index(&["embedding"], lancedb::index::Index::Auto)
            .execute()
            .await?;
        Ok(())
    }

    pub async fn optimize(&self) -> Result<()> {
        let table = self.conn.open_table(TABLE_PAPERS).execute().await?;
        table
            .optimize(lancedb::table::OptimizeAction::default())
            .await?;
        Ok(())
    }

    pub(crate) async fn papers_table(&self) -> Result<lancedb::table::Table> {
        Ok(self.conn.open_table(TABLE_PAPERS).execute().await?)
    }
}
