
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
    UInt64Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType, Table};
use tokio::runtime::Runtime;
use tracing::{debug, info};

use super::{EmbeddingRecord, SearchHit, VectorStore};
use crate::loader::Document;
use crate::{RagError, Result};

pub const TABLE_NAME: &str = "chunks";

/// LanceDB-backed store driven through a private tokio runtime
pub struct LanceStore {
    runtime: Runtime,
    connection: Connection,
    db_path: PathBuf,
    table: Option<Table>,
    vector_dimension: Option<usize>,
}

impl fmt::Debug for LanceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LanceStore")
            .field("db_path", &self.db_path)
            .field("table", &TABLE_NAME)
            .field("vector_dimension", &self.vector_dimension)
            .finish_non_exhaustive()
    }
}

impl LanceStore {
    /// Connect to the database in `dir` and drop any existing chunk table
    #[inline]
    pub fn create(dir: &Path) -> Result<Self> {
        let store = Self::connect(dir)?;
        store.runtime.block_on(store.drop_table_if_exists())?;
        Ok(store)
    }

    /// Open the chunk table previously written to `dir`
    #[inline]
    pub fn open(dir: &Path) -> Result<Self> {
        let mut store = Self::connect(dir)?;

        let table = store.runtime.block_on(async {
            let table_names = store
                .connection
                .table_names()
                .execute()
                .await
                .map_err(|e| RagError::Database(format!("Failed to list tables: {}", e)))?;
            if !table_names.iter().any(|name| name == TABLE_NAME) {
                return Err(RagError::NotFound(store.db_path.clone()));
            }

            store
                .connection
                .open_table(TABLE_NAME)
                .execute()
                .await
                .map_err(|e| RagError::Database(format!("Failed to open table: {}", e)))
        })?;

        let dimension = store.runtime.block_on(detect_vector_dimension(&table))?;
        info!(
            "Opened LanceDB table {} with {} dimensions",
            TABLE_NAME, dimension
        );

        store.table = Some(table);
        store.vector_dimension = Some(dimension);
        Ok(store)
    }

    #[inline]
    pub fn vector_dimension(&self) -> Option<usize> {
        self.vector_dimension
    }

    fn connect(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|e| {
            RagError::Database(format!("Failed to create vector database directory: {}", e))
        })?;
        let db_path = fs::canonicalize(dir)?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;

        debug!("Connecting to LanceDB at {}", db_path.display());
        let uri = db_path.to_string_lossy().into_owned();
        let connection = runtime
            .block_on(lancedb::connect(&uri).execute())
            .map_err(|e| RagError::Database(format!("Failed to connect to LanceDB: {}", e)))?;

        Ok(Self {
            runtime,
            connection,
            db_path,
            table: None,
            vector_dimension: None,
        })
    }

    async fn drop_table_if_exists(&self) -> Result<()> {
        let table_names =
            self.connection.table_names().execute().await.map_err(|e| {
                RagError::Database(format!("Failed to list tables for drop: {}", e))
            })?;

        if table_names.iter().any(|name| name == TABLE_NAME) {
            info!("Dropping existing {} table", TABLE_NAME);
            self.connection
                .drop_table(TABLE_NAME)
                .await
                .map_err(|e| RagError::Database(format!("Failed to drop table: {}", e)))?;
        }

        Ok(())
    }

    async fn insert(&mut self, records: &[EmbeddingRecord], vector_dim: usize) -> Result<()> {
        let record_batch = create_record_batch(records, vector_dim)?;

        let table = match &self.table {
            Some(table) => table.clone(),
            None => {
                info!(
                    "Creating {} table with {} dimensions",
                    TABLE_NAME, vector_dim
                );
                let table = self
                    .connection
                    .create_empty_table(TABLE_NAME, create_schema(vector_dim))
                    .execute()
                    .await
                    .map_err(|e| RagError::Database(format!("Failed to create table: {}", e)))?;
                self.table = Some(table.clone());
                self.vector_dimension = Some(vector_dim);
                table
            }
        };

        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to insert embeddings: {}", e)))?;

        Ok(())
    }

    async fn search_table(
        table: &Table,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchHit>> {
        let mut results = table
            .vector_search(query_vector)
            .map_err(|e| RagError::Database(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .distance_type(DistanceType::Cosine)
            .limit(limit)
            .execute()
            .await
            .map_err(|e| RagError::Database(format!("Failed to execute search: {}", e)))?;

        let mut hits = Vec::new();
        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| RagError::Database(format!("Failed to read result stream: {}", e)))?
        {
            hits.extend(parse_search_batch(&batch)?);
        }

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        Ok(hits)
    }
}

impl VectorStore for LanceStore {
    fn add(&mut self, records: Vec<EmbeddingRecord>) -> Result<()> {
        let Some(vector_dim) = self
            .vector_dimension
            .or_else(|| records.first().map(|r| r.vector.len()))
        else {
            debug!("No embeddings to store");
            return Ok(());
        };

        if let Some(bad) = records.iter().find(|r| r.vector.len() != vector_dim) {
            return Err(RagError::Database(format!(
                "Vector dimension mismatch: expected {}, got {}",
                vector_dim,
                bad.vector.len()
            )));
        }

        debug!("Storing batch of {} embeddings", records.len());
        let runtime = self.runtime.handle().clone();
        runtime.block_on(self.insert(&records, vector_dim))?;
        info!("Stored {} embeddings", records.len());
        Ok(())
    }

    fn search(&self, query: &[f32], limit: usize) -> Result<Vec<SearchHit>> {
        let Some(table) = &self.table else {
            return Ok(Vec::new());
        };
        if limit == 0 {
            return Ok(Vec::new());
        }

        debug!("Searching for similar vectors with limit: {}", limit);
        self.runtime
            .block_on(Self::search_table(table, query, limit))
    }

    fn count(&self) -> Result<usize> {
        let Some(table) = &self.table else {
            return Ok(0);
        };

        self.runtime
            .block_on(table.count_rows(None))
            .map_err(|e| RagError::Database(format!("Failed to count rows: {}", e)))
    }
}

fn create_schema(vector_dim: usize) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, true)),
                vector_dim as i32,
            ),
            false,
        ),
        Field::new("content", DataType::Utf8, false),
        Field::new("source", DataType::Utf8, false),
        Field::new("page", DataType::UInt32, false),
        Field::new("chunk_index", DataType::UInt64, false),
        Field::new("created_at", DataType::Utf8, false),
    ]))
}

fn create_record_batch(records: &[EmbeddingRecord], vector_dim: usize) -> Result<RecordBatch> {
    let len = records.len();

    let mut ids = Vec::with_capacity(len);
    let mut flat_values = Vec::with_capacity(len * vector_dim);
    let mut contents = Vec::with_capacity(len);
    let mut sources = Vec::with_capacity(len);
    let mut pages = Vec::with_capacity(len);
    let mut chunk_indices = Vec::with_capacity(len);
    let mut created_ats = Vec::with_capacity(len);

    for record in records {
        ids.push(record.id.as_str());
        flat_values.extend_from_slice(&record.vector);
        contents.push(record.document.text.as_str());
        sources.push(record.document.metadata.source.as_str());
        pages.push(record.document.metadata.page);
        chunk_indices.push(record.chunk_index);
        created_ats.push(record.created_at.as_str());
    }

    let field = Arc::new(Field::new("item", DataType::Float32, true));
    let vector_array = FixedSizeListArray::try_new(
        field,
        vector_dim as i32,
        Arc::new(Float32Array::from(flat_values)),
        None,
    )
    .map_err(|e| RagError::Database(format!("Failed to create vector array: {}", e)))?;

    let arrays: Vec<Arc<dyn Array>> = vec![
        Arc::new(StringArray::from(ids)),
        Arc::new(vector_array),
        Arc::new(StringArray::from(contents)),
        Arc::new(StringArray::from(sources)),
        Arc::new(UInt32Array::from(pages)),
        Arc::new(UInt64Array::from(chunk_indices)),
        Arc::new(StringArray::from(created_ats)),
    ];

    RecordBatch::try_new(create_schema(vector_dim), arrays)
        .map_err(|e| RagError::Database(format!("Failed to create record batch: {}", e)))
}

async fn detect_vector_dimension(table: &Table) -> Result<usize> {
    let schema = table
        .schema()
        .await
        .map_err(|e| RagError::Database(format!("Failed to get table schema: {}", e)))?;

    schema
        .fields()
        .iter()
        .find(|field| field.name() == "vector")
        .and_then(|field| match field.data_type() {
            DataType::FixedSizeList(_, size) => usize::try_from(*size).ok(),
            _ => None,
        })
        .ok_or_else(|| {
            RagError::Database("Could not find vector column or determine dimension".to_string())
        })
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| RagError::Database(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| RagError::Database(format!("Invalid {} column type", name)))
}

fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<SearchHit>> {
    let contents = string_column(batch, "content")?;
    let sources = string_column(batch, "source")?;

    let pages = batch
        .column_by_name("page")
        .ok_or_else(|| RagError::Database("Missing page column".to_string()))?
        .as_any()
        .downcast_ref::<UInt32Array>()
        .ok_or_else(|| RagError::Database("Invalid page column type".to_string()))?;

    let vectors = batch
        .column_by_name("vector")
        .ok_or_else(|| RagError::Database("Missing vector column".to_string()))?
        .as_any()
        .downcast_ref::<FixedSizeListArray>()
        .ok_or_else(|| RagError::Database("Invalid vector column type".to_string()))?;

    let distances = batch
        .column_by_name("_distance")
        .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

    let mut hits = Vec::with_capacity(batch.num_rows());
    for row in 0..batch.num_rows() {
        let vector = vectors.value(row);
        let embedding = vector
            .as_any()
            .downcast_ref::<Float32Array>()
            .ok_or_else(|| RagError::Database("Invalid vector item type".to_string()))?
            .values()
            .to_vec();

        let distance = distances.map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

        hits.push(SearchHit {
            document: Document::new(contents.value(row), sources.value(row), pages.value(row)),
            embedding,
            distance,
        });
    }

    Ok(hits)
}
