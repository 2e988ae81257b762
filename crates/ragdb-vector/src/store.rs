//! LanceDB-backed vector index.
//!
//! Chunks are upserted by `id` via merge-insert, searched with cosine
//! distance (similarity surfaces as `1 - distance`), and filtered with SQL
//! predicates where the condition targets a dedicated column. Conditions on
//! open metadata keys are applied in Rust after the scan, since metadata is
//! stored as a JSON string column.

use std::sync::Arc;

use anyhow::Result;
use arrow_array::{
    FixedSizeListArray, Float32Array, Int32Array, RecordBatch, RecordBatchIterator, StringArray,
};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase, Select};
use lancedb::{connect, Connection, DistanceType};

use ragdb_core::traits::VectorIndex;
use ragdb_core::types::{
    CollectionInfo, DocumentChunk, FieldCondition, Metadata, PayloadFilter, ScoredPoint,
};

use crate::schema::chunk_schema;

const PAYLOAD_COLUMNS: [&str; 5] = ["id", "content", "source_file", "chunk_index", "metadata"];

pub struct LanceVectorIndex {
    db: Connection,
    table: String,
    dim: i32,
}

impl LanceVectorIndex {
    /// Connect to (or create) the database at `uri` and ensure the chunk
    /// table exists.
    pub async fn open(uri: &str, table: &str, dim: usize) -> Result<Self> {
        let db = connect(uri).execute().await?;
        let index = Self {
            db,
            table: table.to_string(),
            dim: dim as i32,
        };
        index.ensure_table().await?;
        Ok(index)
    }

    async fn ensure_table(&self) -> Result<()> {
        let names = self.db.table_names().execute().await?;
        if names.contains(&self.table) {
            return Ok(());
        }
        let schema = chunk_schema(self.dim);
        let iter = RecordBatchIterator::new(vec![].into_iter(), schema);
        self.db
            .create_table(&self.table, Box::new(iter))
            .execute()
            .await?;
        tracing::info!(table = %self.table, dim = self.dim, "created chunk table");
        Ok(())
    }

    fn chunks_to_batch(
        &self,
        chunks: &[DocumentChunk],
        embeddings: &[Vec<f32>],
    ) -> Result<RecordBatch> {
        let schema = chunk_schema(self.dim);
        let mut ids = Vec::with_capacity(chunks.len());
        let mut contents = Vec::with_capacity(chunks.len());
        let mut sources = Vec::with_capacity(chunks.len());
        let mut indices = Vec::with_capacity(chunks.len());
        let mut metadatas = Vec::with_capacity(chunks.len());
        let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(chunks.len());
        for (chunk, vector) in chunks.iter().zip(embeddings.iter()) {
            if vector.len() != self.dim as usize {
                anyhow::bail!(
                    "embedding for chunk {} has dimension {}, table expects {}",
                    chunk.id,
                    vector.len(),
                    self.dim
                );
            }
            ids.push(chunk.id.clone());
            contents.push(chunk.content.clone());
            sources.push(chunk.source_file.clone());
            indices.push(chunk.chunk_index as i32);
            metadatas.push(serde_json::to_string(&chunk.metadata)?);
            vectors.push(Some(vector.iter().copied().map(Some).collect()));
        }
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(ids)),
                Arc::new(StringArray::from(contents)),
                Arc::new(StringArray::from(sources)),
                Arc::new(Int32Array::from(indices)),
                Arc::new(StringArray::from(metadatas)),
                Arc::new(FixedSizeListArray::from_iter_primitive::<
                    arrow_array::types::Float32Type,
                    _,
                    _,
                >(vectors.into_iter(), self.dim)),
            ],
        )?;
        Ok(batch)
    }
}

#[async_trait]
impl VectorIndex for LanceVectorIndex {
    async fn upsert(&self, chunks: &[DocumentChunk], embeddings: &[Vec<f32>]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        if chunks.len() != embeddings.len() {
            anyhow::bail!(
                "chunks and embeddings length mismatch: {} vs {}",
                chunks.len(),
                embeddings.len()
            );
        }
        let batch = self.chunks_to_batch(chunks, embeddings)?;
        let schema = batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
        let table = self.db.open_table(&self.table).execute().await?;
        let mut mi = table.merge_insert(&["id"]);
        mi.when_matched_update_all(None).when_not_matched_insert_all();
        let _ = mi.execute(reader).await?;
        Ok(())
    }

    async fn search(
        &self,
        vector: &[f32],
        limit: usize,
        score_threshold: f32,
        filter: Option<&PayloadFilter>,
    ) -> Result<Vec<ScoredPoint>> {
        let table = self.db.open_table(&self.table).execute().await?;
        let needs_post_filter = filter.is_some_and(has_metadata_conditions);
        // over-fetch when part of the filter can only be applied after the scan
        let fetch = if needs_post_filter { limit * 10 } else { limit };

        let mut query = table
            .vector_search(vector.to_vec())?
            .distance_type(DistanceType::Cosine)
            .limit(fetch);
        if let Some(sql) = filter.and_then(filter_to_sql) {
            query = query.only_if(sql);
        }

        let mut stream = query.execute().await?;
        let mut points = Vec::new();
        while let Some(batch) = stream.try_next().await? {
            let distances = batch
                .column_by_name("_distance")
                .and_then(|c| c.as_any().downcast_ref::<Float32Array>())
                .ok_or_else(|| anyhow::anyhow!("_distance column missing from search result"))?
                .clone();
            for i in 0..batch.num_rows() {
                let chunk = chunk_at(&batch, i)?;
                if let Some(f) = filter {
                    if !f.matches(&chunk) {
                        continue;
                    }
                }
                let score = 1.0 - distances.value(i);
                if score < score_threshold {
                    continue;
                }
                points.push(ScoredPoint { chunk, score });
            }
        }
        points.truncate(limit);
        Ok(points)
    }

    async fn delete_by_filter(&self, filter: &PayloadFilter) -> Result<()> {
        if filter.is_empty() {
            anyhow::bail!("refusing to delete without any filter condition");
        }
        let table = self.db.open_table(&self.table).execute().await?;
        if !has_metadata_conditions(filter) {
            let sql = filter_to_sql(filter)
                .ok_or_else(|| anyhow::anyhow!("filter has no usable conditions"))?;
            let _ = table.delete(&sql).await?;
            return Ok(());
        }
        // metadata conditions require a scan to resolve matching ids
        let mut stream = table
            .query()
            .select(Select::columns(&PAYLOAD_COLUMNS))
            .execute()
            .await?;
        let mut ids = Vec::new();
        while let Some(batch) = stream.try_next().await? {
            for i in 0..batch.num_rows() {
                let chunk = chunk_at(&batch, i)?;
                if filter.matches(&chunk) {
                    ids.push(chunk.id);
                }
            }
        }
        if ids.is_empty() {
            return Ok(());
        }
        let quoted: Vec<String> = ids
            .iter()
            .map(|id| format!("'{}'", id.replace('\'', "''")))
            .collect();
        let _ = table
            .delete(&format!("id IN ({})", quoted.join(", ")))
            .await?;
        Ok(())
    }

    async fn scroll(&self, limit: usize) -> Result<Vec<DocumentChunk>> {
        let table = self.db.open_table(&self.table).execute().await?;
        let mut stream = table
            .query()
            .select(Select::columns(&PAYLOAD_COLUMNS))
            .limit(limit)
            .execute()
            .await?;
        let mut chunks = Vec::new();
        while let Some(batch) = stream.try_next().await? {
            for i in 0..batch.num_rows() {
                chunks.push(chunk_at(&batch, i)?);
            }
        }
        Ok(chunks)
    }

    async fn collection_info(&self) -> Result<CollectionInfo> {
        let table = self.db.open_table(&self.table).execute().await?;
        let vector_count = table.count_rows(None).await?;
        Ok(CollectionInfo {
            vector_count,
            status: "ready".to_string(),
        })
    }
}

fn string_at(batch: &RecordBatch, name: &str, i: usize) -> Result<String> {
    let column = batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| anyhow::anyhow!("column {name} missing or not utf8"))?;
    Ok(column.value(i).to_string())
}

fn chunk_at(batch: &RecordBatch, i: usize) -> Result<DocumentChunk> {
    let chunk_index = batch
        .column_by_name("chunk_index")
        .and_then(|c| c.as_any().downcast_ref::<Int32Array>())
        .ok_or_else(|| anyhow::anyhow!("column chunk_index missing or not int32"))?
        .value(i) as usize;
    let metadata: Metadata =
        serde_json::from_str(&string_at(batch, "metadata", i)?).unwrap_or_default();
    Ok(DocumentChunk {
        id: string_at(batch, "id", i)?,
        content: string_at(batch, "content", i)?,
        source_file: string_at(batch, "source_file", i)?,
        chunk_index,
        metadata,
        embedding: None,
    })
}

fn is_column_condition(cond: &FieldCondition) -> bool {
    matches!(cond.field.as_str(), "id" | "source_file" | "chunk_index")
}

fn has_metadata_conditions(filter: &PayloadFilter) -> bool {
    filter.conditions.iter().any(|c| !is_column_condition(c))
}

fn column_predicate(cond: &FieldCondition) -> Option<String> {
    match cond.field.as_str() {
        "id" | "source_file" => cond
            .value
            .as_str()
            .map(|s| format!("{} = '{}'", cond.field, s.replace('\'', "''"))),
        "chunk_index" => cond.value.as_u64().map(|n| format!("chunk_index = {n}")),
        _ => None,
    }
}

fn filter_to_sql(filter: &PayloadFilter) -> Option<String> {
    let predicates: Vec<String> = filter
        .conditions
        .iter()
        .filter(|c| is_column_condition(c))
        .filter_map(column_predicate)
        .collect();
    if predicates.is_empty() {
        None
    } else {
        Some(predicates.join(" AND "))
    }
}
