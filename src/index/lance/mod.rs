#[cfg(test)]
mod tests;

use arrow::array::{Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::{
    Connection, DistanceType, Table,
    query::{ExecutableQuery, QueryBase},
};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{
    FaqMetadata, IndexCatalog, IndexSpec, QueryMatch, VectorIndex, VectorRecord, check_dimension,
};
use crate::config::Metric;
use crate::{FaqError, Result};

/// Schema metadata key holding the metric a table was created with
const METRIC_METADATA_KEY: &str = "faq_chat.metric";

/// Local vector store: one LanceDB table per index name.
///
/// The catalog metric applies to new tables and to tables that carry no
/// recorded metric; an existing table is always queried with its own.
pub struct LanceCatalog {
    connection: Connection,
    metric: Metric,
}

/// Handle to one LanceDB table
pub struct LanceIndex {
    name: String,
    table: Table,
    dimension: usize,
    metric: Metric,
}

impl LanceCatalog {
    /// Open (or create) the vector database directory at `db_path`
    ///
    /// # Arguments
    /// * `db_path` - Directory holding the LanceDB tables
    /// * `metric` - Similarity metric applied to queries
    #[inline]
    pub async fn open<P: AsRef<Path>>(db_path: P, metric: Metric) -> Result<Self> {
        let db_path = db_path.as_ref();
        debug!("Initializing LanceDB at path: {:?}", db_path);

        std::fs::create_dir_all(db_path).map_err(|e| {
            FaqError::Index(format!("Failed to create vector database directory: {}", e))
        })?;

        let uri = format!("file://{}", db_path.display());
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| FaqError::Index(format!("Failed to connect to LanceDB: {}", e)))?;

        Ok(Self { connection, metric })
    }

    /// Read the vector dimension and recorded metric of an existing table
    async fn describe_table(table: &Table) -> Result<(usize, Option<Metric>)> {
        let schema = table
            .schema()
            .await
            .map_err(|e| FaqError::Index(format!("Failed to get table schema: {}", e)))?;

        let metric = schema
            .metadata()
            .get(METRIC_METADATA_KEY)
            .and_then(|name| metric_from_name(name));

        for field in schema.fields() {
            if field.name() == "vector" {
                if let DataType::FixedSizeList(_, size) = field.data_type() {
                    let dimension = usize::try_from(*size).map_err(|_| {
                        FaqError::Index(format!("Invalid vector dimension: {}", size))
                    })?;
                    return Ok((dimension, metric));
                }
            }
        }

        Err(FaqError::Index(
            "Could not find vector column or determine dimension".to_string(),
        ))
    }
}

/// Schema with the specified vector dimension, tagged with the table metric
fn create_schema(vector_dim: i32, metric: Metric) -> Arc<Schema> {
    let metadata = HashMap::from([(
        METRIC_METADATA_KEY.to_string(),
        metric.as_str().to_string(),
    )]);

    let fields = vec![
        Field::new("id", DataType::Utf8, false),
        Field::new(
            "vector",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, true)),
                vector_dim,
            ),
            false,
        ),
        Field::new("question", DataType::Utf8, false),
        Field::new("answer", DataType::Utf8, false),
    ];

    Arc::new(Schema::new_with_metadata(fields, metadata))
}

fn metric_from_name(name: &str) -> Option<Metric> {
    [Metric::Cosine, Metric::Euclidean, Metric::DotProduct]
        .into_iter()
        .find(|metric| metric.as_str() == name)
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| FaqError::Index(format!("Missing {} column", name)))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| FaqError::Index(format!("Invalid {} column type", name)))
}

fn distance_type(metric: Metric) -> DistanceType {
    match metric {
        Metric::Cosine => DistanceType::Cosine,
        Metric::Euclidean => DistanceType::L2,
        Metric::DotProduct => DistanceType::Dot,
    }
}

/// Convert a LanceDB distance into a similarity score (higher is better)
fn similarity_from_distance(metric: Metric, distance: f32) -> f32 {
    match metric {
        Metric::Cosine | Metric::DotProduct => 1.0 - distance,
        Metric::Euclidean => 1.0 / (1.0 + distance),
    }
}

#[async_trait]
impl IndexCatalog for LanceCatalog {
    async fn list_indexes(&self) -> Result<Vec<String>> {
        self.connection
            .table_names()
            .execute()
            .await
            .map_err(|e| FaqError::Index(format!("Failed to list tables: {}", e)))
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        let dimension = i32::try_from(spec.dimension)
            .map_err(|_| FaqError::Index(format!("Invalid dimension: {}", spec.dimension)))?;

        self.connection
            .create_empty_table(&spec.name, create_schema(dimension, spec.metric))
            .execute()
            .await
            .map_err(|e| FaqError::Index(format!("Failed to create table: {}", e)))?;

        info!(
            "Created LanceDB table {} with {} dimensions ({} metric)",
            spec.name, spec.dimension, spec.metric
        );
        Ok(())
    }

    async fn open_index(&self, name: &str) -> Result<Arc<dyn VectorIndex>> {
        let table = self
            .connection
            .open_table(name)
            .execute()
            .await
            .map_err(|e| FaqError::Index(format!("Failed to open table {}: {}", name, e)))?;

        let (dimension, recorded) = Self::describe_table(&table).await?;
        let metric = match recorded {
            Some(metric) if metric != self.metric => {
                warn!(
                    "Table {} was created with the {} metric, ignoring configured {}",
                    name, metric, self.metric
                );
                metric
            }
            Some(metric) => metric,
            None => self.metric,
        };
        debug!(
            "Opened LanceDB table {} ({} dimensions, {} metric)",
            name, dimension, metric
        );

        Ok(Arc::new(LanceIndex {
            name: name.to_string(),
            table,
            dimension,
            metric,
        }))
    }
}

impl LanceIndex {
    /// Create a RecordBatch from vector records
    fn create_record_batch(&self, records: &[VectorRecord]) -> Result<RecordBatch> {
        let len = records.len();
        let vector_dim = i32::try_from(self.dimension)
            .map_err(|_| FaqError::Index(format!("Invalid dimension: {}", self.dimension)))?;

        let mut ids = Vec::with_capacity(len);
        let mut questions = Vec::with_capacity(len);
        let mut answers = Vec::with_capacity(len);
        let mut flat_values = Vec::with_capacity(len * self.dimension);

        for record in records {
            ids.push(record.id.as_str());
            questions.push(record.metadata.question.as_str());
            answers.push(record.metadata.answer.as_str());
            flat_values.extend_from_slice(&record.embedding);
        }

        let field = Arc::new(Field::new("item", DataType::Float32, true));
        let vector_array = FixedSizeListArray::try_new(
            field,
            vector_dim,
            Arc::new(Float32Array::from(flat_values)),
            None,
        )
        .map_err(|e| FaqError::Index(format!("Failed to create vector array: {}", e)))?;

        let arrays: Vec<Arc<dyn Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(questions)),
            Arc::new(StringArray::from(answers)),
        ];

        RecordBatch::try_new(create_schema(vector_dim, self.metric), arrays)
            .map_err(|e| FaqError::Index(format!("Failed to create record batch: {}", e)))
    }

    /// Parse a single record batch from search results
    fn parse_search_batch(&self, batch: &RecordBatch) -> Result<Vec<QueryMatch>> {
        let ids = string_column(batch, "id")?;
        let questions = string_column(batch, "question")?;
        let answers = string_column(batch, "answer")?;

        let distances = batch
            .column_by_name("_distance")
            .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

        let matches = (0..batch.num_rows())
            .map(|row| {
                let distance =
                    distances.map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

                QueryMatch {
                    id: ids.value(row).to_string(),
                    score: similarity_from_distance(self.metric, distance),
                    metadata: FaqMetadata {
                        question: questions.value(row).to_string(),
                        answer: answers.value(row).to_string(),
                    },
                }
            })
            .collect();

        Ok(matches)
    }
}

#[async_trait]
impl VectorIndex for LanceIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.dimension)
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<usize> {
        if records.is_empty() {
            debug!("No vectors to upsert");
            return Ok(0);
        }

        for record in records {
            check_dimension(&self.name, self.dimension, record.embedding.len())?;
        }

        debug!("Upserting batch of {} vectors", records.len());
        let record_batch = self.create_record_batch(records)?;
        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);

        let mut merge = self.table.merge_insert(&["id"]);
        merge
            .when_matched_update_all(None)
            .when_not_matched_insert_all();
        merge
            .execute(Box::new(reader))
            .await
            .map_err(|e| FaqError::Index(format!("Failed to upsert vectors: {}", e)))?;

        info!("Upserted {} vectors into {}", records.len(), self.name);
        Ok(records.len())
    }

    async fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<QueryMatch>> {
        check_dimension(&self.name, self.dimension, embedding.len())?;
        debug!("Searching {} for {} nearest vectors", self.name, top_k);

        let mut results = self
            .table
            .vector_search(embedding)
            .map_err(|e| FaqError::Index(format!("Failed to create vector search: {}", e)))?
            .column("vector")
            .distance_type(distance_type(self.metric))
            .limit(top_k)
            .execute()
            .await
            .map_err(|e| FaqError::Index(format!("Failed to execute search: {}", e)))?;

        let mut matches = Vec::new();
        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| FaqError::Index(format!("Failed to read result stream: {}", e)))?
        {
            matches.extend(self.parse_search_batch(&batch)?);
        }

        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(top_k);

        debug!("Query against {} returned {} matches", self.name, matches.len());
        Ok(matches)
    }
}
