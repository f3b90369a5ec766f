// Ingestion module
// CSV loading, vector preparation and index setup for the offline batch run


use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;
use std::io;
use std::path::Path;
use tracing::{debug, info};

use crate::embeddings::Embedder;
use crate::index::{FaqMetadata, IndexCatalog, IndexSpec, IndexStatus, VectorRecord};
use crate::{FaqError, Result};

const QUESTION_COLUMN: &str = "Question";
const ANSWER_COLUMN: &str = "Answer";

/// One question/answer pair from the dataset
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FaqRecord {
    #[serde(rename = "Question")]
    pub question: String,
    #[serde(rename = "Answer")]
    pub answer: String,
}

/// Load FAQ rows from a CSV file with `Question` and `Answer` columns
#[inline]
pub fn load_faq_records<P: AsRef<Path>>(path: P) -> Result<Vec<FaqRecord>> {
    let path = path.as_ref();
    debug!("Loading FAQ dataset from {}", path.display());

    let mut reader = csv::Reader::from_path(path).map_err(|e| match e.kind() {
        csv::ErrorKind::Io(io_err) if io_err.kind() == io::ErrorKind::NotFound => {
            FaqError::Dataset(format!("CSV file not found at: {}", path.display()))
        }
        _ => FaqError::Dataset(format!("Error loading CSV file: {}", e)),
    })?;

    let headers = reader
        .headers()
        .map_err(|e| FaqError::Dataset(format!("Error loading CSV file: {}", e)))?;
    for column in [QUESTION_COLUMN, ANSWER_COLUMN] {
        if !headers.iter().any(|header| header == column) {
            return Err(FaqError::Dataset(format!(
                "Error loading CSV file: missing required column '{}' in {}",
                column,
                path.display()
            )));
        }
    }

    let records = reader
        .deserialize()
        .collect::<std::result::Result<Vec<FaqRecord>, _>>()
        .map_err(|e| FaqError::Dataset(format!("Error loading CSV file: {}", e)))?;

    info!("Loaded {} FAQ rows from {}", records.len(), path.display());
    Ok(records)
}

/// Stable vector id for the row at `row_index`
#[inline]
pub fn vector_id(row_index: usize) -> String {
    format!("qa_{}", row_index)
}

/// Embed every question, in row order, one call per row.
///
/// The first embedding failure aborts preparation.
#[inline]
pub fn prepare_vectors(records: &[FaqRecord], embedder: &dyn Embedder) -> Result<Vec<VectorRecord>> {
    let bar = if console::user_attended_stderr() {
        ProgressBar::new(records.len() as u64).with_style(
            ProgressStyle::with_template("{spinner} [{pos}/{len}] Embedding {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        )
    } else {
        ProgressBar::hidden()
    };

    let mut vectors = Vec::with_capacity(records.len());
    for (row_index, record) in records.iter().enumerate() {
        bar.set_message(vector_id(row_index));

        let embedding = embedder.embed(&record.question)?;
        vectors.push(VectorRecord {
            id: vector_id(row_index),
            embedding,
            metadata: FaqMetadata {
                question: record.question.clone(),
                answer: record.answer.clone(),
            },
        });

        bar.inc(1);
    }
    bar.finish_and_clear();

    debug!("Prepared {} vectors", vectors.len());
    Ok(vectors)
}

/// Create the index described by `spec` unless one with that name exists.
///
/// An existing index is left untouched, whatever its schema.
#[inline]
pub async fn ensure_index(catalog: &dyn IndexCatalog, spec: &IndexSpec) -> Result<IndexStatus> {
    let existing = catalog.list_indexes().await?;

    if existing.iter().any(|name| name == &spec.name) {
        debug!("Index {} already exists", spec.name);
        return Ok(IndexStatus::AlreadyExists);
    }

    catalog.create_index(spec).await?;
    Ok(IndexStatus::Created)
}
