use super::*;
use tempfile::TempDir;

fn test_spec(dimension: u32) -> IndexSpec {
    IndexSpec {
        name: "ukmegashop-faq".to_string(),
        dimension,
        metric: Metric::Cosine,
        cloud: "aws".to_string(),
        region: "us-east-1".to_string(),
    }
}

fn test_record(index: usize, vector: Vec<f32>) -> VectorRecord {
    VectorRecord {
        id: format!("qa_{}", index),
        embedding: vector,
        metadata: FaqMetadata {
            question: format!("Question {}", index),
            answer: format!("Answer {}", index),
        },
    }
}

async fn create_test_catalog() -> (LanceCatalog, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let catalog = LanceCatalog::open(temp_dir.path().join("vectors"), Metric::Cosine)
        .await
        .expect("should open catalog");
    (catalog, temp_dir)
}

#[tokio::test]
async fn create_and_list_tables() {
    let (catalog, _temp_dir) = create_test_catalog().await;

    assert!(
        catalog
            .list_indexes()
            .await
            .expect("should list tables")
            .is_empty()
    );

    catalog
        .create_index(&test_spec(4))
        .await
        .expect("should create table");

    let names = catalog.list_indexes().await.expect("should list tables");
    assert_eq!(names, vec!["ukmegashop-faq".to_string()]);
}

#[tokio::test]
async fn open_detects_dimension_and_rejects_mismatched_vectors() {
    let (catalog, _temp_dir) = create_test_catalog().await;
    catalog
        .create_index(&test_spec(4))
        .await
        .expect("should create table");

    let index = catalog
        .open_index("ukmegashop-faq")
        .await
        .expect("should open table");

    let result = index.upsert(&[test_record(0, vec![1.0, 0.0])]).await;
    assert!(matches!(result, Err(FaqError::Index(_))));

    let result = index.query(&[1.0, 0.0, 0.0], 2).await;
    assert!(matches!(result, Err(FaqError::Index(_))));
}

#[tokio::test]
async fn query_returns_nearest_first_with_metadata() {
    let (catalog, _temp_dir) = create_test_catalog().await;
    catalog
        .create_index(&test_spec(4))
        .await
        .expect("should create table");
    let index = catalog
        .open_index("ukmegashop-faq")
        .await
        .expect("should open table");

    let records = vec![
        test_record(0, vec![1.0, 0.0, 0.0, 0.0]),
        test_record(1, vec![0.0, 1.0, 0.0, 0.0]),
        test_record(2, vec![0.0, 0.0, 1.0, 0.0]),
    ];
    let written = index.upsert(&records).await.expect("should upsert");
    assert_eq!(written, 3);

    let matches = index
        .query(&[0.1, 0.9, 0.0, 0.0], 2)
        .await
        .expect("should query");

    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].id, "qa_1");
    assert_eq!(matches[0].metadata.question, "Question 1");
    assert_eq!(matches[0].metadata.answer, "Answer 1");
    assert!(matches[0].score > matches[1].score);
    assert!(matches[0].score > 0.9);
}

#[tokio::test]
async fn upsert_overwrites_by_id() {
    let (catalog, _temp_dir) = create_test_catalog().await;
    catalog
        .create_index(&test_spec(4))
        .await
        .expect("should create table");
    let index = catalog
        .open_index("ukmegashop-faq")
        .await
        .expect("should open table");

    index
        .upsert(&[
            test_record(0, vec![1.0, 0.0, 0.0, 0.0]),
            test_record(1, vec![0.0, 1.0, 0.0, 0.0]),
        ])
        .await
        .expect("first upsert");

    let mut replacement = test_record(0, vec![0.0, 0.0, 0.0, 1.0]);
    replacement.metadata.answer = "Updated answer".to_string();
    index.upsert(&[replacement]).await.expect("second upsert");

    let all = index
        .query(&[0.0, 0.0, 0.0, 1.0], 10)
        .await
        .expect("should query");

    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, "qa_0");
    assert_eq!(all[0].metadata.answer, "Updated answer");
}

#[tokio::test]
async fn reopened_table_keeps_its_creation_metric() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let db_path = temp_dir.path().join("vectors");

    let euclidean = LanceCatalog::open(&db_path, Metric::Euclidean)
        .await
        .expect("should open catalog");
    let mut spec = test_spec(4);
    spec.metric = Metric::Euclidean;
    euclidean
        .create_index(&spec)
        .await
        .expect("should create table");
    euclidean
        .open_index("ukmegashop-faq")
        .await
        .expect("should open table")
        .upsert(&[
            test_record(0, vec![10.0, 0.0, 0.0, 0.0]),
            test_record(1, vec![0.5, 0.5, 0.0, 0.0]),
        ])
        .await
        .expect("should upsert");

    // Cosine would rank qa_0 first, euclidean distance ranks qa_1 first
    let cosine = LanceCatalog::open(&db_path, Metric::Cosine)
        .await
        .expect("should reopen catalog");
    let index = cosine
        .open_index("ukmegashop-faq")
        .await
        .expect("should open table");
    assert_eq!(index.dimension(), Some(4));

    let matches = index
        .query(&[1.0, 0.2, 0.0, 0.0], 2)
        .await
        .expect("should query");

    assert_eq!(matches[0].id, "qa_1");
    assert!(matches[0].score <= 1.0);
}

#[test]
fn metric_names_round_trip_through_schema_metadata() {
    let schema = create_schema(8, Metric::DotProduct);
    let recorded = schema.metadata().get(METRIC_METADATA_KEY).cloned();

    assert_eq!(recorded.as_deref(), Some("dotproduct"));
    assert_eq!(metric_from_name("dotproduct"), Some(Metric::DotProduct));
    assert_eq!(metric_from_name("manhattan"), None);
}

#[tokio::test]
async fn open_missing_table_fails() {
    let (catalog, _temp_dir) = create_test_catalog().await;
    assert!(catalog.open_index("missing").await.is_err());
}

#[test]
fn similarity_conversion() {
    assert!((similarity_from_distance(Metric::Cosine, 0.25) - 0.75).abs() < f32::EPSILON);
    assert!((similarity_from_distance(Metric::Euclidean, 1.0) - 0.5).abs() < f32::EPSILON);
    assert!(matches!(
        distance_type(Metric::DotProduct),
        DistanceType::Dot
    ));
}
