use super::*;

fn chunk(id: usize, text: &str) -> Chunk {
    Chunk {
        id,
        text: text.to_string(),
    }
}

fn euclidean_index() -> VectorIndex {
    let embeddings = vec![
        vec![0.0, 0.0],
        vec![1.0, 0.0],
        vec![0.0, 2.0],
        vec![3.0, 3.0],
    ];
    let chunks = (0..embeddings.len())
        .map(|id| chunk(id, &format!("User: q{id}\nAI: r{id}")))
        .collect();
    VectorIndex::build(embeddings, chunks, Metric::SquaredEuclidean).expect("should build index")
}

#[test]
fn query_returns_ascending_distances() {
    let index = euclidean_index();

    let results = index.query(&[0.0, 0.0], 4).expect("should query");

    assert_eq!(results.len(), 4);
    for pair in results.windows(2) {
        assert!(pair[0].distance <= pair[1].distance);
    }
    assert_eq!(results[0].chunk.id, 0);
    assert_eq!(results[0].distance, 0.0);
}

#[test]
fn self_query_has_zero_distance() {
    let index = euclidean_index();

    let results = index.query(&[0.0, 2.0], 1).expect("should query");

    assert_eq!(results[0].chunk.id, 2);
    assert_eq!(results[0].distance, 0.0);
}

#[test]
fn distances_are_squared_euclidean() {
    let index = euclidean_index();

    let results = index.query(&[1.0, 0.0], 4).expect("should query");

    // (0,0) is at squared distance 1, (0,2) at 5, (3,3) at 13.
    assert_eq!(results[0].distance, 0.0);
    assert_eq!(results[1].distance, 1.0);
    assert_eq!(results[2].distance, 5.0);
    assert_eq!(results[3].distance, 13.0);
}

#[test]
fn k_zero_returns_empty() {
    let index = euclidean_index();
    let results = index.query(&[0.0, 0.0], 0).expect("should query");
    assert!(results.is_empty());
}

#[test]
fn k_larger_than_corpus_is_clamped() {
    let index = euclidean_index();
    let results = index.query(&[0.0, 0.0], 100).expect("should query");
    assert_eq!(results.len(), 4);
}

#[test]
fn empty_index_returns_empty_for_any_k() {
    let index = VectorIndex::build(Vec::new(), Vec::new(), Metric::SquaredEuclidean)
        .expect("should build empty index");

    assert!(index.is_empty());
    assert_eq!(index.dimension(), 0);
    let results = index.query(&[1.0, 2.0], 10).expect("should query");
    assert!(results.is_empty());
}

#[test]
fn ties_break_by_insertion_id() {
    let embeddings = vec![vec![1.0, 0.0], vec![-1.0, 0.0], vec![1.0, 0.0]];
    let chunks = vec![chunk(0, "a"), chunk(1, "b"), chunk(2, "c")];
    let index =
        VectorIndex::build(embeddings, chunks, Metric::SquaredEuclidean).expect("should build");

    // Rows 0 and 2 are identical; both sit at distance 1 from the origin,
    // as does row 1. Order must be insertion order.
    let results = index.query(&[0.0, 0.0], 3).expect("should query");
    let ids: Vec<usize> = results.iter().map(|n| n.chunk.id).collect();
    assert_eq!(ids, vec![0, 1, 2]);
}

#[test]
fn build_rejects_length_mismatch() {
    let result = VectorIndex::build(
        vec![vec![1.0, 0.0]],
        vec![chunk(0, "a"), chunk(1, "b")],
        Metric::SquaredEuclidean,
    );

    assert!(matches!(result, Err(TalkbackError::Index(_))));
}

#[test]
fn build_rejects_inconsistent_dimensions() {
    let result = VectorIndex::build(
        vec![vec![1.0, 0.0], vec![1.0, 0.0, 0.0]],
        vec![chunk(0, "a"), chunk(1, "b")],
        Metric::SquaredEuclidean,
    );

    assert!(matches!(result, Err(TalkbackError::Index(_))));
}

#[test]
fn query_rejects_mismatched_dimension() {
    let index = euclidean_index();
    let result = index.query(&[1.0, 2.0, 3.0], 1);
    assert!(matches!(result, Err(TalkbackError::Index(_))));
}

#[test]
fn cosine_index_orders_by_similarity() {
    let embeddings = vec![
        vec![1.0, 0.0],  // identical direction
        vec![0.0, 1.0],  // orthogonal
        vec![-1.0, 0.0], // opposite
    ];
    let chunks = vec![chunk(0, "same"), chunk(1, "ortho"), chunk(2, "opposite")];
    let index = VectorIndex::build(embeddings, chunks, Metric::Cosine).expect("should build");

    let results = index.query(&[2.0, 0.0], 3).expect("should query");

    let ids: Vec<usize> = results.iter().map(|n| n.chunk.id).collect();
    assert_eq!(ids, vec![0, 1, 2]);
    assert!((results[0].similarity() - 1.0).abs() < 1e-6);
    assert!(results[1].similarity().abs() < 1e-6);
    assert!((results[2].similarity() + 1.0).abs() < 1e-6);
}

#[test]
fn nearest_returns_best_match() {
    let index = euclidean_index();

    let nearest = index
        .nearest(&[2.9, 3.1])
        .expect("should query")
        .expect("index is non-empty");

    assert_eq!(nearest.chunk.id, 3);
}

#[test]
fn cosine_similarity_handles_zero_vectors() {
    assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 0.0]), 0.0);
}

#[test]
fn squared_euclidean_is_symmetric() {
    let a = [1.0, 2.0, 3.0];
    let b = [4.0, 0.0, -1.0];
    assert_eq!(squared_euclidean(&a, &b), squared_euclidean(&b, &a));
}
