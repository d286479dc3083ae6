//! In-memory vector index over (chunk, embedding) pairs.
//!
//! Built once at startup, then shared behind an `Arc` for unbounded
//! concurrent readers. Scores are cosine similarity in [-1, 1], returned
//! in descending order with ties broken by insertion order.

use std::cmp::Ordering;

use ndarray::Array1;

use crate::core::errors::ApiError;

use super::chunker::Chunk;

#[derive(Debug)]
struct IndexEntry {
    chunk: Chunk,
    embedding: Array1<f32>,
    norm: f32,
}

#[derive(Debug)]
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    dimension: usize,
}

impl VectorIndex {
    /// Build the index from chunk/embedding pairs.
    ///
    /// The embedding dimension is fixed by the first pair; any pair with a
    /// different dimension fails the build. An empty input produces an
    /// empty index that answers every query with no results.
    pub fn build(items: Vec<(Chunk, Vec<f32>)>) -> Result<Self, ApiError> {
        let dimension = items.first().map(|(_, vec)| vec.len()).unwrap_or(0);

        let mut entries = Vec::with_capacity(items.len());
        for (chunk, vector) in items {
            if vector.len() != dimension {
                return Err(ApiError::BadRequest(format!(
                    "Embedding dimension mismatch: expected {}, got {} (chunk {} of {})",
                    dimension,
                    vector.len(),
                    chunk.position,
                    chunk.source
                )));
            }
            let embedding = Array1::from_vec(vector);
            let norm = embedding.dot(&embedding).sqrt();
            entries.push(IndexEntry {
                chunk,
                embedding,
                norm,
            });
        }

        Ok(Self {
            entries,
            dimension,
        })
    }

    /// Return the `k` most similar chunks for `query`, best first.
    ///
    /// `k` is clamped to the index size. Querying an empty index returns
    /// an empty result; a query vector of the wrong dimension is an error.
    pub fn query(&self, query: &[f32], k: usize) -> Result<Vec<(Chunk, f32)>, ApiError> {
        if self.entries.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(ApiError::BadRequest(format!(
                "Query dimension mismatch: expected {}, got {}",
                self.dimension,
                query.len()
            )));
        }

        let query = Array1::from_vec(query.to_vec());
        let query_norm = query.dot(&query).sqrt();

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let denom = query_norm * entry.norm;
                let score = if denom <= f32::EPSILON {
                    0.0
                } else {
                    query.dot(&entry.embedding) / denom
                };
                (index, score)
            })
            .collect();

        // Stable sort keeps insertion order for equal scores.
        scored.sort_by(|left, right| right.1.partial_cmp(&left.1).unwrap_or(Ordering::Equal));

        let k = k.min(self.entries.len());
        Ok(scored
            .into_iter()
            .take(k)
            .map(|(index, score)| (self.entries[index].chunk.clone(), score))
            .collect())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(position: usize, content: &str) -> Chunk {
        Chunk {
            content: content.to_string(),
            source: "test.txt".to_string(),
            position,
            start_offset: 0,
        }
    }

    fn sample_index() -> VectorIndex {
        VectorIndex::build(vec![
            (chunk(0, "booking"), vec![1.0, 0.0, 0.0]),
            (chunk(1, "payment"), vec![0.0, 1.0, 0.0]),
            (chunk(2, "refunds"), vec![0.0, 0.0, 1.0]),
            (chunk(3, "booking steps"), vec![0.9, 0.1, 0.0]),
        ])
        .expect("index should build")
    }

    #[test]
    fn scores_are_non_increasing() {
        let index = sample_index();
        let results = index.query(&[1.0, 0.0, 0.0], 4).expect("query");
        for pair in results.windows(2) {
            assert!(pair[0].1 >= pair[1].1);
        }
        assert_eq!(results[0].0.content, "booking");
    }

    #[test]
    fn k_is_clamped_to_index_size() {
        let index = sample_index();
        let results = index.query(&[1.0, 0.0, 0.0], 100).expect("query");
        assert_eq!(results.len(), 4);
    }

    #[test]
    fn ties_break_by_insertion_order() {
        let index = VectorIndex::build(vec![
            (chunk(0, "first"), vec![1.0, 0.0]),
            (chunk(1, "second"), vec![1.0, 0.0]),
            (chunk(2, "third"), vec![2.0, 0.0]),
        ])
        .expect("index should build");

        // All three are colinear with the query, so all score 1.0.
        let results = index.query(&[1.0, 0.0], 3).expect("query");
        assert_eq!(results[0].0.content, "first");
        assert_eq!(results[1].0.content, "second");
        assert_eq!(results[2].0.content, "third");
    }

    #[test]
    fn mixed_dimensions_fail_the_build() {
        let err = VectorIndex::build(vec![
            (chunk(0, "a"), vec![1.0, 0.0]),
            (chunk(1, "b"), vec![1.0, 0.0, 0.0]),
        ])
        .expect_err("mixed dimensions must fail");
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn wrong_query_dimension_is_an_error() {
        let index = sample_index();
        let err = index.query(&[1.0, 0.0], 2).expect_err("dim mismatch");
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn empty_index_answers_with_no_results() {
        let index = VectorIndex::build(Vec::new()).expect("empty build");
        assert!(index.is_empty());
        let results = index.query(&[1.0, 2.0], 5).expect("query");
        assert!(results.is_empty());
    }

    #[test]
    fn cosine_scores_stay_in_unit_range() {
        let index = sample_index();
        let results = index.query(&[0.3, -0.7, 0.2], 4).expect("query");
        for (_, score) in results {
            assert!((-1.0..=1.0).contains(&score));
        }
    }
}
