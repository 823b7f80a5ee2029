//! Ephemeral in-memory similarity index.
//!
//! Built from scratch for every question and dropped afterwards; search is a
//! brute-force cosine similarity scan, which is plenty for the chunks of a
//! single document.

use crate::error::{EmbeddingError, ServiceResult};

use super::EmbeddingProvider;

/// A chunk returned by a similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub text: String,
    pub similarity: f32,
}

/// Vector index over the chunks of one document
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    dimensions: usize,
}

struct IndexEntry {
    text: String,
    embedding: Vec<f32>,
}

impl VectorIndex {
    /// Embed every text with `embedder` and index the results
    pub async fn from_texts(
        embedder: &dyn EmbeddingProvider,
        texts: Vec<String>,
    ) -> ServiceResult<Self> {
        let mut index = Self {
            entries: Vec::with_capacity(texts.len()),
            dimensions: 0,
        };

        for text in texts {
            let embedding = embedder.embed(&text).await?;
            index.insert(text, embedding)?;
        }

        Ok(index)
    }

    fn insert(&mut self, text: String, embedding: Vec<f32>) -> ServiceResult<()> {
        if self.entries.is_empty() {
            self.dimensions = embedding.len();
        } else if embedding.len() != self.dimensions {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimensions,
                actual: embedding.len(),
            }
            .into());
        }

        self.entries.push(IndexEntry { text, embedding });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return up to `limit` chunks, most similar first
    pub fn search(&self, query_embedding: &[f32], limit: usize) -> ServiceResult<Vec<ScoredChunk>> {
        if !self.entries.is_empty() && query_embedding.len() != self.dimensions {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimensions,
                actual: query_embedding.len(),
            }
            .into());
        }

        let mut results: Vec<ScoredChunk> = self
            .entries
            .iter()
            .map(|entry| ScoredChunk {
                text: entry.text.clone(),
                similarity: cosine_similarity(query_embedding, &entry.embedding),
            })
            .collect();

        // Stable sort keeps document order among equal scores
        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(limit);

        Ok(results)
    }
}

/// Calculate cosine similarity between two vectors
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::testing::LetterEmbedder;

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_search_ranks_by_similarity() {
        let texts = vec![
            "zzz zzz zzz".to_string(),
            "the sky is blue".to_string(),
            "xylophone".to_string(),
        ];
        let index = VectorIndex::from_texts(&LetterEmbedder, texts).await.unwrap();
        assert_eq!(index.len(), 3);

        let query = LetterEmbedder.embed("what color is the sky").await.unwrap();
        let results = index.search(&query, 2).unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].text, "the sky is blue");
        assert!(results[0].similarity >= results[1].similarity);
    }

    #[tokio::test]
    async fn test_empty_index_returns_nothing() {
        let index = VectorIndex::from_texts(&LetterEmbedder, Vec::new()).await.unwrap();
        assert!(index.is_empty());
        assert!(index.search(&[1.0, 2.0], 4).unwrap().is_empty());
    }

    #[test]
    fn test_dimension_mismatch_is_rejected() {
        let mut index = VectorIndex {
            entries: Vec::new(),
            dimensions: 0,
        };
        index.insert("a".to_string(), vec![1.0, 0.0]).unwrap();
        assert!(index.insert("b".to_string(), vec![1.0]).is_err());
        assert!(index.search(&[1.0, 0.0, 0.0], 1).is_err());
    }
}
