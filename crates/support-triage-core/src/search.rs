//! In-memory TF-IDF document index and nearest-neighbour search.
//!
//! A [`VectorStore`] is immutable once built. Rebuilding means building a
//! new store and swapping it in; see the application's `vector_store`
//! module for the persisted lifecycle.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::models::{SearchHit, SeedDocument};
use crate::tfidf::{CsrMatrix, TfidfVectorizer};

/// Number of results returned when the caller does not choose.
pub const DEFAULT_TOP_K: usize = 3;

/// Fitted vectorizer, document-term matrix, and the documents behind it.
///
/// Row `i` of `matrix` is the TF-IDF vector of `documents[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorStore {
    pub vectorizer: TfidfVectorizer,
    pub matrix: CsrMatrix,
    pub documents: Vec<SeedDocument>,
}

impl VectorStore {
    /// Fit a store over `documents`.
    ///
    /// An empty corpus is fit on a single empty placeholder so the store is
    /// still queryable; the placeholder row is not kept, so the matrix has
    /// zero rows and every search returns nothing.
    pub fn build(documents: Vec<SeedDocument>) -> Self {
        if documents.is_empty() {
            let (vectorizer, _) = TfidfVectorizer::fit_transform(&[""]);
            let matrix = CsrMatrix::empty(vectorizer.vocabulary_len());
            return Self {
                vectorizer,
                matrix,
                documents,
            };
        }

        let texts: Vec<&str> = documents.iter().map(|d| d.text.as_str()).collect();
        let (vectorizer, matrix) = TfidfVectorizer::fit_transform(&texts);
        Self {
            vectorizer,
            matrix,
            documents,
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Verify the shape of a store that came from outside the process.
    pub fn validate(&self) -> Result<()> {
        self.vectorizer.validate()?;
        self.matrix.validate()?;
        if self.matrix.row_count() != self.documents.len() {
            bail!(
                "matrix has {} rows but store holds {} documents",
                self.matrix.row_count(),
                self.documents.len()
            );
        }
        if self.matrix.n_cols != self.vectorizer.vocabulary_len() {
            bail!(
                "matrix has {} columns but vocabulary has {} terms",
                self.matrix.n_cols,
                self.vectorizer.vocabulary_len()
            );
        }
        Ok(())
    }

    /// Rank documents against `query` and return the best `top_k`.
    ///
    /// Scores are raw dot products of L2-normalised vectors. Documents are
    /// ordered by descending score with ties kept in corpus order; zero
    /// scores are still eligible. A blank query, an empty store, or
    /// `top_k == 0` yields an empty result.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<SearchHit> {
        if query.trim().is_empty() || self.matrix.row_count() == 0 || top_k == 0 {
            return Vec::new();
        }

        let q = self.vectorizer.transform(query);

        let mut scored: Vec<(usize, f64)> = (0..self.matrix.row_count())
            .map(|r| {
                let (cols, vals) = self.matrix.row(r);
                (r, q.dot(cols, vals))
            })
            .collect();

        // `sort_by` is stable, so equal scores keep corpus order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(top_k);

        scored
            .into_iter()
            .filter_map(|(r, score)| {
                self.documents.get(r).map(|d| SearchHit {
                    path: d.path.clone(),
                    text: d.text.clone(),
                    score,
                })
            })
            .collect()
    }
}
