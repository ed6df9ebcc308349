//! TF-IDF vectorizer and compressed sparse row matrix.
//!
//! # Weighting
//!
//! 1. Lowercase the text and split it into tokens: maximal runs of
//!    alphanumeric or `_` characters, at least two characters long.
//! 2. Drop English stop words.
//! 3. Count raw term frequencies against the fitted vocabulary.
//! 4. Multiply by the smoothed IDF: `ln((1 + n) / (1 + df)) + 1`.
//! 5. L2-normalise each row. All-zero rows stay zero.
//!
//! Because rows are unit length, the dot product of two rows is their
//! cosine similarity.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::stopwords::is_stop_word;

/// Split text into lowercase tokens, dropping stop words and
/// single-character tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    lower
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| t.chars().count() >= 2)
        .filter(|t| !is_stop_word(t))
        .map(str::to_string)
        .collect()
}

/// A sparse row: parallel column indices (ascending) and values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    pub indices: Vec<usize>,
    pub values: Vec<f64>,
}

impl SparseVector {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Dot product against a row stored as parallel slices. Both sides
    /// must have ascending indices.
    pub fn dot(&self, indices: &[usize], values: &[f64]) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.indices.len() && j < indices.len() {
            match self.indices[i].cmp(&indices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += self.values[i] * values[j];
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }
}

/// Document-term matrix in compressed sparse row form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CsrMatrix {
    pub n_cols: usize,
    /// `indptr[r]..indptr[r + 1]` spans row `r`; length is `rows + 1`.
    pub indptr: Vec<usize>,
    pub indices: Vec<usize>,
    pub data: Vec<f64>,
}

impl CsrMatrix {
    pub fn empty(n_cols: usize) -> Self {
        Self {
            n_cols,
            indptr: vec![0],
            indices: Vec::new(),
            data: Vec::new(),
        }
    }

    pub fn from_rows(n_cols: usize, rows: Vec<SparseVector>) -> Self {
        let mut m = Self::empty(n_cols);
        for row in rows {
            m.indices.extend(row.indices);
            m.data.extend(row.values);
            m.indptr.push(m.indices.len());
        }
        m
    }

    pub fn row_count(&self) -> usize {
        self.indptr.len().saturating_sub(1)
    }

    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    /// Column indices and values of row `r`.
    pub fn row(&self, r: usize) -> (&[usize], &[f64]) {
        let (start, end) = (self.indptr[r], self.indptr[r + 1]);
        (&self.indices[start..end], &self.data[start..end])
    }

    /// Check the structural invariants a deserialized matrix must satisfy
    /// before rows can be indexed safely.
    pub fn validate(&self) -> Result<()> {
        if self.indptr.first() != Some(&0) {
            bail!("row pointer array must start at 0");
        }
        if self.indices.len() != self.data.len() {
            bail!(
                "index/value length mismatch: {} vs {}",
                self.indices.len(),
                self.data.len()
            );
        }
        if self.indptr.windows(2).any(|w| w[0] > w[1]) {
            bail!("row pointers are not monotone");
        }
        if self.indptr.last() != Some(&self.indices.len()) {
            bail!("last row pointer does not match stored values");
        }
        if self.data.iter().any(|v| !v.is_finite()) {
            bail!("matrix holds non-finite values");
        }
        for r in 0..self.row_count() {
            let (cols, _) = self.row(r);
            if cols.iter().any(|&c| c >= self.n_cols) {
                bail!("row {} references a column outside the vocabulary", r);
            }
            if cols.windows(2).any(|w| w[0] >= w[1]) {
                bail!("row {} column indices are not strictly ascending", r);
            }
        }
        Ok(())
    }
}

/// A fitted TF-IDF model: vocabulary (term → column) and per-column IDF.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    pub vocabulary: BTreeMap<String, usize>,
    pub idf: Vec<f64>,
}

impl TfidfVectorizer {
    /// Fit on `texts` and return the model with the transformed corpus.
    ///
    /// Fitting on a corpus with no usable terms (empty, or stop words only)
    /// is not an error: the vocabulary is empty and every row is zero.
    pub fn fit_transform<S: AsRef<str>>(texts: &[S]) -> (Self, CsrMatrix) {
        let tokenized: Vec<Vec<String>> = texts.iter().map(|t| tokenize(t.as_ref())).collect();

        let terms: BTreeSet<&str> = tokenized
            .iter()
            .flat_map(|doc| doc.iter().map(String::as_str))
            .collect();
        let vocabulary: BTreeMap<String, usize> = terms
            .into_iter()
            .enumerate()
            .map(|(i, t)| (t.to_string(), i))
            .collect();

        let mut df = vec![0usize; vocabulary.len()];
        for doc in &tokenized {
            let unique: BTreeSet<usize> = doc.iter().filter_map(|t| vocabulary.get(t)).copied().collect();
            for col in unique {
                df[col] += 1;
            }
        }

        let n = texts.len() as f64;
        let idf = df
            .iter()
            .map(|&d| ((1.0 + n) / (1.0 + d as f64)).ln() + 1.0)
            .collect();

        let vectorizer = Self { vocabulary, idf };
        let rows = tokenized.iter().map(|doc| vectorizer.weigh(doc)).collect();
        let matrix = CsrMatrix::from_rows(vectorizer.vocabulary.len(), rows);
        (vectorizer, matrix)
    }

    pub fn vocabulary_len(&self) -> usize {
        self.vocabulary.len()
    }

    /// Project `text` into the fitted space. Unknown terms are ignored.
    pub fn transform(&self, text: &str) -> SparseVector {
        self.weigh(&tokenize(text))
    }

    fn weigh(&self, tokens: &[String]) -> SparseVector {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for t in tokens {
            if let Some(&col) = self.vocabulary.get(t) {
                *counts.entry(col).or_insert(0.0) += 1.0;
            }
        }

        let mut v = SparseVector {
            indices: Vec::with_capacity(counts.len()),
            values: Vec::with_capacity(counts.len()),
        };
        for (col, tf) in counts {
            v.indices.push(col);
            v.values.push(tf * self.idf[col]);
        }

        let norm = v.values.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm > 0.0 {
            for x in &mut v.values {
                *x /= norm;
            }
        }
        v
    }

    /// Check that the IDF table lines up with the vocabulary.
    pub fn validate(&self) -> Result<()> {
        if self.idf.len() != self.vocabulary.len() {
            bail!(
                "idf length {} does not match vocabulary size {}",
                self.idf.len(),
                self.vocabulary.len()
            );
        }
        if self.vocabulary.values().any(|&c| c >= self.idf.len()) {
            bail!("vocabulary column out of range");
        }
        if self.idf.iter().any(|v| !v.is_finite()) {
            bail!("idf holds non-finite values");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_lowercases_and_filters() {
        let tokens = tokenize("The CARD was declined: gateway_timeout at 5 x");
        assert_eq!(tokens, vec!["card", "declined", "gateway_timeout"]);
    }

    #[test]
    fn test_validate_rejects_non_finite_values() {
        let (mut v, mut m) = TfidfVectorizer::fit_transform(&["card declined", "gateway timeout"]);
        m.data[0] = f64::NAN;
        assert!(m.validate().is_err());
        m.data[0] = f64::INFINITY;
        assert!(m.validate().is_err());

        v.idf[1] = f64::NAN;
        assert!(v.validate().is_err());
    }

    #[test]
    fn test_tokenize_keeps_digits() {
        assert_eq!(tokenize("HTTP 401 / 404"), vec!["http", "401", "404"]);
    }

    #[test]
    fn test_fit_builds_sorted_vocabulary() {
        let (v, m) = TfidfVectorizer::fit_transform(&["zeta alpha", "alpha beta"]);
        let terms: Vec<&str> = v.vocabulary.keys().map(String::as_str).collect();
        assert_eq!(terms, vec!["alpha", "beta", "zeta"]);
        assert_eq!(v.vocabulary["alpha"], 0);
        assert_eq!(m.row_count(), 2);
        assert_eq!(m.n_cols, 3);
        m.validate().unwrap();
        v.validate().unwrap();
    }

    #[test]
    fn test_smoothed_idf() {
        // n = 2; "alpha" in both docs, "beta" in one.
        let (v, _) = TfidfVectorizer::fit_transform(&["alpha beta", "alpha"]);
        let alpha = v.idf[v.vocabulary["alpha"]];
        let beta = v.idf[v.vocabulary["beta"]];
        assert!((alpha - 1.0).abs() < 1e-12);
        assert!((beta - ((3.0f64 / 2.0).ln() + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_rows_are_unit_length() {
        let (_, m) = TfidfVectorizer::fit_transform(&[
            "card declined gateway timeout",
            "auth token expired token",
        ]);
        for r in 0..m.row_count() {
            let (_, vals) = m.row(r);
            let norm: f64 = vals.iter().map(|x| x * x).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-9, "row {} norm {}", r, norm);
        }
    }

    #[test]
    fn test_empty_corpus_placeholder() {
        let (v, m) = TfidfVectorizer::fit_transform(&[""]);
        assert_eq!(v.vocabulary_len(), 0);
        assert_eq!(m.row_count(), 1);
        assert!(v.transform("anything at all").is_empty());
    }

    #[test]
    fn test_stop_word_only_corpus() {
        let (v, m) = TfidfVectorizer::fit_transform(&["the and of", "it is"]);
        assert_eq!(v.vocabulary_len(), 0);
        assert_eq!(m.nnz(), 0);
    }

    #[test]
    fn test_transform_ignores_unknown_terms() {
        let (v, _) = TfidfVectorizer::fit_transform(&["gateway timeout"]);
        let q = v.transform("gateway kubernetes");
        assert_eq!(q.indices, vec![v.vocabulary["gateway"]]);
        assert!((q.values[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_dot_of_identical_rows_is_one() {
        let (v, m) = TfidfVectorizer::fit_transform(&["card declined gateway", "auth token"]);
        let q = v.transform("card declined gateway");
        let (cols, vals) = m.row(0);
        assert!((q.dot(cols, vals) - 1.0).abs() < 1e-9);
        let (cols, vals) = m.row(1);
        assert_eq!(q.dot(cols, vals), 0.0);
    }

    #[test]
    fn test_validate_rejects_bad_matrix() {
        let mut m = CsrMatrix::from_rows(
            2,
            vec![SparseVector {
                indices: vec![0, 1],
                values: vec![0.5, 0.5],
            }],
        );
        m.validate().unwrap();

        m.indices[1] = 7;
        assert!(m.validate().is_err());

        let bad_ptr = CsrMatrix {
            n_cols: 2,
            indptr: vec![0, 3],
            indices: vec![0],
            data: vec![1.0],
        };
        assert!(bad_ptr.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_idf_mismatch() {
        let (mut v, _) = TfidfVectorizer::fit_transform(&["alpha beta"]);
        v.idf.pop();
        assert!(v.validate().is_err());
    }
}
