//! # Support Triage Core
//!
//! Pure logic for Support Triage: the ordered rule classifier, the
//! remediation playbook table, the TF-IDF vectorizer and the document
//! search over it.
//!
//! This crate performs no filesystem, network or logging I/O. Loading rule
//! files, reading seed corpora and persisting the vector store live in the
//! `support-triage` application crate.

pub mod classify;
pub mod models;
pub mod playbook;
pub mod search;
pub mod stopwords;
pub mod tfidf;
