//! Seed corpus scanning.
//!
//! Reads the top level of the seeds directory (no recursion), keeps files
//! whose name matches one of the include globs, and returns them sorted by
//! file name. Glob matching ignores case, so `*.md` also picks up
//! `NOTES.MD`.

use anyhow::Result;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::path::Path;
use walkdir::WalkDir;

use support_triage_core::models::SeedDocument;

/// Collect the seed documents under `dir`.
///
/// A missing directory yields an empty corpus. Files that cannot be read as
/// UTF-8 text are skipped with a warning. Only an invalid glob pattern is an
/// error.
pub fn scan_seeds(dir: &Path, include_globs: &[String]) -> Result<Vec<SeedDocument>> {
    let include_set = build_globset(include_globs)?;

    if !dir.is_dir() {
        tracing::warn!(dir = %dir.display(), "seeds directory not found, corpus is empty");
        return Ok(Vec::new());
    }

    let mut docs = Vec::new();

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "skipping unreadable seed entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy().to_string();
        if !include_set.is_match(&name) {
            continue;
        }

        match std::fs::read_to_string(entry.path()) {
            Ok(text) => docs.push(SeedDocument { path: name, text }),
            Err(e) => {
                tracing::warn!(path = %entry.path().display(), error = %e, "skipping unreadable seed file");
            }
        }
    }

    // walkdir sorts by OsStr; re-sort on the lossy names we actually store.
    docs.sort_by(|a, b| a.path.cmp(&b.path));

    Ok(docs)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(GlobBuilder::new(pattern).case_insensitive(true).build()?);
    }
    Ok(builder.build()?)
}
