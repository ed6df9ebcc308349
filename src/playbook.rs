//! Playbook construction with optional on-disk overrides.
//!
//! For each built-in category the override directory may hold
//! `<stem>_refs.txt` and `<stem>_steps.txt`, where `<stem>` is the
//! lowercase category name. Each file replaces only its own field; a
//! missing or unreadable file leaves the built-in content in place.

use std::path::Path;

use support_triage_core::playbook::{parse_lines, Playbook};

/// Build the playbook table, applying overrides from `dir` when present.
pub fn load_playbook(dir: Option<&Path>) -> Playbook {
    let mut playbook = Playbook::with_defaults();

    let Some(dir) = dir else {
        return playbook;
    };
    if !dir.is_dir() {
        tracing::debug!(dir = %dir.display(), "playbook override directory not found");
        return playbook;
    }

    let categories: Vec<String> = playbook.categories().iter().map(|c| c.to_string()).collect();
    for category in categories {
        let stem = category.to_lowercase();

        if let Some(refs) = read_override(&dir.join(format!("{}_refs.txt", stem))) {
            playbook.set_refs(&category, refs);
        }
        if let Some(steps) = read_override(&dir.join(format!("{}_steps.txt", stem))) {
            playbook.set_steps(&category, steps);
        }
    }

    playbook
}

fn read_override(path: &Path) -> Option<Vec<String>> {
    if !path.exists() {
        return None;
    }
    match std::fs::read_to_string(path) {
        Ok(text) => {
            let lines = parse_lines(&text);
            tracing::info!(path = %path.display(), entries = lines.len(), "applied playbook override");
            Some(lines)
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "unreadable playbook override, keeping default");
            None
        }
    }
}
