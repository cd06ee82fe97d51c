//! Search façade: combines the FTS store with the structural booster and
//! shapes results for either human or `--json` consumption.

use serde::Serialize;
use std::time::Instant;

use crate::booster::Booster;
use crate::chunker;
use crate::error::{AgentdxError, Result};
use crate::fts::FtsStore;

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub max_results: usize,
    pub compact: bool,
    pub json: bool,
    pub filter_path: Option<String>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_results: 25,
            compact: false,
            json: false,
            filter_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResultItem {
    pub file_path: String,
    pub start_line: i32,
    pub end_line: i32,
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    pub query: String,
    pub results: Vec<SearchResultItem>,
    pub timing_ms: u128,
}

const SNIPPET_CHARS: usize = 240;

/// Run a search against `store`, boost the raw hits, apply the optional
/// path filter, and truncate to `options.max_results`.
pub async fn search(
    store: &FtsStore,
    booster: &Booster,
    query: &str,
    options: &SearchOptions,
) -> Result<JsonOutput> {
    let started = Instant::now();

    if query.trim().is_empty() {
        return Err(AgentdxError::query("search query must not be empty"));
    }

    // Over-fetch before filtering/truncating so a path filter doesn't
    // starve the result set.
    let fetch_limit = (options.max_results as i64) * 2;
    let hits = store.search(query, fetch_limit.max(20)).await?;
    let boosted = booster.apply(hits);

    let mut results: Vec<SearchResultItem> = boosted
        .into_iter()
        .filter(|b| {
            options
                .filter_path
                .as_ref()
                .map(|prefix| b.hit.path.starts_with(prefix.as_str()))
                .unwrap_or(true)
        })
        .map(|b| {
            let stripped = chunker::strip_storage_banner(&b.hit.path, &b.hit.content);
            SearchResultItem {
                file_path: b.hit.path,
                start_line: b.hit.start_line,
                end_line: b.hit.end_line,
                score: b.boosted_score,
                content: if options.compact { None } else { Some(stripped) },
            }
        })
        .collect();

    results.truncate(options.max_results);

    Ok(JsonOutput {
        query: query.to_string(),
        results,
        timing_ms: started.elapsed().as_millis(),
    })
}

fn snippet(content: &str) -> String {
    if content.len() <= SNIPPET_CHARS {
        content.to_string()
    } else {
        format!("{}…", &content[..SNIPPET_CHARS])
    }
}

/// Render results for the terminal: compact mode is file paths only (like
/// `grep -l`), otherwise one block per result with its line range.
pub fn print_human(output: &JsonOutput, compact: bool) {
    if output.results.is_empty() {
        crate::info_print!("No results for '{}'", output.query);
        return;
    }

    if compact {
        let mut seen = std::collections::HashSet::new();
        for r in &output.results {
            if seen.insert(r.file_path.clone()) {
                crate::info_print!("{}", r.file_path);
            }
        }
        return;
    }

    for r in &output.results {
        crate::info_print!(
            "{}:{}-{}  score={:.3}",
            r.file_path, r.start_line, r.end_line, r.score
        );
        if let Some(content) = &r.content {
            crate::info_print!("    {}", snippet(content).replace('\n', "\n    "));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippet_truncates_long_content() {
        let long = "x".repeat(500);
        let s = snippet(&long);
        assert!(s.ends_with('…'));
        assert_eq!(s.chars().count(), SNIPPET_CHARS + 1);
    }

    #[test]
    fn test_snippet_keeps_short_content() {
        assert_eq!(snippet("short"), "short");
    }
}
