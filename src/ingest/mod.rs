// src/ingest/mod.rs
pub mod config;
pub mod dedup;
pub mod fetch;
pub mod pipeline;
pub mod providers;
pub mod registry;
pub mod types;

use metrics::{describe_counter, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("fetch_attempts_total", "HTTP attempts across all candidates.");
        describe_counter!("fetch_failures_total", "Failed fetch attempts.");
        describe_counter!(
            "fetch_exhausted_total",
            "Resources for which every candidate failed."
        );
        describe_counter!(
            "source_errors_total",
            "Sources skipped in a run (fetch, parse or task failure)."
        );
        describe_counter!("ingest_items_total", "Items produced by the normalizer.");
        describe_counter!("pipeline_runs_total", "Pipeline runs started.");
        describe_counter!(
            "pipeline_deadline_hits_total",
            "Runs that stopped issuing batches at the deadline."
        );
        describe_histogram!("ingest_parse_ms", "Feed parse time in milliseconds.");
        describe_histogram!("pipeline_run_ms", "Wall-clock run time in milliseconds.");
    });
}

/// Plain-text excerpt: strip tags, decode entities, collapse whitespace.
pub fn collapse_html(s: &str) -> String {
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)<[^>]*>").unwrap());
    let stripped = re_tags.replace_all(s, " ");

    let decoded = html_escape::decode_html_entities(&stripped);

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    re_ws.replace_all(&decoded, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapse_html_strips_tags_and_entities() {
        let s = "<p>Notice&nbsp;of\n  <b>proposed</b> rule</p>&amp; more";
        assert_eq!(collapse_html(s), "Notice of proposed rule & more");
    }

    #[test]
    fn collapse_html_plain_text_passthrough() {
        assert_eq!(collapse_html("  令和6年  改正  "), "令和6年 改正");
        assert_eq!(collapse_html(""), "");
    }
}
