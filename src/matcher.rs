//! Wildcard URL matching.
//!
//! Manifest `match` patterns use `*` as "zero or more of any character",
//! e.g. `https://site.test/page/*`. A pattern is compiled to an anchored
//! case-insensitive regex and tested against the full page URL, not just
//! the path. Malformed patterns never escape this module: a compile
//! failure is logged and the pattern treated as non-matching.

use regex::RegexBuilder;

/// Patterns that match every URL, short-circuited without building a regex.
const CATCH_ALL: &[&str] = &["*", "*://*/*"];

/// Test a single wildcard pattern against a URL.
pub fn matches(pattern: &str, url: &str) -> bool {
    // Hand-edited manifests sometimes contain stray spaces ("create/  *").
    let cleaned: String = pattern.split_whitespace().collect();
    if cleaned.is_empty() {
        return false;
    }
    if CATCH_ALL.contains(&cleaned.as_str()) {
        return true;
    }

    let escaped = regex::escape(&cleaned).replace("\\*", ".*");
    let anchored = format!("^{escaped}$");

    match RegexBuilder::new(&anchored).case_insensitive(true).build() {
        Ok(re) => re.is_match(url),
        Err(e) => {
            tracing::warn!("Invalid match pattern {:?}: {}", pattern, e);
            false
        }
    }
}

/// Test a pattern list. An empty list matches every page.
pub fn matches_any(patterns: &[String], url: &str) -> bool {
    if patterns.is_empty() {
        return true;
    }
    patterns.iter().any(|p| matches(p, url))
}
