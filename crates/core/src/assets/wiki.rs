//! MediaWiki summary parsing and cache file naming.

use serde_json::Value;

/// Pull the first non-empty `extract` out of a MediaWiki query response.
///
/// Missing pages come back with a negative id and no extract; those are
/// skipped.
pub fn parse_extract(body: &Value) -> Option<String> {
    body.get("query")?
        .get("pages")?
        .as_object()?
        .values()
        .filter_map(|page| page.get("extract").and_then(Value::as_str))
        .map(str::trim)
        .find(|extract| !extract.is_empty())
        .map(str::to_string)
}

/// Turn a title or id into a safe file stem.
///
/// Letters, digits, `-`, `_` and `.` are kept; anything else becomes `_`.
pub fn sanitize_file_name(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|ch| {
            if ch.is_alphanumeric() || matches!(ch, '-' | '_' | '.') {
                ch
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.');
    if cleaned.is_empty() {
        "_".to_string()
    } else {
        cleaned.to_string()
    }
}
