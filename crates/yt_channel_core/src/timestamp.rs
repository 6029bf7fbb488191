use chrono::{DateTime, Datelike, FixedOffset};
use url::Url;

/// Parses an RFC 3339 `publishedAt` value, keeping its offset.
pub fn parse_published_at(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw.trim()).ok()
}

/// Calendar year in the timestamp's own offset, not converted to UTC.
pub fn published_year(raw: &str) -> Option<i32> {
    parse_published_at(raw).map(|value| value.year())
}

/// Accepts a bare video id or a watch, youtu.be, shorts or embed link and
/// returns the id. Blank input yields `None`.
pub fn normalize_video_id(raw: &str) -> Option<String> {
    let cleaned = raw.trim();
    if cleaned.is_empty() {
        return None;
    }
    let Ok(url) = Url::parse(cleaned) else {
        return Some(cleaned.to_string());
    };
    let host = url.host_str().unwrap_or_default();
    if host.ends_with("youtu.be") {
        return url
            .path_segments()
            .and_then(|mut segments| segments.next())
            .filter(|segment| !segment.is_empty())
            .map(str::to_string);
    }
    if host.ends_with("youtube.com") {
        if let Some((_, value)) = url.query_pairs().find(|(key, _)| key == "v") {
            let value = value.trim();
            return (!value.is_empty()).then(|| value.to_string());
        }
        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();
        if let [kind, id, ..] = segments.as_slice() {
            if matches!(*kind, "shorts" | "embed" | "live" | "v") {
                return Some(id.to_string());
            }
        }
        return None;
    }
    Some(cleaned.to_string())
}
