//! Filename resolution for downloaded content.

/// Name used when neither the response nor the URL suggests one.
pub const DEFAULT_FILE_NAME: &str = "dummy.txt";

/// Extract the `filename` parameter from a `Content-Disposition` header value.
///
/// Quoted and bare values are accepted. Any directory components are
/// stripped so the result can never escape the destination directory.
#[must_use]
pub fn filename_from_disposition(header: &str) -> Option<String> {
    header
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("filename"))
        .map(|(_, value)| value.trim().trim_matches('"'))
        .and_then(sanitize_file_name)
}

/// Last non-empty path segment of a URL.
#[must_use]
pub fn filename_from_url(raw: &str) -> Option<String> {
    let parsed = url::Url::parse(raw).ok()?;
    parsed
        .path_segments()?
        .rev()
        .find(|segment| !segment.is_empty())
        .and_then(sanitize_file_name)
}

/// Reduce a candidate name to its final path component, rejecting empty and dot names.
#[must_use]
pub fn sanitize_file_name(candidate: &str) -> Option<String> {
    let base = candidate
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    match base {
        "" | "." | ".." => None,
        name => Some(name.to_string()),
    }
}
