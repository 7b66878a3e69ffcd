//! Utility functions for attachment naming and display

/// Longest file name kept when deriving content names
const MAX_FILE_NAME_LEN: usize = 128;

/// Format a byte count for display
///
/// Uses decimal-free bytes below 1 KB and one decimal place above.
///
/// # Examples
///
/// ```
/// use alertbox::utils::format_bytes;
///
/// assert_eq!(format_bytes(512), "512 B");
/// assert_eq!(format_bytes(1536), "1.5 KB");
/// assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
/// ```
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Derive an attachment name from its URL
///
/// Uses the last non-empty path segment, falling back to `"attachment"` when
/// the URL has none or cannot be parsed.
///
/// # Examples
///
/// ```
/// use alertbox::utils::attachment_name_from_url;
///
/// assert_eq!(attachment_name_from_url("https://example.com/a/photo.jpg"), "photo.jpg");
/// assert_eq!(attachment_name_from_url("https://example.com/"), "attachment");
/// ```
pub fn attachment_name_from_url(url: &str) -> String {
    if let Ok(parsed_url) = url::Url::parse(url)
        && let Some(mut segments) = parsed_url.path_segments()
        && let Some(last_segment) = segments.next_back()
        && !last_segment.is_empty()
    {
        return last_segment.to_string();
    }

    "attachment".to_string()
}

/// Reduce a display name to a safe single path component
///
/// Keeps ASCII alphanumerics, `.`, `-` and `_`; everything else becomes `_`.
/// Leading dots are stripped so the result is never hidden or a parent
/// reference, and the stem is truncated while preserving the extension.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        return "attachment".to_string();
    }
    if cleaned.len() <= MAX_FILE_NAME_LEN {
        return cleaned.to_string();
    }

    // All characters are ASCII here, so byte slicing is on char boundaries
    match cleaned.rfind('.') {
        Some(dot) if cleaned.len() - dot <= 16 => {
            let ext = &cleaned[dot..];
            format!("{}{}", &cleaned[..MAX_FILE_NAME_LEN - ext.len()], ext)
        }
        _ => cleaned[..MAX_FILE_NAME_LEN].to_string(),
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes_units() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1_258_291), "1.2 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn test_attachment_name_from_url_path() {
        assert_eq!(
            attachment_name_from_url("https://example.com/files/report.pdf?sig=abc"),
            "report.pdf"
        );
        assert_eq!(
            attachment_name_from_url("https://example.com/files/"),
            "attachment"
        );
        assert_eq!(attachment_name_from_url("not a url"), "attachment");
    }

    #[test]
    fn test_sanitize_file_name_strips_separators_and_dots() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "_.._etc_passwd");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name("my photo (1).jpg"), "my_photo__1_.jpg");
        assert_eq!(sanitize_file_name(""), "attachment");
        assert_eq!(sanitize_file_name("..."), "attachment");
    }

    #[test]
    fn test_sanitize_file_name_truncates_keeping_extension() {
        let long = format!("{}.jpeg", "a".repeat(300));
        let sanitized = sanitize_file_name(&long);
        assert_eq!(sanitized.len(), MAX_FILE_NAME_LEN);
        assert!(sanitized.ends_with(".jpeg"));
    }
}
