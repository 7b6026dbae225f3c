// ABOUTME: Small string helpers shared by the API client and storage layer
// ABOUTME: UTF-8 safe truncation for log previews and filesystem-safe names

pub fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.len() <= max_chars {
        return s.to_string();
    }

    // Find a valid UTF-8 boundary at or before max_chars
    let mut boundary = max_chars;
    while boundary > 0 && !s.is_char_boundary(boundary) {
        boundary -= 1;
    }

    if boundary == 0 {
        return String::new();
    }

    format!("{}...", &s[..boundary])
}


/// Strips characters that are not allowed in file names and replaces spaces
/// with underscores. Path separators and `..` components never survive, so the
/// result is always a single path segment.
pub fn sanitize_filename(name: &str) -> String {
    const INVALID: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

    let cleaned: String = name
        .chars()
        .filter(|c| !INVALID.contains(c) && !c.is_control())
        .map(|c| if c == ' ' { '_' } else { c })
        .collect();

    match cleaned.trim_matches('.') {
        "" => "_".to_string(),
        _ => cleaned,
    }
}

#[cfg(test)]
mod filename_tests {
    use super::*;

    #[test]
    fn test_sanitize_filename_basic() {
        assert_eq!(sanitize_filename("Q4 Planning"), "Q4_Planning");
        assert_eq!(sanitize_filename("a<b>c:d\"e|f?g*h"), "abcdefgh");
    }

    #[test]
    fn test_sanitize_filename_paths() {
        assert_eq!(sanitize_filename("../etc/passwd"), "..etcpasswd");
        assert_eq!(sanitize_filename(".."), "_");
        assert_eq!(sanitize_filename(""), "_");
        assert_eq!(sanitize_filename("c:\\temp"), "ctemp");
    }

    #[test]
    fn test_sanitize_filename_keeps_ids() {
        assert_eq!(
            sanitize_filename("3f2a9c1e-7b4d-4e8a-9f0c-1d2e3f4a5b6c"),
            "3f2a9c1e-7b4d-4e8a-9f0c-1d2e3f4a5b6c"
        );
    }
}
