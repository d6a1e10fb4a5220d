//! Utility helpers shared across the crate.

/// Maximum length of a full line on the wire, including CRLF.
pub const MAX_LINE_LEN: usize = 512;

/// Maximum length of the message body (everything after the tags
/// section), excluding CRLF.
pub const MAX_BODY_LEN: usize = 510;

/// Truncates a string to at most `max_bytes` bytes without breaking a
/// multi-byte UTF-8 codepoint at the end.
#[inline]
pub fn truncate_utf8_safe(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }

    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }

    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_ascii() {
        assert_eq!(truncate_utf8_safe("hello world", 5), "hello");
        assert_eq!(truncate_utf8_safe("hello", 10), "hello");
        assert_eq!(truncate_utf8_safe("", 5), "");
        assert_eq!(truncate_utf8_safe("hello", 0), "");
    }

    #[test]
    fn test_truncate_multibyte() {
        let s = "café";
        assert_eq!(truncate_utf8_safe(s, 4), "caf");
        assert_eq!(truncate_utf8_safe(s, 5), "café");

        let s = "日本語";
        assert_eq!(truncate_utf8_safe(s, 3), "日");
        assert_eq!(truncate_utf8_safe(s, 5), "日");
        assert_eq!(truncate_utf8_safe(s, 6), "日本");
    }
}
