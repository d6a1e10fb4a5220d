//! Wire serialization for [`Message`].
//!
//! The body (everything after the tags section) is capped at 510 bytes
//! so the line fits the 512-byte wire limit once CRLF is appended by
//! the codec. When the cap is exceeded, the final (trailing) parameter
//! is truncated on a UTF-8 boundary; callers that cannot tolerate
//! truncation must split their text beforehand. The tags section has
//! its own, larger budget per the IRCv3 message-tags spec and is not
//! counted against the body cap.

use std::fmt;

use crate::util::{truncate_utf8_safe, MAX_BODY_LEN};

use super::types::Message;
use super::TAG_VALUE_ESCAPES;

/// Check if a string needs colon-prefixing as a trailing IRC argument.
#[inline]
fn needs_colon_prefix(s: &str) -> bool {
    s.is_empty() || s.contains(' ') || s.starts_with(':')
}

/// Append a tag value, escaping the characters the wire format reserves.
fn push_tag_value(out: &mut String, value: &str) {
    for c in value.chars() {
        match TAG_VALUE_ESCAPES.iter().find(|(_, literal)| *literal == c) {
            Some((wire, _)) => {
                out.push('\\');
                out.push(*wire);
            }
            None => out.push(c),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(tags) = &self.tags {
            if !tags.is_empty() {
                let mut section = String::with_capacity(32);
                section.push('@');
                for (i, tag) in tags.iter().enumerate() {
                    if i > 0 {
                        section.push(';');
                    }
                    section.push_str(&tag.key);
                    if let Some(value) = &tag.value {
                        section.push('=');
                        push_tag_value(&mut section, value);
                    }
                }
                section.push(' ');
                f.write_str(&section)?;
            }
        }

        let mut body = String::with_capacity(64);
        if let Some(prefix) = &self.prefix {
            body.push(':');
            body.push_str(&prefix.to_string());
            body.push(' ');
        }
        body.push_str(&self.command);

        if let Some((last, middle)) = self.params.split_last() {
            for param in middle {
                body.push(' ');
                body.push_str(param);
            }
            body.push(' ');
            if needs_colon_prefix(last) {
                body.push(':');
            }
            let budget = MAX_BODY_LEN.saturating_sub(body.len());
            body.push_str(truncate_utf8_safe(last, budget));
        }

        f.write_str(&body)
    }
}
