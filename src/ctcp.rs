//! CTCP framing.
//!
//! A PRIVMSG or NOTICE whose payload starts with `\x01` (and optionally
//! ends with one) carries a Client-To-Client Protocol message. This
//! module extracts the framed verb and argument; payload semantics are
//! left to the host, and nesting is not supported.

/// A CTCP message extracted from a PRIVMSG/NOTICE payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ctcp<'a> {
    /// The CTCP verb (`VERSION`, `ACTION`, ...), as sent.
    pub verb: &'a str,
    /// The argument text after the verb, if any.
    pub args: Option<&'a str>,
}

/// Extract a CTCP message from a PRIVMSG/NOTICE text.
///
/// Returns `None` when the text is not `\x01`-framed or frames an
/// empty payload.
pub fn parse(text: &str) -> Option<Ctcp<'_>> {
    let inner = text.strip_prefix('\u{1}')?;
    let inner = inner.strip_suffix('\u{1}').unwrap_or(inner);
    if inner.is_empty() {
        return None;
    }
    Some(match inner.split_once(' ') {
        Some((verb, args)) => Ctcp {
            verb,
            args: Some(args),
        },
        None => Ctcp { verb: inner, args: None },
    })
}
