//! Nom-based IRC line parser.
//!
//! Splits a raw line into tags, prefix, command, and parameters per the
//! IRCv3 message grammar:
//!
//! ```text
//! ['@' tags SP] [':' prefix SP] command (SP param)* [SP ':' trailing]
//! ```

use nom::{
    bytes::complete::take_while1,
    character::complete::char,
    combinator::opt,
    error::VerboseError,
    sequence::preceded,
    IResult,
};

use crate::error::MessageParseError;
use crate::prefix::Prefix;

use super::types::{Message, Tag};
use super::TAG_VALUE_ESCAPES;

type ParseResult<I, O> = IResult<I, O, VerboseError<I>>;

/// Parse the raw tags section (after `@`, before the first space).
fn parse_tags(input: &str) -> ParseResult<&str, &str> {
    preceded(char('@'), take_while1(|c| c != ' '))(input)
}

/// Parse the raw prefix (after `:`, before the first space).
fn parse_prefix(input: &str) -> ParseResult<&str, &str> {
    preceded(char(':'), take_while1(|c| c != ' '))(input)
}

/// Parse the command token.
fn parse_command(input: &str) -> ParseResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric())(input)
}

fn skip_spaces(input: &str) -> &str {
    input.trim_start_matches(' ')
}

/// A command is either ASCII letters or exactly three ASCII digits.
fn valid_command(cmd: &str) -> bool {
    cmd.bytes().all(|b| b.is_ascii_alphabetic())
        || (cmd.len() == 3 && cmd.bytes().all(|b| b.is_ascii_digit()))
}

/// Decode the IRCv3 escape sequences in a tag value.
///
/// A backslash followed by anything outside the escape table yields
/// that character bare; a trailing backslash is dropped.
fn unescape_tag_value(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        if let Some(escaped) = chars.next() {
            let literal = TAG_VALUE_ESCAPES
                .iter()
                .find(|(wire, _)| *wire == escaped)
                .map_or(escaped, |(_, literal)| *literal);
            out.push(literal);
        }
    }
    out
}

/// Decode the raw tags section into key/value pairs.
fn decode_tags(raw: &str) -> Vec<Tag> {
    raw.split(';')
        .filter(|t| !t.is_empty())
        .map(|t| match t.split_once('=') {
            Some((key, value)) => Tag {
                key: key.to_string(),
                value: Some(unescape_tag_value(value)),
            },
            None => Tag {
                key: t.to_string(),
                value: None,
            },
        })
        .collect()
}

/// Parse one line (CRLF or LF terminated, or bare) into a [`Message`].
///
/// Lines longer than the 512-byte wire limit still parse; the limit is
/// enforced on the serialization side.
pub(super) fn parse_line(input: &str) -> Result<Message, MessageParseError> {
    let trimmed = input.trim_end_matches(['\r', '\n']);
    if trimmed.is_empty() {
        return Err(MessageParseError::EmptyMessage);
    }

    let (rest, raw_tags) =
        opt(parse_tags)(trimmed).map_err(|_| MessageParseError::MissingCommand)?;
    let rest = skip_spaces(rest);

    let (rest, raw_prefix) =
        opt(parse_prefix)(rest).map_err(|_| MessageParseError::MissingCommand)?;
    let rest = skip_spaces(rest);

    let (rest, command) =
        parse_command(rest).map_err(|_: nom::Err<VerboseError<&str>>| {
            MessageParseError::MissingCommand
        })?;
    if !valid_command(command) {
        return Err(MessageParseError::InvalidCommand(command.to_string()));
    }

    // Parameters: space-separated middles; a leading ':' (or the 15th
    // parameter) turns the remainder into one trailing argument.
    let mut params: Vec<String> = Vec::new();
    let mut rest = rest;
    while rest.starts_with(' ') {
        rest = skip_spaces(rest);
        if rest.is_empty() {
            break;
        }
        if let Some(trailing) = rest.strip_prefix(':') {
            params.push(trailing.to_string());
            break;
        }
        if params.len() == 14 {
            params.push(rest.to_string());
            break;
        }
        let end = rest.find(' ').unwrap_or(rest.len());
        params.push(rest[..end].to_string());
        rest = &rest[end..];
    }

    Ok(Message {
        tags: raw_tags.map(decode_tags),
        prefix: raw_prefix.map(Prefix::parse),
        command: command.to_string(),
        params,
    })
}
