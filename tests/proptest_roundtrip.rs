//! Property-based tests for the message codec.
//!
//! Uses proptest to generate random IRC components and verify that:
//! 1. Parsing never panics on well-formed input
//! 2. Serialized messages can be re-parsed (roundtrip)
//! 3. Case-fold invariants hold across random inputs

use proptest::prelude::*;
use slirc_session::{CaseMapping, Message, Prefix, Tag};

// =============================================================================
// STRATEGIES - Generators for valid IRC components
// =============================================================================

/// Valid IRC nickname: starts with letter or special char, followed by
/// letters, digits, or special chars. Max 9 chars per RFC 2812.
fn nickname_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z\\[\\]\\\\^_`{|}][a-zA-Z0-9\\-\\[\\]\\\\^_`{|}]{0,8}")
        .expect("valid regex")
}

/// Valid IRC username (ident): alphanumeric, no spaces or @ or !
fn username_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9]{0,9}").expect("valid regex")
}

/// Valid hostname: simplified version
fn hostname_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z0-9]+(\\.[a-z0-9]+)*").expect("valid regex")
}

/// Valid IRC channel name: starts with # or &, followed by valid chars
fn channel_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[#&][a-zA-Z0-9_\\-]{1,49}").expect("valid regex")
}

/// Message text without CR/LF/NUL, kept ASCII and short enough that the
/// 510-byte body cap never truncates it
fn message_text_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[ -~]{0,300}").expect("valid regex")
}

/// Tag key: alphanumeric with optional vendor prefix
fn tag_key_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9\\-]{0,30}").expect("valid regex")
}

/// Tag value: benign characters only (escaping is exercised separately)
fn tag_value_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9._\\-]{0,200}").expect("valid regex")
}

/// Generate a valid Prefix
fn prefix_strategy() -> impl Strategy<Value = Prefix> {
    prop_oneof![
        prop::string::string_regex("[a-z]+\\.[a-z]+\\.[a-z]+")
            .expect("valid regex")
            .prop_map(Prefix::Server),
        (nickname_strategy(), username_strategy(), hostname_strategy()).prop_map(
            |(nick, user, host)| Prefix::User {
                nick,
                user: Some(user),
                host: Some(host),
            }
        ),
    ]
}

/// Generate a valid Tag
fn tag_strategy() -> impl Strategy<Value = Tag> {
    (tag_key_strategy(), prop::option::of(tag_value_strategy()))
        .prop_map(|(key, value)| Tag { key, value })
}

/// Generate simple command/param shapes that are easy to roundtrip
fn command_strategy() -> impl Strategy<Value = Message> {
    prop_oneof![
        (channel_strategy(), message_text_strategy())
            .prop_map(|(target, text)| Message::privmsg(&target, &text)),
        (channel_strategy(), message_text_strategy())
            .prop_map(|(target, text)| Message::notice(&target, &text)),
        nickname_strategy().prop_map(|nick| Message::nick(&nick)),
        channel_strategy().prop_map(|chan| Message::join(&chan, None)),
        (channel_strategy(), prop::option::of(message_text_strategy()))
            .prop_map(|(chan, reason)| Message::part(&chan, reason.as_deref())),
        hostname_strategy().prop_map(|server| Message::ping(&server)),
        hostname_strategy().prop_map(|server| Message::pong(&server)),
        prop::option::of(message_text_strategy())
            .prop_map(|reason| Message::quit(reason.as_deref())),
        (channel_strategy(), prop::option::of(message_text_strategy()))
            .prop_map(|(chan, topic)| Message::topic(&chan, topic.as_deref())),
        (
            channel_strategy(),
            nickname_strategy(),
            prop::option::of(message_text_strategy())
        )
            .prop_map(|(chan, nick, reason)| Message::kick(&chan, &nick, reason.as_deref())),
        nickname_strategy().prop_map(|nick| Message::whois(&nick)),
        channel_strategy().prop_map(|chan| Message::who(&chan)),
    ]
}

/// Generate a complete valid Message
fn message_strategy() -> impl Strategy<Value = Message> {
    (
        prop::option::of(prop::collection::vec(tag_strategy(), 0..5)),
        prop::option::of(prefix_strategy()),
        command_strategy(),
    )
        .prop_map(|(tags, prefix, mut msg)| {
            msg.tags = tags.filter(|t| !t.is_empty());
            msg.prefix = prefix;
            msg
        })
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// The fundamental roundtrip property: serialize then parse = identity
    #[test]
    fn message_roundtrip(msg in message_strategy()) {
        let serialized = msg.to_string();
        let parsed: Message = serialized.parse()
            .expect("serialized message should be parseable");
        prop_assert_eq!(&msg, &parsed,
            "roundtrip failed for serialized: {}", serialized);
    }

    /// Prefix roundtrip: any valid prefix can be parsed and re-serialized
    #[test]
    fn prefix_roundtrip(prefix in prefix_strategy()) {
        let serialized = prefix.to_string();
        let parsed = Prefix::parse(&serialized);
        prop_assert_eq!(&prefix, &parsed,
            "prefix roundtrip failed for: {}", serialized);
    }

    /// A tag survives serialization with key and value intact
    #[test]
    fn tag_in_message_roundtrip(
        key in tag_key_strategy(),
        value in prop::option::of(tag_value_strategy())
    ) {
        let msg = Message::ping("test").with_tag(&key, value.as_deref());
        let serialized = msg.to_string();
        let parsed: Message = serialized.parse().expect("tagged message should parse");

        let tags = parsed.tags.as_ref().expect("tags should exist");
        prop_assert!(
            tags.iter().any(|t| t.key == key && t.value == value),
            "tag {:?}={:?} not found in parsed message", key, value
        );
    }

    /// Parsing never panics on anything the serializer can produce
    #[test]
    fn parse_never_panics_on_valid_input(msg in message_strategy()) {
        let serialized = msg.to_string();
        let _ = serialized.parse::<Message>();
    }

    /// The source nickname comes back out of a full prefix
    #[test]
    fn source_nickname_extraction(
        nick in nickname_strategy(),
        user in username_strategy(),
        host in hostname_strategy()
    ) {
        let msg = Message::ping("test").with_prefix(Prefix::User {
            nick: nick.clone(),
            user: Some(user),
            host: Some(host),
        });
        prop_assert_eq!(msg.source_nick(), Some(nick.as_str()));
    }

    /// Case folding is idempotent under every mapping
    #[test]
    fn fold_idempotent(s in "[ -~]{0,40}") {
        for mapping in [CaseMapping::Ascii, CaseMapping::Rfc1459, CaseMapping::StrictRfc1459] {
            let once = mapping.fold(&s);
            prop_assert_eq!(&mapping.fold(&once), &once);
        }
    }

    /// Folded-equal strings compare equal and vice versa
    #[test]
    fn fold_consistent_with_eq(a in nickname_strategy(), b in nickname_strategy()) {
        for mapping in [CaseMapping::Ascii, CaseMapping::Rfc1459, CaseMapping::StrictRfc1459] {
            prop_assert_eq!(mapping.eq(&a, &b), mapping.fold(&a) == mapping.fold(&b));
        }
    }
}

// =============================================================================
// EDGE CASE TESTS
// =============================================================================

proptest! {
    /// Empty message text round-trips through the trailing-colon form
    #[test]
    fn empty_message_text_roundtrip(target in channel_strategy()) {
        let msg = Message::privmsg(&target, "");
        let serialized = msg.to_string();
        let parsed: Message = serialized.parse().expect("should parse");
        prop_assert_eq!(msg, parsed);
    }

    /// Multiple tags maintain order and values
    #[test]
    fn multiple_tags_roundtrip(tags in prop::collection::vec(tag_strategy(), 1..5)) {
        let mut msg = Message::ping("test");
        msg.tags = Some(tags.clone());

        let serialized = msg.to_string();
        let parsed: Message = serialized.parse().expect("should parse");

        let parsed_tags = parsed.tags.as_ref().expect("tags should exist");
        prop_assert_eq!(tags.len(), parsed_tags.len());
        for tag in &tags {
            prop_assert!(
                parsed_tags.iter().any(|t| t.key == tag.key && t.value == tag.value),
                "tag {:?} not found in parsed message", tag
            );
        }
    }
}
