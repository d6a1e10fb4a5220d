//! RFC 1459/2812 and IRCv3 compliance tests for the codec surface.
//!
//! This module tests specific edge cases and requirements from:
//! - RFC 1459: Internet Relay Chat Protocol
//! - RFC 2812: Internet Relay Chat: Client Protocol
//! - IRCv3 Message Tags: <https://ircv3.net/specs/extensions/message-tags>

use slirc_session::{CaseMapping, Message, MessageParseError, Prefix};

// =============================================================================
// IRCv3 MESSAGE TAG ESCAPING
// =============================================================================

mod tag_escaping {
    use super::*;

    #[test]
    fn test_escaped_semicolon_in_value() {
        let msg: Message = "@key=value\\:with\\:semicolons :nick PRIVMSG #ch :hi"
            .parse()
            .expect("should parse");
        assert_eq!(msg.tag("key"), Some("value;with;semicolons"));
    }

    #[test]
    fn test_escaped_space_in_value() {
        let msg: Message = "@key=hello\\sworld :nick PRIVMSG #ch :hi"
            .parse()
            .expect("should parse");
        assert_eq!(msg.tag("key"), Some("hello world"));
    }

    #[test]
    fn test_escaped_backslash_and_crlf_in_value() {
        let msg: Message = "@key=a\\\\b\\rc\\nd PING x".parse().expect("should parse");
        assert_eq!(msg.tag("key"), Some("a\\b\rc\nd"));
    }

    #[test]
    fn test_invalid_escape_drops_backslash() {
        let msg: Message = "@key=a\\qb PING x".parse().expect("should parse");
        assert_eq!(msg.tag("key"), Some("aqb"));
    }

    #[test]
    fn test_serialization_escapes_value() {
        let msg = Message::ping("x").with_tag("key", Some("a;b c\\d"));
        let line = msg.to_string();
        assert!(line.starts_with("@key=a\\:b\\sc\\\\d "));
        let reparsed: Message = line.parse().expect("should reparse");
        assert_eq!(reparsed.tag("key"), Some("a;b c\\d"));
    }

    #[test]
    fn test_vendor_scoped_and_client_only_keys() {
        let msg: Message = "@example.com/key=1;+draft/typing=active PING x"
            .parse()
            .expect("should parse");
        assert_eq!(msg.tag("example.com/key"), Some("1"));
        assert_eq!(msg.tag("+draft/typing"), Some("active"));
    }
}

// =============================================================================
// MESSAGE GRAMMAR
// =============================================================================

mod grammar {
    use super::*;

    #[test]
    fn test_command_must_be_letters_or_three_digits() {
        assert!("PRIVMSG #a :b".parse::<Message>().is_ok());
        assert!(":srv 001 n :w".parse::<Message>().is_ok());
        assert!(matches!(
            "12 a".parse::<Message>(),
            Err(MessageParseError::InvalidCommand(_))
        ));
        assert!(matches!(
            "1234 a".parse::<Message>(),
            Err(MessageParseError::InvalidCommand(_))
        ));
        assert!(matches!(
            "PRIV1MSG a".parse::<Message>(),
            Err(MessageParseError::InvalidCommand(_))
        ));
    }

    #[test]
    fn test_trailing_may_contain_spaces_and_colons() {
        let msg: Message = "PRIVMSG #ch :one two : three".parse().unwrap();
        assert_eq!(msg.param(1), Some("one two : three"));
    }

    #[test]
    fn test_middle_param_starting_with_colon_is_trailing() {
        let msg: Message = "USER guest 0 * :Real Name".parse().unwrap();
        assert_eq!(msg.params.len(), 4);
        assert_eq!(msg.param(3), Some("Real Name"));
    }

    #[test]
    fn test_fifteen_parameter_limit() {
        let line = "CMD p1 p2 p3 p4 p5 p6 p7 p8 p9 p10 p11 p12 p13 p14 p15 and more";
        let msg: Message = line.parse().unwrap();
        assert_eq!(msg.params.len(), 15);
        assert_eq!(msg.param(14), Some("p15 and more"));
    }

    #[test]
    fn test_multiple_spaces_between_params() {
        let msg: Message = "PRIVMSG   #ch   :text".parse().unwrap();
        assert_eq!(msg.params, vec!["#ch", "text"]);
    }

    #[test]
    fn test_terminator_variants_accepted() {
        for raw in ["PING x\r\n", "PING x\n", "PING x\r", "PING x"] {
            let msg: Message = raw.parse().expect("should parse");
            assert_eq!(msg.params, vec!["x"]);
        }
    }

    #[test]
    fn test_oversized_inbound_line_still_parses() {
        let raw = format!("PRIVMSG #ch :{}", "y".repeat(2000));
        let msg: Message = raw.parse().expect("should parse");
        assert_eq!(msg.param(1).map(str::len), Some(2000));
    }

    #[test]
    fn test_serialized_body_fits_wire_limit() {
        let msg = Message::privmsg("#channel", &"z".repeat(2000));
        let line = msg.to_string();
        // 510 bytes of body + CRLF appended by the codec = 512
        assert!(line.len() <= 510);
    }
}

// =============================================================================
// PREFIX GRAMMAR
// =============================================================================

mod prefix {
    use super::*;

    #[test]
    fn test_prefix_field_optionality() {
        assert_eq!(
            Prefix::parse("nick!user@host"),
            Prefix::User {
                nick: "nick".into(),
                user: Some("user".into()),
                host: Some("host".into()),
            }
        );
        assert_eq!(
            Prefix::parse("nick!user"),
            Prefix::User {
                nick: "nick".into(),
                user: Some("user".into()),
                host: None,
            }
        );
        assert_eq!(
            Prefix::parse("nick@host"),
            Prefix::User {
                nick: "nick".into(),
                user: None,
                host: Some("host".into()),
            }
        );
    }

    #[test]
    fn test_host_may_contain_at_sign_free_text() {
        // Only the first ! and the first @ after it are separators
        let prefix = Prefix::parse("nick!user@host.with.dots");
        assert_eq!(
            prefix,
            Prefix::User {
                nick: "nick".into(),
                user: Some("user".into()),
                host: Some("host.with.dots".into()),
            }
        );
    }
}

// =============================================================================
// CASE MAPPING TABLES
// =============================================================================

mod casemapping {
    use super::*;

    #[test]
    fn test_rfc1459_bracket_equivalences() {
        let m = CaseMapping::Rfc1459;
        assert!(m.eq("[]\\~", "{}|^"));
        assert!(m.eq("NICK[1]", "nick{1}"));
    }

    #[test]
    fn test_strict_rfc1459_excludes_tilde() {
        let m = CaseMapping::StrictRfc1459;
        assert!(m.eq("[]\\", "{}|"));
        assert!(!m.eq("~", "^"));
    }

    #[test]
    fn test_ascii_mapping_is_plain() {
        let m = CaseMapping::Ascii;
        assert!(m.eq("ABC", "abc"));
        assert!(!m.eq("[", "{"));
    }
}
