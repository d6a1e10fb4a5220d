//! Owned IRC message model and builder constructors.

use std::str::FromStr;

use crate::error::MessageParseError;
use crate::prefix::Prefix;
use crate::response::Response;

/// An IRCv3 message tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    /// Tag key, possibly vendor-scoped (`example.com/name`).
    pub key: String,
    /// Decoded tag value. `None` for a bare key, `Some("")` for `key=`.
    pub value: Option<String>,
}

/// A parsed IRC message.
///
/// The generic `{tags, prefix, command, params}` shape covers every
/// command and numeric; builder constructors cover the common client
/// commands.
///
/// # Example
///
/// ```rust
/// use slirc_session::Message;
///
/// let raw = "@time=2023-01-01T12:00:00Z :nick!user@host PRIVMSG #channel :Hello!";
/// let message: Message = raw.parse().expect("valid IRC message");
/// assert_eq!(message.command, "PRIVMSG");
/// assert_eq!(message.param(1), Some("Hello!"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// IRCv3 message tags, if present.
    pub tags: Option<Vec<Tag>>,
    /// Message source, if present.
    pub prefix: Option<Prefix>,
    /// Command verb or three-digit numeric.
    pub command: String,
    /// Parameters, including any trailing argument as the last element.
    pub params: Vec<String>,
}

impl Message {
    /// Create a message from a command and parameter list.
    pub fn new(command: impl Into<String>, params: Vec<String>) -> Self {
        Message {
            tags: None,
            prefix: None,
            command: command.into(),
            params,
        }
    }

    fn cmd(command: &str, params: &[&str]) -> Self {
        Message::new(command, params.iter().map(|p| p.to_string()).collect())
    }

    /// `PRIVMSG target :text`
    pub fn privmsg(target: &str, text: &str) -> Self {
        Message::cmd("PRIVMSG", &[target, text])
    }

    /// `NOTICE target :text`
    pub fn notice(target: &str, text: &str) -> Self {
        Message::cmd("NOTICE", &[target, text])
    }

    /// `JOIN channel [key]`
    pub fn join(channel: &str, key: Option<&str>) -> Self {
        match key {
            Some(key) => Message::cmd("JOIN", &[channel, key]),
            None => Message::cmd("JOIN", &[channel]),
        }
    }

    /// `PART channel [:reason]`
    pub fn part(channel: &str, reason: Option<&str>) -> Self {
        match reason {
            Some(reason) => Message::cmd("PART", &[channel, reason]),
            None => Message::cmd("PART", &[channel]),
        }
    }

    /// `KICK channel nick [:reason]`
    pub fn kick(channel: &str, nick: &str, reason: Option<&str>) -> Self {
        match reason {
            Some(reason) => Message::cmd("KICK", &[channel, nick, reason]),
            None => Message::cmd("KICK", &[channel, nick]),
        }
    }

    /// `QUIT [:reason]`
    pub fn quit(reason: Option<&str>) -> Self {
        match reason {
            Some(reason) => Message::cmd("QUIT", &[reason]),
            None => Message::cmd("QUIT", &[]),
        }
    }

    /// `NICK nickname`
    pub fn nick(nickname: &str) -> Self {
        Message::cmd("NICK", &[nickname])
    }

    /// `USER ident 0 * :realname`
    pub fn user(ident: &str, realname: &str) -> Self {
        Message::cmd("USER", &[ident, "0", "*", realname])
    }

    /// `PASS password`
    pub fn pass(password: &str) -> Self {
        Message::cmd("PASS", &[password])
    }

    /// `PING token`
    pub fn ping(token: &str) -> Self {
        Message::cmd("PING", &[token])
    }

    /// `PONG token`
    pub fn pong(token: &str) -> Self {
        Message::cmd("PONG", &[token])
    }

    /// `CAP subcommand [args]`
    pub fn cap(subcommand: &str, args: Option<&str>) -> Self {
        match args {
            Some(args) => Message::cmd("CAP", &[subcommand, args]),
            None => Message::cmd("CAP", &[subcommand]),
        }
    }

    /// `AUTHENTICATE payload`
    pub fn authenticate(payload: &str) -> Self {
        Message::cmd("AUTHENTICATE", &[payload])
    }

    /// `MODE target [modes [args...]]`
    pub fn mode(target: &str, modes: &[&str]) -> Self {
        let mut params = vec![target];
        params.extend_from_slice(modes);
        Message::cmd("MODE", &params)
    }

    /// `TOPIC channel [:topic]`
    pub fn topic(channel: &str, topic: Option<&str>) -> Self {
        match topic {
            Some(topic) => Message::cmd("TOPIC", &[channel, topic]),
            None => Message::cmd("TOPIC", &[channel]),
        }
    }

    /// `WHOIS nick`
    pub fn whois(nick: &str) -> Self {
        Message::cmd("WHOIS", &[nick])
    }

    /// `WHO target`
    pub fn who(target: &str) -> Self {
        Message::cmd("WHO", &[target])
    }

    /// `LIST [filter]`
    pub fn list(filter: Option<&str>) -> Self {
        match filter {
            Some(filter) => Message::cmd("LIST", &[filter]),
            None => Message::cmd("LIST", &[]),
        }
    }

    /// `NAMES channel`
    pub fn names(channel: &str) -> Self {
        Message::cmd("NAMES", &[channel])
    }

    /// `AWAY [:message]`
    pub fn away(message: Option<&str>) -> Self {
        match message {
            Some(message) => Message::cmd("AWAY", &[message]),
            None => Message::cmd("AWAY", &[]),
        }
    }

    /// Attach a tag, preserving any existing ones.
    pub fn with_tag(mut self, key: &str, value: Option<&str>) -> Self {
        self.tags.get_or_insert_with(Vec::new).push(Tag {
            key: key.to_string(),
            value: value.map(|v| v.to_string()),
        });
        self
    }

    /// Attach a prefix.
    pub fn with_prefix(mut self, prefix: Prefix) -> Self {
        self.prefix = Some(prefix);
        self
    }

    /// Get the decoded value of a tag. Bare keys yield `Some("")`.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .as_ref()?
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.value.as_deref().unwrap_or(""))
    }

    /// Get a parameter by index.
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// Interpret the command as a known numeric, if it is one.
    pub fn response(&self) -> Option<Response> {
        self.command.parse().ok()
    }

    /// The numeric code of the command, known or not.
    pub fn numeric(&self) -> Option<u16> {
        if self.command.len() == 3 && self.command.bytes().all(|b| b.is_ascii_digit()) {
            self.command.parse().ok()
        } else {
            None
        }
    }

    /// The nickname of the message source, if the prefix names a user.
    pub fn source_nick(&self) -> Option<&str> {
        self.prefix.as_ref().and_then(Prefix::nick)
    }
}

impl FromStr for Message {
    type Err = MessageParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        super::parse::parse_line(s)
    }
}
