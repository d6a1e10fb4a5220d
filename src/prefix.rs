//! Message prefix (source) handling.
//!
//! A prefix is either a server name or a `nick!user@host` triple with
//! everything after the nick optional.

use std::fmt;

/// The source of an IRC message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Prefix {
    /// A server name.
    Server(String),
    /// A user, as `nick[!user][@host]`.
    User {
        /// Nickname.
        nick: String,
        /// Ident/username, if present.
        user: Option<String>,
        /// Hostname, if present.
        host: Option<String>,
    },
}

impl Prefix {
    /// Parse a prefix string (without the leading `:`).
    ///
    /// The string is split on the first `!`, then the right part on the
    /// first `@`. A bare token containing a `.` but neither separator is
    /// taken to be a server name.
    pub fn parse(s: &str) -> Prefix {
        let (nick, rest) = match s.split_once('!') {
            Some((nick, rest)) => (nick, Some(rest)),
            None => match s.split_once('@') {
                Some((nick, host)) => {
                    return Prefix::User {
                        nick: nick.to_string(),
                        user: None,
                        host: Some(host.to_string()),
                    }
                }
                None => (s, None),
            },
        };

        match rest {
            Some(rest) => {
                let (user, host) = match rest.split_once('@') {
                    Some((user, host)) => (user.to_string(), Some(host.to_string())),
                    None => (rest.to_string(), None),
                };
                Prefix::User {
                    nick: nick.to_string(),
                    user: Some(user),
                    host,
                }
            }
            None if nick.contains('.') => Prefix::Server(nick.to_string()),
            None => Prefix::User {
                nick: nick.to_string(),
                user: None,
                host: None,
            },
        }
    }

    /// The nickname, if this prefix names a user.
    pub fn nick(&self) -> Option<&str> {
        match self {
            Prefix::User { nick, .. } => Some(nick),
            Prefix::Server(_) => None,
        }
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Prefix::Server(name) => f.write_str(name),
            Prefix::User { nick, user, host } => {
                f.write_str(nick)?;
                if let Some(user) = user {
                    write!(f, "!{}", user)?;
                }
                if let Some(host) = host {
                    write!(f, "@{}", host)?;
                }
                Ok(())
            }
        }
    }
}
