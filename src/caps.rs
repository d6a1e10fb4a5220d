//! IRCv3 capability negotiation support.
//!
//! Typed names for the capabilities the session core negotiates and
//! reacts to. Anything else a host requests passes through as
//! [`Capability::Custom`].
//!
//! # Reference
//! - IRCv3 Capability Negotiation: <https://ircv3.net/specs/extensions/capability-negotiation>

/// Known IRCv3 capability types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Show all user prefix modes in NAMES
    MultiPrefix,
    /// SASL authentication
    Sasl,
    /// Notify of account login/logout
    AccountNotify,
    /// Notify of away status changes
    AwayNotify,
    /// Extended JOIN with account and realname
    ExtendedJoin,
    /// Notify of hostname changes
    ChgHost,
    /// Full nick!user@host in NAMES
    UserhostInNames,
    /// Unknown/custom capability
    Custom(String),
}

impl AsRef<str> for Capability {
    fn as_ref(&self) -> &str {
        match self {
            Self::MultiPrefix => "multi-prefix",
            Self::Sasl => "sasl",
            Self::AccountNotify => "account-notify",
            Self::AwayNotify => "away-notify",
            Self::ExtendedJoin => "extended-join",
            Self::ChgHost => "chghost",
            Self::UserhostInNames => "userhost-in-names",
            Self::Custom(s) => s,
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

impl From<&str> for Capability {
    fn from(s: &str) -> Self {
        match s {
            "multi-prefix" => Self::MultiPrefix,
            "sasl" => Self::Sasl,
            "account-notify" => Self::AccountNotify,
            "away-notify" => Self::AwayNotify,
            "extended-join" => Self::ExtendedJoin,
            "chghost" => Self::ChgHost,
            "userhost-in-names" => Self::UserhostInNames,
            other => Self::Custom(other.to_string()),
        }
    }
}

/// The capabilities requested when the host does not override them.
pub fn default_request() -> Vec<Capability> {
    vec![
        Capability::MultiPrefix,
        Capability::AccountNotify,
        Capability::AwayNotify,
        Capability::ExtendedJoin,
        Capability::ChgHost,
    ]
}
