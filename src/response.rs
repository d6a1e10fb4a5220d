//! IRC numeric reply codes.
//!
//! Maps the three-digit numerics the session core consumes to symbolic
//! names and classifies them for the async request matcher. The enum,
//! the code lookup, and the name table are all generated from the one
//! listing in `responses!`, so a numeric cannot drift out of sync with
//! its name.
//!
//! # Reference
//! - RFC 2812: Internet Relay Chat: Client Protocol
//! - Modern IRC documentation: <https://modern.ircdocs.horse/>

#![allow(non_camel_case_types)]

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

macro_rules! responses {
    ($($name:ident = $code:literal,)+) => {
        /// IRC server reply code.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[repr(u16)]
        #[non_exhaustive]
        pub enum Response {
            $(
                #[allow(missing_docs)]
                $name = $code,
            )+
        }

        impl Response {
            /// Look up a response by numeric code.
            pub fn from_code(code: u16) -> Option<Response> {
                match code {
                    $($code => Some(Response::$name),)+
                    _ => None,
                }
            }

            /// The symbolic name of this numeric (`"RPL_WELCOME"`, ...).
            pub fn name(&self) -> &'static str {
                match self {
                    $(Response::$name => stringify!($name),)+
                }
            }
        }
    };
}

responses! {
    // Connection registration
    RPL_WELCOME = 1,
    RPL_YOURHOST = 2,
    RPL_CREATED = 3,
    RPL_MYINFO = 4,
    RPL_ISUPPORT = 5,

    // Command replies
    RPL_UMODEIS = 221,
    RPL_AWAY = 301,
    RPL_USERHOST = 302,
    RPL_ISON = 303,
    RPL_UNAWAY = 305,
    RPL_NOWAWAY = 306,
    RPL_WHOISUSER = 311,
    RPL_WHOISSERVER = 312,
    RPL_WHOISOPERATOR = 313,
    RPL_WHOWASUSER = 314,
    RPL_ENDOFWHO = 315,
    RPL_WHOISIDLE = 317,
    RPL_ENDOFWHOIS = 318,
    RPL_WHOISCHANNELS = 319,
    RPL_LISTSTART = 321,
    RPL_LIST = 322,
    RPL_LISTEND = 323,
    RPL_CHANNELMODEIS = 324,
    RPL_CREATIONTIME = 329,
    RPL_WHOISACCOUNT = 330,
    RPL_NOTOPIC = 331,
    RPL_TOPIC = 332,
    RPL_TOPICWHOTIME = 333,
    RPL_WHOREPLY = 352,
    RPL_NAMREPLY = 353,
    RPL_WHOSPCRPL = 354,
    RPL_ENDOFNAMES = 366,
    RPL_BANLIST = 367,
    RPL_ENDOFBANLIST = 368,
    RPL_ENDOFWHOWAS = 369,
    RPL_MOTD = 372,
    RPL_MOTDSTART = 375,
    RPL_ENDOFMOTD = 376,

    // Error replies
    ERR_NOSUCHNICK = 401,
    ERR_NOSUCHSERVER = 402,
    ERR_NOSUCHCHANNEL = 403,
    ERR_CANNOTSENDTOCHAN = 404,
    ERR_TOOMANYCHANNELS = 405,
    ERR_WASNOSUCHNICK = 406,
    ERR_UNKNOWNCOMMAND = 421,
    ERR_NOMOTD = 422,
    ERR_NONICKNAMEGIVEN = 431,
    ERR_ERRONEOUSNICKNAME = 432,
    ERR_NICKNAMEINUSE = 433,
    ERR_UNAVAILRESOURCE = 437,
    ERR_USERNOTINCHANNEL = 441,
    ERR_NOTONCHANNEL = 442,
    ERR_USERONCHANNEL = 443,
    ERR_NOTREGISTERED = 451,
    ERR_NEEDMOREPARAMS = 461,
    ERR_ALREADYREGISTERED = 462,
    ERR_PASSWDMISMATCH = 464,
    ERR_CHANNELISFULL = 471,
    ERR_UNKNOWNMODE = 472,
    ERR_INVITEONLYCHAN = 473,
    ERR_BANNEDFROMCHAN = 474,
    ERR_BADCHANNELKEY = 475,
    ERR_BADCHANNAME = 479,
    ERR_NOPRIVILEGES = 481,
    ERR_CHANOPRIVSNEEDED = 482,

    // WATCH presence
    RPL_LOGON = 600,
    RPL_LOGOFF = 601,
    RPL_WATCHOFF = 602,
    RPL_NOWON = 604,
    RPL_NOWOFF = 605,
    RPL_ENDOFWATCHLIST = 607,

    RPL_WHOISSECURE = 671,

    // MONITOR presence
    RPL_MONONLINE = 730,
    RPL_MONOFFLINE = 731,
    RPL_MONLIST = 732,
    RPL_ENDOFMONLIST = 733,
    ERR_MONLISTFULL = 734,

    // SASL / account
    RPL_LOGGEDIN = 900,
    RPL_LOGGEDOUT = 901,
    ERR_NICKLOCKED = 902,
    RPL_SASLSUCCESS = 903,
    ERR_SASLFAIL = 904,
    ERR_SASLTOOLONG = 905,
    ERR_SASLABORT = 906,
    ERR_SASLALREADY = 907,
    RPL_SASLMECHS = 908,
}

/// Coarse classification of a numeric, used by the request matcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseKind {
    /// An informational or accumulating reply.
    Reply,
    /// An error reply.
    Error,
    /// A terminating end-of-list marker.
    EndOfList,
    /// A CAP/SASL/account numeric.
    CapSasl,
}

impl Response {
    /// Get the numeric code for this response.
    #[inline]
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Classify this numeric for the request matcher.
    pub fn kind(&self) -> ResponseKind {
        if self.is_end_of_list() {
            ResponseKind::EndOfList
        } else if self.is_sasl() {
            ResponseKind::CapSasl
        } else if self.is_error() {
            ResponseKind::Error
        } else {
            ResponseKind::Reply
        }
    }

    /// Check if this is an error response.
    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(self.code(), 400..=599 | 734 | 902 | 904..=907)
    }

    /// Check if this is a terminating end-of-list marker.
    #[inline]
    pub fn is_end_of_list(&self) -> bool {
        matches!(
            self,
            Response::RPL_ENDOFWHO
                | Response::RPL_ENDOFWHOIS
                | Response::RPL_LISTEND
                | Response::RPL_ENDOFNAMES
                | Response::RPL_ENDOFBANLIST
                | Response::RPL_ENDOFWHOWAS
                | Response::RPL_ENDOFMOTD
                | Response::RPL_ENDOFWATCHLIST
                | Response::RPL_ENDOFMONLIST
        )
    }

    /// Check if this is a SASL/account numeric (900-908).
    #[inline]
    pub fn is_sasl(&self) -> bool {
        matches!(self.code(), 900..=908)
    }
}

impl FromStr for Response {
    type Err = ParseResponseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // On the wire a numeric is exactly three ASCII digits
        if s.len() != 3 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseResponseError::NotANumeric);
        }
        let code = s.parse().map_err(|_| ParseResponseError::NotANumeric)?;
        Response::from_code(code).ok_or(ParseResponseError::Unrecognized(code))
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.code())
    }
}

/// Error when parsing a response code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseResponseError {
    /// The string was not three ASCII digits.
    #[error("not a three-digit numeric")]
    NotANumeric,
    /// The code is syntactically valid but not a known response.
    #[error("unrecognized numeric code {0}")]
    Unrecognized(u16),
}
