//! Error types for the session core.
//!
//! This module defines the errors surfaced by the public API, plus the
//! codec-level parse error reported (via an event) for undecodable
//! inbound lines.

use thiserror::Error;

/// Convenience type alias for Results using [`SessionError`].
pub type Result<T, E = SessionError> = std::result::Result<T, E>;

/// Errors surfaced by the session API.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    /// The codec could not extract a command from a line.
    #[error("malformed line")]
    MalformedLine(#[from] MessageParseError),

    /// A nickname, channel, or parameter contained disallowed characters
    /// or was out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation attempted before registration completed.
    #[error("not registered with the server")]
    NotRegistered,

    /// Operation requires a capability or ISUPPORT token the network
    /// does not advertise.
    #[error("not supported by this network: {0}")]
    NotSupported(&'static str),

    /// A pending request terminated via a matched error numeric.
    #[error("request failed with numeric {numeric}: {line}")]
    AsyncRequest {
        /// The error numeric code (e.g. 401).
        numeric: u16,
        /// The raw offending line.
        line: String,
    },

    /// A pending request was aborted by connection loss.
    #[error("disconnected")]
    Disconnected,

    /// A pending request was aborted by the caller.
    #[error("cancelled")]
    Cancelled,

    /// The underlying stream failed. Fatal; forces disconnection.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
}

impl SessionError {
    /// Whether this error terminates the session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Errors encountered when parsing IRC messages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MessageParseError {
    /// Message was empty.
    #[error("empty message")]
    EmptyMessage,

    /// No command could be found in the line.
    #[error("missing command")]
    MissingCommand,

    /// The command was neither alphabetic nor a three-digit numeric.
    #[error("invalid command: {0}")]
    InvalidCommand(String),
}
