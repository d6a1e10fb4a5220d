//! Events emitted by the session.
//!
//! Every observable happening is delivered as one tagged variant
//! through a single channel, in wire arrival order. State mutations for
//! a line complete before that line's event is delivered.

use crate::mode::ModeChange;
use crate::state::SessionState;

/// One observable session event.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Event {
    /// The transport is open and registration has begun.
    Connected,
    /// Registration completed; `nick` is the server-assigned nickname.
    Registered {
        /// The nickname the server assigned.
        nick: String,
    },
    /// The lifecycle state changed.
    StateChanged(SessionState),
    /// The session is fully torn down.
    Disconnected {
        /// Reason for the disconnect.
        reason: String,
    },

    /// A PRIVMSG.
    Privmsg {
        /// Sending nickname, or server name.
        from: String,
        /// Channel or our own nick for private messages.
        target: String,
        /// Message text.
        text: String,
    },
    /// A NOTICE.
    Notice {
        /// Sending nickname, or server name.
        from: String,
        /// Channel or our own nick.
        target: String,
        /// Notice text.
        text: String,
    },
    /// A CTCP request framed inside a PRIVMSG.
    Ctcp {
        /// Sending nickname.
        from: String,
        /// Channel or our own nick.
        target: String,
        /// CTCP verb, as sent.
        verb: String,
        /// Argument text after the verb.
        args: Option<String>,
    },
    /// A CTCP reply framed inside a NOTICE.
    CtcpReply {
        /// Sending nickname.
        from: String,
        /// Channel or our own nick.
        target: String,
        /// CTCP verb, as sent.
        verb: String,
        /// Argument text after the verb.
        args: Option<String>,
    },

    /// A user joined a channel.
    Joined {
        /// The channel.
        channel: String,
        /// Who joined.
        nick: String,
    },
    /// A user left a channel.
    Parted {
        /// The channel.
        channel: String,
        /// Who left.
        nick: String,
        /// Part reason, if given.
        reason: Option<String>,
    },
    /// A user was kicked from a channel.
    Kicked {
        /// The channel.
        channel: String,
        /// Who was kicked.
        nick: String,
        /// Who kicked them.
        by: String,
        /// Kick reason, if given.
        reason: Option<String>,
    },
    /// A user quit the network.
    Quit {
        /// Who quit.
        nick: String,
        /// Quit reason, if given.
        reason: Option<String>,
    },
    /// A user changed nickname.
    NickChanged {
        /// Previous nickname.
        old: String,
        /// New nickname.
        new: String,
    },
    /// Channel or user modes changed.
    ModeChanged {
        /// The channel or nickname the modes apply to.
        target: String,
        /// Who changed them.
        by: String,
        /// The decoded changes.
        changes: Vec<ModeChange>,
    },
    /// A channel topic changed or was learned.
    TopicChanged {
        /// The channel.
        channel: String,
        /// The topic text.
        topic: String,
        /// Who set it, when known.
        set_by: Option<String>,
    },

    /// A user became visible: first sighting in a shared channel, or a
    /// monitored user came online.
    UserAppeared {
        /// The nickname.
        nick: String,
    },
    /// A user is no longer visible: no shared channels and not
    /// monitored, or a monitored user went offline.
    UserVanished {
        /// The nickname.
        nick: String,
    },

    /// A raw line arrived from the server.
    RawIn {
        /// The line, without its terminator.
        line: String,
    },
    /// A raw line was queued for the server.
    RawOut {
        /// The line, without its terminator.
        line: String,
    },
    /// An inbound line could not be parsed and was discarded.
    ParseError {
        /// The offending line.
        line: String,
        /// Why it failed.
        error: String,
    },
}
