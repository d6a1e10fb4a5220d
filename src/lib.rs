//! # slirc-session
//!
//! The client-side session core of the slirc family: a live IRC
//! connection with wire-protocol parsing, IRCv3 capability and SASL
//! negotiation, ISUPPORT-driven case mapping and mode classification,
//! an authoritative tracker for users, channels, and memberships, and
//! an async request/response surface for aggregating commands like
//! WHOIS.
//!
//! ## Layers
//!
//! - [`Message`] and friends: the wire codec.
//! - [`Session`](session::Session): the sans-IO state machine — feed it
//!   lines, drain events and outbound messages. Fully testable without
//!   a socket.
//! - [`Client`]: the tokio wrapper — one reader task, one writer task
//!   with flood pacing, events delivered through a single channel.
//!
//! ## Quick Start
//!
//! ```no_run
//! use slirc_session::{Client, Event, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SessionConfig::new("slircbot", "slirc", "slirc session bot");
//!     let (client, mut events) = Client::connect(config, "irc.libera.chat", 6667).await?;
//!
//!     while let Some(event) = events.recv().await {
//!         match event {
//!             Event::Registered { .. } => client.join("#rust", None)?,
//!             Event::Privmsg { from, target, text } => {
//!                 println!("<{}> {}: {}", target, from, text);
//!             }
//!             Event::Disconnected { .. } => break,
//!             _ => {}
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Acknowledgments
//!
//! This project was inspired by the architectural patterns established by
//! [Aaron Weiss (aatxe)](https://github.com/aatxe) in the
//! [irc](https://github.com/aatxe/irc) crate. We are grateful for Aaron's
//! foundational work on IRC protocol handling in Rust.

#![deny(clippy::all)]

pub mod caps;
pub mod casemap;
pub mod client;
pub mod ctcp;
pub mod error;
pub mod event;
pub mod flood;
pub mod isupport;
pub mod message;
pub mod mode;
pub mod monitor;
pub mod prefix;
pub mod request;
pub mod response;
pub mod sasl;
pub mod session;
pub mod state;
pub mod track;
pub mod transport;
pub mod util;

pub use self::caps::Capability;
pub use self::casemap::CaseMapping;
pub use self::client::{Client, EventReceiver, PendingReply, RequestCanceller};
pub use self::error::{MessageParseError, Result, SessionError};
pub use self::event::Event;
pub use self::isupport::Isupport;
pub use self::message::{Message, Tag};
pub use self::mode::ModeChange;
pub use self::monitor::MonitorList;
pub use self::prefix::Prefix;
pub use self::request::{ReplyLines, RequestKind, WhoisInfo};
pub use self::response::{Response, ResponseKind};
pub use self::session::Session;
pub use self::state::{SaslCredentials, SaslPolicy, SessionConfig, SessionState};
pub use self::track::{Channel, ChannelUser, Topic, User};
