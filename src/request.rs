//! Async request-response matching.
//!
//! Commands like WHOIS produce a burst of numerics closed by a
//! terminator. A pending request is registered *before* the provoking
//! command is written, accumulates matching reply lines, and resolves
//! its oneshot completion slot exactly once: on the terminator, on a
//! matched error numeric, on cancellation, or on disconnect.

use tokio::sync::oneshot;
use tracing::debug;

use crate::casemap::CaseMapping;
use crate::error::SessionError;
use crate::message::Message;

/// Identifier for a registered pending request.
pub type RequestId = u64;

/// The aggregated outcome of a pending request: every accumulated
/// reply line plus the terminator.
pub type ReplyLines = Vec<Message>;

/// The completion slot's receiving half.
pub type ReplyReceiver = oneshot::Receiver<Result<ReplyLines, SessionError>>;

/// The kinds of aggregating requests the matcher understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestKind {
    /// WHOIS: 311/312/313/317/319/330/671, closed by 318.
    Whois,
    /// WHO: 352/354, closed by 315.
    Who,
    /// NAMES: 353, closed by 366.
    Names,
    /// LIST: 321/322, closed by 323.
    List,
    /// Ban list (MODE +b query): 367, closed by 368.
    BanList,
    /// MONITOR list status: 732, closed by 733.
    MonitorList,
}

impl RequestKind {
    /// Whether a numeric accumulates into this request's buffer.
    fn accumulates(&self, code: u16) -> bool {
        match self {
            Self::Whois => matches!(code, 301 | 311 | 312 | 313 | 317 | 319 | 330 | 671),
            Self::Who => matches!(code, 352 | 354),
            Self::Names => code == 353,
            Self::List => matches!(code, 321 | 322),
            Self::BanList => code == 367,
            Self::MonitorList => code == 732,
        }
    }

    /// The numeric that completes this request.
    fn terminator(&self) -> u16 {
        match self {
            Self::Whois => 318,
            Self::Who => 315,
            Self::Names => 366,
            Self::List => 323,
            Self::BanList => 368,
            Self::MonitorList => 733,
        }
    }

    /// The numerics that complete this request with an error.
    fn errors(&self) -> &'static [u16] {
        match self {
            Self::Whois => &[401, 402, 431],
            Self::Who => &[],
            Self::Names => &[403],
            Self::List => &[],
            Self::BanList => &[403, 442, 479, 482],
            Self::MonitorList => &[734],
        }
    }

    /// Position of the target parameter in a numeric of this request,
    /// after the leading client-nick parameter.
    fn target_index(code: u16) -> usize {
        // 353 carries a channel visibility symbol before the name
        if code == 353 {
            2
        } else {
            1
        }
    }
}

struct PendingRequest {
    id: RequestId,
    kind: RequestKind,
    target: String,
    lines: Vec<Message>,
    tx: oneshot::Sender<Result<ReplyLines, SessionError>>,
}

impl PendingRequest {
    fn matches_target(&self, msg: &Message, code: u16, casemap: CaseMapping) -> bool {
        if self.target.is_empty() {
            return true;
        }
        msg.param(RequestKind::target_index(code))
            .is_some_and(|t| casemap.eq(t, &self.target))
    }
}

/// The registry of in-flight requests, oldest first.
#[derive(Default)]
pub struct PendingRegistry {
    next_id: RequestId,
    entries: Vec<PendingRequest>,
}

impl PendingRegistry {
    /// Register a request before its provoking command is written.
    ///
    /// `target` is the nickname or channel the replies will name; empty
    /// matches any target of the right numeric family.
    pub fn register(&mut self, kind: RequestKind, target: &str) -> (RequestId, ReplyReceiver) {
        let (tx, rx) = oneshot::channel();
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(PendingRequest {
            id,
            kind,
            target: target.to_string(),
            lines: Vec::new(),
            tx,
        });
        (id, rx)
    }

    /// Number of requests still in flight.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no requests are in flight.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Feed one inbound numeric to the matcher.
    ///
    /// When several pending requests could match, the oldest wins.
    pub fn observe(&mut self, msg: &Message, casemap: CaseMapping) {
        let Some(code) = msg.numeric() else {
            return;
        };

        let position = self.entries.iter().position(|entry| {
            (entry.kind.accumulates(code)
                || entry.kind.terminator() == code
                || entry.kind.errors().contains(&code))
                && entry.matches_target(msg, code, casemap)
        });
        let Some(position) = position else {
            return;
        };

        if self.entries[position].kind.accumulates(code) {
            self.entries[position].lines.push(msg.clone());
            return;
        }

        let mut entry = self.entries.remove(position);
        if entry.kind.terminator() == code {
            entry.lines.push(msg.clone());
            let _ = entry.tx.send(Ok(entry.lines));
        } else {
            debug!(kind = ?entry.kind, numeric = code, "pending request failed");
            let _ = entry.tx.send(Err(SessionError::AsyncRequest {
                numeric: code,
                line: msg.to_string(),
            }));
        }
    }

    /// Remove a request; its waiter resolves with `Cancelled` and any
    /// later matching numerics are ignored.
    pub fn cancel(&mut self, id: RequestId) {
        if let Some(position) = self.entries.iter().position(|e| e.id == id) {
            let entry = self.entries.remove(position);
            let _ = entry.tx.send(Err(SessionError::Cancelled));
        }
    }

    /// Fail every in-flight request with `Disconnected`.
    pub fn fail_all(&mut self) {
        for entry in self.entries.drain(..) {
            let _ = entry.tx.send(Err(SessionError::Disconnected));
        }
    }
}

/// Aggregated WHOIS result.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WhoisInfo {
    /// Nickname the reply describes.
    pub nick: String,
    /// Ident (311).
    pub ident: Option<String>,
    /// Host (311).
    pub host: Option<String>,
    /// Real name (311).
    pub realname: Option<String>,
    /// Server the user is on (312).
    pub server: Option<String>,
    /// Server description (312).
    pub server_info: Option<String>,
    /// IRC operator flag (313).
    pub oper: bool,
    /// Seconds idle (317).
    pub idle_secs: Option<u64>,
    /// Sign-on time (317).
    pub signon_time: Option<i64>,
    /// Channels with status prefixes as sent (319).
    pub channels: Vec<String>,
    /// Services account (330).
    pub account: Option<String>,
    /// TLS connection flag (671).
    pub secure: bool,
    /// Away flag (301).
    pub away: bool,
}

impl WhoisInfo {
    /// Aggregate the reply lines of a completed WHOIS request.
    pub fn from_lines(lines: &[Message]) -> Self {
        let mut info = WhoisInfo::default();
        for msg in lines {
            if let Some(nick) = msg.param(1) {
                if info.nick.is_empty() && msg.numeric() != Some(318) {
                    info.nick = nick.to_string();
                }
            }
            match msg.numeric() {
                Some(301) => info.away = true,
                Some(311) => {
                    info.ident = msg.param(2).map(str::to_string);
                    info.host = msg.param(3).map(str::to_string);
                    info.realname = msg.param(5).map(str::to_string);
                }
                Some(312) => {
                    info.server = msg.param(2).map(str::to_string);
                    info.server_info = msg.param(3).map(str::to_string);
                }
                Some(313) => info.oper = true,
                Some(317) => {
                    info.idle_secs = msg.param(2).and_then(|v| v.parse().ok());
                    info.signon_time = msg.param(3).and_then(|v| v.parse().ok());
                }
                Some(319) => {
                    if let Some(chans) = msg.param(2) {
                        info.channels
                            .extend(chans.split_whitespace().map(str::to_string));
                    }
                }
                Some(330) => info.account = msg.param(2).map(str::to_string),
                Some(671) => info.secure = true,
                _ => {}
            }
        }
        info
    }
}
