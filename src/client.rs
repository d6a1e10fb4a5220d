//! The tokio-driven client.
//!
//! Two tasks touch the session: the reader (inbound parse, state
//! mutation, event emission) and the writer (outbound serialization,
//! flood pacing). Application calls enqueue onto the writer lanes from
//! any task; shared state is guarded by a single session lock held only
//! for short, await-free critical sections.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{Result, SessionError};
use crate::event::Event;
use crate::flood::FloodControl;
use crate::message::Message;
use crate::request::{ReplyLines, ReplyReceiver, RequestId, RequestKind, WhoisInfo};
use crate::session::{Outbound, Session};
use crate::state::{SessionConfig, SessionState};
use crate::track::{Channel, User};
use crate::transport::{Transport, TransportSink, TransportStream};

/// The stream of session events handed to the host on connect.
pub type EventReceiver = mpsc::UnboundedReceiver<Event>;

enum WriterCommand {
    Line(Outbound),
    Shutdown,
}

fn lock(session: &Arc<Mutex<Session>>) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle to a live IRC session.
///
/// Cheap to clone; every clone drives the same session.
#[derive(Clone)]
pub struct Client {
    session: Arc<Mutex<Session>>,
    events_tx: mpsc::UnboundedSender<Event>,
    normal_tx: mpsc::UnboundedSender<WriterCommand>,
    urgent_tx: mpsc::UnboundedSender<WriterCommand>,
}

impl Client {
    /// Connect to `host:port` (TLS per the configuration), start the
    /// reader and writer tasks, and begin registration.
    ///
    /// Returns the client handle and the event stream. Events arrive in
    /// wire order; the state visible through the snapshot accessors is
    /// always at least as new as the last delivered event.
    pub async fn connect(
        config: SessionConfig,
        host: &str,
        port: u16,
    ) -> Result<(Client, EventReceiver)> {
        let transport = Transport::connect(host, port, config.tls).await?;
        let (sink, stream) = transport.split();

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (normal_tx, normal_rx) = mpsc::unbounded_channel();
        let (urgent_tx, urgent_rx) = mpsc::unbounded_channel();

        let session = Arc::new(Mutex::new(Session::new(config)));
        let flood = lock(&session).flood_control();

        let client = Client {
            session: Arc::clone(&session),
            events_tx: events_tx.clone(),
            normal_tx: normal_tx.clone(),
            urgent_tx: urgent_tx.clone(),
        };

        // Queue the registration burst before the tasks spin up
        client.with_session(|s| s.start());

        tokio::spawn(writer_task(sink, normal_rx, urgent_rx, flood));
        tokio::spawn(reader_task(stream, session, events_tx, normal_tx, urgent_tx));

        Ok((client, events_rx))
    }

    fn with_session<T>(&self, f: impl FnOnce(&mut Session) -> T) -> T {
        let (result, events, outbound) = {
            let mut session = lock(&self.session);
            let result = f(&mut session);
            (result, session.drain_events(), session.drain_outbound())
        };
        for item in outbound {
            self.route(item);
        }
        for event in events {
            let _ = self.events_tx.send(event);
        }
        result
    }

    fn route(&self, item: Outbound) {
        let tx = if item.urgent {
            &self.urgent_tx
        } else {
            &self.normal_tx
        };
        let _ = tx.send(WriterCommand::Line(item));
    }

    // === Snapshots ===

    /// The current lifecycle state.
    pub fn state(&self) -> SessionState {
        lock(&self.session).state()
    }

    /// The nickname currently in use.
    pub fn current_nick(&self) -> String {
        lock(&self.session).current_nick().to_string()
    }

    /// The network display name, once 005 advertised it.
    pub fn network(&self) -> Option<String> {
        lock(&self.session).isupport().network.clone()
    }

    /// Snapshot of one joined channel.
    pub fn channel(&self, name: &str) -> Option<Channel> {
        lock(&self.session).tracker().channel(name).cloned()
    }

    /// Snapshot of every joined channel.
    pub fn channels(&self) -> Vec<Channel> {
        lock(&self.session).tracker().channels().cloned().collect()
    }

    /// Snapshot of one known user.
    pub fn user(&self, nick: &str) -> Option<User> {
        lock(&self.session).tracker().user(nick).cloned()
    }

    /// The nicknames currently on the presence list.
    pub fn monitored(&self) -> Vec<String> {
        lock(&self.session)
            .monitor_list()
            .iter()
            .map(str::to_string)
            .collect()
    }

    // === Commands ===

    /// Send a raw line, bypassing the typed helpers.
    pub fn send_raw(&self, line: &str) -> Result<()> {
        self.with_session(|s| s.send_raw(line))
    }

    /// Join a channel.
    pub fn join(&self, channel: &str, key: Option<&str>) -> Result<()> {
        self.with_session(|s| s.send(Message::join(channel, key)))
    }

    /// Leave a channel.
    pub fn part(&self, channel: &str, reason: Option<&str>) -> Result<()> {
        self.with_session(|s| s.send(Message::part(channel, reason)))
    }

    /// Send a PRIVMSG.
    pub fn message(&self, target: &str, text: &str) -> Result<()> {
        self.with_session(|s| s.send(Message::privmsg(target, text)))
    }

    /// Send a NOTICE.
    pub fn notice(&self, target: &str, text: &str) -> Result<()> {
        self.with_session(|s| s.send(Message::notice(target, text)))
    }

    /// Change modes on a channel or ourselves.
    pub fn mode(&self, target: &str, modes: &[&str]) -> Result<()> {
        self.with_session(|s| s.send(Message::mode(target, modes)))
    }

    /// Kick a user from a channel.
    pub fn kick(&self, channel: &str, nick: &str, reason: Option<&str>) -> Result<()> {
        self.with_session(|s| s.send(Message::kick(channel, nick, reason)))
    }

    /// Set a ban mask on a channel.
    pub fn ban(&self, channel: &str, mask: &str) -> Result<()> {
        self.with_session(|s| s.send(Message::mode(channel, &["+b", mask])))
    }

    /// Set or clear the channel topic.
    pub fn topic(&self, channel: &str, text: Option<&str>) -> Result<()> {
        self.with_session(|s| s.send(Message::topic(channel, text)))
    }

    /// Change nickname.
    pub fn nick(&self, nickname: &str) -> Result<()> {
        self.with_session(|s| s.send(Message::nick(nickname)))
    }

    /// Set or clear away status.
    pub fn away(&self, message: Option<&str>) -> Result<()> {
        self.with_session(|s| s.send(Message::away(message)))
    }

    /// Send QUIT and tear the connection down once the writer drains.
    pub fn disconnect(&self, reason: Option<&str>) {
        self.with_session(|s| s.quit(reason));
        let _ = self.normal_tx.send(WriterCommand::Shutdown);
    }

    // === Async requests ===

    fn request(
        &self,
        kind: RequestKind,
        target: &str,
        command: Message,
    ) -> Result<PendingReply> {
        let (id, rx) =
            self.with_session(|s| s.register_request(kind, target, command))?;
        Ok(PendingReply {
            session: Arc::clone(&self.session),
            id,
            rx,
        })
    }

    /// Start a WHOIS; await the returned reply for the raw lines.
    pub fn whois_request(&self, nick: &str) -> Result<PendingReply> {
        self.request(RequestKind::Whois, nick, Message::whois(nick))
    }

    /// WHOIS a nickname and aggregate the replies.
    pub async fn whois(&self, nick: &str) -> Result<WhoisInfo> {
        let lines = self.whois_request(nick)?.await?;
        Ok(WhoisInfo::from_lines(&lines))
    }

    /// Start a WHO query for a channel or mask.
    pub fn who_request(&self, target: &str) -> Result<PendingReply> {
        self.request(RequestKind::Who, target, Message::who(target))
    }

    /// WHO a target and collect the reply lines.
    pub async fn who(&self, target: &str) -> Result<ReplyLines> {
        self.who_request(target)?.await
    }

    /// Start a NAMES query.
    pub fn names_request(&self, channel: &str) -> Result<PendingReply> {
        self.request(RequestKind::Names, channel, Message::names(channel))
    }

    /// Start a LIST query, optionally filtered.
    pub fn list_request(&self, filter: Option<&str>) -> Result<PendingReply> {
        self.request(RequestKind::List, "", Message::list(filter))
    }

    /// LIST channels and collect the reply lines.
    pub async fn list(&self, filter: Option<&str>) -> Result<ReplyLines> {
        self.list_request(filter)?.await
    }

    /// Start a ban-list query for a channel.
    pub fn ban_list_request(&self, channel: &str) -> Result<PendingReply> {
        self.request(
            RequestKind::BanList,
            channel,
            Message::mode(channel, &["+b"]),
        )
    }

    // === Presence subscriptions ===

    /// Subscribe to the online presence of the given nicknames.
    pub fn monitor_add(&self, nicks: &[&str]) -> Result<()> {
        self.with_session(|s| s.monitor_add(nicks))
    }

    /// Drop presence subscriptions for the given nicknames.
    pub fn monitor_remove(&self, nicks: &[&str]) -> Result<()> {
        self.with_session(|s| s.monitor_remove(nicks))
    }

    /// Drop every presence subscription.
    pub fn monitor_clear(&self) -> Result<()> {
        self.with_session(|s| s.monitor_clear())
    }
}

/// An in-flight aggregating request.
///
/// Awaiting it yields the accumulated reply lines (terminator
/// included) or the error that completed the request. Dropping it
/// without awaiting leaves the request registered until it resolves,
/// at which point the result is discarded.
pub struct PendingReply {
    session: Arc<Mutex<Session>>,
    id: RequestId,
    rx: ReplyReceiver,
}

impl PendingReply {
    /// A handle that can cancel this request from elsewhere (e.g. a
    /// timeout task). Cancellation resolves the awaiter with
    /// [`SessionError::Cancelled`].
    pub fn canceller(&self) -> RequestCanceller {
        RequestCanceller {
            session: Arc::clone(&self.session),
            id: self.id,
        }
    }

    /// Abort the request; later matching numerics are ignored.
    pub fn cancel(self) {
        lock(&self.session).cancel_request(self.id);
    }
}

impl Future for PendingReply {
    type Output = Result<ReplyLines>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        Pin::new(&mut this.rx).poll(cx).map(|res| match res {
            Ok(outcome) => outcome,
            // The registry dropped the slot without resolving it, which
            // only happens when the session itself is gone
            Err(_) => Err(SessionError::Disconnected),
        })
    }
}

/// Cancels a [`PendingReply`] from outside the awaiting task.
pub struct RequestCanceller {
    session: Arc<Mutex<Session>>,
    id: RequestId,
}

impl RequestCanceller {
    /// Abort the request; the awaiter resolves with `Cancelled`.
    pub fn cancel(self) {
        lock(&self.session).cancel_request(self.id);
    }
}

async fn writer_task(
    mut sink: TransportSink,
    mut normal_rx: mpsc::UnboundedReceiver<WriterCommand>,
    mut urgent_rx: mpsc::UnboundedReceiver<WriterCommand>,
    flood: FloodControl,
) {
    loop {
        let command = tokio::select! {
            biased;
            Some(cmd) = urgent_rx.recv() => Some(cmd),
            Some(cmd) = normal_rx.recv() => Some(cmd),
            else => None,
        };
        let Some(command) = command else { break };
        match command {
            WriterCommand::Shutdown => break,
            WriterCommand::Line(item) => {
                if item.throttled {
                    flood.acquire().await;
                }
                debug!(line = %item.line, "--> ");
                if let Err(e) = sink.send_line(item.line).await {
                    warn!(error = %e, "transport write failed");
                    break;
                }
            }
        }
    }
    let _ = sink.close().await;
}

async fn reader_task(
    mut stream: TransportStream,
    session: Arc<Mutex<Session>>,
    events_tx: mpsc::UnboundedSender<Event>,
    normal_tx: mpsc::UnboundedSender<WriterCommand>,
    urgent_tx: mpsc::UnboundedSender<WriterCommand>,
) {
    let reason = loop {
        match stream.next_line().await {
            Some(Ok(line)) => {
                debug!(line = %line, "<-- ");
                let (events, outbound) = {
                    let mut s = lock(&session);
                    s.handle_line(&line);
                    (s.drain_events(), s.drain_outbound())
                };
                for item in outbound {
                    let tx = if item.urgent { &urgent_tx } else { &normal_tx };
                    let _ = tx.send(WriterCommand::Line(item));
                }
                for event in events {
                    let _ = events_tx.send(event);
                }
            }
            Some(Err(e)) => break e.to_string(),
            None => break "connection closed".to_string(),
        }
    };

    let events = {
        let mut s = lock(&session);
        s.on_disconnect(&reason);
        s.drain_events()
    };
    for event in events {
        let _ = events_tx.send(event);
    }
    let _ = urgent_tx.send(WriterCommand::Shutdown);
}
