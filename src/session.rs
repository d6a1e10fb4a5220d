//! Sans-IO session core.
//!
//! The `Session` consumes parsed messages and produces queued events
//! and outbound lines; it performs no I/O of its own. The tokio
//! [`Client`](crate::client::Client) drives it from the reader task,
//! but it is equally drivable from tests or a custom runtime.
//!
//! For every inbound line the order is fixed: state mutation first,
//! then the request matcher, then event emission, so handlers always
//! observe a consistent world.

use std::collections::{HashSet, VecDeque};

use tracing::{debug, warn};

use crate::ctcp;
use crate::error::{Result, SessionError};
use crate::event::Event;
use crate::flood::FloodControl;
use crate::isupport::Isupport;
use crate::message::Message;
use crate::mode::{self, ModeChange};
use crate::monitor::{self, MonitorList, PresenceProtocol};
use crate::request::{PendingRegistry, ReplyReceiver, RequestId, RequestKind};
use crate::sasl;
use crate::state::{SaslPolicy, SessionConfig, SessionState};
use crate::track::Tracker;

/// One line queued for the writer task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outbound {
    /// The serialized line, without its terminator.
    pub line: String,
    /// Jump the queue (PONG).
    pub urgent: bool,
    /// Subject to the flood bucket (PRIVMSG/NOTICE).
    pub throttled: bool,
}

/// The sans-IO session state machine.
pub struct Session {
    config: SessionConfig,
    state: SessionState,
    isupport: Isupport,
    tracker: Tracker,
    pending: PendingRegistry,
    monitor: MonitorList,
    available_caps: HashSet<String>,
    enabled_caps: HashSet<String>,
    cap_end_sent: bool,
    nick_attempts: u8,
    current_nick: String,
    events: VecDeque<Event>,
    outbound: VecDeque<Outbound>,
}

impl Session {
    /// A new session in the `Disconnected` state.
    pub fn new(config: SessionConfig) -> Self {
        let current_nick = config.nickname.clone();
        Session {
            config,
            state: SessionState::Disconnected,
            isupport: Isupport::default(),
            tracker: Tracker::new(),
            pending: PendingRegistry::default(),
            monitor: MonitorList::new(),
            available_caps: HashSet::new(),
            enabled_caps: HashSet::new(),
            cap_end_sent: false,
            nick_attempts: 0,
            current_nick,
            events: VecDeque::new(),
            outbound: VecDeque::new(),
        }
    }

    /// The current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The nickname currently in use (server-assigned once registered).
    pub fn current_nick(&self) -> &str {
        &self.current_nick
    }

    /// The server-advertised parameter registry.
    pub fn isupport(&self) -> &Isupport {
        &self.isupport
    }

    /// The network state tracker.
    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    /// The presence subscription set.
    pub fn monitor_list(&self) -> &MonitorList {
        &self.monitor
    }

    /// Capabilities the server acknowledged.
    pub fn enabled_caps(&self) -> &HashSet<String> {
        &self.enabled_caps
    }

    /// The configured flood bucket.
    pub fn flood_control(&self) -> FloodControl {
        FloodControl::new(self.config.flood_burst, self.config.flood_rate)
    }

    /// Take every queued event, in emission order.
    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }

    /// Take every queued outbound line, in enqueue order.
    pub fn drain_outbound(&mut self) -> Vec<Outbound> {
        self.outbound.drain(..).collect()
    }

    // === Lifecycle ===

    /// The transport opened: begin registration.
    pub fn start(&mut self) {
        self.transition(SessionState::Connecting);
        self.events.push_back(Event::Connected);
        self.queue(Message::cap("LS", Some("302")));
        if let Some(password) = self.config.password.clone() {
            self.queue(Message::pass(&password));
        }
        let nick = self.current_nick.clone();
        self.queue(Message::nick(&nick));
        let (username, realname) =
            (self.config.username.clone(), self.config.realname.clone());
        self.queue(Message::user(&username, &realname));
    }

    /// The transport closed or a fatal error occurred: run the single
    /// cleanup authority.
    pub fn on_disconnect(&mut self, reason: &str) {
        if self.state == SessionState::Disconnected {
            return;
        }
        self.transition(SessionState::Disconnecting);
        for nick in self.tracker.clear() {
            self.events.push_back(Event::UserVanished { nick });
        }
        self.pending.fail_all();
        self.transition(SessionState::Disconnected);
        self.events.push_back(Event::Disconnected {
            reason: reason.to_string(),
        });
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "session state change");
            self.state = next;
            self.events.push_back(Event::StateChanged(next));
        }
    }

    // === Inbound ===

    /// Feed one raw inbound line.
    pub fn handle_line(&mut self, line: &str) {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        self.events.push_back(Event::RawIn {
            line: trimmed.to_string(),
        });
        match trimmed.parse::<Message>() {
            Ok(msg) => self.handle_message(&msg),
            Err(err) => {
                debug!(error = %err, "discarding unparseable line");
                self.events.push_back(Event::ParseError {
                    line: trimmed.to_string(),
                    error: err.to_string(),
                });
            }
        }
    }

    /// Feed one parsed inbound message.
    pub fn handle_message(&mut self, msg: &Message) {
        if let Some(code) = msg.numeric() {
            self.handle_numeric(code, msg);
            self.pending.observe(msg, self.isupport.casemapping);
            return;
        }

        match msg.command.to_ascii_uppercase().as_str() {
            "PING" => {
                self.queue_urgent(Message::new("PONG", msg.params.clone()));
            }
            "CAP" => self.handle_cap(msg),
            "AUTHENTICATE" => self.handle_authenticate(msg),
            "JOIN" => self.handle_join(msg),
            "PART" => self.handle_part(msg),
            "KICK" => self.handle_kick(msg),
            "QUIT" => self.handle_quit(msg),
            "NICK" => self.handle_nick(msg),
            "MODE" => self.handle_mode(msg),
            "TOPIC" => self.handle_topic(msg),
            "PRIVMSG" => self.handle_privmsg(msg, false),
            "NOTICE" => self.handle_privmsg(msg, true),
            "ACCOUNT" => self.handle_account(msg),
            "AWAY" => self.handle_away(msg),
            "CHGHOST" => self.handle_chghost(msg),
            "ERROR" => {
                warn!(reason = msg.param(0).unwrap_or(""), "server sent ERROR");
                self.transition(SessionState::Disconnecting);
            }
            _ => {}
        }
    }

    // === Registration and capability negotiation ===

    fn handle_cap(&mut self, msg: &Message) {
        let subcmd = msg.param(1).unwrap_or("").to_ascii_uppercase();
        match subcmd.as_str() {
            "LS" => {
                let (more, caps) = if msg.param(2) == Some("*") {
                    (true, msg.param(3).unwrap_or(""))
                } else {
                    (false, msg.param(2).unwrap_or(""))
                };
                for cap in caps.split_whitespace() {
                    let name = cap.split('=').next().unwrap_or(cap);
                    self.available_caps.insert(name.to_string());
                }
                if !more {
                    self.request_caps();
                }
            }
            "ACK" => {
                let caps = msg.param(2).unwrap_or("").to_string();
                for cap in caps.split_whitespace() {
                    match cap.strip_prefix('-') {
                        Some(name) => {
                            self.enabled_caps.remove(name);
                        }
                        None => {
                            self.enabled_caps.insert(cap.to_string());
                        }
                    }
                }
                if self.state == SessionState::Connecting {
                    if self.enabled_caps.contains("sasl") && self.config.sasl.is_some() {
                        self.transition(SessionState::SaslAuthenticating);
                        self.queue(Message::authenticate("PLAIN"));
                    } else {
                        self.finish_cap_negotiation();
                    }
                }
            }
            "NAK" => {
                debug!(caps = msg.param(2).unwrap_or(""), "capability request rejected");
                if self.state == SessionState::Connecting {
                    self.finish_cap_negotiation();
                }
            }
            _ => {}
        }
    }

    fn request_caps(&mut self) {
        let mut wanted: Vec<String> = self
            .config
            .request_caps
            .iter()
            .map(|c| c.as_ref().to_string())
            .filter(|c| self.available_caps.contains(c))
            .collect();
        if self.config.sasl.is_some() && self.available_caps.contains("sasl") {
            wanted.push("sasl".to_string());
        }

        if wanted.is_empty() {
            self.finish_cap_negotiation();
        } else {
            self.queue(Message::cap("REQ", Some(&wanted.join(" "))));
        }
    }

    fn finish_cap_negotiation(&mut self) {
        if !self.cap_end_sent {
            self.cap_end_sent = true;
            self.queue(Message::cap("END", None));
        }
        self.transition(SessionState::Registering);
    }

    fn handle_authenticate(&mut self, msg: &Message) {
        if self.state != SessionState::SaslAuthenticating {
            return;
        }
        // `+` is the empty challenge; PLAIN ignores challenge content
        if msg.param(0).is_some() {
            if let Some(creds) = self.config.sasl.clone() {
                let payload = sasl::encode_plain_with_authzid(
                    &creds.authzid,
                    &creds.account,
                    &creds.password,
                );
                for chunk in sasl::chunk_response(&payload) {
                    self.queue(Message::authenticate(&chunk));
                }
            }
        }
    }

    fn handle_sasl_outcome(&mut self, code: u16, msg: &Message) {
        match code {
            903 => {
                debug!("SASL authentication succeeded");
                self.finish_cap_negotiation();
            }
            902 | 904 | 905 | 906 | 907 => {
                let reason = msg.params.last().cloned().unwrap_or_default();
                warn!(numeric = code, reason = %reason, "SASL authentication failed");
                match self.config.sasl_policy {
                    SaslPolicy::Continue => self.finish_cap_negotiation(),
                    SaslPolicy::Abort => {
                        self.queue(Message::quit(Some("SASL authentication failed")));
                        self.transition(SessionState::Disconnecting);
                    }
                }
            }
            _ => {}
        }
    }

    // === Numerics ===

    fn handle_numeric(&mut self, code: u16, msg: &Message) {
        match code {
            1 => {
                if let Some(nick) = msg.param(0) {
                    self.current_nick = nick.to_string();
                }
                let nick = self.current_nick.clone();
                self.tracker.ensure_user(&nick).is_self = true;
                self.transition(SessionState::ReceivingServerInfo);
            }
            5 => {
                if self.isupport.apply_params(&msg.params) {
                    let mapping = self.isupport.casemapping;
                    self.tracker.set_casemapping(mapping);
                    self.monitor.set_casemapping(mapping);
                }
            }
            376 | 422 => {
                if self.state == SessionState::ReceivingServerInfo {
                    self.transition(SessionState::Online);
                    self.events.push_back(Event::Registered {
                        nick: self.current_nick.clone(),
                    });
                }
            }
            432 | 433 if !self.state.is_registered() => {
                self.nick_attempts += 1;
                if self.nick_attempts <= 3 {
                    self.current_nick.push('_');
                    let nick = self.current_nick.clone();
                    self.queue(Message::nick(&nick));
                } else {
                    warn!("could not find a free nickname");
                    self.queue(Message::quit(Some("nickname exhausted")));
                    self.transition(SessionState::Disconnecting);
                }
            }
            301 => {
                if let Some(nick) = msg.param(1).map(str::to_string) {
                    if let Some(user) = self.tracker.user_mut(&nick) {
                        user.away = true;
                    }
                }
            }
            305 | 306 => {
                let nick = self.current_nick.clone();
                if let Some(user) = self.tracker.user_mut(&nick) {
                    user.away = code == 306;
                }
            }
            324 => {
                // Reply to the post-join MODE query
                if let Some(channel) = msg.param(1).map(str::to_string) {
                    let changes =
                        mode::parse_channel_modes(&msg.params[2..], &self.isupport);
                    self.apply_channel_modes(&channel, &changes);
                }
            }
            329 => {
                if let (Some(channel), Some(ts)) = (msg.param(1), msg.param(2)) {
                    let channel = channel.to_string();
                    let ts = ts.parse().ok();
                    if let Some(chan) = self.tracker.channel_mut(&channel) {
                        chan.created_at = ts;
                    }
                }
            }
            331 => {
                if let Some(channel) = msg.param(1).map(str::to_string) {
                    if let Some(chan) = self.tracker.channel_mut(&channel) {
                        chan.topic = None;
                    }
                }
            }
            332 => self.handle_topic_reply(msg),
            333 => {
                let (Some(channel), Some(set_by)) = (msg.param(1), msg.param(2)) else {
                    return;
                };
                let channel = channel.to_string();
                let set_by = set_by.to_string();
                let set_at = msg.param(3).and_then(|t| t.parse().ok());
                if let Some(topic) = self
                    .tracker
                    .channel_mut(&channel)
                    .and_then(|c| c.topic.as_mut())
                {
                    topic.set_by = Some(set_by);
                    topic.set_at = set_at;
                }
            }
            352 => self.handle_who_reply(msg),
            353 => self.handle_names_reply(msg),
            600 | 604 | 730 => self.handle_presence(msg, code, true),
            601 | 605 | 731 => self.handle_presence(msg, code, false),
            900..=908 => self.handle_sasl_outcome(code, msg),
            _ => {}
        }
    }

    fn handle_topic_reply(&mut self, msg: &Message) {
        let (Some(channel), Some(text)) = (msg.param(1), msg.param(2)) else {
            return;
        };
        let channel = channel.to_string();
        let text = text.to_string();
        if let Some(chan) = self.tracker.channel_mut(&channel) {
            chan.topic = Some(crate::track::Topic {
                text: text.clone(),
                set_by: None,
                set_at: None,
            });
            self.events.push_back(Event::TopicChanged {
                channel,
                topic: text,
                set_by: None,
            });
        }
    }

    fn handle_who_reply(&mut self, msg: &Message) {
        // 352: <client> <channel> <ident> <host> <server> <nick> <flags> :<hops> <realname>
        let (Some(channel), Some(ident), Some(host), Some(nick)) =
            (msg.param(1), msg.param(2), msg.param(3), msg.param(5))
        else {
            return;
        };
        let (channel, ident, host, nick) = (
            channel.to_string(),
            ident.to_string(),
            host.to_string(),
            nick.to_string(),
        );
        let flags = msg.param(6).unwrap_or("").to_string();
        let realname = msg
            .param(7)
            .and_then(|t| t.split_once(' '))
            .map(|(_, name)| name.to_string());

        if self.tracker.channel(&channel).is_some() {
            self.tracker.add_member(&channel, &nick);
        }
        if let Some(user) = self.tracker.user_mut(&nick) {
            user.ident = Some(ident);
            user.host = Some(host);
            if realname.is_some() {
                user.realname = realname;
            }
            user.away = flags.starts_with('G');
            user.oper = flags.contains('*');
        }
    }

    fn handle_names_reply(&mut self, msg: &Message) {
        // 353: <client> <symbol> <channel> :<names>
        let (Some(channel), Some(names)) = (msg.param(2), msg.param(3)) else {
            return;
        };
        let channel = channel.to_string();
        if self.tracker.channel(&channel).is_none() {
            return;
        }
        let names = names.to_string();

        let multi_prefix =
            self.enabled_caps.contains("multi-prefix") || self.isupport.namesx;
        let userhosts =
            self.enabled_caps.contains("userhost-in-names") || self.isupport.uhnames;

        for token in names.split_whitespace() {
            let mut rest = token;
            let mut statuses: Vec<char> = Vec::new();
            while let Some(c) = rest.chars().next() {
                if !is_status_symbol(&self.isupport, c) {
                    break;
                }
                statuses.push(c);
                rest = &rest[c.len_utf8()..];
                if !multi_prefix {
                    break;
                }
            }
            if rest.is_empty() {
                continue;
            }

            let (nick, ident, host) = if userhosts {
                split_userhost(rest)
            } else {
                (rest, None, None)
            };

            self.tracker.add_member(&channel, nick);
            if let Some(user) = self.tracker.user_mut(nick) {
                user.refresh_from_prefix(ident, host);
            }
            let nick_key = self.tracker.fold(nick);
            if let Some(member) = self
                .tracker
                .channel_mut(&channel)
                .and_then(|c| c.members.get_mut(&nick_key))
            {
                for status in statuses {
                    member.add_status(status);
                }
            }
        }
    }

    fn handle_presence(&mut self, msg: &Message, code: u16, online: bool) {
        // 730/731 carry a comma-separated target list; the WATCH
        // numerics carry a single nick parameter.
        let targets: Vec<String> = if code == 730 || code == 731 {
            msg.params
                .last()
                .map(|list| {
                    list.split(',')
                        .filter(|t| !t.is_empty())
                        .map(|t| t.split('!').next().unwrap_or(t).to_string())
                        .collect()
                })
                .unwrap_or_default()
        } else {
            msg.param(1).map(str::to_string).into_iter().collect()
        };

        for nick in targets {
            if self.monitor.contains(&nick) {
                let user = self.tracker.ensure_user(&nick);
                user.monitored = true;
            }
            self.events.push_back(if online {
                Event::UserAppeared { nick }
            } else {
                Event::UserVanished { nick }
            });
        }
    }

    // === Commands from other users ===

    fn refresh_sender(&mut self, msg: &Message) {
        if let Some(crate::prefix::Prefix::User { nick, user, host }) = &msg.prefix {
            let (nick, user, host) = (nick.clone(), user.clone(), host.clone());
            if let Some(tracked) = self.tracker.user_mut(&nick) {
                tracked.refresh_from_prefix(user.as_deref(), host.as_deref());
            }
        }
    }

    fn is_self(&self, nick: &str) -> bool {
        self.isupport.casemapping.eq(nick, &self.current_nick)
    }

    fn handle_join(&mut self, msg: &Message) {
        let Some(nick) = msg.source_nick().map(str::to_string) else {
            return;
        };
        let Some(channel) = msg.param(0).map(str::to_string) else {
            return;
        };

        if self.is_self(&nick) {
            self.tracker.create_channel(&channel);
            let current = self.current_nick.clone();
            self.tracker.ensure_user(&current).is_self = true;
            self.tracker.add_member(&channel, &current);
            self.queue(Message::mode(&channel, &[]));
            self.queue(Message::names(&channel));
        } else {
            self.tracker.add_member(&channel, &nick);
        }

        if self.enabled_caps.contains("extended-join") {
            let account = msg.param(1).filter(|a| *a != "*").map(str::to_string);
            let realname = msg.param(2).map(str::to_string);
            if let Some(user) = self.tracker.user_mut(&nick) {
                user.account = account;
                if realname.is_some() {
                    user.realname = realname;
                }
            }
        }
        self.refresh_sender(msg);

        self.events.push_back(Event::Joined { channel, nick });
    }

    fn handle_part(&mut self, msg: &Message) {
        let Some(nick) = msg.source_nick().map(str::to_string) else {
            return;
        };
        let Some(channel) = msg.param(0).map(str::to_string) else {
            return;
        };
        let reason = msg.param(1).map(str::to_string);

        let mut vanished = Vec::new();
        if self.is_self(&nick) {
            vanished = self.tracker.remove_channel(&channel);
        } else if let Some(gone) = self.tracker.remove_member(&channel, &nick) {
            vanished.push(gone);
        }

        self.events.push_back(Event::Parted {
            channel,
            nick,
            reason,
        });
        for nick in vanished {
            self.events.push_back(Event::UserVanished { nick });
        }
    }

    fn handle_kick(&mut self, msg: &Message) {
        let Some(by) = msg.source_nick().map(str::to_string) else {
            return;
        };
        let (Some(channel), Some(nick)) = (msg.param(0), msg.param(1)) else {
            return;
        };
        let (channel, nick) = (channel.to_string(), nick.to_string());
        let reason = msg.param(2).map(str::to_string);

        let mut vanished = Vec::new();
        if self.is_self(&nick) {
            vanished = self.tracker.remove_channel(&channel);
        } else if let Some(gone) = self.tracker.remove_member(&channel, &nick) {
            vanished.push(gone);
        }

        self.events.push_back(Event::Kicked {
            channel,
            nick,
            by,
            reason,
        });
        for nick in vanished {
            self.events.push_back(Event::UserVanished { nick });
        }
    }

    fn handle_quit(&mut self, msg: &Message) {
        let Some(nick) = msg.source_nick().map(str::to_string) else {
            return;
        };
        let reason = msg.param(0).map(str::to_string);

        let vanished = self.tracker.remove_user_everywhere(&nick);
        self.events.push_back(Event::Quit { nick, reason });
        if let Some(nick) = vanished {
            self.events.push_back(Event::UserVanished { nick });
        }
    }

    fn handle_nick(&mut self, msg: &Message) {
        let Some(old) = msg.source_nick().map(str::to_string) else {
            return;
        };
        let Some(new) = msg.param(0).map(str::to_string) else {
            return;
        };

        self.tracker.rename_user(&old, &new);
        if self.is_self(&old) {
            self.current_nick = new.clone();
        }
        self.events.push_back(Event::NickChanged { old, new });
    }

    fn handle_mode(&mut self, msg: &Message) {
        let by = match &msg.prefix {
            Some(crate::prefix::Prefix::User { nick, .. }) => nick.clone(),
            Some(crate::prefix::Prefix::Server(name)) => name.clone(),
            None => String::new(),
        };
        let Some(target) = msg.param(0).map(str::to_string) else {
            return;
        };

        let changes = if self.isupport.is_channel_name(&target) {
            let changes = mode::parse_channel_modes(&msg.params[1..], &self.isupport);
            self.apply_channel_modes(&target, &changes);
            changes
        } else {
            let changes = parse_user_modes(&msg.params[1..]);
            if self.is_self(&target) {
                let nick = self.current_nick.clone();
                if let Some(user) = self.tracker.user_mut(&nick) {
                    for change in &changes {
                        if let ModeChange::Flag { mode: 'o', set } = change {
                            user.oper = *set;
                        }
                    }
                }
            }
            changes
        };

        self.events.push_back(Event::ModeChanged {
            target,
            by,
            changes,
        });
    }

    fn apply_channel_modes(&mut self, channel: &str, changes: &[ModeChange]) {
        for change in changes {
            match change {
                ModeChange::Status { mode, nick, set } => {
                    let Some(symbol) = self.isupport.prefix.symbol_for_mode(*mode) else {
                        continue;
                    };
                    let nick_key = self.tracker.fold(nick);
                    if let Some(member) = self
                        .tracker
                        .channel_mut(channel)
                        .and_then(|c| c.members.get_mut(&nick_key))
                    {
                        if *set {
                            member.add_status(symbol);
                        } else {
                            member.remove_status(symbol);
                        }
                    }
                }
                ModeChange::List { mode, mask, set } => {
                    if let Some(chan) = self.tracker.channel_mut(channel) {
                        let masks = chan.lists.entry(*mode).or_default();
                        if *set {
                            masks.insert(mask.clone());
                        } else {
                            masks.remove(mask);
                        }
                    }
                }
                ModeChange::Param { mode, arg, set } => {
                    if let Some(chan) = self.tracker.channel_mut(channel) {
                        match (set, arg) {
                            (true, Some(arg)) => {
                                chan.mode_params.insert(*mode, arg.clone());
                            }
                            _ => {
                                chan.mode_params.remove(mode);
                            }
                        }
                    }
                }
                ModeChange::Flag { mode, set } => {
                    if let Some(chan) = self.tracker.channel_mut(channel) {
                        if *set {
                            chan.flags.insert(*mode);
                        } else {
                            chan.flags.remove(mode);
                        }
                    }
                }
            }
        }
    }

    fn handle_topic(&mut self, msg: &Message) {
        let by = msg.source_nick().map(str::to_string);
        let (Some(channel), Some(text)) = (msg.param(0), msg.param(1)) else {
            return;
        };
        let (channel, text) = (channel.to_string(), text.to_string());

        if let Some(chan) = self.tracker.channel_mut(&channel) {
            if text.is_empty() {
                chan.topic = None;
            } else {
                chan.topic = Some(crate::track::Topic {
                    text: text.clone(),
                    set_by: by.clone(),
                    set_at: None,
                });
            }
        }
        self.events.push_back(Event::TopicChanged {
            channel,
            topic: text,
            set_by: by,
        });
    }

    fn handle_privmsg(&mut self, msg: &Message, is_notice: bool) {
        let from = msg
            .source_nick()
            .map(str::to_string)
            .or_else(|| match &msg.prefix {
                Some(crate::prefix::Prefix::Server(name)) => Some(name.clone()),
                _ => None,
            })
            .unwrap_or_default();
        let (Some(target), Some(text)) = (msg.param(0), msg.param(1)) else {
            return;
        };
        let (target, text) = (target.to_string(), text.to_string());

        // Known senders get ident/host refreshed; unknown ones are not
        // allocated, the disappearance policy would reclaim them at once
        self.refresh_sender(msg);

        if let Some(ctcp) = ctcp::parse(&text) {
            let (verb, args) = (ctcp.verb.to_string(), ctcp.args.map(str::to_string));
            self.events.push_back(if is_notice {
                Event::CtcpReply {
                    from,
                    target,
                    verb,
                    args,
                }
            } else {
                Event::Ctcp {
                    from,
                    target,
                    verb,
                    args,
                }
            });
        } else if is_notice {
            self.events.push_back(Event::Notice { from, target, text });
        } else {
            self.events.push_back(Event::Privmsg { from, target, text });
        }
    }

    fn handle_account(&mut self, msg: &Message) {
        let Some(nick) = msg.source_nick().map(str::to_string) else {
            return;
        };
        let account = msg
            .param(0)
            .filter(|a| !a.is_empty() && *a != "*")
            .map(str::to_string);
        if let Some(user) = self.tracker.user_mut(&nick) {
            user.account = account;
        }
    }

    fn handle_away(&mut self, msg: &Message) {
        let Some(nick) = msg.source_nick().map(str::to_string) else {
            return;
        };
        let away = msg.param(0).is_some_and(|m| !m.is_empty());
        if let Some(user) = self.tracker.user_mut(&nick) {
            user.away = away;
        }
    }

    fn handle_chghost(&mut self, msg: &Message) {
        let Some(nick) = msg.source_nick().map(str::to_string) else {
            return;
        };
        let (ident, host) = (msg.param(0), msg.param(1));
        let (ident, host) = (
            ident.map(str::to_string),
            host.map(str::to_string),
        );
        if let Some(user) = self.tracker.user_mut(&nick) {
            user.refresh_from_prefix(ident.as_deref(), host.as_deref());
        }
    }

    // === Outbound ===

    fn queue(&mut self, msg: Message) {
        let throttled = FloodControl::is_throttled_command(&msg.command);
        let line = msg.to_string();
        self.events.push_back(Event::RawOut { line: line.clone() });
        self.outbound.push_back(Outbound {
            line,
            urgent: false,
            throttled,
        });
    }

    fn queue_urgent(&mut self, msg: Message) {
        let line = msg.to_string();
        self.events.push_back(Event::RawOut { line: line.clone() });
        self.outbound.push_back(Outbound {
            line,
            urgent: true,
            throttled: false,
        });
    }

    fn ensure_registered(&self) -> Result<()> {
        if self.state.is_registered() {
            Ok(())
        } else {
            Err(SessionError::NotRegistered)
        }
    }

    /// Queue a raw line, bypassing the typed helpers. The line is still
    /// classified for flood control by its leading command word.
    pub fn send_raw(&mut self, line: &str) -> Result<()> {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            return Err(SessionError::InvalidArgument("empty line".to_string()));
        }
        let command = trimmed.split(' ').next().unwrap_or("");
        let throttled = FloodControl::is_throttled_command(command);
        self.events.push_back(Event::RawOut {
            line: trimmed.to_string(),
        });
        self.outbound.push_back(Outbound {
            line: trimmed.to_string(),
            urgent: false,
            throttled,
        });
        Ok(())
    }

    /// Queue a typed message with registration gating.
    pub fn send(&mut self, msg: Message) -> Result<()> {
        self.ensure_registered()?;
        self.queue(msg);
        Ok(())
    }

    /// Queue a QUIT and begin teardown. Allowed in every state.
    pub fn quit(&mut self, reason: Option<&str>) {
        self.queue(Message::quit(reason));
        self.transition(SessionState::Disconnecting);
    }

    // === Async requests ===

    /// Register a pending request; the caller writes the provoking
    /// command afterwards (the registry is consulted first, so the
    /// server's reply cannot race the registration).
    pub fn register_request(
        &mut self,
        kind: RequestKind,
        target: &str,
        command: Message,
    ) -> Result<(RequestId, ReplyReceiver)> {
        self.ensure_registered()?;
        let (id, rx) = self.pending.register(kind, target);
        self.queue(command);
        Ok((id, rx))
    }

    /// Cancel a pending request registered earlier.
    pub fn cancel_request(&mut self, id: RequestId) {
        self.pending.cancel(id);
    }

    // === Presence subscriptions ===

    fn presence_protocol(&self) -> Result<(PresenceProtocol, Option<u32>)> {
        if !self.state.is_registered() {
            return Err(SessionError::NotSupported(
                "presence subscriptions require a registered session",
            ));
        }
        if let Some(cap) = self.isupport.monitor {
            Ok((PresenceProtocol::Monitor, cap))
        } else if let Some(cap) = self.isupport.watch {
            Ok((PresenceProtocol::Watch, cap))
        } else {
            Err(SessionError::NotSupported(
                "network advertises neither MONITOR nor WATCH",
            ))
        }
    }

    /// Subscribe to the online presence of the given nicknames.
    pub fn monitor_add(&mut self, nicks: &[&str]) -> Result<()> {
        let (protocol, cap) = self.presence_protocol()?;
        for nick in nicks {
            monitor::validate_nick(nick)?;
        }
        let mut fresh: Vec<String> = Vec::new();
        for nick in nicks {
            if self.monitor.insert(nick) {
                fresh.push(nick.to_string());
            }
            let user = self.tracker.ensure_user(nick);
            user.monitored = true;
        }
        for line in monitor::batch_commands(protocol, &fresh, cap, true) {
            self.send_raw(&line)?;
        }
        Ok(())
    }

    /// Drop presence subscriptions for the given nicknames.
    pub fn monitor_remove(&mut self, nicks: &[&str]) -> Result<()> {
        let (protocol, cap) = self.presence_protocol()?;
        for nick in nicks {
            monitor::validate_nick(nick)?;
        }
        let mut removed: Vec<String> = Vec::new();
        for nick in nicks {
            if self.monitor.remove(nick) {
                removed.push(nick.to_string());
            }
            let nick_key = self.tracker.fold(nick);
            if let Some(user) = self.tracker.user_mut(nick) {
                user.monitored = false;
            }
            if let Some(nick) = self.tracker.purge_if_orphan(&nick_key) {
                self.events.push_back(Event::UserVanished { nick });
            }
        }
        for line in monitor::batch_commands(protocol, &removed, cap, false) {
            self.send_raw(&line)?;
        }
        Ok(())
    }

    /// Drop every presence subscription.
    pub fn monitor_clear(&mut self) -> Result<()> {
        let (protocol, _) = self.presence_protocol()?;
        let nicks: Vec<String> = self.monitor.iter().map(str::to_string).collect();
        self.monitor.clear();
        for nick in &nicks {
            let nick_key = self.tracker.fold(nick);
            if let Some(user) = self.tracker.user_mut(nick) {
                user.monitored = false;
            }
            if let Some(nick) = self.tracker.purge_if_orphan(&nick_key) {
                self.events.push_back(Event::UserVanished { nick });
            }
        }
        let line = match protocol {
            PresenceProtocol::Monitor => "MONITOR C",
            PresenceProtocol::Watch => "WATCH C",
        };
        self.send_raw(line)
    }
}

/// Parse user-mode parameters (sign cursor over flag characters).
fn parse_user_modes(params: &[String]) -> Vec<ModeChange> {
    let mut changes = Vec::new();
    let Some(modes) = params.first() else {
        return changes;
    };
    let mut set = true;
    for c in modes.chars() {
        match c {
            '+' => set = true,
            '-' => set = false,
            _ => changes.push(ModeChange::Flag { mode: c, set }),
        }
    }
    changes
}

/// Status symbols tolerated in NAMES tokens: the advertised PREFIX set
/// plus the conventional five, so unknown ranks degrade gracefully.
fn is_status_symbol(isupport: &Isupport, c: char) -> bool {
    isupport.prefix.is_symbol(c) || matches!(c, '~' | '&' | '@' | '%' | '+')
}

/// Split a `nick!user@host` NAMES token (userhost-in-names).
fn split_userhost(token: &str) -> (&str, Option<&str>, Option<&str>) {
    match token.split_once('!') {
        Some((nick, rest)) => match rest.split_once('@') {
            Some((user, host)) => (nick, Some(user), Some(host)),
            None => (nick, Some(rest), None),
        },
        None => (token, None, None),
    }
}
