//! End-to-end session scenarios driven through the sans-IO core.
//!
//! Each test feeds literal server lines into a `Session` and asserts
//! on the resulting state, events, and outbound queue — no sockets
//! involved.

use slirc_session::request::RequestKind;
use slirc_session::{
    CaseMapping, Event, Message, SaslCredentials, SaslPolicy, Session, SessionConfig,
    SessionState, WhoisInfo,
};

fn new_session() -> Session {
    let mut session = Session::new(SessionConfig::new("Nick", "ident", "Real Name"));
    session.start();
    session.drain_outbound();
    session.drain_events();
    session
}

fn feed(session: &mut Session, lines: &[&str]) {
    for line in lines {
        session.handle_line(line);
    }
}

/// Scenario 1: welcome burst brings the session online and installs the
/// advertised case mapping.
#[test]
fn test_welcome_and_rename() {
    let mut session = new_session();
    feed(
        &mut session,
        &[
            ":server 001 Nick :Welcome",
            ":server 005 Nick PREFIX=(ov)@+ CHANMODES=b,k,l,imnpst CASEMAPPING=rfc1459 :are supported",
            ":server 376 Nick :End of MOTD",
        ],
    );

    assert_eq!(session.state(), SessionState::Online);
    assert_eq!(session.current_nick(), "Nick");
    assert_eq!(session.isupport().casemapping, CaseMapping::Rfc1459);
    // Uppercase of { is [ under rfc1459: the two fold together
    assert!(session.isupport().casemapping.eq("{", "["));
}

/// Scenario 2: join and NAMES populate the membership map with statuses.
#[test]
fn test_join_and_names() {
    let mut session = new_session();
    feed(
        &mut session,
        &[
            ":server 001 Nick :Welcome",
            ":server 005 Nick PREFIX=(ov)@+ CHANMODES=b,k,l,imnpst CASEMAPPING=rfc1459 :are supported",
            ":server 376 Nick :End of MOTD",
            ":Nick!u@h JOIN #Chan",
            ":server 353 Nick = #Chan :@Nick +Bob Carol",
            ":server 366 Nick #Chan :End of /NAMES",
        ],
    );

    let chan = session.tracker().channel("#Chan").expect("channel exists");
    assert_eq!(chan.members.len(), 3);
    assert!(chan.members["nick"].has_status('@'));
    assert!(chan.members["bob"].has_status('+'));
    assert!(!chan.members["bob"].has_status('@'));
    assert_eq!(chan.members["carol"].statuses().count(), 0);
}

/// Scenario 3: multi-prefix NAMES tokens yield every status and the
/// highest-status ordinal.
#[test]
fn test_multi_prefix_names() {
    let mut session = new_session();
    feed(
        &mut session,
        &[
            ":server CAP * LS :multi-prefix",
            ":server CAP Nick ACK :multi-prefix",
            ":server 001 Nick :Welcome",
            ":server 005 Nick PREFIX=(ov)@+ :are supported",
            ":server 376 Nick :End of MOTD",
            ":Nick!u@h JOIN #Chan",
            ":server 353 Nick = #Chan :@+Dave",
        ],
    );

    let chan = session.tracker().channel("#chan").expect("channel exists");
    let dave = &chan.members["dave"];
    let prefix = &session.isupport().prefix;
    assert_eq!(dave.statuses_ranked(prefix), vec!['@', '+']);
    assert_eq!(dave.highest_status_rank(prefix), Some(0));
    assert_eq!(dave.highest_status(prefix), Some('@'));
}

/// Scenario 4: WHOIS resolves with aggregated fields, or with the
/// matched error numeric.
#[test]
fn test_whois_matching() {
    let mut session = new_session();
    feed(
        &mut session,
        &[
            ":server 001 Nick :Welcome",
            ":server 376 Nick :End of MOTD",
        ],
    );

    let (_, mut rx) = session
        .register_request(RequestKind::Whois, "Bob", Message::whois("Bob"))
        .unwrap();
    feed(
        &mut session,
        &[
            ":server 311 Nick Bob rob bobs.host * :Robert",
            ":server 312 Nick Bob irc.example.com :A server",
            ":server 317 Nick Bob 42 1600000000 :seconds idle, signon time",
            ":server 318 Nick Bob :End of /WHOIS list",
        ],
    );

    let lines = rx.try_recv().expect("resolved").expect("no error");
    let info = WhoisInfo::from_lines(&lines);
    assert_eq!(info.nick, "Bob");
    assert_eq!(info.ident.as_deref(), Some("rob"));
    assert_eq!(info.host.as_deref(), Some("bobs.host"));
    assert_eq!(info.server.as_deref(), Some("irc.example.com"));
    assert_eq!(info.idle_secs, Some(42));
    assert_eq!(info.signon_time, Some(1600000000));

    // The error path resolves with the offending numeric
    let (_, mut rx) = session
        .register_request(RequestKind::Whois, "Bob", Message::whois("Bob"))
        .unwrap();
    session.handle_line(":server 401 Nick Bob :No such nick/channel");
    match rx.try_recv().expect("resolved") {
        Err(slirc_session::SessionError::AsyncRequest { numeric, .. }) => {
            assert_eq!(numeric, 401);
        }
        other => panic!("expected AsyncRequest error, got {:?}", other),
    }
}

/// Scenario 5: MONITOR batching splits on the advertised target cap.
#[test]
fn test_monitor_batching() {
    let mut session = new_session();
    feed(
        &mut session,
        &[
            ":server 001 Nick :Welcome",
            ":server 005 Nick MONITOR=3 :are supported",
            ":server 376 Nick :End of MOTD",
        ],
    );
    session.drain_outbound();

    session.monitor_add(&["a", "b", "c", "d"]).unwrap();
    let lines: Vec<String> = session
        .drain_outbound()
        .into_iter()
        .map(|o| o.line)
        .collect();
    assert_eq!(lines, vec!["MONITOR + a,b,c", "MONITOR + d"]);
}

/// Scenario 6: a CASEMAPPING change re-keys existing entries.
#[test]
fn test_casemapping_change() {
    let mut session = new_session();
    feed(
        &mut session,
        &[
            ":server 001 Nick :Welcome",
            ":server 005 Nick CASEMAPPING=ascii :are supported",
            ":server 376 Nick :End of MOTD",
            ":Nick!u@h JOIN #c",
            ":foo[!u@h JOIN #c",
        ],
    );
    assert!(session.tracker().user("foo[").is_some());
    assert!(session.tracker().user("FOO{").is_none());

    session.handle_line(":server 005 Nick CASEMAPPING=rfc1459 :are supported");
    assert!(session.tracker().user("FOO{").is_some());
}

/// SASL PLAIN happy path: CAP REQ, AUTHENTICATE exchange, 903, CAP END.
#[test]
fn test_sasl_plain_registration() {
    let mut session = Session::new(
        SessionConfig::new("Nick", "ident", "Real Name")
            .with_sasl(SaslCredentials::new("acct", "hunter2"), SaslPolicy::Abort),
    );
    session.start();
    session.drain_outbound();

    session.handle_line(":server CAP * LS :sasl multi-prefix");
    let lines: Vec<String> = session
        .drain_outbound()
        .into_iter()
        .map(|o| o.line)
        .collect();
    assert_eq!(lines, vec!["CAP REQ :multi-prefix sasl"]);

    session.handle_line(":server CAP Nick ACK :multi-prefix sasl");
    assert_eq!(session.state(), SessionState::SaslAuthenticating);

    session.handle_line("AUTHENTICATE +");
    let lines: Vec<String> = session
        .drain_outbound()
        .into_iter()
        .map(|o| o.line)
        .collect();
    // AUTHENTICATE PLAIN followed by the base64 payload
    assert_eq!(lines[0], "AUTHENTICATE PLAIN");
    let payload = lines[1].strip_prefix("AUTHENTICATE ").unwrap();
    assert_eq!(
        slirc_session::sasl::decode_challenge(payload).unwrap(),
        b"\0acct\0hunter2"
    );

    feed(
        &mut session,
        &[
            ":server 903 Nick :SASL authentication successful",
            ":server 001 Nick :Welcome",
            ":server 376 Nick :End of MOTD",
        ],
    );
    assert_eq!(session.state(), SessionState::Online);
}

/// Events for one line are emitted only after its state mutations.
#[test]
fn test_state_precedes_events() {
    let mut session = new_session();
    feed(
        &mut session,
        &[
            ":server 001 Nick :Welcome",
            ":server 376 Nick :End of MOTD",
        ],
    );
    session.drain_events();

    session.handle_line(":Nick!u@h JOIN #Chan");
    // The membership is visible by the time the event can be observed
    assert!(session.tracker().channel("#Chan").is_some());
    let events = session.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::Joined { channel, .. } if channel == "#Chan")));
}

/// The disappearance invariant holds after every processed line.
#[test]
fn test_disappearance_invariant() {
    let mut session = new_session();
    feed(
        &mut session,
        &[
            ":server 001 Nick :Welcome",
            ":server 376 Nick :End of MOTD",
            ":Nick!u@h JOIN #a",
            ":Bob!b@h JOIN #a",
            ":Carol!c@h JOIN #a",
            ":Bob!b@h PART #a",
            ":Carol!c@h QUIT :bye",
        ],
    );

    for user in session.tracker().users() {
        assert!(
            !user.channels.is_empty() || user.monitored || user.is_self,
            "user {} violates the disappearance policy",
            user.nick
        );
    }
    assert!(session.tracker().user("bob").is_none());
    assert!(session.tracker().user("carol").is_none());
    assert!(session.tracker().user("nick").is_some());
}

/// Raw in/out events fire for every line crossing the wire.
#[test]
fn test_raw_events() {
    let mut session = new_session();
    session.handle_line(":server 001 Nick :Welcome");
    let events = session.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::RawIn { line } if line.contains("001"))));

    session.send_raw("PING :probe").unwrap();
    let events = session.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::RawOut { line } if line == "PING :probe")));
}
