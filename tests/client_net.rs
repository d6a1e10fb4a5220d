//! Client integration test against a scripted server on the loopback
//! interface: registration, PING handling, channel join, WHOIS, and
//! teardown.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio_util::codec::{Framed, LinesCodec};

use slirc_session::{Client, Event, EventReceiver, SessionConfig, SessionState};

async fn wait_for(events: &mut EventReceiver, pred: impl Fn(&Event) -> bool) -> Event {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match events.recv().await {
                Some(event) if pred(&event) => return event,
                Some(_) => continue,
                None => panic!("event stream ended unexpectedly"),
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// A minimal scripted IRC server for one client.
async fn run_server(listener: TcpListener) {
    let (socket, _) = listener.accept().await.expect("accept");
    let mut framed = Framed::new(socket, LinesCodec::new());

    while let Some(Ok(line)) = framed.next().await {
        let words: Vec<&str> = line.split(' ').collect();
        let reply: Vec<String> = match (words.first().copied(), words.get(1).copied()) {
            (Some("CAP"), Some(sub)) if sub.starts_with("LS") => {
                vec![":srv CAP * LS :multi-prefix sasl".to_string()]
            }
            (Some("CAP"), Some("REQ")) => {
                vec![":srv CAP testbot ACK :multi-prefix".to_string()]
            }
            (Some("CAP"), Some("END")) => vec![
                ":srv 001 testbot :Welcome".to_string(),
                ":srv 005 testbot PREFIX=(ov)@+ CASEMAPPING=rfc1459 MONITOR=5 :are supported"
                    .to_string(),
                ":srv 376 testbot :End of MOTD".to_string(),
                "PING :sync".to_string(),
            ],
            (Some("JOIN"), Some(chan)) => vec![
                format!(":testbot!t@h JOIN {}", chan),
                format!(":srv 353 testbot = {} :@testbot +friend", chan),
                format!(":srv 366 testbot {} :End of /NAMES", chan),
            ],
            (Some("WHOIS"), Some(nick)) => vec![
                format!(":srv 311 testbot {} id some.host * :Real Name", nick),
                format!(":srv 318 testbot {} :End of /WHOIS list", nick),
            ],
            (Some("QUIT"), _) => break,
            _ => Vec::new(),
        };
        for line in reply {
            framed.send(line).await.expect("server send");
        }
    }
}

#[tokio::test]
async fn test_full_session_over_loopback() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let server = tokio::spawn(run_server(listener));

    let config = SessionConfig::new("testbot", "t", "Test Bot");
    let (client, mut events) = Client::connect(config, "127.0.0.1", addr.port())
        .await
        .expect("connect");

    wait_for(&mut events, |e| matches!(e, Event::Registered { .. })).await;
    assert_eq!(client.state(), SessionState::Online);
    assert_eq!(client.current_nick(), "testbot");

    // The server's post-MOTD PING is answered without host involvement
    wait_for(&mut events, |e| {
        matches!(e, Event::RawOut { line } if line.starts_with("PONG"))
    })
    .await;

    client.join("#t", None).expect("join");
    wait_for(&mut events, |e| {
        matches!(e, Event::Joined { channel, nick } if channel == "#t" && nick == "testbot")
    })
    .await;
    wait_for(&mut events, |e| {
        matches!(e, Event::RawIn { line } if line.contains("366"))
    })
    .await;

    let chan = client.channel("#t").expect("channel snapshot");
    assert_eq!(chan.members.len(), 2);
    assert!(chan.members["friend"].has_status('+'));

    let info = client.whois("friend").await.expect("whois");
    assert_eq!(info.nick, "friend");
    assert_eq!(info.host.as_deref(), Some("some.host"));

    client.disconnect(Some("done"));
    wait_for(&mut events, |e| matches!(e, Event::Disconnected { .. })).await;
    assert_eq!(client.state(), SessionState::Disconnected);

    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server exit")
        .expect("server task");
}

#[tokio::test]
async fn test_commands_rejected_before_registration() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    // A server that accepts but never answers
    let _server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.expect("accept");
        // Hold the socket open long enough for the assertions below
        tokio::time::sleep(Duration::from_secs(2)).await;
        drop(socket);
    });

    let config = SessionConfig::new("testbot", "t", "Test Bot");
    let (client, _events) = Client::connect(config, "127.0.0.1", addr.port())
        .await
        .expect("connect");

    assert!(matches!(
        client.message("#t", "too early"),
        Err(slirc_session::SessionError::NotRegistered)
    ));
    assert!(matches!(
        client.monitor_add(&["friend"]),
        Err(slirc_session::SessionError::NotSupported(_))
    ));
}
