//! TCP/TLS transport with a line codec.
//!
//! The transport exposes a framed line stream over plain TCP or
//! rustls-backed TLS. Lines are CRLF-terminated on send; bare LF is
//! accepted on receive, and inbound bytes that are not valid UTF-8 are
//! decoded lossily rather than dropping the line.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use bytes::{BufMut, BytesMut};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use socket2::{SockRef, TcpKeepalive};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use tokio_util::codec::{Decoder, Encoder, Framed};
use tracing::warn;

/// Guard against unbounded buffering on a hostile or broken peer. The
/// protocol line limit is 512 bytes, but tag-heavy servers legitimately
/// exceed it, so the transport allows far more before giving up.
pub const MAX_INBOUND_LINE_LEN: usize = 8191;

/// Newline-delimited codec for IRC lines.
///
/// Decodes to `String` (lossily for non-UTF-8 bytes) with the
/// terminator stripped; encodes by appending CRLF.
pub struct LineCodec;

impl Decoder for LineCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, io::Error> {
        let Some(pos) = src.iter().position(|&b| b == b'\n') else {
            if src.len() > MAX_INBOUND_LINE_LEN {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "inbound line exceeds maximum length",
                ));
            }
            return Ok(None);
        };

        let mut line = src.split_to(pos + 1);
        line.truncate(line.len() - 1);
        if line.last() == Some(&b'\r') {
            line.truncate(line.len() - 1);
        }
        Ok(Some(String::from_utf8_lossy(&line).into_owned()))
    }
}

impl Encoder<String> for LineCodec {
    type Error = io::Error;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), io::Error> {
        dst.reserve(item.len() + 2);
        dst.put_slice(item.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

/// A connected byte transport framed into lines.
pub enum Transport {
    /// Plain TCP.
    Tcp(Framed<TcpStream, LineCodec>),
    /// TLS over TCP.
    Tls(Framed<TlsStream<TcpStream>, LineCodec>),
}

impl Transport {
    /// Connect to `host:port`, optionally wrapping the stream in TLS
    /// with the webpki trust roots.
    pub async fn connect(host: &str, port: u16, tls: bool) -> io::Result<Transport> {
        let stream = TcpStream::connect((host, port)).await?;
        if let Err(e) = enable_keepalive(&stream) {
            warn!(error = %e, "failed to enable TCP keepalive");
        }

        if tls {
            let mut roots = RootCertStore::empty();
            roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
            let config = ClientConfig::builder()
                .with_root_certificates(roots)
                .with_no_client_auth();
            let connector = TlsConnector::from(Arc::new(config));
            let server_name = ServerName::try_from(host.to_string())
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
            let stream = connector.connect(server_name, stream).await?;
            Ok(Transport::Tls(Framed::new(stream, LineCodec)))
        } else {
            Ok(Transport::Tcp(Framed::new(stream, LineCodec)))
        }
    }

    /// Whether the transport is TLS-wrapped.
    pub fn is_tls(&self) -> bool {
        matches!(self, Transport::Tls(_))
    }

    /// Split into independently owned write and read halves for the
    /// writer and reader tasks.
    pub fn split(self) -> (TransportSink, TransportStream) {
        match self {
            Transport::Tcp(framed) => {
                let (sink, stream) = framed.split();
                (TransportSink::Tcp(sink), TransportStream::Tcp(stream))
            }
            Transport::Tls(framed) => {
                let (sink, stream) = framed.split();
                (TransportSink::Tls(sink), TransportStream::Tls(stream))
            }
        }
    }
}

fn enable_keepalive(stream: &TcpStream) -> io::Result<()> {
    let sock = SockRef::from(stream);
    let keepalive = TcpKeepalive::new()
        .with_time(Duration::from_secs(120))
        .with_interval(Duration::from_secs(30));
    sock.set_tcp_keepalive(&keepalive)
}

/// The write half of a split transport.
pub enum TransportSink {
    /// Plain TCP.
    Tcp(SplitSink<Framed<TcpStream, LineCodec>, String>),
    /// TLS over TCP.
    Tls(SplitSink<Framed<TlsStream<TcpStream>, LineCodec>, String>),
}

impl TransportSink {
    /// Write one line (terminator appended by the codec).
    pub async fn send_line(&mut self, line: String) -> io::Result<()> {
        match self {
            TransportSink::Tcp(sink) => sink.send(line).await,
            TransportSink::Tls(sink) => sink.send(line).await,
        }
    }

    /// Flush buffered lines and close the write side.
    pub async fn close(&mut self) -> io::Result<()> {
        match self {
            TransportSink::Tcp(sink) => sink.close().await,
            TransportSink::Tls(sink) => sink.close().await,
        }
    }
}

/// The read half of a split transport.
pub enum TransportStream {
    /// Plain TCP.
    Tcp(SplitStream<Framed<TcpStream, LineCodec>>),
    /// TLS over TCP.
    Tls(SplitStream<Framed<TlsStream<TcpStream>, LineCodec>>),
}

impl TransportStream {
    /// The next inbound line; `None` on EOF.
    pub async fn next_line(&mut self) -> Option<io::Result<String>> {
        match self {
            TransportStream::Tcp(stream) => stream.next().await,
            TransportStream::Tls(stream) => stream.next().await,
        }
    }
}
