//! Session lifecycle types and configuration.
//!
//! The lifecycle is strictly monotonic apart from the fall back to
//! `Disconnected`, which any state may take on local quit, remote
//! close, or fatal error.

use crate::caps::{self, Capability};

/// The connection lifecycle state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    /// No transport.
    #[default]
    Disconnected,
    /// Transport open; CAP LS sent, negotiating capabilities.
    Connecting,
    /// AUTHENTICATE exchange in progress.
    SaslAuthenticating,
    /// CAP END sent, awaiting RPL_WELCOME.
    Registering,
    /// 001 received, ingesting 002-005 and MOTD.
    ReceivingServerInfo,
    /// End of MOTD seen; fully operational.
    Online,
    /// Local quit or fatal error; tearing down.
    Disconnecting,
}

impl SessionState {
    /// Whether server-state-mutating commands are allowed.
    pub fn is_registered(&self) -> bool {
        matches!(self, Self::ReceivingServerInfo | Self::Online)
    }
}

/// What to do when SASL authentication fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SaslPolicy {
    /// Proceed with registration unauthenticated.
    #[default]
    Continue,
    /// Abort the connection.
    Abort,
}

/// SASL PLAIN credentials.
#[derive(Clone, Debug)]
pub struct SaslCredentials {
    /// Account name (authcid).
    pub account: String,
    /// Password.
    pub password: String,
    /// Authorization identity; usually empty.
    pub authzid: String,
}

impl SaslCredentials {
    /// Credentials with an empty authzid.
    pub fn new(account: impl Into<String>, password: impl Into<String>) -> Self {
        SaslCredentials {
            account: account.into(),
            password: password.into(),
            authzid: String::new(),
        }
    }
}

/// Configuration for a session.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Desired nickname.
    pub nickname: String,
    /// Username (ident).
    pub username: String,
    /// Real name / GECOS.
    pub realname: String,
    /// Server password, if required.
    pub password: Option<String>,
    /// SASL credentials, if authentication is desired.
    pub sasl: Option<SaslCredentials>,
    /// Behavior when SASL fails.
    pub sasl_policy: SaslPolicy,
    /// Capabilities to request beyond the core set.
    pub request_caps: Vec<Capability>,
    /// Connect over TLS.
    pub tls: bool,
    /// Flood-control bucket size in lines.
    pub flood_burst: u32,
    /// Flood-control refill rate in lines per second.
    pub flood_rate: u32,
}

impl SessionConfig {
    /// A configuration with the conventional defaults: the core
    /// capability set, no SASL, flood bucket of 4 lines refilling at 2
    /// lines per second.
    pub fn new(
        nickname: impl Into<String>,
        username: impl Into<String>,
        realname: impl Into<String>,
    ) -> Self {
        SessionConfig {
            nickname: nickname.into(),
            username: username.into(),
            realname: realname.into(),
            password: None,
            sasl: None,
            sasl_policy: SaslPolicy::default(),
            request_caps: caps::default_request(),
            tls: false,
            flood_burst: 4,
            flood_rate: 2,
        }
    }

    /// Enable SASL PLAIN with the given credentials.
    pub fn with_sasl(mut self, credentials: SaslCredentials, policy: SaslPolicy) -> Self {
        self.sasl = Some(credentials);
        self.sasl_policy = policy;
        self
    }

    /// Enable TLS for the transport.
    pub fn with_tls(mut self) -> Self {
        self.tls = true;
        self
    }
}
