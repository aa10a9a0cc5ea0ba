//! Session configuration.
//!
//! [`NodeArgs`] is the command line / environment surface of the `ndn-node`
//! binary. It resolves once into a [`SessionConfig`]: the secret inputs plus
//! a typed [`SessionPolicy`] that nothing downstream re-interprets.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use url::Url;

use ndn_node_core::Name;
use ndn_node_mgmt::transport::DEFAULT_SOCKET_PATH;
use ndn_node_mgmt::TransportPolicy;
use ndn_node_store::StorageLocation;

use crate::error::{Result, SessionError};

/// Upper bound on a session's running phase.
pub const DEFAULT_MAX_SESSION: Duration = Duration::from_secs(60 * 60);

/// Where the node's certificate comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum IdentityMode {
    /// The key bundle holds the node's own certificate.
    Fixed,
    /// The key bundle holds the domain's signing key; a fresh node
    /// certificate is issued for every session.
    #[default]
    Delegated,
}

impl fmt::Display for IdentityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityMode::Fixed => f.write_str("fixed"),
            IdentityMode::Delegated => f.write_str("delegated"),
        }
    }
}

/// Transport selector on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportKind {
    /// Unix socket to a same-host daemon.
    Local,
    /// Secure WebSocket to a router.
    Remote,
}

/// A base64 key bundle and its passphrase.
#[derive(Clone)]
pub struct Credentials {
    pub bundle: String,
    pub passphrase: String,
}

impl Credentials {
    pub fn new(bundle: impl Into<String>, passphrase: impl Into<String>) -> Self {
        Self {
            bundle: bundle.into(),
            passphrase: passphrase.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("bundle_len", &self.bundle.len())
            .field("passphrase", &"[REDACTED]")
            .finish()
    }
}

/// How a session behaves, independent of its secrets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPolicy {
    pub identity: IdentityMode,
    pub transport: TransportPolicy,
    /// Prefixes to register. Empty means the domain prefix and the node
    /// prefix.
    pub prefixes: Vec<Name>,
    pub max_duration: Duration,
    pub storage: StorageLocation,
}

impl Default for SessionPolicy {
    fn default() -> Self {
        Self {
            identity: IdentityMode::default(),
            transport: TransportPolicy::default(),
            prefixes: Vec::new(),
            max_duration: DEFAULT_MAX_SESSION,
            storage: StorageLocation::default(),
        }
    }
}

impl SessionPolicy {
    /// The prefixes to register for a node named `node` in the domain
    /// `domain`.
    pub fn registration_prefixes(&self, domain: &Name, node: &Name) -> Vec<Name> {
        if self.prefixes.is_empty() {
            vec![domain.clone(), node.clone()]
        } else {
            self.prefixes.clone()
        }
    }
}

/// Everything a session needs.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Base64 trust anchor certificate.
    pub trust_anchor: String,
    /// The node's key bundle, or the domain key in delegated mode.
    pub credentials: Credentials,
    /// Signs registration commands in remote mode when present.
    pub registration_credentials: Option<Credentials>,
    pub node_id: u32,
    pub policy: SessionPolicy,
}

impl SessionConfig {
    /// A config with the default policy.
    pub fn new(trust_anchor: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            trust_anchor: trust_anchor.into(),
            credentials,
            registration_credentials: None,
            node_id: 0,
            policy: SessionPolicy::default(),
        }
    }

    pub fn with_node_id(mut self, node_id: u32) -> Self {
        self.node_id = node_id;
        self
    }

    pub fn with_registration_credentials(mut self, credentials: Credentials) -> Self {
        self.registration_credentials = Some(credentials);
        self
    }

    pub fn with_policy(mut self, policy: SessionPolicy) -> Self {
        self.policy = policy;
        self
    }
}

fn parse_seconds(s: &str) -> std::result::Result<Duration, std::num::ParseIntError> {
    s.parse().map(Duration::from_secs)
}

/// Command line of the `ndn-node` binary. Every option has an environment
/// fallback.
#[derive(Debug, Parser)]
#[command(name = "ndn-node")]
#[command(about = "Bootstrap an NDN identity, register with a forwarder and run a session", long_about = None)]
pub struct NodeArgs {
    /// Base64 trust anchor certificate
    #[arg(long, env = "NDN_TRUST_ANCHOR", hide_env_values = true)]
    pub trust_anchor: String,

    /// Base64 encrypted key bundle
    #[arg(long, env = "NDN_KEY_BUNDLE", hide_env_values = true)]
    pub key_bundle: String,

    /// Passphrase of the key bundle
    #[arg(long, env = "NDN_KEY_PASSPHRASE", hide_env_values = true)]
    pub key_passphrase: String,

    /// Base64 bundle that signs registration commands in remote mode
    #[arg(long, env = "NDN_REG_BUNDLE", hide_env_values = true)]
    pub reg_bundle: Option<String>,

    /// Passphrase of the registration bundle
    #[arg(long, env = "NDN_REG_PASSPHRASE", hide_env_values = true)]
    pub reg_passphrase: Option<String>,

    /// Numeric node id, part of a delegated identity name
    #[arg(long, env = "NODE_ID", default_value_t = 0)]
    pub node_id: u32,

    #[arg(long, env = "NDN_IDENTITY_MODE", value_enum, default_value_t = IdentityMode::Delegated)]
    pub identity_mode: IdentityMode,

    #[arg(long, env = "NDN_TRANSPORT", value_enum, default_value_t = TransportKind::Local)]
    pub transport: TransportKind,

    /// Forwarder socket for the local transport
    #[arg(long, env = "NDN_SOCKET", default_value = DEFAULT_SOCKET_PATH)]
    pub socket: PathBuf,

    /// WebSocket router; discovered through NDN-FCH when absent
    #[arg(long, env = "NDN_ENDPOINT")]
    pub endpoint: Option<Url>,

    /// Prefix to register (repeatable)
    #[arg(long = "prefix", env = "NDN_PREFIX", value_delimiter = ',')]
    pub prefixes: Vec<String>,

    /// Maximum session duration in seconds
    #[arg(long, env = "NDN_MAX_SESSION", default_value = "3600", value_parser = parse_seconds)]
    pub max_session: Duration,

    /// `memory` or a SQLite database path
    #[arg(long, env = "NDN_STORAGE", default_value = "memory")]
    pub storage: StorageLocation,

    /// Log at debug level
    #[arg(long, env = "NDN_NODE_DEBUG")]
    pub debug: bool,
}

impl NodeArgs {
    /// Resolve into a session config.
    pub fn into_config(self) -> Result<SessionConfig> {
        let prefixes = self
            .prefixes
            .iter()
            .filter(|p| !p.is_empty())
            .map(|p| {
                p.parse::<Name>()
                    .map_err(|e| SessionError::Config(format!("bad prefix {p:?}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        let registration_credentials = match (self.reg_bundle, self.reg_passphrase) {
            (Some(bundle), Some(passphrase)) => Some(Credentials::new(bundle, passphrase)),
            (None, _) => None,
            (Some(_), None) => {
                return Err(SessionError::Config(
                    "a registration bundle needs a registration passphrase".into(),
                ))
            }
        };

        let transport = match self.transport {
            TransportKind::Local => TransportPolicy::Local {
                socket_path: self.socket,
            },
            TransportKind::Remote => TransportPolicy::Remote {
                endpoint: self.endpoint,
            },
        };

        Ok(SessionConfig {
            trust_anchor: self.trust_anchor,
            credentials: Credentials::new(self.key_bundle, self.key_passphrase),
            registration_credentials,
            node_id: self.node_id,
            policy: SessionPolicy {
                identity: self.identity_mode,
                transport,
                prefixes,
                max_duration: self.max_session,
                storage: self.storage,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> NodeArgs {
        let mut argv = vec![
            "ndn-node",
            "--trust-anchor",
            "QUFB",
            "--key-bundle",
            "QkJC",
            "--key-passphrase",
            "123456",
        ];
        argv.extend_from_slice(extra);
        NodeArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = args(&[]).into_config().unwrap();
        assert_eq!(config.node_id, 0);
        assert_eq!(config.policy.identity, IdentityMode::Delegated);
        assert_eq!(config.policy.transport, TransportPolicy::default());
        assert!(config.policy.prefixes.is_empty());
        assert_eq!(config.policy.max_duration, DEFAULT_MAX_SESSION);
        assert_eq!(config.policy.storage, StorageLocation::Memory);
        assert!(config.registration_credentials.is_none());
    }

    #[test]
    fn test_remote_with_prefixes() {
        let config = args(&[
            "--transport",
            "remote",
            "--endpoint",
            "wss://router.example.net/ws/",
            "--prefix",
            "/ndn/workspace",
            "--prefix",
            "/ndn/workspace/node-1",
            "--identity-mode",
            "fixed",
            "--max-session",
            "30",
            "--storage",
            "/tmp/node.db",
        ])
        .into_config()
        .unwrap();

        assert_eq!(config.policy.identity, IdentityMode::Fixed);
        assert_eq!(
            config.policy.transport,
            TransportPolicy::Remote {
                endpoint: Some("wss://router.example.net/ws/".parse().unwrap())
            }
        );
        assert_eq!(config.policy.prefixes.len(), 2);
        assert_eq!(config.policy.max_duration, Duration::from_secs(30));
        assert_eq!(config.policy.storage, StorageLocation::Sqlite("/tmp/node.db".into()));
    }

    #[test]
    fn test_registration_bundle_needs_passphrase() {
        let err = args(&["--reg-bundle", "Q0ND"]).into_config().unwrap_err();
        assert!(matches!(err, SessionError::Config(_)));

        let config = args(&["--reg-bundle", "Q0ND", "--reg-passphrase", "pw"])
            .into_config()
            .unwrap();
        assert_eq!(config.registration_credentials.unwrap().passphrase, "pw");
    }

    #[test]
    fn test_bad_prefix_rejected() {
        let err = args(&["--prefix", "no-leading-slash"]).into_config().unwrap_err();
        assert!(matches!(err, SessionError::Config(_)));
    }

    #[test]
    fn test_default_prefixes() {
        let policy = SessionPolicy::default();
        let domain: Name = "/ndn/workspace".parse().unwrap();
        let node: Name = "/ndn/workspace/node-1-7".parse().unwrap();
        assert_eq!(
            policy.registration_prefixes(&domain, &node),
            vec![domain.clone(), node.clone()]
        );

        let custom = SessionPolicy {
            prefixes: vec!["/only".parse().unwrap()],
            ..SessionPolicy::default()
        };
        assert_eq!(custom.registration_prefixes(&domain, &node).len(), 1);
    }

    #[test]
    fn test_credentials_debug_redacts() {
        let creds = Credentials::new("QUFB", "hunter2");
        assert!(!format!("{creds:?}").contains("hunter2"));
    }
}
