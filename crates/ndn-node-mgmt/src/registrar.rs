//! Prefix Registrar: `rib/register` against the forwarder's management
//! protocol.
//!
//! A command is a signed Interest named
//! `<mgmt-prefix>/rib/register/<ControlParameters>`; the reply Data carries a
//! [`ControlResponse`]. Status 200 is the only success and nothing is retried.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use ndn_node_core::codec::{from_cbor, to_cbor};
use ndn_node_core::{CodecError, Component, DigestSigner, Interest, Name, Signer};

use crate::error::{MgmtError, Result};
use crate::face::Face;

/// Route origin of client applications.
pub const ORIGIN_CLIENT: u64 = 65;

/// Route flag: the route captures longer prefixes.
pub const ROUTE_FLAG_CAPTURE: u64 = 0x02;

/// The only success status.
pub const STATUS_OK: u32 = 200;

/// Management prefix of a same-host daemon.
pub const LOCALHOST_PREFIX: [&str; 2] = ["localhost", "nfd"];

/// Management prefix of the first-hop router.
pub const LOCALHOP_PREFIX: [&str; 2] = ["localhop", "nfd"];

/// Parameters of a `rib/register` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlParameters {
    pub name: Name,
    pub origin: u64,
    pub cost: u64,
    pub flags: u64,
}

impl ControlParameters {
    /// Client origin, cost 0, CAPTURE.
    pub fn new(name: Name) -> Self {
        Self {
            name,
            origin: ORIGIN_CLIENT,
            cost: 0,
            flags: ROUTE_FLAG_CAPTURE,
        }
    }

    pub fn with_cost(mut self, cost: u64) -> Self {
        self.cost = cost;
        self
    }

    /// Encode as the command's last name component.
    pub fn to_component(&self) -> Component {
        Component::generic(to_cbor(self))
    }

    pub fn from_component(component: &Component) -> std::result::Result<Self, CodecError> {
        from_cbor(component.value())
    }
}

/// The daemon's reply to a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlResponse {
    pub status_code: u32,
    pub status_text: String,
    /// Echo of the accepted parameters on success.
    pub body: Option<ControlParameters>,
}

impl ControlResponse {
    pub fn ok(body: ControlParameters) -> Self {
        Self {
            status_code: STATUS_OK,
            status_text: "OK".into(),
            body: Some(body),
        }
    }

    pub fn error(status_code: u32, status_text: impl Into<String>) -> Self {
        Self {
            status_code,
            status_text: status_text.into(),
            body: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == STATUS_OK
    }

    pub fn to_wire(&self) -> Vec<u8> {
        to_cbor(self)
    }

    pub fn from_wire(wire: &[u8]) -> std::result::Result<Self, CodecError> {
        from_cbor(wire)
    }
}

/// How commands are addressed and signed. Resolved once per session.
#[derive(Clone)]
pub enum RegistrationPolicy {
    /// `/localhost/nfd`, digest-signed; the local daemon trusts local
    /// clients.
    Local,
    /// `/localhop/nfd`, signed by an identity the router accepts.
    Remote { signer: Arc<dyn Signer> },
}

impl RegistrationPolicy {
    pub fn management_prefix(&self) -> Name {
        match self {
            RegistrationPolicy::Local => LOCALHOST_PREFIX.into_iter().collect(),
            RegistrationPolicy::Remote { .. } => LOCALHOP_PREFIX.into_iter().collect(),
        }
    }

    pub fn signer(&self) -> Arc<dyn Signer> {
        match self {
            RegistrationPolicy::Local => Arc::new(DigestSigner),
            RegistrationPolicy::Remote { signer } => signer.clone(),
        }
    }

    /// Name of a command `verb` under `module` with `params`.
    pub fn command_name(&self, module: &str, verb: &str, params: &ControlParameters) -> Name {
        self.management_prefix()
            .append(module)
            .append(verb)
            .append(params.to_component())
    }
}

impl fmt::Debug for RegistrationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationPolicy::Local => f.write_str("Local"),
            RegistrationPolicy::Remote { signer } => f
                .debug_struct("Remote")
                .field("key_locator", &signer.signature_info().key_locator)
                .finish(),
        }
    }
}

/// An accepted registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationResult {
    pub prefix: Name,
    pub response: ControlResponse,
}

/// Register one route.
pub async fn register(
    face: &Face,
    params: ControlParameters,
    policy: &RegistrationPolicy,
) -> Result<RegistrationResult> {
    let prefix = params.name.clone();
    let interest = Interest::new(policy.command_name("rib", "register", &params))
        .with_must_be_fresh(true)
        .sign(policy.signer().as_ref());

    let reply = face.express(interest).await?;
    let response = ControlResponse::from_wire(&reply.content)?;
    if !response.is_success() {
        tracing::error!(
            %prefix,
            status_code = response.status_code,
            status_text = %response.status_text,
            "unable to register route"
        );
        return Err(MgmtError::RegistrationRejected {
            prefix,
            status_code: response.status_code,
            status_text: response.status_text,
        });
    }
    tracing::info!(%prefix, origin = params.origin, flags = params.flags, "route registered");
    Ok(RegistrationResult { prefix, response })
}

/// Register every prefix in order, stopping at the first failure.
///
/// Routes registered before the failure are left in place; they go away
/// with the face.
pub async fn register_all(
    face: &Face,
    prefixes: &[Name],
    policy: &RegistrationPolicy,
) -> Result<Vec<RegistrationResult>> {
    let mut results = Vec::with_capacity(prefixes.len());
    for prefix in prefixes {
        results.push(register(face, ControlParameters::new(prefix.clone()), policy).await?);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::InterestHandler;
    use crate::transport::memory;
    use async_trait::async_trait;
    use bytes::Bytes;
    use ndn_node_core::{Data, DigestVerifier, Keypair, NamedSigner, NamedVerifier, Verifier};
    use std::sync::Mutex;

    /// Answers every command with the next scripted status.
    struct ScriptedDaemon {
        statuses: Mutex<Vec<u32>>,
        seen: Mutex<Vec<Interest>>,
    }

    #[async_trait]
    impl InterestHandler for ScriptedDaemon {
        async fn on_interest(&self, interest: Interest) -> Option<Data> {
            let params = ControlParameters::from_component(interest.name.get(-1)?).ok()?;
            let status = self.statuses.lock().unwrap().remove(0);
            self.seen.lock().unwrap().push(interest.clone());
            let response = if status == STATUS_OK {
                ControlResponse::ok(params)
            } else {
                ControlResponse::error(status, "Forbidden")
            };
            Some(Data::new(interest.name, Bytes::from(response.to_wire())).sign(&DigestSigner))
        }
    }

    async fn daemon(statuses: Vec<u32>, prefix: &str) -> (Face, Face, Arc<ScriptedDaemon>) {
        let (a, b) = memory::pair();
        let client = Face::new(a);
        let server = Face::new(b);
        let script = Arc::new(ScriptedDaemon {
            statuses: Mutex::new(statuses),
            seen: Mutex::new(Vec::new()),
        });
        server.produce(prefix.parse().unwrap(), script.clone());
        (client, server, script)
    }

    fn name(s: &str) -> Name {
        s.parse().unwrap()
    }

    #[test]
    fn test_defaults() {
        let params = ControlParameters::new(name("/ndn/workspace"));
        assert_eq!(params.origin, 65);
        assert_eq!(params.cost, 0);
        assert_eq!(params.flags, 0x02);
        assert_eq!(
            ControlParameters::from_component(&params.to_component()).unwrap(),
            params
        );
    }

    #[test]
    fn test_command_names() {
        let params = ControlParameters::new(name("/a"));
        let local = RegistrationPolicy::Local.command_name("rib", "register", &params);
        assert!(name("/localhost/nfd/rib/register").is_prefix_of(&local));
        assert_eq!(local.len(), 5);

        let signer = NamedSigner::new(Keypair::from_seed(&[1; 32]), name("/id/KEY/k"));
        let remote = RegistrationPolicy::Remote {
            signer: Arc::new(signer),
        };
        assert!(name("/localhop/nfd/rib/register")
            .is_prefix_of(&remote.command_name("rib", "register", &params)));
    }

    #[tokio::test]
    async fn test_local_register_is_digest_signed() {
        let (client, _server, script) = daemon(vec![200], "/localhost/nfd").await;
        let result = register(&client, ControlParameters::new(name("/ndn/ws")), &RegistrationPolicy::Local)
            .await
            .unwrap();
        assert_eq!(result.prefix, name("/ndn/ws"));
        assert!(result.response.is_success());

        let seen = script.seen.lock().unwrap();
        assert!(seen[0].verify(&DigestVerifier));
        assert!(seen[0].sig_info.as_ref().unwrap().key_locator.is_none());
    }

    #[tokio::test]
    async fn test_remote_register_uses_identity_signer() {
        let keypair = Keypair::from_seed(&[9; 32]);
        let signer = NamedSigner::new(keypair.clone(), name("/testbed/KEY/k"));
        let policy = RegistrationPolicy::Remote {
            signer: Arc::new(signer),
        };
        let (client, _server, script) = daemon(vec![200], "/localhop/nfd").await;
        register(&client, ControlParameters::new(name("/ndn/ws")), &policy)
            .await
            .unwrap();

        let seen = script.seen.lock().unwrap();
        let verifier = NamedVerifier::new(keypair.public_key(), name("/testbed/KEY/k"));
        assert!(seen[0].verify(&verifier));
        assert!(!seen[0].verify(&DigestVerifier));
    }

    #[tokio::test]
    async fn test_rejection_carries_status() {
        let (client, _server, _) = daemon(vec![403], "/localhost/nfd").await;
        let err = register(&client, ControlParameters::new(name("/ndn/ws")), &RegistrationPolicy::Local)
            .await
            .unwrap_err();
        match err {
            MgmtError::RegistrationRejected {
                prefix,
                status_code,
                status_text,
            } => {
                assert_eq!(prefix, name("/ndn/ws"));
                assert_eq!(status_code, 403);
                assert_eq!(status_text, "Forbidden");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_register_all_stops_at_first_failure() {
        let (client, _server, script) = daemon(vec![200, 403, 200], "/localhost/nfd").await;
        let prefixes = vec![name("/a"), name("/b"), name("/c")];
        let err = register_all(&client, &prefixes, &RegistrationPolicy::Local)
            .await
            .unwrap_err();
        assert!(matches!(err, MgmtError::RegistrationRejected { ref prefix, .. } if *prefix == name("/b")));
        assert_eq!(script.seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_register_all_success() {
        let (client, _server, _) = daemon(vec![200, 200], "/localhost/nfd").await;
        let prefixes = vec![name("/a"), name("/b")];
        let results = register_all(&client, &prefixes, &RegistrationPolicy::Local)
            .await
            .unwrap();
        assert_eq!(
            results.iter().map(|r| r.prefix.clone()).collect::<Vec<_>>(),
            prefixes
        );
    }

    #[test]
    fn test_signer_per_policy() {
        let info = RegistrationPolicy::Local.signer().signature_info();
        assert!(info.key_locator.is_none());
        let verifier = DigestVerifier;
        let sig = RegistrationPolicy::Local.signer().sign(b"cmd");
        assert!(verifier.verify(b"cmd", &sig));
    }
}
