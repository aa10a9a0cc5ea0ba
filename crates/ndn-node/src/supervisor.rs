//! The Session Supervisor.
//!
//! Drives one session through
//! `Idle → Bootstrapping → Connecting → Registering → Running → Draining → Closed`.
//! Every path, including failures before any resource exists, ends in
//! `Closed` with the [`ResourceStack`] drained.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};

use ndn_node_core::{decode_certificate, decode_key_bundle, Certificate, NamedSigner};
use ndn_node_keychain::{issuer, safebag, TrustStore};
use ndn_node_mgmt::{registrar, CertificateProducer, Connector, RegistrationPolicy, TransportPolicy};

use crate::config::{Credentials, IdentityMode, SessionConfig};
use crate::error::{Result, SessionError};
use crate::resources::ResourceStack;
use crate::workload::{Workload, WorkloadContext};

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Bootstrapping,
    Connecting,
    Registering,
    Running,
    Draining,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Idle => "idle",
            SessionState::Bootstrapping => "bootstrapping",
            SessionState::Connecting => "connecting",
            SessionState::Registering => "registering",
            SessionState::Running => "running",
            SessionState::Draining => "draining",
            SessionState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// How a session ended.
#[derive(Debug)]
pub enum SessionOutcome {
    /// The workload returned.
    Completed,
    /// The shutdown signal fired.
    Interrupted,
    /// The maximum session duration elapsed.
    TimedOut,
    /// A stage or the workload failed.
    Aborted(SessionError),
}

impl SessionOutcome {
    /// Everything except [`Aborted`](Self::Aborted).
    pub fn is_clean(&self) -> bool {
        !matches!(self, SessionOutcome::Aborted(_))
    }
}

impl fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionOutcome::Completed => f.write_str("completed"),
            SessionOutcome::Interrupted => f.write_str("interrupted"),
            SessionOutcome::TimedOut => f.write_str("timed out"),
            SessionOutcome::Aborted(e) => write!(f, "aborted: {e}"),
        }
    }
}

/// Trust material produced by the bootstrap stage.
#[derive(Debug)]
pub struct Bootstrap {
    pub trust: TrustStore,
    /// Signs registration commands in remote mode, with its certificate.
    pub registration: Option<(Arc<NamedSigner>, Certificate)>,
}

impl Bootstrap {
    /// The registration policy for `transport`.
    ///
    /// Local daemons take digest-signed commands. Remote routers take
    /// commands signed by the registration identity, or by the node itself
    /// when there is none.
    pub fn registration_policy(&self, transport: &TransportPolicy) -> RegistrationPolicy {
        if transport.is_local() {
            return RegistrationPolicy::Local;
        }
        let signer = match &self.registration {
            Some((signer, _)) => signer.clone(),
            None => self.trust.signer(),
        };
        RegistrationPolicy::Remote { signer }
    }

    /// Certificates served on the face: the node's own and, when present,
    /// the registration certificate.
    pub fn served_certificates(&self) -> Vec<Certificate> {
        let mut certs = vec![self.trust.certificate().clone()];
        if let Some((_, cert)) = &self.registration {
            certs.push(cert.clone());
        }
        certs
    }
}

async fn unwrap_signer(credentials: &Credentials) -> Result<(Certificate, NamedSigner)> {
    let bundle = decode_key_bundle(&credentials.bundle)?;
    let (cert, key) = safebag::unwrap_async(bundle, credentials.passphrase.clone()).await?;
    let signer = key.to_signer(cert.name().clone())?;
    Ok((cert, signer))
}

/// Decode, unwrap, optionally issue, and build the trust store.
///
/// Touches no network or storage resource.
pub async fn bootstrap(config: &SessionConfig) -> Result<Bootstrap> {
    let anchor = decode_certificate(&config.trust_anchor)?;
    let (cert, signer) = unwrap_signer(&config.credentials).await?;

    let trust = match config.policy.identity {
        IdentityMode::Fixed => TrustStore::build(anchor, cert, signer)?,
        IdentityMode::Delegated => {
            let identity = issuer::node_identity_name(&cert.identity(), config.node_id);
            let issued = issuer::issue(&identity, &signer, issuer::default_validity())?;
            TrustStore::build(anchor, issued.certificate, issued.signer)?
        }
    };
    tracing::info!(
        cert = %trust.certificate().name(),
        period = %trust.certificate().validity(),
        "node identity ready"
    );

    let registration = match &config.registration_credentials {
        Some(credentials) => {
            let (cert, signer) = unwrap_signer(credentials).await?;
            tracing::info!(
                cert = %cert.name(),
                period = %cert.validity(),
                "registration identity ready"
            );
            Some((Arc::new(signer), cert))
        }
        None => None,
    };

    Ok(Bootstrap {
        trust,
        registration,
    })
}

/// Runs one session.
pub struct Supervisor {
    config: SessionConfig,
    connector: Arc<dyn Connector>,
    resources: Arc<ResourceStack>,
    history: Mutex<Vec<SessionState>>,
    released: Mutex<Vec<String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Supervisor {
    pub fn new(config: SessionConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            config,
            connector,
            resources: Arc::new(ResourceStack::new()),
            history: Mutex::new(vec![SessionState::Idle]),
            released: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        lock(&self.history).last().copied().unwrap_or(SessionState::Idle)
    }

    /// Every state entered so far, starting with `Idle`.
    pub fn history(&self) -> Vec<SessionState> {
        lock(&self.history).clone()
    }

    /// Labels of released resources, in release order.
    pub fn released(&self) -> Vec<String> {
        lock(&self.released).clone()
    }

    fn transition(&self, to: SessionState) {
        let mut history = lock(&self.history);
        let from = history.last().copied().unwrap_or(SessionState::Idle);
        history.push(to);
        tracing::debug!(%from, %to, "session state");
    }

    /// Leave `Idle` for `Bootstrapping`; false if the session already left it.
    fn begin(&self) -> bool {
        let mut history = lock(&self.history);
        if history.last().copied().unwrap_or(SessionState::Idle) != SessionState::Idle {
            return false;
        }
        history.push(SessionState::Bootstrapping);
        tracing::debug!(from = %SessionState::Idle, to = %SessionState::Bootstrapping, "session state");
        true
    }

    /// Run the session to `Closed`.
    ///
    /// `shutdown` is watched from the first stage on: if it resolves during
    /// bootstrap, connect or registration, the stage is dropped and the
    /// session drains as `Interrupted`. The maximum duration only bounds
    /// the workload.
    pub async fn run<S>(&self, workload: Arc<dyn Workload>, shutdown: S) -> SessionOutcome
    where
        S: Future<Output = ()> + Send,
    {
        if !self.begin() {
            return SessionOutcome::Aborted(SessionError::AlreadyStarted);
        }

        tokio::pin!(shutdown);
        let outcome = match self.start(workload, shutdown).await {
            Ok(outcome) => outcome,
            Err(e) => SessionOutcome::Aborted(e),
        };
        match &outcome {
            SessionOutcome::Aborted(e) => {
                tracing::error!(state = %self.state(), error = %e, "session aborted")
            }
            outcome => tracing::info!(state = %self.state(), %outcome, "session ending"),
        }

        self.transition(SessionState::Draining);
        let released = self.resources.drain().await;
        tracing::info!(released = ?released, "session drained");
        lock(&self.released).extend(released);
        self.transition(SessionState::Closed);
        outcome
    }

    async fn start<S>(
        &self,
        workload: Arc<dyn Workload>,
        mut shutdown: Pin<&mut S>,
    ) -> Result<SessionOutcome>
    where
        S: Future<Output = ()> + Send,
    {
        let policy = &self.config.policy;

        let Some(boot) = unless_shutdown(shutdown.as_mut(), bootstrap(&self.config)).await else {
            return Ok(SessionOutcome::Interrupted);
        };
        let boot = boot?;

        self.transition(SessionState::Connecting);
        let Some(face) =
            unless_shutdown(shutdown.as_mut(), self.connector.connect(&policy.transport)).await
        else {
            return Ok(SessionOutcome::Interrupted);
        };
        let face = face?;
        self.resources.push(face.clone()).await;

        self.transition(SessionState::Registering);
        let prefixes = policy.registration_prefixes(
            &boot.trust.anchor().identity(),
            &boot.trust.certificate().identity(),
        );
        let registration = boot.registration_policy(&policy.transport);
        let Some(registered) = unless_shutdown(
            shutdown.as_mut(),
            registrar::register_all(&face, &prefixes, &registration),
        )
        .await
        else {
            return Ok(SessionOutcome::Interrupted);
        };
        registered?;

        let storage = policy.storage.open()?;
        self.resources.push(storage.clone()).await;
        boot.trust.publish(storage.as_ref()).await?;
        let producer = CertificateProducer::serve(&face, boot.served_certificates());
        self.resources.push(producer).await;

        self.transition(SessionState::Running);
        tracing::info!(
            node = %boot.trust.certificate().identity(),
            prefixes = prefixes.len(),
            storage = %policy.storage,
            max_duration = ?policy.max_duration,
            "session running"
        );
        let ctx = WorkloadContext::new(face, storage, boot.trust, self.resources.clone());

        let outcome = tokio::select! {
            biased;
            () = shutdown => SessionOutcome::Interrupted,
            result = workload.run(ctx) => match result {
                Ok(()) => SessionOutcome::Completed,
                Err(e) => SessionOutcome::Aborted(SessionError::Workload(e)),
            },
            () = tokio::time::sleep(policy.max_duration) => SessionOutcome::TimedOut,
        };
        Ok(outcome)
    }
}

/// Drive `stage` unless `shutdown` resolves first, in which case the stage
/// is dropped and `None` returned.
async fn unless_shutdown<S, F>(shutdown: Pin<&mut S>, stage: F) -> Option<F::Output>
where
    S: Future<Output = ()>,
    F: Future,
{
    tokio::select! {
        biased;
        () = shutdown => None,
        output = stage => Some(output),
    }
}
