//! A connector that never touches the network.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use ndn_node_mgmt::transport::{describe, memory};
use ndn_node_mgmt::{Connector, Face, MgmtError, TransportPolicy};

use crate::daemon::MockDaemon;

enum Behaviour {
    Connect(Arc<MockDaemon>),
    Refuse(String),
}

/// Wires every face to a [`MockDaemon`], or refuses every connection.
pub struct MockConnector {
    behaviour: Behaviour,
    policies: Mutex<Vec<TransportPolicy>>,
    /// (client, daemon side) per connection.
    faces: Mutex<Vec<(Face, Face)>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockConnector {
    pub fn new(daemon: Arc<MockDaemon>) -> Self {
        Self::with_behaviour(Behaviour::Connect(daemon))
    }

    /// Fails every connect with `ConnectFailure { cause }`.
    pub fn refusing(cause: impl Into<String>) -> Self {
        Self::with_behaviour(Behaviour::Refuse(cause.into()))
    }

    fn with_behaviour(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            policies: Mutex::new(Vec::new()),
            faces: Mutex::new(Vec::new()),
        }
    }

    /// Policies of every connect attempt.
    pub fn attempts(&self) -> Vec<TransportPolicy> {
        lock(&self.policies).clone()
    }

    /// Client faces handed out.
    pub fn client_faces(&self) -> Vec<Face> {
        lock(&self.faces).iter().map(|(client, _)| client.clone()).collect()
    }

    /// The daemon's end of every connection, for acting as a peer.
    pub fn daemon_faces(&self) -> Vec<Face> {
        lock(&self.faces).iter().map(|(_, daemon)| daemon.clone()).collect()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, policy: &TransportPolicy) -> ndn_node_mgmt::Result<Face> {
        lock(&self.policies).push(policy.clone());
        match &self.behaviour {
            Behaviour::Refuse(cause) => Err(MgmtError::ConnectFailure {
                endpoint: describe(policy),
                cause: cause.clone(),
            }),
            Behaviour::Connect(daemon) => {
                let (client, server) = memory::pair();
                let server = daemon.attach(server);
                let client = Face::new(client);
                lock(&self.faces).push((client.clone(), server));
                Ok(client)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_refusing_connector() {
        let connector = MockConnector::refusing("connection refused");
        let err = connector.connect(&TransportPolicy::default()).await.unwrap_err();
        match err {
            MgmtError::ConnectFailure { endpoint, cause } => {
                assert_eq!(endpoint, "unix:///run/nfd/nfd.sock");
                assert_eq!(cause, "connection refused");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(connector.attempts().len(), 1);
        assert!(connector.client_faces().is_empty());
    }

    #[tokio::test]
    async fn test_connected_face_is_open() {
        let connector = MockConnector::new(MockDaemon::accepting());
        let face = connector.connect(&TransportPolicy::default()).await.unwrap();
        assert!(!face.is_closed());
        face.close().await;
        assert!(connector.client_faces()[0].is_closed());
    }
}
