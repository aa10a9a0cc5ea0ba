//! A scripted forwarding daemon.
//!
//! Serves the management prefixes of both a local daemon and a first-hop
//! router on a face. Each `rib/register` command takes the next status from
//! the script; once the script runs out every command succeeds. A silent
//! daemon records commands and never answers them.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;

use ndn_node_core::{Data, DigestSigner, Interest, Name};
use ndn_node_mgmt::registrar::{LOCALHOP_PREFIX, LOCALHOST_PREFIX, STATUS_OK};
use ndn_node_mgmt::{ControlParameters, ControlResponse, Face, InterestHandler, Link};

/// A command the daemon answered.
#[derive(Debug, Clone)]
pub struct RecordedCommand {
    pub interest: Interest,
    pub params: ControlParameters,
    /// `0` when the daemon never answered.
    pub status_code: u32,
}

impl RecordedCommand {
    /// `localhost` or `localhop`.
    pub fn scope(&self) -> String {
        self.interest
            .name
            .get(0)
            .map(|c| String::from_utf8_lossy(c.value()).into_owned())
            .unwrap_or_default()
    }
}

/// Mock daemon state, shared by every face attached to it.
#[derive(Default)]
pub struct MockDaemon {
    script: Mutex<VecDeque<u32>>,
    commands: Mutex<Vec<RecordedCommand>>,
    silent: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockDaemon {
    /// Accepts every command.
    pub fn accepting() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answers commands with `statuses` in order, then accepts.
    pub fn scripted(statuses: impl IntoIterator<Item = u32>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(statuses.into_iter().collect()),
            ..Self::default()
        })
    }

    /// Records commands but never answers, so registration stalls until
    /// the command times out.
    pub fn silent() -> Arc<Self> {
        Arc::new(Self {
            silent: true,
            ..Self::default()
        })
    }

    /// Serve the management prefixes on a new face over `link`.
    pub fn attach(self: &Arc<Self>, link: Link) -> Face {
        let face = Face::new(link);
        for prefix in [LOCALHOST_PREFIX, LOCALHOP_PREFIX] {
            let prefix: Name = prefix.into_iter().collect();
            // Handles are dropped; producers stay until the face closes.
            let _ = face.produce(prefix, self.clone());
        }
        face
    }

    /// Commands answered so far.
    pub fn commands(&self) -> Vec<RecordedCommand> {
        lock(&self.commands).clone()
    }

    /// Prefixes that were registered successfully.
    pub fn registered(&self) -> Vec<Name> {
        lock(&self.commands)
            .iter()
            .filter(|c| c.status_code == STATUS_OK)
            .map(|c| c.params.name.clone())
            .collect()
    }
}

#[async_trait]
impl InterestHandler for MockDaemon {
    async fn on_interest(&self, interest: Interest) -> Option<Data> {
        let module = interest.name.get(2)?;
        if !module.is_generic_str("rib") || !interest.name.get(3)?.is_generic_str("register") {
            return None;
        }
        let params = ControlParameters::from_component(interest.name.get(4)?).ok()?;
        if self.silent {
            tracing::debug!(prefix = %params.name, "mock daemon ignored command");
            lock(&self.commands).push(RecordedCommand {
                interest,
                params,
                status_code: 0,
            });
            return None;
        }

        let status_code = lock(&self.script).pop_front().unwrap_or(STATUS_OK);
        let response = if status_code == STATUS_OK {
            ControlResponse::ok(params.clone())
        } else {
            ControlResponse::error(status_code, "Command rejected")
        };
        tracing::debug!(prefix = %params.name, status_code, "mock daemon answered");

        lock(&self.commands).push(RecordedCommand {
            interest: interest.clone(),
            params,
            status_code,
        });
        Some(Data::new(interest.name, Bytes::from(response.to_wire())).sign(&DigestSigner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndn_node_mgmt::registrar::{self, RegistrationPolicy};
    use ndn_node_mgmt::transport::memory;
    use ndn_node_mgmt::MgmtError;

    #[tokio::test]
    async fn test_script_then_accept() {
        let daemon = MockDaemon::scripted([403]);
        let (a, b) = memory::pair();
        let _server = daemon.attach(b);
        let client = Face::new(a);

        let first: Name = "/a".parse().unwrap();
        let err = registrar::register(&client, ControlParameters::new(first), &RegistrationPolicy::Local)
            .await
            .unwrap_err();
        assert!(matches!(err, MgmtError::RegistrationRejected { status_code: 403, .. }));

        let second: Name = "/b".parse().unwrap();
        registrar::register(&client, ControlParameters::new(second.clone()), &RegistrationPolicy::Local)
            .await
            .unwrap();

        assert_eq!(daemon.commands().len(), 2);
        assert_eq!(daemon.registered(), vec![second]);
        assert_eq!(daemon.commands()[0].scope(), "localhost");
    }
}
