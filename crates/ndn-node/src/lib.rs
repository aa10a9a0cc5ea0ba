//! # NDN Node
//!
//! Runs a node session in an NDN trust domain: bootstraps the node's
//! identity, opens a face to the forwarding daemon, registers prefixes,
//! hosts a workload, and tears everything down in reverse order.
//!
//! ## Overview
//!
//! - **Bootstrap**: decode the trust anchor and key bundle, unwrap the key,
//!   issue a per-session node certificate in delegated mode, build the
//!   [`TrustStore`](keychain::TrustStore)
//! - **Connect**: open a Unix-socket or WebSocket face through a
//!   [`Connector`](mgmt::Connector)
//! - **Register**: `rib/register` every configured prefix; any rejection
//!   aborts the session
//! - **Run**: hand a [`WorkloadContext`] to the [`Workload`] until it
//!   returns, the shutdown signal fires, or the session times out
//! - **Drain**: release the [`ResourceStack`] exactly once
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ndn_node::{Credentials, IdleWorkload, SessionConfig, Supervisor};
//! use ndn_node::mgmt::DefaultConnector;
//!
//! async fn example(anchor_b64: String, bundle_b64: String) {
//!     let config = SessionConfig::new(anchor_b64, Credentials::new(bundle_b64, "123456"))
//!         .with_node_id(2);
//!     let supervisor = Supervisor::new(config, Arc::new(DefaultConnector::default()));
//!
//!     let shutdown = async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     };
//!     let outcome = supervisor.run(Arc::new(IdleWorkload), shutdown).await;
//!     println!("session {outcome}");
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `ndn_node::core` - Names, packets, certificates, codec
//! - `ndn_node::keychain` - Key bundles, issuer, trust store
//! - `ndn_node::store` - Session storage
//! - `ndn_node::mgmt` - Faces, transports, registration

pub mod config;
pub mod error;
pub mod resources;
pub mod supervisor;
pub mod workload;

// Re-export component crates
pub use ndn_node_core as core;
pub use ndn_node_keychain as keychain;
pub use ndn_node_mgmt as mgmt;
pub use ndn_node_store as store;

// Re-export main types for convenience
pub use config::{Credentials, IdentityMode, NodeArgs, SessionConfig, SessionPolicy};
pub use error::{Result, SessionError};
pub use resources::{Deferred, Resource, ResourceStack};
pub use supervisor::{bootstrap, Bootstrap, SessionOutcome, SessionState, Supervisor};
pub use workload::{IdleWorkload, Workload, WorkloadContext};
