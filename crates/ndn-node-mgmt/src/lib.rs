//! # NDN Node Management
//!
//! Everything a node needs to talk to its forwarding daemon.
//!
//! ## Overview
//!
//! - [`Face`]: a packet pipe over a [`Link`], with pending-Interest matching
//!   and producer dispatch
//! - [`transport`]: Unix-socket, secure-WebSocket and in-memory links, plus
//!   the [`Connector`] that opens a face for a [`TransportPolicy`]
//! - [`discovery`]: finds a WebSocket router through the NDN-FCH service
//! - [`registrar`]: `rib/register` commands with strict status-code handling
//! - [`producer`]: serves certificates on a face
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ndn_node_core::Name;
//! use ndn_node_mgmt::{registrar, Connector, DefaultConnector, RegistrationPolicy, TransportPolicy};
//!
//! async fn example() -> ndn_node_mgmt::Result<()> {
//!     let face = DefaultConnector::default().connect(&TransportPolicy::default()).await?;
//!     let prefixes: Vec<Name> = vec!["/ndn/workspace".parse().expect("valid name")];
//!     registrar::register_all(&face, &prefixes, &RegistrationPolicy::Local).await?;
//!     face.close().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Registration Flow
//!
//! ```text
//! Node                                   Daemon
//!   |-- Interest /localhost/nfd/rib/register/<params> (signed) -->|
//!   |<------------- Data ControlResponse {200, "OK"} -------------|
//! ```

pub mod discovery;
pub mod error;
pub mod face;
pub mod producer;
pub mod registrar;
pub mod transport;

pub use error::{MgmtError, Result};
pub use face::{Face, InterestHandler, ProducerHandle};
pub use producer::CertificateProducer;
pub use registrar::{
    ControlParameters, ControlResponse, RegistrationPolicy, RegistrationResult,
};
pub use transport::{Connector, DefaultConnector, Link, TransportPolicy};
