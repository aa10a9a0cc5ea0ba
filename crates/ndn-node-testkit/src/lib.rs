//! # NDN Node Testkit
//!
//! Testing utilities for NDN node sessions.
//!
//! ## Contents
//!
//! - **Fixtures** ([`fixtures`]): a throwaway trust domain with anchors,
//!   issued identities and sealed key bundles in base64
//! - **Mock daemon** ([`daemon`]): answers `rib/register` commands with
//!   scripted status codes and records them
//! - **Mock connector** ([`connector`]): hands out faces wired to the mock
//!   daemon over in-memory links, or refuses to connect

pub mod connector;
pub mod daemon;
pub mod fixtures;

pub use connector::MockConnector;
pub use daemon::{MockDaemon, RecordedCommand};
pub use fixtures::{TrustDomain, PASSPHRASE};
