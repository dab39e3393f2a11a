//! # armkit
//!
//! Blocking HTTP transport for the Azure Resource Manager REST API.
//!
//! The crate implements [`reconcile::ManagementApi`] with ureq: it builds
//! `<endpoint><path>?api-version=<version>` URLs, sends JSON bodies with a
//! bearer token and reads back status, body and the long-running operation
//! headers (`Azure-AsyncOperation`, `Location`, `Retry-After`).
//!
//! ## Example
//!
//! ```no_run
//! use armkit::{ArmClient, ClientConfig};
//! use reconcile::Reconciler;
//!
//! let client = ArmClient::new(ClientConfig {
//!     token: std::env::var("AZURE_ACCESS_TOKEN").ok(),
//!     ..ClientConfig::default()
//! });
//! let reconciler = Reconciler::new(client);
//! ```

pub mod client;

pub use client::{ArmClient, ClientConfig, DEFAULT_ENDPOINT, transport_error};
