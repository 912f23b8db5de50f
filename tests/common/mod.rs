//! Common test infrastructure
//!
//! This module provides all the infrastructure needed for end-to-end tests.
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::{TestServer, TestClient, ALICE};
//!
//! #[tokio::test]
//! async fn test_register() {
//!     let server = TestServer::spawn().await;
//!     let mut client = TestClient::connect(&server.ws_url()).await;
//!
//!     let ack = client.register(ALICE).await;
//!     assert_eq!(ack["payload"]["userId"], ALICE);
//! }
//! ```

mod client;
mod constants;
mod server;

// Public API - this is what tests import
#[allow(unused_imports)]
pub use client::TestClient;
pub use constants::*;
pub use server::TestServer;
