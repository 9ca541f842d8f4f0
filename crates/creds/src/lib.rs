// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hjk-creds: agent credential capture, validation, storage, and the
//! env/file recipes that materialize them inside a container.
//!
//! Credentials are never baked into images and never persist in a
//! container's filesystem across recreation: injection happens per
//! session, through environment variables plus a setup snippet that
//! writes the agent's expected config files at session start.

mod inject;
mod provider;
mod store;

pub use inject::{injection_for, Injection};
pub use provider::{provider_for, CaptureError, Provider};
pub use store::{CredError, Credential, CredentialKind, CredentialStore, FileSecretStore, KeyValueSecretStore};

#[cfg(any(test, feature = "test-support"))]
pub use store::MemorySecretStore;
