//! Core provisioning flow for the OpenClaw setup wizard.
//!
//! Drives the ordered sequence of Hetzner calls that takes a caller-supplied
//! API token to a booted server running the OpenClaw install script, and
//! narrates each step as a progress event stream.

pub mod check;
pub mod events;
pub mod provision;
pub mod sshkey;

#[cfg(test)]
mod testutil;

use async_trait::async_trait;
use hetzner_api::{
    ConsoleAccess, CreateServerRequest, CreatedServer, HetznerClient, Server, SshKey,
};

pub use check::{TokenCheck, check_token};
pub use events::{ProvisionEvent, ProvisionedServer, TOKEN_ON_SERVER};
pub use provision::{
    DEFAULT_LOCATION, DEFAULT_SERVER_NAME, DEFAULT_SERVER_TYPE, ProvisionRequest,
    ProvisionSettings, Provisioner,
};
pub use sshkey::resolve_ssh_key;

/// Failures surfaced to the caller as the terminal event of an attempt.
///
/// Location-unavailable and key-conflict rejections never appear here: the
/// former is consumed by the location fallback loop, the latter by the key
/// resolver.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("Invalid API token")]
    Auth,

    /// Quota, validation, or every fallback location exhausted. Carries the
    /// provider's message verbatim where one was available.
    #[error("server creation failed: {0}")]
    Create(String),

    /// A bounded polling loop ran out of attempts. The server may still
    /// come up on its own, so the message points at manual verification
    /// instead of declaring the attempt dead.
    #[error("{0}")]
    Timeout(String),

    #[error("unexpected error: {0}")]
    Transient(String),
}

impl From<hetzner_api::Error> for ProvisionError {
    fn from(e: hetzner_api::Error) -> Self {
        match e {
            hetzner_api::Error::Auth => Self::Auth,
            other => Self::Transient(other.to_string()),
        }
    }
}

/// Cloud provider operations the setup flow depends on.
///
/// One real implementation ([`HetznerClient`]); tests drive the flow with a
/// scripted fake. The token is a parameter on every call because each
/// request acts on behalf of a different end user.
#[async_trait]
pub trait CloudApi: Send + Sync + 'static {
    async fn list_servers(&self, token: &str) -> hetzner_api::Result<Vec<Server>>;

    async fn create_server(
        &self,
        token: &str,
        req: &CreateServerRequest,
    ) -> hetzner_api::Result<CreatedServer>;

    async fn get_server(&self, token: &str, id: i64) -> hetzner_api::Result<Server>;

    async fn create_ssh_key(
        &self,
        token: &str,
        name: &str,
        public_key: &str,
    ) -> hetzner_api::Result<SshKey>;

    async fn list_ssh_keys(&self, token: &str) -> hetzner_api::Result<Vec<SshKey>>;

    async fn request_console(&self, token: &str, id: i64) -> hetzner_api::Result<ConsoleAccess>;
}

#[async_trait]
impl CloudApi for HetznerClient {
    async fn list_servers(&self, token: &str) -> hetzner_api::Result<Vec<Server>> {
        HetznerClient::list_servers(self, token).await
    }

    async fn create_server(
        &self,
        token: &str,
        req: &CreateServerRequest,
    ) -> hetzner_api::Result<CreatedServer> {
        HetznerClient::create_server(self, token, req).await
    }

    async fn get_server(&self, token: &str, id: i64) -> hetzner_api::Result<Server> {
        HetznerClient::get_server(self, token, id).await
    }

    async fn create_ssh_key(
        &self,
        token: &str,
        name: &str,
        public_key: &str,
    ) -> hetzner_api::Result<SshKey> {
        HetznerClient::create_ssh_key(self, token, name, public_key).await
    }

    async fn list_ssh_keys(&self, token: &str) -> hetzner_api::Result<Vec<SshKey>> {
        HetznerClient::list_ssh_keys(self, token).await
    }

    async fn request_console(&self, token: &str, id: i64) -> hetzner_api::Result<ConsoleAccess> {
        HetznerClient::request_console(self, token, id).await
    }
}
