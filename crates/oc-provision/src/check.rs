//! Token validation and existing-server detection.
//!
//! Both ride on a single `list_servers` call: the listing succeeding proves
//! the token, and the result set is searched for the wizard's server name so
//! a re-entering caller can resume instead of paying for a duplicate.

use serde::Serialize;

use hetzner_api::{Server, ServerStatus};

use crate::{CloudApi, ProvisionError};

/// Result of a token/existing-server check. Serialized as-is to the caller.
#[derive(Debug, Serialize)]
pub struct TokenCheck {
    pub valid: bool,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ExistingServer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistingServer {
    pub server_id: i64,
    pub name: String,
    pub ip: String,
}

/// How a server listing relates to the wizard's configured name.
pub(crate) enum NameMatch<'a> {
    /// Name taken, server running with an assigned IP: resume into it.
    Ready(&'a Server, &'a str),
    /// Name taken but the server is not usable yet.
    Booting(&'a Server),
    Absent,
}

/// Exact, case-sensitive name match. A hit counts as ready only when the
/// server is running and has an IPv4, so callers never short-circuit into a
/// half-provisioned machine.
pub(crate) fn match_by_name<'a>(servers: &'a [Server], name: &str) -> NameMatch<'a> {
    match servers.iter().find(|s| s.name == name) {
        Some(server) => match (server.status, server.ipv4()) {
            (ServerStatus::Running, Some(ip)) => NameMatch::Ready(server, ip),
            _ => NameMatch::Booting(server),
        },
        None => NameMatch::Absent,
    }
}

/// Validate the token by listing servers, and report whether a ready server
/// with the given name already exists. Read-only; safe to call repeatedly.
pub async fn check_token(api: &dyn CloudApi, token: &str, server_name: &str) -> TokenCheck {
    let servers = match api.list_servers(token).await {
        Ok(servers) => servers,
        Err(e) => {
            return TokenCheck {
                valid: false,
                exists: false,
                server: None,
                error: Some(ProvisionError::from(e).to_string()),
            };
        }
    };

    match match_by_name(&servers, server_name) {
        NameMatch::Ready(server, ip) => TokenCheck {
            valid: true,
            exists: true,
            server: Some(ExistingServer {
                server_id: server.id,
                name: server.name.clone(),
                ip: ip.to_string(),
            }),
            error: None,
        },
        // A booting match is reported as not-yet-existing; the provision
        // flow will pick it up and wait for it instead.
        NameMatch::Booting(_) | NameMatch::Absent => TokenCheck {
            valid: true,
            exists: false,
            server: None,
            error: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{FakeCloud, server};
    use hetzner_api::ServerStatus;

    #[tokio::test]
    async fn rejected_token_reports_invalid() {
        let fake = FakeCloud::default();
        fake.state().auth_ok = false;

        let check = check_token(&fake, "bad", "x").await;
        assert!(!check.valid);
        assert!(!check.exists);
        assert_eq!(check.error.as_deref(), Some("Invalid API token"));
    }

    #[tokio::test]
    async fn running_server_with_ip_counts_as_existing() {
        let fake = FakeCloud::default();
        fake.state().servers = vec![server(
            42,
            "openclaw",
            ServerStatus::Running,
            Some("203.0.113.5"),
        )];

        let check = check_token(&fake, "tok", "openclaw").await;
        assert!(check.valid);
        assert!(check.exists);
        let existing = check.server.unwrap();
        assert_eq!(existing.server_id, 42);
        assert_eq!(existing.ip, "203.0.113.5");
    }

    #[tokio::test]
    async fn initializing_server_is_not_yet_existing() {
        let fake = FakeCloud::default();
        fake.state().servers = vec![server(42, "openclaw", ServerStatus::Initializing, None)];

        let check = check_token(&fake, "tok", "openclaw").await;
        assert!(check.valid);
        assert!(!check.exists);
        assert!(check.server.is_none());
    }

    #[tokio::test]
    async fn name_match_is_case_sensitive() {
        let fake = FakeCloud::default();
        fake.state().servers = vec![server(
            42,
            "OpenClaw",
            ServerStatus::Running,
            Some("203.0.113.5"),
        )];

        let check = check_token(&fake, "tok", "openclaw").await;
        assert!(check.valid);
        assert!(!check.exists);
    }
}
