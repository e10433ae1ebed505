use serde::{Deserialize, Serialize};

use oc_provision::{
    DEFAULT_LOCATION, DEFAULT_SERVER_NAME, DEFAULT_SERVER_TYPE, ProvisionRequest,
};

// ── Requests ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
    pub token: String,
    #[serde(default = "default_server_name")]
    pub server_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionRequestBody {
    pub token: String,
    #[serde(default)]
    pub ssh_public_key: Option<String>,
    #[serde(default = "default_server_name")]
    pub server_name: String,
    #[serde(default = "default_location")]
    pub location: String,
    #[serde(default = "default_server_type")]
    pub server_type: String,
}

impl From<ProvisionRequestBody> for ProvisionRequest {
    fn from(body: ProvisionRequestBody) -> Self {
        Self {
            token: body.token,
            ssh_public_key: body.ssh_public_key,
            server_name: body.server_name,
            location: body.location,
            server_type: body.server_type,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleRequest {
    pub token: String,
    pub server_id: i64,
}

// ── Responses ──────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleResponse {
    pub wss_url: String,
    pub password: String,
}

fn default_server_name() -> String {
    DEFAULT_SERVER_NAME.into()
}

fn default_location() -> String {
    DEFAULT_LOCATION.into()
}

fn default_server_type() -> String {
    DEFAULT_SERVER_TYPE.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provision_body_fills_defaults() {
        let body: ProvisionRequestBody = serde_json::from_str(r#"{"token": "t"}"#).unwrap();
        assert_eq!(body.server_name, "openclaw");
        assert_eq!(body.location, "fsn1");
        assert_eq!(body.server_type, "cax11");
        assert!(body.ssh_public_key.is_none());
    }

    #[test]
    fn provision_body_accepts_camel_case_overrides() {
        let body: ProvisionRequestBody = serde_json::from_str(
            r#"{"token": "t", "sshPublicKey": "ssh-ed25519 AAAA me@here",
                "serverName": "claw2", "location": "hel1", "serverType": "cx22"}"#,
        )
        .unwrap();
        assert_eq!(body.ssh_public_key.as_deref(), Some("ssh-ed25519 AAAA me@here"));
        assert_eq!(body.server_name, "claw2");
        assert_eq!(body.location, "hel1");
        assert_eq!(body.server_type, "cx22");
    }
}
