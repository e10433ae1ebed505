//! Progress events and their wire encoding.
//!
//! The wizard front-end consumes one JSON record per line. Compact encoding
//! guarantees no interior newlines, so the receiver can buffer and split on
//! `\n` no matter how the transport chunks the bytes.

use serde::Serialize;
use serde_json::json;

/// Sentinel token value for an existing server. The real gateway token was
/// generated on that machine during its original install and cannot be
/// recovered from here; handing out a fresh random value instead would look
/// like a working secret.
pub const TOKEN_ON_SERVER: &str = "stored on the server in ~/.openclaw/openclaw.json";

/// Terminal success payload, camelCase on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionedServer {
    pub ip: String,
    pub name: String,
    /// For a new server: a locally generated placeholder, not the token the
    /// install script creates on the machine. For an existing server:
    /// [`TOKEN_ON_SERVER`].
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_password: Option<String>,
    pub is_existing: bool,
    pub server_id: i64,
}

/// One record on the provisioning stream. At most one terminal event per
/// stream, and a terminal event always ends it.
#[derive(Debug, Clone)]
pub enum ProvisionEvent {
    Progress(String),
    Error(String),
    Done(ProvisionedServer),
}

impl ProvisionEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Error(_) | Self::Done(_))
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Progress(msg) => json!({ "progress": msg }),
            Self::Error(msg) => json!({ "error": msg }),
            Self::Done(server) => json!({ "done": true, "server": server }),
        }
    }

    /// Encode as a single self-delimited line.
    pub fn encode_line(&self) -> String {
        let mut line = self.to_json().to_string();
        line.push('\n');
        line
    }
}
