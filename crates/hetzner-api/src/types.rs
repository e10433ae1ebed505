use serde::{Deserialize, Serialize};

/// Server lifecycle status as reported by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Running,
    Initializing,
    Starting,
    Stopping,
    Off,
    Deleting,
    Migrating,
    Rebuilding,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub id: i64,
    pub name: String,
    pub status: ServerStatus,
    #[serde(default)]
    pub public_net: PublicNet,
}

impl Server {
    /// Public IPv4 address, once the provider has assigned one.
    pub fn ipv4(&self) -> Option<&str> {
        self.public_net.ipv4.as_ref().map(|net| net.ip.as_str())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublicNet {
    pub ipv4: Option<Ipv4>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ipv4 {
    pub ip: String,
}

#[derive(Debug, Deserialize)]
pub struct ListServersResponse {
    pub servers: Vec<Server>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateServerRequest {
    pub name: String,
    pub server_type: String,
    pub image: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_keys: Option<Vec<i64>>,
    pub start_after_create: bool,
}

/// A freshly created server plus the one-time root password the API hands
/// back when the request carried no SSH key.
#[derive(Debug, Deserialize)]
pub struct CreatedServer {
    pub server: Server,
    pub root_password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GetServerResponse {
    pub server: Server,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SshKey {
    pub id: i64,
    pub name: String,
    pub public_key: String,
}

#[derive(Debug, Serialize)]
pub struct CreateSshKeyRequest {
    pub name: String,
    pub public_key: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateSshKeyResponse {
    pub ssh_key: SshKey,
}

#[derive(Debug, Deserialize)]
pub struct ListSshKeysResponse {
    pub ssh_keys: Vec<SshKey>,
}

/// VNC console session for a server. Fallback access path when the caller
/// supplied no SSH key.
#[derive(Debug, Clone, Deserialize)]
pub struct ConsoleAccess {
    pub wss_url: String,
    pub password: String,
}

/// Error envelope the API wraps every rejection in.
#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}
