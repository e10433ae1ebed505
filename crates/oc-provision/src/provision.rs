//! The provisioning state machine.
//!
//! One attempt walks a strictly sequential set of steps; each step is a
//! variant of [`Step`] with its own handler, and the driver loop matches
//! exhaustively so every transition is explicit and testable. Hetzner bills
//! per server, so the existing-server check runs before any mutating call.

use std::sync::Arc;
use std::time::Duration;

use rand::RngCore;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{info, warn};

use hetzner_api::{CreateServerRequest, Server, ServerStatus};

use crate::check::{NameMatch, match_by_name};
use crate::events::{ProvisionEvent, ProvisionedServer, TOKEN_ON_SERVER};
use crate::sshkey::resolve_ssh_key;
use crate::{CloudApi, ProvisionError};

/// Datacenter fallback order. Individual locations run out of capacity for a
/// server type independent of account state, so creation walks this list
/// starting from the caller's preferred location.
pub const LOCATION_FALLBACK: [&str; 6] = ["fsn1", "nbg1", "hel1", "ash", "hil", "sin"];

pub const DEFAULT_SERVER_NAME: &str = "openclaw";
pub const DEFAULT_LOCATION: &str = "fsn1";
pub const DEFAULT_SERVER_TYPE: &str = "cax11";

/// Caller input for one attempt. Immutable once submitted.
#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    pub token: String,
    pub ssh_public_key: Option<String>,
    /// Idempotency key for the whole flow: a resume attempt only finds the
    /// earlier server if this name is unchanged between visits. Callers
    /// must keep it stable or a second server will be created.
    pub server_name: String,
    pub location: String,
    pub server_type: String,
}

/// Startup configuration for the flow, injected at construction.
#[derive(Debug, Clone)]
pub struct ProvisionSettings {
    pub image: String,
    pub bootstrap_script_url: String,
    pub boot_poll_interval: Duration,
    pub boot_poll_attempts: u32,
    /// How long to wait for the install script after the server reports
    /// running. A fixed delay: the machine has no channel back to us, so
    /// there is nothing to verify against.
    pub bootstrap_wait: Duration,
}

impl Default for ProvisionSettings {
    fn default() -> Self {
        Self {
            image: "ubuntu-24.04".into(),
            bootstrap_script_url: "https://openclaw.ai/install.sh".into(),
            boot_poll_interval: Duration::from_secs(3),
            boot_poll_attempts: 60,
            bootstrap_wait: Duration::from_secs(90),
        }
    }
}

/// Preferred location first, then the rest of [`LOCATION_FALLBACK`] in
/// order. A preferred location outside the list is simply tried first.
pub fn location_order(preferred: &str) -> Vec<&str> {
    let mut order = Vec::with_capacity(LOCATION_FALLBACK.len() + 1);
    order.push(preferred);
    for location in LOCATION_FALLBACK {
        if location != preferred {
            order.push(location);
        }
    }
    order
}

/// Placeholder gateway token for a brand-new server: 32 random bytes,
/// hex-encoded. The real token is generated by the install script on the
/// machine itself; this one only fills the success payload until the caller
/// retrieves that.
pub fn generate_gateway_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Whether a booting server was created by this attempt or found already
/// under the wizard's name. An existing server skips the bootstrap wait:
/// its original attempt owns the install delay.
enum Origin {
    New { root_password: Option<String> },
    Existing,
}

enum Step {
    ValidatingToken,
    CheckingExisting { servers: Vec<Server> },
    ResolvingKey,
    Creating { ssh_key_id: Option<i64> },
    AwaitingBoot { server_id: i64, origin: Origin },
    AwaitingBootstrap {
        server_id: i64,
        name: String,
        ip: String,
        root_password: Option<String>,
    },
}

enum Flow {
    Next(Step),
    Done(ProvisionedServer),
}

/// Runs one provisioning attempt end to end. Holds no per-request state;
/// concurrent attempts share nothing but the provider account itself.
#[derive(Clone)]
pub struct Provisioner {
    api: Arc<dyn CloudApi>,
    settings: ProvisionSettings,
}

impl Provisioner {
    pub fn new(api: Arc<dyn CloudApi>, settings: ProvisionSettings) -> Self {
        Self { api, settings }
    }

    /// Run one attempt, narrating progress on `tx` and ending the stream
    /// with exactly one terminal event. Never panics the transport: every
    /// failure becomes the terminal record.
    pub async fn run(&self, req: ProvisionRequest, tx: mpsc::Sender<ProvisionEvent>) {
        let terminal = match self.drive(&req, &tx).await {
            Ok(server) => ProvisionEvent::Done(server),
            Err(e) => ProvisionEvent::Error(e.to_string()),
        };
        // A send failure means the caller disconnected; the attempt has
        // already run its bounded course either way.
        let _ = tx.send(terminal).await;
    }

    async fn drive(
        &self,
        req: &ProvisionRequest,
        tx: &mpsc::Sender<ProvisionEvent>,
    ) -> Result<ProvisionedServer, ProvisionError> {
        let mut step = Step::ValidatingToken;
        loop {
            let flow = match step {
                Step::ValidatingToken => self.validate_token(req, tx).await?,
                Step::CheckingExisting { servers } => {
                    self.check_existing(servers, req, tx).await?
                }
                Step::ResolvingKey => self.resolve_key(req, tx).await?,
                Step::Creating { ssh_key_id } => self.create(ssh_key_id, req, tx).await?,
                Step::AwaitingBoot { server_id, origin } => {
                    self.await_boot(server_id, origin, req, tx).await?
                }
                Step::AwaitingBootstrap {
                    server_id,
                    name,
                    ip,
                    root_password,
                } => {
                    self.await_bootstrap(server_id, name, ip, root_password, tx)
                        .await?
                }
            };
            match flow {
                Flow::Next(next) => step = next,
                Flow::Done(server) => return Ok(server),
            }
        }
    }

    async fn validate_token(
        &self,
        req: &ProvisionRequest,
        tx: &mpsc::Sender<ProvisionEvent>,
    ) -> Result<Flow, ProvisionError> {
        self.progress(tx, "Validating API token...").await;
        let servers = self.api.list_servers(&req.token).await?;
        Ok(Flow::Next(Step::CheckingExisting { servers }))
    }

    async fn check_existing(
        &self,
        servers: Vec<Server>,
        req: &ProvisionRequest,
        tx: &mpsc::Sender<ProvisionEvent>,
    ) -> Result<Flow, ProvisionError> {
        self.progress(
            tx,
            format!("Checking for an existing server named \"{}\"...", req.server_name),
        )
        .await;

        match match_by_name(&servers, &req.server_name) {
            NameMatch::Ready(server, ip) => {
                info!(server_id = server.id, "resuming into existing server");
                self.progress(tx, format!("Found your server at {ip} — nothing to create."))
                    .await;
                Ok(Flow::Done(ProvisionedServer {
                    ip: ip.to_string(),
                    name: server.name.clone(),
                    token: TOKEN_ON_SERVER.to_string(),
                    root_password: None,
                    is_existing: true,
                    server_id: server.id,
                }))
            }
            NameMatch::Booting(server) => {
                self.progress(
                    tx,
                    "Found a server from an earlier attempt that is still starting up...",
                )
                .await;
                Ok(Flow::Next(Step::AwaitingBoot {
                    server_id: server.id,
                    origin: Origin::Existing,
                }))
            }
            NameMatch::Absent => Ok(Flow::Next(Step::ResolvingKey)),
        }
    }

    async fn resolve_key(
        &self,
        req: &ProvisionRequest,
        tx: &mpsc::Sender<ProvisionEvent>,
    ) -> Result<Flow, ProvisionError> {
        let ssh_key_id = match req.ssh_public_key.as_deref() {
            Some(key) if key.trim_start().starts_with("ssh-") => {
                self.progress(tx, "Setting up your SSH key...").await;
                let resolved = resolve_ssh_key(self.api.as_ref(), &req.token, key).await;
                if resolved.is_none() {
                    self.progress(
                        tx,
                        "Could not register the SSH key; continuing with a root password instead.",
                    )
                    .await;
                }
                resolved
            }
            _ => None,
        };
        Ok(Flow::Next(Step::Creating { ssh_key_id }))
    }

    async fn create(
        &self,
        ssh_key_id: Option<i64>,
        req: &ProvisionRequest,
        tx: &mpsc::Sender<ProvisionEvent>,
    ) -> Result<Flow, ProvisionError> {
        let mut last_message = String::new();
        let order = location_order(&req.location);
        let last = order.len() - 1;

        for (attempt, &location) in order.iter().enumerate() {
            self.progress(
                tx,
                format!(
                    "Creating server \"{}\" ({}) in {location}...",
                    req.server_name, req.server_type
                ),
            )
            .await;

            let create = CreateServerRequest {
                name: req.server_name.clone(),
                server_type: req.server_type.clone(),
                image: self.settings.image.clone(),
                location: location.to_string(),
                user_data: Some(self.user_data()),
                ssh_keys: ssh_key_id.map(|id| vec![id]),
                start_after_create: true,
            };

            match self.api.create_server(&req.token, &create).await {
                Ok(created) => {
                    info!(server_id = created.server.id, location, "server created");
                    return Ok(Flow::Next(Step::AwaitingBoot {
                        server_id: created.server.id,
                        origin: Origin::New {
                            root_password: created.root_password,
                        },
                    }));
                }
                Err(hetzner_api::Error::LocationUnavailable { message }) => {
                    warn!(location, "location unavailable");
                    // Only promise another attempt when one is actually coming.
                    let narration = if attempt < last {
                        format!("{location} has no capacity right now, trying the next location...")
                    } else {
                        format!("{location} has no capacity right now either.")
                    };
                    self.progress(tx, narration).await;
                    last_message = message;
                }
                Err(hetzner_api::Error::Auth) => return Err(ProvisionError::Auth),
                Err(hetzner_api::Error::Api { message, .. }) => {
                    return Err(ProvisionError::Create(message));
                }
                Err(other) => return Err(ProvisionError::Transient(other.to_string())),
            }
        }

        Err(ProvisionError::Create(format!(
            "no location has capacity for {} right now ({last_message})",
            req.server_type
        )))
    }

    async fn await_boot(
        &self,
        server_id: i64,
        origin: Origin,
        req: &ProvisionRequest,
        tx: &mpsc::Sender<ProvisionEvent>,
    ) -> Result<Flow, ProvisionError> {
        self.progress(tx, "Waiting for the server to come online...")
            .await;

        for _ in 0..self.settings.boot_poll_attempts {
            sleep(self.settings.boot_poll_interval).await;

            match self.api.get_server(&req.token, server_id).await {
                Ok(server) => {
                    if server.status == ServerStatus::Running {
                        if let Some(ip) = server.ipv4() {
                            let ip = ip.to_string();
                            return Ok(self.boot_complete(&server, &ip, origin, tx).await);
                        }
                    }
                }
                // Transient poll failures do not abort the wait; the
                // attempt budget is the only exit.
                Err(e) => warn!(server_id, error = %e, "status poll failed, retrying"),
            }
        }

        let ceiling =
            self.settings.boot_poll_interval.as_secs() * u64::from(self.settings.boot_poll_attempts);
        Err(ProvisionError::Timeout(format!(
            "server did not come online within {ceiling}s — it may still be provisioning; \
             check it in the Hetzner console"
        )))
    }

    async fn boot_complete(
        &self,
        server: &Server,
        ip: &str,
        origin: Origin,
        tx: &mpsc::Sender<ProvisionEvent>,
    ) -> Flow {
        match origin {
            Origin::Existing => {
                self.progress(tx, format!("Server is online at {ip}.")).await;
                Flow::Done(ProvisionedServer {
                    ip: ip.to_string(),
                    name: server.name.clone(),
                    token: TOKEN_ON_SERVER.to_string(),
                    root_password: None,
                    is_existing: true,
                    server_id: server.id,
                })
            }
            Origin::New { root_password } => Flow::Next(Step::AwaitingBootstrap {
                server_id: server.id,
                name: server.name.clone(),
                ip: ip.to_string(),
                root_password,
            }),
        }
    }

    async fn await_bootstrap(
        &self,
        server_id: i64,
        name: String,
        ip: String,
        root_password: Option<String>,
        tx: &mpsc::Sender<ProvisionEvent>,
    ) -> Result<Flow, ProvisionError> {
        self.progress(
            tx,
            format!("Server is online at {ip}. Installing OpenClaw — this takes a few minutes..."),
        )
        .await;

        // No completion signal exists: the machine cannot reach back to us.
        // The delay is calibrated to the install script, nothing more.
        sleep(self.settings.bootstrap_wait).await;

        self.progress(
            tx,
            "The install should be wrapping up. The token below is a placeholder — the real one \
             is generated on the server; fetch it once you log in.",
        )
        .await;

        Ok(Flow::Done(ProvisionedServer {
            ip,
            name,
            token: generate_gateway_token(),
            root_password,
            is_existing: false,
            server_id,
        }))
    }

    /// cloud-init document that fetches and runs the install script on
    /// first boot.
    fn user_data(&self) -> String {
        format!(
            "#cloud-config\npackages:\n  - curl\nruncmd:\n  - curl -fsSL {} | bash\n",
            self.settings.bootstrap_script_url
        )
    }

    async fn progress(&self, tx: &mpsc::Sender<ProvisionEvent>, msg: impl Into<String>) {
        let _ = tx.send(ProvisionEvent::Progress(msg.into())).await;
    }
}
