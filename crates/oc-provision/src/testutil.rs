//! Scripted in-memory [`CloudApi`] for driving the flow in tests.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use hetzner_api::{
    ConsoleAccess, CreateServerRequest, CreatedServer, Error, Ipv4, PublicNet, Result, Server,
    ServerStatus, SshKey,
};

use crate::CloudApi;

pub const FAKE_IP: &str = "198.51.100.23";

pub fn server(id: i64, name: &str, status: ServerStatus, ip: Option<&str>) -> Server {
    Server {
        id,
        name: name.to_string(),
        status,
        public_net: PublicNet {
            ipv4: ip.map(|ip| Ipv4 { ip: ip.to_string() }),
        },
    }
}

#[derive(Default)]
pub struct FakeState {
    /// When false, every listing call is rejected as unauthorized.
    pub auth_ok: bool,
    pub servers: Vec<Server>,
    pub ssh_keys: Vec<SshKey>,
    /// Locations that reject creation with a capacity error.
    pub unavailable_locations: Vec<String>,
    /// Non-capacity rejection (quota etc.) returned for every create.
    pub create_rejection: Option<String>,
    /// Root password attached to create responses.
    pub root_password: Option<String>,
    /// Every create_ssh_key call conflicts.
    pub key_conflict: bool,
    /// Polled servers never reach running.
    pub never_boots: bool,
    /// The first N get_server calls fail at the transport level.
    pub fail_polls: u32,
    /// Polls needed before a server reports running with an IP.
    pub boot_after_polls: u32,
    pub create_calls: Vec<CreateServerRequest>,
    pub get_calls: u32,
}

pub struct FakeCloud {
    inner: Mutex<FakeState>,
}

impl Default for FakeCloud {
    fn default() -> Self {
        Self {
            inner: Mutex::new(FakeState {
                auth_ok: true,
                boot_after_polls: 1,
                ..FakeState::default()
            }),
        }
    }
}

impl FakeCloud {
    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.inner.lock().unwrap()
    }
}

#[async_trait]
impl CloudApi for FakeCloud {
    async fn list_servers(&self, _token: &str) -> Result<Vec<Server>> {
        let state = self.state();
        if !state.auth_ok {
            return Err(Error::Auth);
        }
        Ok(state.servers.clone())
    }

    async fn create_server(
        &self,
        _token: &str,
        req: &CreateServerRequest,
    ) -> Result<CreatedServer> {
        let mut state = self.state();
        state.create_calls.push(req.clone());

        if state
            .unavailable_locations
            .iter()
            .any(|l| l == &req.location)
        {
            return Err(Error::LocationUnavailable {
                message: format!("location {} is unavailable", req.location),
            });
        }
        if let Some(message) = &state.create_rejection {
            return Err(Error::Api {
                endpoint: "create server",
                status: 422,
                message: message.clone(),
            });
        }

        let id = 1000 + state.create_calls.len() as i64;
        let created = server(id, &req.name, ServerStatus::Initializing, None);
        state.servers.push(created.clone());
        Ok(CreatedServer {
            server: created,
            root_password: state.root_password.clone(),
        })
    }

    async fn get_server(&self, _token: &str, id: i64) -> Result<Server> {
        let mut state = self.state();
        state.get_calls += 1;

        if state.get_calls <= state.fail_polls {
            return Err(Error::Transport("connection reset by peer".into()));
        }

        let stored = state
            .servers
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or(Error::Api {
                endpoint: "get server",
                status: 404,
                message: "server not found".into(),
            })?;

        if !state.never_boots && state.get_calls >= state.boot_after_polls {
            return Ok(server(
                stored.id,
                &stored.name,
                ServerStatus::Running,
                Some(FAKE_IP),
            ));
        }
        Ok(stored)
    }

    async fn create_ssh_key(&self, _token: &str, name: &str, public_key: &str) -> Result<SshKey> {
        let mut state = self.state();
        if state.key_conflict {
            return Err(Error::KeyExists);
        }

        let key = SshKey {
            id: 500 + state.ssh_keys.len() as i64,
            name: name.to_string(),
            public_key: public_key.to_string(),
        };
        state.ssh_keys.push(key.clone());
        Ok(key)
    }

    async fn list_ssh_keys(&self, _token: &str) -> Result<Vec<SshKey>> {
        Ok(self.state().ssh_keys.clone())
    }

    async fn request_console(&self, _token: &str, id: i64) -> Result<ConsoleAccess> {
        Ok(ConsoleAccess {
            wss_url: format!("wss://console.hetzner.cloud/?server={id}"),
            password: "one-time-pw".into(),
        })
    }
}
