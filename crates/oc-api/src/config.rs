use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use oc_provision::ProvisionSettings;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub hetzner_api_base: String,
    pub bootstrap_script_url: String,
    pub server_image: String,
    pub boot_poll_interval_secs: u64,
    pub boot_poll_attempts: u32,
    pub bootstrap_wait_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            listen_addr: env::var("LISTEN_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:8080".into())
                .parse()
                .expect("LISTEN_ADDR must be a valid socket address"),
            hetzner_api_base: env::var("HETZNER_API_BASE")
                .unwrap_or_else(|_| hetzner_api::DEFAULT_BASE_URL.into()),
            bootstrap_script_url: env::var("BOOTSTRAP_SCRIPT_URL")
                .unwrap_or_else(|_| "https://openclaw.ai/install.sh".into()),
            server_image: env::var("SERVER_IMAGE").unwrap_or_else(|_| "ubuntu-24.04".into()),
            boot_poll_interval_secs: env::var("BOOT_POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| "3".into())
                .parse()
                .expect("BOOT_POLL_INTERVAL_SECS must be a valid u64"),
            boot_poll_attempts: env::var("BOOT_POLL_ATTEMPTS")
                .unwrap_or_else(|_| "60".into())
                .parse()
                .expect("BOOT_POLL_ATTEMPTS must be a valid u32"),
            bootstrap_wait_secs: env::var("BOOTSTRAP_WAIT_SECS")
                .unwrap_or_else(|_| "90".into())
                .parse()
                .expect("BOOTSTRAP_WAIT_SECS must be a valid u64"),
        }
    }

    pub fn provision_settings(&self) -> ProvisionSettings {
        ProvisionSettings {
            image: self.server_image.clone(),
            bootstrap_script_url: self.bootstrap_script_url.clone(),
            boot_poll_interval: Duration::from_secs(self.boot_poll_interval_secs),
            boot_poll_attempts: self.boot_poll_attempts,
            bootstrap_wait: Duration::from_secs(self.bootstrap_wait_secs),
        }
    }
}
