use std::sync::Arc;

use oc_provision::{CloudApi, Provisioner};

#[derive(Clone)]
pub struct AppState {
    pub api: Arc<dyn CloudApi>,
    pub provisioner: Provisioner,
}
