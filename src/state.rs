use std::sync::Arc;
use std::time::Instant;

use crate::config::Config;
use crate::service::ServiceApi;

#[derive(Clone)]
pub struct AppState {
    api: Arc<ServiceApi>,
    config: Arc<Config>,
    started_at: Instant,
}

impl AppState {
    pub fn new(api: ServiceApi, config: &Config) -> Self {
        Self {
            api: Arc::new(api),
            config: Arc::new(config.clone()),
            started_at: Instant::now(),
        }
    }

    pub fn api(&self) -> &ServiceApi {
        &self.api
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
