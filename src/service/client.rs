//! Construction of the shared service client.

use chrono::{DateTime, Utc};

use super::config::ServiceConfig;

/// Name the backend SDK gives the default app instance.
pub const DEFAULT_APP_NAME: &str = "[DEFAULT]";

/// Builds a client from connection settings.
///
/// Called at most once per successful bootstrap; a failed call may be
/// retried by a later bootstrap attempt.
pub trait ServiceConnector: Send + Sync {
    type Client: Send + Sync + 'static;

    fn connect(&self, config: &ServiceConfig) -> anyhow::Result<Self::Client>;
}

/// A registered app instance holding its options.
#[derive(Debug, Clone)]
pub struct ServiceApp {
    name: String,
    options: ServiceConfig,
    initialized_at: DateTime<Utc>,
}

impl ServiceApp {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &ServiceConfig {
        &self.options
    }

    pub fn project_id(&self) -> &str {
        &self.options.project_id
    }

    pub fn initialized_at(&self) -> DateTime<Utc> {
        self.initialized_at
    }
}

/// Registers the app in-process; the backend SDK takes over from there.
#[derive(Debug, Clone)]
pub struct LocalConnector {
    app_name: String,
}

impl LocalConnector {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }
}

impl Default for LocalConnector {
    fn default() -> Self {
        Self::new(DEFAULT_APP_NAME)
    }
}

impl ServiceConnector for LocalConnector {
    type Client = ServiceApp;

    fn connect(&self, config: &ServiceConfig) -> anyhow::Result<ServiceApp> {
        Ok(ServiceApp {
            name: self.app_name.clone(),
            options: config.clone(),
            initialized_at: Utc::now(),
        })
    }
}
