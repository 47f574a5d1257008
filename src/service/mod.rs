//! Idempotent bootstrap of the shared external-service client.
//!
//! Several entry points may ask for the client to be initialized, from any
//! thread. [`ServiceBootstrapper::ensure_initialized`] runs the whole
//! check-then-construct sequence under one mutex, so exactly one construction
//! succeeds per process. The published client lives in a `OnceLock` and is
//! never replaced, so reads after initialization need no lock.
//!
//! A failed attempt publishes nothing; the next call tries again.

mod client;
mod config;

pub use client::{LocalConnector, ServiceApp, ServiceConnector, DEFAULT_APP_NAME};
pub use config::{
    default_config_path, load_service_config, read_config_file, ConfigError, ConfigSource,
    ResolvedConfig, ServiceConfig, API_KEY_ENV, APP_ID_ENV, PROJECT_ID_ENV, SENDER_ID_ENV,
    SERVICE_CONFIG_ENV, STORAGE_BUCKET_ENV,
};

#[cfg(test)]
pub(crate) use config::sample_config;

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use anyhow::anyhow;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::crash::describe_payload;
use crate::tags;

/// Client construction failed; the caller continues without the service.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("service initialization failed: {source:#}")]
    InitializationFailed {
        #[source]
        source: anyhow::Error,
    },
}

impl BootstrapError {
    /// Human-readable cause, including the whole error chain.
    pub fn cause(&self) -> String {
        match self {
            BootstrapError::InitializationFailed { source } => format!("{:#}", source),
        }
    }
}

/// Successful result of [`ServiceBootstrapper::ensure_initialized`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// This call constructed the client
    Initialized,
    /// Another call had already constructed it
    AlreadyInitialized,
}

/// Process-wide handle for one external-service client.
pub struct ServiceBootstrapper<C: ServiceConnector> {
    connector: C,
    init_lock: Mutex<()>,
    client: OnceLock<Arc<C::Client>>,
    attempts: AtomicUsize,
}

impl<C: ServiceConnector> ServiceBootstrapper<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            init_lock: Mutex::new(()),
            client: OnceLock::new(),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Initialize the client unless some earlier call already did.
    ///
    /// Blocks while another caller is mid-construction. Failures (invalid
    /// config, connector error, connector panic) are logged and returned;
    /// they are not remembered, so a later call retries.
    pub fn ensure_initialized(
        &self,
        config: &ServiceConfig,
    ) -> Result<InitOutcome, BootstrapError> {
        // The lock protects no data of its own, so a poisoned guard is still usable
        let _guard = self
            .init_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if self.client.get().is_some() {
            debug!(target: tags::SERVICE, "Service client already initialized");
            return Ok(InitOutcome::AlreadyInitialized);
        }

        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(target: tags::SERVICE, attempt, "Initializing service client");

        match self.construct(config) {
            Ok(client) => {
                // Only ever set here, under the lock, after the emptiness check
                let _ = self.client.set(Arc::new(client));
                info!(
                    target: tags::SERVICE,
                    project_id = %config.project_id,
                    attempt,
                    "✅ Service client initialized"
                );
                Ok(InitOutcome::Initialized)
            }
            Err(source) => {
                let err = BootstrapError::InitializationFailed { source };
                error!(
                    target: tags::SERVICE,
                    attempt,
                    cause = %err.cause(),
                    "❌ Service initialization failed; continuing without it"
                );
                Err(err)
            }
        }
    }

    fn construct(&self, config: &ServiceConfig) -> anyhow::Result<C::Client> {
        config.validate()?;
        match panic::catch_unwind(AssertUnwindSafe(|| self.connector.connect(config))) {
            Ok(result) => result,
            Err(payload) => {
                let (_, message) = describe_payload(payload.as_ref());
                Err(anyhow!("service connector panicked: {}", message))
            }
        }
    }

    /// Whether a client has been published.
    pub fn is_initialized(&self) -> bool {
        self.client.get().is_some()
    }

    /// The published client, if initialization has succeeded.
    pub fn client(&self) -> Option<Arc<C::Client>> {
        self.client.get().cloned()
    }

    /// Number of construction attempts made so far, successful or not.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl<C: ServiceConnector> std::fmt::Debug for ServiceBootstrapper<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceBootstrapper")
            .field("initialized", &self.is_initialized())
            .field("attempts", &self.attempts())
            .finish()
    }
}
