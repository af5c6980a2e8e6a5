//! The effect-execution service.
//!
//! [`TokioEffectService`] is the sole place effects touch real
//! resources. It never holds application state: everything it needs is
//! in the effect description and the [`Dispatch`] handle it feeds
//! results back through.
//!
//! All registries (abort map, compute pools, target functions,
//! running subscriptions) are fields of the service instance, not
//! process-wide state. Multiple services coexist, and dropping a
//! service aborts everything it spawned.
//!
//! # Concurrency
//!
//! HTTP requests and compute units run genuinely in parallel; pool
//! sizes are bounded per target. Resulting messages re-enter the
//! engine's FIFO queue, so completion order never affects state
//! correctness.

mod aborts;
mod compute;
mod http;
mod subs;

pub(crate) use aborts::AbortRegistry;
pub(crate) use compute::TargetPool;

use clockwork_effect::{Dispatch, Effect, EffectRunner};
use clockwork_types::{ErrorCode, SubscriptionKey};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

/// Default maximum compute units per target.
pub const DEFAULT_MAX_UNITS_PER_TARGET: usize = 4;

/// Default frame interval (~60 fps).
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// A registered compute function: pure input → output, run on a pooled
/// unit off the async runtime.
pub(crate) type ComputeFn = dyn Fn(Value) -> Result<Value, String> + Send + Sync;

/// Service construction errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Constructed outside a tokio runtime.
    #[error("effect service must be created inside a tokio runtime")]
    NoRuntime,
}

impl ErrorCode for ServiceError {
    fn code(&self) -> &'static str {
        match self {
            Self::NoRuntime => "SERVICE_NO_RUNTIME",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// Configuration for [`TokioEffectService`].
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    /// Maximum compute units per target; `None` for the default.
    pub max_units_per_target: Option<usize>,
    /// Frame-clock interval; `None` for the default (~60 fps).
    pub frame_interval: Option<Duration>,
    /// HTTP client to use; `None` builds a fresh one.
    pub http_client: Option<reqwest::Client>,
}

pub(crate) struct ServiceInner {
    pub(crate) http: reqwest::Client,
    pub(crate) aborts: AbortRegistry,
    pub(crate) pools: Mutex<HashMap<String, TargetPool>>,
    pub(crate) targets: Mutex<HashMap<String, Arc<ComputeFn>>>,
    pub(crate) subs: Mutex<HashMap<SubscriptionKey, JoinHandle<()>>>,
    pub(crate) max_units_per_target: usize,
    pub(crate) frame_interval: Duration,
    pub(crate) frame_epoch: Instant,
    pub(crate) handle: Handle,
}

impl Drop for ServiceInner {
    fn drop(&mut self) {
        // Deterministic teardown: everything this service spawned dies
        // with it.
        for task in self.subs.lock().values() {
            task.abort();
        }
        for pool in self.pools.lock().values() {
            pool.abort_units();
        }
    }
}

/// Tokio-backed interpreter for the closed effect vocabulary.
///
/// # Example
///
/// ```no_run
/// use clockwork_runtime::{ServiceConfig, TokioEffectService};
/// use serde_json::json;
///
/// # fn main() -> Result<(), clockwork_runtime::ServiceError> {
/// # let rt = tokio::runtime::Runtime::new().unwrap();
/// # let _guard = rt.enter();
/// let service = TokioEffectService::new()?;
/// service.register_target("hash", |payload| {
///     Ok(json!(format!("{payload:?}").len()))
/// });
/// # Ok(())
/// # }
/// ```
pub struct TokioEffectService {
    pub(crate) inner: Arc<ServiceInner>,
}

impl Clone for TokioEffectService {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl TokioEffectService {
    /// Creates a service with default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NoRuntime`] outside a tokio runtime.
    pub fn new() -> Result<Self, ServiceError> {
        Self::with_config(ServiceConfig::default())
    }

    /// Creates a service with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NoRuntime`] outside a tokio runtime.
    pub fn with_config(config: ServiceConfig) -> Result<Self, ServiceError> {
        let handle = Handle::try_current().map_err(|_| ServiceError::NoRuntime)?;
        Ok(Self {
            inner: Arc::new(ServiceInner {
                http: config.http_client.unwrap_or_default(),
                aborts: AbortRegistry::new(),
                pools: Mutex::new(HashMap::new()),
                targets: Mutex::new(HashMap::new()),
                subs: Mutex::new(HashMap::new()),
                max_units_per_target: config
                    .max_units_per_target
                    .unwrap_or(DEFAULT_MAX_UNITS_PER_TARGET),
                frame_interval: config.frame_interval.unwrap_or(DEFAULT_FRAME_INTERVAL),
                frame_epoch: Instant::now(),
                handle,
            }),
        })
    }

    /// Registers the compute function for a target name.
    ///
    /// Replaces any previous registration under the same name. Units
    /// already running keep the function they were created with.
    pub fn register_target(
        &self,
        name: impl Into<String>,
        func: impl Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    ) {
        let name = name.into();
        debug!(target = %name, "compute target registered");
        self.inner.targets.lock().insert(name, Arc::new(func));
    }

    /// Milliseconds elapsed on the service's frame clock.
    pub(crate) fn frame_now_ms(inner: &ServiceInner) -> u64 {
        u64::try_from(inner.frame_epoch.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

impl<M: Send + 'static> EffectRunner<M> for TokioEffectService {
    fn run(&self, effect: Effect<M>, dispatch: Dispatch<M>) {
        match effect {
            Effect::Http(effect) => http::run(self.inner.clone(), effect, dispatch),
            Effect::Cancel { key } => {
                // Idempotent: cancelling an unregistered key is a no-op.
                let cancelled = self.inner.aborts.cancel(&key);
                debug!(key = %key, cancelled, "explicit cancel");
            }
            Effect::Delay(effect) => {
                let handle = self.inner.handle.clone();
                handle.spawn(async move {
                    tokio::time::sleep(effect.after).await;
                    dispatch.send((effect.on_elapsed)());
                });
            }
            Effect::Frame(effect) => {
                let inner = self.inner.clone();
                let handle = inner.handle.clone();
                handle.spawn(async move {
                    let interval_ms = inner.frame_interval.as_millis().max(1) as u64;
                    let elapsed_ms = Self::frame_now_ms(&inner);
                    let next_ms = (elapsed_ms / interval_ms + 1) * interval_ms;
                    tokio::time::sleep(Duration::from_millis(next_ms - elapsed_ms)).await;
                    dispatch.send((effect.on_frame)(Self::frame_now_ms(&inner)));
                });
            }
            Effect::Compute(effect) => compute::submit(self.inner.clone(), effect, dispatch),
        }
    }
}
