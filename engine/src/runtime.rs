//! The seam to the sandboxed runtime and the engine object inside it.
//!
//! Bootstrap drives a [`SandboxRuntime`] through its stages and ends up with
//! an [`Engine`]. Everything after bootstrap talks to the engine through a
//! [`ReadinessHandle`], which is passed explicitly rather than kept in a
//! global.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;

use disentangler_types::{DiscoveryRequest, RawValue, UnrecognizedShape};

/// Future returned by runtime and sandbox stages.
pub type RuntimeFut<'a, T> = Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send + 'a>>;

/// An exception crossing the engine-call boundary.
///
/// Distinct from a structured `success: false` answer, which is a normal
/// result and never a fault.
#[derive(Debug, Clone, Error)]
pub enum EngineFault {
    #[error("{0}")]
    Raised(String),
    #[error("engine call panicked: {0}")]
    Panicked(String),
    #[error("engine returned an unrecognized result: {0}")]
    Unrecognized(#[from] UnrecognizedShape),
}

impl EngineFault {
    pub fn raised(message: impl Into<String>) -> Self {
        Self::Raised(message.into())
    }
}

/// Starts isolated execution environments.
pub trait SandboxRuntime: Send + Sync {
    fn name(&self) -> &str;

    fn start(&self) -> RuntimeFut<'_, Box<dyn Sandbox>>;
}

/// A started runtime that can host the engine definition.
///
/// Engines returned by [`Sandbox::instantiate`] must own whatever runtime
/// state they need; the sandbox is dropped once bootstrap finishes.
pub trait Sandbox: Send {
    fn load_packages<'a>(&'a mut self, packages: &'a [String]) -> RuntimeFut<'a, ()>;

    fn install<'a>(&'a mut self, source: &'a str) -> RuntimeFut<'a, ()>;

    fn instantiate<'a>(&'a mut self, class_name: &'a str) -> RuntimeFut<'a, Arc<dyn Engine>>;
}

/// The three entry points of the discovery engine.
///
/// Calls are synchronous from the caller's point of view and may block, so
/// they only ever run on the blocking pool (see [`ReadinessHandle::call`]).
pub trait Engine: Send + Sync {
    fn initialize(&self) -> Result<(), EngineFault>;

    fn discover_relationship(&self, request: &DiscoveryRequest) -> Result<RawValue, EngineFault>;

    /// Static vocabulary snapshot: quantity name to metadata.
    fn quantities(&self) -> Result<RawValue, EngineFault>;
}

/// Shared reference to the engine produced by a successful bootstrap.
#[derive(Clone)]
pub struct ReadinessHandle {
    engine: Arc<dyn Engine>,
}

impl ReadinessHandle {
    pub(crate) fn new(engine: Arc<dyn Engine>) -> Self {
        Self { engine }
    }

    /// Run one engine call on the blocking pool. A panic inside the engine
    /// comes back as [`EngineFault::Panicked`].
    pub async fn call<T, F>(&self, call: F) -> Result<T, EngineFault>
    where
        F: FnOnce(&dyn Engine) -> Result<T, EngineFault> + Send + 'static,
        T: Send + 'static,
    {
        let engine = Arc::clone(&self.engine);
        match tokio::task::spawn_blocking(move || call(engine.as_ref())).await {
            Ok(result) => result,
            Err(err) if err.is_panic() => Err(EngineFault::Panicked(panic_message(
                err.into_panic().as_ref(),
            ))),
            Err(err) => Err(EngineFault::Panicked(err.to_string())),
        }
    }
}

impl fmt::Debug for ReadinessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadinessHandle").finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
