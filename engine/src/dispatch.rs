//! Discovery dispatcher: one user action, at most one engine call.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::task::JoinHandle;

use disentangler_types::{
    CanonicalResult, DiscoveryRequest, FormInput, Output, Status, ValidationError,
    normalize_result,
};

use crate::gate::{GateOutcome, ReadinessGate};
use crate::runtime::EngineFault;
use crate::status::{OutputRegion, StatusSurface};

pub const DISENTANGLING_STATUS: &str = "Disentangling...";

/// The trigger control. Disabled while a discovery is in flight.
#[derive(Debug, Clone, Default)]
pub struct Trigger {
    busy: Arc<AtomicBool>,
}

impl Trigger {
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.busy.load(Ordering::Acquire)
    }

    /// `None` when a discovery already holds the trigger.
    #[must_use]
    pub fn try_acquire(&self) -> Option<TriggerGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| TriggerGuard {
                busy: Arc::clone(&self.busy),
            })
    }
}

/// Re-enables the trigger when dropped, on every path out of a dispatch.
#[must_use]
#[derive(Debug)]
pub struct TriggerGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for TriggerGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// How one dispatch ended.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// The gate settled as failed; the engine was not touched.
    InitializationFailed,
    Invalid(ValidationError),
    /// A structured answer, successful or not.
    Discovered(CanonicalResult),
    Fault(EngineFault),
}

impl DispatchOutcome {
    #[must_use]
    pub fn to_output(&self) -> Output {
        match self {
            DispatchOutcome::InitializationFailed => Output::InitializationFailed,
            DispatchOutcome::Invalid(err) => Output::Invalid(*err),
            DispatchOutcome::Discovered(result) => Output::Discovery(result.clone()),
            DispatchOutcome::Fault(fault) => Output::Fault(fault.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    gate: ReadinessGate,
    output: OutputRegion,
    trigger: Trigger,
    verbose: bool,
}

impl Dispatcher {
    #[must_use]
    pub fn new(gate: ReadinessGate, output: OutputRegion, verbose: bool) -> Self {
        Self {
            gate,
            output,
            trigger: Trigger::default(),
            verbose,
        }
    }

    #[must_use]
    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    /// Start a discovery for the form as it reads right now.
    ///
    /// Returns `None` without side effects while another discovery is in
    /// flight. The outcome is rendered into the output region before the
    /// trigger is released.
    pub fn submit(&self, form: FormInput) -> Option<JoinHandle<DispatchOutcome>> {
        let Some(guard) = self.trigger.try_acquire() else {
            tracing::debug!("Discovery already in flight; trigger ignored");
            return None;
        };

        self.output.show(Status::loading(DISENTANGLING_STATUS));
        let ready = self.gate.start();
        let output = self.output.clone();
        let verbose = self.verbose;

        Some(tokio::spawn(async move {
            let _guard = guard;
            let outcome = dispatch(ready, form, verbose).await;
            output.replace(outcome.to_output());
            outcome
        }))
    }
}

async fn dispatch(
    ready: impl Future<Output = GateOutcome>,
    form: FormInput,
    verbose: bool,
) -> DispatchOutcome {
    let handle = match ready.await {
        Ok(handle) => handle,
        Err(failure) => {
            tracing::warn!("Discovery refused, engine unavailable: {failure}");
            return DispatchOutcome::InitializationFailed;
        }
    };

    let request = match DiscoveryRequest::from_form(&form, verbose) {
        Ok(request) => request,
        Err(err) => return DispatchOutcome::Invalid(err),
    };

    tracing::info!(
        output = request.output(),
        inputs = ?request.inputs(),
        constants = ?request.constants(),
        auto_search = request.auto_search(),
        "Dispatching discovery"
    );

    let raw = match handle
        .call(move |engine| engine.discover_relationship(&request))
        .await
    {
        Ok(raw) => raw,
        Err(fault) => {
            tracing::error!("Engine call failed: {fault}");
            return DispatchOutcome::Fault(fault);
        }
    };

    match normalize_result(&raw) {
        Ok(result) => {
            tracing::info!(success = result.success, "Discovery finished");
            DispatchOutcome::Discovered(result)
        }
        Err(shape) => {
            tracing::error!("Engine answer could not be decoded: {shape}");
            DispatchOutcome::Fault(shape.into())
        }
    }
}
