//! Engine readiness gate.
//!
//! Bootstrap runs once per process, in six ordered stages, on a spawned task.
//! Every caller of [`ReadinessGate::start`] observes the same settled
//! outcome; a failure is sticky and the stages are never retried.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::oneshot;

use disentangler_types::Status;

use crate::runtime::{ReadinessHandle, SandboxRuntime};
use crate::source::SourceFetcher;
use crate::status::StatusSurface;

pub const READY_STATUS: &str = "Environment ready. Please define a hypothesis.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BootstrapStage {
    StartRuntime,
    LoadPackages,
    FetchSource,
    InstallSource,
    Instantiate,
    Initialize,
}

impl BootstrapStage {
    pub const ALL: [BootstrapStage; 6] = [
        BootstrapStage::StartRuntime,
        BootstrapStage::LoadPackages,
        BootstrapStage::FetchSource,
        BootstrapStage::InstallSource,
        BootstrapStage::Instantiate,
        BootstrapStage::Initialize,
    ];

    /// 1-based position in the bootstrap sequence.
    #[must_use]
    pub const fn number(self) -> u8 {
        match self {
            BootstrapStage::StartRuntime => 1,
            BootstrapStage::LoadPackages => 2,
            BootstrapStage::FetchSource => 3,
            BootstrapStage::InstallSource => 4,
            BootstrapStage::Instantiate => 5,
            BootstrapStage::Initialize => 6,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            BootstrapStage::StartRuntime => "start runtime",
            BootstrapStage::LoadPackages => "load packages",
            BootstrapStage::FetchSource => "fetch engine source",
            BootstrapStage::InstallSource => "install engine source",
            BootstrapStage::Instantiate => "instantiate engine",
            BootstrapStage::Initialize => "initialize engine",
        }
    }

    /// Shown in the output region while the stage runs.
    #[must_use]
    pub const fn status_text(self) -> &'static str {
        match self {
            BootstrapStage::StartRuntime => "Initializing runtime environment...",
            BootstrapStage::LoadPackages => "Loading computation packages...",
            BootstrapStage::FetchSource => "Fetching engine source...",
            BootstrapStage::InstallSource => "Loading Physics Disentangler Engine...",
            BootstrapStage::Instantiate => "Creating engine instance...",
            BootstrapStage::Initialize => "Initializing engine...",
        }
    }
}

impl fmt::Display for BootstrapStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage {} ({})", self.number(), self.label())
    }
}

/// Sticky bootstrap failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{stage} failed: {cause}")]
pub struct BootstrapFailure {
    pub stage: BootstrapStage,
    pub cause: String,
}

impl BootstrapFailure {
    fn at<E: fmt::Display>(stage: BootstrapStage) -> impl FnOnce(E) -> Self {
        move |err| Self {
            stage,
            cause: format!("{err:#}"),
        }
    }
}

pub type GateOutcome = Result<ReadinessHandle, BootstrapFailure>;

/// Coarse gate state for the status bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStatus {
    Unstarted,
    Starting(BootstrapStage),
    Ready,
    Failed(BootstrapStage),
}

/// Collaborators for the six stages.
pub struct BootstrapPlan {
    pub runtime: Arc<dyn SandboxRuntime>,
    pub fetcher: Arc<dyn SourceFetcher>,
    pub packages: Vec<String>,
    pub class_name: String,
}

impl fmt::Debug for BootstrapPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapPlan")
            .field("runtime", &self.runtime.name())
            .field("packages", &self.packages)
            .field("class_name", &self.class_name)
            .finish_non_exhaustive()
    }
}

enum GateState {
    Unstarted(Box<BootstrapPlan>),
    Pending {
        stage: BootstrapStage,
        waiters: Vec<oneshot::Sender<GateOutcome>>,
    },
    Ready(ReadinessHandle),
    Failed(BootstrapFailure),
}

struct GateInner {
    state: Mutex<GateState>,
    status: Arc<dyn StatusSurface>,
}

/// Single-flight bootstrap coordinator. Cheap to clone.
#[derive(Clone)]
pub struct ReadinessGate {
    inner: Arc<GateInner>,
}

enum Next {
    Settled(GateOutcome),
    Wait(oneshot::Receiver<GateOutcome>),
}

impl ReadinessGate {
    #[must_use]
    pub fn new(plan: BootstrapPlan, status: Arc<dyn StatusSurface>) -> Self {
        Self {
            inner: Arc::new(GateInner {
                state: Mutex::new(GateState::Unstarted(Box::new(plan))),
                status,
            }),
        }
    }

    /// Begin bootstrap if nobody has yet, and resolve once it settles.
    ///
    /// The returned future does not borrow the gate. Must be called from
    /// within a tokio runtime.
    pub fn start(&self) -> impl Future<Output = GateOutcome> + Send + 'static {
        let mut plan = None;
        let next = {
            let mut state = self.lock();
            match &mut *state {
                GateState::Ready(handle) => Next::Settled(Ok(handle.clone())),
                GateState::Failed(failure) => Next::Settled(Err(failure.clone())),
                GateState::Pending { waiters, .. } => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    Next::Wait(rx)
                }
                GateState::Unstarted(_) => {
                    let (tx, rx) = oneshot::channel();
                    let pending = GateState::Pending {
                        stage: BootstrapStage::StartRuntime,
                        waiters: vec![tx],
                    };
                    if let GateState::Unstarted(taken) = std::mem::replace(&mut *state, pending)
                    {
                        plan = Some(taken);
                    }
                    Next::Wait(rx)
                }
            }
        };

        if let Some(plan) = plan {
            tracing::info!(plan = ?plan, "Starting engine bootstrap");
            tokio::spawn(self.clone().bootstrap(*plan));
        }

        let gate = self.clone();
        async move {
            match next {
                Next::Settled(outcome) => outcome,
                Next::Wait(rx) => match rx.await {
                    Ok(outcome) => outcome,
                    Err(_) => gate.abandoned(),
                },
            }
        }
    }

    #[must_use]
    pub fn status(&self) -> GateStatus {
        match &*self.lock() {
            GateState::Unstarted(_) => GateStatus::Unstarted,
            GateState::Pending { stage, .. } => GateStatus::Starting(*stage),
            GateState::Ready(_) => GateStatus::Ready,
            GateState::Failed(failure) => GateStatus::Failed(failure.stage),
        }
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    async fn bootstrap(self, plan: BootstrapPlan) {
        let mut guard = SettleGuard {
            gate: Some(self.clone()),
        };
        let outcome = self.run_stages(plan).await;
        guard.gate = None;
        self.settle(outcome);
    }

    async fn run_stages(&self, plan: BootstrapPlan) -> GateOutcome {
        let BootstrapPlan {
            runtime,
            fetcher,
            packages,
            class_name,
        } = plan;

        self.enter(BootstrapStage::StartRuntime);
        let mut sandbox = runtime
            .start()
            .await
            .map_err(BootstrapFailure::at(BootstrapStage::StartRuntime))?;

        self.enter(BootstrapStage::LoadPackages);
        sandbox
            .load_packages(&packages)
            .await
            .map_err(BootstrapFailure::at(BootstrapStage::LoadPackages))?;

        self.enter(BootstrapStage::FetchSource);
        let source = fetcher
            .fetch()
            .await
            .map_err(BootstrapFailure::at(BootstrapStage::FetchSource))?;

        self.enter(BootstrapStage::InstallSource);
        sandbox
            .install(&source)
            .await
            .map_err(BootstrapFailure::at(BootstrapStage::InstallSource))?;

        self.enter(BootstrapStage::Instantiate);
        let engine = sandbox
            .instantiate(&class_name)
            .await
            .map_err(BootstrapFailure::at(BootstrapStage::Instantiate))?;
        drop(sandbox);

        self.enter(BootstrapStage::Initialize);
        let handle = ReadinessHandle::new(engine);
        handle
            .call(|engine| engine.initialize())
            .await
            .map_err(BootstrapFailure::at(BootstrapStage::Initialize))?;

        Ok(handle)
    }

    fn enter(&self, stage: BootstrapStage) {
        tracing::info!(stage = stage.number(), "Bootstrap: {}", stage.label());
        if let GateState::Pending { stage: current, .. } = &mut *self.lock() {
            *current = stage;
        }
        self.inner.status.show(Status::loading(stage.status_text()));
    }

    fn current_stage(&self) -> BootstrapStage {
        match &*self.lock() {
            GateState::Pending { stage, .. } => *stage,
            GateState::Failed(failure) => failure.stage,
            GateState::Unstarted(_) | GateState::Ready(_) => BootstrapStage::StartRuntime,
        }
    }

    fn settle(&self, outcome: GateOutcome) {
        let terminal = match &outcome {
            Ok(handle) => GateState::Ready(handle.clone()),
            Err(failure) => GateState::Failed(failure.clone()),
        };
        let previous = std::mem::replace(&mut *self.lock(), terminal);

        match &outcome {
            Ok(_) => {
                tracing::info!("Engine ready");
                self.inner.status.show(Status::ready(READY_STATUS));
            }
            Err(failure) => {
                tracing::error!(stage = failure.stage.number(), "Bootstrap failed: {failure}");
                self.inner.status.show(Status::error(format!(
                    "CRITICAL ERROR during initialization: {failure}"
                )));
            }
        }

        if let GateState::Pending { waiters, .. } = previous {
            for waiter in waiters {
                // Receivers may have been dropped by callers that stopped waiting.
                let _ = waiter.send(outcome.clone());
            }
        }
    }

    /// A waiter's sender vanished without a value.
    fn abandoned(&self) -> GateOutcome {
        match &*self.lock() {
            GateState::Ready(handle) => return Ok(handle.clone()),
            GateState::Failed(failure) => return Err(failure.clone()),
            GateState::Unstarted(_) | GateState::Pending { .. } => {}
        }
        Err(BootstrapFailure {
            stage: self.current_stage(),
            cause: "bootstrap was abandoned".to_string(),
        })
    }
}

impl fmt::Debug for ReadinessGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadinessGate")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

/// Settles the gate as failed if the bootstrap task unwinds or is dropped
/// before it reaches a terminal state.
struct SettleGuard {
    gate: Option<ReadinessGate>,
}

impl Drop for SettleGuard {
    fn drop(&mut self) {
        if let Some(gate) = self.gate.take() {
            let stage = gate.current_stage();
            gate.settle(Err(BootstrapFailure {
                stage,
                cause: "bootstrap task ended unexpectedly".to_string(),
            }));
        }
    }
}
