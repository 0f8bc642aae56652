//! Fakes shared by the engine crate's unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, mpsc};

use anyhow::bail;
use serde_json::Value;

use disentangler_types::{DiscoveryRequest, RawValue, Status};

use crate::gate::{BootstrapPlan, BootstrapStage};
use crate::runtime::{Engine, EngineFault, RuntimeFut, Sandbox, SandboxRuntime};
use crate::source::{SourceError, SourceFetcher, SourceFut};
use crate::status::StatusSurface;

pub(crate) enum Discover {
    Answer(Value),
    Fault(String),
    Panic,
}

pub(crate) struct FakeEngine {
    discover: Discover,
    catalog: Value,
    catalog_faults: AtomicUsize,
    fail_initialize: bool,
    release: Option<Mutex<mpsc::Receiver<()>>>,
    initialize_calls: AtomicUsize,
    discover_calls: AtomicUsize,
    catalog_calls: AtomicUsize,
}

impl FakeEngine {
    fn with_discover(discover: Discover) -> Self {
        Self {
            discover,
            catalog: Value::Object(serde_json::Map::new()),
            catalog_faults: AtomicUsize::new(0),
            fail_initialize: false,
            release: None,
            initialize_calls: AtomicUsize::new(0),
            discover_calls: AtomicUsize::new(0),
            catalog_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn answering(answer: Value) -> Self {
        Self::with_discover(Discover::Answer(answer))
    }

    pub(crate) fn faulting(message: &str) -> Self {
        Self::with_discover(Discover::Fault(message.to_string()))
    }

    pub(crate) fn panicking() -> Self {
        Self::with_discover(Discover::Panic)
    }

    pub(crate) fn failing_initialize() -> Self {
        Self {
            fail_initialize: true,
            ..Self::with_discover(Discover::Fault("unused".to_string()))
        }
    }

    /// Discovery blocks until the returned sender sends or is dropped.
    pub(crate) fn blocking(answer: Value) -> (Self, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel();
        let engine = Self {
            release: Some(Mutex::new(rx)),
            ..Self::answering(answer)
        };
        (engine, tx)
    }

    pub(crate) fn with_catalog(mut self, catalog: Value) -> Self {
        self.catalog = catalog;
        self
    }

    /// The first `count` catalog calls raise.
    pub(crate) fn with_catalog_faults(self, count: usize) -> Self {
        self.catalog_faults.store(count, Ordering::SeqCst);
        self
    }

    pub(crate) fn initialize_calls(&self) -> usize {
        self.initialize_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn discover_calls(&self) -> usize {
        self.discover_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn catalog_calls(&self) -> usize {
        self.catalog_calls.load(Ordering::SeqCst)
    }
}

impl Engine for FakeEngine {
    fn initialize(&self) -> Result<(), EngineFault> {
        self.initialize_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_initialize {
            return Err(EngineFault::raised("initialize() raised"));
        }
        Ok(())
    }

    fn discover_relationship(&self, _request: &DiscoveryRequest) -> Result<RawValue, EngineFault> {
        self.discover_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(release) = &self.release {
            let _ = release
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .recv();
        }
        match &self.discover {
            Discover::Answer(answer) => Ok(RawValue::Plain(answer.clone())),
            Discover::Fault(message) => Err(EngineFault::raised(message.clone())),
            Discover::Panic => panic!("engine crashed"),
        }
    }

    fn quantities(&self) -> Result<RawValue, EngineFault> {
        self.catalog_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.catalog_faults.load(Ordering::SeqCst);
        if remaining > 0 {
            self.catalog_faults.store(remaining - 1, Ordering::SeqCst);
            return Err(EngineFault::raised("quantities unavailable"));
        }
        Ok(RawValue::Plain(self.catalog.clone()))
    }
}

/// Counts the bootstrap stages a fake plan went through.
#[derive(Default)]
pub(crate) struct Probe {
    starts: AtomicUsize,
    fetches: AtomicUsize,
    instantiations: AtomicUsize,
    panic_install: AtomicBool,
}

impl Probe {
    pub(crate) fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub(crate) fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub(crate) fn instantiations(&self) -> usize {
        self.instantiations.load(Ordering::SeqCst)
    }

    pub(crate) fn panic_on_install(&self) {
        self.panic_install.store(true, Ordering::SeqCst);
    }
}

struct FakeRuntime {
    fail_at: Option<BootstrapStage>,
    engine: Arc<FakeEngine>,
    probe: Arc<Probe>,
}

impl SandboxRuntime for FakeRuntime {
    fn name(&self) -> &str {
        "fake"
    }

    fn start(&self) -> RuntimeFut<'_, Box<dyn Sandbox>> {
        Box::pin(async move {
            self.probe.starts.fetch_add(1, Ordering::SeqCst);
            // Give concurrent awaiters a chance to pile up.
            tokio::task::yield_now().await;
            if self.fail_at == Some(BootstrapStage::StartRuntime) {
                bail!("runtime refused to start");
            }
            Ok(Box::new(FakeSandbox {
                fail_at: self.fail_at,
                engine: Arc::clone(&self.engine),
                probe: Arc::clone(&self.probe),
            }) as Box<dyn Sandbox>)
        })
    }
}

struct FakeSandbox {
    fail_at: Option<BootstrapStage>,
    engine: Arc<FakeEngine>,
    probe: Arc<Probe>,
}

impl Sandbox for FakeSandbox {
    fn load_packages<'a>(&'a mut self, _packages: &'a [String]) -> RuntimeFut<'a, ()> {
        Box::pin(async move {
            if self.fail_at == Some(BootstrapStage::LoadPackages) {
                bail!("package index unreachable");
            }
            Ok(())
        })
    }

    fn install<'a>(&'a mut self, _source: &'a str) -> RuntimeFut<'a, ()> {
        Box::pin(async move {
            if self.probe.panic_install.load(Ordering::SeqCst) {
                panic!("interpreter crashed");
            }
            if self.fail_at == Some(BootstrapStage::InstallSource) {
                bail!("SyntaxError: invalid syntax");
            }
            Ok(())
        })
    }

    fn instantiate<'a>(&'a mut self, class_name: &'a str) -> RuntimeFut<'a, Arc<dyn Engine>> {
        Box::pin(async move {
            self.probe.instantiations.fetch_add(1, Ordering::SeqCst);
            if self.fail_at == Some(BootstrapStage::Instantiate) {
                bail!("NameError: name '{class_name}' is not defined");
            }
            Ok(Arc::clone(&self.engine) as Arc<dyn Engine>)
        })
    }
}

struct FakeFetcher {
    fail: bool,
    probe: Arc<Probe>,
}

impl SourceFetcher for FakeFetcher {
    fn fetch(&self) -> SourceFut<'_> {
        Box::pin(async move {
            self.probe.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SourceError::Status {
                    url: "http://engine.test/law_discovery.py".to_string(),
                    status: 404,
                });
            }
            Ok("class EnhancedPhysicsDisentangler:\n".to_string())
        })
    }
}

/// A plan whose stages all succeed except `fail_at`. Initialization
/// failures come from the engine itself.
pub(crate) fn fake_plan(
    fail_at: Option<BootstrapStage>,
    engine: Arc<FakeEngine>,
) -> (BootstrapPlan, Arc<Probe>) {
    let probe = Arc::new(Probe::default());
    let plan = BootstrapPlan {
        runtime: Arc::new(FakeRuntime {
            fail_at,
            engine,
            probe: Arc::clone(&probe),
        }),
        fetcher: Arc::new(FakeFetcher {
            fail: fail_at == Some(BootstrapStage::FetchSource),
            probe: Arc::clone(&probe),
        }),
        packages: vec!["numpy".to_string(), "sympy".to_string()],
        class_name: "EnhancedPhysicsDisentangler".to_string(),
    };
    (plan, probe)
}

#[derive(Default)]
pub(crate) struct RecordingSurface {
    seen: Mutex<Vec<Status>>,
}

impl RecordingSurface {
    pub(crate) fn seen(&self) -> Vec<Status> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn last(&self) -> Option<Status> {
        self.seen().pop()
    }
}

impl StatusSurface for RecordingSurface {
    fn show(&self, status: Status) {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(status);
    }
}
