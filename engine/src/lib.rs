//! Orchestration engine for Disentangler.
//!
//! This crate owns the readiness gate, the discovery dispatcher, the catalog
//! viewer and the form, without TUI dependencies. The terminal front end
//! drives an [`App`] and draws what it reports.

use std::sync::Arc;

use tokio::task::JoinHandle;

pub use disentangler_types::{
    CanonicalResult, FormField, FormInput, Output, Status, StatusLevel, UiOptions,
};

mod catalog;
mod config;
mod dispatch;
mod echo;
mod form;
mod gate;
mod runtime;
mod source;
mod status;
#[cfg(test)]
mod test_support;

pub use catalog::{CatalogView, CatalogViewer};
pub use config::{AppConfig, ConfigError, DisentanglerConfig, EngineConfig, config_path};
pub use dispatch::{DISENTANGLING_STATUS, DispatchOutcome, Dispatcher, Trigger, TriggerGuard};
pub use echo::{
    AVAILABLE_PACKAGES, BUILTIN_ENGINE_SOURCE, DEFAULT_ENGINE_CLASS, ECHO_MESSAGE, ECHO_WARNING,
    EchoEngine, EchoRuntime, NOT_INITIALIZED_MESSAGE, ResultShape,
};
pub use form::{DraftInput, Form};
pub use gate::{
    BootstrapFailure, BootstrapPlan, BootstrapStage, GateOutcome, GateStatus, READY_STATUS,
    ReadinessGate,
};
pub use runtime::{Engine, EngineFault, ReadinessHandle, RuntimeFut, Sandbox, SandboxRuntime};
pub use source::{
    CACHE_BUST_PARAM, SourceError, SourceFetcher, SourceFut, SourceLoader, SourceLocation,
};
pub use status::{OutputRegion, StatusSurface};

/// Application state owner. One per process.
pub struct App {
    form: Form,
    output: OutputRegion,
    gate: ReadinessGate,
    dispatcher: Dispatcher,
    catalog: CatalogViewer,
    ui_options: UiOptions,
    /// Shown in the status bar; set when the config file could not be used.
    notice: Option<String>,
    tick: usize,
    should_quit: bool,
}

impl App {
    /// Load `~/.disentangler/config.toml` and build the app from it. A broken
    /// config falls back to defaults and leaves a notice.
    #[must_use]
    pub fn new() -> Self {
        let (config, config_error) = match DisentanglerConfig::load() {
            Ok(config) => (config, None),
            Err(err) => (None, Some(err)),
        };

        let mut app = Self::from_config(config.as_ref());
        if let Some(err) = config_error {
            tracing::warn!("Using default configuration: {err}");
            app.notice = Some(format!("Config ignored: {err}"));
        }
        app
    }

    /// Build the app for a parsed config, or defaults when `None`. A source
    /// that cannot be parsed is reported by the gate at the fetch stage.
    #[must_use]
    pub fn from_config(config: Option<&DisentanglerConfig>) -> Self {
        let ui_options = config.map(DisentanglerConfig::ui_options).unwrap_or_default();
        let engine = config
            .map(DisentanglerConfig::engine_config)
            .unwrap_or_default();

        let location = match engine.source() {
            Some(raw) => SourceLocation::resolve(&raw),
            None => SourceLocation::Builtin,
        };
        tracing::info!(
            source = ?location,
            class_name = %engine.class_name,
            packages = ?engine.packages,
            "Engine configuration"
        );

        let plan = BootstrapPlan {
            runtime: Arc::new(EchoRuntime::new(engine.result_shape)),
            fetcher: Arc::new(SourceLoader::new(location, engine.cache_bust)),
            packages: engine.packages,
            class_name: engine.class_name,
        };
        Self::with_plan(plan, ui_options, engine.verbose)
    }

    /// Build the app around explicit bootstrap collaborators.
    #[must_use]
    pub fn with_plan(plan: BootstrapPlan, ui_options: UiOptions, verbose: bool) -> Self {
        let output = OutputRegion::new();
        let gate = ReadinessGate::new(plan, Arc::new(output.clone()));
        let dispatcher = Dispatcher::new(gate.clone(), output.clone(), verbose);
        let catalog = CatalogViewer::new(gate.clone());
        Self {
            form: Form::default(),
            output,
            gate,
            dispatcher,
            catalog,
            ui_options,
            notice: None,
            tick: 0,
            should_quit: false,
        }
    }

    /// Kick off bootstrap without waiting for it. Call once at startup from
    /// within the tokio runtime.
    pub fn boot(&self) {
        drop(self.gate.start());
    }

    /// Wait for bootstrap to settle, starting it if needed.
    pub async fn ready(&self) -> GateOutcome {
        self.gate.start().await
    }

    /// The trigger action: discover with the form as it reads now.
    ///
    /// `None` when a discovery is already running.
    pub fn submit(&self) -> Option<JoinHandle<DispatchOutcome>> {
        self.dispatcher.submit(self.form.snapshot())
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        !self.dispatcher.trigger().is_enabled()
    }

    #[must_use]
    pub fn output(&self) -> Output {
        self.output.snapshot()
    }

    #[must_use]
    pub fn output_revision(&self) -> u64 {
        self.output.revision()
    }

    #[must_use]
    pub fn gate_status(&self) -> GateStatus {
        self.gate.status()
    }

    #[must_use]
    pub fn form(&self) -> &Form {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut Form {
        &mut self.form
    }

    pub fn open_catalog(&self) -> Option<JoinHandle<()>> {
        self.catalog.open()
    }

    pub fn close_catalog(&self) {
        self.catalog.close();
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogViewer {
        &self.catalog
    }

    #[must_use]
    pub fn ui_options(&self) -> UiOptions {
        self.ui_options
    }

    #[must_use]
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn request_quit(&mut self) {
        self.should_quit = true;
    }

    /// Advance the animation tick.
    pub fn tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }

    #[must_use]
    pub fn tick_count(&self) -> usize {
        self.tick
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("gate", &self.gate)
            .field("busy", &self.is_busy())
            .field("catalog", &self.catalog)
            .finish_non_exhaustive()
    }
}
