//! Built-in echo runtime.
//!
//! Hosts a stand-in engine that honours the three-entry-point contract but
//! does no physics: a discovery request is echoed back as its formula. It is
//! what the application runs against when no external engine source is
//! configured, and it is the fake the integration suite drives end to end.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::bail;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use disentangler_types::{DictProxy, DiscoveryRequest, RawValue};

use crate::runtime::{Engine, EngineFault, RuntimeFut, Sandbox, SandboxRuntime};

pub const DEFAULT_ENGINE_CLASS: &str = "EnhancedPhysicsDisentangler";

/// Packages the echo sandbox can load.
pub const AVAILABLE_PACKAGES: &[&str] = &["numpy", "sympy"];

/// Engine definition used for [`crate::SourceLocation::Builtin`].
pub const BUILTIN_ENGINE_SOURCE: &str = "\
# Built-in echo engine.
import numpy
import sympy

class EnhancedPhysicsDisentangler:
    \"\"\"Echoes discovery requests back without solving them.\"\"\"
";

pub const NOT_INITIALIZED_MESSAGE: &str =
    "FATAL ERROR: Engine not initialized. The initialize() method must be called first.";

pub const ECHO_MESSAGE: &str = "This is an echo test, confirming the bridge is working.";

pub const ECHO_WARNING: &str = "This is not a real physics result.";

/// Name, symbol, description.
const VOCABULARY: &[(&str, &str, &str)] = &[
    ("dimensionless", "D", "dimensionless"),
    ("length", "L", "Spatial dimension"),
    ("mass", "m", "Measure of matter"),
    ("time", "t", "Temporal dimension"),
    ("temperature", "T_temp", "Thermal energy scale"),
    ("charge", "q", "Electric charge"),
    ("amount", "n", "Amount of substance"),
    ("volume", "vol", "Volume of substance"),
    ("area", "area", "Area of substance"),
    ("velocity", "v", "Rate of position change"),
    ("acceleration", "a", "Rate of velocity change"),
    ("force", "F", "Interaction causing acceleration"),
    ("energy", "E", "Capacity to do work"),
    ("power", "P", "Rate of energy transfer"),
    ("pressure", "Pres", "Pressure"),
    ("density", "rho", "Density"),
    ("momentum", "p", "Mass times velocity"),
    ("angular_momentum", "L_ang", "Rotational momentum"),
    ("frequency", "f", "Oscillations per unit time"),
    ("wavelength", "λ", "Spatial period of wave"),
    ("wavenumber", "k", "Spatial frequency"),
    ("action", "S", "Energy-time integral"),
    ("entropy", "S_ent", "Measure of disorder"),
    ("electric_field", "E_field", "Force per unit charge"),
    ("magnetic_field", "B", "Magnetic flux density"),
    ("voltage", "V", "Electric potential difference"),
    ("current", "I", "Rate of charge flow"),
    ("resistance", "R_elec", "Opposition to current flow"),
    ("planck_constant", "h", "Quantum of action"),
    ("reduced_planck", "ℏ", "h/2π"),
    ("boltzmann_constant", "k_B", "Thermal energy scale"),
    ("speed_of_light", "c", "Universal speed limit"),
    ("gravitational_constant", "G", "Gravity coupling constant"),
    ("gas_constant", "R_gas", "Universal gas constant"),
    ("avogadro_number", "N_A", "Particles per mole"),
    ("elementary_charge", "e", "Fundamental charge unit"),
    ("vacuum_permittivity", "ε₀", "Electric constant"),
    ("vacuum_permeability", "μ₀", "Magnetic constant"),
    ("fine_structure", "α", "Electromagnetic coupling constant"),
    ("electron_mass", "m_e", "Mass of electron"),
    ("proton_mass", "m_p", "Mass of proton"),
];

/// Which raw shape the echo engine answers in.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResultShape {
    /// Mappings arrive as accessor objects.
    #[default]
    Accessor,
    /// Mappings arrive as plain structured values.
    Plain,
}

impl ResultShape {
    fn wrap(self, value: Value) -> RawValue {
        match self {
            Self::Accessor => DictProxy::wrap(value),
            Self::Plain => RawValue::Plain(value),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EchoRuntime {
    shape: ResultShape,
}

impl EchoRuntime {
    #[must_use]
    pub fn new(shape: ResultShape) -> Self {
        Self { shape }
    }
}

impl SandboxRuntime for EchoRuntime {
    fn name(&self) -> &str {
        "echo"
    }

    fn start(&self) -> RuntimeFut<'_, Box<dyn Sandbox>> {
        let shape = self.shape;
        Box::pin(async move {
            Ok(Box::new(EchoSandbox {
                shape,
                loaded: BTreeSet::new(),
                classes: Vec::new(),
            }) as Box<dyn Sandbox>)
        })
    }
}

/// Tracks loaded packages and the classes the installed source declares.
#[derive(Debug)]
struct EchoSandbox {
    shape: ResultShape,
    loaded: BTreeSet<String>,
    classes: Vec<String>,
}

impl EchoSandbox {
    fn install_source(&mut self, source: &str) -> anyhow::Result<()> {
        for line in source.lines().map(str::trim) {
            if let Some(module) = line.strip_prefix("import ") {
                let root = module
                    .split(['.', ',', ' '])
                    .next()
                    .unwrap_or_default();
                if AVAILABLE_PACKAGES.contains(&root) && !self.loaded.contains(root) {
                    bail!("ModuleNotFoundError: No module named '{root}'");
                }
            } else if let Some(rest) = line.strip_prefix("class ") {
                let name = rest.split([':', '(']).next().unwrap_or_default().trim();
                if !name.is_empty() {
                    self.classes.push(name.to_string());
                }
            }
        }
        if self.classes.is_empty() {
            bail!("engine source defines no class");
        }
        Ok(())
    }
}

impl Sandbox for EchoSandbox {
    fn load_packages<'a>(&'a mut self, packages: &'a [String]) -> RuntimeFut<'a, ()> {
        Box::pin(async move {
            for package in packages {
                if !AVAILABLE_PACKAGES.contains(&package.as_str()) {
                    bail!("No known package with name '{package}'");
                }
                self.loaded.insert(package.clone());
            }
            Ok(())
        })
    }

    fn install<'a>(&'a mut self, source: &'a str) -> RuntimeFut<'a, ()> {
        Box::pin(async move { self.install_source(source) })
    }

    fn instantiate<'a>(&'a mut self, class_name: &'a str) -> RuntimeFut<'a, Arc<dyn Engine>> {
        Box::pin(async move {
            if !self.classes.iter().any(|class| class == class_name) {
                bail!("NameError: name '{class_name}' is not defined");
            }
            Ok(Arc::new(EchoEngine::new(self.shape)) as Arc<dyn Engine>)
        })
    }
}

/// The stand-in engine.
#[derive(Debug, Default)]
pub struct EchoEngine {
    shape: ResultShape,
    initialized: AtomicBool,
}

impl EchoEngine {
    #[must_use]
    pub fn new(shape: ResultShape) -> Self {
        Self {
            shape,
            initialized: AtomicBool::new(false),
        }
    }

    fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    fn failure(&self, message: String) -> RawValue {
        self.shape
            .wrap(json!({"success": false, "message": message}))
    }
}

fn known(name: &str) -> bool {
    VOCABULARY.iter().any(|(known, _, _)| *known == name)
}

fn joined(names: &[String]) -> String {
    if names.is_empty() {
        "None".to_string()
    } else {
        names.join(", ")
    }
}

fn echo_formula(request: &DiscoveryRequest) -> String {
    let auto_search = if request.auto_search() { "True" } else { "False" };
    format!(
        "ECHO SUCCESS:\n  - Output: '{}'\n  - Inputs: [{}]\n  - Constants: [{}]\n  - Auto-Search: {auto_search}",
        request.output(),
        joined(request.inputs()),
        joined(request.constants()),
    )
}

impl Engine for EchoEngine {
    fn initialize(&self) -> Result<(), EngineFault> {
        self.initialized.store(true, Ordering::Release);
        tracing::info!(quantities = VOCABULARY.len(), "Echo engine initialized");
        Ok(())
    }

    fn discover_relationship(&self, request: &DiscoveryRequest) -> Result<RawValue, EngineFault> {
        if !self.is_initialized() {
            return Ok(self.failure(NOT_INITIALIZED_MESSAGE.to_string()));
        }

        let names = std::iter::once(request.output())
            .chain(request.inputs().iter().map(String::as_str))
            .chain(request.constants().iter().map(String::as_str));
        for name in names {
            if !known(name) {
                return Ok(self.failure(format!(
                    "Unknown quantity: '{name}'. Please check the list of available quantities."
                )));
            }
        }

        Ok(self.shape.wrap(json!({
            "success": true,
            "formula": echo_formula(request),
            "message": ECHO_MESSAGE,
            "validation": {
                "confidence_score": 1.0,
                "warnings": [ECHO_WARNING],
            },
        })))
    }

    fn quantities(&self) -> Result<RawValue, EngineFault> {
        let mut catalog = Map::new();
        if self.is_initialized() {
            for (name, symbol, description) in VOCABULARY {
                catalog.insert(
                    (*name).to_string(),
                    json!({"symbol": symbol, "description": description}),
                );
            }
        }
        Ok(self.shape.wrap(Value::Object(catalog)))
    }
}
