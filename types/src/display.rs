//! Renderer: canonical results, statuses and catalogs to a display tree.
//!
//! The tree is framework-neutral. Each block carries an [`Emphasis`] that the
//! terminal layer maps onto its palette.

use crate::request::ValidationError;
use crate::result::{CanonicalResult, CanonicalValidation, QuantityCatalog};

/// Confidence strictly above this percentage gets positive emphasis.
pub const CONFIDENCE_EMPHASIS_THRESHOLD: f64 = 80.0;

pub const NO_WARNINGS_NOTICE: &str = "No obvious physical inconsistencies detected.";

pub const INITIALIZATION_FAILED: &str = "Initialization failed. Please restart the application.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Emphasis {
    #[default]
    Neutral,
    Muted,
    Info,
    Positive,
    Warning,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { text: String, emphasis: Emphasis },
    Subheading(String),
    Paragraph { text: String, emphasis: Emphasis },
    /// Line breaks are significant.
    Preformatted { text: String, emphasis: Emphasis },
    Metric {
        label: String,
        value: String,
        emphasis: Emphasis,
    },
    Bullets(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DisplayTree {
    blocks: Vec<Block>,
}

impl DisplayTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    #[must_use]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Flattened text, one entry per visible line.
    #[must_use]
    pub fn plain_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for block in &self.blocks {
            match block {
                Block::Heading { text, .. }
                | Block::Subheading(text)
                | Block::Paragraph { text, .. } => lines.push(text.clone()),
                Block::Preformatted { text, .. } => {
                    lines.extend(text.lines().map(ToString::to_string));
                }
                Block::Metric { label, value, .. } => lines.push(format!("{label}: {value}")),
                Block::Bullets(items) => lines.extend(items.iter().map(|item| format!("- {item}"))),
            }
        }
        lines
    }

    fn heading(&mut self, text: &str, emphasis: Emphasis) {
        self.push(Block::Heading {
            text: clean(text),
            emphasis,
        });
    }

    fn paragraph(&mut self, text: &str, emphasis: Emphasis) {
        self.push(Block::Paragraph {
            text: clean(text),
            emphasis,
        });
    }

    fn preformatted(&mut self, text: &str, emphasis: Emphasis) {
        self.push(Block::Preformatted {
            text: clean(text),
            emphasis,
        });
    }
}

/// Drop control characters other than newline and tab. Engine text is
/// untrusted and must not smuggle terminal escape sequences.
fn clean(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t'))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Loading,
    Ready,
    Error,
}

/// Short human-visible status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub level: StatusLevel,
    pub text: String,
}

impl Status {
    pub fn loading(text: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Loading,
            text: text.into(),
        }
    }

    pub fn ready(text: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Ready,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Error,
            text: text.into(),
        }
    }
}

/// Contents of the output region. Every outcome, including errors, goes here.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Status(Status),
    Discovery(CanonicalResult),
    Invalid(ValidationError),
    /// The engine call itself raised.
    Fault(String),
    InitializationFailed,
}

impl Default for Output {
    fn default() -> Self {
        Self::Status(Status::loading("Waiting for the engine..."))
    }
}

#[must_use]
pub fn confidence_percent(score: f64) -> u32 {
    (score.clamp(0.0, 1.0) * 100.0).round() as u32
}

/// Compared on the unrounded percentage; rounding is for the label only.
#[must_use]
pub fn confidence_emphasis(score: f64) -> Emphasis {
    let percent = score.clamp(0.0, 1.0) * 100.0;
    if percent > CONFIDENCE_EMPHASIS_THRESHOLD {
        Emphasis::Positive
    } else {
        Emphasis::Warning
    }
}

#[must_use]
pub fn render_result(result: &CanonicalResult) -> DisplayTree {
    let mut tree = DisplayTree::new();

    if !result.success {
        tree.heading("Discovery Failed", Emphasis::Negative);
        tree.preformatted(result.message.as_deref().unwrap_or_default(), Emphasis::Negative);
        return tree;
    }

    tree.heading("Discovery Successful", Emphasis::Positive);
    if let Some(message) = result.message.as_deref().filter(|m| !m.trim().is_empty()) {
        tree.paragraph(message, Emphasis::Info);
    }
    tree.preformatted(result.formula.as_deref().unwrap_or_default(), Emphasis::Neutral);

    if let Some(validation) = &result.validation {
        render_validation(&mut tree, validation);
    }
    tree
}

fn render_validation(tree: &mut DisplayTree, validation: &CanonicalValidation) {
    let percent = confidence_percent(validation.confidence_score);
    tree.push(Block::Subheading("Validation Report".to_string()));
    tree.push(Block::Metric {
        label: "Confidence Score".to_string(),
        value: format!("{percent}%"),
        emphasis: confidence_emphasis(validation.confidence_score),
    });
    if validation.warnings.is_empty() {
        tree.paragraph(NO_WARNINGS_NOTICE, Emphasis::Muted);
    } else {
        tree.paragraph("Warnings:", Emphasis::Warning);
        tree.push(Block::Bullets(
            validation.warnings.iter().map(|w| clean(w)).collect(),
        ));
    }
}

#[must_use]
pub fn render_output(output: &Output) -> DisplayTree {
    match output {
        Output::Discovery(result) => render_result(result),
        Output::Status(status) => {
            let emphasis = match status.level {
                StatusLevel::Loading => Emphasis::Info,
                StatusLevel::Ready => Emphasis::Positive,
                StatusLevel::Error => Emphasis::Negative,
            };
            let mut tree = DisplayTree::new();
            tree.paragraph(&status.text, emphasis);
            tree
        }
        Output::Invalid(err) => {
            let mut tree = DisplayTree::new();
            tree.paragraph(&err.to_string(), Emphasis::Negative);
            tree
        }
        Output::Fault(detail) => {
            let mut tree = DisplayTree::new();
            tree.paragraph("An error occurred during discovery:", Emphasis::Negative);
            tree.preformatted(detail, Emphasis::Negative);
            tree
        }
        Output::InitializationFailed => {
            let mut tree = DisplayTree::new();
            tree.paragraph(INITIALIZATION_FAILED, Emphasis::Negative);
            tree
        }
    }
}

/// Sorted, unfiltered quantity names, computed once per catalog.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CatalogListing {
    names: Vec<String>,
}

impl CatalogListing {
    #[must_use]
    pub fn new(catalog: &QuantityCatalog) -> Self {
        let mut names: Vec<String> = catalog.keys().cloned().collect();
        names.sort();
        Self { names }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Names containing `query`, case-insensitively, in lexicographic order.
    #[must_use]
    pub fn filter(&self, query: &str) -> Vec<&str> {
        let needle = query.to_lowercase();
        self.names
            .iter()
            .filter(|name| needle.is_empty() || name.to_lowercase().contains(&needle))
            .map(String::as_str)
            .collect()
    }
}

/// The catalog as one bulleted block.
#[must_use]
pub fn render_catalog(listing: &CatalogListing, query: &str) -> DisplayTree {
    let mut tree = DisplayTree::new();
    tree.push(Block::Bullets(
        listing.filter(query).into_iter().map(clean).collect(),
    ));
    tree
}
