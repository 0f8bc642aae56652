//! Catalog viewer: the engine's quantity vocabulary in a filterable modal.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;

use disentangler_types::{CatalogListing, DisplayTree, decode_catalog, render_catalog};

use crate::gate::ReadinessGate;
use crate::runtime::EngineFault;

enum Listing {
    Unloaded,
    Loading,
    Loaded(Arc<CatalogListing>),
}

struct CatalogState {
    listing: Listing,
    open: bool,
    filter: String,
}

/// What the modal shows right now.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CatalogView {
    pub names: Vec<String>,
    /// `names` as a bulleted display tree.
    pub list: DisplayTree,
    pub total: usize,
    pub loading: bool,
    pub filter: String,
}

/// Lazily loaded, session-cached listing. Cheap to clone.
#[derive(Clone)]
pub struct CatalogViewer {
    gate: ReadinessGate,
    state: Arc<Mutex<CatalogState>>,
}

impl CatalogViewer {
    #[must_use]
    pub fn new(gate: ReadinessGate) -> Self {
        Self {
            gate,
            state: Arc::new(Mutex::new(CatalogState {
                listing: Listing::Unloaded,
                open: false,
                filter: String::new(),
            })),
        }
    }

    /// Show the modal with an empty filter. The first successful open fetches
    /// the vocabulary; later opens reuse it.
    pub fn open(&self) -> Option<JoinHandle<()>> {
        let mut state = self.lock();
        state.open = true;
        state.filter.clear();
        if !matches!(state.listing, Listing::Unloaded) {
            return None;
        }
        state.listing = Listing::Loading;
        drop(state);

        let ready = self.gate.start();
        let shared = Arc::clone(&self.state);
        Some(tokio::spawn(async move {
            let listing = match ready.await {
                Ok(handle) => match handle
                    .call(|engine| engine.quantities())
                    .await
                    .and_then(|raw| decode_catalog(&raw).map_err(EngineFault::from))
                {
                    Ok(catalog) => {
                        tracing::info!(quantities = catalog.len(), "Loaded quantity catalog");
                        Listing::Loaded(Arc::new(CatalogListing::new(&catalog)))
                    }
                    Err(fault) => {
                        tracing::warn!("Could not load quantity catalog: {fault}");
                        Listing::Unloaded
                    }
                },
                Err(failure) => {
                    tracing::warn!("Catalog unavailable, engine failed to start: {failure}");
                    Listing::Unloaded
                }
            };
            shared
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .listing = listing;
        }))
    }

    pub fn close(&self) {
        self.lock().open = false;
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.lock().open
    }

    pub fn push_filter_char(&self, c: char) {
        self.lock().filter.push(c);
    }

    pub fn pop_filter_char(&self) {
        self.lock().filter.pop();
    }

    pub fn set_filter(&self, filter: &str) {
        filter.clone_into(&mut self.lock().filter);
    }

    #[must_use]
    pub fn filter(&self) -> String {
        self.lock().filter.clone()
    }

    /// Filtered names; empty while loading or when loading failed.
    #[must_use]
    pub fn view(&self) -> CatalogView {
        let state = self.lock();
        match &state.listing {
            Listing::Loaded(listing) => CatalogView {
                names: listing
                    .filter(&state.filter)
                    .into_iter()
                    .map(ToString::to_string)
                    .collect(),
                list: render_catalog(listing, &state.filter),
                total: listing.len(),
                loading: false,
                filter: state.filter.clone(),
            },
            Listing::Loading => CatalogView {
                loading: true,
                filter: state.filter.clone(),
                ..CatalogView::default()
            },
            Listing::Unloaded => CatalogView {
                filter: state.filter.clone(),
                ..CatalogView::default()
            },
        }
    }

    fn lock(&self) -> MutexGuard<'_, CatalogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for CatalogViewer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogViewer")
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}
