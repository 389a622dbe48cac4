//! Rendering engine seam
//!
//! The engine parses the document format and paints pages; this crate
//! only drives it. `EngineSetup` captures everything the session decides
//! for it during postload.

use std::sync::{Arc, Mutex, PoisonError};

use super::events::{EngineFault, StructuralEvent};
use super::types::{FileInfo, Platform, ViewerOptions};
use super::zoom::ScaleValue;
use super::{
    MOBILE_MAX_CANVAS_PIXELS, PRIMARY_LOCALE, RANGE_CHUNK_DEFAULT, RANGE_CHUNK_LARGE,
    RANGE_MIN_FILE_SIZE,
};

/// Where links inside the document open.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LinkTarget {
    /// A fresh browsing context, decoupled from the host.
    #[default]
    NewContext,
    SameFrame,
}

/// Engine configuration assembled during postload.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineSetup {
    pub worker_url: String,
    pub link_target: LinkTarget,
    pub link_rel: String,
    pub disable_range_requests: bool,
    pub range_chunk_size: u32,
    pub disable_text_layer: bool,
    pub max_canvas_pixels: Option<u32>,
    pub http_headers: Vec<(String, String)>,
}

impl EngineSetup {
    /// Derive the engine configuration from file, options, and platform.
    #[must_use]
    pub fn derive(file: &FileInfo, options: &ViewerOptions, platform: &Platform) -> Self {
        // Small files arrive faster whole; watermarked files must never be
        // range-assembled client-side.
        let disable_range_requests = (file.size < RANGE_MIN_FILE_SIZE && !file.is_spreadsheet())
            || file.watermarked;

        let range_chunk_size =
            options
                .range_chunk_size
                .unwrap_or(if options.locale == PRIMARY_LOCALE {
                    RANGE_CHUNK_LARGE
                } else {
                    RANGE_CHUNK_DEFAULT
                });

        // The text layer doubles as a copy surface, so it follows the
        // download permission.
        let disable_text_layer = !file.can_download || options.disable_text_layer;

        let max_canvas_pixels = platform.mobile.then_some(MOBILE_MAX_CANVAS_PIXELS);

        let http_headers = if platform.quirks.stale_range_cache {
            vec![("If-None-Match".to_string(), "no-cache".to_string())]
        } else {
            vec![]
        };

        Self {
            worker_url: options.engine_asset_url(),
            link_target: LinkTarget::NewContext,
            link_rel: "noopener noreferrer nofollow".to_string(),
            disable_range_requests,
            range_chunk_size,
            disable_text_layer,
            max_canvas_pixels,
            http_headers,
        }
    }
}

/// Rendering engine contract consumed by the session.
pub trait RenderEngine {
    /// Begin loading the document; structural events follow asynchronously.
    fn initialize(&mut self, url: &str, setup: &EngineSetup) -> Result<(), EngineFault>;

    /// Drain structural events in emission order.
    fn poll_events(&mut self) -> Vec<StructuralEvent>;

    fn page_count(&self) -> u32;
    fn current_page(&self) -> u32;
    fn set_current_page(&mut self, page: u32);

    fn current_scale(&self) -> f32;
    fn set_scale(&mut self, scale: f32);
    fn set_scale_value(&mut self, value: ScaleValue);

    /// True once initial layout has finished and pages are addressable.
    fn pages_ready(&self) -> bool;

    /// Recompute layout after a viewport change.
    fn update_layout(&mut self);

    /// Release the document handle and any engine resources.
    fn cleanup(&mut self);
}

#[derive(Debug)]
struct SimulatedState {
    queued: Vec<StructuralEvent>,
    page_count: u32,
    current_page: u32,
    scale: f32,
    scale_value: ScaleValue,
    pages_ready: bool,
    initialized: Option<(String, EngineSetup)>,
    layout_updates: usize,
    cleaned_up: bool,
}

/// Scripted engine for tests and embedding dry-runs. Clones share state,
/// so a test can keep a handle while the session owns the boxed engine.
///
/// `initialize` lays the document out immediately and queues the `Init`
/// event; `set_current_page` queues `PageChanged`, as a real engine's
/// viewer does.
#[derive(Clone)]
pub struct SimulatedEngine {
    state: Arc<Mutex<SimulatedState>>,
}

impl SimulatedEngine {
    #[must_use]
    pub fn with_pages(page_count: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimulatedState {
                queued: vec![],
                page_count,
                current_page: 0,
                scale: 1.0,
                scale_value: ScaleValue::Auto,
                pages_ready: false,
                initialized: None,
                layout_updates: 0,
                cleaned_up: false,
            })),
        }
    }

    /// Queue an event as if the engine had emitted it.
    pub fn emit(&self, event: StructuralEvent) {
        self.lock().queued.push(event);
    }

    #[must_use]
    pub fn initialized_with(&self) -> Option<(String, EngineSetup)> {
        self.lock().initialized.clone()
    }

    #[must_use]
    pub fn is_cleaned_up(&self) -> bool {
        self.lock().cleaned_up
    }

    #[must_use]
    pub fn layout_updates(&self) -> usize {
        self.lock().layout_updates
    }

    #[must_use]
    pub fn scale_value(&self) -> ScaleValue {
        self.lock().scale_value
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimulatedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RenderEngine for SimulatedEngine {
    fn initialize(&mut self, url: &str, setup: &EngineSetup) -> Result<(), EngineFault> {
        let mut state = self.lock();
        state.initialized = Some((url.to_string(), setup.clone()));
        state.pages_ready = true;
        if state.current_page == 0 {
            state.current_page = 1;
        }
        state.queued.push(StructuralEvent::Init);
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<StructuralEvent> {
        std::mem::take(&mut self.lock().queued)
    }

    fn page_count(&self) -> u32 {
        self.lock().page_count
    }

    fn current_page(&self) -> u32 {
        self.lock().current_page
    }

    fn set_current_page(&mut self, page: u32) {
        let mut state = self.lock();
        if state.current_page == page {
            return;
        }
        state.current_page = page;
        state.queued.push(StructuralEvent::PageChanged { page });
    }

    fn current_scale(&self) -> f32 {
        self.lock().scale
    }

    fn set_scale(&mut self, scale: f32) {
        let mut state = self.lock();
        state.scale = scale;
        state.scale_value = ScaleValue::Explicit(scale);
    }

    fn set_scale_value(&mut self, value: ScaleValue) {
        let mut state = self.lock();
        state.scale_value = value;
        if let ScaleValue::Explicit(scale) = value {
            state.scale = scale;
        }
    }

    fn pages_ready(&self) -> bool {
        self.lock().pages_ready
    }

    fn update_layout(&mut self) {
        self.lock().layout_updates += 1;
    }

    fn cleanup(&mut self) {
        let mut state = self.lock();
        state.cleaned_up = true;
        state.pages_ready = false;
        state.queued.clear();
    }
}
