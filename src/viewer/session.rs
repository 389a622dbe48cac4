//! Document session orchestration
//!
//! `DocSession` owns one open document end to end: it drives the
//! acquisition pipeline, consumes the engine's structural events, routes
//! user input through the navigation controller, and runs the print
//! pipeline. The embedder calls `tick` from its event loop and drains
//! outbound signals.

use std::sync::Arc;
use std::time::Instant;

use crate::cache::SharedCache;

use super::engine::{EngineSetup, RenderEngine};
use super::events::{FetchFault, StructuralEvent, ViewerFault, ViewerSignal};
use super::fetch::{FetchKind, FetchResponse, FetchService, Fetcher};
use super::host::{BindingSet, HostBinding, HostSurface};
use super::loader::{self, LoadStage, Loader, PrefetchFlags, StageDecision};
use super::nav::{self, NavAction, NavController, PageInputKey};
use super::position::PageMemory;
use super::print::{PrintDialog, PrintPipeline, PrintSurface};
use super::timers::{TaskKind, TaskQueue};
use super::types::{FileInfo, Platform, RepKind, RepState, ViewerOptions};
use super::zoom::{ScaleState, ZoomError};

/// Search wiring attached to the engine after load.
#[derive(Debug, Default)]
pub struct FindController {
    query: String,
}

impl FindController {
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn clear(&mut self) {
        self.query.clear();
    }

    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.query.is_empty()
    }
}

/// One open document and everything coordinating it.
pub struct DocSession {
    file: FileInfo,
    options: ViewerOptions,
    platform: Platform,

    engine: Box<dyn RenderEngine>,
    host: Box<dyn HostSurface>,
    print_surface: Box<dyn PrintSurface>,

    fetch: FetchService,
    position: PageMemory,
    scale: ScaleState,
    loader: Loader,
    print: PrintPipeline,
    nav: NavController,
    timers: TaskQueue,
    bindings: BindingSet,
    find: Option<FindController>,

    signals: Vec<ViewerSignal>,
    content_url: Option<String>,
    loaded: bool,
    progress_ended: bool,
    destroyed: bool,
}

impl DocSession {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        file: FileInfo,
        options: ViewerOptions,
        platform: Platform,
        engine: Box<dyn RenderEngine>,
        host: Box<dyn HostSurface>,
        print_surface: Box<dyn PrintSurface>,
        fetcher: Arc<dyn Fetcher>,
        cache: Box<dyn SharedCache>,
    ) -> Self {
        let fetch = FetchService::new(fetcher, options.fetch_workers);
        Self {
            file,
            options,
            platform,
            engine,
            host,
            print_surface,
            fetch,
            position: PageMemory::new(cache),
            scale: ScaleState::default(),
            loader: Loader::new(),
            print: PrintPipeline::new(),
            nav: NavController::new(),
            timers: TaskQueue::new(),
            bindings: BindingSet::new(),
            find: None,
            signals: vec![],
            content_url: None,
            loaded: false,
            progress_ended: false,
            destroyed: false,
        }
    }

    // ---- lifecycle ----------------------------------------------------

    /// Warm caches ahead of a likely `load`. Each flag is independent and
    /// each skip is local; nothing here can fail the session.
    pub fn prefetch(&mut self, flags: PrefetchFlags) {
        if self.destroyed {
            return;
        }

        let record = loader::plan_prefetch(&self.file, flags, &self.options.engine_asset_url());
        self.loader.mark_prefetching();

        for decision in record
            .assets
            .iter()
            .chain(record.preload.iter())
            .chain(record.content.iter())
        {
            match decision {
                StageDecision::Fetch { kind, url } => {
                    let url = if *kind == FetchKind::Assets {
                        url.clone()
                    } else {
                        self.fetch.authed_url(url)
                    };
                    self.fetch.request(*kind, url);
                }
                skipped => log::debug!("prefetch stage skipped: {skipped:?}"),
            }
        }
    }

    /// Mount the low-fidelity placeholder while the content loads.
    pub fn show_preload(&mut self) {
        if self.destroyed {
            return;
        }

        let cached = self.position.cached_page(&self.file.id);
        match loader::plan_preload_visual(&self.file, &self.options, cached) {
            Ok(template) => {
                let url = self.fetch.authed_url(&template);
                self.host.show_preload(&url, cached);
                self.loader.mark_preloading();
            }
            Err(skip) => log::debug!("preload visual skipped: {skip:?}"),
        }
    }

    pub fn hide_preload(&mut self) {
        if self.loader.preload_visible() {
            self.host.hide_preload();
            self.loader.preload_hidden();
        }
    }

    /// Start the authoritative load. Completion arrives through `tick`:
    /// either the engine's `Init` event or a fatal `Error` signal.
    pub fn load(&mut self, now: Instant) {
        if self.destroyed || self.loader.is_terminal() {
            return;
        }

        self.loader.begin_load();

        let Some(rep) = self.file.representation(RepKind::Content).cloned() else {
            self.fail_load(&ViewerFault::MissingRepresentation);
            return;
        };

        self.content_url = Some(self.fetch.authed_url(&rep.url_template));
        self.timers
            .schedule(TaskKind::LoadDeadline, self.options.load_timeout(), now);

        match rep.state {
            RepState::Success => self.postload(),
            RepState::Pending => {
                let probe = self.fetch.request(FetchKind::RepStatus, rep.url_template);
                self.loader.await_representation(probe);
            }
            RepState::Error => {
                self.fail_load(&ViewerFault::Fetch(FetchFault::generic(
                    "content representation errored",
                )));
            }
        }
    }

    /// Continue once the representation is ready: configure and start the
    /// engine, attach host bindings, wire print and find.
    fn postload(&mut self) {
        let Some(url) = self.content_url.clone() else {
            return;
        };

        let setup = EngineSetup::derive(&self.file, &self.options, &self.platform);
        if let Err(fault) = self.engine.initialize(&url, &setup) {
            let fault = ViewerFault::from(fault);
            self.fail_load(&fault);
            return;
        }

        self.bindings.bind(self.host.as_mut(), HostBinding::Scroll);
        self.bindings
            .bind(self.host.as_mut(), HostBinding::Fullscreen);
        if self.platform.touch {
            self.bindings.bind(self.host.as_mut(), HostBinding::Touch);
        }

        self.find = Some(FindController::default());
    }

    /// Drive pending work: fetch responses, engine events, due timers.
    /// Call this from the embedder's event loop.
    pub fn tick(&mut self, now: Instant) {
        if self.destroyed {
            return;
        }

        for response in self.fetch.poll_responses() {
            self.on_fetch_response(response, now);
        }
        for event in self.engine.poll_events() {
            self.on_structural_event(&event);
        }
        for kind in self.timers.due(now) {
            self.on_timer(kind, now);
        }
    }

    /// Tear the session down. Safe from any state; everything pending
    /// becomes inert.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;

        self.bindings.release_all(self.host.as_mut());
        self.timers.clear();
        self.print.destroy();
        self.fetch.shutdown();
        self.find = None;
        self.engine.cleanup();
        log::debug!("session for {} destroyed", self.file.id);
    }

    // ---- event routing ------------------------------------------------

    fn on_fetch_response(&mut self, response: FetchResponse, now: Instant) {
        match response {
            FetchResponse::Done { id, kind, payload } => match kind {
                FetchKind::RepStatus => {
                    if self.loader.resolve_probe(id) {
                        self.postload();
                    }
                }
                FetchKind::PrintBlob => {
                    if self.print.owns_fetch(id) && self.print.on_blob(payload) {
                        self.print(now);
                    }
                }
                FetchKind::Assets | FetchKind::Preload | FetchKind::Warmup => {
                    log::debug!("warm fetch done: {kind:?}");
                }
            },
            FetchResponse::Failed { id, kind, fault } => match kind {
                FetchKind::RepStatus => {
                    if self.loader.resolve_probe(id) {
                        self.fail_load(&ViewerFault::Fetch(fault));
                    }
                }
                FetchKind::PrintBlob => {
                    if self.print.owns_fetch(id) {
                        self.print
                            .on_blob_failed(&fault, &mut self.timers, &mut self.signals);
                    }
                }
                FetchKind::Assets | FetchKind::Preload | FetchKind::Warmup => {
                    // Warm-up failures cost nothing but the warmth
                    log::debug!("warm fetch failed: {kind:?}: {fault}");
                }
            },
        }
    }

    fn on_structural_event(&mut self, event: &StructuralEvent) {
        match event {
            StructuralEvent::Init => self.on_pages_init(),
            StructuralEvent::PageRendered { page } => {
                self.signals.push(ViewerSignal::PageRender { page: *page });
                self.signals.push(ViewerSignal::Scale {
                    page: *page,
                    scale: self.engine.current_scale(),
                });
                if !self.progress_ended {
                    self.progress_ended = true;
                    self.signals.push(ViewerSignal::ProgressEnd);
                }
            }
            StructuralEvent::PageChanged { page } => {
                self.signals.push(ViewerSignal::PageFocus { page: *page });
                self.update_current_page(*page);
                // Page churn during initial layout is not worth remembering
                if self.loaded {
                    self.position.cache_page(&self.file.id, *page);
                }
            }
        }
    }

    fn on_pages_init(&mut self) {
        self.loader.mark_loaded();
        self.timers.cancel_kind(TaskKind::LoadDeadline);
        self.hide_preload();

        self.host
            .set_total_pages_display(self.engine.page_count());
        self.refresh_pagination_buttons();

        let cached = self.position.cached_page(&self.file.id);
        self.set_page(cached);

        self.scale.current_scale = self.engine.current_scale();

        if !self.loaded {
            self.loaded = true;
            self.signals.push(ViewerSignal::Load {
                num_pages: self.engine.page_count(),
                scale: self.engine.current_scale(),
                end_progress: false,
            });
        }
    }

    fn on_timer(&mut self, kind: TaskKind, _now: Instant) {
        match kind {
            TaskKind::ScrollEnd => self.nav.on_scroll_end(&mut self.signals),
            TaskKind::PrintDialog => self.print.on_dialog_timer(),
            TaskKind::PrintSettle => self
                .print
                .on_settle_timer(self.print_surface.as_mut(), &mut self.signals),
            TaskKind::LoadDeadline => self.fail_load(&ViewerFault::LoadTimeout),
        }
    }

    fn fail_load(&mut self, fault: &ViewerFault) {
        if self.loader.stage() == LoadStage::Errored {
            return;
        }
        log::error!("load failed for {}: {fault}", self.file.id);
        self.loader.mark_errored();
        self.timers.cancel_kind(TaskKind::LoadDeadline);
        self.hide_preload();
        self.signals.push(ViewerSignal::Error {
            reason: fault.to_string(),
        });
    }

    // ---- navigation ---------------------------------------------------

    /// Jump to `page`. Out-of-range pages are a silent no-op: no engine
    /// mutation, no cache write.
    pub fn set_page(&mut self, page: u32) {
        if self.destroyed || page < 1 || page > self.engine.page_count() {
            return;
        }
        self.engine.set_current_page(page);
        self.update_current_page(page);
        self.position.cache_page(&self.file.id, page);
    }

    pub fn previous_page(&mut self) {
        self.set_page(self.engine.current_page().saturating_sub(1));
    }

    pub fn next_page(&mut self) {
        self.set_page(self.engine.current_page().saturating_add(1));
    }

    /// Handle a key from the global dispatcher. Returns whether the key
    /// was consumed.
    pub fn on_keydown(&mut self, key: &str) -> bool {
        if self.destroyed {
            return false;
        }
        match nav::key_binding(key) {
            Some(NavAction::PreviousPage) => {
                self.previous_page();
                true
            }
            Some(NavAction::NextPage) => {
                self.next_page();
                true
            }
            None => false,
        }
    }

    pub fn on_scroll(&mut self, now: Instant) {
        if self.destroyed {
            return;
        }
        self.nav.on_scroll(&mut self.timers, now, &mut self.signals);
    }

    pub fn enter_fullscreen(&mut self) {
        if self.destroyed {
            return;
        }
        self.nav.enter_fullscreen(self.engine.as_mut());
        self.resize();
    }

    pub fn exit_fullscreen(&mut self) {
        if self.destroyed {
            return;
        }
        self.nav.exit_fullscreen(self.engine.as_mut());
        self.resize();
    }

    /// Viewport changed. Relayout may shift page identities, so the
    /// previously current page is restored afterwards.
    pub fn resize(&mut self) {
        if self.destroyed {
            return;
        }
        if let Some(page) = nav::resize(self.engine.as_mut()) {
            self.set_page(page);
            self.refresh_pagination_buttons();
        }
    }

    // ---- page-number input --------------------------------------------

    pub fn show_page_input(&mut self) {
        if self.destroyed {
            return;
        }
        self.nav.set_page_input_visible(true);
        self.host.show_page_input(self.engine.current_page());
    }

    /// Blur commits numeric input and always hides.
    pub fn on_page_input_blur(&mut self, raw: &str) {
        if self.destroyed {
            return;
        }
        if let Some(page) = nav::parse_page_input(raw) {
            self.set_page(page);
        }
        self.nav.set_page_input_visible(false);
        self.host.hide_page_input();
    }

    /// Resolve a key pressed inside the input; `Dismiss` is handled here,
    /// the host acts on the rest.
    pub fn on_page_input_keydown(&mut self, key: &str) -> PageInputKey {
        if self.destroyed {
            return PageInputKey::Pass;
        }
        let action = nav::page_input_keydown(key, &self.platform.quirks);
        if action == PageInputKey::Dismiss {
            self.nav.set_page_input_visible(false);
            self.host.hide_page_input();
            self.host.focus_document();
        }
        action
    }

    // ---- zoom ---------------------------------------------------------

    pub fn zoom_in(&mut self, ticks: u32) -> Result<(), ZoomError> {
        self.scale.current_scale = self.engine.current_scale();
        if let Some(scale) = self.scale.zoom_in(ticks)? {
            self.engine.set_scale(scale);
            self.signals.push(ViewerSignal::Zoom { scale });
        }
        Ok(())
    }

    pub fn zoom_out(&mut self, ticks: u32) -> Result<(), ZoomError> {
        self.scale.current_scale = self.engine.current_scale();
        if let Some(scale) = self.scale.zoom_out(ticks)? {
            self.engine.set_scale(scale);
            self.signals.push(ViewerSignal::Zoom { scale });
        }
        Ok(())
    }

    pub fn on_pinch_begin(&mut self) {
        self.nav.pinch_begin(self.engine.current_scale());
    }

    pub fn on_pinch_update(&mut self, factor: f32) {
        self.nav.pinch_update(factor);
    }

    /// Commit the gesture scale, clamping overshoot into range.
    pub fn on_pinch_end(&mut self) {
        if let Some(transient) = self.nav.pinch_take() {
            let scale = self.scale.commit(transient);
            self.engine.set_scale(scale);
            self.signals.push(ViewerSignal::Zoom { scale });
        }
    }

    // ---- print --------------------------------------------------------

    /// User asked to print the document.
    pub fn print(&mut self, now: Instant) {
        if self.destroyed {
            return;
        }
        let Some(url) = self.content_url.clone() else {
            log::warn!("print requested before load for {}", self.file.id);
            return;
        };
        self.print.print(
            &url,
            &mut self.fetch,
            &mut self.timers,
            self.print_surface.as_mut(),
            &self.platform.quirks,
            now,
            &mut self.signals,
        );
    }

    /// The user activated the dialog's print action.
    pub fn on_print_dialog_confirm(&mut self, now: Instant) {
        if self.destroyed {
            return;
        }
        self.print.browser_print(
            self.print_surface.as_mut(),
            &self.platform.quirks,
            &mut self.timers,
            now,
            &mut self.signals,
        );
    }

    // ---- accessors ----------------------------------------------------

    /// Take all signals emitted since the last drain, in emission order.
    pub fn drain_signals(&mut self) -> Vec<ViewerSignal> {
        std::mem::take(&mut self.signals)
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    #[must_use]
    pub fn stage(&self) -> LoadStage {
        self.loader.stage()
    }

    #[must_use]
    pub fn current_scale(&self) -> f32 {
        self.scale.current_scale
    }

    #[must_use]
    pub fn dialog(&self) -> &PrintDialog {
        self.print.dialog()
    }

    pub fn find_mut(&mut self) -> Option<&mut FindController> {
        self.find.as_mut()
    }

    pub fn engine_mut(&mut self) -> &mut dyn RenderEngine {
        self.engine.as_mut()
    }

    fn update_current_page(&mut self, page: u32) {
        let total = self.engine.page_count().max(1);
        self.host.set_current_page_display(page.clamp(1, total));
        self.refresh_pagination_buttons();
    }

    fn refresh_pagination_buttons(&mut self) {
        let buttons = nav::check_pagination_buttons(
            self.engine.as_ref(),
            self.nav.is_fullscreen(),
            &self.platform.quirks,
        );
        self.host.set_pagination_buttons(buttons);
    }
}

impl Drop for DocSession {
    fn drop(&mut self) {
        self.destroy();
    }
}
