//! Print pipeline
//!
//! The printable artifact is fetched lazily on the first print request.
//! A short grace period keeps the "preparing" dialog from flashing when
//! the network is fast; if the dialog did appear, a late artifact updates
//! it in place instead of re-opening it.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use super::events::{FetchFault, ViewerSignal};
use super::fetch::{FetchId, FetchKind, FetchService};
use super::timers::{TaskKind, TaskQueue};
use super::types::PlatformQuirks;
use super::PRINT_DIALOG_TIMEOUT;

/// Binary artifact produced for printing, distinct from the on-screen
/// rendering.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PrintBlob(pub Vec<u8>);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PrintMessage {
    #[default]
    Preparing,
    Ready,
}

/// Visual state of the "preparing to print" dialog. The host renders it;
/// the pipeline only mutates state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PrintDialog {
    visible: bool,
    button_enabled: bool,
    message: PrintMessage,
    loading_shown: bool,
    checkmark_shown: bool,
}

impl PrintDialog {
    fn show_preparing(&mut self) {
        self.visible = true;
        self.button_enabled = false;
        self.message = PrintMessage::Preparing;
        self.loading_shown = true;
        self.checkmark_shown = false;
    }

    fn mark_ready(&mut self) {
        self.button_enabled = true;
        self.message = PrintMessage::Ready;
        self.loading_shown = false;
        self.checkmark_shown = true;
    }

    fn hide(&mut self) {
        self.visible = false;
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    #[must_use]
    pub fn button_enabled(&self) -> bool {
        self.button_enabled
    }

    #[must_use]
    pub fn message(&self) -> PrintMessage {
        self.message
    }

    #[must_use]
    pub fn loading_shown(&self) -> bool {
        self.loading_shown
    }

    #[must_use]
    pub fn checkmark_shown(&self) -> bool {
        self.checkmark_shown
    }
}

/// A browsing context opened to host the print artifact.
pub trait PrintTarget {
    /// Whether the context exposes a native print call.
    fn can_print(&self) -> bool;
    fn print(&mut self);
}

/// Platform print primitives supplied by the embedder.
pub trait PrintSurface {
    /// Native save-or-open primitive, when the platform offers one.
    /// `None` when unsupported, otherwise the primitive's result.
    fn save_or_open(&mut self, blob: &PrintBlob) -> Option<bool>;

    /// Open the artifact in a new browsing context; `None` when blocked.
    fn open_blob(&mut self, blob: &PrintBlob) -> Option<Box<dyn PrintTarget>>;

    /// Release the temporary object URL backing an opened context.
    fn release_blob_url(&mut self);
}

/// Lazily-fetched print artifact plus dialog debouncing and platform
/// dispatch.
#[derive(Default)]
pub struct PrintPipeline {
    blob: Option<PrintBlob>,
    dialog: PrintDialog,
    fetch_in_flight: Option<FetchId>,
    settle_target: Option<Box<dyn PrintTarget>>,
}

impl PrintPipeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn blob_ready(&self) -> bool {
        self.blob.is_some()
    }

    #[must_use]
    pub fn dialog(&self) -> &PrintDialog {
        &self.dialog
    }

    /// User asked to print. With a ready artifact and no dialog on screen
    /// (or the dialog grace period still pending) this prints directly;
    /// with a visible dialog it refreshes the dialog in place; otherwise
    /// it starts the artifact fetch and arms the dialog timer.
    pub fn print(
        &mut self,
        url: &str,
        fetch: &mut FetchService,
        timers: &mut TaskQueue,
        surface: &mut dyn PrintSurface,
        quirks: &PlatformQuirks,
        now: Instant,
        signals: &mut Vec<ViewerSignal>,
    ) {
        if self.blob.is_some()
            && (timers.is_pending(TaskKind::PrintDialog) || !self.dialog.is_visible())
        {
            timers.cancel_kind(TaskKind::PrintDialog);
            self.dialog.hide();
            self.browser_print(surface, quirks, timers, now, signals);
        } else if self.blob.is_some() {
            self.dialog.mark_ready();
        } else {
            if self.fetch_in_flight.is_none() {
                self.fetch_in_flight = Some(fetch.request(FetchKind::PrintBlob, url));
            }
            if !timers.is_pending(TaskKind::PrintDialog) && !self.dialog.is_visible() {
                timers.schedule(TaskKind::PrintDialog, PRINT_DIALOG_TIMEOUT, now);
            }
        }
    }

    /// Dispatch the ready artifact to the platform print mechanism.
    pub fn browser_print(
        &mut self,
        surface: &mut dyn PrintSurface,
        quirks: &PlatformQuirks,
        timers: &mut TaskQueue,
        now: Instant,
        signals: &mut Vec<ViewerSignal>,
    ) {
        let Some(blob) = self.blob.clone() else {
            log::debug!("print dispatch without a ready artifact");
            return;
        };

        if quirks.save_or_open_dialog {
            if let Some(saved) = surface.save_or_open(&blob) {
                signals.push(if saved {
                    ViewerSignal::PrintSuccess
                } else {
                    ViewerSignal::PrintError {
                        reason: "save-or-open dialog reported failure".to_string(),
                    }
                });
                return;
            }
        }

        match surface.open_blob(&blob) {
            None => signals.push(ViewerSignal::PrintError {
                reason: "print context was blocked".to_string(),
            }),
            Some(mut target) => {
                if !target.can_print() {
                    // The context is on screen; the user drives print from
                    // there.
                    signals.push(ViewerSignal::PrintSuccess);
                    return;
                }

                if let Some(delay) = quirks.print_settle_delay {
                    self.settle_target = Some(target);
                    timers.schedule(TaskKind::PrintSettle, delay, now);
                } else {
                    target.print();
                    surface.release_blob_url();
                    signals.push(ViewerSignal::PrintSuccess);
                }
            }
        }
    }

    /// Dialog grace period elapsed with no artifact.
    pub fn on_dialog_timer(&mut self) {
        if self.blob.is_none() {
            self.dialog.show_preparing();
        }
    }

    /// Settle delay elapsed; drive the parked print context.
    pub fn on_settle_timer(
        &mut self,
        surface: &mut dyn PrintSurface,
        signals: &mut Vec<ViewerSignal>,
    ) {
        let Some(mut target) = self.settle_target.take() else {
            return;
        };
        target.print();
        surface.release_blob_url();
        signals.push(ViewerSignal::PrintSuccess);
    }

    /// Artifact fetch finished. Returns true so the caller re-enters
    /// `print` and resolves against the new state.
    pub fn on_blob(&mut self, payload: Vec<u8>) -> bool {
        self.fetch_in_flight = None;
        self.blob = Some(PrintBlob(payload));
        if self.dialog.is_visible() {
            self.dialog.mark_ready();
        }
        true
    }

    pub fn on_blob_failed(
        &mut self,
        fault: &FetchFault,
        timers: &mut TaskQueue,
        signals: &mut Vec<ViewerSignal>,
    ) {
        self.fetch_in_flight = None;
        timers.cancel_kind(TaskKind::PrintDialog);
        self.dialog.hide();
        signals.push(ViewerSignal::PrintError {
            reason: fault.to_string(),
        });
    }

    /// Matches a print-blob response id against the in-flight fetch.
    #[must_use]
    pub fn owns_fetch(&self, id: FetchId) -> bool {
        self.fetch_in_flight == Some(id)
    }

    /// Release the artifact and any parked context.
    pub fn destroy(&mut self) {
        self.blob = None;
        self.settle_target = None;
        self.fetch_in_flight = None;
        self.dialog.hide();
    }
}

#[derive(Debug, Default)]
struct PrintRecord {
    save_or_open_calls: usize,
    opens: usize,
    releases: usize,
    printed: usize,
}

/// Recording print surface for tests and dry-runs. Clones share state.
#[derive(Clone, Default)]
pub struct RecordingPrintSurface {
    record: Arc<Mutex<PrintRecord>>,
    save_or_open_result: Option<bool>,
    open_blocked: bool,
    target_can_print: bool,
}

impl RecordingPrintSurface {
    /// A surface whose opened contexts expose a native print call.
    #[must_use]
    pub fn printable() -> Self {
        Self {
            target_can_print: true,
            ..Self::default()
        }
    }

    /// A surface with a native save-or-open primitive returning `result`.
    #[must_use]
    pub fn with_save_or_open(result: bool) -> Self {
        Self {
            save_or_open_result: Some(result),
            ..Self::default()
        }
    }

    /// A surface whose open attempts are blocked.
    #[must_use]
    pub fn blocked() -> Self {
        Self {
            open_blocked: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn opens(&self) -> usize {
        self.lock().opens
    }

    #[must_use]
    pub fn releases(&self) -> usize {
        self.lock().releases
    }

    #[must_use]
    pub fn printed(&self) -> usize {
        self.lock().printed
    }

    #[must_use]
    pub fn save_or_open_calls(&self) -> usize {
        self.lock().save_or_open_calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PrintRecord> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct RecordingTarget {
    record: Arc<Mutex<PrintRecord>>,
    can_print: bool,
}

impl PrintTarget for RecordingTarget {
    fn can_print(&self) -> bool {
        self.can_print
    }

    fn print(&mut self) {
        self.record
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .printed += 1;
    }
}

impl PrintSurface for RecordingPrintSurface {
    fn save_or_open(&mut self, _blob: &PrintBlob) -> Option<bool> {
        if self.save_or_open_result.is_some() {
            self.lock().save_or_open_calls += 1;
        }
        self.save_or_open_result
    }

    fn open_blob(&mut self, _blob: &PrintBlob) -> Option<Box<dyn PrintTarget>> {
        if self.open_blocked {
            return None;
        }
        self.lock().opens += 1;
        Some(Box::new(RecordingTarget {
            record: self.record.clone(),
            can_print: self.target_can_print,
        }))
    }

    fn release_blob_url(&mut self) {
        self.lock().releases += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::viewer::fetch::StaticFetcher;
    use crate::viewer::PRINT_TIMEOUT;
    use std::time::Duration;

    fn fetch_service() -> FetchService {
        let mut fetcher = StaticFetcher::new();
        fetcher.insert("print-url", b"artifact".to_vec());
        FetchService::new(Arc::new(fetcher), 0)
    }

    fn print_all(
        pipeline: &mut PrintPipeline,
        fetch: &mut FetchService,
        timers: &mut TaskQueue,
        surface: &mut RecordingPrintSurface,
        quirks: &PlatformQuirks,
        now: Instant,
    ) -> Vec<ViewerSignal> {
        let mut signals = vec![];
        pipeline.print("print-url", fetch, timers, surface, quirks, now, &mut signals);
        signals
    }

    #[test]
    fn unready_artifact_triggers_exactly_one_fetch() {
        let mut pipeline = PrintPipeline::new();
        let mut fetch = fetch_service();
        let mut timers = TaskQueue::new();
        let mut surface = RecordingPrintSurface::printable();
        let quirks = PlatformQuirks::default();
        let t0 = Instant::now();

        print_all(&mut pipeline, &mut fetch, &mut timers, &mut surface, &quirks, t0);
        print_all(&mut pipeline, &mut fetch, &mut timers, &mut surface, &quirks, t0);

        assert!(pipeline.fetch_in_flight.is_some());
        assert_eq!(fetch.poll_responses().len(), 1);
        assert!(timers.is_pending(TaskKind::PrintDialog));
    }

    #[test]
    fn ready_artifact_prints_directly_with_zero_dialogs() {
        let mut pipeline = PrintPipeline::new();
        let mut fetch = fetch_service();
        let mut timers = TaskQueue::new();
        let mut surface = RecordingPrintSurface::printable();
        let quirks = PlatformQuirks::default();
        let t0 = Instant::now();

        pipeline.on_blob(b"artifact".to_vec());
        let signals =
            print_all(&mut pipeline, &mut fetch, &mut timers, &mut surface, &quirks, t0);

        assert_eq!(signals, vec![ViewerSignal::PrintSuccess]);
        assert_eq!(surface.opens(), 1);
        assert_eq!(surface.printed(), 1);
        assert_eq!(surface.releases(), 1);
        assert!(!pipeline.dialog().is_visible());
    }

    #[test]
    fn slow_blob_shows_dialog_then_updates_in_place() {
        let mut pipeline = PrintPipeline::new();
        let mut fetch = fetch_service();
        let mut timers = TaskQueue::new();
        let mut surface = RecordingPrintSurface::printable();
        let quirks = PlatformQuirks::default();
        let t0 = Instant::now();

        print_all(&mut pipeline, &mut fetch, &mut timers, &mut surface, &quirks, t0);

        // Grace period elapses before the artifact arrives
        for kind in timers.due(t0 + Duration::from_millis(501)) {
            assert_eq!(kind, TaskKind::PrintDialog);
            pipeline.on_dialog_timer();
        }
        assert!(pipeline.dialog().is_visible());
        assert!(!pipeline.dialog().button_enabled());
        assert!(pipeline.dialog().loading_shown());

        pipeline.on_blob(b"artifact".to_vec());
        assert!(pipeline.dialog().is_visible());
        assert!(pipeline.dialog().button_enabled());
        assert!(pipeline.dialog().checkmark_shown());
        assert_eq!(pipeline.dialog().message(), PrintMessage::Ready);
    }

    #[test]
    fn blob_within_grace_period_prints_without_dialog() {
        let mut pipeline = PrintPipeline::new();
        let mut fetch = fetch_service();
        let mut timers = TaskQueue::new();
        let mut surface = RecordingPrintSurface::printable();
        let quirks = PlatformQuirks::default();
        let t0 = Instant::now();

        print_all(&mut pipeline, &mut fetch, &mut timers, &mut surface, &quirks, t0);
        pipeline.on_blob(b"artifact".to_vec());

        // Re-entry while the dialog timer is still pending
        let signals =
            print_all(&mut pipeline, &mut fetch, &mut timers, &mut surface, &quirks, t0);

        assert_eq!(signals, vec![ViewerSignal::PrintSuccess]);
        assert!(!timers.is_pending(TaskKind::PrintDialog));
        assert!(!pipeline.dialog().is_visible());
    }

    #[test]
    fn save_or_open_result_maps_to_signal() {
        let mut pipeline = PrintPipeline::new();
        let mut timers = TaskQueue::new();
        let quirks = PlatformQuirks {
            save_or_open_dialog: true,
            ..PlatformQuirks::default()
        };
        pipeline.on_blob(vec![1]);

        let mut surface = RecordingPrintSurface::with_save_or_open(true);
        let mut signals = vec![];
        pipeline.browser_print(&mut surface, &quirks, &mut timers, Instant::now(), &mut signals);
        assert_eq!(signals, vec![ViewerSignal::PrintSuccess]);
        assert_eq!(surface.save_or_open_calls(), 1);

        let mut surface = RecordingPrintSurface::with_save_or_open(false);
        let mut signals = vec![];
        pipeline.browser_print(&mut surface, &quirks, &mut timers, Instant::now(), &mut signals);
        assert!(matches!(signals[0], ViewerSignal::PrintError { .. }));
    }

    #[test]
    fn blocked_context_surfaces_print_error() {
        let mut pipeline = PrintPipeline::new();
        let mut timers = TaskQueue::new();
        let mut surface = RecordingPrintSurface::blocked();
        pipeline.on_blob(vec![1]);

        let mut signals = vec![];
        pipeline.browser_print(
            &mut surface,
            &PlatformQuirks::default(),
            &mut timers,
            Instant::now(),
            &mut signals,
        );

        assert!(matches!(signals[0], ViewerSignal::PrintError { .. }));
    }

    #[test]
    fn settle_delay_defers_print_until_timer() {
        let mut pipeline = PrintPipeline::new();
        let mut timers = TaskQueue::new();
        let mut surface = RecordingPrintSurface::printable();
        let quirks = PlatformQuirks {
            print_settle_delay: Some(PRINT_TIMEOUT),
            ..PlatformQuirks::default()
        };
        let t0 = Instant::now();
        pipeline.on_blob(vec![1]);

        let mut signals = vec![];
        pipeline.browser_print(&mut surface, &quirks, &mut timers, t0, &mut signals);
        assert!(signals.is_empty());
        assert_eq!(surface.printed(), 0);
        assert!(timers.is_pending(TaskKind::PrintSettle));

        for kind in timers.due(t0 + PRINT_TIMEOUT) {
            assert_eq!(kind, TaskKind::PrintSettle);
            pipeline.on_settle_timer(&mut surface, &mut signals);
        }
        assert_eq!(surface.printed(), 1);
        assert_eq!(surface.releases(), 1);
        assert_eq!(signals, vec![ViewerSignal::PrintSuccess]);
    }

    #[test]
    fn unprintable_context_still_reports_success() {
        let mut pipeline = PrintPipeline::new();
        let mut timers = TaskQueue::new();
        let mut surface = RecordingPrintSurface::default();
        pipeline.on_blob(vec![1]);

        let mut signals = vec![];
        pipeline.browser_print(
            &mut surface,
            &PlatformQuirks::default(),
            &mut timers,
            Instant::now(),
            &mut signals,
        );

        assert_eq!(signals, vec![ViewerSignal::PrintSuccess]);
        assert_eq!(surface.printed(), 0);
    }

    #[test]
    fn failed_fetch_leaves_artifact_unready() {
        let mut pipeline = PrintPipeline::new();
        let mut timers = TaskQueue::new();
        let t0 = Instant::now();
        timers.schedule(TaskKind::PrintDialog, PRINT_DIALOG_TIMEOUT, t0);

        let mut signals = vec![];
        pipeline.on_blob_failed(
            &FetchFault::network("offline"),
            &mut timers,
            &mut signals,
        );

        assert!(!pipeline.blob_ready());
        assert!(!timers.is_pending(TaskKind::PrintDialog));
        assert!(matches!(signals[0], ViewerSignal::PrintError { .. }));
    }

    #[test]
    fn destroy_releases_the_artifact() {
        let mut pipeline = PrintPipeline::new();
        pipeline.on_blob(vec![1, 2, 3]);
        assert!(pipeline.blob_ready());

        pipeline.destroy();
        assert!(!pipeline.blob_ready());
        assert!(!pipeline.dialog().is_visible());
    }
}
