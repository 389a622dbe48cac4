//! Viewport and navigation control
//!
//! Page validation, pagination-button policy, key bindings, fullscreen
//! scale transitions, resize, scroll debouncing, the page-number input,
//! and pinch commit. State that belongs to the viewport lives here; the
//! session wires it to the engine and host.

use std::time::Instant;

use super::engine::RenderEngine;
use super::events::ViewerSignal;
use super::host::PaginationButtons;
use super::timers::{TaskKind, TaskQueue};
use super::types::PlatformQuirks;
use super::zoom::ScaleValue;
use super::{PAGE_NUM_MIN_PAGES, SCROLL_END_TIMEOUT};

/// Action resolved from a key press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavAction {
    PreviousPage,
    NextPage,
}

/// Resolve a pressed key to a navigation action. Unbound keys return
/// `None` so a global dispatcher can fall through.
#[must_use]
pub fn key_binding(key: &str) -> Option<NavAction> {
    match key {
        "ArrowLeft" | "[" => Some(NavAction::PreviousPage),
        "ArrowRight" | "]" => Some(NavAction::NextPage),
        _ => None,
    }
}

/// What the host should do with a key pressed inside the page input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageInputKey {
    /// Blur the input; the blur handler commits.
    Commit,
    /// Blur does not reliably fire here; move focus to the document body.
    ForceFocusBody,
    /// Hide without committing and restore focus.
    Dismiss,
    /// Not handled; propagate.
    Pass,
}

/// Resolve a key pressed inside the page-number input.
#[must_use]
pub fn page_input_keydown(key: &str, quirks: &PlatformQuirks) -> PageInputKey {
    match key {
        "Enter" => {
            if quirks.unreliable_input_blur {
                PageInputKey::ForceFocusBody
            } else {
                PageInputKey::Commit
            }
        }
        "Esc" | "Escape" => PageInputKey::Dismiss,
        _ => PageInputKey::Pass,
    }
}

/// Pagination-button policy for the current engine state.
#[must_use]
pub fn check_pagination_buttons(
    engine: &dyn RenderEngine,
    fullscreen: bool,
    quirks: &PlatformQuirks,
) -> PaginationButtons {
    let pages = engine.page_count();
    let current = engine.current_page();

    PaginationButtons {
        page_num_enabled: pages > PAGE_NUM_MIN_PAGES
            && !(fullscreen && quirks.limited_fullscreen_chrome),
        previous_enabled: current > 1,
        next_enabled: current < pages,
    }
}

/// Viewport state: scroll debounce, fullscreen, page input, pinch.
#[derive(Debug, Default)]
pub struct NavController {
    scroll_started: bool,
    fullscreen: bool,
    page_input_visible: bool,
    pinch_scale: Option<f32>,
}

impl NavController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    #[must_use]
    pub fn scroll_started(&self) -> bool {
        self.scroll_started
    }

    #[must_use]
    pub fn page_input_visible(&self) -> bool {
        self.page_input_visible
    }

    pub fn set_page_input_visible(&mut self, visible: bool) {
        self.page_input_visible = visible;
    }

    /// A scroll event arrived. The first in a burst emits `ScrollStart`;
    /// every event pushes the `ScrollEnd` deadline out.
    pub fn on_scroll(
        &mut self,
        timers: &mut TaskQueue,
        now: Instant,
        signals: &mut Vec<ViewerSignal>,
    ) {
        if !self.scroll_started {
            self.scroll_started = true;
            signals.push(ViewerSignal::ScrollStart);
        }
        timers.reschedule(TaskKind::ScrollEnd, SCROLL_END_TIMEOUT, now);
    }

    /// The scroll idle deadline fired.
    pub fn on_scroll_end(&mut self, signals: &mut Vec<ViewerSignal>) {
        if self.scroll_started {
            self.scroll_started = false;
            signals.push(ViewerSignal::ScrollEnd);
        }
    }

    /// Entering fullscreen forces fit-to-page.
    pub fn enter_fullscreen(&mut self, engine: &mut dyn RenderEngine) {
        self.fullscreen = true;
        engine.set_scale_value(ScaleValue::PageFit);
    }

    /// Exiting fullscreen restores automatic scaling.
    pub fn exit_fullscreen(&mut self, engine: &mut dyn RenderEngine) {
        self.fullscreen = false;
        engine.set_scale_value(ScaleValue::Auto);
    }

    /// Begin a pinch gesture from the engine's current scale.
    pub fn pinch_begin(&mut self, current_scale: f32) {
        self.pinch_scale = Some(current_scale);
    }

    /// Update the transient gesture scale. Overshoot is allowed here and
    /// clamped at commit.
    pub fn pinch_update(&mut self, factor: f32) {
        if let Some(scale) = self.pinch_scale.as_mut() {
            *scale *= factor;
        }
    }

    /// End the gesture, yielding the transient scale to commit.
    pub fn pinch_take(&mut self) -> Option<f32> {
        self.pinch_scale.take()
    }
}

/// Relayout after a viewport change. Returns the page to restore, or
/// `None` when there is nothing laid out to resize.
pub fn resize(engine: &mut dyn RenderEngine) -> Option<u32> {
    if !engine.pages_ready() {
        return None;
    }
    let page = engine.current_page();
    engine.update_layout();
    Some(page)
}

/// Parse a committed page-input value. Anything non-numeric is discarded.
#[must_use]
pub fn parse_page_input(raw: &str) -> Option<u32> {
    raw.trim().parse().ok()
}
