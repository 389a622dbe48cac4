//! Host surface seam and viewport bindings
//!
//! The element tree and event delivery belong to the host page; the
//! session only asks for listeners by class and pushes display state.
//! Bindings are an owned set with symmetric bind/unbind so destroy can
//! release exactly what was attached.

use std::sync::{Arc, Mutex, PoisonError};

/// Input/listener classes attached to the host surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HostBinding {
    Scroll,
    Fullscreen,
    Touch,
}

/// Enable/disable state for the pagination controls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PaginationButtons {
    pub page_num_enabled: bool,
    pub previous_enabled: bool,
    pub next_enabled: bool,
}

/// Element-tree collaborator supplied by the embedder.
pub trait HostSurface {
    fn bind(&mut self, binding: HostBinding);
    fn unbind(&mut self, binding: HostBinding);

    /// Mount the low-fidelity placeholder into the render container.
    fn show_preload(&mut self, url: &str, page_hint: u32);
    fn hide_preload(&mut self);

    fn set_pagination_buttons(&mut self, buttons: PaginationButtons);
    fn set_current_page_display(&mut self, page: u32);
    fn set_total_pages_display(&mut self, total: u32);

    fn show_page_input(&mut self, current_page: u32);
    fn hide_page_input(&mut self);

    fn focus_document(&mut self);
}

/// Tracks which host bindings are currently attached. Binding twice is a
/// single attach; releasing unbinds everything exactly once.
#[derive(Debug, Default)]
pub struct BindingSet {
    bound: Vec<HostBinding>,
}

impl BindingSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, host: &mut dyn HostSurface, binding: HostBinding) {
        if self.bound.contains(&binding) {
            return;
        }
        host.bind(binding);
        self.bound.push(binding);
    }

    pub fn unbind(&mut self, host: &mut dyn HostSurface, binding: HostBinding) {
        let before = self.bound.len();
        self.bound.retain(|bound| *bound != binding);
        if self.bound.len() != before {
            host.unbind(binding);
        }
    }

    pub fn release_all(&mut self, host: &mut dyn HostSurface) {
        for binding in self.bound.drain(..) {
            host.unbind(binding);
        }
    }

    #[must_use]
    pub fn is_bound(&self, binding: HostBinding) -> bool {
        self.bound.contains(&binding)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bound.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bound.is_empty()
    }
}

#[derive(Debug, Default)]
struct HostRecord {
    bound: Vec<HostBinding>,
    unbound: Vec<HostBinding>,
    preload: Option<(String, u32)>,
    preload_hides: usize,
    buttons: PaginationButtons,
    current_page_display: u32,
    total_pages_display: u32,
    page_input_visible: bool,
    document_focuses: usize,
}

/// Recording host for tests and embedding dry-runs. Clones share state.
#[derive(Clone, Default)]
pub struct RecordingHost {
    record: Arc<Mutex<HostRecord>>,
}

impl RecordingHost {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn bound(&self) -> Vec<HostBinding> {
        self.lock().bound.clone()
    }

    #[must_use]
    pub fn unbound(&self) -> Vec<HostBinding> {
        self.lock().unbound.clone()
    }

    #[must_use]
    pub fn preload(&self) -> Option<(String, u32)> {
        self.lock().preload.clone()
    }

    #[must_use]
    pub fn preload_hides(&self) -> usize {
        self.lock().preload_hides
    }

    #[must_use]
    pub fn buttons(&self) -> PaginationButtons {
        self.lock().buttons
    }

    #[must_use]
    pub fn current_page_display(&self) -> u32 {
        self.lock().current_page_display
    }

    #[must_use]
    pub fn total_pages_display(&self) -> u32 {
        self.lock().total_pages_display
    }

    #[must_use]
    pub fn page_input_visible(&self) -> bool {
        self.lock().page_input_visible
    }

    #[must_use]
    pub fn document_focuses(&self) -> usize {
        self.lock().document_focuses
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HostRecord> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl HostSurface for RecordingHost {
    fn bind(&mut self, binding: HostBinding) {
        self.lock().bound.push(binding);
    }

    fn unbind(&mut self, binding: HostBinding) {
        self.lock().unbound.push(binding);
    }

    fn show_preload(&mut self, url: &str, page_hint: u32) {
        self.lock().preload = Some((url.to_string(), page_hint));
    }

    fn hide_preload(&mut self) {
        let mut record = self.lock();
        record.preload = None;
        record.preload_hides += 1;
    }

    fn set_pagination_buttons(&mut self, buttons: PaginationButtons) {
        self.lock().buttons = buttons;
    }

    fn set_current_page_display(&mut self, page: u32) {
        self.lock().current_page_display = page;
    }

    fn set_total_pages_display(&mut self, total: u32) {
        self.lock().total_pages_display = total;
    }

    fn show_page_input(&mut self, current_page: u32) {
        let mut record = self.lock();
        record.page_input_visible = true;
        record.current_page_display = current_page;
    }

    fn hide_page_input(&mut self) {
        self.lock().page_input_visible = false;
    }

    fn focus_document(&mut self) {
        self.lock().document_focuses += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_is_idempotent() {
        let mut host = RecordingHost::new();
        let mut bindings = BindingSet::new();

        bindings.bind(&mut host, HostBinding::Scroll);
        bindings.bind(&mut host, HostBinding::Scroll);

        assert_eq!(bindings.len(), 1);
        assert_eq!(host.bound(), vec![HostBinding::Scroll]);
    }

    #[test]
    fn release_all_unbinds_each_exactly_once() {
        let mut host = RecordingHost::new();
        let mut bindings = BindingSet::new();

        bindings.bind(&mut host, HostBinding::Scroll);
        bindings.bind(&mut host, HostBinding::Fullscreen);
        bindings.release_all(&mut host);
        bindings.release_all(&mut host);

        assert!(bindings.is_empty());
        assert_eq!(
            host.unbound(),
            vec![HostBinding::Scroll, HostBinding::Fullscreen]
        );
    }

    #[test]
    fn unbind_of_unbound_binding_is_silent() {
        let mut host = RecordingHost::new();
        let mut bindings = BindingSet::new();

        bindings.unbind(&mut host, HostBinding::Touch);
        assert!(host.unbound().is_empty());
    }
}
