//! Staged content acquisition
//!
//! Pure stage planning lives here; the session executes the resulting
//! fetches and owns the collaborators. Stage-local skips are recorded,
//! not raised: a watermark or an unready representation suppresses a
//! stage without failing the load.

use super::fetch::{FetchId, FetchKind};
use super::types::{FileInfo, RepKind, RepState, ViewerOptions};

/// Acquisition pipeline stage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadStage {
    #[default]
    Idle,
    Prefetching,
    Preloading,
    Loading,
    Loaded,
    /// Absorbing; only a full reload leaves it.
    Errored,
}

/// Which content classes one prefetch call should warm.
#[derive(Clone, Copy, Debug, Default)]
pub struct PrefetchFlags {
    pub assets: bool,
    pub preload: bool,
    pub content: bool,
}

/// Outcome of a single stage decision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StageDecision {
    /// Issue a fetch for this stage. `Assets` URLs are final; the others
    /// are templates awaiting auth resolution.
    Fetch { kind: FetchKind, url: String },
    WatermarkSuppressed,
    RepresentationNotReady,
}

/// Per-class decisions for one prefetch call. `None` means the class was
/// not requested.
#[derive(Clone, Debug, Default)]
pub struct PrefetchRecord {
    pub assets: Option<StageDecision>,
    pub preload: Option<StageDecision>,
    pub content: Option<StageDecision>,
}

/// Decide what one `prefetch` call should fetch.
#[must_use]
pub fn plan_prefetch(file: &FileInfo, flags: PrefetchFlags, asset_url: &str) -> PrefetchRecord {
    let mut record = PrefetchRecord::default();

    if flags.assets {
        record.assets = Some(StageDecision::Fetch {
            kind: FetchKind::Assets,
            url: asset_url.to_string(),
        });
    }

    if flags.preload {
        record.preload = Some(if file.watermarked {
            StageDecision::WatermarkSuppressed
        } else {
            match file.representation(RepKind::Preload) {
                Some(rep) if rep.state == RepState::Success => StageDecision::Fetch {
                    kind: FetchKind::Preload,
                    url: rep.url_template.clone(),
                },
                _ => StageDecision::RepresentationNotReady,
            }
        });
    }

    if flags.content {
        record.content = Some(if file.watermarked {
            StageDecision::WatermarkSuppressed
        } else {
            match file.representation(RepKind::Content) {
                Some(rep) if rep.state == RepState::Success => StageDecision::Fetch {
                    kind: FetchKind::Warmup,
                    url: rep.url_template.clone(),
                },
                _ => StageDecision::RepresentationNotReady,
            }
        });
    }

    record
}

/// Why the preload visual was not shown.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreloadSkip {
    /// A remembered page exists; previewing page 1 would mislead.
    CachedPageExists,
    Watermarked,
    NoRepresentation,
    OptionDisabled,
    RepresentationErrored,
}

/// Decide whether the preload visual may be shown, returning the preload
/// URL template when it may.
pub fn plan_preload_visual(
    file: &FileInfo,
    options: &ViewerOptions,
    cached_page: u32,
) -> Result<String, PreloadSkip> {
    if cached_page != 1 {
        return Err(PreloadSkip::CachedPageExists);
    }
    if file.watermarked {
        return Err(PreloadSkip::Watermarked);
    }
    let Some(rep) = file.representation(RepKind::Preload) else {
        return Err(PreloadSkip::NoRepresentation);
    };
    if !options.preload {
        return Err(PreloadSkip::OptionDisabled);
    }
    if rep.state == RepState::Error {
        return Err(PreloadSkip::RepresentationErrored);
    }

    Ok(rep.url_template.clone())
}

/// Tracks the acquisition pipeline for one document session.
#[derive(Debug, Default)]
pub struct Loader {
    stage: LoadStage,
    rep_probe: Option<FetchId>,
    preload_visible: bool,
}

impl Loader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn stage(&self) -> LoadStage {
        self.stage
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self.stage, LoadStage::Loaded | LoadStage::Errored)
    }

    pub fn mark_prefetching(&mut self) {
        if self.stage == LoadStage::Idle {
            self.stage = LoadStage::Prefetching;
        }
    }

    pub fn mark_preloading(&mut self) {
        if matches!(self.stage, LoadStage::Idle | LoadStage::Prefetching) {
            self.stage = LoadStage::Preloading;
        }
        self.preload_visible = true;
    }

    pub fn preload_hidden(&mut self) {
        self.preload_visible = false;
    }

    #[must_use]
    pub fn preload_visible(&self) -> bool {
        self.preload_visible
    }

    /// Enter `Loading`. Allowed from any non-terminal stage.
    pub fn begin_load(&mut self) {
        if !self.is_terminal() {
            self.stage = LoadStage::Loading;
        }
    }

    /// Remember the in-flight representation readiness probe.
    pub fn await_representation(&mut self, probe: FetchId) {
        self.rep_probe = Some(probe);
    }

    /// Consume the probe if `id` matches it; stale responses return false.
    pub fn resolve_probe(&mut self, id: FetchId) -> bool {
        if self.rep_probe == Some(id) {
            self.rep_probe = None;
            true
        } else {
            false
        }
    }

    pub fn mark_loaded(&mut self) {
        if self.stage != LoadStage::Errored {
            self.stage = LoadStage::Loaded;
        }
    }

    /// Absorbing failure; a terminal stage stays as it is.
    pub fn mark_errored(&mut self) {
        if !self.is_terminal() {
            self.stage = LoadStage::Errored;
            self.rep_probe = None;
        }
    }
}
