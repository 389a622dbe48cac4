//! File metadata, viewer options, and platform policy

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{DEFAULT_FETCH_WORKERS, ENGINE_WORKER_ASSET, LOAD_TIMEOUT, PRIMARY_LOCALE};

/// Fidelity class of a server-side rendition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepKind {
    /// Authoritative full-fidelity content
    Content,
    /// Low-fidelity preview shown while content loads
    Preload,
}

/// Readiness of a representation on the server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepState {
    Success,
    Pending,
    Error,
}

/// A server-side rendition of the document at one fidelity.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Representation {
    pub kind: RepKind,
    /// Content URL template; auth parameters are appended by the fetcher.
    pub url_template: String,
    pub state: RepState,
}

/// Metadata for the document being viewed, as supplied by the embedder.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileInfo {
    pub id: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub extension: String,
    #[serde(default)]
    pub watermarked: bool,
    #[serde(default = "default_true")]
    pub can_download: bool,
    #[serde(default)]
    pub representations: Vec<Representation>,
}

impl FileInfo {
    /// Look up the representation of the given fidelity, if the server
    /// produced one.
    #[must_use]
    pub fn representation(&self, kind: RepKind) -> Option<&Representation> {
        self.representations.iter().find(|rep| rep.kind == kind)
    }

    /// Spreadsheet-family formats stream well even when small, so the
    /// range-request policy treats them specially.
    #[must_use]
    pub fn is_spreadsheet(&self) -> bool {
        matches!(self.extension.as_str(), "xls" | "xlsx" | "xlsm" | "xlsb")
    }
}

/// Embedder-supplied viewer configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ViewerOptions {
    /// Whether the low-fidelity preload visual may be shown.
    #[serde(default = "default_true")]
    pub preload: bool,

    /// Force the text layer off even when download permission allows it.
    #[serde(default)]
    pub disable_text_layer: bool,

    /// Explicit range chunk size; overrides the locale heuristic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range_chunk_size: Option<u32>,

    #[serde(default = "default_locale")]
    pub locale: String,

    /// Base URL for static engine assets.
    #[serde(default)]
    pub asset_base_url: String,

    #[serde(default = "default_load_timeout_ms")]
    pub load_timeout_ms: u64,

    #[serde(default = "default_fetch_workers")]
    pub fetch_workers: usize,
}

fn default_true() -> bool {
    true
}

fn default_locale() -> String {
    PRIMARY_LOCALE.to_string()
}

fn default_load_timeout_ms() -> u64 {
    LOAD_TIMEOUT.as_millis() as u64
}

fn default_fetch_workers() -> usize {
    DEFAULT_FETCH_WORKERS
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            preload: true,
            disable_text_layer: false,
            range_chunk_size: None,
            locale: default_locale(),
            asset_base_url: String::new(),
            load_timeout_ms: default_load_timeout_ms(),
            fetch_workers: default_fetch_workers(),
        }
    }
}

impl ViewerOptions {
    #[must_use]
    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    /// URL of the engine worker asset under the configured asset base.
    #[must_use]
    pub fn engine_asset_url(&self) -> String {
        if self.asset_base_url.is_empty() {
            ENGINE_WORKER_ASSET.to_string()
        } else {
            format!(
                "{}/{}",
                self.asset_base_url.trim_end_matches('/'),
                ENGINE_WORKER_ASSET
            )
        }
    }
}

/// Per-platform behavior policy. Quirks are capabilities and workarounds,
/// never platform identities, so embedders describe what their platform
/// needs rather than what it is called.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlatformQuirks {
    /// Platform offers a native save-or-open primitive for blobs.
    pub save_or_open_dialog: bool,

    /// Delay required between opening a print context and invoking print.
    pub print_settle_delay: Option<Duration>,

    /// Range responses are served from a stale cache unless busted.
    pub stale_range_cache: bool,

    /// Fullscreen hides the UI chrome the page-number control lives in.
    pub limited_fullscreen_chrome: bool,

    /// Blurring an input does not reliably fire its blur handler.
    pub unreliable_input_blur: bool,
}

/// Host platform description.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Platform {
    pub mobile: bool,
    /// Touch/gesture input is available and should be bound.
    pub touch: bool,
    pub quirks: PlatformQuirks,
}

impl Platform {
    #[must_use]
    pub fn desktop() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn handheld() -> Self {
        Self {
            mobile: true,
            touch: true,
            quirks: PlatformQuirks {
                stale_range_cache: true,
                limited_fullscreen_chrome: true,
                ..PlatformQuirks::default()
            },
        }
    }
}
