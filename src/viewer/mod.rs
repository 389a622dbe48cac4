//! Document viewer lifecycle core
//!
//! Everything here coordinates one open document: staged content
//! acquisition, position persistence, scale control, printing, and
//! viewport/navigation handling. The rendering engine, host surface,
//! network layer, and print primitives are trait collaborators.

pub mod engine;
pub mod events;
pub mod fetch;
pub mod host;
pub mod loader;
pub mod nav;
pub mod position;
pub mod print;
pub mod session;
pub mod timers;
pub mod types;
pub mod zoom;

use std::time::Duration;

/// Overall budget for a document load, including representation readiness.
pub const LOAD_TIMEOUT: Duration = Duration::from_millis(180_000);

/// Settle delay before invoking print on platforms that need one.
pub const PRINT_TIMEOUT: Duration = Duration::from_millis(1_000);

/// Grace period before the "preparing to print" dialog appears.
pub const PRINT_DIALOG_TIMEOUT: Duration = Duration::from_millis(500);

/// Quiet period after which a scroll gesture counts as finished.
pub const SCROLL_END_TIMEOUT: Duration = Duration::from_millis(500);

/// Multiplicative scale step per zoom tick.
pub const DEFAULT_SCALE_DELTA: f32 = 1.1;
/// Upper zoom bound.
pub const MAX_SCALE: f32 = 10.0;
/// Lower zoom bound.
pub const MIN_SCALE: f32 = 0.1;

/// Canvas pixel cap applied on mobile platforms (~3MP, 1920x1536).
pub const MOBILE_MAX_CANVAS_PIXELS: u32 = 2_949_120;

/// Files below this size are fetched whole instead of in ranges.
pub const RANGE_MIN_FILE_SIZE: u64 = 5 * 1024 * 1024;
/// Range chunk size for the primary locale.
pub const RANGE_CHUNK_LARGE: u32 = 1_048_576;
/// Range chunk size elsewhere.
pub const RANGE_CHUNK_DEFAULT: u32 = 524_288;

/// Locale whose CDN placement justifies the large chunk size.
pub const PRIMARY_LOCALE: &str = "en-US";

/// The page-number jump control is pointless at or below this many pages.
pub const PAGE_NUM_MIN_PAGES: u32 = 5;

/// Engine worker asset, resolved against the embedder's asset base.
pub const ENGINE_WORKER_ASSET: &str = "engine.worker.js";

/// Default size of the fetch worker pool.
pub const DEFAULT_FETCH_WORKERS: usize = 2;

pub use engine::{EngineSetup, LinkTarget, RenderEngine, SimulatedEngine};
pub use events::{EngineFault, FetchFault, StructuralEvent, ViewerFault, ViewerSignal};
pub use fetch::{FetchId, FetchKind, FetchResponse, FetchService, Fetcher, StaticFetcher};
pub use host::{BindingSet, HostBinding, HostSurface, PaginationButtons, RecordingHost};
pub use loader::{LoadStage, Loader, PrefetchFlags, PrefetchRecord, PreloadSkip, StageDecision};
pub use nav::{NavAction, NavController, PageInputKey};
pub use position::{PageMemory, CURRENT_PAGE_CACHE_KEY};
pub use print::{
    PrintBlob, PrintDialog, PrintMessage, PrintPipeline, PrintSurface, PrintTarget,
    RecordingPrintSurface,
};
pub use session::{DocSession, FindController};
pub use timers::{TaskId, TaskKind, TaskQueue};
pub use types::{
    FileInfo, Platform, PlatformQuirks, RepKind, RepState, Representation, ViewerOptions,
};
pub use zoom::{ScaleState, ScaleValue, ZoomError};
