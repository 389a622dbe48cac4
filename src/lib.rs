//! docpane — lifecycle core for an embeddable paginated document viewer
//!
//! The crate coordinates one open document: staged content acquisition,
//! page-position persistence, scale control, print flow, and viewport
//! input. Rendering, the host element tree, networking, and print
//! primitives stay behind traits supplied by the embedder.

pub mod cache;
pub mod viewer;

pub use cache::{JsonFileCache, MemoryCache, SharedCache};
pub use viewer::session::{DocSession, FindController};
pub use viewer::{
    FileInfo, Platform, PlatformQuirks, PrefetchFlags, RepKind, RepState, Representation,
    ViewerOptions, ViewerSignal,
};
