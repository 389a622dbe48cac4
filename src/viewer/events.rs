//! Structural events, outbound signals, and the fault taxonomy

use thiserror::Error;

/// Lifecycle events emitted by the rendering engine, consumed in emission
/// order by the session.
#[derive(Clone, Debug, PartialEq)]
pub enum StructuralEvent {
    /// Page structure is laid out and navigable.
    Init,
    /// A page finished painting.
    PageRendered { page: u32 },
    /// The focused page changed.
    PageChanged { page: u32 },
}

/// Signals emitted to the embedding surface.
#[derive(Clone, Debug, PartialEq)]
pub enum ViewerSignal {
    /// The document became viewable. Emitted once per session.
    Load {
        num_pages: u32,
        scale: f32,
        end_progress: bool,
    },
    /// First page finished painting; overall progress is complete.
    ProgressEnd,
    PageRender {
        page: u32,
    },
    PageFocus {
        page: u32,
    },
    Scale {
        page: u32,
        scale: f32,
    },
    Zoom {
        scale: f32,
    },
    ScrollStart,
    ScrollEnd,
    PrintSuccess,
    PrintError {
        reason: String,
    },
    /// Terminal load failure; the session needs a full reload.
    Error {
        reason: String,
    },
}

/// Faults from fetch workers.
#[derive(Debug, Error)]
pub enum FetchFault {
    #[error("network: {detail}")]
    Network { detail: String },

    #[error("representation not ready")]
    RepresentationPending,

    #[error("{detail}")]
    Generic { detail: String },
}

impl FetchFault {
    pub fn network(detail: impl Into<String>) -> Self {
        Self::Network {
            detail: detail.into(),
        }
    }

    pub fn generic(detail: impl Into<String>) -> Self {
        Self::Generic {
            detail: detail.into(),
        }
    }
}

/// Faults raised by the rendering engine collaborator.
#[derive(Debug, Error)]
pub enum EngineFault {
    #[error("engine initialization failed: {detail}")]
    Init { detail: String },

    #[error("{detail}")]
    Generic { detail: String },
}

impl EngineFault {
    pub fn init(detail: impl Into<String>) -> Self {
        Self::Init {
            detail: detail.into(),
        }
    }
}

/// Session-fatal faults. Anything here prevents the document from becoming
/// viewable; everything else is absorbed where it happens.
#[derive(Debug, Error)]
pub enum ViewerFault {
    #[error("document load timed out")]
    LoadTimeout,

    #[error("no content representation available")]
    MissingRepresentation,

    #[error("rendering engine: {0}")]
    Engine(#[from] EngineFault),

    #[error("content fetch failed: {0}")]
    Fetch(#[from] FetchFault),
}
