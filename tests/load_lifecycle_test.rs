use std::sync::Arc;
use std::time::Instant;

use docpane::viewer::{
    DocSession, FileInfo, Platform, PrefetchFlags, RecordingHost, RecordingPrintSurface,
    RenderEngine, RepKind, RepState, Representation, SimulatedEngine, StaticFetcher,
    ViewerOptions, ViewerSignal,
};
use docpane::{JsonFileCache, MemoryCache, SharedCache};

fn content_file(id: &str) -> FileInfo {
    FileInfo {
        id: id.to_string(),
        size: 10_000_000,
        extension: "pdf".to_string(),
        watermarked: false,
        can_download: true,
        representations: vec![Representation {
            kind: RepKind::Content,
            url_template: "https://content/doc".to_string(),
            state: RepState::Success,
        }],
    }
}

fn session_with_cache(
    file: FileInfo,
    pages: u32,
    cache: Box<dyn SharedCache>,
) -> (DocSession, SimulatedEngine, RecordingHost) {
    let engine = SimulatedEngine::with_pages(pages);
    let host = RecordingHost::new();
    let options = ViewerOptions {
        fetch_workers: 0,
        ..ViewerOptions::default()
    };

    let session = DocSession::new(
        file,
        options,
        Platform::desktop(),
        Box::new(engine.clone()),
        Box::new(host.clone()),
        Box::new(RecordingPrintSurface::printable()),
        Arc::new(StaticFetcher::new()),
        cache,
    );
    (session, engine, host)
}

#[test]
fn empty_cache_load_emits_loaded_once_with_engine_page_count() {
    let (mut session, engine, host) = session_with_cache(
        content_file("0"),
        12,
        Box::new(MemoryCache::default()),
    );
    let t0 = Instant::now();

    session.prefetch(PrefetchFlags {
        assets: true,
        preload: true,
        content: true,
    });
    session.load(t0);
    session.tick(t0);

    let signals = session.drain_signals();
    let loads: Vec<_> = signals
        .iter()
        .filter(|signal| matches!(signal, ViewerSignal::Load { .. }))
        .collect();
    assert_eq!(loads.len(), 1);
    assert_eq!(
        loads[0],
        &ViewerSignal::Load {
            num_pages: 12,
            scale: 1.0,
            end_progress: false,
        }
    );
    assert_eq!(host.total_pages_display(), 12);

    // An identical structural event later must not re-emit
    engine.emit(docpane::viewer::StructuralEvent::Init);
    session.tick(t0);
    assert!(
        !session
            .drain_signals()
            .iter()
            .any(|signal| matches!(signal, ViewerSignal::Load { .. }))
    );
}

#[test]
fn page_position_survives_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("positions.json");
    let t0 = Instant::now();

    {
        let (mut session, _engine, _host) = session_with_cache(
            content_file("doc-7"),
            30,
            Box::new(JsonFileCache::load_or_empty(&cache_path)),
        );
        session.load(t0);
        session.tick(t0);
        session.set_page(23);
        session.tick(t0);
        session.destroy();
    }

    let (mut session, engine, host) = session_with_cache(
        content_file("doc-7"),
        30,
        Box::new(JsonFileCache::load_or_empty(&cache_path)),
    );
    session.load(t0);
    session.tick(t0);

    assert_eq!(engine.current_page(), 23);
    assert_eq!(host.current_page_display(), 23);
}

#[test]
fn watermarked_load_disables_ranges_and_skips_preload() {
    let mut file = content_file("wm");
    file.watermarked = true;
    file.representations.push(Representation {
        kind: RepKind::Preload,
        url_template: "https://content/preview".to_string(),
        state: RepState::Success,
    });

    let (mut session, engine, host) =
        session_with_cache(file, 4, Box::new(MemoryCache::default()));
    let t0 = Instant::now();

    session.show_preload();
    assert_eq!(host.preload(), None);

    session.load(t0);
    session.tick(t0);

    let (_, setup) = engine.initialized_with().unwrap();
    assert!(setup.disable_range_requests);
    assert!(session.is_loaded());
}

#[test]
fn destroyed_session_ignores_late_work() {
    let (mut session, engine, host) = session_with_cache(
        content_file("0"),
        6,
        Box::new(MemoryCache::default()),
    );
    let t0 = Instant::now();
    session.load(t0);
    session.tick(t0);
    session.drain_signals();

    session.destroy();
    assert!(engine.is_cleaned_up());
    assert_eq!(host.bound().len(), host.unbound().len());

    engine.emit(docpane::viewer::StructuralEvent::PageRendered { page: 1 });
    session.tick(t0);
    session.on_scroll(t0);
    assert!(session.drain_signals().is_empty());
}
