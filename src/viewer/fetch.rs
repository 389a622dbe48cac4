//! Content fetch worker pool
//!
//! Network work never runs on the session's thread. Jobs go out over a
//! shared request queue, worker threads call the embedder's `Fetcher`,
//! and the session drains responses on `tick`.

use std::collections::HashMap;
use std::sync::Arc;

use flume::{Receiver, Sender};

use super::events::FetchFault;

/// What a fetched payload is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FetchKind {
    /// Static support assets for the rendering engine.
    Assets,
    /// Low-fidelity preview warm-up.
    Preload,
    /// Authoritative content warm-up.
    Warmup,
    /// Printable artifact.
    PrintBlob,
    /// Representation readiness probe; resolves when the representation
    /// converges to a terminal state.
    RepStatus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FetchId(pub u64);

/// Network collaborator: resolves auth parameters and performs fetches.
/// `fetch` runs on a worker thread and may block.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str, kind: FetchKind) -> Result<Vec<u8>, FetchFault>;

    /// Append auth parameters to a content URL template.
    fn authed_url(&self, template: &str) -> String;
}

#[derive(Debug)]
enum FetchRequest {
    Job {
        id: FetchId,
        kind: FetchKind,
        url: String,
    },
    Shutdown,
}

/// Completed fetch, successful or not.
#[derive(Debug)]
pub enum FetchResponse {
    Done {
        id: FetchId,
        kind: FetchKind,
        payload: Vec<u8>,
    },
    Failed {
        id: FetchId,
        kind: FetchKind,
        fault: FetchFault,
    },
}

/// Dispatches fetch jobs to worker threads and collects responses.
pub struct FetchService {
    fetcher: Arc<dyn Fetcher>,
    request_tx: Sender<FetchRequest>,
    response_tx: Sender<FetchResponse>,
    response_rx: Receiver<FetchResponse>,
    next_id: u64,
    pending: HashMap<FetchId, FetchKind>,
    num_workers: usize,
}

impl FetchService {
    /// Spawn `num_workers` worker threads sharing one request queue.
    /// Zero workers runs each job inline on the caller's thread, which
    /// keeps single-threaded embeddings and tests deterministic.
    #[must_use]
    pub fn new(fetcher: Arc<dyn Fetcher>, num_workers: usize) -> Self {
        // flume because the workers share one queue: its Receiver clones,
        // std::sync::mpsc's cannot.
        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();

        for _ in 0..num_workers {
            let fetcher = fetcher.clone();
            let rx = request_rx.clone();
            let tx = response_tx.clone();
            std::thread::spawn(move || fetch_worker(&*fetcher, &rx, &tx));
        }

        Self {
            fetcher,
            request_tx,
            response_tx,
            response_rx,
            next_id: 0,
            pending: HashMap::new(),
            num_workers,
        }
    }

    /// Queue a fetch. The response arrives through `poll_responses`.
    pub fn request(&mut self, kind: FetchKind, url: impl Into<String>) -> FetchId {
        self.next_id += 1;
        let id = FetchId(self.next_id);
        let url = url.into();
        self.pending.insert(id, kind);

        if self.num_workers == 0 {
            let response = run_job(&*self.fetcher, id, kind, &url);
            let _ = self.response_tx.send(response);
        } else {
            let _ = self.request_tx.send(FetchRequest::Job { id, kind, url });
        }

        id
    }

    /// Drain completed fetches without blocking.
    pub fn poll_responses(&mut self) -> Vec<FetchResponse> {
        let mut responses = vec![];
        while let Ok(response) = self.response_rx.try_recv() {
            let id = match &response {
                FetchResponse::Done { id, .. } | FetchResponse::Failed { id, .. } => *id,
            };
            self.pending.remove(&id);
            responses.push(response);
        }
        responses
    }

    #[must_use]
    pub fn is_pending(&self, id: FetchId) -> bool {
        self.pending.contains_key(&id)
    }

    #[must_use]
    pub fn pending_of_kind(&self, kind: FetchKind) -> bool {
        self.pending.values().any(|pending| *pending == kind)
    }

    /// Delegate to the fetcher's auth resolution.
    #[must_use]
    pub fn authed_url(&self, template: &str) -> String {
        self.fetcher.authed_url(template)
    }

    /// Ask all workers to exit once the queue drains.
    pub fn shutdown(&self) {
        for _ in 0..self.num_workers {
            let _ = self.request_tx.send(FetchRequest::Shutdown);
        }
    }
}

impl Drop for FetchService {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn fetch_worker(fetcher: &dyn Fetcher, rx: &Receiver<FetchRequest>, tx: &Sender<FetchResponse>) {
    while let Ok(request) = rx.recv() {
        match request {
            FetchRequest::Job { id, kind, url } => {
                let response = run_job(fetcher, id, kind, &url);
                if tx.send(response).is_err() {
                    break;
                }
            }
            FetchRequest::Shutdown => break,
        }
    }
}

fn run_job(fetcher: &dyn Fetcher, id: FetchId, kind: FetchKind, url: &str) -> FetchResponse {
    match fetcher.fetch(url, kind) {
        Ok(payload) => FetchResponse::Done { id, kind, payload },
        Err(fault) => FetchResponse::Failed { id, kind, fault },
    }
}

/// Canned fetcher for tests and offline embedding: payloads are looked up
/// by exact URL, unknown URLs fail.
#[derive(Default)]
pub struct StaticFetcher {
    payloads: HashMap<String, Vec<u8>>,
    auth_suffix: String,
}

impl StaticFetcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_auth_suffix(suffix: impl Into<String>) -> Self {
        Self {
            payloads: HashMap::new(),
            auth_suffix: suffix.into(),
        }
    }

    pub fn insert(&mut self, url: impl Into<String>, payload: Vec<u8>) -> &mut Self {
        self.payloads.insert(url.into(), payload);
        self
    }
}

impl Fetcher for StaticFetcher {
    fn fetch(&self, url: &str, _kind: FetchKind) -> Result<Vec<u8>, FetchFault> {
        self.payloads
            .get(url)
            .cloned()
            .ok_or_else(|| FetchFault::network(format!("no payload for {url}")))
    }

    fn authed_url(&self, template: &str) -> String {
        format!("{template}{}", self.auth_suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inline_service() -> FetchService {
        let mut fetcher = StaticFetcher::with_auth_suffix("?token=t");
        fetcher.insert("a", b"payload-a".to_vec());
        FetchService::new(Arc::new(fetcher), 0)
    }

    #[test]
    fn inline_fetch_round_trip() {
        let mut service = inline_service();

        let id = service.request(FetchKind::Warmup, "a");
        assert!(service.is_pending(id));

        let responses = service.poll_responses();
        assert_eq!(responses.len(), 1);
        assert!(matches!(
            &responses[0],
            FetchResponse::Done { kind: FetchKind::Warmup, payload, .. } if payload == b"payload-a"
        ));
        assert!(!service.is_pending(id));
    }

    #[test]
    fn unknown_url_fails() {
        let mut service = inline_service();

        service.request(FetchKind::Assets, "missing");
        let responses = service.poll_responses();

        assert!(matches!(&responses[0], FetchResponse::Failed { .. }));
    }

    #[test]
    fn authed_url_appends_suffix() {
        let service = inline_service();
        assert_eq!(service.authed_url("https://x/doc"), "https://x/doc?token=t");
    }

    #[test]
    fn worker_threads_deliver_responses() {
        let mut fetcher = StaticFetcher::new();
        fetcher.insert("a", vec![1]);
        let mut service = FetchService::new(Arc::new(fetcher), 2);

        service.request(FetchKind::Assets, "a");

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        loop {
            let responses = service.poll_responses();
            if !responses.is_empty() {
                assert!(matches!(&responses[0], FetchResponse::Done { .. }));
                break;
            }
            assert!(std::time::Instant::now() < deadline, "no response in time");
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
    }

    #[test]
    fn pending_of_kind_tracks_in_flight_jobs() {
        let mut service = inline_service();

        assert!(!service.pending_of_kind(FetchKind::PrintBlob));
        service.request(FetchKind::PrintBlob, "a");
        assert!(service.pending_of_kind(FetchKind::PrintBlob));

        service.poll_responses();
        assert!(!service.pending_of_kind(FetchKind::PrintBlob));
    }
}
