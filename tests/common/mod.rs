//! Shared helpers: a stand-in captioning service and session builders.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use image_caption_client::{CandidateFile, CaptionClient, ClientConfig, SessionHandle};

/// One multipart part as the mock service received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedPart {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub len: usize,
}

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    body: &'static str,
    delay: Duration,
    hits: Arc<AtomicUsize>,
    parts: Arc<Mutex<Vec<ReceivedPart>>>,
}

/// A captioning service answering every upload with a fixed status and body.
pub struct MockService {
    pub endpoint: String,
    hits: Arc<AtomicUsize>,
    parts: Arc<Mutex<Vec<ReceivedPart>>>,
}

impl MockService {
    pub async fn start(status: StatusCode, body: &'static str) -> Self {
        Self::start_delayed(status, body, Duration::ZERO).await
    }

    pub async fn start_delayed(status: StatusCode, body: &'static str, delay: Duration) -> Self {
        let state = MockState {
            status,
            body,
            delay,
            hits: Arc::new(AtomicUsize::new(0)),
            parts: Arc::new(Mutex::new(Vec::new())),
        };
        let hits = state.hits.clone();
        let parts = state.parts.clone();

        let app = Router::new()
            .route("/caption", post(caption))
            .layer(DefaultBodyLimit::disable())
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            endpoint: format!("http://{addr}/caption"),
            hits,
            parts,
        }
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn parts(&self) -> Vec<ReceivedPart> {
        self.parts.lock().unwrap().clone()
    }

    pub fn session(&self) -> SessionHandle {
        session_for(&self.endpoint)
    }
}

async fn caption(State(state): State<MockState>, mut multipart: Multipart) -> (StatusCode, &'static str) {
    state.hits.fetch_add(1, Ordering::SeqCst);
    while let Some(field) = multipart.next_field().await.unwrap() {
        let part = ReceivedPart {
            field: field.name().unwrap_or_default().to_string(),
            file_name: field.file_name().map(str::to_string),
            content_type: field.content_type().map(str::to_string),
            len: 0,
        };
        let len = field.bytes().await.unwrap().len();
        state.parts.lock().unwrap().push(ReceivedPart { len, ..part });
    }
    tokio::time::sleep(state.delay).await;
    (state.status, state.body)
}

pub fn session_for(endpoint: &str) -> SessionHandle {
    let config = ClientConfig::for_endpoint(endpoint).unwrap();
    SessionHandle::new(CaptionClient::new(&config).unwrap())
}

pub fn image(name: &str, mime: &str, len: usize) -> CandidateFile {
    CandidateFile::new(name, mime, vec![0xAB; len])
}

/// `cat.jpg`, 2 MB, `image/jpeg`.
pub fn cat_jpg() -> CandidateFile {
    image("cat.jpg", "image/jpeg", 2_000_000)
}
