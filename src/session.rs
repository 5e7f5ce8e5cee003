//! The captioning session: one owned state container plus the handle that
//! drives its two suspension points (preview derivation and the captioning
//! request).
//!
//! Every selection and reset bumps an epoch. Background work is tagged with
//! the epoch it was started under and its result is dropped if the epoch has
//! moved on, so a superseded read or request never writes into the session.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::AbortHandle;

use crate::client::CaptionClient;
use crate::error::{CaptionError, IntakeError, GENERATE_FAILED_MESSAGE};
use crate::export::CaptionExport;
use crate::intake::{CandidateFile, SelectedImage};
use crate::preview::derive_preview;

pub const PROMPT_IDLE: &str = "Choose an image or drag it here";
pub const PROMPT_DRAGGING: &str = "Drop your image here";
pub const PREVIEW_FAILED_MESSAGE: &str = "Please select a valid image file";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Empty,
    Previewing,
    Captioned,
}

/// Snapshot of the session as the page renders it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub phase: Phase,
    pub file_name: Option<String>,
    pub file_size: Option<u64>,
    pub preview: Option<Arc<str>>,
    pub caption: String,
    pub loading: bool,
    pub error: Option<String>,
    pub drag_over: bool,
    pub prompt: &'static str,
}

impl SessionView {
    pub fn can_generate(&self) -> bool {
        self.file_name.is_some() && !self.loading
    }
}

/// Work to run after a successful selection.
#[derive(Debug)]
pub struct PreviewTicket {
    pub epoch: u64,
    pub image: SelectedImage,
}

#[derive(Debug, Default)]
pub struct CaptionSession {
    image: Option<SelectedImage>,
    preview: Option<Arc<str>>,
    caption: String,
    loading: bool,
    error: Option<String>,
    drag_over: bool,
    epoch: u64,
    request_seq: u64,
    preview_task: Option<AbortHandle>,
    request_task: Option<AbortHandle>,
}

impl CaptionSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image(&self) -> Option<&SelectedImage> {
        self.image.as_ref()
    }

    pub fn preview(&self) -> Option<&str> {
        self.preview.as_deref()
    }

    pub fn caption(&self) -> &str {
        &self.caption
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_drag_over(&self) -> bool {
        self.drag_over
    }

    pub fn phase(&self) -> Phase {
        match (&self.image, self.caption.is_empty()) {
            (None, _) => Phase::Empty,
            (Some(_), true) => Phase::Previewing,
            (Some(_), false) => Phase::Captioned,
        }
    }

    /// Validates and stores a new image. A rejected file only sets the error
    /// message; the rest of the session is left as it was.
    pub fn select(&mut self, file: CandidateFile) -> Result<PreviewTicket, IntakeError> {
        let image = match SelectedImage::accept(file) {
            Ok(image) => image,
            Err(err) => {
                self.error = Some(err.to_string());
                return Err(err);
            }
        };

        self.supersede();
        self.image = Some(image.clone());
        self.preview = None;
        self.caption.clear();
        self.error = None;

        Ok(PreviewTicket {
            epoch: self.epoch,
            image,
        })
    }

    /// Returns `false` when the preview belongs to a superseded selection.
    pub fn apply_preview(&mut self, epoch: u64, uri: Arc<str>) -> bool {
        if epoch != self.epoch || self.image.is_none() {
            return false;
        }
        self.preview = Some(uri);
        self.preview_task = None;
        true
    }

    /// Records a file rejected before it reached [`select`](Self::select),
    /// such as an upload cut off by the body limit.
    pub fn reject(&mut self, err: &IntakeError) {
        self.error = Some(err.to_string());
    }

    pub fn drag_over(&mut self) {
        self.drag_over = true;
    }

    pub fn drag_leave(&mut self) {
        self.drag_over = false;
    }

    /// Ends the drag and returns the first dropped file, if any.
    pub fn take_drop(&mut self, files: Vec<CandidateFile>) -> Option<CandidateFile> {
        self.drag_over = false;
        files.into_iter().next()
    }

    /// Marks a request as started and returns its sequence number. `None`
    /// when there is no image or a request is already in flight.
    pub fn begin_generate(&mut self) -> Option<(u64, SelectedImage)> {
        let image = self.image.clone()?;
        if self.loading {
            return None;
        }
        self.loading = true;
        self.error = None;
        self.request_seq += 1;
        Some((self.request_seq, image))
    }

    /// Settles request `request`. A failure keeps whatever caption is already
    /// showing. Returns `false` when the request was superseded.
    pub fn finish_generate(&mut self, request: u64, outcome: Result<String, CaptionError>) -> bool {
        if request != self.request_seq || !self.loading {
            return false;
        }
        self.loading = false;
        self.request_task = None;
        match outcome {
            Ok(caption) => {
                self.caption = caption;
                self.error = None;
            }
            Err(_) => self.error = Some(GENERATE_FAILED_MESSAGE.to_string()),
        }
        true
    }

    /// A preview that could not be derived leaves nothing to caption, so the
    /// selection is dropped and the user asked for another file.
    pub fn fail_preview(&mut self, epoch: u64) -> bool {
        if epoch != self.epoch || self.image.is_none() {
            return false;
        }
        self.supersede();
        self.image = None;
        self.preview = None;
        self.caption.clear();
        self.error = Some(PREVIEW_FAILED_MESSAGE.to_string());
        true
    }

    pub fn track_preview(&mut self, epoch: u64, task: AbortHandle) {
        if epoch != self.epoch {
            task.abort();
            return;
        }
        if let Some(old) = self.preview_task.replace(task) {
            old.abort();
        }
    }

    /// Keeps the abort handle of the request in flight. A handle for a request
    /// that already settled or was superseded is aborted instead.
    pub fn track_request(&mut self, request: u64, task: AbortHandle) {
        if request != self.request_seq || !self.loading {
            task.abort();
            return;
        }
        self.request_task = Some(task);
    }

    pub fn export(&self) -> Option<CaptionExport> {
        CaptionExport::from_caption(&self.caption)
    }

    /// Back to Empty. Calling it again changes nothing further.
    pub fn reset(&mut self) {
        self.supersede();
        self.image = None;
        self.preview = None;
        self.caption.clear();
        self.error = None;
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            phase: self.phase(),
            file_name: self.image.as_ref().map(|i| i.name().to_string()),
            file_size: self.image.as_ref().map(SelectedImage::size),
            preview: self.preview.clone(),
            caption: self.caption.clone(),
            loading: self.loading,
            error: self.error.clone(),
            drag_over: self.drag_over,
            prompt: if self.drag_over { PROMPT_DRAGGING } else { PROMPT_IDLE },
        }
    }

    // Invalidates in-flight work. An aborted request can no longer clear the
    // loading flag itself, so it is cleared here.
    fn supersede(&mut self) {
        self.epoch += 1;
        self.request_seq += 1;
        if let Some(task) = self.preview_task.take() {
            task.abort();
        }
        if let Some(task) = self.request_task.take() {
            task.abort();
        }
        self.loading = false;
    }
}

/// Shared handle to the one session, cloned into every route and task.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<CaptionSession>>,
    views: Arc<watch::Sender<SessionView>>,
    client: CaptionClient,
}

impl SessionHandle {
    pub fn new(client: CaptionClient) -> Self {
        let session = CaptionSession::new();
        let (views, _) = watch::channel(session.view());
        Self {
            inner: Arc::new(Mutex::new(session)),
            views: Arc::new(views),
            client,
        }
    }

    pub fn client(&self) -> &CaptionClient {
        &self.client
    }

    pub fn view(&self) -> SessionView {
        self.lock().view()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.views.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, CaptionSession> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut CaptionSession) -> R) -> R {
        let mut session = self.lock();
        let out = f(&mut session);
        self.views.send_replace(session.view());
        out
    }

    /// Accepts a file and starts deriving its preview in the background.
    pub fn select(&self, file: CandidateFile) -> Result<(), IntakeError> {
        let name = file.name.clone();
        let ticket = self.mutate(|s| s.select(file)).inspect_err(|err| {
            tracing::warn!(file = %name, error = ?err, "rejected image");
        })?;
        tracing::info!(file = %name, bytes = ticket.image.size(), "📸 image selected");

        let epoch = ticket.epoch;
        let handle = self.clone();
        let task = tokio::spawn(async move {
            let Some(uri) = derive_preview(ticket.image).await else {
                tracing::error!(epoch, "preview derivation did not complete");
                handle.mutate(|s| s.fail_preview(epoch));
                return;
            };
            if !handle.mutate(|s| s.apply_preview(epoch, Arc::from(uri))) {
                tracing::debug!(epoch, "dropped stale preview");
            }
        });
        self.mutate(|s| s.track_preview(epoch, task.abort_handle()));
        Ok(())
    }

    pub fn reject(&self, err: &IntakeError) {
        tracing::warn!(error = ?err, "rejected upload");
        self.mutate(|s| s.reject(err));
    }

    pub fn drag_over(&self) {
        self.mutate(CaptionSession::drag_over);
    }

    pub fn drag_leave(&self) {
        self.mutate(CaptionSession::drag_leave);
    }

    /// Forwards the first dropped file to [`select`](Self::select). An empty
    /// drop only ends the drag.
    pub fn drop_files(&self, files: Vec<CandidateFile>) -> Result<(), IntakeError> {
        if files.len() > 1 {
            tracing::debug!(ignored = files.len() - 1, "using first dropped file only");
        }
        match self.mutate(|s| s.take_drop(files)) {
            Some(file) => self.select(file),
            None => Ok(()),
        }
    }

    /// Runs one captioning round trip. Returns once the request settles or is
    /// superseded by a new selection or reset. The session is settled by the
    /// request task itself, so dropping this future does not leave the
    /// session loading.
    pub async fn generate(&self) {
        let Some((request, image)) = self.mutate(CaptionSession::begin_generate) else {
            tracing::debug!("generate ignored: no image selected or request in flight");
            return;
        };

        let client = self.client.clone();
        let handle = self.clone();
        let task = tokio::spawn(async move {
            let outcome = client.caption(&image).await;
            if let Err(err) = &outcome {
                tracing::error!(error = %err, "❌ error generating caption");
            }
            if !handle.mutate(|s| s.finish_generate(request, outcome)) {
                tracing::debug!(request, "dropped stale caption result");
            }
        });
        self.mutate(|s| s.track_request(request, task.abort_handle()));

        match task.await {
            Ok(()) => {}
            Err(err) if err.is_cancelled() => {
                tracing::debug!(request, "caption request superseded");
            }
            Err(err) => {
                let err = CaptionError::TaskFailed(err.to_string());
                tracing::error!(error = %err, "❌ error generating caption");
                self.mutate(|s| s.finish_generate(request, Err(err)));
            }
        }
    }

    pub fn download(&self) -> Option<CaptionExport> {
        self.lock().export()
    }

    pub fn reset(&self) {
        self.mutate(CaptionSession::reset);
        tracing::info!("session reset");
    }

    /// Waits until the current selection has its preview. Returns `None` if
    /// the selection goes away first.
    pub async fn preview_ready(&self) -> Option<Arc<str>> {
        let mut views = self.subscribe();
        let view = views
            .wait_for(|v| v.preview.is_some() || v.file_name.is_none())
            .await
            .ok()?;
        view.preview.clone()
    }
}
