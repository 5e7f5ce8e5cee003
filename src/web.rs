//! The captioning page and the JSON routes it drives the session through.

use std::path::Path;

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::client::IMAGE_FIELD;
use crate::config::MAX_IMAGE_BYTES;
use crate::error::IntakeError;
use crate::intake::{mime_for_path, CandidateFile};
use crate::session::{SessionHandle, SessionView};

/// Uploads above the intake limit still have to arrive whole so that intake
/// can reject them with the size message. Past this cap the body is cut off.
pub const UPLOAD_BODY_LIMIT: usize = 3 * MAX_IMAGE_BYTES as usize;

const PAGE: &str = include_str!("page.html");

#[derive(Debug, Deserialize)]
struct DragEvent {
    over: bool,
}

pub fn router(session: SessionHandle) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/state", get(state))
        .route("/api/select", post(select_image))
        .route("/api/drop", post(drop_image))
        .route("/api/drag", post(drag))
        .route("/api/generate", post(generate))
        .route("/api/reset", post(reset))
        .route("/api/caption.txt", get(download))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(session)
}

async fn index() -> Html<&'static str> {
    Html(PAGE)
}

async fn state(State(session): State<SessionHandle>) -> Json<SessionView> {
    Json(session.view())
}

async fn select_image(State(session): State<SessionHandle>, mut multipart: Multipart) -> Response {
    let file = match read_first_image(&mut multipart).await {
        Ok(file) => file,
        Err(err) => return upload_failed(&session, err),
    };

    // A picker change event without a file leaves the session untouched.
    let Some(file) = file else {
        return (StatusCode::BAD_REQUEST, Json(session.view())).into_response();
    };

    respond(&session, session.select(file))
}

async fn drop_image(State(session): State<SessionHandle>, mut multipart: Multipart) -> Response {
    let file = match read_first_image(&mut multipart).await {
        Ok(file) => file,
        Err(err) => {
            session.drag_leave();
            return upload_failed(&session, err);
        }
    };

    respond(&session, session.drop_files(file.into_iter().collect()))
}

async fn drag(State(session): State<SessionHandle>, Json(event): Json<DragEvent>) -> Json<SessionView> {
    if event.over {
        session.drag_over();
    } else {
        session.drag_leave();
    }
    Json(session.view())
}

async fn generate(State(session): State<SessionHandle>) -> Json<SessionView> {
    session.generate().await;
    Json(session.view())
}

async fn reset(State(session): State<SessionHandle>) -> Json<SessionView> {
    session.reset();
    Json(session.view())
}

async fn download(State(session): State<SessionHandle>) -> Response {
    match session.download() {
        Some(export) => (
            [
                (header::CONTENT_TYPE, format!("{}; charset=utf-8", export.mime)),
                (header::CONTENT_DISPOSITION, export.content_disposition()),
            ],
            export.contents,
        )
            .into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// Reads the first `image` part of the form. Anything after it is never
/// pulled off the wire, so it does not count against the body limit.
async fn read_first_image(multipart: &mut Multipart) -> Result<Option<CandidateFile>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let name = field.file_name().unwrap_or(IMAGE_FIELD).to_string();
        let mime = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| mime_for_path(Path::new(&name)));
        let bytes = field.bytes().await?;
        return Ok(Some(CandidateFile::new(name, mime, bytes)));
    }
    Ok(None)
}

fn respond(session: &SessionHandle, outcome: Result<(), IntakeError>) -> Response {
    let status = match outcome {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::UNPROCESSABLE_ENTITY,
    };
    (status, Json(session.view())).into_response()
}

fn upload_failed(session: &SessionHandle, err: MultipartError) -> Response {
    let status = err.status();
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        session.reject(&IntakeError::TooLarge {
            size: UPLOAD_BODY_LIMIT as u64,
        });
    } else {
        tracing::warn!(error = %err, "unreadable upload");
    }
    (status, Json(session.view())).into_response()
}
