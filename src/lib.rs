//! # Image Caption Client
//!
//! A thin client for an external image captioning service. The user picks or
//! drops an image, sees a local preview, asks the service for a caption and
//! can download the caption as `image-caption.txt`.
//!
//! - `intake`: type and size validation of candidate files
//! - `preview`: data URI previews derived off the async workers
//! - `client`: the multipart `POST` to the captioning endpoint
//! - `export`: the caption as a plain-text download
//! - `session`: the session state machine and its cancellable tasks
//! - `web`: the page and the routes that drive the session

pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod intake;
pub mod preview;
pub mod session;
pub mod web;

pub use client::CaptionClient;
pub use config::ClientConfig;
pub use error::{CaptionError, ConfigError, IntakeError};
pub use export::CaptionExport;
pub use intake::{CandidateFile, SelectedImage};
pub use session::{CaptionSession, Phase, SessionHandle, SessionView};
