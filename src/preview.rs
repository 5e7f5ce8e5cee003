use base64::{engine::general_purpose, Engine as _};

use crate::intake::SelectedImage;

pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, general_purpose::STANDARD.encode(bytes))
}

/// Encodes the image off the async workers. A 10 MiB image is ~14 MiB of
/// base64, which would otherwise stall the page server.
pub async fn derive_preview(image: SelectedImage) -> Option<String> {
    tokio::task::spawn_blocking(move || data_uri(image.mime(), image.bytes()))
        .await
        .ok()
}
