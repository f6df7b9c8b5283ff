//! Image encoding: image file → base64 payload wrapped in `ImageData`.
//!
//! VLM APIs accept images as base64 data embedded in the JSON request body.
//! The file bytes are sent unchanged (no re-encoding), so a user's JPEG stays
//! a JPEG and a rendered page stays a lossless PNG.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use std::path::Path;
use tracing::debug;

/// MIME type for an image path, from its extension.
pub fn mime_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "image/png",
    }
}

/// Encode raw image bytes ready for the VLM API.
///
/// `detail: "high"` lets GPT-4-class models tile the image at full
/// resolution; small subscripts and table rules vanish at `low`.
pub fn encode_bytes(bytes: &[u8], mime_type: &str) -> ImageData {
    let b64 = STANDARD.encode(bytes);
    debug!("Encoded image → {} bytes base64", b64.len());
    ImageData::new(b64, mime_type).with_detail("high")
}

/// Read and encode an image file.
pub async fn encode_file(path: &Path) -> std::io::Result<ImageData> {
    let bytes = tokio::fs::read(path).await?;
    Ok(encode_bytes(&bytes, mime_type_for(path)))
}
