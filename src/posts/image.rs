//! Image intake for the post form
//!
//! Images are stored inline in the post document as `data:` URLs.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use log::debug;
use std::path::Path;

use crate::error::Error;

/// Media type for a file, judged by its extension
pub fn media_type_for(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    let media_type = match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "avif" => "image/avif",
        "ico" => "image/x-icon",
        _ => return None,
    };
    Some(media_type)
}

/// Encode raw image bytes as a `data:` URL
pub fn encode_data_url(bytes: &[u8], media_type: &str) -> String {
    format!("data:{};base64,{}", media_type, BASE64.encode(bytes))
}

/// Validate and encode in-memory image bytes
pub fn encode_image(bytes: &[u8], media_type: &str, max_bytes: usize) -> Result<String, Error> {
    if !media_type.starts_with("image/") {
        return Err(Error::image(format!("{} is not an image type", media_type)));
    }
    check_size(bytes.len() as u64, max_bytes)?;
    Ok(encode_data_url(bytes, media_type))
}

/// Read an image file fully and encode it as a `data:` URL
pub async fn read_image_file(path: &Path, max_bytes: usize) -> Result<String, Error> {
    let media_type = media_type_for(path)
        .ok_or_else(|| Error::image(format!("{} is not a supported image", path.display())))?;

    let metadata = tokio::fs::metadata(path).await?;
    check_size(metadata.len(), max_bytes)?;

    let bytes = tokio::fs::read(path).await?;
    // the file may have grown since the metadata call
    check_size(bytes.len() as u64, max_bytes)?;

    debug!("read {} bytes of {} from {}", bytes.len(), media_type, path.display());
    Ok(encode_data_url(&bytes, media_type))
}

fn check_size(len: u64, max_bytes: usize) -> Result<(), Error> {
    if len > max_bytes as u64 {
        return Err(Error::image(format!(
            "image is {} bytes, the limit is {} bytes",
            len, max_bytes
        )));
    }
    Ok(())
}
