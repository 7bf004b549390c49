//! Saving page captures to disk and encoding them for the model.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::{Path, PathBuf};
use tracing::info;
use webai_core::{MessageContent, Result, WebAiError};

use crate::page::Page;

/// File name used for the agent's working screenshot.
pub const SCREENSHOT_FILE: &str = "screenshot.png";

/// Capture `page` to `<dir>/screenshot.png`, creating `dir` if needed.
pub async fn capture(page: &Page, dir: &Path, full_page: bool) -> Result<PathBuf> {
    let path = dir.join(SCREENSHOT_FILE);
    capture_to(page, &path, full_page).await?;
    Ok(path)
}

/// Capture `page` as PNG to an explicit `path`.
pub async fn capture_to(page: &Page, path: &Path, full_page: bool) -> Result<()> {
    let data = page.capture_png(full_page).await?;
    let bytes = STANDARD
        .decode(data.as_bytes())
        .map_err(|e| WebAiError::cdp("Page.captureScreenshot", format!("bad base64: {e}")))?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, &bytes).await?;

    info!(path = %path.display(), bytes = bytes.len(), full_page, "screenshot saved");
    Ok(())
}

/// MIME type for an image file, from its extension.
pub fn media_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

/// Read an image file and wrap it as a base64 image content block.
pub async fn encode_image(path: &Path) -> Result<MessageContent> {
    let media_type = media_type_for(path).ok_or_else(|| {
        WebAiError::Browser(format!("unsupported image type: {}", path.display()))
    })?;
    let bytes = tokio::fs::read(path).await?;
    Ok(MessageContent::Image {
        data: STANDARD.encode(&bytes),
        media_type: media_type.to_string(),
    })
}
