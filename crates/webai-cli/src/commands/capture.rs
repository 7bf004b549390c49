use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use webai_browser::{BrowserManager, annotate, screenshot};
use webai_config::WebAiConfig;

/// Upper bound for the network to go quiet before a full-page capture.
const NETWORK_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Navigate, settle, label and capture the viewport.
pub(super) async fn cmd_browse(
    config: WebAiConfig,
    url: String,
    out: Option<PathBuf>,
) -> webai_core::Result<()> {
    let dir = out.unwrap_or_else(|| config.browser.images_dir.clone());
    let mut browser = BrowserManager::new(config.browser);

    let result = async {
        let page = browser.new_page().await?;
        page.navigate_and_settle(&url).await?;
        let annotation = annotate::annotate(&page).await?;
        let path = screenshot::capture(&page, &dir, false).await?;
        if let Err(e) = browser.close_page(page).await {
            warn!(error = %e, "failed to close tab");
        }
        Ok::<_, webai_core::WebAiError>((annotation, path))
    }
    .await;
    browser.shutdown().await;
    let (annotation, path) = result?;

    println!(
        "✅ {} of {} elements labeled",
        annotation.labeled_count(),
        annotation.candidates.len()
    );
    for label in annotation.labels() {
        println!("   \x1b[90m•\x1b[0m {label}");
    }
    println!("📸 {}", path.display());
    Ok(())
}

/// Full-page capture at a fixed viewport once the network is idle.
pub(super) async fn cmd_screen(
    mut config: WebAiConfig,
    url: String,
    out: PathBuf,
    width: u32,
    height: u32,
) -> webai_core::Result<()> {
    config.browser.viewport_width = width;
    config.browser.viewport_height = height;
    let mut browser = BrowserManager::new(config.browser);

    let result = async {
        let page = browser.new_page().await?;
        page.navigate_network_idle(&url, NETWORK_IDLE_TIMEOUT).await?;
        screenshot::capture_to(&page, &out, true).await?;
        if let Err(e) = browser.close_page(page).await {
            warn!(error = %e, "failed to close tab");
        }
        Ok::<_, webai_core::WebAiError>(())
    }
    .await;
    browser.shutdown().await;
    result?;

    println!("📸 {}", out.display());
    Ok(())
}
