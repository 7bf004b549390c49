//! # webai-browser
//!
//! Drives a Chrome/Chromium page over the DevTools Protocol: launches or
//! attaches to a browser, labels clickable elements with `gpt-link-text`,
//! clicks them by label and captures screenshots.
//!
//! ```text
//!   BrowserManager            ← owns the browser process
//!       │
//!       ├── BrowserInstance   ← launched or attached, /json endpoints
//!       │
//!       └── Page              ← one persistent CdpSession per tab
//!             ├── annotate    ← label clickable elements
//!             ├── resolve     ← click by label
//!             └── screenshot  ← capture + encode
//! ```

pub mod annotate;
pub mod cdp;
pub mod launcher;
pub mod page;
pub mod resolve;
pub mod screenshot;

pub use annotate::{Annotation, Candidate, LABEL_ATTRIBUTE};
pub use cdp::{CdpClient, CdpSession, TabInfo};
pub use launcher::BrowserInstance;
pub use page::Page;

use std::time::Duration;
use tracing::{info, warn};
use webai_config::BrowserConfig;
use webai_core::{Result, WebAiError};

/// Owns the browser and hands out pages.
pub struct BrowserManager {
    config: BrowserConfig,
    instance: Option<BrowserInstance>,
    /// The launch tab has been handed out already.
    initial_tab_used: bool,
}

impl BrowserManager {
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            config,
            instance: None,
            initial_tab_used: false,
        }
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.instance.is_some()
    }

    /// Ensure a browser is available: attach when `reuse_existing`, otherwise launch.
    async fn ensure_browser(&mut self) -> Result<&BrowserInstance> {
        if self.instance.is_none() {
            let inst = if self.config.reuse_existing {
                match BrowserInstance::connect(self.config.port).await {
                    Ok(inst) => inst,
                    Err(e) => {
                        warn!(error = %e, port = self.config.port, "no browser to attach to, launching");
                        BrowserInstance::launch(&self.config).await?
                    }
                }
            } else {
                BrowserInstance::launch(&self.config).await?
            };
            self.instance = Some(inst);
        }
        self.instance
            .as_ref()
            .ok_or_else(|| WebAiError::Browser("browser not running".into()))
    }

    /// Open a page session with the configured viewport applied.
    pub async fn new_page(&mut self) -> Result<Page> {
        let reuse_initial = !self.initial_tab_used;
        let browser = self.ensure_browser().await?;

        let mut tab = None;
        if reuse_initial && browser.is_launched() {
            tab = browser
                .cdp()
                .list_tabs()
                .await?
                .into_iter()
                .find(|t| t.url == "about:blank" && t.ws_url.is_some());
        }
        let tab = match tab {
            Some(t) => t,
            None => browser.cdp().new_tab("about:blank").await?,
        };
        self.initial_tab_used = true;

        let ws_url = tab
            .ws_url
            .as_deref()
            .ok_or_else(|| WebAiError::Browser(format!("tab {} has no WebSocket URL", tab.id)))?;
        let session =
            CdpSession::connect(ws_url, Duration::from_secs(self.config.command_timeout_secs))
                .await?;
        let page = Page::open(session, tab.id.clone(), &self.config).await?;

        info!(
            tab = %tab.id,
            width = self.config.viewport_width,
            height = self.config.viewport_height,
            "page ready"
        );
        Ok(page)
    }

    /// Close a page's session and its tab.
    pub async fn close_page(&mut self, page: Page) -> Result<()> {
        page.close().await;
        if let Some(ref inst) = self.instance {
            inst.cdp().close_tab(page.target_id()).await?;
        }
        Ok(())
    }

    /// Stop a launched browser. Attached browsers keep running.
    pub async fn shutdown(&mut self) {
        if let Some(mut inst) = self.instance.take() {
            inst.shutdown().await;
        }
        self.initial_tab_used = false;
    }
}
