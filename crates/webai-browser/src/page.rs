//! A single browser page driven over a persistent CDP session.

use serde_json::{Value, json};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use webai_config::BrowserConfig;
use webai_core::{Result, WebAiError};

use crate::cdp::CdpSession;

/// A page (tab) the agent can navigate, inspect, click and capture.
pub struct Page {
    session: CdpSession,
    target_id: String,
    settle_timeout: Duration,
    navigation_timeout: Duration,
}

impl Page {
    /// Wrap a connected session. Enables the `Page` domain and applies the viewport.
    pub async fn open(
        session: CdpSession,
        target_id: impl Into<String>,
        config: &BrowserConfig,
    ) -> Result<Self> {
        let page = Self {
            session,
            target_id: target_id.into(),
            settle_timeout: Duration::from_millis(config.settle_timeout_ms),
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
        };
        page.session.send("Page.enable", json!({})).await?;
        page.set_viewport(
            config.viewport_width,
            config.viewport_height,
            config.device_scale_factor,
        )
        .await?;
        Ok(page)
    }

    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    pub fn session(&self) -> &CdpSession {
        &self.session
    }

    /// Emulate a fixed viewport size.
    pub async fn set_viewport(&self, width: u32, height: u32, scale: f64) -> Result<()> {
        self.session
            .send(
                "Emulation.setDeviceMetricsOverride",
                json!({
                    "width": width,
                    "height": height,
                    "deviceScaleFactor": scale,
                    "mobile": false,
                }),
            )
            .await?;
        debug!(width, height, scale, "viewport set");
        Ok(())
    }

    /// Navigate and wait for DOMContentLoaded.
    pub async fn navigate(&self, url: &str) -> Result<()> {
        info!(url, "navigating");
        let dom_ready = self.session.subscribe("Page.domContentEventFired");

        let result = self.session.send("Page.navigate", json!({ "url": url })).await?;
        if let Some(error_text) = result["errorText"].as_str()
            && !error_text.is_empty()
        {
            return Err(WebAiError::Navigation {
                url: url.to_string(),
                reason: error_text.to_string(),
            });
        }

        // Same-document navigations (fragment changes) carry no loaderId and
        // never fire DOMContentLoaded.
        if result.get("loaderId").is_none() {
            debug!(url, "same-document navigation");
            return Ok(());
        }

        match tokio::time::timeout(self.navigation_timeout, dom_ready).await {
            Ok(Ok(_)) => {
                debug!(url, "DOMContentLoaded");
                Ok(())
            }
            Ok(Err(_)) => Err(WebAiError::Navigation {
                url: url.to_string(),
                reason: "browser connection closed".into(),
            }),
            Err(_) => Err(WebAiError::Navigation {
                url: url.to_string(),
                reason: format!(
                    "DOMContentLoaded not reached within {}s",
                    self.navigation_timeout.as_secs()
                ),
            }),
        }
    }

    /// Wait for the `load` event or the settle timeout, whichever comes first.
    /// A page that has already loaded settles at once.
    pub async fn settle(&self) -> Result<()> {
        let load = self.session.subscribe("Page.loadEventFired");
        self.settle_with(load).await
    }

    /// Navigate, then settle. The `load` subscription is taken before
    /// navigating so a fast page cannot fire it unobserved.
    pub async fn navigate_and_settle(&self, url: &str) -> Result<()> {
        let load = self.session.subscribe("Page.loadEventFired");
        self.navigate(url).await?;
        self.settle_with(load).await
    }

    async fn settle_with(&self, load: oneshot::Receiver<Value>) -> Result<()> {
        let state = self.evaluate("document.readyState").await?;
        if state.as_str() == Some("complete") {
            debug!("page already loaded");
            return Ok(());
        }
        self.wait_for_load(load).await;
        Ok(())
    }

    /// Race an already-registered `load` subscription against the settle timeout.
    pub async fn wait_for_load(&self, load: oneshot::Receiver<Value>) {
        match tokio::time::timeout(self.settle_timeout, load).await {
            Ok(_) => debug!("load event fired"),
            Err(_) => debug!(
                timeout_ms = self.settle_timeout.as_millis() as u64,
                "settle timeout reached before load"
            ),
        }
    }

    /// Navigate and wait until the network has been idle, bounded by `timeout`.
    pub async fn navigate_network_idle(&self, url: &str, timeout: Duration) -> Result<()> {
        self.session
            .send("Page.setLifecycleEventsEnabled", json!({ "enabled": true }))
            .await?;
        let mut lifecycle = self.session.listen("Page.lifecycleEvent");

        self.navigate(url).await?;
        let frame = self.session.send("Page.getFrameTree", json!({})).await?;
        let loader_id = frame["frameTree"]["frame"]["loaderId"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        let idle = async {
            while let Some(event) = lifecycle.recv().await {
                if event["name"] == "networkIdle"
                    && (loader_id.is_empty() || event["loaderId"] == loader_id.as_str())
                {
                    return true;
                }
            }
            false
        };

        match tokio::time::timeout(timeout, idle).await {
            Ok(true) => debug!(url, "network idle"),
            Ok(false) => warn!(url, "lifecycle stream ended before network idle"),
            Err(_) => warn!(url, timeout_secs = timeout.as_secs(), "network idle timeout"),
        }
        Ok(())
    }

    /// Evaluate an expression and return its JSON value.
    pub async fn evaluate(&self, expression: &str) -> Result<Value> {
        let result = self
            .session
            .send(
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                }),
            )
            .await?;

        if let Some(details) = result.get("exceptionDetails") {
            let text = details["exception"]["description"]
                .as_str()
                .or_else(|| details["text"].as_str())
                .unwrap_or("unknown exception");
            return Err(WebAiError::Script(text.to_string()));
        }

        Ok(result["result"]["value"].clone())
    }

    /// Dispatch a real left-click at viewport coordinates.
    pub async fn click_at(&self, x: f64, y: f64) -> Result<()> {
        for (kind, button, count) in [
            ("mouseMoved", "none", 0),
            ("mousePressed", "left", 1),
            ("mouseReleased", "left", 1),
        ] {
            self.session
                .send(
                    "Input.dispatchMouseEvent",
                    json!({ "type": kind, "x": x, "y": y, "button": button, "clickCount": count }),
                )
                .await?;
        }
        debug!(x, y, "clicked");
        Ok(())
    }

    pub async fn current_url(&self) -> Result<String> {
        let v = self.evaluate("location.href").await?;
        Ok(v.as_str().unwrap_or_default().to_string())
    }

    pub async fn title(&self) -> Result<String> {
        let v = self.evaluate("document.title").await?;
        Ok(v.as_str().unwrap_or_default().to_string())
    }

    /// Capture a PNG and return it base64-encoded.
    pub async fn capture_png(&self, full_page: bool) -> Result<String> {
        let mut params = json!({ "format": "png" });

        if full_page {
            let metrics = self.session.send("Page.getLayoutMetrics", json!({})).await?;
            let width = metrics["cssContentSize"]["width"].as_f64().unwrap_or(1200.0);
            let height = metrics["cssContentSize"]["height"].as_f64().unwrap_or(1200.0);
            params["captureBeyondViewport"] = json!(true);
            params["clip"] = json!({
                "x": 0,
                "y": 0,
                "width": width,
                "height": height,
                "scale": 1,
            });
        }

        let result = self.session.send("Page.captureScreenshot", params).await?;
        match result["data"].as_str() {
            Some(data) if !data.is_empty() => Ok(data.to_string()),
            _ => Err(WebAiError::cdp(
                "Page.captureScreenshot",
                "screenshot returned empty data",
            )),
        }
    }

    pub async fn close(&self) {
        self.session.close().await;
    }
}
