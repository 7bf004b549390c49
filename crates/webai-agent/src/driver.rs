//! The page operations the agent loop needs, behind a trait so the loop
//! can run against a fake page in tests.

use async_trait::async_trait;
use std::path::PathBuf;
use webai_browser::{Page, annotate, resolve, screenshot};
use webai_core::{MessageContent, Result};

#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to `url` and wait for the page to settle.
    async fn open(&self, url: &str) -> Result<()>;

    /// Click the element labeled `label` and wait for the page to settle.
    /// Fails with `ElementNotFound` when no label matches.
    async fn click(&self, label: &str) -> Result<()>;

    /// Label the clickable elements. Returns how many got a label.
    async fn annotate(&self) -> Result<usize>;

    /// Capture the page and encode it for the model.
    async fn screenshot(&self) -> Result<MessageContent>;
}

/// [`PageDriver`] over a real browser page.
pub struct BrowserDriver {
    page: Page,
    images_dir: PathBuf,
}

impl BrowserDriver {
    pub fn new(page: Page, images_dir: impl Into<PathBuf>) -> Self {
        Self {
            page,
            images_dir: images_dir.into(),
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn into_page(self) -> Page {
        self.page
    }
}

#[async_trait]
impl PageDriver for BrowserDriver {
    async fn open(&self, url: &str) -> Result<()> {
        self.page.navigate_and_settle(url).await
    }

    async fn click(&self, label: &str) -> Result<()> {
        resolve::click_label(&self.page, label).await
    }

    async fn annotate(&self) -> Result<usize> {
        Ok(annotate::annotate(&self.page).await?.labeled_count())
    }

    async fn screenshot(&self) -> Result<MessageContent> {
        let path = screenshot::capture(&self.page, &self.images_dir, false).await?;
        screenshot::encode_image(&path).await
    }
}
