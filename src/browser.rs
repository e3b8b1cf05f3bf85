//! Chromium session management
//!
//! Owns the long-lived browser process for a run and adapts chromiumoxide
//! pages and elements to the [`crate::dom`] traits the adapters are written
//! against.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, BrowserConfig, Element as CdpElement, Page};
use futures::StreamExt;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use url::Url;

use crate::dom::{DomElement, DomError, Element, PageDom};

/// Profile directory, so platform sessions survive between runs.
const USER_DATA_DIR: &str = "strmlnk-data";

/// Listing pages keep fetching after the load event fires.
const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Grace period for data requests triggered by an in-page action.
const QUIESCE_DELAY: Duration = Duration::from_millis(1000);

/// Errors raised while launching or driving the browser
#[derive(Debug, Error)]
pub enum BrowserError {
    /// The launch configuration was rejected
    #[error("Failed to configure chromium launch: {0}")]
    Config(String),

    /// The browser process or its devtools connection failed
    #[error("Chromium session error: {0}")]
    Session(#[from] CdpError),
}

/// One long-lived chromium process, shared by every page in a run.
pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserSession {
    /// Launches chromium and starts draining its event stream.
    pub async fn launch(headless: bool) -> Result<Self, BrowserError> {
        let mut config = BrowserConfig::builder().user_data_dir(USER_DATA_DIR);
        if !headless {
            config = config.with_head();
        }
        let config = config.build().map_err(BrowserError::Config)?;

        let (browser, mut handler) = Browser::launch(config).await?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(error) = event {
                    debug!("browser event error: {error}");
                }
            }
        });

        Ok(Self { browser, handler })
    }

    /// Opens a fresh blank page.
    pub async fn new_page(&self) -> Result<SessionPage, BrowserError> {
        let page = self.browser.new_page("about:blank").await?;
        Ok(SessionPage { page })
    }

    /// Shuts the browser down and waits for the process to exit.
    pub async fn close(mut self) {
        if let Err(error) = self.browser.close().await {
            warn!("failed to close chromium cleanly: {error}");
        }
        let _ = self.browser.wait().await;
        self.handler.abort();
    }
}

/// A [`PageDom`] implementation backed by a live chromiumoxide page.
pub struct SessionPage {
    page: Page,
}

impl SessionPage {
    /// Closes the underlying browser tab.
    pub(crate) async fn close(self) {
        if let Err(error) = self.page.close().await {
            warn!("failed to close page: {error}");
        }
    }
}

fn command_error(error: CdpError) -> DomError {
    DomError::Command(error.to_string())
}

#[async_trait]
impl PageDom for SessionPage {
    async fn current_url(&self) -> Result<Url, DomError> {
        let url = self
            .page
            .url()
            .await
            .map_err(command_error)?
            .ok_or(DomError::NoUrl)?;
        Url::parse(&url).map_err(|_| DomError::NoUrl)
    }

    async fn navigate(&self, url: &str) -> Result<(), DomError> {
        self.page.goto(url).await.map_err(command_error)?;
        Ok(())
    }

    async fn wait_settled(&self) -> Result<(), DomError> {
        self.page
            .wait_for_navigation()
            .await
            .map_err(command_error)?;
        tokio::time::sleep(SETTLE_DELAY).await;
        Ok(())
    }

    async fn wait_quiesced(&self) -> Result<(), DomError> {
        tokio::time::sleep(QUIESCE_DELAY).await;
        Ok(())
    }

    async fn find(&self, selector: &str) -> Result<Element, DomError> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| DomError::NotFound(selector.to_string()))?;
        Ok(Box::new(SessionElement { element }))
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<Element>, DomError> {
        // A selector matching nothing is an empty harvest, not a failure
        let elements = self.page.find_elements(selector).await.unwrap_or_default();
        Ok(elements
            .into_iter()
            .map(|element| Box::new(SessionElement { element }) as Element)
            .collect())
    }
}

struct SessionElement {
    element: CdpElement,
}

#[async_trait]
impl DomElement for SessionElement {
    async fn attribute(&self, name: &str) -> Result<Option<String>, DomError> {
        self.element.attribute(name).await.map_err(command_error)
    }

    async fn text(&self) -> Result<String, DomError> {
        Ok(self
            .element
            .inner_text()
            .await
            .map_err(command_error)?
            .unwrap_or_default())
    }

    async fn click(&self) -> Result<(), DomError> {
        self.element.click().await.map_err(command_error)?;
        Ok(())
    }

    async fn scroll_into_view(&self) -> Result<(), DomError> {
        self.element
            .scroll_into_view()
            .await
            .map_err(command_error)?;
        Ok(())
    }

    async fn find(&self, selector: &str) -> Result<Element, DomError> {
        let element = self
            .element
            .find_element(selector)
            .await
            .map_err(|_| DomError::NotFound(selector.to_string()))?;
        Ok(Box::new(SessionElement { element }))
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<Element>, DomError> {
        let elements = self
            .element
            .find_elements(selector)
            .await
            .unwrap_or_default();
        Ok(elements
            .into_iter()
            .map(|element| Box::new(SessionElement { element }) as Element)
            .collect())
    }
}
