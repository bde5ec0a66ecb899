//! Browser session - owns the Chromium process for one run
//!
//! Launches headless Chromium over CDP, opens an isolated browser context
//! and a page inside it, and tears all of it down on `close`.

use std::path::{Path, PathBuf};

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::core::config::BrowserSettings;
use crate::core::{DashcheckError, Result};

/// A launched browser with one page in its own context
pub struct BrowserSession {
    browser: Option<Browser>,
    handler: Option<JoinHandle<()>>,
    context: Option<BrowserContextId>,
    page: Page,
    settings: BrowserSettings,
}

impl BrowserSession {
    /// Whether a Chrome/Chromium executable can be found
    pub fn is_available(settings: &BrowserSettings) -> bool {
        match &settings.executable {
            Some(path) => path.exists(),
            None => BrowserConfig::builder().build().is_ok(),
        }
    }

    fn browser_config(settings: &BrowserSettings) -> Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .window_size(settings.window_width, settings.window_height)
            .viewport(Viewport {
                width: settings.window_width,
                height: settings.window_height,
                ..Viewport::default()
            })
            .request_timeout(settings.request_timeout())
            .launch_timeout(settings.launch_timeout());

        if settings.headed {
            builder = builder.with_head();
        }
        if settings.no_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(path) = &settings.executable {
            builder = builder.chrome_executable(path);
        }

        builder.build().map_err(DashcheckError::launch)
    }

    /// Launch the browser, create an isolated context and open a blank page
    pub async fn launch(settings: &BrowserSettings) -> Result<Self> {
        let config = Self::browser_config(settings)?;

        let (browser, mut handler) = timeout(settings.launch_timeout(), Browser::launch(config))
            .await
            .map_err(|_| {
                DashcheckError::launch(format!(
                    "browser did not start within {}ms",
                    settings.launch_timeout_ms
                ))
            })?
            .map_err(|e| DashcheckError::launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "cdp handler event error");
                }
            }
            tracing::debug!("cdp handler finished");
        });

        let session = Self::open_page(browser, handler, settings.clone()).await?;
        tracing::info!(headed = settings.headed, "browser launched");
        Ok(session)
    }

    async fn open_page(
        browser: Browser,
        handler: JoinHandle<()>,
        settings: BrowserSettings,
    ) -> Result<Self> {
        let context = match browser.execute(CreateBrowserContextParams::default()).await {
            Ok(resp) => resp.result.browser_context_id.clone(),
            Err(e) => {
                Self::shutdown(browser, handler, None).await;
                return Err(DashcheckError::launch(format!(
                    "failed to create browser context: {}",
                    e
                )));
            }
        };

        let params = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context.clone())
            .build()
            .map_err(DashcheckError::browser)?;

        match browser.new_page(params).await {
            Ok(page) => Ok(Self {
                browser: Some(browser),
                handler: Some(handler),
                context: Some(context),
                page,
                settings,
            }),
            Err(e) => {
                Self::shutdown(browser, handler, Some(context)).await;
                Err(DashcheckError::launch(format!("failed to open page: {}", e)))
            }
        }
    }

    /// The page under test
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Navigate the page, bounded by the request timeout
    pub async fn goto(&self, url: &str) -> Result<()> {
        let bound = self.settings.request_timeout();
        match timeout(bound, self.page.goto(url)).await {
            Err(_) => Err(DashcheckError::navigation(format!(
                "{} did not load within {}ms",
                url, self.settings.request_timeout_ms
            ))),
            Ok(Err(e)) => Err(DashcheckError::navigation(format!("{}: {}", url, e))),
            Ok(Ok(_)) => {
                tracing::info!(url, "navigated");
                Ok(())
            }
        }
    }

    /// Write a full-page PNG screenshot, creating parent directories
    pub async fn screenshot(&self, path: &Path) -> Result<PathBuf> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(true)
            .build();
        let bytes = self.page.save_screenshot(params, path).await?;

        tracing::info!(path = %path.display(), bytes = bytes.len(), "screenshot written");
        Ok(path.to_path_buf())
    }

    /// Dispose the context and close the browser
    ///
    /// Safe to call more than once. Errors are logged, never returned, so a
    /// failing close cannot hide the outcome of the run.
    pub async fn close(&mut self) {
        if let (Some(browser), Some(handler)) = (self.browser.take(), self.handler.take()) {
            Self::shutdown(browser, handler, self.context.take()).await;
        }
    }

    async fn shutdown(
        mut browser: Browser,
        handler: JoinHandle<()>,
        context: Option<BrowserContextId>,
    ) {
        if let Some(context) = context {
            if let Err(e) = browser
                .execute(DisposeBrowserContextParams::new(context))
                .await
            {
                tracing::debug!(error = %e, "failed to dispose browser context");
            }
        }

        if let Err(e) = browser.close().await {
            tracing::warn!(error = %e, "failed to close browser");
        }
        if let Err(e) = browser.wait().await {
            tracing::warn!(error = %e, "failed to wait for browser exit");
        }

        handler.abort();
        let _ = handler.await;
        tracing::info!("browser closed");
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        // chromiumoxide kills the child process when the Browser drops
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_explicit_executable_is_unavailable() {
        let settings = BrowserSettings {
            executable: Some(PathBuf::from("/nonexistent/chrome-for-dashcheck")),
            ..BrowserSettings::default()
        };
        assert!(!BrowserSession::is_available(&settings));
    }
}
