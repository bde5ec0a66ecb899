//! Request interception
//!
//! Pauses matching requests with the CDP Fetch domain and answers them from
//! memory, so the page never reaches the real backend for that endpoint.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, DisableParams, EnableParams, EventRequestPaused,
    FulfillRequestParams, HeaderEntry, RequestId, RequestPattern, RequestStage,
};
use chromiumoxide::Page;
use futures::StreamExt;
use regex::Regex;
use tokio::task::JoinHandle;

use crate::core::{DashcheckError, Result};

/// URL glob in the style of browser test runners
///
/// `**` matches anything, `*` matches anything but `/`, `{a,b}` matches
/// either alternative. Every other character is literal.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    glob: String,
    regex: Regex,
}

impl RoutePattern {
    /// Compile a glob
    pub fn new(glob: impl Into<String>) -> Result<Self> {
        let glob = glob.into();
        let regex = Regex::new(&glob_to_regex(&glob)?)
            .map_err(|e| DashcheckError::config(format!("invalid route glob '{}': {}", glob, e)))?;
        Ok(Self { glob, regex })
    }

    /// The glob as written
    pub fn as_str(&self) -> &str {
        &self.glob
    }

    /// Whether a full request URL matches
    pub fn matches(&self, url: &str) -> bool {
        self.regex.is_match(url)
    }

    /// Coarser CDP `urlPattern` that pauses a superset of matching requests
    pub fn cdp_url_pattern(&self) -> String {
        let mut out = String::with_capacity(self.glob.len());
        let mut in_group = false;
        for c in self.glob.chars() {
            match c {
                '{' => {
                    in_group = true;
                    push_wildcard(&mut out);
                }
                '}' => in_group = false,
                _ if in_group => {}
                '*' => push_wildcard(&mut out),
                '?' | '\\' => {
                    out.push('\\');
                    out.push(c);
                }
                _ => out.push(c),
            }
        }
        out
    }
}

impl std::fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.glob)
    }
}

fn push_wildcard(out: &mut String) {
    if !out.ends_with('*') {
        out.push('*');
    }
}

fn glob_to_regex(glob: &str) -> Result<String> {
    let chars: Vec<char> = glob.chars().collect();
    let mut out = String::from("^");
    let mut in_group = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '*' if chars.get(i + 1) == Some(&'*') => {
                if chars.get(i + 2) == Some(&'/') {
                    out.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    out.push_str(".*");
                    i += 2;
                }
                continue;
            }
            '*' => out.push_str("[^/]*"),
            '{' if !in_group => {
                in_group = true;
                out.push_str("(?:");
            }
            '}' if in_group => {
                in_group = false;
                out.push(')');
            }
            ',' if in_group => out.push('|'),
            _ => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }

    if in_group {
        return Err(DashcheckError::config(format!(
            "unclosed '{{' in route glob '{}'",
            glob
        )));
    }
    out.push('$');
    Ok(out)
}

/// Synthetic response served for an intercepted request
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub content_type: String,
    pub body: String,
}

impl MockResponse {
    /// 200 response with an `application/json` body
    pub fn json(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            content_type: "application/json".to_string(),
            body: body.into(),
        }
    }

    fn fulfill(&self, request_id: RequestId) -> Result<FulfillRequestParams> {
        FulfillRequestParams::builder()
            .request_id(request_id)
            .response_code(i64::from(self.status))
            .response_headers(vec![
                HeaderEntry::new("Content-Type", self.content_type.clone()),
                HeaderEntry::new("Content-Length", self.body.len().to_string()),
            ])
            .body(BASE64.encode(self.body.as_bytes()))
            .build()
            .map_err(DashcheckError::browser)
    }
}

/// An installed interception rule on one page
pub struct DataRoute {
    page: Page,
    pattern: RoutePattern,
    hits: Arc<AtomicUsize>,
    task: Option<JoinHandle<()>>,
}

impl DataRoute {
    /// Start answering requests matching `pattern` with `response`
    pub async fn install(
        page: &Page,
        pattern: RoutePattern,
        response: MockResponse,
    ) -> Result<Self> {
        // Subscribe before enabling so no paused request is missed
        let mut paused = page.event_listener::<EventRequestPaused>().await?;

        let enable = EnableParams::builder()
            .patterns(vec![RequestPattern::builder()
                .url_pattern(pattern.cdp_url_pattern())
                .request_stage(RequestStage::Request)
                .build()])
            .build();
        page.execute(enable).await?;

        let hits = Arc::new(AtomicUsize::new(0));
        let task = tokio::spawn({
            let page = page.clone();
            let pattern = pattern.clone();
            let hits = Arc::clone(&hits);
            async move {
                while let Some(event) = paused.next().await {
                    if let Err(e) = answer(&page, &pattern, &response, &event, &hits).await {
                        tracing::warn!(
                            url = %event.request.url,
                            error = %e,
                            "failed to answer paused request"
                        );
                    }
                }
            }
        });

        tracing::info!(pattern = %pattern, "data route installed");
        Ok(Self {
            page: page.clone(),
            pattern,
            hits,
            task: Some(task),
        })
    }

    /// Number of requests answered so far
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// The glob this route answers
    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    /// Stop intercepting
    pub async fn uninstall(mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.page.execute(DisableParams::default()).await?;
        Ok(())
    }
}

impl Drop for DataRoute {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn answer(
    page: &Page,
    pattern: &RoutePattern,
    response: &MockResponse,
    event: &EventRequestPaused,
    hits: &AtomicUsize,
) -> Result<()> {
    let url = &event.request.url;
    if pattern.matches(url) {
        page.execute(response.fulfill(event.request_id.clone())?).await?;
        let n = hits.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(%url, hits = n, "fulfilled from fixture");
    } else {
        page.execute(ContinueRequestParams::new(event.request_id.clone())).await?;
        tracing::trace!(%url, "continued");
    }
    Ok(())
}
