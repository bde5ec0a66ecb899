//! Element locators
//!
//! Finds elements by text, ARIA role and accessible name, or CSS selector
//! filtered by text. Each probe is a single script evaluation that returns
//! every match with its visibility, so waiting is just re-probing.

use std::time::Duration;

use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::Page;
use serde::{Deserialize, Serialize};
use tokio::time::{sleep, Instant};

use crate::core::{DashcheckError, Result};

/// Attribute used to hand a probed element over to CDP input dispatch
const REF_ATTR: &str = "data-dashcheck-ref";

const PROBE_SCRIPT: &str = r#"(spec) => {
  const norm = (s) => (s || '').replace(/\s+/g, ' ').trim();
  const fold = (s) => norm(s).toLowerCase();
  const textOf = (el) => el.textContent || '';

  const implicitRole = (el) => {
    const explicit = (el.getAttribute('role') || '').trim().split(/\s+/)[0];
    if (explicit) return explicit;
    const tag = el.tagName.toLowerCase();
    if (tag === 'button') return 'button';
    if (tag === 'a' && el.hasAttribute('href')) return 'link';
    if (/^h[1-6]$/.test(tag)) return 'heading';
    if (tag === 'select') return 'combobox';
    if (tag === 'textarea') return 'textbox';
    if (tag === 'input') {
      const type = (el.getAttribute('type') || 'text').toLowerCase();
      if (['button', 'submit', 'reset', 'image'].includes(type)) return 'button';
      if (type === 'checkbox') return 'checkbox';
      if (type === 'radio') return 'radio';
      return 'textbox';
    }
    return null;
  };

  const accessibleName = (el) => {
    const labelledBy = el.getAttribute('aria-labelledby');
    if (labelledBy) {
      const parts = labelledBy.split(/\s+/)
        .map((id) => document.getElementById(id))
        .filter(Boolean)
        .map(textOf);
      if (parts.length) return norm(parts.join(' '));
    }
    const label = el.getAttribute('aria-label');
    if (label && norm(label)) return norm(label);
    if (el.tagName.toLowerCase() === 'input' && el.value) return norm(el.value);
    const text = norm(textOf(el));
    if (text) return text;
    return norm(el.getAttribute('title'));
  };

  const isVisible = (el) => {
    const style = window.getComputedStyle(el);
    if (style.visibility === 'hidden' || style.visibility === 'collapse') return false;
    const rect = el.getBoundingClientRect();
    return rect.width > 0 && rect.height > 0;
  };

  let found = [];
  const q = spec.query;
  if (q.kind === 'text') {
    const needle = fold(q.text);
    const skip = new Set(['SCRIPT', 'STYLE', 'NOSCRIPT', 'TEMPLATE']);
    const all = Array.from(document.body ? document.body.querySelectorAll('*') : [])
      .filter((el) => !skip.has(el.tagName) && fold(textOf(el)).includes(needle));
    found = all.filter((el) => !all.some((other) => other !== el && el.contains(other)));
  } else if (q.kind === 'role') {
    const nameMatches = (name) =>
      q.exact ? name === norm(q.name) : fold(name).includes(fold(q.name));
    found = Array.from(document.querySelectorAll('*'))
      .filter((el) => implicitRole(el) === q.role && nameMatches(accessibleName(el)));
  } else if (q.kind === 'css') {
    found = Array.from(document.querySelectorAll(q.selector));
    if (q.has_text != null) {
      const needle = fold(q.has_text);
      found = found.filter((el) => fold(textOf(el)).includes(needle));
    }
  }

  if (spec.mark) {
    document.querySelectorAll('[' + spec.attr + ']').forEach((el) => el.removeAttribute(spec.attr));
  }
  return found.map((el, i) => {
    if (spec.mark) el.setAttribute(spec.attr, String(i));
    return {
      tag: el.tagName.toLowerCase(),
      role: implicitRole(el),
      name: accessibleName(el).slice(0, 120),
      visible: isVisible(el),
      reference: i,
    };
  });
}"#;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Query {
    Text { text: String },
    Role { role: String, name: String, exact: bool },
    Css { selector: String, has_text: Option<String> },
}

/// One element found by a probe
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ElementMatch {
    /// Lowercase tag name
    pub tag: String,
    /// Explicit or implicit ARIA role
    #[serde(default)]
    pub role: Option<String>,
    /// Accessible name (truncated)
    #[serde(default)]
    pub name: String,
    /// Rendered with a non-empty box and not visibility:hidden
    pub visible: bool,
    /// Index within the probe result
    pub reference: usize,
}

/// Visibility of a locator at one point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// No element matched
    NotFound,
    /// Elements matched but none is visible
    Hidden(usize),
    /// At least one match is visible
    Visible,
}

impl Visibility {
    /// Summarise a probe result
    pub fn of(matches: &[ElementMatch]) -> Self {
        if matches.is_empty() {
            Visibility::NotFound
        } else if matches.iter().any(|m| m.visible) {
            Visibility::Visible
        } else {
            Visibility::Hidden(matches.len())
        }
    }
}

impl std::fmt::Display for Visibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Visibility::NotFound => write!(f, "not found"),
            Visibility::Hidden(n) => write!(f, "hidden ({} matches)", n),
            Visibility::Visible => write!(f, "visible"),
        }
    }
}

/// A way to find elements on the page
#[derive(Debug, Clone, PartialEq)]
pub struct Locator {
    query: Query,
}

impl Locator {
    /// Innermost elements whose text contains `text` (case-insensitive)
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            query: Query::Text { text: text.into() },
        }
    }

    /// Elements with ARIA `role` whose accessible name contains `name`
    ///
    /// Icons and chevrons inside a button end up in its name, so the default
    /// is a case-insensitive substring match; see [`Locator::exact`].
    pub fn role(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            query: Query::Role {
                role: role.into(),
                name: name.into(),
                exact: false,
            },
        }
    }

    /// Require the accessible name to equal the given name
    pub fn exact(self) -> Self {
        match self.query {
            Query::Role { role, name, .. } => Self {
                query: Query::Role {
                    role,
                    name,
                    exact: true,
                },
            },
            other => Self { query: other },
        }
    }

    /// Elements matching a CSS selector
    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            query: Query::Css {
                selector: selector.into(),
                has_text: None,
            },
        }
    }

    /// Narrow a CSS locator to elements containing `text`
    pub fn has_text(self, text: impl Into<String>) -> Self {
        match self.query {
            Query::Css { selector, .. } => Self {
                query: Query::Css {
                    selector,
                    has_text: Some(text.into()),
                },
            },
            other => Self { query: other },
        }
    }

    fn script(&self, mark: bool) -> Result<String> {
        let spec = serde_json::json!({
            "query": self.query,
            "mark": mark,
            "attr": REF_ATTR,
        });
        Ok(format!("({})({})", PROBE_SCRIPT, serde_json::to_string(&spec)?))
    }

    async fn evaluate(&self, page: &Page, mark: bool) -> Result<Vec<ElementMatch>> {
        let params = EvaluateParams::builder()
            .expression(self.script(mark)?)
            .return_by_value(true)
            .build()
            .map_err(DashcheckError::browser)?;
        let result = page.evaluate_expression(params).await?;
        Ok(result.into_value()?)
    }

    /// Poll until a match is visible or `timeout` elapses
    ///
    /// Returns the last observed visibility on timeout. Probe errors while the
    /// page is still loading count as "not found".
    async fn poll_visible(
        &self,
        page: &Page,
        timeout: Duration,
        poll: Duration,
        mark: bool,
    ) -> std::result::Result<ElementMatch, Visibility> {
        let deadline = Instant::now() + timeout;
        loop {
            let last = match self.evaluate(page, mark).await {
                Ok(matches) => {
                    if let Some(m) = matches.iter().find(|m| m.visible) {
                        return Ok(m.clone());
                    }
                    Visibility::of(&matches)
                }
                Err(e) => {
                    tracing::debug!(locator = %self, error = %e, "probe failed");
                    Visibility::NotFound
                }
            };

            let now = Instant::now();
            if now >= deadline {
                return Err(last);
            }
            sleep(poll.min(deadline - now)).await;
        }
    }

    /// Wait for a visible match; a miss is a timeout
    pub async fn wait_visible(
        &self,
        page: &Page,
        timeout: Duration,
        poll: Duration,
    ) -> Result<ElementMatch> {
        self.poll_visible(page, timeout, poll, false)
            .await
            .map_err(|_| DashcheckError::timeout(self.to_string(), timeout.as_millis() as u64))
    }

    /// Expect a visible match; a miss is an assertion failure
    pub async fn expect_visible(
        &self,
        page: &Page,
        timeout: Duration,
        poll: Duration,
    ) -> Result<ElementMatch> {
        let found = self
            .poll_visible(page, timeout, poll, false)
            .await
            .map_err(|actual| {
                DashcheckError::assertion(self.to_string(), "visible", actual.to_string())
            })?;
        tracing::info!(locator = %self, tag = %found.tag, "visible");
        Ok(found)
    }

    /// Current visibility, from a single probe
    pub async fn visibility(&self, page: &Page) -> Result<Visibility> {
        Ok(Visibility::of(&self.evaluate(page, false).await?))
    }

    /// Expect no visible match right now; a visible one is an assertion failure
    pub async fn expect_hidden(&self, page: &Page) -> Result<Visibility> {
        let visibility = self.visibility(page).await?;
        if visibility == Visibility::Visible {
            return Err(DashcheckError::assertion(
                self.to_string(),
                "hidden",
                visibility.to_string(),
            ));
        }
        tracing::debug!(locator = %self, %visibility, "not visible");
        Ok(visibility)
    }

    /// Click the first visible match with real mouse input
    pub async fn click(&self, page: &Page, timeout: Duration, poll: Duration) -> Result<()> {
        let target = self
            .poll_visible(page, timeout, poll, true)
            .await
            .map_err(|_| DashcheckError::timeout(self.to_string(), timeout.as_millis() as u64))?;

        let selector = format!("[{}=\"{}\"]", REF_ATTR, target.reference);
        page.find_element(selector).await?.click().await?;
        tracing::info!(locator = %self, "clicked");
        Ok(())
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.query {
            Query::Text { text } => write!(f, "text={}", text),
            Query::Role { role, name, exact } => {
                let suffix = if *exact { "s" } else { "i" };
                write!(f, "role={}[name=\"{}\"{}]", role, name, suffix)
            }
            Query::Css {
                selector,
                has_text: Some(text),
            } => write!(f, "{}:has-text(\"{}\")", selector, text),
            Query::Css { selector, .. } => write!(f, "{}", selector),
        }
    }
}
