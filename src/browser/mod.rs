//! Browser automation module
//!
//! Drives headless Chromium over the DevTools protocol.

mod locator;
mod route;
mod session;

pub use locator::{ElementMatch, Locator, Visibility};
pub use route::{DataRoute, MockResponse, RoutePattern};
pub use session::BrowserSession;
