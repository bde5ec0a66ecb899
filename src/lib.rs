//! dashcheck - Dashboard Smoke Check
//!
//! Drives headless Chromium against a locally running progress dashboard,
//! answers its data request from a fixed fixture and checks that the
//! unfiltered issue list and the display settings menu render.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, and error handling
//! - **Fixture**: The mocked dashboard payload and its invariants
//! - **Browser**: Chromium session, request interception, and locators
//! - **Verify**: The scenario runner
//!
//! # Usage
//!
//! ```rust,no_run
//! use dashcheck::{Config, Verifier};
//!
//! #[tokio::main]
//! async fn main() -> dashcheck::Result<()> {
//!     let report = Verifier::new(Config::default())?.run().await?;
//!     println!("{:?}", report.screenshot);
//!     Ok(())
//! }
//! ```

pub mod browser;
pub mod core;
pub mod fixture;
pub mod verify;

// Re-export commonly used items
pub use core::{Config, DashcheckError, Result};
pub use fixture::DashboardPayload;
pub use verify::Verifier;
