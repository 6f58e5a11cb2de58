//! Pageworks: page objects for browser UI tests
//!
//! Test code describes a web application as containers of named, lazily
//! located elements and talks to those instead of raw locator strings and
//! driver calls. Pageworks composes locators, polls for existence and
//! visibility while the page settles, and tracks the windows that links open.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    PAGEWORKS Architecture                        │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Container  │    │ Element /  │    │ Driver     │            │
//! │   │ (registry) │───►│ Collection │───►│ (external) │            │
//! │   │            │    │ / Widget   │    │            │            │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! │          │                                  ▲                   │
//! │          ▼                                  │                   │
//! │   ┌────────────────────────────────────────────┐                │
//! │   │ WebApp: session, timing, window tracker    │                │
//! │   └────────────────────────────────────────────┘                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use pageworks::prelude::*;
//!
//! let app = WebApp::new(driver, "https://example.org/app")?;
//! app.go_to()?;
//!
//! let home = Container::build(&app, "home", |c| {
//!     let search = Element::new_textbox(c, Strategy::Id, "q").set_label("search").set_required(true);
//!     c.put(search)?;
//!     Ok(())
//! })?;
//!
//! assert!(home.wait_until_visible(None)?);
//! home.element("search")?.send_keys("rust")?.submit()?;
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod checks;
mod collection;
mod config;
mod container;
mod driver;
mod element;
mod result;
mod strategy;
mod template;
mod unique;
mod wait;
mod webapp;
mod widget;

/// Tracing subscriber bootstrap
pub mod logging;

pub use checks::Appearance;
pub use collection::ElementCollection;
pub use config::{AppUrl, SessionConfig, ENV_DEFAULT_WAIT_MS, ENV_LINK_SETTLE_MS, ENV_POLL_INTERVAL_MS};
pub use container::{Container, PageObject, Registered};
pub use driver::{
    Driver, DriverError, DriverResult, MockDriver, MockNode, Node, Point, Size, WindowHandle,
};
pub use element::{Element, ElementKind};
pub use result::{CheckFailure, PageError, PageResult};
pub use strategy::{xpath_of, Locator, LocatorSpec, Strategy};
pub use template::{fill, placeholder_count, Content};
pub use unique::UniqueIds;
pub use wait::{
    poll_until, wait_for_state, WaitOptions, WaitResult, DEFAULT_LINK_SETTLE_MS,
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS,
};
pub use webapp::{GuardedDriver, SessionScope, WaitDelegate, WebApp, MAIN_WINDOW};
pub use widget::Widget;

/// Prelude for convenient imports
pub mod prelude {
    pub use super::checks::*;
    pub use super::collection::*;
    pub use super::config::*;
    pub use super::container::*;
    pub use super::driver::*;
    pub use super::element::*;
    pub use super::result::*;
    pub use super::strategy::*;
    pub use super::template::Content;
    pub use super::unique::*;
    pub use super::wait::{WaitOptions, WaitResult};
    pub use super::webapp::*;
    pub use super::widget::Widget;
}
