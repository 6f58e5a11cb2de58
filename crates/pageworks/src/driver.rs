//! Driver - the browser automation boundary
//!
//! Everything pageworks knows about a browser goes through [`Driver`] and
//! [`Node`]. Implement them over whatever automation client the test suite
//! uses (WebDriver, CDP, an in-process DOM). [`MockDriver`] is a scripted,
//! in-memory implementation for unit tests.
//!
//! ```text
//! ┌──────────────┐   Locator    ┌──────────────┐   Box<dyn Node>
//! │ Element /    │─────────────►│ Driver       │──────────────────►  click, text, size, ...
//! │ Collection   │              │ (external)   │
//! └──────────────┘              └──────────────┘
//! ┌──────────────┐  handles / switch / close
//! │ WebApp       │─────────────►  window context
//! └──────────────┘
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::strategy::Locator;

/// Result type for driver calls
pub type DriverResult<T> = Result<T, DriverError>;

/// Failures a driver must be able to tell apart
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// No node matched the locator
    #[error("no such element: {locator}")]
    NoSuchElement {
        /// The locator that matched nothing
        locator: String,
    },

    /// The node was detached from the document after it was found
    #[error("stale element reference: {locator}")]
    StaleElement {
        /// Locator the node was found with
        locator: String,
    },

    /// The window handle is unknown or closed
    #[error("no such window: {handle}")]
    NoSuchWindow {
        /// The handle
        handle: String,
    },

    /// Anything else
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },
}

/// Driver-assigned identifier of a browser window or tab
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowHandle(pub String);

impl WindowHandle {
    /// Wrap a raw handle
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    /// The raw handle
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Top-left position of a node, in CSS pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate
    pub x: i64,
    /// Y coordinate
    pub y: i64,
}

impl Point {
    /// Create a new point
    #[must_use]
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// Rendered size of a node, in CSS pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    /// Width
    pub width: i64,
    /// Height
    pub height: i64,
}

impl Size {
    /// Create a new size
    #[must_use]
    pub const fn new(width: i64, height: i64) -> Self {
        Self { width, height }
    }
}

/// A live handle to one node of the remote document
pub trait Node: Send + Sync {
    /// Click the node
    fn click(&self) -> DriverResult<()>;
    /// Type text into the node
    fn send_keys(&self, text: &str) -> DriverResult<()>;
    /// Clear an editable node
    fn clear(&self) -> DriverResult<()>;
    /// Submit the form the node belongs to
    fn submit(&self) -> DriverResult<()>;
    /// Whether the node is rendered visibly
    fn is_displayed(&self) -> DriverResult<bool>;
    /// Whether the node is enabled
    fn is_enabled(&self) -> DriverResult<bool>;
    /// Whether the node is selected/checked
    fn is_selected(&self) -> DriverResult<bool>;
    /// Visible text
    fn text(&self) -> DriverResult<String>;
    /// Attribute or property value
    fn attribute(&self, name: &str) -> DriverResult<Option<String>>;
    /// Lowercase tag name
    fn tag_name(&self) -> DriverResult<String>;
    /// Position
    fn location(&self) -> DriverResult<Point>;
    /// Size
    fn size(&self) -> DriverResult<Size>;
    /// Computed CSS property value
    fn css_value(&self, property: &str) -> DriverResult<Option<String>>;
}

/// Session-level browser automation primitives
pub trait Driver: Send + Sync {
    /// Find the first node matching `locator`; `NoSuchElement` when none
    fn find_node(&self, locator: &Locator) -> DriverResult<Box<dyn Node>>;

    /// Find every node matching `locator`, in document order (possibly empty)
    fn find_nodes(&self, locator: &Locator) -> DriverResult<Vec<Box<dyn Node>>>;

    /// Load `url` in the current window
    fn navigate(&self, url: &str) -> DriverResult<()>;

    /// Go back in the current window's history
    fn back(&self) -> DriverResult<()>;

    /// Handles of every open window, in the order they were opened
    fn window_handles(&self) -> DriverResult<Vec<WindowHandle>>;

    /// Make `handle` the window subsequent calls operate on
    fn switch_to_window(&self, handle: &WindowHandle) -> DriverResult<()>;

    /// Close the current window
    fn close_window(&self) -> DriverResult<()>;

    /// Configure the driver's built-in implicit wait
    fn set_implicit_wait(&self, wait: Duration) -> DriverResult<()>;
}

// =============================================================================
// MOCK DRIVER
// =============================================================================

/// Scripted node definition for [`MockDriver`]
#[derive(Debug, Clone)]
pub struct MockNode {
    tag_name: String,
    text: String,
    attributes: HashMap<String, String>,
    css: HashMap<String, String>,
    displayed: bool,
    enabled: bool,
    selected: bool,
    location: Point,
    size: Size,
    present_after: Option<Duration>,
    removed_after: Option<Duration>,
    shown_after: Option<Duration>,
    hidden_after: Option<Duration>,
    toggles_on_click: bool,
    opens_window: Option<Vec<(Locator, MockNode)>>,
    detached: bool,
}

impl MockNode {
    /// A visible, enabled node with the given tag
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            text: String::new(),
            attributes: HashMap::new(),
            css: HashMap::new(),
            displayed: true,
            enabled: true,
            selected: false,
            location: Point::default(),
            size: Size::new(100, 25),
            present_after: None,
            removed_after: None,
            shown_after: None,
            hidden_after: None,
            toggles_on_click: false,
            opens_window: None,
            detached: false,
        }
    }

    /// Set the visible text
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set a computed CSS value
    #[must_use]
    pub fn css(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.css.insert(property.into(), value.into());
        self
    }

    /// Render the node hidden
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    /// Render the node disabled
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Set the selection state
    #[must_use]
    pub const fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    /// Set the position
    #[must_use]
    pub const fn at(mut self, x: i64, y: i64) -> Self {
        self.location = Point::new(x, y);
        self
    }

    /// Set the size
    #[must_use]
    pub const fn sized(mut self, width: i64, height: i64) -> Self {
        self.size = Size::new(width, height);
        self
    }

    /// Only match lookups once `delay` has passed since the node was added
    #[must_use]
    pub const fn present_after(mut self, delay: Duration) -> Self {
        self.present_after = Some(delay);
        self
    }

    /// Stop matching lookups once `delay` has passed since the node was added
    #[must_use]
    pub const fn removed_after(mut self, delay: Duration) -> Self {
        self.removed_after = Some(delay);
        self
    }

    /// Report displayed only once `delay` has passed
    #[must_use]
    pub const fn shown_after(mut self, delay: Duration) -> Self {
        self.shown_after = Some(delay);
        self
    }

    /// Report hidden once `delay` has passed
    #[must_use]
    pub const fn hidden_after(mut self, delay: Duration) -> Self {
        self.hidden_after = Some(delay);
        self
    }

    /// Flip the selection state on every click (checkbox behaviour)
    #[must_use]
    pub const fn toggles_on_click(mut self) -> Self {
        self.toggles_on_click = true;
        self
    }

    /// Open a new window containing `nodes` when clicked
    #[must_use]
    pub fn opens_window(mut self, nodes: Vec<(Locator, MockNode)>) -> Self {
        self.opens_window = Some(nodes);
        self
    }
}

#[derive(Debug)]
struct MockEntry {
    locator: Locator,
    node: Arc<Mutex<MockNode>>,
    added: Instant,
}

impl MockEntry {
    fn is_present(&self) -> bool {
        let elapsed = self.added.elapsed();
        let node = lock(&self.node);
        node.present_after.map_or(true, |d| elapsed >= d)
            && node.removed_after.map_or(true, |d| elapsed < d)
    }
}

#[derive(Debug)]
struct MockWindow {
    handle: WindowHandle,
    url: Option<String>,
    entries: Vec<MockEntry>,
}

impl MockWindow {
    fn new(handle: WindowHandle) -> Self {
        Self {
            handle,
            url: None,
            entries: Vec::new(),
        }
    }
}

#[derive(Debug)]
struct MockState {
    windows: Vec<MockWindow>,
    current: Option<WindowHandle>,
    next_window: usize,
    implicit_wait: Option<Duration>,
    stale_reads: usize,
    spawn_window_on_navigate: bool,
    call_history: Vec<String>,
}

impl MockState {
    fn open_window(&mut self) -> WindowHandle {
        let handle = WindowHandle(format!("window-{}", self.next_window));
        self.next_window += 1;
        self.windows.push(MockWindow::new(handle.clone()));
        handle
    }

    fn window_mut(&mut self, handle: &WindowHandle) -> DriverResult<&mut MockWindow> {
        self.windows
            .iter_mut()
            .find(|w| &w.handle == handle)
            .ok_or_else(|| DriverError::NoSuchWindow {
                handle: handle.to_string(),
            })
    }

    fn current_window(&self) -> DriverResult<&MockWindow> {
        let handle = self.current.as_ref().ok_or_else(|| DriverError::NoSuchWindow {
            handle: "<closed>".to_string(),
        })?;
        self.windows
            .iter()
            .find(|w| &w.handle == handle)
            .ok_or_else(|| DriverError::NoSuchWindow {
                handle: handle.to_string(),
            })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory driver with per-window documents and scripted timing.
///
/// Cloning a `MockDriver` yields another handle to the same browser, so a
/// test can keep one clone for scripting while the session owns another.
#[derive(Debug, Clone)]
pub struct MockDriver {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDriver {
    /// A browser with a single, empty window
    #[must_use]
    pub fn new() -> Self {
        let mut state = MockState {
            windows: Vec::new(),
            current: None,
            next_window: 0,
            implicit_wait: None,
            stale_reads: 0,
            spawn_window_on_navigate: false,
            call_history: Vec::new(),
        };
        let main = state.open_window();
        state.current = Some(main);
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        lock(&self.state)
    }

    /// Add a node to the first (main) window
    pub fn add_node(&self, locator: Locator, node: MockNode) {
        let mut state = self.state();
        if let Some(window) = state.windows.first_mut() {
            window.entries.push(MockEntry {
                locator,
                node: Arc::new(Mutex::new(node)),
                added: Instant::now(),
            });
        }
    }

    /// Add a node to a specific window
    pub fn add_node_in(&self, handle: &WindowHandle, locator: Locator, node: MockNode) -> DriverResult<()> {
        let mut state = self.state();
        state.window_mut(handle)?.entries.push(MockEntry {
            locator,
            node: Arc::new(Mutex::new(node)),
            added: Instant::now(),
        });
        Ok(())
    }

    /// Remove every node matching `locator` from every window
    pub fn remove_nodes(&self, locator: &Locator) {
        let mut state = self.state();
        for window in &mut state.windows {
            for entry in window.entries.iter().filter(|e| &e.locator == locator) {
                lock(&entry.node).detached = true;
            }
            window.entries.retain(|e| &e.locator != locator);
        }
    }

    /// Make the next `count` node reads fail with `StaleElement`
    pub fn fail_reads_stale(&self, count: usize) {
        self.state().stale_reads = count;
    }

    /// Make navigation open an extra window (a misbehaving page)
    pub fn spawn_window_on_navigate(&self, spawn: bool) {
        self.state().spawn_window_on_navigate = spawn;
    }

    /// Open a window directly, as a page script would
    pub fn open_window(&self) -> WindowHandle {
        self.state().open_window()
    }

    /// Handle of the current window, if it has not been closed
    #[must_use]
    pub fn current_handle(&self) -> Option<WindowHandle> {
        self.state().current.clone()
    }

    /// URL last navigated to in the current window
    #[must_use]
    pub fn current_url(&self) -> Option<String> {
        self.state().current_window().ok().and_then(|w| w.url.clone())
    }

    /// Number of open windows
    #[must_use]
    pub fn window_count(&self) -> usize {
        self.state().windows.len()
    }

    /// Implicit wait last configured
    #[must_use]
    pub fn implicit_wait(&self) -> Option<Duration> {
        self.state().implicit_wait
    }

    /// Call history for verification
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.state().call_history.clone()
    }

    /// Check if a call starting with `method` was made
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.state().call_history.iter().any(|c| c.starts_with(method))
    }

    /// Number of calls starting with `method`
    #[must_use]
    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_history
            .iter()
            .filter(|c| c.starts_with(method))
            .count()
    }

    fn matching(&self, locator: &Locator) -> DriverResult<Vec<(Arc<Mutex<MockNode>>, Instant)>> {
        let mut state = self.state();
        state.call_history.push(format!("find:{locator}"));
        let window = state.current_window()?;
        Ok(window
            .entries
            .iter()
            .filter(|e| &e.locator == locator && e.is_present())
            .map(|e| (Arc::clone(&e.node), e.added))
            .collect())
    }

    fn handle_for(&self, locator: &Locator, (node, added): (Arc<Mutex<MockNode>>, Instant)) -> Box<dyn Node> {
        Box::new(MockNodeHandle {
            locator: locator.to_string(),
            node,
            added,
            browser: Arc::clone(&self.state),
        })
    }
}

impl Driver for MockDriver {
    fn find_node(&self, locator: &Locator) -> DriverResult<Box<dyn Node>> {
        let node = self
            .matching(locator)?
            .into_iter()
            .next()
            .ok_or_else(|| DriverError::NoSuchElement {
                locator: locator.to_string(),
            })?;
        Ok(self.handle_for(locator, node))
    }

    fn find_nodes(&self, locator: &Locator) -> DriverResult<Vec<Box<dyn Node>>> {
        Ok(self
            .matching(locator)?
            .into_iter()
            .map(|node| self.handle_for(locator, node))
            .collect())
    }

    fn navigate(&self, url: &str) -> DriverResult<()> {
        let mut state = self.state();
        state.call_history.push(format!("navigate:{url}"));
        let handle = state.current.clone().ok_or_else(|| DriverError::NoSuchWindow {
            handle: "<closed>".to_string(),
        })?;
        state.window_mut(&handle)?.url = Some(url.to_string());
        if state.spawn_window_on_navigate {
            let _ = state.open_window();
        }
        Ok(())
    }

    fn back(&self) -> DriverResult<()> {
        self.state().call_history.push("back".to_string());
        Ok(())
    }

    fn window_handles(&self) -> DriverResult<Vec<WindowHandle>> {
        Ok(self.state().windows.iter().map(|w| w.handle.clone()).collect())
    }

    fn switch_to_window(&self, handle: &WindowHandle) -> DriverResult<()> {
        let mut state = self.state();
        state.call_history.push(format!("switch:{handle}"));
        let _ = state.window_mut(handle)?;
        state.current = Some(handle.clone());
        Ok(())
    }

    fn close_window(&self) -> DriverResult<()> {
        let mut state = self.state();
        let handle = state.current.take().ok_or_else(|| DriverError::NoSuchWindow {
            handle: "<closed>".to_string(),
        })?;
        state.call_history.push(format!("close:{handle}"));
        state.windows.retain(|w| w.handle != handle);
        Ok(())
    }

    fn set_implicit_wait(&self, wait: Duration) -> DriverResult<()> {
        let mut state = self.state();
        state.call_history.push(format!("implicit_wait:{}", wait.as_millis()));
        state.implicit_wait = Some(wait);
        Ok(())
    }
}

struct MockNodeHandle {
    locator: String,
    node: Arc<Mutex<MockNode>>,
    added: Instant,
    browser: Arc<Mutex<MockState>>,
}

impl MockNodeHandle {
    fn stale(&self) -> DriverError {
        DriverError::StaleElement {
            locator: self.locator.clone(),
        }
    }

    /// Run `f` against the node; stale once detached or when a stale read was scripted
    fn read<T>(&self, f: impl FnOnce(&mut MockNode) -> T) -> DriverResult<T> {
        {
            let mut browser = lock(&self.browser);
            if browser.stale_reads > 0 {
                browser.stale_reads -= 1;
                return Err(self.stale());
            }
        }
        let elapsed = self.added.elapsed();
        let mut node = lock(&self.node);
        if node.detached || node.removed_after.is_some_and(|d| elapsed >= d) {
            return Err(self.stale());
        }
        Ok(f(&mut node))
    }
}

impl Node for MockNodeHandle {
    fn click(&self) -> DriverResult<()> {
        let opens = self.read(|node| {
            if node.toggles_on_click {
                node.selected = !node.selected;
            }
            node.opens_window.clone()
        })?;

        let mut browser = lock(&self.browser);
        browser.call_history.push(format!("click:{}", self.locator));
        if let Some(nodes) = opens {
            let handle = browser.open_window();
            let window = browser.window_mut(&handle)?;
            for (locator, node) in nodes {
                window.entries.push(MockEntry {
                    locator,
                    node: Arc::new(Mutex::new(node)),
                    added: Instant::now(),
                });
            }
        }
        Ok(())
    }

    fn send_keys(&self, text: &str) -> DriverResult<()> {
        self.read(|node| {
            let value = node.attributes.entry("value".to_string()).or_default();
            value.push_str(text);
        })?;
        lock(&self.browser)
            .call_history
            .push(format!("send_keys:{}:{text}", self.locator));
        Ok(())
    }

    fn clear(&self) -> DriverResult<()> {
        self.read(|node| {
            let _ = node.attributes.insert("value".to_string(), String::new());
        })?;
        lock(&self.browser)
            .call_history
            .push(format!("clear:{}", self.locator));
        Ok(())
    }

    fn submit(&self) -> DriverResult<()> {
        lock(&self.browser)
            .call_history
            .push(format!("submit:{}", self.locator));
        Ok(())
    }

    fn is_displayed(&self) -> DriverResult<bool> {
        let elapsed = self.added.elapsed();
        self.read(|node| {
            node.displayed
                && node.shown_after.map_or(true, |d| elapsed >= d)
                && node.hidden_after.map_or(true, |d| elapsed < d)
        })
    }

    fn is_enabled(&self) -> DriverResult<bool> {
        self.read(|node| node.enabled)
    }

    fn is_selected(&self) -> DriverResult<bool> {
        self.read(|node| node.selected)
    }

    fn text(&self) -> DriverResult<String> {
        self.read(|node| node.text.clone())
    }

    fn attribute(&self, name: &str) -> DriverResult<Option<String>> {
        self.read(|node| node.attributes.get(name).cloned())
    }

    fn tag_name(&self) -> DriverResult<String> {
        self.read(|node| node.tag_name.clone())
    }

    fn location(&self) -> DriverResult<Point> {
        self.read(|node| node.location)
    }

    fn size(&self) -> DriverResult<Size> {
        self.read(|node| node.size)
    }

    fn css_value(&self, property: &str) -> DriverResult<Option<String>> {
        self.read(|node| node.css.get(property).cloned())
    }
}
