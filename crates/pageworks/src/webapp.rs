//! WebApp - the session and its window tracker
//!
//! A [`WebApp`] identifies the application under test and owns the browser
//! session: the driver, the entry URL, the timing configuration and the map
//! from logical window keys to driver window handles. Every window switch goes
//! through it; elements never touch window handles.
//!
//! ```text
//!   new()            go_to()                       go_to_link() on a labelled element
//!  ┌───────────┐    ┌───────────────────────┐     ┌────────────────────────────────┐
//!  │main_window│───►│close extras, re-seed  │────►│main_window, <label> (current)   │
//!  └───────────┘    │{main_window}, navigate│     └────────────────────────────────┘
//!                   └───────────────────────┘
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::SessionConfig;
use crate::driver::{Driver, Node, WindowHandle};
use crate::result::{PageError, PageResult};
use crate::strategy::Locator;
use crate::wait::WaitOptions;

/// The key locating the primary window
pub const MAIN_WINDOW: &str = "main_window";

/// Hook run before every node lookup, e.g. to wait for an application's
/// pending requests to drain
pub trait WaitDelegate: Send + Sync {
    /// Block until the page is ready for the next lookup
    fn wait(&self, driver: &dyn Driver) -> PageResult<()>;
}

impl<F> WaitDelegate for F
where
    F: Fn(&dyn Driver) -> PageResult<()> + Send + Sync,
{
    fn wait(&self, driver: &dyn Driver) -> PageResult<()> {
        self(driver)
    }
}

/// Anything elements can be constructed from: the session itself or a
/// container, whose session the element inherits
pub trait SessionScope {
    /// The session this scope belongs to
    fn session(&self) -> Arc<WebApp>;
}

impl SessionScope for Arc<WebApp> {
    fn session(&self) -> Arc<WebApp> {
        Arc::clone(self)
    }
}

#[derive(Debug)]
struct WindowState {
    windows: BTreeMap<String, WindowHandle>,
    current: Option<String>,
}

impl WindowState {
    fn seeded(main: WindowHandle) -> Self {
        Self {
            windows: BTreeMap::from([(MAIN_WINDOW.to_string(), main)]),
            current: None,
        }
    }
}

struct Settings {
    config: SessionConfig,
    wait_delegate: Option<Arc<dyn WaitDelegate>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The application under test and its browser session
pub struct WebApp {
    driver: Arc<dyn Driver>,
    url: String,
    settings: RwLock<Settings>,
    windows: Mutex<WindowState>,
}

impl fmt::Debug for WebApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebApp")
            .field("url", &self.url)
            .field("config", &self.config())
            .field("windows", &*lock(&self.windows))
            .finish_non_exhaustive()
    }
}

/// Schemes a session can be opened on
const SESSION_SCHEMES: [&str; 3] = ["http", "https", "file"];

/// Parse a session URL: http or https with a host, or a file URL
fn parse_session_url(url: &str) -> PageResult<Url> {
    let parsed = Url::parse(url)
        .map_err(|e| PageError::assertion(format!("invalid session url {url:?}: {e}")))?;
    if !SESSION_SCHEMES.contains(&parsed.scheme()) {
        return Err(PageError::assertion(format!(
            "session url needs an http, https or file scheme, not {:?}: {url:?}",
            parsed.scheme()
        )));
    }
    if parsed.scheme() != "file" && parsed.host_str().map_or(true, str::is_empty) {
        return Err(PageError::assertion(format!("session url has no host: {url:?}")));
    }
    Ok(parsed)
}

impl WebApp {
    /// Create a session with the default configuration
    pub fn new(driver: Arc<dyn Driver>, url: impl Into<String>) -> PageResult<Arc<Self>> {
        Self::with_config(driver, url, SessionConfig::default())
    }

    /// Create a session.
    ///
    /// The URL must parse as an `http` or `https` URL with a host, or as a
    /// `file` URL, and the driver must have exactly one window open.
    /// The driver's implicit wait is switched off; all waiting is explicit.
    pub fn with_config(
        driver: Arc<dyn Driver>,
        url: impl Into<String>,
        config: SessionConfig,
    ) -> PageResult<Arc<Self>> {
        let url = url.into();
        let parsed = parse_session_url(&url)?;

        driver.set_implicit_wait(Duration::ZERO)?;
        let handles = driver.window_handles()?;
        let [main] = handles.as_slice() else {
            return Err(PageError::assertion(format!(
                "expected exactly one open window, found {}",
                handles.len()
            )));
        };
        debug!(%url, scheme = parsed.scheme(), main = %main, "session created");

        Ok(Arc::new(Self {
            windows: Mutex::new(WindowState::seeded(main.clone())),
            driver,
            url,
            settings: RwLock::new(Settings {
                config,
                wait_delegate: None,
            }),
        }))
    }

    /// The application's entry URL
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Navigate to the entry URL, closing every window but the main one.
    ///
    /// # Panics
    ///
    /// When loading the page opens or closes top-level windows.
    #[instrument(skip(self), fields(url = %self.url))]
    pub fn go_to(&self) -> PageResult<&Self> {
        self.destroy_windows()?;
        self.use_window(MAIN_WINDOW)?;

        let before = self.driver.window_handles()?.len();
        self.driver.navigate(&self.url)?;
        let after = self.driver.window_handles()?.len();
        assert_eq!(
            before, after,
            "loading {} changed the number of open windows",
            self.url
        );
        Ok(self)
    }

    fn destroy_windows(&self) -> PageResult<()> {
        loop {
            let handles = self.driver.window_handles()?;
            let Some(last) = handles.last().filter(|_| handles.len() > 1) else {
                break;
            };
            debug!(handle = %last, "closing window");
            self.driver.switch_to_window(last)?;
            self.driver.close_window()?;
        }

        let main = self
            .driver
            .window_handles()?
            .into_iter()
            .next()
            .ok_or_else(|| PageError::assertion("every browser window was closed"))?;
        *lock(&self.windows) = WindowState::seeded(main);
        Ok(())
    }

    /// Map `key` to `handle`, replacing any previous mapping
    pub fn put_window(&self, key: impl Into<String>, handle: WindowHandle) -> &Self {
        let _ = lock(&self.windows).windows.insert(key.into(), handle);
        self
    }

    /// Make the window mapped by `key` the driver's context
    pub fn use_window(&self, key: &str) -> PageResult<&Self> {
        let handle = self
            .window_handle(key)
            .ok_or_else(|| PageError::not_found(format!("window key '{key}'")))?;
        self.driver.switch_to_window(&handle)?;
        lock(&self.windows).current = Some(key.to_string());
        Ok(self)
    }

    /// Keys of every tracked window, sorted
    #[must_use]
    pub fn get_windows(&self) -> Vec<String> {
        lock(&self.windows).windows.keys().cloned().collect()
    }

    /// Handle mapped by `key`
    #[must_use]
    pub fn window_handle(&self, key: &str) -> Option<WindowHandle> {
        lock(&self.windows).windows.get(key).cloned()
    }

    /// Key of the window last switched to through [`WebApp::use_window`]
    #[must_use]
    pub fn current_window(&self) -> Option<String> {
        lock(&self.windows).current.clone()
    }

    /// Smallest positive integer, as a string, not already used as a key
    #[must_use]
    pub fn next_window_key(&self) -> String {
        let state = lock(&self.windows);
        (1_u64..)
            .map(|n| n.to_string())
            .find(|key| !state.windows.contains_key(key))
            .unwrap_or_default()
    }

    /// Handles currently open in the browser
    pub fn open_handles(&self) -> PageResult<BTreeSet<WindowHandle>> {
        Ok(self.driver.window_handles()?.into_iter().collect())
    }

    /// Track a window opened since `before` was taken.
    ///
    /// When exactly one new handle exists it is registered under `key` (or
    /// [`WebApp::next_window_key`]) and switched to. Returns the key used.
    pub fn track_new_window(
        &self,
        before: &BTreeSet<WindowHandle>,
        key: Option<&str>,
    ) -> PageResult<Option<String>> {
        let after = self.open_handles()?;
        let opened: Vec<&WindowHandle> = after.difference(before).collect();
        match opened.as_slice() {
            [] => Ok(None),
            [handle] => {
                let key = key.map_or_else(|| self.next_window_key(), str::to_string);
                debug!(%key, handle = %handle, "tracking new window");
                self.put_window(key.clone(), (*handle).clone())
                    .use_window(&key)?;
                Ok(Some(key))
            }
            several => {
                warn!(count = several.len(), "several windows opened at once; none tracked");
                Ok(None)
            }
        }
    }

    /// Install the hook run before every node lookup
    pub fn set_wait_delegate(&self, delegate: Arc<dyn WaitDelegate>) -> &Self {
        self.settings_mut().wait_delegate = Some(delegate);
        self
    }

    /// Set the timeout used by waits that do not pass one
    pub fn set_default_wait(&self, wait: Duration) -> &Self {
        self.settings_mut().config.default_wait_ms = wait.as_millis() as u64;
        self
    }

    /// The timeout used by waits that do not pass one
    #[must_use]
    pub fn default_wait(&self) -> Duration {
        Duration::from_millis(self.config().default_wait_ms)
    }

    /// Current timing configuration
    #[must_use]
    pub fn config(&self) -> SessionConfig {
        self.settings().config
    }

    /// Guarded access to the driver for what the page-object API does not cover
    #[must_use]
    pub fn driver(&self) -> GuardedDriver {
        GuardedDriver {
            inner: Arc::clone(&self.driver),
        }
    }

    pub(crate) fn raw_driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    pub(crate) fn wait_options(&self, timeout: Option<Duration>) -> WaitOptions {
        self.config().wait_options(timeout)
    }

    /// Run the wait delegate, if any
    pub(crate) fn before_lookup(&self) -> PageResult<()> {
        let delegate = self.settings().wait_delegate.clone();
        match delegate {
            Some(delegate) => delegate.wait(self.driver.as_ref()),
            None => Ok(()),
        }
    }

    fn settings(&self) -> std::sync::RwLockReadGuard<'_, Settings> {
        self.settings.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn settings_mut(&self) -> std::sync::RwLockWriteGuard<'_, Settings> {
        self.settings.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Driver access handed out by [`WebApp::driver`].
///
/// Waiting is owned by the `wait_until_*` operations, so the implicit wait
/// cannot be changed through this handle.
#[derive(Clone)]
pub struct GuardedDriver {
    inner: Arc<dyn Driver>,
}

impl fmt::Debug for GuardedDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardedDriver").finish_non_exhaustive()
    }
}

impl GuardedDriver {
    /// Always fails with `UsageViolation`
    pub fn implicitly_wait(&self, _wait: Duration) -> PageResult<()> {
        Err(PageError::usage(
            "implicitly_wait is managed by the session; use the wait_until_* operations instead",
        ))
    }

    /// Load `url` in the current window
    pub fn navigate(&self, url: &str) -> PageResult<()> {
        Ok(self.inner.navigate(url)?)
    }

    /// Go back in the current window's history
    pub fn back(&self) -> PageResult<()> {
        Ok(self.inner.back()?)
    }

    /// Handles of every open window
    pub fn window_handles(&self) -> PageResult<Vec<WindowHandle>> {
        Ok(self.inner.window_handles()?)
    }

    /// Find a node with a raw locator
    pub fn find_node(&self, locator: &Locator) -> PageResult<Box<dyn Node>> {
        Ok(self.inner.find_node(locator)?)
    }

    /// Find every node matching a raw locator
    pub fn find_nodes(&self, locator: &Locator) -> PageResult<Vec<Box<dyn Node>>> {
        Ok(self.inner.find_nodes(locator)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::MockDriver;

    fn session() -> (MockDriver, Arc<WebApp>) {
        let mock = MockDriver::new();
        let app = WebApp::new(Arc::new(mock.clone()), "http://localhost/app").unwrap();
        (mock, app)
    }

    mod construction_tests {
        use super::*;

        #[test]
        fn test_new_seeds_main_window() {
            let (mock, app) = session();
            assert_eq!(app.get_windows(), vec![MAIN_WINDOW.to_string()]);
            assert_eq!(app.window_handle(MAIN_WINDOW), mock.current_handle());
            assert_eq!(app.current_window(), None);
        }

        #[test]
        fn test_new_disables_implicit_wait() {
            let (mock, _app) = session();
            assert_eq!(mock.implicit_wait(), Some(Duration::ZERO));
        }

        #[test]
        fn test_new_rejects_unusable_urls() {
            for url in [
                "localhost/app",
                "ftp://host",
                "//host/path",
                "",
                "localhost:8080",
                "ab12:nothing",
                "mailto:me@x.org",
                "http:",
                "https://",
            ] {
                let err = WebApp::new(Arc::new(MockDriver::new()), url).unwrap_err();
                assert!(matches!(err, PageError::AssertionFailed { .. }), "{url}");
            }
            assert!(WebApp::new(Arc::new(MockDriver::new()), "file:///tmp/index.html").is_ok());
            assert!(WebApp::new(Arc::new(MockDriver::new()), "https://example.org").is_ok());
        }

        #[test]
        fn test_new_requires_single_window() {
            let mock = MockDriver::new();
            let _ = mock.open_window();
            let err = WebApp::new(Arc::new(mock), "http://localhost").unwrap_err();
            assert!(err.to_string().contains("exactly one open window"));
        }
    }

    mod window_tests {
        use super::*;

        #[test]
        fn test_use_window_unknown_key() {
            let (_mock, app) = session();
            let err = app.use_window("popup").unwrap_err();
            assert!(err.is_not_found());
        }

        #[test]
        fn test_put_and_use_window() {
            let (mock, app) = session();
            let popup = mock.open_window();
            app.put_window("popup", popup.clone()).use_window("popup").unwrap();
            assert_eq!(mock.current_handle(), Some(popup));
            assert_eq!(app.current_window().as_deref(), Some("popup"));
        }

        #[test]
        fn test_next_window_key_is_pure() {
            let (mock, app) = session();
            assert_eq!(app.next_window_key(), "1");
            assert_eq!(app.next_window_key(), "1");
            app.put_window("1", mock.open_window());
            app.put_window("3", mock.open_window());
            assert_eq!(app.next_window_key(), "2");
            app.put_window("2", mock.open_window());
            assert_eq!(app.next_window_key(), "4");
        }

        #[test]
        fn test_track_new_window_single() {
            let (mock, app) = session();
            let before = app.open_handles().unwrap();
            let popup = mock.open_window();
            let key = app.track_new_window(&before, None).unwrap();
            assert_eq!(key.as_deref(), Some("1"));
            assert_eq!(app.window_handle("1"), Some(popup.clone()));
            assert_eq!(mock.current_handle(), Some(popup));
        }

        #[test]
        fn test_track_new_window_ignores_several() {
            let (mock, app) = session();
            let before = app.open_handles().unwrap();
            let _ = mock.open_window();
            let _ = mock.open_window();
            assert_eq!(app.track_new_window(&before, Some("help")).unwrap(), None);
            assert_eq!(app.get_windows(), vec![MAIN_WINDOW.to_string()]);
        }
    }

    mod go_to_tests {
        use super::*;

        #[test]
        fn test_go_to_navigates_main_window() {
            let (mock, app) = session();
            app.go_to().unwrap();
            assert_eq!(mock.current_url().as_deref(), Some("http://localhost/app"));
            assert_eq!(app.current_window().as_deref(), Some(MAIN_WINDOW));
        }

        #[test]
        fn test_go_to_closes_extra_windows() {
            let (mock, app) = session();
            let main = mock.current_handle().unwrap();
            app.put_window("a", mock.open_window());
            app.put_window("b", mock.open_window());
            app.go_to().unwrap();

            assert_eq!(mock.window_count(), 1);
            assert_eq!(app.get_windows(), vec![MAIN_WINDOW.to_string()]);
            assert_eq!(app.window_handle(MAIN_WINDOW), Some(main));
            assert_eq!(mock.call_count("close:"), 2);
            assert!(mock.history().contains(&"close:window-2".to_string()));
        }

        #[test]
        #[should_panic(expected = "changed the number of open windows")]
        fn test_go_to_panics_when_page_opens_window() {
            let (mock, app) = session();
            mock.spawn_window_on_navigate(true);
            let _ = app.go_to();
        }
    }

    mod settings_tests {
        use super::*;
        use std::sync::atomic::{AtomicUsize, Ordering};

        #[test]
        fn test_default_wait() {
            let (_mock, app) = session();
            assert_eq!(app.default_wait(), Duration::from_secs(10));
            app.set_default_wait(Duration::from_millis(1500));
            assert_eq!(app.default_wait(), Duration::from_millis(1500));
            assert_eq!(app.wait_options(None).timeout(), Duration::from_millis(1500));
        }

        #[test]
        fn test_wait_delegate_runs_before_lookup() {
            let (_mock, app) = session();
            let calls = Arc::new(AtomicUsize::new(0));
            let counter = Arc::clone(&calls);
            app.set_wait_delegate(Arc::new(move |_: &dyn Driver| {
                let _ = counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }));
            app.before_lookup().unwrap();
            app.before_lookup().unwrap();
            assert_eq!(calls.load(Ordering::SeqCst), 2);
        }

        #[test]
        fn test_guarded_driver_rejects_implicit_wait() {
            let (mock, app) = session();
            let err = app.driver().implicitly_wait(Duration::from_secs(5)).unwrap_err();
            assert!(matches!(err, PageError::UsageViolation { .. }));
            assert_eq!(mock.implicit_wait(), Some(Duration::ZERO));

            app.driver().navigate("http://localhost/other").unwrap();
            assert!(mock.was_called("navigate:http://localhost/other"));
        }
    }
}
