//! Element - a named, lazily resolved handle to one node
//!
//! An [`Element`] never holds a driver node between calls. Every operation
//! re-resolves it: the session's wait delegate runs, the locator is composed
//! (through the parent chain when there is one) and the driver is asked for
//! the first match. Operations are therefore safe across page mutations at
//! the cost of one lookup per call.
//!
//! ```ignore
//! let form = container.put(Element::new(container, Strategy::Id, "login-form").set_label("form"))?;
//! let name = Element::new_textbox(container, Strategy::XPath, "/input[@name='%s']")
//!     .set_content(["user"])
//!     .set_parent(&form)
//!     .set_label("username");
//! name.clear()?.send_keys("ada")?;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::checks::Appearance;
use crate::container::Container;
use crate::driver::{DriverResult, Node, Point, Size};
use crate::result::{PageError, PageResult};
use crate::strategy::{Locator, LocatorSpec, Strategy};
use crate::template::Content;
use crate::wait::wait_for_state;
use crate::webapp::{SessionScope, WebApp};

/// Capability marker of an element, used for filtering and checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// No particular capability
    #[default]
    Plain,
    /// Static text
    Label,
    /// Hyperlink
    Link,
    /// Clickable button
    Button,
    /// Editable text field
    Textbox,
    /// Two-state checkbox
    Checkbox,
    /// A plural element; only [`crate::collection::ElementCollection`] has it
    Collection,
    /// A composite of elements; only [`crate::widget::Widget`]s have it
    Widget,
}

impl ElementKind {
    /// Size constraints an element of this kind starts with
    #[must_use]
    pub const fn default_appearance(self) -> Appearance {
        match self {
            Self::Label | Self::Link => Appearance::new().with_minimum_size(20, 20),
            Self::Button | Self::Textbox => Appearance::new().with_minimum_size(40, 20),
            Self::Checkbox => Appearance::new().with_minimum_size(14, 14),
            Self::Plain | Self::Collection | Self::Widget => Appearance::new(),
        }
    }

    /// Whether elements of this kind define an appearance check
    #[must_use]
    pub const fn has_appearance_check(self) -> bool {
        !matches!(self, Self::Plain | Self::Collection | Self::Widget)
    }

    /// Whether elements of this kind define a behaviour check
    #[must_use]
    pub const fn has_behaviour_check(self) -> bool {
        matches!(
            self,
            Self::Label | Self::Button | Self::Textbox | Self::Checkbox
        )
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Plain => "plain",
            Self::Label => "label",
            Self::Link => "link",
            Self::Button => "button",
            Self::Textbox => "textbox",
            Self::Checkbox => "checkbox",
            Self::Collection => "collection",
            Self::Widget => "widget",
        };
        f.write_str(name)
    }
}

/// Compose the driver locator for `spec` under an optional parent.
///
/// Without a parent the strategy is handed to the driver natively; with one
/// the lookup is an xpath made of the parent chain followed by `spec`.
pub(crate) fn compose(spec: &LocatorSpec, parent: Option<&Weak<Element>>) -> PageResult<Locator> {
    match upgrade(parent)? {
        None => spec.native(),
        Some(parent) => spec.under(&parent.locator_xpath()?),
    }
}

pub(crate) fn compose_xpath(spec: &LocatorSpec, parent: Option<&Weak<Element>>) -> PageResult<String> {
    match upgrade(parent)? {
        None => spec.xpath(),
        Some(parent) => Ok(format!("{}{}", parent.locator_xpath()?, spec.xpath()?)),
    }
}

fn upgrade(parent: Option<&Weak<Element>>) -> PageResult<Option<Arc<Element>>> {
    parent
        .map(|weak| {
            weak.upgrade()
                .ok_or_else(|| PageError::assertion("parent element was dropped"))
        })
        .transpose()
}

/// A single locatable node of the application
pub struct Element {
    app: Arc<WebApp>,
    spec: LocatorSpec,
    label: Option<String>,
    kind: ElementKind,
    required: bool,
    parent: Option<Weak<Element>>,
    link: Option<Arc<Container>>,
    links: HashMap<String, Arc<Container>>,
    appearance: Appearance,
    default_value: Option<String>,
}

impl Element {
    /// A plain element in `scope`'s session
    pub fn new(scope: &dyn SessionScope, strategy: Strategy, identifier: impl Into<String>) -> Self {
        Self::of_kind(scope, ElementKind::Plain, strategy, identifier)
    }

    /// An element of the given kind, with that kind's default size constraints
    pub fn of_kind(
        scope: &dyn SessionScope,
        kind: ElementKind,
        strategy: Strategy,
        identifier: impl Into<String>,
    ) -> Self {
        Self {
            app: scope.session(),
            spec: LocatorSpec::new(strategy, identifier),
            label: None,
            kind,
            required: false,
            parent: None,
            link: None,
            links: HashMap::new(),
            appearance: kind.default_appearance(),
            default_value: None,
        }
    }

    /// A static text element (at least 20x20)
    pub fn new_label(scope: &dyn SessionScope, strategy: Strategy, identifier: impl Into<String>) -> Self {
        Self::of_kind(scope, ElementKind::Label, strategy, identifier)
    }

    /// A hyperlink (at least 20x20)
    pub fn new_link(scope: &dyn SessionScope, strategy: Strategy, identifier: impl Into<String>) -> Self {
        Self::of_kind(scope, ElementKind::Link, strategy, identifier)
    }

    /// A button (at least 40 wide, 20 high)
    pub fn new_button(scope: &dyn SessionScope, strategy: Strategy, identifier: impl Into<String>) -> Self {
        Self::of_kind(scope, ElementKind::Button, strategy, identifier)
    }

    /// A text field (at least 40 wide, 20 high)
    pub fn new_textbox(scope: &dyn SessionScope, strategy: Strategy, identifier: impl Into<String>) -> Self {
        Self::of_kind(scope, ElementKind::Textbox, strategy, identifier)
    }

    /// A checkbox (at least 14x14)
    pub fn new_checkbox(scope: &dyn SessionScope, strategy: Strategy, identifier: impl Into<String>) -> Self {
        Self::of_kind(scope, ElementKind::Checkbox, strategy, identifier)
    }

    // -------------------------------------------------------------------------
    // Setters
    // -------------------------------------------------------------------------

    /// Mark the element as required for its container to count as visible
    #[must_use]
    pub fn set_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Locate this element relative to `parent`
    #[must_use]
    pub fn set_parent(mut self, parent: &Arc<Element>) -> Self {
        self.parent = Some(Arc::downgrade(parent));
        self
    }

    /// Values substituted into the identifier template
    #[must_use]
    pub fn set_content<I, C>(mut self, content: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Content>,
    {
        self.spec.content = content.into_iter().map(Into::into).collect();
        self
    }

    /// Container shown after [`Element::go_to_link`]
    #[must_use]
    pub fn set_link(mut self, container: Arc<Container>) -> Self {
        self.link = Some(container);
        self
    }

    /// Container shown after [`Element::go_to_link`] with `key`
    #[must_use]
    pub fn set_keyed_link(mut self, key: impl Into<String>, container: Arc<Container>) -> Self {
        let _ = self.links.insert(key.into(), container);
        self
    }

    /// Name the element within its container
    #[must_use]
    pub fn set_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Replace the size constraints
    #[must_use]
    pub fn set_appearance(mut self, appearance: Appearance) -> Self {
        self.appearance = appearance;
        self
    }

    /// Require at least `width` x `height`
    #[must_use]
    pub fn set_minimum_size(mut self, width: i64, height: i64) -> Self {
        self.appearance = self.appearance.with_minimum_size(width, height);
        self
    }

    /// Require exactly `width` x `height`
    #[must_use]
    pub fn set_exact_size(mut self, width: i64, height: i64) -> Self {
        self.appearance = self.appearance.with_exact_size(width, height);
        self
    }

    /// Value a textbox must hold before it is typed into
    #[must_use]
    pub fn set_default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// The session
    #[must_use]
    pub fn app(&self) -> &Arc<WebApp> {
        &self.app
    }

    /// Strategy, identifier template and content
    #[must_use]
    pub const fn locator_spec(&self) -> &LocatorSpec {
        &self.spec
    }

    /// Label within the container, if any
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Capability marker
    #[must_use]
    pub const fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Whether the element is required
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.required
    }

    /// The parent, while it is alive
    #[must_use]
    pub fn parent(&self) -> Option<Arc<Element>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// The unkeyed link
    #[must_use]
    pub fn link(&self) -> Option<&Arc<Container>> {
        self.link.as_ref()
    }

    /// Container linked under `key`
    #[must_use]
    pub fn keyed_link(&self, key: &str) -> Option<&Arc<Container>> {
        self.links.get(key)
    }

    /// Size constraints
    #[must_use]
    pub const fn appearance(&self) -> &Appearance {
        &self.appearance
    }

    /// Expected textbox default value
    #[must_use]
    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    // -------------------------------------------------------------------------
    // Resolution
    // -------------------------------------------------------------------------

    /// Locator handed to the driver
    pub fn locator(&self) -> PageResult<Locator> {
        compose(&self.spec, self.parent.as_ref())
    }

    /// The full locator in xpath form, parent chain included
    pub fn locator_xpath(&self) -> PageResult<String> {
        compose_xpath(&self.spec, self.parent.as_ref())
    }

    /// The identifier the driver is queried with: the filled template, or the
    /// composed xpath when the element has a parent
    pub fn identifier(&self) -> PageResult<String> {
        Ok(self.locator()?.value)
    }

    /// Find the node now
    pub fn resolve(&self) -> PageResult<Box<dyn Node>> {
        self.app.before_lookup()?;
        let locator = self.locator()?;
        Ok(self.app.raw_driver().find_node(&locator)?)
    }

    fn read<T>(&self, f: impl FnOnce(&dyn Node) -> DriverResult<T>) -> PageResult<T> {
        let node = self.resolve()?;
        Ok(f(node.as_ref())?)
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// Whether the node is currently in the document
    pub fn exists(&self) -> PageResult<bool> {
        match self.resolve() {
            Ok(_) => Ok(true),
            Err(err) if err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Whether the node is displayed; a missing node is `false` when
    /// `ignore_not_found` is set and `NotFound` otherwise
    pub fn is_displayed(&self, ignore_not_found: bool) -> PageResult<bool> {
        match self.resolve() {
            Ok(node) => Ok(node.is_displayed()?),
            Err(err) if ignore_not_found && err.is_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Whether the node accepts input
    pub fn is_enabled(&self) -> PageResult<bool> {
        self.read(|node| node.is_enabled())
    }

    /// Selection state of a checkbox, radio button or option
    pub fn is_selected(&self) -> PageResult<bool> {
        self.read(|node| node.is_selected())
    }

    /// Rendered text
    pub fn get_text(&self) -> PageResult<String> {
        self.read(|node| node.text())
    }

    /// The named attribute; `None` when the node does not carry it
    pub fn get_attribute(&self, name: &str) -> PageResult<Option<String>> {
        self.read(|node| node.attribute(name))
    }

    /// The `value` attribute
    pub fn get_value(&self) -> PageResult<Option<String>> {
        self.get_attribute("value")
    }

    /// Tag name
    pub fn get_tag_name(&self) -> PageResult<String> {
        self.read(|node| node.tag_name())
    }

    /// Top-left corner on the page
    pub fn get_location(&self) -> PageResult<Point> {
        self.read(|node| node.location())
    }

    /// Rendered size
    pub fn get_size(&self) -> PageResult<Size> {
        self.read(|node| node.size())
    }

    /// Computed value of a CSS property
    pub fn get_css_value(&self, property: &str) -> PageResult<Option<String>> {
        self.read(|node| node.css_value(property))
    }

    // -------------------------------------------------------------------------
    // Interaction
    // -------------------------------------------------------------------------

    /// Click the node.
    ///
    /// Links that open windows go through [`Element::go_to_link`] instead, so
    /// the new window gets tracked.
    #[instrument(skip(self), fields(element = %self))]
    pub fn click(&self) -> PageResult<&Self> {
        debug!("clicking");
        self.read(|node| node.click())?;
        Ok(self)
    }

    /// Type `text` into the node, after whatever it already holds
    #[instrument(skip(self, text), fields(element = %self))]
    pub fn send_keys(&self, text: &str) -> PageResult<&Self> {
        debug!(len = text.len(), "typing");
        self.read(|node| node.send_keys(text))?;
        Ok(self)
    }

    /// Empty a text input
    pub fn clear(&self) -> PageResult<&Self> {
        self.read(|node| node.clear())?;
        Ok(self)
    }

    /// Submit the form the node belongs to
    pub fn submit(&self) -> PageResult<&Self> {
        self.read(|node| node.submit())?;
        Ok(self)
    }

    /// Click only when the selection state differs from `on`
    pub fn check(&self, on: bool) -> PageResult<&Self> {
        if self.is_selected()? != on {
            self.click()?;
        }
        Ok(self)
    }

    // -------------------------------------------------------------------------
    // Waits
    // -------------------------------------------------------------------------

    /// Wait for the node to appear; `None` uses the session default.
    ///
    /// Returns whether it exists when the wait ends. Running out of time is
    /// not an error.
    pub fn wait_until_exists(&self, timeout: Option<Duration>) -> PageResult<bool> {
        wait_for_state(
            &self.app.wait_options(timeout),
            &format!("{self} to exist"),
            true,
            || self.exists(),
        )
    }

    /// Wait for the node to disappear; returns whether it is gone
    pub fn wait_until_not_exists(&self, timeout: Option<Duration>) -> PageResult<bool> {
        wait_for_state(
            &self.app.wait_options(timeout),
            &format!("{self} to not exist"),
            false,
            || self.exists(),
        )
    }

    /// Wait for the node to be displayed; returns whether it is
    pub fn wait_until_displayed(&self, timeout: Option<Duration>, ignore_not_found: bool) -> PageResult<bool> {
        wait_for_state(
            &self.app.wait_options(timeout),
            &format!("{self} to be displayed"),
            true,
            || self.is_displayed(ignore_not_found),
        )
    }

    /// Wait for the node to be hidden; returns whether it is not displayed
    pub fn wait_until_not_displayed(&self, timeout: Option<Duration>, ignore_not_found: bool) -> PageResult<bool> {
        wait_for_state(
            &self.app.wait_options(timeout),
            &format!("{self} to be hidden"),
            false,
            || self.is_displayed(ignore_not_found),
        )
    }

    // -------------------------------------------------------------------------
    // Links
    // -------------------------------------------------------------------------

    /// Click through to a linked container.
    ///
    /// `None` follows the unkeyed link, `Some(key)` the keyed one. When the
    /// click opens exactly one window, it is tracked under this element's
    /// label (or the session's next free key) and becomes current.
    #[instrument(skip(self), fields(element = %self))]
    pub fn go_to_link(&self, key: Option<&str>) -> PageResult<Arc<Container>> {
        let target = match key {
            None => self.link.clone(),
            Some(key) => self.links.get(key).cloned(),
        }
        .ok_or_else(|| {
            PageError::not_found(match key {
                None => format!("link of {self}"),
                Some(key) => format!("link '{key}' of {self}"),
            })
        })?;

        let before = self.app.open_handles()?;
        self.click()?;
        std::thread::sleep(self.app.config().link_settle());
        if let Some(window) = self.app.track_new_window(&before, self.label())? {
            debug!(%window, "link opened a window");
        }
        Ok(target)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.identifier() {
            Ok(identifier) => write!(f, "Identifier: {identifier}"),
            Err(_) => write!(f, "Identifier: {}", self.spec.identifier),
        }
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("spec", &self.spec)
            .field("label", &self.label)
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("has_parent", &self.parent.is_some())
            .field("link", &self.link.as_ref().map(|c| c.name().to_string()))
            .field("links", &self.links.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
