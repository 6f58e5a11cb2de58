//! Element Collection - the plural counterpart of [`Element`]
//!
//! Resolves to every node its locator matches, in document order. Reads are
//! mapped across the matches; there are no write operations.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use crate::driver::{DriverResult, Node, Point, Size};
use crate::element::{compose, compose_xpath, Element, ElementKind};
use crate::result::PageResult;
use crate::strategy::{Locator, LocatorSpec, Strategy};
use crate::template::Content;
use crate::wait::wait_for_state;
use crate::webapp::{SessionScope, WebApp};

/// Zero or more nodes matched by one locator
pub struct ElementCollection {
    app: Arc<WebApp>,
    spec: LocatorSpec,
    label: Option<String>,
    parent: Option<Weak<Element>>,
}

impl ElementCollection {
    /// A collection in `scope`'s session
    pub fn new(scope: &dyn SessionScope, strategy: Strategy, identifier: impl Into<String>) -> Self {
        Self {
            app: scope.session(),
            spec: LocatorSpec::new(strategy, identifier),
            label: None,
            parent: None,
        }
    }

    /// Name the collection within its container
    #[must_use]
    pub fn set_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
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

    /// Locate the matches relative to `parent`
    #[must_use]
    pub fn set_parent(mut self, parent: &Arc<Element>) -> Self {
        self.parent = Some(Arc::downgrade(parent));
        self
    }

    /// Label within the container
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Always [`ElementKind::Collection`]
    #[must_use]
    pub const fn kind(&self) -> ElementKind {
        ElementKind::Collection
    }

    /// Strategy, template and content as declared
    #[must_use]
    pub const fn locator_spec(&self) -> &LocatorSpec {
        &self.spec
    }

    /// Locator handed to the driver
    pub fn locator(&self) -> PageResult<Locator> {
        compose(&self.spec, self.parent.as_ref())
    }

    /// The full locator in xpath form
    pub fn locator_xpath(&self) -> PageResult<String> {
        compose_xpath(&self.spec, self.parent.as_ref())
    }

    /// Find every matching node now
    pub fn resolve_all(&self) -> PageResult<Vec<Box<dyn Node>>> {
        self.app.before_lookup()?;
        let locator = self.locator()?;
        Ok(self.app.raw_driver().find_nodes(&locator)?)
    }

    fn map_nodes<T>(&self, f: impl Fn(&dyn Node) -> DriverResult<T>) -> PageResult<Vec<T>> {
        self.resolve_all()?
            .iter()
            .map(|node| f(node.as_ref()).map_err(Into::into))
            .collect()
    }

    /// Number of current matches
    pub fn count(&self) -> PageResult<usize> {
        Ok(self.resolve_all()?.len())
    }

    /// Whether anything matches
    pub fn exists(&self) -> PageResult<bool> {
        Ok(self.count()? > 0)
    }

    /// Whether any match is displayed
    pub fn is_displayed(&self) -> PageResult<bool> {
        Ok(self.displayed_list()?.into_iter().any(|shown| shown))
    }

    // Batch reads resolve the matches once and report one value per match,
    // in document order.

    /// Displayed state of every match
    pub fn displayed_list(&self) -> PageResult<Vec<bool>> {
        self.map_nodes(|node| node.is_displayed())
    }

    /// Enabled state of every match
    pub fn enabled_list(&self) -> PageResult<Vec<bool>> {
        self.map_nodes(|node| node.is_enabled())
    }

    /// Selection state of every match
    pub fn selected_list(&self) -> PageResult<Vec<bool>> {
        self.map_nodes(|node| node.is_selected())
    }

    /// Location of every match
    pub fn location_list(&self) -> PageResult<Vec<Point>> {
        self.map_nodes(|node| node.location())
    }

    /// Size of every match
    pub fn size_list(&self) -> PageResult<Vec<Size>> {
        self.map_nodes(|node| node.size())
    }

    /// Text of every match
    pub fn text_list(&self) -> PageResult<Vec<String>> {
        self.map_nodes(|node| node.text())
    }

    /// Tag name of every match
    pub fn tag_name_list(&self) -> PageResult<Vec<String>> {
        self.map_nodes(|node| node.tag_name())
    }

    /// The named attribute of every match
    pub fn attribute_list(&self, name: &str) -> PageResult<Vec<Option<String>>> {
        self.map_nodes(|node| node.attribute(name))
    }

    /// The `value` attribute of every match
    pub fn value_list(&self) -> PageResult<Vec<Option<String>>> {
        self.attribute_list("value")
    }

    /// Computed CSS property of every match
    pub fn css_value_list(&self, property: &str) -> PageResult<Vec<Option<String>>> {
        self.map_nodes(|node| node.css_value(property))
    }

    /// Wait for at least one match; returns whether there is one
    pub fn wait_until_exists(&self, timeout: Option<Duration>) -> PageResult<bool> {
        wait_for_state(
            &self.app.wait_options(timeout),
            &format!("{self} to match"),
            true,
            || self.exists(),
        )
    }

    /// Wait for no match; returns whether there is none
    pub fn wait_until_not_exists(&self, timeout: Option<Duration>) -> PageResult<bool> {
        wait_for_state(
            &self.app.wait_options(timeout),
            &format!("{self} to match nothing"),
            false,
            || self.exists(),
        )
    }

    /// Wait for any match to be displayed
    pub fn wait_until_displayed(&self, timeout: Option<Duration>) -> PageResult<bool> {
        wait_for_state(
            &self.app.wait_options(timeout),
            &format!("{self} to be displayed"),
            true,
            || self.is_displayed(),
        )
    }

    /// Wait for no match to be displayed
    pub fn wait_until_not_displayed(&self, timeout: Option<Duration>) -> PageResult<bool> {
        wait_for_state(
            &self.app.wait_options(timeout),
            &format!("{self} to be hidden"),
            false,
            || self.is_displayed(),
        )
    }
}

impl fmt::Display for ElementCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.locator() {
            Ok(locator) => write!(f, "Identifier: {}", locator.value),
            Err(_) => write!(f, "Identifier: {}", self.spec.identifier),
        }
    }
}

impl fmt::Debug for ElementCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementCollection")
            .field("spec", &self.spec)
            .field("label", &self.label)
            .field("has_parent", &self.parent.is_some())
            .finish_non_exhaustive()
    }
}
