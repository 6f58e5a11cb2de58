//! Page Object Model Support
//!
//! A [`Container`] is a named registry of elements, collections and
//! [`Widget`]s that together model one region of the application: a page, a dialog, a
//! sidebar. It is populated exactly once, while it is being built, either by
//! a closure or by a [`PageObject`] implementation.
//!
//! # Example
//!
//! ```ignore
//! struct LoginPage;
//!
//! impl PageObject for LoginPage {
//!     fn build_elements(&self, c: &mut Container) -> PageResult<()> {
//!         let form = c.put(Element::new(c, Strategy::Id, "login-form")
//!             .set_label("form")
//!             .set_required(true))?;
//!         let user = Element::new_textbox(c, Strategy::XPath, "/input[@name='user']")
//!             .set_parent(&form)
//!             .set_label("user");
//!         c.put(user)?;
//!         Ok(())
//!     }
//! }
//!
//! let login = Container::from_page(&app, &LoginPage)?;
//! assert!(login.wait_until_visible(None)?);
//! ```
//!
//! Visibility of a container is judged on its first required element or
//! widget, in registration order, not on all of them.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::collection::ElementCollection;
use crate::element::{Element, ElementKind};
use crate::result::{PageError, PageResult};
use crate::unique::UniqueIds;
use crate::webapp::{SessionScope, WebApp};
use crate::widget::{displayed_or_absent, Widget};

/// Trait for page objects that declare the elements of a region
pub trait PageObject {
    /// Populate `container`; called once, during construction
    fn build_elements(&self, container: &mut Container) -> PageResult<()>;

    /// Name of the region, used for logging and debugging
    fn page_name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// One registry entry
#[derive(Debug, Clone)]
pub enum Registered {
    /// A single element
    Element(Arc<Element>),
    /// A collection
    Collection(Arc<ElementCollection>),
    /// A composite widget
    Widget(Arc<dyn Widget>),
}

impl Registered {
    /// Label of the entry
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Element(e) => e.label(),
            Self::Collection(c) => c.label(),
            Self::Widget(w) => w.label(),
        }
    }

    /// Capability marker of the entry
    #[must_use]
    pub fn kind(&self) -> ElementKind {
        match self {
            Self::Element(e) => e.kind(),
            Self::Collection(c) => c.kind(),
            Self::Widget(_) => ElementKind::Widget,
        }
    }

    /// Whether the entry is required; collections never are
    #[must_use]
    pub fn is_required(&self) -> bool {
        match self {
            Self::Element(e) => e.is_required(),
            Self::Collection(_) => false,
            Self::Widget(w) => w.is_required(),
        }
    }

    /// The element, if this entry is one
    #[must_use]
    pub fn as_element(&self) -> Option<&Arc<Element>> {
        match self {
            Self::Element(e) => Some(e),
            _ => None,
        }
    }

    /// The collection, if this entry is one
    #[must_use]
    pub fn as_collection(&self) -> Option<&Arc<ElementCollection>> {
        match self {
            Self::Collection(c) => Some(c),
            _ => None,
        }
    }

    /// The widget, if this entry is one
    #[must_use]
    pub fn as_widget(&self) -> Option<&Arc<dyn Widget>> {
        match self {
            Self::Widget(w) => Some(w),
            _ => None,
        }
    }

    /// Whether two entries are the same registered object
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Element(a), Self::Element(b)) => Arc::ptr_eq(a, b),
            (Self::Collection(a), Self::Collection(b)) => Arc::ptr_eq(a, b),
            (Self::Widget(a), Self::Widget(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// A named registry of elements, collections and widgets
#[derive(Debug)]
pub struct Container {
    app: Arc<WebApp>,
    name: String,
    entries: Vec<(String, Registered)>,
}

impl SessionScope for Container {
    fn session(&self) -> Arc<WebApp> {
        Arc::clone(&self.app)
    }
}

impl Container {
    /// Build a container, running `builder` once to populate it
    pub fn build<F>(scope: &dyn SessionScope, name: impl Into<String>, builder: F) -> PageResult<Self>
    where
        F: FnOnce(&mut Self) -> PageResult<()>,
    {
        let mut container = Self {
            app: scope.session(),
            name: name.into(),
            entries: Vec::new(),
        };
        builder(&mut container)?;
        debug!(container = %container.name, entries = container.entries.len(), "container built");
        Ok(container)
    }

    /// Build a container from a page object
    pub fn from_page<P: PageObject + ?Sized>(scope: &dyn SessionScope, page: &P) -> PageResult<Self> {
        Self::build(scope, page.page_name(), |container| page.build_elements(container))
    }

    /// Name of the region
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The session
    #[must_use]
    pub fn app(&self) -> &Arc<WebApp> {
        &self.app
    }

    fn insert(&mut self, label: Option<&str>, entry: Registered) -> PageResult<()> {
        let label = label
            .filter(|l| !l.is_empty())
            .ok_or_else(|| {
                PageError::assertion(format!(
                    "only labelled elements can be put into container '{}'",
                    self.name
                ))
            })?
            .to_string();

        match self.entries.iter_mut().find(|(l, _)| *l == label) {
            Some((_, existing)) => *existing = entry,
            None => self.entries.push((label, entry)),
        }
        Ok(())
    }

    /// Register an element under its label, replacing any entry with that label
    pub fn put(&mut self, element: impl Into<Arc<Element>>) -> PageResult<Arc<Element>> {
        let element = element.into();
        self.insert(element.label(), Registered::Element(Arc::clone(&element)))?;
        Ok(element)
    }

    /// Register a collection under its label, replacing any entry with that label
    pub fn put_collection(
        &mut self,
        collection: impl Into<Arc<ElementCollection>>,
    ) -> PageResult<Arc<ElementCollection>> {
        let collection = collection.into();
        self.insert(collection.label(), Registered::Collection(Arc::clone(&collection)))?;
        Ok(collection)
    }

    /// Register a widget under its root's label, replacing any entry with that label
    pub fn put_widget<W: Widget + 'static>(&mut self, widget: W) -> PageResult<Arc<W>> {
        let widget = Arc::new(widget);
        let entry: Arc<dyn Widget> = Arc::clone(&widget) as Arc<dyn Widget>;
        self.insert(widget.label(), Registered::Widget(entry))?;
        Ok(widget)
    }

    /// The entry registered under `label`
    pub fn get(&self, label: &str) -> PageResult<Registered> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, entry)| entry.clone())
            .ok_or_else(|| PageError::not_found(format!("'{label}' in container '{}'", self.name)))
    }

    fn wrong_variant(&self, wanted: &str, label: &str, found: &Registered) -> PageError {
        PageError::not_found(format!(
            "{wanted} '{label}' in container '{}' (it is a {})",
            self.name,
            found.kind()
        ))
    }

    /// The element registered under `label`
    pub fn element(&self, label: &str) -> PageResult<Arc<Element>> {
        match self.get(label)? {
            Registered::Element(e) => Ok(e),
            other => Err(self.wrong_variant("element", label, &other)),
        }
    }

    /// The collection registered under `label`
    pub fn collection(&self, label: &str) -> PageResult<Arc<ElementCollection>> {
        match self.get(label)? {
            Registered::Collection(c) => Ok(c),
            other => Err(self.wrong_variant("collection", label, &other)),
        }
    }

    /// The widget registered under `label`
    pub fn widget(&self, label: &str) -> PageResult<Arc<dyn Widget>> {
        match self.get(label)? {
            Registered::Widget(w) => Ok(w),
            other => Err(self.wrong_variant("widget", label, &other)),
        }
    }

    /// Labels in registration order
    #[must_use]
    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|(l, _)| l.as_str()).collect()
    }

    /// Entries matching both optional filters, in registration order
    #[must_use]
    pub fn get_elements(&self, kind: Option<ElementKind>, required: Option<bool>) -> Vec<Registered> {
        self.entries
            .iter()
            .map(|(_, entry)| entry)
            .filter(|entry| kind.map_or(true, |k| entry.kind() == k))
            .filter(|entry| required.map_or(true, |r| entry.is_required() == r))
            .cloned()
            .collect()
    }

    fn first_required(&self) -> PageResult<&Registered> {
        self.entries
            .iter()
            .map(|(_, entry)| entry)
            .find(|entry| entry.is_required())
            .ok_or_else(|| {
                PageError::assertion(format!(
                    "container '{}' has no required element to judge visibility by",
                    self.name
                ))
            })
    }

    /// Wait for the container to be displayed; returns whether it is
    pub fn wait_until_visible(&self, timeout: Option<Duration>) -> PageResult<bool> {
        match self.first_required()? {
            Registered::Element(e) => e.wait_until_displayed(timeout, true),
            Registered::Widget(w) => w.wait_until_displayed(timeout),
            Registered::Collection(c) => c.wait_until_displayed(timeout),
        }
    }

    /// Wait for the container to go away; returns whether it is not displayed
    pub fn wait_until_not_visible(&self, timeout: Option<Duration>) -> PageResult<bool> {
        match self.first_required()? {
            Registered::Element(e) => e.wait_until_not_displayed(timeout, true),
            Registered::Widget(w) => w.wait_until_not_displayed(timeout),
            Registered::Collection(c) => c.wait_until_not_displayed(timeout),
        }
    }

    /// Whether the container is displayed now
    pub fn is_visible(&self) -> PageResult<bool> {
        match self.first_required()? {
            Registered::Element(e) => e.is_displayed(true),
            Registered::Widget(w) => displayed_or_absent(w.as_ref()),
            Registered::Collection(c) => c.is_displayed(),
        }
    }

    /// Run the appearance check of every element whose kind defines one,
    /// and of every checkable widget, in registration order
    pub fn check_appearance(&self) -> PageResult<&Self> {
        for (_, entry) in &self.entries {
            match entry {
                Registered::Element(e) if e.kind().has_appearance_check() => {
                    e.check_appearance()?;
                }
                Registered::Widget(w) if w.is_checkable() => w.check_appearance()?,
                _ => {}
            }
        }
        Ok(self)
    }

    /// Run the behaviour check of every element whose kind defines one,
    /// and of every checkable widget, in registration order
    pub fn check_behaviour(&self, ids: &UniqueIds) -> PageResult<&Self> {
        for (_, entry) in &self.entries {
            match entry {
                Registered::Element(e) if e.kind().has_behaviour_check() => {
                    e.check_behaviour(ids)?;
                }
                Registered::Widget(w) if w.is_checkable() => w.check_behaviour(ids)?,
                _ => {}
            }
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{MockDriver, MockNode};
    use crate::strategy::{Locator, Strategy};

    fn session() -> (MockDriver, Arc<WebApp>) {
        let mock = MockDriver::new();
        let app = WebApp::new(Arc::new(mock.clone()), "http://localhost").unwrap();
        (mock, app)
    }

    struct LoginPage;

    impl PageObject for LoginPage {
        fn build_elements(&self, c: &mut Container) -> PageResult<()> {
            let form = Element::new(c, Strategy::Id, "login-form")
                .set_label("form")
                .set_required(true);
            let form = c.put(form)?;
            let user = Element::new_textbox(c, Strategy::XPath, "/input[@name='user']")
                .set_parent(&form)
                .set_label("user");
            c.put(user)?;
            let submit = Element::new_button(c, Strategy::Id, "login").set_label("submit");
            c.put(submit)?;
            let errors = ElementCollection::new(c, Strategy::XPath, "//ul[@class='errors']/li")
                .set_label("errors");
            c.put_collection(errors)?;
            Ok(())
        }
    }

    mod registry_tests {
        use super::*;

        #[test]
        fn test_from_page() {
            let (_mock, app) = session();
            let login = Container::from_page(&app, &LoginPage).unwrap();
            assert_eq!(login.labels(), vec!["form", "user", "submit", "errors"]);
            assert!(login.name().ends_with("LoginPage"));
            assert_eq!(
                login.element("user").unwrap().locator_xpath().unwrap(),
                "//*[@id='login-form']/input[@name='user']"
            );
        }

        #[test]
        fn test_put_get_identity() {
            let (_mock, app) = session();
            let mut kept = None;
            let c = Container::build(&app, "c", |c| {
                let el = Element::new(c, Strategy::Id, "x").set_label("x");
                kept = Some(c.put(el)?);
                Ok(())
            })
            .unwrap();
            assert!(Arc::ptr_eq(&kept.unwrap(), &c.element("x").unwrap()));
        }

        #[test]
        fn test_put_requires_label() {
            let (_mock, app) = session();
            let result = Container::build(&app, "c", |c| {
                let unlabelled = Element::new(c, Strategy::Id, "x");
                c.put(unlabelled)?;
                Ok(())
            });
            assert!(matches!(result, Err(PageError::AssertionFailed { .. })));

            let result = Container::build(&app, "c", |c| {
                let empty = Element::new(c, Strategy::Id, "x").set_label("");
                c.put(empty)?;
                Ok(())
            });
            assert!(matches!(result, Err(PageError::AssertionFailed { .. })));
        }

        #[test]
        fn test_last_put_wins_in_place() {
            let (_mock, app) = session();
            let c = Container::build(&app, "c", |c| {
                let a = Element::new(c, Strategy::Id, "first").set_label("a");
                c.put(a)?;
                let b = Element::new(c, Strategy::Id, "b").set_label("b");
                c.put(b)?;
                let again = Element::new(c, Strategy::Id, "second").set_label("a");
                c.put(again)?;
                Ok(())
            })
            .unwrap();
            assert_eq!(c.labels(), vec!["a", "b"]);
            assert_eq!(c.element("a").unwrap().identifier().unwrap(), "second");
        }

        #[test]
        fn test_get_missing_and_wrong_variant() {
            let (_mock, app) = session();
            let login = Container::from_page(&app, &LoginPage).unwrap();
            assert!(login.get("nope").unwrap_err().is_not_found());
            assert!(login.element("errors").unwrap_err().is_not_found());
            assert!(login.collection("form").unwrap_err().is_not_found());
            assert!(login.collection("errors").is_ok());
        }

        #[test]
        fn test_elements_inherit_session() {
            let (_mock, app) = session();
            let login = Container::from_page(&app, &LoginPage).unwrap();
            assert!(Arc::ptr_eq(login.element("form").unwrap().app(), &app));
        }
    }

    mod filter_tests {
        use super::*;

        #[test]
        fn test_filters_compose() {
            let (_mock, app) = session();
            let login = Container::from_page(&app, &LoginPage).unwrap();
            assert_eq!(login.get_elements(None, None).len(), 4);
            assert_eq!(login.get_elements(None, Some(true)).len(), 1);
            assert_eq!(login.get_elements(None, Some(false)).len(), 3);
            assert_eq!(login.get_elements(Some(ElementKind::Textbox), None).len(), 1);
            assert!(login
                .get_elements(Some(ElementKind::Textbox), Some(true))
                .is_empty());
            let collections = login.get_elements(Some(ElementKind::Collection), Some(false));
            assert_eq!(collections.len(), 1);
            assert!(collections[0].as_collection().is_some());
        }
    }

    mod visibility_tests {
        use super::*;

        #[test]
        fn test_no_required_element_is_an_assertion() {
            let (_mock, app) = session();
            let c = Container::build(&app, "empty", |_| Ok(())).unwrap();
            assert!(matches!(c.is_visible(), Err(PageError::AssertionFailed { .. })));
            assert!(matches!(
                c.wait_until_visible(None),
                Err(PageError::AssertionFailed { .. })
            ));
        }

        #[test]
        fn test_visibility_follows_first_required() {
            let (mock, app) = session();
            let login = Container::from_page(&app, &LoginPage).unwrap();
            assert!(!login.is_visible().unwrap());
            assert!(login.wait_until_not_visible(None).unwrap());

            mock.add_node(Locator::id("login-form"), MockNode::new("form"));
            assert!(login.is_visible().unwrap());
            assert!(login.wait_until_visible(Some(Duration::from_millis(100))).unwrap());
        }

        #[test]
        fn test_only_first_required_is_consulted() {
            let (mock, app) = session();
            mock.add_node(Locator::id("shown"), MockNode::new("div"));
            let c = Container::build(&app, "c", |c| {
                let shown = Element::new(c, Strategy::Id, "shown").set_label("a").set_required(true);
                c.put(shown)?;
                let missing = Element::new(c, Strategy::Id, "missing").set_label("b").set_required(true);
                c.put(missing)?;
                Ok(())
            })
            .unwrap();
            assert!(c.is_visible().unwrap());
        }
    }

    mod check_tests {
        use super::*;

        #[test]
        fn test_container_checks_skip_kinds_without_checks() {
            let (mock, app) = session();
            mock.add_node(Locator::id("login-form"), MockNode::new("form"));
            mock.add_node(
                Locator::xpath("//*[@id='login-form']/input[@name='user']"),
                MockNode::new("input").sized(200, 24),
            );
            mock.add_node(Locator::id("login"), MockNode::new("button").sized(60, 24));
            let login = Container::from_page(&app, &LoginPage).unwrap();
            assert!(login.check_appearance().is_ok());
            assert!(login.check_behaviour(&UniqueIds::new()).is_ok());
        }

        #[test]
        fn test_container_check_reports_first_failure() {
            let (mock, app) = session();
            mock.add_node(
                Locator::xpath("//*[@id='login-form']/input[@name='user']"),
                MockNode::new("input").sized(20, 24),
            );
            let login = Container::from_page(&app, &LoginPage).unwrap();
            let err = login.check_appearance().unwrap_err();
            assert_eq!(
                err.to_string(),
                "Check failed: width: expected at least <40> - got <20>"
            );
        }
    }
}
