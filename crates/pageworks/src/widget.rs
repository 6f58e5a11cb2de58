//! Widgets - composites of elements under a common root
//!
//! A search area made of a textbox and a button, a date picker, a paginated
//! table: anything that is exercised as one unit but located as several
//! nodes. The implementor owns the parts and decides what "exists" and
//! "displayed" mean for the whole; containers register widgets next to plain
//! elements and treat a required widget like a required element.
//!
//! ```ignore
//! #[derive(Debug)]
//! struct SearchBox {
//!     root: Arc<Element>,
//!     text: Element,
//!     go: Element,
//! }
//!
//! impl Widget for SearchBox {
//!     fn root(&self) -> &Arc<Element> { &self.root }
//!     fn exists(&self) -> PageResult<bool> {
//!         Ok(self.text.exists()? && self.go.exists()?)
//!     }
//!     fn is_displayed(&self) -> PageResult<bool> {
//!         Ok(self.text.is_displayed(true)? && self.go.is_displayed(true)?)
//!     }
//! }
//!
//! let search = container.put_widget(SearchBox::new(container)?)?;
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::element::Element;
use crate::result::{PageError, PageResult};
use crate::unique::UniqueIds;
use crate::wait::wait_for_state;

/// A composite element whose state is defined by its implementor.
///
/// Label and required flag come from the [`Widget::root`] element. A widget
/// that implements its own checks reports so through
/// [`Widget::is_checkable`]; containers then include it in their bulk
/// appearance and behaviour checks.
pub trait Widget: Send + Sync + fmt::Debug {
    /// The element every part is located under
    fn root(&self) -> &Arc<Element>;

    /// Whether every part the widget needs is in the document
    fn exists(&self) -> PageResult<bool>;

    /// Whether the widget is shown as a whole
    fn is_displayed(&self) -> PageResult<bool>;

    /// Label within the container
    fn label(&self) -> Option<&str> {
        self.root().label()
    }

    /// Whether the widget counts towards its container's visibility
    fn is_required(&self) -> bool {
        self.root().is_required()
    }

    /// Whether the widget defines appearance and behaviour checks
    fn is_checkable(&self) -> bool {
        false
    }

    /// Verify the widget is laid out correctly
    fn check_appearance(&self) -> PageResult<()> {
        Err(PageError::usage(format!(
            "widget {} defines no appearance check",
            self.root()
        )))
    }

    /// Verify the widget can be used
    fn check_behaviour(&self, _ids: &UniqueIds) -> PageResult<()> {
        Err(PageError::usage(format!(
            "widget {} defines no behaviour check",
            self.root()
        )))
    }
}

/// `is_displayed`, with a missing part reading as not displayed
pub(crate) fn displayed_or_absent(widget: &dyn Widget) -> PageResult<bool> {
    match widget.is_displayed() {
        Err(err) if err.is_not_found() => Ok(false),
        other => other,
    }
}

impl dyn Widget {
    /// Wait for the widget to exist; `None` uses the session default
    pub fn wait_until_exists(&self, timeout: Option<Duration>) -> PageResult<bool> {
        wait_for_state(
            &self.root().app().wait_options(timeout),
            &format!("widget {} to exist", self.root()),
            true,
            || self.exists(),
        )
    }

    /// Wait for the widget to go away; returns whether it is gone
    pub fn wait_until_not_exists(&self, timeout: Option<Duration>) -> PageResult<bool> {
        wait_for_state(
            &self.root().app().wait_options(timeout),
            &format!("widget {} to not exist", self.root()),
            false,
            || self.exists(),
        )
    }

    /// Wait for the widget to be displayed; missing parts count as hidden
    pub fn wait_until_displayed(&self, timeout: Option<Duration>) -> PageResult<bool> {
        wait_for_state(
            &self.root().app().wait_options(timeout),
            &format!("widget {} to be displayed", self.root()),
            true,
            || displayed_or_absent(self),
        )
    }

    /// Wait for the widget to be hidden or gone
    pub fn wait_until_not_displayed(&self, timeout: Option<Duration>) -> PageResult<bool> {
        wait_for_state(
            &self.root().app().wait_options(timeout),
            &format!("widget {} to be hidden", self.root()),
            false,
            || displayed_or_absent(self),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::container::{Container, Registered};
    use crate::driver::{MockDriver, MockNode};
    use crate::element::ElementKind;
    use crate::strategy::{Locator, Strategy};
    use crate::webapp::{SessionScope, WebApp};

    fn session() -> (MockDriver, Arc<WebApp>) {
        let mock = MockDriver::new();
        let config = SessionConfig::new().with_default_wait(300).with_poll_interval(20);
        let app = WebApp::with_config(Arc::new(mock.clone()), "http://localhost", config).unwrap();
        (mock, app)
    }

    #[derive(Debug)]
    struct SearchBox {
        root: Arc<Element>,
        text: Element,
        go: Element,
        checkable: bool,
    }

    impl SearchBox {
        fn new(scope: &dyn SessionScope, checkable: bool) -> Self {
            let root = Arc::new(
                Element::new(scope, Strategy::Id, "search")
                    .set_label("search")
                    .set_required(true),
            );
            let text = Element::new_textbox(scope, Strategy::XPath, "/input").set_parent(&root);
            let go = Element::new_button(scope, Strategy::XPath, "/button").set_parent(&root);
            Self {
                root,
                text,
                go,
                checkable,
            }
        }
    }

    impl Widget for SearchBox {
        fn root(&self) -> &Arc<Element> {
            &self.root
        }

        fn exists(&self) -> PageResult<bool> {
            Ok(self.text.exists()? && self.go.exists()?)
        }

        fn is_displayed(&self) -> PageResult<bool> {
            Ok(self.text.is_displayed(true)? && self.go.is_displayed(true)?)
        }

        fn is_checkable(&self) -> bool {
            self.checkable
        }

        fn check_appearance(&self) -> PageResult<()> {
            self.text.check_appearance()?;
            self.go.check_appearance()?;
            Ok(())
        }

        fn check_behaviour(&self, ids: &UniqueIds) -> PageResult<()> {
            self.text.check_behaviour(ids)?;
            Ok(())
        }
    }

    fn add_search_nodes(mock: &MockDriver, text: MockNode) {
        mock.add_node(Locator::id("search"), MockNode::new("div"));
        mock.add_node(Locator::xpath("//*[@id='search']/input"), text);
        mock.add_node(
            Locator::xpath("//*[@id='search']/button"),
            MockNode::new("button").sized(60, 24),
        );
    }

    fn page(app: &Arc<WebApp>, checkable: bool) -> Container {
        Container::build(app, "home", |c| {
            let search = SearchBox::new(c, checkable);
            c.put_widget(search)?;
            let title = Element::new_label(c, Strategy::Tag, "h1").set_label("title");
            c.put(title)?;
            Ok(())
        })
        .unwrap()
    }

    mod state_tests {
        use super::*;

        #[test]
        fn test_exists_needs_every_part() {
            let (mock, app) = session();
            let search: Arc<dyn Widget> = Arc::new(SearchBox::new(&app, false));
            assert!(!search.exists().unwrap());

            add_search_nodes(&mock, MockNode::new("input"));
            assert!(search.exists().unwrap());
            assert!(search.is_displayed().unwrap());
        }

        #[test]
        fn test_waits_follow_implementor_state() {
            let (mock, app) = session();
            add_search_nodes(
                &mock,
                MockNode::new("input").shown_after(Duration::from_millis(100)),
            );
            let search: Arc<dyn Widget> = Arc::new(SearchBox::new(&app, false));

            assert!(search.wait_until_exists(None).unwrap());
            assert!(!search.is_displayed().unwrap());
            assert!(search.wait_until_displayed(None).unwrap());
        }

        #[test]
        fn test_missing_widget_waits_to_hidden() {
            let (_mock, app) = session();
            let search: Arc<dyn Widget> = Arc::new(SearchBox::new(&app, false));
            assert!(search.wait_until_not_displayed(Some(Duration::from_millis(50))).unwrap());
            assert!(search.wait_until_not_exists(Some(Duration::from_millis(50))).unwrap());
        }

        #[test]
        fn test_label_and_required_come_from_root() {
            let (_mock, app) = session();
            let search = SearchBox::new(&app, false);
            assert_eq!(search.label(), Some("search"));
            assert!(search.is_required());
        }

        #[test]
        fn test_default_checks_are_usage_violations() {
            #[derive(Debug)]
            struct Bare(Arc<Element>);

            impl Widget for Bare {
                fn root(&self) -> &Arc<Element> {
                    &self.0
                }
                fn exists(&self) -> PageResult<bool> {
                    self.0.exists()
                }
                fn is_displayed(&self) -> PageResult<bool> {
                    self.0.is_displayed(true)
                }
            }

            let (_mock, app) = session();
            let bare = Bare(Arc::new(Element::new(&app, Strategy::Id, "bare")));
            assert!(!bare.is_checkable());
            assert!(matches!(
                bare.check_appearance(),
                Err(PageError::UsageViolation { .. })
            ));
            assert!(matches!(
                bare.check_behaviour(&UniqueIds::new()),
                Err(PageError::UsageViolation { .. })
            ));
        }
    }

    mod container_tests {
        use super::*;

        #[test]
        fn test_registered_and_filtered_as_widget() {
            let (_mock, app) = session();
            let home = page(&app, false);

            assert_eq!(home.labels(), vec!["search", "title"]);
            let widgets = home.get_elements(Some(ElementKind::Widget), None);
            assert_eq!(widgets.len(), 1);
            assert!(widgets[0].as_widget().is_some());
            assert_eq!(home.get_elements(None, Some(true)).len(), 1);

            let entry = home.get("search").unwrap();
            assert!(matches!(entry, Registered::Widget(_)));
            assert_eq!(entry.kind(), ElementKind::Widget);
            assert!(home.element("search").unwrap_err().is_not_found());
            assert!(home.widget("title").unwrap_err().is_not_found());
        }

        #[test]
        fn test_put_widget_get_identity() {
            let (_mock, app) = session();
            let mut kept = None;
            let home = Container::build(&app, "home", |c| {
                let search = SearchBox::new(c, false);
                kept = Some(c.put_widget(search)?);
                Ok(())
            })
            .unwrap();

            let kept: Arc<dyn Widget> = kept.unwrap();
            assert!(Arc::ptr_eq(&kept, &home.widget("search").unwrap()));
        }

        #[test]
        fn test_required_widget_drives_visibility() {
            let (mock, app) = session();
            let home = page(&app, false);
            assert!(!home.is_visible().unwrap());

            add_search_nodes(&mock, MockNode::new("input"));
            assert!(home.is_visible().unwrap());
            assert!(home.wait_until_visible(None).unwrap());
        }

        #[test]
        fn test_container_checks_include_checkable_widgets() {
            let (mock, app) = session();
            add_search_nodes(&mock, MockNode::new("input").sized(10, 24));
            mock.add_node(Locator::tag("h1"), MockNode::new("h1").sized(300, 40));

            assert!(page(&app, false).check_appearance().is_ok());

            let err = page(&app, true).check_appearance().unwrap_err();
            assert_eq!(
                err.to_string(),
                "Check failed: width: expected at least <40> - got <10>"
            );
        }

        #[test]
        fn test_container_behaviour_check_types_into_widget() {
            let (mock, app) = session();
            add_search_nodes(&mock, MockNode::new("input").sized(200, 24));
            mock.add_node(Locator::tag("h1"), MockNode::new("h1").sized(300, 40));

            let ids = UniqueIds::new();
            assert!(page(&app, true).check_behaviour(&ids).is_ok());
            assert_eq!(ids.issued(), 1);
            assert!(mock.was_called("send_keys:xpath=//*[@id='search']/input:"));
        }
    }
}
