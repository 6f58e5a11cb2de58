//! Appearance and behaviour checks
//!
//! Smoke checks layered on elements by kind: every kind with an appearance
//! check must be displayed and satisfy its size constraints; labels and
//! buttons have no behaviour to check, textboxes must hold their default
//! value and accept typed text, checkboxes must toggle and toggle back.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::element::{Element, ElementKind};
use crate::result::{CheckFailure, PageError, PageResult};
use crate::unique::UniqueIds;

/// Size constraints of an element, in CSS pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appearance {
    /// Minimum width
    pub min_width: Option<i64>,
    /// Minimum height
    pub min_height: Option<i64>,
    /// Exact width
    pub exact_width: Option<i64>,
    /// Exact height
    pub exact_height: Option<i64>,
}

impl Appearance {
    /// No constraints
    #[must_use]
    pub const fn new() -> Self {
        Self {
            min_width: None,
            min_height: None,
            exact_width: None,
            exact_height: None,
        }
    }

    /// Require at least `width` x `height`
    #[must_use]
    pub const fn with_minimum_size(mut self, width: i64, height: i64) -> Self {
        self.min_width = Some(width);
        self.min_height = Some(height);
        self
    }

    /// Require exactly `width` x `height`
    #[must_use]
    pub const fn with_exact_size(mut self, width: i64, height: i64) -> Self {
        self.exact_width = Some(width);
        self.exact_height = Some(height);
        self
    }

    /// Whether any size constraint is set
    #[must_use]
    pub const fn constrains_size(&self) -> bool {
        self.min_width.is_some()
            || self.min_height.is_some()
            || self.exact_width.is_some()
            || self.exact_height.is_some()
    }
}

impl Element {
    /// Check the element is displayed and satisfies its size constraints
    pub fn check_appearance(&self) -> PageResult<&Self> {
        if !self.kind().has_appearance_check() {
            return Err(PageError::usage(format!(
                "{} elements define no appearance check",
                self.kind()
            )));
        }
        if !self.is_displayed(false)? {
            return Err(CheckFailure::failed("expected to be displayed").into());
        }

        let appearance = self.appearance();
        if !appearance.constrains_size() {
            return Ok(self);
        }
        let size = self.get_size()?;

        if let Some(min) = appearance.min_height.filter(|&min| min > size.height) {
            return Err(CheckFailure::below_minimum("height:", min, size.height).into());
        }
        if let Some(min) = appearance.min_width.filter(|&min| min > size.width) {
            return Err(CheckFailure::below_minimum("width:", min, size.width).into());
        }
        if let Some(exact) = appearance.exact_height.filter(|&exact| exact != size.height) {
            return Err(CheckFailure::not_equal("height:", exact, size.height).into());
        }
        if let Some(exact) = appearance.exact_width.filter(|&exact| exact != size.width) {
            return Err(CheckFailure::not_equal("width:", exact, size.width).into());
        }
        Ok(self)
    }

    /// Exercise the element the way a user would and verify the result.
    ///
    /// Textboxes receive a fresh identifier from `ids`; checkboxes are
    /// clicked twice and end in their starting state.
    pub fn check_behaviour(&self, ids: &UniqueIds) -> PageResult<&Self> {
        debug!(element = %self, kind = %self.kind(), "checking behaviour");
        match self.kind() {
            ElementKind::Label | ElementKind::Button => Ok(self),
            ElementKind::Textbox => self.check_textbox(ids),
            ElementKind::Checkbox => self.check_checkbox(),
            kind => Err(PageError::usage(format!(
                "{kind} elements define no behaviour check"
            ))),
        }
    }

    fn check_textbox(&self, ids: &UniqueIds) -> PageResult<&Self> {
        if let Some(default) = self.default_value() {
            let value = self.get_value()?.unwrap_or_default();
            if value != default {
                return Err(CheckFailure::not_equal("textbox default value:", default, value).into());
            }
        }

        let typed = ids.identifier("");
        self.send_keys(&typed)?;
        let value = self.get_value()?.unwrap_or_default();
        if value != typed {
            return Err(CheckFailure::not_equal("textbox changed value:", typed, value).into());
        }
        Ok(self)
    }

    fn check_checkbox(&self) -> PageResult<&Self> {
        let started_on = self.is_selected()?;

        self.click()?;
        if self.is_selected()? == started_on {
            return Err(CheckFailure::failed(format!(
                "checkbox should {}be selected",
                if started_on { "not " } else { "" }
            ))
            .into());
        }

        self.click()?;
        if self.is_selected()? != started_on {
            return Err(CheckFailure::failed(format!(
                "checkbox should {}be selected",
                if started_on { "" } else { "not " }
            ))
            .into());
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{MockDriver, MockNode};
    use crate::strategy::{Locator, Strategy};
    use crate::webapp::WebApp;
    use std::sync::Arc;

    fn session() -> (MockDriver, Arc<WebApp>) {
        let mock = MockDriver::new();
        let app = WebApp::new(Arc::new(mock.clone()), "http://localhost").unwrap();
        (mock, app)
    }

    fn check_failure(err: PageError) -> CheckFailure {
        match err {
            PageError::Check(failure) => failure,
            other => panic!("expected a check failure, got {other:?}"),
        }
    }

    mod appearance_tests {
        use super::*;

        #[test]
        fn test_button_meets_minimum() {
            let (mock, app) = session();
            mock.add_node(Locator::id("go"), MockNode::new("button").sized(80, 30));
            let button = Element::new_button(&app, Strategy::Id, "go");
            assert!(button.check_appearance().is_ok());
        }

        #[test]
        fn test_hidden_element_fails() {
            let (mock, app) = session();
            mock.add_node(Locator::id("go"), MockNode::new("button").hidden());
            let button = Element::new_button(&app, Strategy::Id, "go");
            let failure = check_failure(button.check_appearance().unwrap_err());
            assert_eq!(failure, CheckFailure::failed("expected to be displayed"));
        }

        #[test]
        fn test_height_checked_before_width() {
            let (mock, app) = session();
            mock.add_node(Locator::id("go"), MockNode::new("button").sized(10, 10));
            let button = Element::new_button(&app, Strategy::Id, "go");
            let failure = check_failure(button.check_appearance().unwrap_err());
            assert_eq!(failure.to_string(), "height: expected at least <20> - got <10>");
        }

        #[test]
        fn test_exact_size() {
            let (mock, app) = session();
            mock.add_node(Locator::id("logo"), MockNode::new("span").sized(64, 32));
            let logo = Element::new_label(&app, Strategy::Id, "logo").set_exact_size(64, 30);
            let failure = check_failure(logo.check_appearance().unwrap_err());
            assert_eq!(failure, CheckFailure::not_equal("height:", 30, 32));
        }

        #[test]
        fn test_plain_element_has_no_check() {
            let (mock, app) = session();
            mock.add_node(Locator::id("x"), MockNode::new("div"));
            let el = Element::new(&app, Strategy::Id, "x");
            assert!(matches!(
                el.check_appearance(),
                Err(PageError::UsageViolation { .. })
            ));
        }
    }

    mod behaviour_tests {
        use super::*;

        #[test]
        fn test_textbox_round_trip() {
            let (mock, app) = session();
            mock.add_node(
                Locator::id("name"),
                MockNode::new("input").attribute("value", "guest"),
            );
            let ids = UniqueIds::new();
            let textbox = Element::new_textbox(&app, Strategy::Id, "name").set_default_value("guest");
            let failure = check_failure(textbox.check_behaviour(&ids).unwrap_err());
            assert!(failure.to_string().starts_with("textbox changed value: expected <"));

            textbox.clear().unwrap();
            let textbox = textbox.set_default_value("");
            assert!(textbox.check_behaviour(&ids).is_ok());
        }

        #[test]
        fn test_textbox_default_value_mismatch() {
            let (mock, app) = session();
            mock.add_node(Locator::id("name"), MockNode::new("input").attribute("value", "x"));
            let textbox = Element::new_textbox(&app, Strategy::Id, "name").set_default_value("guest");
            let failure = check_failure(textbox.check_behaviour(&UniqueIds::new()).unwrap_err());
            assert_eq!(
                failure.to_string(),
                "textbox default value: expected <guest> - got <x>"
            );
        }

        #[test]
        fn test_checkbox_toggles_and_restores() {
            let (mock, app) = session();
            mock.add_node(
                Locator::id("agree"),
                MockNode::new("input").selected(true).toggles_on_click(),
            );
            let checkbox = Element::new_checkbox(&app, Strategy::Id, "agree");
            assert!(checkbox.check_behaviour(&UniqueIds::new()).is_ok());
            assert!(checkbox.is_selected().unwrap());
            assert_eq!(mock.call_count("click:"), 2);
        }

        #[test]
        fn test_inert_checkbox_fails() {
            let (mock, app) = session();
            mock.add_node(Locator::id("agree"), MockNode::new("input"));
            let checkbox = Element::new_checkbox(&app, Strategy::Id, "agree");
            let failure = check_failure(checkbox.check_behaviour(&UniqueIds::new()).unwrap_err());
            assert_eq!(failure, CheckFailure::failed("checkbox should be selected"));
        }

        #[test]
        fn test_link_has_no_behaviour_check() {
            let (_mock, app) = session();
            let link = Element::new_link(&app, Strategy::Id, "home");
            assert!(matches!(
                link.check_behaviour(&UniqueIds::new()),
                Err(PageError::UsageViolation { .. })
            ));
        }
    }
}
