//! Locator strategies and xpath composition.
//!
//! An element's identifier is interpreted through a [`Strategy`]. Lookups
//! without a parent are handed to the driver natively; lookups with a parent
//! are expressed as xpath by concatenating the parent's xpath form with the
//! child's.
//!
//! # Composition caveat
//!
//! Concatenation is literal. `Id` and `Tag` fragments are absolute (they
//! start with `//`), so a child authored as `Id` under any parent produces
//! `<parent>//*[@id='child']`, which matches any descendant with that id.
//! A child meant to be a direct child must be authored as a relative xpath
//! such as `/input[@type='text']`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::result::{PageError, PageResult};
use crate::template::{self, Content};

/// How an identifier string is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Strategy {
    /// Match the `id` attribute
    Id,
    /// Match the tag name
    Tag,
    /// Raw xpath expression
    XPath,
}

impl Strategy {
    /// Tag used in configuration and log output
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Tag => "tag",
            Self::XPath => "xpath",
        }
    }

    /// Xpath form of an already-filled identifier
    #[must_use]
    pub fn wrap(&self, identifier: &str) -> String {
        match self {
            Self::Id => format!("//*[@id='{identifier}']"),
            Self::Tag => format!("//{identifier}"),
            Self::XPath => identifier.to_string(),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = PageError;

    fn from_str(s: &str) -> PageResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "id" => Ok(Self::Id),
            "tag" | "tag_name" => Ok(Self::Tag),
            "xpath" => Ok(Self::XPath),
            _ => Err(PageError::UnknownStrategy {
                strategy: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for Strategy {
    type Error = PageError;

    fn try_from(s: String) -> PageResult<Self> {
        s.parse()
    }
}

impl From<Strategy> for String {
    fn from(strategy: Strategy) -> Self {
        strategy.as_str().to_string()
    }
}

/// Fill `template` with `content` and express the result as xpath.
///
/// ```ignore
/// assert_eq!(
///     xpath_of(Strategy::Id, "foo_%s_id", &["x".into()])?,
///     "//*[@id='foo_x_id']"
/// );
/// ```
pub fn xpath_of(strategy: Strategy, template: &str, content: &[Content]) -> PageResult<String> {
    Ok(strategy.wrap(&template::fill(template, content)?))
}

/// A concrete query handed to the driver
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    /// Strategy the driver should use
    pub by: Strategy,
    /// The filled identifier or composed xpath
    pub value: String,
}

impl Locator {
    /// Create a locator
    pub fn new(by: Strategy, value: impl Into<String>) -> Self {
        Self {
            by,
            value: value.into(),
        }
    }

    /// Shorthand for an id locator
    pub fn id(value: impl Into<String>) -> Self {
        Self::new(Strategy::Id, value)
    }

    /// Shorthand for a tag locator
    pub fn tag(value: impl Into<String>) -> Self {
        Self::new(Strategy::Tag, value)
    }

    /// Shorthand for an xpath locator
    pub fn xpath(value: impl Into<String>) -> Self {
        Self::new(Strategy::XPath, value)
    }

    /// The equivalent xpath expression
    #[must_use]
    pub fn to_xpath(&self) -> String {
        self.by.wrap(&self.value)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.by, self.value)
    }
}

/// Identity of a locatable thing: strategy, identifier template and content.
///
/// Shared by elements and collections; the parent chain lives on the owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocatorSpec {
    /// Strategy applied to the identifier
    pub strategy: Strategy,
    /// Identifier, possibly templated
    pub identifier: String,
    /// Values filling the template
    #[serde(default)]
    pub content: Vec<Content>,
}

impl LocatorSpec {
    /// Create a spec with no content
    pub fn new(strategy: Strategy, identifier: impl Into<String>) -> Self {
        Self {
            strategy,
            identifier: identifier.into(),
            content: Vec::new(),
        }
    }

    /// The filled identifier, without strategy wrapping
    pub fn filled(&self) -> PageResult<String> {
        template::fill(&self.identifier, &self.content)
    }

    /// The xpath fragment of this spec alone
    pub fn xpath(&self) -> PageResult<String> {
        xpath_of(self.strategy, &self.identifier, &self.content)
    }

    /// Native locator for a lookup without a parent
    pub fn native(&self) -> PageResult<Locator> {
        Ok(Locator::new(self.strategy, self.filled()?))
    }

    /// Locator composed under a parent's xpath: `parent ++ self`
    pub fn under(&self, parent_xpath: &str) -> PageResult<Locator> {
        Ok(Locator::xpath(format!("{parent_xpath}{}", self.xpath()?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod strategy_tests {
        use super::*;

        #[test]
        fn test_wrap() {
            assert_eq!(Strategy::Id.wrap("root"), "//*[@id='root']");
            assert_eq!(Strategy::Tag.wrap("input"), "//input");
            assert_eq!(Strategy::XPath.wrap("/label"), "/label");
        }

        #[test]
        fn test_parse_known_tags() {
            assert_eq!("id".parse::<Strategy>().unwrap(), Strategy::Id);
            assert_eq!("TAG".parse::<Strategy>().unwrap(), Strategy::Tag);
            assert_eq!("xpath".parse::<Strategy>().unwrap(), Strategy::XPath);
        }

        #[test]
        fn test_parse_unknown_tag() {
            let err = "css".parse::<Strategy>().unwrap_err();
            assert!(matches!(err, PageError::UnknownStrategy { ref strategy } if strategy == "css"));
        }

        #[test]
        fn test_serde_round_trip_uses_tags() {
            let json = serde_json::to_string(&Strategy::XPath).unwrap();
            assert_eq!(json, "\"xpath\"");
            let err = serde_json::from_str::<Strategy>("\"link_text\"");
            assert!(err.is_err());
        }
    }

    mod xpath_tests {
        use super::*;

        #[test]
        fn test_id_template() {
            assert_eq!(
                xpath_of(Strategy::Id, "foo_%s_id", &["x".into()]).unwrap(),
                "//*[@id='foo_x_id']"
            );
        }

        #[test]
        fn test_tag_template() {
            assert_eq!(
                xpath_of(Strategy::Tag, "%s", &["input".into()]).unwrap(),
                "//input"
            );
        }

        #[test]
        fn test_xpath_verbatim() {
            assert_eq!(
                xpath_of(Strategy::XPath, "//tr[%d]/td", &[2.into()]).unwrap(),
                "//tr[2]/td"
            );
        }

        #[test]
        fn test_mismatch_propagates() {
            assert!(matches!(
                xpath_of(Strategy::Id, "a_%s", &[]),
                Err(PageError::TemplateMismatch { .. })
            ));
        }
    }

    mod locator_spec_tests {
        use super::*;

        #[test]
        fn test_native_locator_keeps_strategy() {
            let spec = LocatorSpec::new(Strategy::Id, "text-input");
            assert_eq!(spec.native().unwrap(), Locator::id("text-input"));
        }

        #[test]
        fn test_under_concatenates_literally() {
            let parent = LocatorSpec::new(Strategy::Id, "login-form");
            let child = LocatorSpec::new(Strategy::XPath, "/input[@type='text']");
            let locator = child.under(&parent.xpath().unwrap()).unwrap();
            assert_eq!(locator.by, Strategy::XPath);
            assert_eq!(locator.value, "//*[@id='login-form']/input[@type='text']");
        }

        #[test]
        fn test_absolute_child_stays_absolute() {
            let parent = LocatorSpec::new(Strategy::Id, "root");
            let child = LocatorSpec::new(Strategy::Id, "text-input");
            let locator = child.under(&parent.xpath().unwrap()).unwrap();
            assert_eq!(locator.value, "//*[@id='root']//*[@id='text-input']");
        }

        #[test]
        fn test_locator_display() {
            assert_eq!(Locator::tag("input").to_string(), "tag=input");
            assert_eq!(Locator::id("x").to_xpath(), "//*[@id='x']");
        }
    }
}
