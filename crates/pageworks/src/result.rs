//! Result and error types for pageworks.

use thiserror::Error;

use crate::driver::DriverError;

/// Result type for pageworks operations
pub type PageResult<T> = Result<T, PageError>;

/// Errors that can occur while locating or driving page elements
#[derive(Debug, Error)]
pub enum PageError {
    /// The targeted node, window key, container label or link key does not exist
    #[error("Not found: {target}")]
    NotFound {
        /// What was looked up
        target: String,
    },

    /// A locator strategy tag the resolver does not recognize
    #[error("Unknown locator strategy: {strategy}")]
    UnknownStrategy {
        /// The offending tag
        strategy: String,
    },

    /// Identifier template and content disagree in arity or type
    #[error("Template mismatch in {template:?}: {reason}")]
    TemplateMismatch {
        /// The identifier template
        template: String,
        /// Why substitution failed
        reason: String,
    },

    /// An operation the page-object API disallows was attempted
    #[error("Usage violation: {operation}")]
    UsageViolation {
        /// What was attempted, and why it is disallowed
        operation: String,
    },

    /// An appearance or behaviour check failed
    #[error("Check failed: {0}")]
    Check(#[from] CheckFailure),

    /// A previously resolved node was detached from the document
    #[error("Stale node: {target}")]
    StaleElement {
        /// Locator of the stale node
        target: String,
    },

    /// The browser window the driver was pointed at is gone
    #[error("No such window: {handle}")]
    NoSuchWindow {
        /// Handle of the missing window
        handle: String,
    },

    /// A contract of the page-object API was violated
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// Any other failure reported by the driver
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// Malformed configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },
}

impl PageError {
    /// Build a `NotFound` error
    pub fn not_found(target: impl Into<String>) -> Self {
        Self::NotFound {
            target: target.into(),
        }
    }

    /// Build a `UsageViolation` error
    pub fn usage(operation: impl Into<String>) -> Self {
        Self::UsageViolation {
            operation: operation.into(),
        }
    }

    /// Build an `AssertionFailed` error
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }

    /// Whether this is a `NotFound` error
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Errors a polling loop may swallow and retry: the page is still settling
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::StaleElement { .. })
    }
}

impl From<DriverError> for PageError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::NoSuchElement { locator } => Self::NotFound { target: locator },
            DriverError::NoSuchWindow { handle } => Self::NoSuchWindow { handle },
            DriverError::StaleElement { locator } => Self::StaleElement { target: locator },
            DriverError::Other { message } => Self::Driver { message },
        }
    }
}

/// Failures raised by the appearance/behaviour verification helpers.
///
/// Every refined form carries the property checked plus expected and actual
/// values, rendered the same way regardless of the value type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckFailure {
    /// A free-form check failure
    #[error("{message}")]
    Failed {
        /// Error message
        message: String,
    },

    /// Value differs from the expected one
    #[error("{}expected <{expected}> - got <{actual}>", prefix(.property))]
    NotEqual {
        /// Property checked (e.g. "height:")
        property: String,
        /// Expected value
        expected: String,
        /// Observed value
        actual: String,
    },

    /// Value is below the required minimum
    #[error("{}expected at least <{minimum}> - got <{actual}>", prefix(.property))]
    BelowMinimum {
        /// Property checked
        property: String,
        /// Lower bound
        minimum: String,
        /// Observed value
        actual: String,
    },

    /// Value is above the allowed maximum
    #[error("{}expected at most <{maximum}> - got <{actual}>", prefix(.property))]
    AboveMaximum {
        /// Property checked
        property: String,
        /// Upper bound
        maximum: String,
        /// Observed value
        actual: String,
    },
}

fn prefix(property: &str) -> String {
    if property.is_empty() || property.ends_with(' ') {
        property.to_string()
    } else {
        format!("{property} ")
    }
}

impl CheckFailure {
    /// Free-form failure
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    /// Equality failure
    pub fn not_equal(
        property: impl Into<String>,
        expected: impl ToString,
        actual: impl ToString,
    ) -> Self {
        Self::NotEqual {
            property: property.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Minimum-bound failure
    pub fn below_minimum(
        property: impl Into<String>,
        minimum: impl ToString,
        actual: impl ToString,
    ) -> Self {
        Self::BelowMinimum {
            property: property.into(),
            minimum: minimum.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Maximum-bound failure
    pub fn above_maximum(
        property: impl Into<String>,
        maximum: impl ToString,
        actual: impl ToString,
    ) -> Self {
        Self::AboveMaximum {
            property: property.into(),
            maximum: maximum.to_string(),
            actual: actual.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_failure_messages() {
        assert_eq!(
            CheckFailure::not_equal("height:", 20, 18).to_string(),
            "height: expected <20> - got <18>"
        );
        assert_eq!(
            CheckFailure::below_minimum("width:", 40, 12).to_string(),
            "width: expected at least <40> - got <12>"
        );
        assert_eq!(
            CheckFailure::above_maximum("", 3, 4).to_string(),
            "expected at most <3> - got <4>"
        );
    }

    #[test]
    fn test_driver_error_mapping() {
        let err: PageError = DriverError::NoSuchElement {
            locator: "id=nope".to_string(),
        }
        .into();
        assert!(err.is_not_found());
        assert!(err.is_transient());

        let err: PageError = DriverError::StaleElement {
            locator: "id=gone".to_string(),
        }
        .into();
        assert!(matches!(err, PageError::StaleElement { .. }));
        assert!(err.is_transient());

        let err: PageError = DriverError::Other {
            message: "boom".to_string(),
        }
        .into();
        assert!(!err.is_transient());
    }

    #[test]
    fn test_lost_window_is_neither_not_found_nor_transient() {
        let err: PageError = DriverError::NoSuchWindow {
            handle: "window-0".to_string(),
        }
        .into();
        assert!(matches!(err, PageError::NoSuchWindow { ref handle } if handle == "window-0"));
        assert!(!err.is_not_found());
        assert!(!err.is_transient());
    }

    #[test]
    fn test_check_failure_wraps_into_page_error() {
        let err: PageError = CheckFailure::failed("expected to be displayed").into();
        assert_eq!(err.to_string(), "Check failed: expected to be displayed");
    }
}
