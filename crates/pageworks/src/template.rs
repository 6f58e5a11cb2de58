//! Positional identifier templates.
//!
//! Identifiers may carry `%s`, `%d`/`%i`, `%f` placeholders (and `%%` for a
//! literal percent sign) that are filled, in order, from an element's
//! content. The number of content values must match the number of
//! placeholders exactly; substitution is all-or-nothing.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::result::{PageError, PageResult};

/// One value substituted into an identifier template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    /// Integer content, accepted by every placeholder
    Int(i64),
    /// Floating point content, accepted by every placeholder
    Float(f64),
    /// Text content, accepted only by `%s`
    Text(String),
}

impl Content {
    const fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "str",
        }
    }
}

impl fmt::Display for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{x:.1}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Content {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Content {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&String> for Content {
    fn from(s: &String) -> Self {
        Self::Text(s.clone())
    }
}

macro_rules! int_content {
    ($($t:ty),*) => {
        $(impl From<$t> for Content {
            fn from(i: $t) -> Self {
                Self::Int(i64::from(i))
            }
        })*
    };
}

int_content!(i8, i16, i32, i64, u8, u16, u32);

impl From<usize> for Content {
    fn from(i: usize) -> Self {
        Self::Int(i as i64)
    }
}

impl From<f32> for Content {
    fn from(x: f32) -> Self {
        Self::Float(f64::from(x))
    }
}

impl From<f64> for Content {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

/// Count the placeholders in a template (`%%` is not a placeholder)
#[must_use]
pub fn placeholder_count(template: &str) -> usize {
    let mut count = 0;
    let mut chars = template.chars();
    while let Some(c) = chars.next() {
        if c == '%' {
            match chars.next() {
                Some('%') | None => {}
                Some(_) => count += 1,
            }
        }
    }
    count
}

/// Fill `template` with `content`, in order.
///
/// # Errors
///
/// `TemplateMismatch` when there are too few or too many values, when a
/// numeric placeholder receives text, or when the template holds an
/// unsupported or incomplete directive.
pub fn fill(template: &str, content: &[Content]) -> PageResult<String> {
    let mismatch = |reason: String| PageError::TemplateMismatch {
        template: template.to_string(),
        reason,
    };

    let mut out = String::with_capacity(template.len());
    let mut values = content.iter();
    let mut chars = template.chars();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        let directive = chars
            .next()
            .ok_or_else(|| mismatch("incomplete format".to_string()))?;
        if directive == '%' {
            out.push('%');
            continue;
        }

        let value = values
            .next()
            .ok_or_else(|| mismatch("not enough arguments for format string".to_string()))?;

        match (directive, value) {
            ('s', v) => out.push_str(&v.to_string()),
            ('d' | 'i', Content::Int(i)) => out.push_str(&i.to_string()),
            ('d' | 'i', Content::Float(x)) if !x.is_finite() => {
                return Err(mismatch(format!("%{directive} format: cannot convert {x} to integer")));
            }
            ('d' | 'i', Content::Float(x)) => out.push_str(&(x.trunc() as i64).to_string()),
            ('f', Content::Int(i)) => out.push_str(&format!("{:.6}", *i as f64)),
            ('f', Content::Float(x)) => out.push_str(&format!("{x:.6}")),
            ('d' | 'i' | 'f', v) => {
                return Err(mismatch(format!(
                    "%{directive} format: a number is required, not {}",
                    v.type_name()
                )));
            }
            (other, _) => {
                return Err(mismatch(format!("unsupported format character '{other}'")));
            }
        }
    }

    if values.next().is_some() {
        return Err(mismatch(
            "not all arguments converted during string formatting".to_string(),
        ));
    }

    Ok(out)
}
