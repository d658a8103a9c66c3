//! Element selection.
//!
//! Selectors address rendered DOM by CSS, visible text, test id, or ARIA
//! role, matching the ways the verification flows locate elements (an email
//! input, a "SIGN IN" button, an "Upload" FAB located by aria-label).

use serde::{Deserialize, Serialize};

/// Selector for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selector {
    /// CSS selector (e.g. `input[type='email']`)
    Css(String),
    /// Visible text content
    Text(String),
    /// Test ID selector (data-testid attribute)
    TestId(String),
    /// ARIA role with an optional accessible name
    Role {
        /// Role string (e.g. "button", "navigation")
        role: String,
        /// Accessible name to match, if any
        name: Option<String>,
    },
    /// CSS selector filtered by text content
    CssWithText {
        /// Base CSS selector
        css: String,
        /// Text content to match
        text: String,
    },
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create a text selector
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Create a test ID selector
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId(id.into())
    }

    /// Create a role selector
    #[must_use]
    pub fn role(role: impl Into<String>) -> Self {
        Self::Role {
            role: role.into(),
            name: None,
        }
    }

    /// Create a role selector with an accessible name
    #[must_use]
    pub fn role_named(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Role {
            role: role.into(),
            name: Some(name.into()),
        }
    }

    /// Filter a CSS selector by text content
    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        match self {
            Self::Css(css) => Self::CssWithText {
                css,
                text: text.into(),
            },
            other => other,
        }
    }

    /// Convert to a JavaScript expression that resolves the first matching
    /// element
    #[must_use]
    pub fn to_query(&self) -> String {
        match self {
            Self::Css(s) => format!("document.querySelector({s:?})"),
            Self::Text(t) => format!(
                "Array.from(document.querySelectorAll('*')).find(el => el.childElementCount === 0 && el.textContent.includes({t:?}))"
            ),
            Self::TestId(id) => format!("document.querySelector('[data-testid=\"{id}\"]')"),
            Self::Role { role, name } => match name {
                Some(name) => format!(
                    "Array.from(document.querySelectorAll('[role={role:?}], {role}')).find(el => (el.getAttribute('aria-label') || el.textContent).includes({name:?}))"
                ),
                None => format!("document.querySelector('[role={role:?}], {role}')"),
            },
            Self::CssWithText { css, text } => format!(
                "Array.from(document.querySelectorAll({css:?})).find(el => el.textContent.includes({text:?}))"
            ),
        }
    }

    /// Convert to a JavaScript expression counting matches
    #[must_use]
    pub fn to_count_query(&self) -> String {
        match self {
            Self::Css(s) => format!("document.querySelectorAll({s:?}).length"),
            Self::Text(t) => format!(
                "Array.from(document.querySelectorAll('*')).filter(el => el.childElementCount === 0 && el.textContent.includes({t:?})).length"
            ),
            Self::TestId(id) => format!("document.querySelectorAll('[data-testid=\"{id}\"]').length"),
            Self::Role { role, name } => match name {
                Some(name) => format!(
                    "Array.from(document.querySelectorAll('[role={role:?}], {role}')).filter(el => (el.getAttribute('aria-label') || el.textContent).includes({name:?})).length"
                ),
                None => format!("document.querySelectorAll('[role={role:?}], {role}').length"),
            },
            Self::CssWithText { css, text } => format!(
                "Array.from(document.querySelectorAll({css:?})).filter(el => el.textContent.includes({text:?})).length"
            ),
        }
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Css(s) => write!(f, "css={s}"),
            Self::Text(t) => write!(f, "text={t}"),
            Self::TestId(id) => write!(f, "testid={id}"),
            Self::Role { role, name } => match name {
                Some(name) => write!(f, "role={role}[name={name}]"),
                None => write!(f, "role={role}"),
            },
            Self::CssWithText { css, text } => write!(f, "css={css}[text={text}]"),
        }
    }
}

/// Operation performed on a located element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interaction {
    /// Fill an input with a value
    Fill(String),
    /// Click
    Click,
    /// Choose an option in a select element
    Select(String),
    /// Set the files of a file input
    SetFiles(Vec<String>),
}

impl std::fmt::Display for Interaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fill(value) => write!(f, "fill({value})"),
            Self::Click => write!(f, "click"),
            Self::Select(value) => write!(f, "select({value})"),
            Self::SetFiles(files) => write!(f, "set_files({})", files.join(", ")),
        }
    }
}
