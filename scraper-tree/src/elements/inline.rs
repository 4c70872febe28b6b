//! Inline leaf elements
//!
//! Text runs and smart chips are the only elements that carry text directly.
//! Matchers may target them together through the abstract `ParagraphElement`
//! type name.

use super::Common;

/// A fragment of text with uniform attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextRun {
    pub common: Common,
    pub text: String,
    pub url: Option<String>,
}

impl TextRun {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            common: Common::default(),
            text: text.into(),
            url: None,
        }
    }

    pub fn with_common(mut self, common: Common) -> Self {
        self.common = common;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// An inline smart chip (person, date, file and similar).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chips {
    pub common: Common,
    pub text: String,
    pub url: Option<String>,
}

impl Chips {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            common: Common::default(),
            text: text.into(),
            url: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}
