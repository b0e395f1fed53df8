//! HTML template system for page generation.
//!
//! Templates are plain HTML with a fixed set of `$name$` placeholders. Rendering
//! is a single pass over the template: every placeholder is matched by one
//! alternation regex and replaced by its value, which is inserted literally and
//! never scanned again. A post whose content contains `$title$` therefore shows
//! `$title$`, not the page title.

use std::{borrow::Cow, collections::HashMap};

use regex::{Captures, Regex};
use thiserror::Error;

/// Template rendering errors.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// A placeholder was not given a value.
    #[error("missing value for placeholder {}", .0.token())]
    MissingPlaceholder(Placeholder),

    /// The placeholder pattern failed to compile.
    #[error("invalid placeholder pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Result type for template operations.
pub type Result<T> = std::result::Result<T, TemplateError>;

/// Every placeholder a template may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    Title,
    Description,
    AdditionalCss,
    PostScript,
    MenuButtons,
    Content,
    ContentFooter,
    AdditionalMeta,
    Year,
}

impl Placeholder {
    /// All placeholders, in template order.
    pub const ALL: [Placeholder; 9] = [
        Self::Title,
        Self::Description,
        Self::AdditionalCss,
        Self::PostScript,
        Self::MenuButtons,
        Self::Content,
        Self::ContentFooter,
        Self::AdditionalMeta,
        Self::Year,
    ];

    /// The literal token in template files.
    #[must_use]
    pub fn token(self) -> &'static str {
        match self {
            Self::Title => "$title$",
            Self::Description => "$description$",
            Self::AdditionalCss => "$additional-css$",
            Self::PostScript => "$post-script$",
            Self::MenuButtons => "$menu-buttons$",
            Self::Content => "$content$",
            Self::ContentFooter => "$content-footer$",
            Self::AdditionalMeta => "$additional-meta$",
            Self::Year => "$year$",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.token() == token)
    }
}

/// Values for one render call.
#[derive(Debug, Clone, Default)]
pub struct Substitutions {
    values: HashMap<Placeholder, String>,
}

impl Substitutions {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value of a placeholder.
    pub fn insert(&mut self, placeholder: Placeholder, value: impl Into<String>) {
        self.values.insert(placeholder, value.into());
    }

    /// Builder form of [`Substitutions::insert`].
    #[must_use]
    pub fn with(mut self, placeholder: Placeholder, value: impl Into<String>) -> Self {
        self.insert(placeholder, value);
        self
    }

    /// Get the value of a placeholder.
    #[must_use]
    pub fn get(&self, placeholder: Placeholder) -> Option<&str> {
        self.values.get(&placeholder).map(String::as_str)
    }
}

/// A parsed page template.
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
    pattern: Regex,
}

impl Template {
    /// Create a template from its source text.
    pub fn new(source: impl Into<String>) -> Result<Self> {
        let alternation = Placeholder::ALL
            .iter()
            .map(|p| regex::escape(p.token()))
            .collect::<Vec<_>>()
            .join("|");

        Ok(Self {
            source: source.into(),
            pattern: Regex::new(&alternation)?,
        })
    }

    /// The unrendered template text.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Render the template. Every placeholder must have a value, whether or not
    /// it occurs in this template.
    pub fn render(&self, substitutions: &Substitutions) -> Result<String> {
        if let Some(missing) = Placeholder::ALL
            .into_iter()
            .find(|p| substitutions.get(*p).is_none())
        {
            return Err(TemplateError::MissingPlaceholder(missing));
        }

        let rendered = self.pattern.replace_all(&self.source, |caps: &Captures<'_>| {
            Placeholder::from_token(&caps[0])
                .and_then(|p| substitutions.get(p))
                .unwrap_or_default()
                .to_string()
        });

        Ok(match rendered {
            Cow::Borrowed(unchanged) => unchanged.to_string(),
            Cow::Owned(output) => output,
        })
    }
}

/// Minify a rendered page: drop leading indentation on every line, then join
/// lines that end in `>`.
///
/// Whitespace inside `<pre>` and `<code>` is compressed like everything else.
#[must_use]
pub fn compress(html: &str) -> String {
    let mut stripped = String::with_capacity(html.len());
    for line in html.split_inclusive('\n') {
        stripped.push_str(line.trim_start_matches([' ', '\t']));
    }
    stripped.replace(">\n", ">")
}
