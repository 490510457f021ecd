//! Core type definitions shared by the browser session and action helpers

use serde::{Deserialize, Serialize};

/// How an element is looked up on the page
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "strategy", content = "value", rename_all = "lowercase")]
pub enum Locator {
    XPath(String),
    Css(String),
}

impl Locator {
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// The raw selector text, without the strategy
    pub fn as_str(&self) -> &str {
        match self {
            Self::XPath(expr) => expr,
            Self::Css(selector) => selector,
        }
    }

    /// XPath addressing the n-th (1-based) match, e.g. `(//div[@data-role="spinner"])[2]`
    ///
    /// Returns `None` for CSS locators, which have no positional syntax.
    pub fn nth_xpath(&self, position: usize) -> Option<String> {
        match self {
            Self::XPath(expr) => Some(format!("({})[{}]", expr, position)),
            Self::Css(_) => None,
        }
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::XPath(expr) => write!(f, "xpath={}", expr),
            Self::Css(selector) => write!(f, "css={}", selector),
        }
    }
}

impl std::str::FromStr for Locator {
    type Err = String;

    /// Anything starting with `/`, `(`, `./` or `..` is taken as XPath,
    /// everything else as CSS (so `.class` stays a CSS selector).
    /// Explicit `xpath=` / `css=` prefixes override the guess.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("Empty locator".to_string());
        }

        if let Some(expr) = s.strip_prefix("xpath=") {
            return Ok(Self::xpath(expr));
        }
        if let Some(selector) = s.strip_prefix("css=") {
            return Ok(Self::css(selector));
        }

        let looks_like_xpath = s.starts_with('/')
            || s.starts_with('(')
            || s.starts_with("./")
            || s.starts_with("..")
            || s == ".";
        if looks_like_xpath {
            Ok(Self::xpath(s))
        } else {
            Ok(Self::css(s))
        }
    }
}

/// Positional reference to an element: the n-th (1-based) match of a locator
///
/// Handles are re-resolved on every use rather than holding a live DOM
/// reference, so an element removed mid-wait simply stops resolving.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle {
    pub locator: Locator,
    pub position: usize,
}

impl ElementHandle {
    pub fn new(locator: Locator, position: usize) -> Self {
        Self { locator, position }
    }

    /// All handles for a snapshot of `count` matches
    pub fn snapshot(locator: &Locator, count: usize) -> Vec<Self> {
        (1..=count)
            .map(|position| Self::new(locator.clone(), position))
            .collect()
    }
}

impl std::fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.locator.nth_xpath(self.position) {
            Some(xpath) => write!(f, "{}", xpath),
            None => write!(f, "{}[{}]", self.locator, self.position),
        }
    }
}

/// Top-left corner of an element in page coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One step of a pointer gesture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "args", rename_all = "snake_case")]
pub enum PointerOp {
    /// Move the pointer to the center of the element
    MoveToElement(ElementHandle),
    /// Move to the element and press the primary button
    ClickAndHold(ElementHandle),
    /// Move relative to the current pointer position
    MoveByOffset { dx: i64, dy: i64 },
    /// Release the primary button, over the element if given, else in place
    Release(Option<ElementHandle>),
}

impl PointerOp {
    pub fn move_by(dx: i64, dy: i64) -> Self {
        Self::MoveByOffset { dx, dy }
    }
}
