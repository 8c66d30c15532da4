//! Finds `background: url(...) [x y] no-repeat ...;` declarations in stylesheet text.
//!
//! Only one shape is recognized, on a single line, case-insensitively:
//!
//! ```text
//! background: url("path/to/image.png") [<x> <y>] no-repeat[...] [<other tokens>]; [/* @meta {"sprite": {...}} */]
//! ```
//!
//! [`declarations`] borrows the text and yields independent [`Declaration`]
//! records; calling it again starts a fresh scan.

use std::ops::Range;
use std::sync::LazyLock;

use regex::{CaptureMatches, Captures, Regex};
use tracing::warn;

static DECLARATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?im)background:[ \t]*url\([ \t]*",
        r#"["']?([\w \t!:./@-]*\.[\w?#]+)["']?"#,
        r"[ \t]*\)[ \t]*",
        r"([^\s;{}]*[ \t]*)",
        r"([^\s;{}]*[ \t]*)",
        r"(no-repeat[^\s;{}]*[ \t]*)",
        r"([^;\n{}]*);",
        r"([ \t]*/\*[ \t]*@meta[ \t]*(\{.*\})[ \t]*\*/)?",
        r"(.*)$",
    ))
    .expect("BUG: invalid DECLARATION_RE regex literal")
});

/// One matched declaration. Token fields are the raw captures, trailing
/// whitespace included, so they can be stitched back into an exact pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration<'t> {
    /// Byte range of the match within the scanned text.
    pub span: Range<usize>,
    /// Full matched text, from `background:` to the end of the line.
    pub text: &'t str,
    pub url: &'t str,
    pub x: &'t str,
    pub y: &'t str,
    pub repeat: &'t str,
    /// Tokens between the repeat keyword and `;` the rewriter cannot interpret.
    pub unsupported: &'t str,
    /// The whole `/* @meta ... */` comment, including leading blanks.
    pub annotation: &'t str,
    /// JSON payload of the annotation.
    pub meta: Option<&'t str>,
    /// Remainder of the line after the declaration (and annotation).
    pub rest: &'t str,
}

impl<'t> Declaration<'t> {
    fn from_captures(caps: &Captures<'t>) -> Option<Self> {
        let whole = caps.get(0)?;
        let group = |i: usize| caps.get(i).map_or("", |m| m.as_str());
        Some(Self {
            span: whole.range(),
            text: whole.as_str(),
            url: group(1),
            x: group(2),
            y: group(3),
            repeat: group(4),
            unsupported: group(5),
            annotation: group(6),
            meta: caps.get(7).map(|m| m.as_str()),
            rest: group(8),
        })
    }

    pub fn has_unsupported(&self) -> bool {
        !self.unsupported.trim().is_empty()
    }
}

/// Lazy scan over the declarations of one text.
pub struct Declarations<'t> {
    inner: CaptureMatches<'static, 't>,
}

impl<'t> Iterator for Declarations<'t> {
    type Item = Declaration<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        let caps = self.inner.next()?;
        let decl = Declaration::from_captures(&caps)?;
        if decl.has_unsupported() {
            warn!(
                url = decl.url,
                unsupported = decl.unsupported.trim(),
                declaration = decl.text,
                "background declaration has attributes the sprite rewriter cannot interpret"
            );
        }
        Some(decl)
    }
}

/// Scan `text` for sprite candidate declarations. Never mutates the input.
pub fn declarations(text: &str) -> Declarations<'_> {
    Declarations {
        inner: DECLARATION_RE.captures_iter(text),
    }
}
