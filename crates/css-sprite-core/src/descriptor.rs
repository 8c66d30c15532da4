use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::config::SpriteConfig;
use crate::engine::{Placement, SheetSize};
use crate::error::Result;
use crate::matcher::{Declaration, declarations};

static RETINA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)@(\d)x\.[a-z]{3,4}$").expect("BUG: invalid RETINA_RE regex literal")
});

static EXTERNAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:[a-z][a-z0-9+.-]*:)?//").expect("BUG: invalid EXTERNAL_RE regex literal")
});

/// The `sprite` member of a declaration's `@meta` annotation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageMeta(Map<String, Value>);

impl ImageMeta {
    /// Parse an annotation payload such as `{"sprite": {"skip": true}}`.
    /// Only an object-valued `sprite` member is kept.
    pub fn parse(payload: &str) -> serde_json::Result<Self> {
        let value: Value = serde_json::from_str(payload)?;
        Ok(match value {
            Value::Object(mut root) => match root.remove("sprite") {
                Some(Value::Object(sprite)) => Self(sprite),
                _ => Self::default(),
            },
            _ => Self::default(),
        })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when the annotation carries a truthy `skip`.
    pub fn is_skipped(&self) -> bool {
        self.get("skip").is_some_and(truthy)
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Packing outcome attached to a descriptor by the coordinate mapper.
#[derive(Debug, Clone, PartialEq)]
pub struct SpritePlacement {
    pub coordinates: Placement,
    pub properties: SheetSize,
    pub sprite_sheet_path: String,
}

/// One sprite candidate, from match to rewrite.
///
/// Fields are fixed once extracted; later stages add to it only through the
/// `with_*` transitions.
#[derive(Debug, Clone)]
pub struct ImageDescriptor {
    /// The exact declaration text this descriptor replaces.
    pub matched_span: String,
    /// Matches the original declaration occurrence and nothing else.
    pub substitution: Regex,
    /// Image reference as written in the stylesheet.
    pub url: String,
    /// Absolute, normalized location of the image.
    pub path: PathBuf,
    /// Repeat keyword, e.g. `no-repeat`.
    pub repeat: String,
    /// Trailing tokens kept verbatim in the rewritten declaration.
    pub unsupported: String,
    /// Whatever followed the declaration on its line.
    pub trailing: String,
    pub initial_background_x: i64,
    pub initial_background_y: i64,
    pub is_retina: bool,
    pub retina_ratio: u32,
    pub meta: ImageMeta,
    /// Labels from the grouping stages, in stage order.
    pub group: Vec<String>,
    pub placement: Option<SpritePlacement>,
}

impl ImageDescriptor {
    pub fn with_group(mut self, label: impl Into<String>) -> Self {
        self.group.push(label.into());
        self
    }

    pub fn with_placement(mut self, placement: SpritePlacement) -> Self {
        self.placement = Some(placement);
        self
    }

    pub fn substitution_pattern(&self) -> &str {
        self.substitution.as_str()
    }
}

/// Parse a horizontal/vertical offset token.
///
/// Blank tokens and tokens containing `keyword` (`left`/`top`) are 0; otherwise
/// the leading integer is taken (`10px` -> 10, `-4` -> -4). `None` when no
/// integer is present.
pub fn parse_offset(token: &str, keyword: &str) -> Option<i64> {
    let token = token.trim();
    if token.is_empty() || token.to_ascii_lowercase().contains(keyword) {
        return Some(0);
    }
    let (sign, digits) = match token.as_bytes().first() {
        Some(b'-') => (-1, &token[1..]),
        Some(b'+') => (1, &token[1..]),
        _ => (1, token),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|v| sign * v)
}

/// Build the pattern that re-finds exactly `decl` in the unmodified text.
pub fn substitution_pattern(decl: &Declaration<'_>) -> String {
    format!(
        r#"(?m)(?i:background):[ \t]*(?i:url)\([ \t]*["']?{}["']?[ \t]*\)[ \t]*{}{}{}{};{}{}$"#,
        regex::escape(decl.url),
        regex::escape(decl.x),
        regex::escape(decl.y),
        regex::escape(decl.repeat),
        regex::escape(decl.unsupported),
        regex::escape(decl.annotation),
        regex::escape(decl.rest),
    )
}

/// Turns matched declarations of one document into descriptors.
#[derive(Debug, Clone)]
pub struct DescriptorBuilder {
    document: String,
    document_dir: PathBuf,
    base_url: PathBuf,
    exclude_not_png: bool,
    retina: bool,
}

impl DescriptorBuilder {
    pub fn new(document_path: &Path, config: &SpriteConfig) -> Self {
        let document = document_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let document_dir = document_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self {
            document,
            document_dir,
            base_url: config.base_url.clone(),
            exclude_not_png: config.exclude_not_png,
            retina: config.retina,
        }
    }

    /// Scan `text` and build one descriptor per distinct declaration.
    pub fn collect(&self, text: &str) -> Result<Vec<ImageDescriptor>> {
        let mut seen = HashSet::new();
        let mut images = Vec::new();
        for decl in declarations(text) {
            if let Some(image) = self.build(&decl)? {
                if seen.insert(image.substitution_pattern().to_owned()) {
                    images.push(image);
                }
            }
        }
        Ok(images)
    }

    /// Build a descriptor, or `None` when the declaration is skipped.
    pub fn build(&self, decl: &Declaration<'_>) -> Result<Option<ImageDescriptor>> {
        let doc = self.document.as_str();
        let (Some(x), Some(y)) = (parse_offset(decl.x, "left"), parse_offset(decl.y, "top")) else {
            warn!(
                document = doc,
                url = decl.url,
                declaration = decl.text,
                "skipped: background is badly formatted for sprite generation (use [url] [x] [y] [repeat] with px, left or top positions)"
            );
            return Ok(None);
        };
        if EXTERNAL_RE.is_match(decl.url) {
            info!(document = doc, url = decl.url, "skipped: external resource");
            return Ok(None);
        }
        let file = file_part(decl.url);
        if self.exclude_not_png && !file.to_ascii_lowercase().ends_with(".png") {
            info!(document = doc, url = decl.url, "skipped: not a PNG");
            return Ok(None);
        }

        let meta = match decl.meta {
            Some(payload) => ImageMeta::parse(payload).unwrap_or_else(|err| {
                warn!(document = doc, url = decl.url, error = %err, "cannot parse meta json");
                ImageMeta::default()
            }),
            None => ImageMeta::default(),
        };

        let retina_ratio = if self.retina {
            RETINA_RE
                .captures(file)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse::<u32>().ok())
        } else {
            None
        };

        Ok(Some(ImageDescriptor {
            matched_span: decl.text.to_owned(),
            substitution: Regex::new(&substitution_pattern(decl))?,
            url: decl.url.to_owned(),
            path: self.resolve(decl.url)?,
            repeat: decl.repeat.trim().to_owned(),
            unsupported: decl.unsupported.trim().to_owned(),
            trailing: decl.rest.to_owned(),
            initial_background_x: x,
            initial_background_y: y,
            is_retina: retina_ratio.is_some(),
            retina_ratio: retina_ratio.unwrap_or(1),
            meta,
            group: Vec::new(),
            placement: None,
        }))
    }

    /// Root-relative URLs resolve against the base URL, everything else
    /// against the document's directory.
    pub fn resolve(&self, url: &str) -> Result<PathBuf> {
        let file = file_part(url);
        let joined = match file.strip_prefix('/') {
            Some(rooted) => self.base_url.join(rooted.trim_start_matches('/')),
            None => self.document_dir.join(file),
        };
        absolutize(&joined)
    }
}

/// The URL without its query string or fragment.
fn file_part(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url).trim()
}

/// Make `path` absolute against the working directory and fold `.`/`..`.
pub fn absolutize(path: &Path) -> Result<PathBuf> {
    let path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Ok(normalize(&path))
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
