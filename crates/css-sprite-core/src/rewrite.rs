use handlebars::{Handlebars, no_escape};
use regex::NoExpand;
use serde::Serialize;
use tracing::debug;

use crate::descriptor::{ImageDescriptor, SpritePlacement};
use crate::error::{Result, SpriteError};

/// Generated replacement for one `background` declaration.
pub const DEFAULT_DECLARATION_TEMPLATE: &str = concat!(
    "background: url(\"{{sprite_sheet_path}}\") {{repeat}}{{#if unsupported}} {{unsupported}}{{/if}};\n",
    "    background-position: {{x}}px {{y}}px;\n",
    "    background-size: {{width}}px {{height}}px !important;",
);

const TEMPLATE_NAME: &str = "declaration";

/// Values available to the declaration template.
#[derive(Debug, Clone, Serialize)]
pub struct DeclarationContext {
    pub sprite_sheet_path: String,
    pub repeat: String,
    pub unsupported: String,
    pub x: String,
    pub y: String,
    pub width: String,
    pub height: String,
}

/// Background position: `-(x / ratio) + initial` for retina, `-x + initial` otherwise.
pub fn background_position(image: &ImageDescriptor, placement: &SpritePlacement) -> (f64, f64) {
    let ratio = scale(image);
    (
        -(placement.coordinates.x as f64 / ratio) + image.initial_background_x as f64,
        -(placement.coordinates.y as f64 / ratio) + image.initial_background_y as f64,
    )
}

/// Background size: the sheet size, divided by the ratio for retina images.
pub fn background_size(image: &ImageDescriptor, placement: &SpritePlacement) -> (f64, f64) {
    let ratio = scale(image);
    (
        placement.properties.width as f64 / ratio,
        placement.properties.height as f64 / ratio,
    )
}

fn scale(image: &ImageDescriptor) -> f64 {
    if image.is_retina && image.retina_ratio > 0 {
        image.retina_ratio as f64
    } else {
        1.0
    }
}

/// Formats a pixel value without a trailing `.0` and without negative zero.
pub fn css_number(value: f64) -> String {
    if value == 0.0 {
        return "0".to_owned();
    }
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Renders replacement declarations and applies them to stylesheet text.
pub struct Rewriter {
    registry: Handlebars<'static>,
}

impl Rewriter {
    /// Compile `template`, or the default three-line block when `None`.
    pub fn new(template: Option<&str>) -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_escape_fn(no_escape);
        registry.register_template_string(
            TEMPLATE_NAME,
            template.unwrap_or(DEFAULT_DECLARATION_TEMPLATE),
        )?;
        Ok(Self { registry })
    }

    pub fn context(image: &ImageDescriptor) -> Result<DeclarationContext> {
        let placement = image.placement.as_ref().ok_or_else(|| SpriteError::Unplaced {
            path: image.path.clone(),
        })?;
        let (x, y) = background_position(image, placement);
        let (width, height) = background_size(image, placement);
        Ok(DeclarationContext {
            sprite_sheet_path: placement.sprite_sheet_path.clone(),
            repeat: image.repeat.clone(),
            unsupported: image.unsupported.clone(),
            x: css_number(x),
            y: css_number(y),
            width: css_number(width),
            height: css_number(height),
        })
    }

    /// The replacement block for `image`; fails with `Unplaced` if it was never packed.
    pub fn declaration(&self, image: &ImageDescriptor) -> Result<String> {
        let context = Self::context(image)?;
        Ok(self.registry.render(TEMPLATE_NAME, &context)?)
    }

    /// Replace each descriptor's original declaration in `content`, one
    /// descriptor at a time over the accumulating text.
    pub fn rewrite(&self, content: &str, images: &[ImageDescriptor]) -> Result<String> {
        let mut content = content.to_owned();
        for image in images {
            let mut replacement = self.declaration(image)?;
            replacement.push_str(&image.trailing);
            let next = image
                .substitution
                .replace_all(&content, NoExpand(&replacement))
                .into_owned();
            debug!(url = %image.url, changed = next != content, "declaration rewritten");
            content = next;
        }
        Ok(content)
    }
}
