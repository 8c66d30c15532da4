use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::engine::{Algorithm, EngineOptions, ExportOptions, ImageOptions};
use crate::error::{Result, SpriteError};

/// Sprite generation settings.
/// Key notes:
///   - `sprite_sheet_name` is required; group labels are spliced into it per sheet
///   - `retina` drives `@<N>x` detection, grouping and coordinate scaling
///   - `algorithm`, `engine_opts`, `export_opts` and `img_opts` go to the packing engine as-is
///
/// Field names deserialize from camelCase (`spriteSheetName`, `excludeNotPng`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpriteConfig {
    /// Base path of the produced sheet(s), e.g. `img/sprite.png`.
    #[serde(default)]
    pub sprite_sheet_name: Option<String>,
    /// Skip references that do not end in `.png`.
    #[serde(default = "default_true")]
    pub exclude_not_png: bool,
    /// Pixels between packed images (scaled for uniform retina groups).
    #[serde(default)]
    pub padding: u32,
    /// Base directory for root-relative (`/...`) image URLs.
    #[serde(default = "default_base_url")]
    pub base_url: PathBuf,
    /// Detect `@<N>x` images, group them separately and scale their offsets.
    #[serde(default = "default_true")]
    pub retina: bool,
    /// Output stylesheet name; defaults to the input document's file name.
    #[serde(default)]
    pub style_sheet_name: Option<String>,
    /// Prefix joined with each sheet path in rewritten `url(...)`s.
    #[serde(default)]
    pub sprite_sheet_path: Option<String>,
    /// Handlebars template replacing the generated declaration block.
    #[serde(default)]
    pub declaration_template: Option<String>,

    // engine pass-through
    #[serde(default)]
    pub algorithm: Algorithm,
    #[serde(default)]
    pub engine_opts: Map<String, Value>,
    #[serde(default)]
    pub export_opts: ExportOptions,
    #[serde(default)]
    pub img_opts: ImageOptions,
}

impl Default for SpriteConfig {
    fn default() -> Self {
        Self {
            sprite_sheet_name: None,
            exclude_not_png: true,
            padding: 0,
            base_url: default_base_url(),
            retina: true,
            style_sheet_name: None,
            sprite_sheet_path: None,
            declaration_template: None,
            algorithm: Algorithm::default(),
            engine_opts: Map::new(),
            export_opts: ExportOptions::default(),
            img_opts: ImageOptions::default(),
        }
    }
}

impl SpriteConfig {
    /// Checks required options before any document is processed.
    pub fn validate(&self) -> Result<()> {
        self.sheet_name().map(|_| ())
    }

    /// The required sheet name, or `MissingOption` when absent or blank.
    pub fn sheet_name(&self) -> Result<&str> {
        match self.sprite_sheet_name.as_deref() {
            Some(name) if !name.trim().is_empty() => Ok(name),
            _ => Err(SpriteError::MissingOption("spriteSheetName")),
        }
    }

    /// Engine options shared by every partition before per-partition overrides.
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            algorithm: self.algorithm,
            padding: self.padding,
            engine_opts: self.engine_opts.clone(),
            export_opts: self.export_opts.clone(),
            img_opts: self.img_opts.clone(),
        }
    }

    /// Create a fluent builder for `SpriteConfig`.
    pub fn builder() -> SpriteConfigBuilder {
        SpriteConfigBuilder::new()
    }
}

fn default_true() -> bool {
    true
}
fn default_base_url() -> PathBuf {
    PathBuf::from("./")
}

/// Builder for `SpriteConfig` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct SpriteConfigBuilder {
    cfg: SpriteConfig,
}

impl SpriteConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: SpriteConfig::default(),
        }
    }
    pub fn sprite_sheet_name(mut self, v: impl Into<String>) -> Self {
        self.cfg.sprite_sheet_name = Some(v.into());
        self
    }
    pub fn exclude_not_png(mut self, v: bool) -> Self {
        self.cfg.exclude_not_png = v;
        self
    }
    pub fn padding(mut self, v: u32) -> Self {
        self.cfg.padding = v;
        self
    }
    pub fn base_url(mut self, v: impl Into<PathBuf>) -> Self {
        self.cfg.base_url = v.into();
        self
    }
    pub fn retina(mut self, v: bool) -> Self {
        self.cfg.retina = v;
        self
    }
    pub fn style_sheet_name(mut self, v: impl Into<String>) -> Self {
        self.cfg.style_sheet_name = Some(v.into());
        self
    }
    pub fn sprite_sheet_path(mut self, v: impl Into<String>) -> Self {
        self.cfg.sprite_sheet_path = Some(v.into());
        self
    }
    pub fn declaration_template(mut self, v: impl Into<String>) -> Self {
        self.cfg.declaration_template = Some(v.into());
        self
    }
    pub fn algorithm(mut self, v: Algorithm) -> Self {
        self.cfg.algorithm = v;
        self
    }
    pub fn engine_opt(mut self, key: impl Into<String>, value: Value) -> Self {
        self.cfg.engine_opts.insert(key.into(), value);
        self
    }
    pub fn export_opts(mut self, v: ExportOptions) -> Self {
        self.cfg.export_opts = v;
        self
    }
    pub fn image_timeout_ms(mut self, v: u64) -> Self {
        self.cfg.img_opts.timeout = v;
        self
    }
    pub fn build(self) -> SpriteConfig {
        self.cfg
    }
}
