//! Core library for turning stylesheet background images into sprite sheets.
//!
//! - Extraction: `background: url(...) [x y] no-repeat;` declarations become `ImageDescriptor`s
//! - Stages: async filters and groupers (built-in meta-skip, file-exists and retina stages around user ones)
//! - Packing: one engine call per group partition; `ImageEngine` is the built-in engine
//! - Rewriting: declarations are replaced with sheet URL, position and size, retina-aware
//!
//! Quick example:
//! ```ignore
//! use css_sprite_core::prelude::*;
//! # async fn run() -> css_sprite_core::Result<()> {
//! let cfg = SpriteConfig::builder().sprite_sheet_name("sprite.png").padding(2).build();
//! let pipeline = SpritePipeline::new(cfg)?;
//! let css = std::fs::read("styles/main.css")?;
//! let out = pipeline.process(Document::new("styles/main.css", css)).await?;
//! println!("sheets: {}", out.sprite_sheets.len());
//! # Ok(()) }
//! ```

pub mod config;
pub mod descriptor;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod export;
pub mod mapper;
pub mod matcher;
pub mod pipeline;
pub mod rewrite;
pub mod stage;

pub use config::*;
pub use error::*;
pub use pipeline::*;

/// Convenience prelude for common types and functions.
/// Importing `css_sprite_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::config::{SpriteConfig, SpriteConfigBuilder};
    pub use crate::descriptor::{ImageDescriptor, ImageMeta, SpritePlacement};
    pub use crate::dispatch::{GroupKey, PackingResult};
    pub use crate::engine::{
        Algorithm, EngineOptions, ImageEngine, PackRequest, PackedSheet, PackingEngine, Placement,
        SheetFormat, SheetSize,
    };
    pub use crate::error::{Result, SpriteError, StageError};
    pub use crate::export::Artifact;
    pub use crate::pipeline::{
        Document, ProcessedDocument, SpriteChannels, SpritePipeline, SpritePipelineBuilder,
    };
    pub use crate::stage::{ImageFilter, ImageGrouper, filter_fn, group_fn};
}
