//! The packing-engine seam.
//!
//! The pipeline hands every partition to a [`PackingEngine`]: a list of image
//! files plus [`EngineOptions`] goes in, encoded sheet bytes, per-file
//! [`Placement`]s and the overall [`SheetSize`] come out. [`ImageEngine`] is the
//! built-in implementation; hosts with their own compositor implement the trait.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

pub mod compositing;
pub mod image_engine;
pub mod layout;

pub use image_engine::ImageEngine;

/// Layout algorithms understood by the built-in engine.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    /// Stack images vertically.
    #[default]
    TopDown,
    /// Line images up horizontally.
    LeftRight,
    /// Top-left to bottom-right staircase.
    Diagonal,
    /// Top-right to bottom-left staircase.
    AltDiagonal,
    /// Growing binary-tree bin packing (largest side first).
    BinaryTree,
}

impl FromStr for Algorithm {
    type Err = ();
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "top-down" | "topdown" => Ok(Self::TopDown),
            "left-right" | "leftright" => Ok(Self::LeftRight),
            "diagonal" => Ok(Self::Diagonal),
            "alt-diagonal" | "altdiagonal" => Ok(Self::AltDiagonal),
            "binary-tree" | "binarytree" => Ok(Self::BinaryTree),
            _ => Err(()),
        }
    }
}

/// Encoded format of the produced sheet.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SheetFormat {
    #[default]
    Png,
    Jpeg,
}

impl FromStr for SheetFormat {
    type Err = ();
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ExportOptions {
    pub format: SheetFormat,
    /// JPEG quality (1..=100); ignored for PNG.
    pub quality: u8,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: SheetFormat::Png,
            quality: 90,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ImageOptions {
    /// Per-image load timeout in milliseconds; 0 disables it.
    pub timeout: u64,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self { timeout: 30_000 }
    }
}

/// Options forwarded to the engine for one partition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineOptions {
    pub algorithm: Algorithm,
    pub padding: u32,
    /// Engine-specific settings, passed through untouched.
    pub engine_opts: Map<String, Value>,
    pub export_opts: ExportOptions,
    pub img_opts: ImageOptions,
}

/// One engine invocation: the files of a partition and its options.
#[derive(Debug, Clone, PartialEq)]
pub struct PackRequest {
    pub sources: Vec<PathBuf>,
    pub options: EngineOptions,
}

/// Where an image landed inside a sheet (pixels, top-left origin).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SheetSize {
    pub width: u32,
    pub height: u32,
}

/// Encoded sheet plus the layout that produced it.
#[derive(Debug, Clone)]
pub struct PackedSheet {
    pub image: Vec<u8>,
    pub coordinates: BTreeMap<PathBuf, Placement>,
    pub properties: SheetSize,
}

/// Packs a set of image files into one sheet.
///
/// Implementations must report a placement for every path in
/// [`PackRequest::sources`], keyed by the exact `PathBuf` they were given.
#[async_trait]
pub trait PackingEngine: Send + Sync {
    async fn pack(&self, request: PackRequest) -> Result<PackedSheet>;
}
