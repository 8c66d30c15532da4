#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use css_sprite_core::descriptor::DescriptorBuilder;
use css_sprite_core::prelude::*;
use image::{Rgba, RgbaImage};

/// Engine that stacks every source as a 10x10 tile and records requests.
#[derive(Default)]
pub struct RecordingEngine {
    pub requests: Mutex<Vec<PackRequest>>,
    pub fail: bool,
}

impl RecordingEngine {
    pub fn failing() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn requests(&self) -> Vec<PackRequest> {
        self.requests.lock().expect("lock").clone()
    }
}

#[async_trait]
impl PackingEngine for RecordingEngine {
    async fn pack(&self, request: PackRequest) -> Result<PackedSheet> {
        self.requests.lock().expect("lock").push(request.clone());
        if self.fail {
            return Err(SpriteError::Engine("boom".into()));
        }
        let mut coordinates = BTreeMap::new();
        for (i, path) in request.sources.iter().enumerate() {
            coordinates.insert(
                path.clone(),
                Placement {
                    x: 0,
                    y: 10 * i as u32,
                    width: 10,
                    height: 10,
                },
            );
        }
        Ok(PackedSheet {
            image: vec![0x89, b'P', b'N', b'G'],
            coordinates,
            properties: SheetSize {
                width: 10,
                height: 10 * request.sources.len() as u32,
            },
        })
    }
}

pub fn config() -> SpriteConfig {
    SpriteConfig::builder().sprite_sheet_name("sprite.png").build()
}

/// Descriptors for `css` as if it lived at `doc`.
pub fn descriptors(css: &str, doc: &Path, cfg: &SpriteConfig) -> Vec<ImageDescriptor> {
    DescriptorBuilder::new(doc, cfg)
        .collect(css)
        .expect("collect")
}

pub fn write_png(path: &Path, w: u32, h: u32, color: [u8; 4]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("mkdir");
    }
    RgbaImage::from_pixel(w, h, Rgba(color))
        .save(path)
        .expect("write png");
}
