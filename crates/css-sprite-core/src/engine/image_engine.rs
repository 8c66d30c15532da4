use std::collections::BTreeMap;
use std::io::Cursor;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::try_join_all;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};
use tracing::{debug, instrument};

use super::compositing::blit_rgba;
use super::layout::{LayoutItem, arrange};
use super::{EngineOptions, PackRequest, PackedSheet, PackingEngine, SheetFormat};
use crate::error::{Result, SpriteError};

/// Built-in engine: decodes the sources with `image`, lays them out with the
/// requested [`Algorithm`](super::Algorithm) and encodes the composed sheet.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageEngine;

#[async_trait]
impl PackingEngine for ImageEngine {
    #[instrument(skip_all, fields(sources = request.sources.len()))]
    async fn pack(&self, request: PackRequest) -> Result<PackedSheet> {
        if request.sources.is_empty() {
            return Err(SpriteError::Empty);
        }
        let timeout_ms = request.options.img_opts.timeout;
        let images = try_join_all(
            request
                .sources
                .into_iter()
                .map(|path| load_image(path, timeout_ms)),
        )
        .await?;
        let options = request.options;
        tokio::task::spawn_blocking(move || compose(images, &options))
            .await
            .map_err(|e| SpriteError::Engine(e.to_string()))?
    }
}

async fn load_image(path: PathBuf, timeout_ms: u64) -> Result<(PathBuf, RgbaImage)> {
    let read = tokio::fs::read(&path);
    let bytes = if timeout_ms == 0 {
        read.await?
    } else {
        tokio::time::timeout(Duration::from_millis(timeout_ms), read)
            .await
            .map_err(|_| SpriteError::EngineTimeout {
                path: path.clone(),
                timeout_ms,
            })??
    };
    let rgba = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
        .await
        .map_err(|e| SpriteError::Engine(e.to_string()))??
        .to_rgba8();
    debug!(?path, width = rgba.width(), height = rgba.height(), "loaded source image");
    Ok((path, rgba))
}

/// Lay out decoded images, composite them and encode the sheet.
pub fn compose(
    images: Vec<(PathBuf, RgbaImage)>,
    options: &EngineOptions,
) -> Result<PackedSheet> {
    let items: Vec<LayoutItem<usize>> = images
        .iter()
        .enumerate()
        .map(|(idx, (_, rgba))| LayoutItem::new(idx, rgba.width(), rgba.height()))
        .collect();
    let layout = arrange(&items, options.algorithm, options.padding);

    let mut canvas = RgbaImage::new(layout.size.width.max(1), layout.size.height.max(1));
    let mut coordinates = BTreeMap::new();
    for (idx, placement) in &layout.placements {
        let (path, rgba) = &images[*idx];
        blit_rgba(rgba, &mut canvas, placement.x, placement.y);
        coordinates.insert(path.clone(), *placement);
    }

    let image = encode(canvas, options)?;
    Ok(PackedSheet {
        image,
        coordinates,
        properties: layout.size,
    })
}

fn encode(canvas: RgbaImage, options: &EngineOptions) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    match options.export_opts.format {
        SheetFormat::Png => {
            DynamicImage::ImageRgba8(canvas)
                .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
        }
        SheetFormat::Jpeg => {
            let quality = options.export_opts.quality.clamp(1, 100);
            let rgb = DynamicImage::ImageRgba8(canvas).to_rgb8();
            JpegEncoder::new_with_quality(&mut buf, quality).encode_image(&rgb)?;
        }
    }
    Ok(buf)
}
