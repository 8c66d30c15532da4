use tracing::warn;

use crate::descriptor::{ImageDescriptor, SpritePlacement};
use crate::dispatch::{GroupKey, PackingResult};
use crate::export::sheet_url;

/// Attach placement, sheet size and sheet URL to every descriptor that a
/// packing result reports.
///
/// A descriptor is matched by resolved path within its own partition, so the
/// same file used by several declarations gets the same coordinates. Anything
/// the engine did not report is left out with a warning.
pub fn map_coordinates(
    images: Vec<ImageDescriptor>,
    results: &[PackingResult],
    sprite_sheet_path: Option<&str>,
) -> Vec<ImageDescriptor> {
    let mut placed = Vec::with_capacity(images.len());
    for image in images {
        let key = GroupKey::from(&image);
        let found = results
            .iter()
            .filter(|result| result.group == key)
            .find_map(|result| {
                result
                    .sheet
                    .coordinates
                    .get(&image.path)
                    .map(|coordinates| SpritePlacement {
                        coordinates: *coordinates,
                        properties: result.sheet.properties,
                        sprite_sheet_path: sheet_url(sprite_sheet_path, &result.output_path),
                    })
            });
        match found {
            Some(placement) => placed.push(image.with_placement(placement)),
            None => warn!(
                path = ?image.path,
                group = %key,
                "no sprite coordinates reported; declaration left untouched"
            ),
        }
    }
    placed
}
